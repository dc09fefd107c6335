pub mod config;
pub mod error;
pub mod eye;
pub mod mesh;
pub mod shader_data;
pub mod target;

mod buffer;
mod pipeline;
mod resources;

use ash::vk;
use log::{debug, warn};

use crate::renderer::buffer::DeviceBuffer;
use crate::renderer::config::RendererConfig;
use crate::renderer::error::{RendererError, Result, VkCall};
use crate::renderer::eye::{Eye, PerEye};
use crate::renderer::mesh::DistortionMesh;
use crate::renderer::pipeline::PassTracker;
use crate::renderer::resources::{EyeResources, SharedResources};
use crate::renderer::target::{EyeTexture, RenderTarget};

/// Renders stereo lens-distortion-corrected imagery: warps each eye's
/// source texture through its distortion mesh into the left or right half
/// of a shared output surface.
///
/// The renderer owns every GPU object it creates and destroys them all on
/// drop. It borrows the device, swapchain, render pass, command buffer,
/// and eye texture handles from the host and never outlives-checks them:
/// the host must keep them alive and fence GPU work itself (see
/// [`render_eye_to_display`](Self::render_eye_to_display)).
pub struct DistortionRenderer {
    device: ash::Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Output image set length, queried once at construction.
    image_count: u32,
    /// Output surface dimensions recorded by the most recent render call.
    surface_extent: vk::Extent2D,
    pass_tracker: PassTracker,
    shared: SharedResources,
    eyes: PerEye<EyeResources>,
}

impl DistortionRenderer {
    /// Builds the shared layout objects, per-eye uniform buffers, and
    /// per-eye descriptor pools and sets, sized to the swapchain's image
    /// count. Pipelines are built lazily on first render, when a
    /// render-pass identity is first known.
    ///
    /// # Safety
    ///
    /// The physical device and swapchain handles must be valid objects of
    /// the given instance and device, and instance, device, and swapchain
    /// must outlive the returned renderer.
    pub unsafe fn new(config: &RendererConfig<'_>) -> Result<Self> {
        config.validate()?;

        let device = config.device.clone();
        let (memory_properties, limits) = unsafe {
            (
                config
                    .instance
                    .get_physical_device_memory_properties(config.physical_device),
                config
                    .instance
                    .get_physical_device_properties(config.physical_device)
                    .limits,
            )
        };

        let swapchain_device = ash::khr::swapchain::Device::new(config.instance, &device);
        let image_count = unsafe { swapchain_device.get_swapchain_images(config.swapchain) }
            .vk_call("vkGetSwapchainImagesKHR")?
            .len() as u32;

        let shared = SharedResources::new(&device, limits.max_sampler_anisotropy)?;

        let mut left = match EyeResources::new(&device, &memory_properties, &shared, image_count)
        {
            Ok(left) => left,
            Err(err) => {
                shared.destroy(&device);
                return Err(err);
            }
        };
        let right = match EyeResources::new(&device, &memory_properties, &shared, image_count) {
            Ok(right) => right,
            Err(err) => {
                left.destroy(&device);
                shared.destroy(&device);
                return Err(err);
            }
        };

        debug!("distortion renderer created over {image_count} output images");

        Ok(Self {
            device,
            memory_properties,
            image_count,
            surface_extent: vk::Extent2D::default(),
            pass_tracker: PassTracker::default(),
            shared,
            eyes: PerEye::new(left, right),
        })
    }

    /// Replaces one eye's distortion geometry wholesale: the previous
    /// vertex and index buffers are destroyed and new ones allocated at
    /// the mesh's sizes. May be called any number of times, in any order
    /// relative to rendering, provided the GPU is not reading the old
    /// buffers.
    ///
    /// Index values are not validated against the vertex count.
    pub fn set_mesh(&mut self, mesh: &DistortionMesh<'_>, eye: Eye) -> Result<()> {
        let vertices = mesh.interleave(eye)?;

        let device = &self.device;
        let memory_properties = &self.memory_properties;
        let geometry = &mut self.eyes[eye].geometry;

        geometry.vertex_buffer = None;
        geometry.index_buffer = None;
        geometry.index_count = 0;

        if !vertices.is_empty() {
            let vertex_buffer = DeviceBuffer::new(
                std::mem::size_of_val(vertices.as_slice()) as vk::DeviceSize,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                memory_properties,
                device,
            )?;
            vertex_buffer.write(&vertices)?;
            geometry.vertex_buffer = Some(vertex_buffer);
        }

        if !mesh.indices.is_empty() {
            let index_buffer = DeviceBuffer::new(
                std::mem::size_of_val(mesh.indices) as vk::DeviceSize,
                vk::BufferUsageFlags::INDEX_BUFFER,
                memory_properties,
                device,
            )?;
            index_buffer.write(mesh.indices)?;
            geometry.index_buffer = Some(index_buffer);
            geometry.index_count = mesh.indices.len() as u32;
        }

        debug!(
            "distortion mesh for {eye:?} replaced: {} vertices, {} indices",
            vertices.len(),
            mesh.indices.len()
        );
        Ok(())
    }

    /// Records the distortion draw for both eyes, left then right, into
    /// the target's command buffer: left eye into the left half of the
    /// output rect, right eye into the right half. Does not submit.
    ///
    /// When the target's render-pass identity differs from the previous
    /// call's, both eyes' pipelines are rebuilt before any draw. An
    /// out-of-range image slot aborts the call without emitting commands
    /// or touching any cached state.
    ///
    /// # Safety
    ///
    /// The command buffer must be in the recording state inside a render
    /// pass compatible with `target.render_pass`, the eye texture handles
    /// must be valid, and the GPU must be done with the slot's previous
    /// texture view and descriptor set (this component inserts no
    /// synchronization of its own).
    pub unsafe fn render_eye_to_display(
        &mut self,
        target: &RenderTarget,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        left_eye: &EyeTexture,
        right_eye: &EyeTexture,
    ) -> Result<()> {
        let slot = target.image_index;
        if slot >= self.image_count {
            warn!(
                "output image slot {slot} is outside the image set length {}; dropping frame",
                self.image_count
            );
            return Err(RendererError::SlotOutOfRange {
                slot,
                image_count: self.image_count,
            });
        }

        self.surface_extent = vk::Extent2D { width, height };

        if self.pass_tracker.needs_rebuild(target.render_pass) {
            self.rebuild_pipelines(target.render_pass)?;
        }

        for (eye, texture) in [(Eye::Left, left_eye), (Eye::Right, right_eye)] {
            unsafe {
                self.render_distortion_mesh(texture, eye, target.command_buffer, slot as usize, x, y)?;
            }
        }
        Ok(())
    }

    /// Rebuilds both eyes' pipelines against a new render-pass identity.
    /// The swap is transactional: the cached identity and the old
    /// pipelines are only replaced once both new pipelines exist.
    fn rebuild_pipelines(&mut self, render_pass: vk::RenderPass) -> Result<()> {
        debug!("render pass identity changed; rebuilding both eye pipelines");

        let left = pipeline::create_graphics_pipeline(
            &self.device,
            self.shared.pipeline_layout,
            render_pass,
        )?;
        let right = match pipeline::create_graphics_pipeline(
            &self.device,
            self.shared.pipeline_layout,
            render_pass,
        ) {
            Ok(right) => right,
            Err(err) => {
                unsafe { self.device.destroy_pipeline(left, None) };
                return Err(err);
            }
        };

        self.eyes[Eye::Left].destroy_pipeline(&self.device);
        self.eyes[Eye::Left].pipeline = left;
        self.eyes[Eye::Right].destroy_pipeline(&self.device);
        self.eyes[Eye::Right].pipeline = right;
        self.pass_tracker.set_current(render_pass);
        Ok(())
    }

    /// Per-eye frame work: uniform update, texture-view recreation,
    /// descriptor update, then command emission.
    unsafe fn render_distortion_mesh(
        &mut self,
        texture: &EyeTexture,
        eye: Eye,
        command_buffer: vk::CommandBuffer,
        slot: usize,
        x: i32,
        y: i32,
    ) -> Result<()> {
        let device = &self.device;
        let shared = &self.shared;
        let extent = self.surface_extent;
        let eye_resources = &mut self.eyes[eye];

        eye_resources.uniform_buffer.write(&[texture.uv_bounds()])?;

        // The slot's previous view wrapped the previous frame's source
        // texture, which may have rotated out of the caller's pool.
        eye_resources.destroy_image_view(device, slot);
        eye_resources.image_views[slot] = resources::create_image_view(device, texture.image)?;

        resources::update_descriptor_set(
            device,
            eye_resources.descriptor_sets[slot],
            eye_resources.image_views[slot],
            shared.sampler,
            eye_resources.uniform_buffer.buffer,
        );

        let Some((vertex_buffer, index_buffer, index_count)) = eye_resources.geometry.drawable()
        else {
            debug!("no distortion mesh uploaded for {eye:?}; skipping draw");
            return Ok(());
        };

        let viewport = target::eye_viewport(x, y, extent.width, extent.height);
        let scissor = target::eye_scissor(eye, x, y, extent.width, extent.height);

        unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                eye_resources.pipeline,
            );
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[scissor]);
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[vertex_buffer.buffer], &[0]);
            device.cmd_bind_index_buffer(
                command_buffer,
                index_buffer.buffer,
                0,
                vk::IndexType::UINT16,
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                shared.pipeline_layout,
                0,
                &[eye_resources.descriptor_sets[slot]],
                &[],
            );
            device.cmd_draw_indexed(command_buffer, index_count, 1, 0, 0, 0);
        }

        Ok(())
    }
}

impl Drop for DistortionRenderer {
    fn drop(&mut self) {
        // Reverse dependency order: per-slot views, pipelines, and pools
        // first, then the shared layout objects. Buffers free their own
        // memory when their fields drop.
        for (_, eye_resources) in self.eyes.iter_mut() {
            eye_resources.destroy(&self.device);
        }
        self.shared.destroy(&self.device);
    }
}
