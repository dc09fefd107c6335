use ash::vk;

use crate::renderer::buffer::DeviceBuffer;
use crate::renderer::error::{Result, VkCall};
use crate::renderer::shader_data::UvBounds;

/// Layout objects shared by both eyes and every output image slot.
/// Created once at construction, never recreated, destroyed once at
/// teardown.
pub(crate) struct SharedResources {
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pub sampler: vk::Sampler,
}

impl SharedResources {
    pub fn new(device: &ash::Device, max_anisotropy: f32) -> Result<Self> {
        let descriptor_set_layout = create_descriptor_set_layout(device)?;
        let pipeline_layout = match create_pipeline_layout(device, descriptor_set_layout) {
            Ok(layout) => layout,
            Err(err) => {
                unsafe { device.destroy_descriptor_set_layout(descriptor_set_layout, None) };
                return Err(err);
            }
        };
        let sampler = match create_sampler(device, max_anisotropy) {
            Ok(sampler) => sampler,
            Err(err) => {
                unsafe {
                    device.destroy_pipeline_layout(pipeline_layout, None);
                    device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                }
                return Err(err);
            }
        };

        Ok(Self {
            descriptor_set_layout,
            pipeline_layout,
            sampler,
        })
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_sampler(self.sampler, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}

/// Everything owned per eye: the descriptor pool and its per-slot sets,
/// the per-slot texture views over the caller's eye texture, the UV
/// bounds uniform, the uploaded geometry, and the graphics pipeline.
pub(crate) struct EyeResources {
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_sets: Vec<vk::DescriptorSet>,
    /// One view per output image slot, null until the slot is first
    /// rendered. Recreated every frame over the current source texture.
    pub image_views: Vec<vk::ImageView>,
    pub uniform_buffer: DeviceBuffer,
    pub geometry: EyeGeometry,
    pub pipeline: vk::Pipeline,
}

impl EyeResources {
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        shared: &SharedResources,
        image_count: u32,
    ) -> Result<Self> {
        let uniform_buffer = DeviceBuffer::new(
            std::mem::size_of::<UvBounds>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            memory_properties,
            device,
        )?;

        let descriptor_pool = create_descriptor_pool(device, image_count)?;
        let descriptor_sets = match allocate_descriptor_sets(
            device,
            descriptor_pool,
            shared.descriptor_set_layout,
            image_count,
        ) {
            Ok(sets) => sets,
            Err(err) => {
                unsafe { device.destroy_descriptor_pool(descriptor_pool, None) };
                return Err(err);
            }
        };

        Ok(Self {
            descriptor_pool,
            descriptor_sets,
            image_views: vec![vk::ImageView::null(); image_count as usize],
            uniform_buffer,
            geometry: EyeGeometry::default(),
            pipeline: vk::Pipeline::null(),
        })
    }

    /// Drops the slot's previous texture view, if any. The view
    /// referenced the previous frame's source texture, which may since
    /// have been destroyed by its owner.
    pub fn destroy_image_view(&mut self, device: &ash::Device, slot: usize) {
        if self.image_views[slot] != vk::ImageView::null() {
            unsafe { device.destroy_image_view(self.image_views[slot], None) };
            self.image_views[slot] = vk::ImageView::null();
        }
    }

    pub fn destroy_pipeline(&mut self, device: &ash::Device) {
        if self.pipeline != vk::Pipeline::null() {
            unsafe { device.destroy_pipeline(self.pipeline, None) };
            self.pipeline = vk::Pipeline::null();
        }
    }

    /// Destroys every non-buffer object this eye owns. The uniform and
    /// geometry buffers release themselves when the struct drops.
    pub fn destroy(&mut self, device: &ash::Device) {
        for slot in 0..self.image_views.len() {
            self.destroy_image_view(device, slot);
        }
        self.destroy_pipeline(device);
        unsafe { device.destroy_descriptor_pool(self.descriptor_pool, None) };
        self.descriptor_pool = vk::DescriptorPool::null();
    }
}

/// Per-eye geometry uploaded by `set_mesh`. Index count is tracked here,
/// per eye: a draw for one eye never uses the other eye's count.
#[derive(Default)]
pub(crate) struct EyeGeometry {
    pub vertex_buffer: Option<DeviceBuffer>,
    pub index_buffer: Option<DeviceBuffer>,
    pub index_count: u32,
}

impl EyeGeometry {
    /// A draw needs both buffers and at least one index.
    pub fn drawable(&self) -> Option<(&DeviceBuffer, &DeviceBuffer, u32)> {
        match (&self.vertex_buffer, &self.index_buffer) {
            (Some(vertex), Some(index)) if self.index_count > 0 => {
                Some((vertex, index, self.index_count))
            }
            _ => None,
        }
    }
}

fn create_descriptor_set_layout(device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
    let bindings = [
        // Eye texture + sampler, sampled by the fragment stage.
        vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        // UV bounds, consumed by the vertex stage.
        vk::DescriptorSetLayoutBinding::default()
            .binding(1)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX),
    ];
    let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

    unsafe { device.create_descriptor_set_layout(&layout_info, None) }
        .vk_call("vkCreateDescriptorSetLayout")
}

fn create_pipeline_layout(
    device: &ash::Device,
    descriptor_set_layout: vk::DescriptorSetLayout,
) -> Result<vk::PipelineLayout> {
    let set_layouts = [descriptor_set_layout];
    let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);

    unsafe { device.create_pipeline_layout(&layout_info, None) }.vk_call("vkCreatePipelineLayout")
}

fn create_sampler(device: &ash::Device, max_anisotropy: f32) -> Result<vk::Sampler> {
    let sampler_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::NEAREST)
        .min_filter(vk::Filter::NEAREST)
        .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .max_anisotropy(max_anisotropy)
        .compare_op(vk::CompareOp::NEVER)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .unnormalized_coordinates(false);

    unsafe { device.create_sampler(&sampler_info, None) }.vk_call("vkCreateSampler")
}

fn create_descriptor_pool(device: &ash::Device, image_count: u32) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(image_count),
        vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(image_count),
    ];
    let pool_info = vk::DescriptorPoolCreateInfo::default()
        .pool_sizes(&pool_sizes)
        .max_sets(image_count);

    unsafe { device.create_descriptor_pool(&pool_info, None) }.vk_call("vkCreateDescriptorPool")
}

fn allocate_descriptor_sets(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    image_count: u32,
) -> Result<Vec<vk::DescriptorSet>> {
    let layouts = vec![layout; image_count as usize];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);

    unsafe { device.allocate_descriptor_sets(&alloc_info) }.vk_call("vkAllocateDescriptorSets")
}

/// Wraps the caller's source eye texture for sampling. The view format
/// matches the eye texture pool's sRGB color format.
pub(crate) fn create_image_view(device: &ash::Device, image: vk::Image) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(vk::Format::R8G8B8A8_SRGB)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::R,
            g: vk::ComponentSwizzle::G,
            b: vk::ComponentSwizzle::B,
            a: vk::ComponentSwizzle::A,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&view_info, None) }.vk_call("vkCreateImageView")
}

/// Points the slot's descriptor set at the freshly created texture view
/// and the eye's uniform buffer.
pub(crate) fn update_descriptor_set(
    device: &ash::Device,
    descriptor_set: vk::DescriptorSet,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
    uniform_buffer: vk::Buffer,
) {
    let image_info = [vk::DescriptorImageInfo::default()
        .sampler(sampler)
        .image_view(image_view)
        .image_layout(vk::ImageLayout::GENERAL)];
    let buffer_info = [vk::DescriptorBufferInfo::default()
        .buffer(uniform_buffer)
        .offset(0)
        .range(std::mem::size_of::<UvBounds>() as vk::DeviceSize)];

    let writes = [
        vk::WriteDescriptorSet::default()
            .dst_set(descriptor_set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info),
        vk::WriteDescriptorSet::default()
            .dst_set(descriptor_set)
            .dst_binding(1)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info),
    ];

    unsafe { device.update_descriptor_sets(&writes, &[]) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::eye::{Eye, PerEye};

    #[test]
    fn empty_geometry_is_not_drawable() {
        let geometry = EyeGeometry::default();
        assert!(geometry.drawable().is_none());
    }

    #[test]
    fn index_count_without_buffers_is_not_drawable() {
        let geometry = EyeGeometry {
            vertex_buffer: None,
            index_buffer: None,
            index_count: 4,
        };
        assert!(geometry.drawable().is_none());
    }

    #[test]
    fn index_counts_stay_per_eye() {
        let _ = env_logger::builder().is_test(true).try_init();

        // The count used by a draw belongs to the eye being drawn; setting
        // one eye's mesh must never leak its count into the other eye.
        let mut eyes: PerEye<EyeGeometry> = PerEye::default();
        eyes[Eye::Left].index_count = 62;
        eyes[Eye::Right].index_count = 4;

        assert_eq!(eyes[Eye::Left].index_count, 62);
        assert_eq!(eyes[Eye::Right].index_count, 4);

        eyes[Eye::Right].index_count = 8;
        assert_eq!(
            eyes[Eye::Left].index_count, 62,
            "replacing one eye's mesh must not change the other eye's draw count"
        );
    }
}
