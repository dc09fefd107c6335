use std::io::Cursor;
use std::mem::{offset_of, size_of};

use ash::vk;

use crate::renderer::error::{RendererError, Result, VkCall};
use crate::renderer::shader_data::MeshVertex;

/// Precompiled distortion shaders, embedded as the build ships them.
/// Sources live next to the binaries in `shaders/`.
const DISTORTION_VERT_SPV: &[u8] = include_bytes!("../../shaders/distortion.vert.spv");
const DISTORTION_FRAG_SPV: &[u8] = include_bytes!("../../shaders/distortion.frag.spv");

/// Caches the render-pass identity the current pipelines were built for.
///
/// A pipeline object is compatible with exactly one render-pass identity,
/// and that identity is target-wide, not per-eye: when it changes, both
/// eyes' pipelines must be rebuilt together, never one alone.
#[derive(Debug, Default)]
pub(crate) struct PassTracker {
    current: Option<vk::RenderPass>,
}

impl PassTracker {
    /// True when `render_pass` differs from the cached identity, which
    /// includes the first use. Does not mutate the cache; call
    /// [`set_current`](Self::set_current) once the rebuild succeeded.
    pub fn needs_rebuild(&self, render_pass: vk::RenderPass) -> bool {
        self.current != Some(render_pass)
    }

    pub fn set_current(&mut self, render_pass: vk::RenderPass) {
        self.current = Some(render_pass);
    }
}

/// Builds the fixed distortion pipeline for one eye against the given
/// render pass and shared layout.
///
/// Shader modules are transient: created from the embedded binaries and
/// destroyed before this returns, whether or not pipeline creation
/// succeeded.
pub(crate) fn create_graphics_pipeline(
    device: &ash::Device,
    pipeline_layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
) -> Result<vk::Pipeline> {
    let vert_mod = create_shader_module(device, DISTORTION_VERT_SPV)?;
    let frag_mod = match create_shader_module(device, DISTORTION_FRAG_SPV) {
        Ok(module) => module,
        Err(err) => {
            unsafe { device.destroy_shader_module(vert_mod, None) };
            return Err(err);
        }
    };

    let result = build_pipeline(device, pipeline_layout, render_pass, vert_mod, frag_mod);

    unsafe {
        device.destroy_shader_module(vert_mod, None);
        device.destroy_shader_module(frag_mod, None);
    }

    result
}

fn create_shader_module(device: &ash::Device, spv: &[u8]) -> Result<vk::ShaderModule> {
    let code = ash::util::read_spv(&mut Cursor::new(spv))?;
    let module_info = vk::ShaderModuleCreateInfo::default().code(&code);
    unsafe { device.create_shader_module(&module_info, None) }.vk_call("vkCreateShaderModule")
}

fn build_pipeline(
    device: &ash::Device,
    pipeline_layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    vert_mod: vk::ShaderModule,
    frag_mod: vk::ShaderModule,
) -> Result<vk::Pipeline> {
    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert_mod)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag_mod)
            .name(c"main"),
    ];

    let vertex_bindings = [vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(size_of::<MeshVertex>() as u32)
        .input_rate(vk::VertexInputRate::VERTEX)];
    let vertex_attributes = [
        vk::VertexInputAttributeDescription::default()
            .location(0)
            .binding(0)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(offset_of!(MeshVertex, position) as u32),
        vk::VertexInputAttributeDescription::default()
            .location(1)
            .binding(0)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(offset_of!(MeshVertex, texcoord) as u32),
    ];
    let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_STRIP)
        .primitive_restart_enable(false);

    // Viewport and scissor are dynamic, set per draw.
    let viewport_info = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state_info =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let raster_info = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::CLOCKWISE)
        .line_width(1.0);

    let sample_mask = [!0u32];
    let multisample_info = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_mask(&sample_mask);

    let depth_stencil_info = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS);

    let attachment_states = [vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(false)
        .color_write_mask(vk::ColorComponentFlags::RGBA)];
    let color_blend_info = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op(vk::LogicOp::COPY)
        .attachments(&attachment_states);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_info)
        .input_assembly_state(&input_assembly_info)
        .viewport_state(&viewport_info)
        .rasterization_state(&raster_info)
        .multisample_state(&multisample_info)
        .depth_stencil_state(&depth_stencil_info)
        .color_blend_state(&color_blend_info)
        .dynamic_state(&dynamic_state_info)
        .layout(pipeline_layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    };
    match pipelines {
        Ok(mut pipelines) => Ok(pipelines.remove(0)),
        Err((_, code)) => Err(RendererError::VulkanCall {
            call: "vkCreateGraphicsPipelines",
            code,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn first_pass_always_needs_a_build() {
        let tracker = PassTracker::default();
        assert!(tracker.needs_rebuild(vk::RenderPass::from_raw(0xA)));
    }

    #[test]
    fn rebuild_happens_iff_the_identity_changes() {
        let pass_a = vk::RenderPass::from_raw(0xA);
        let pass_b = vk::RenderPass::from_raw(0xB);

        let mut tracker = PassTracker::default();
        tracker.set_current(pass_a);
        assert!(!tracker.needs_rebuild(pass_a));
        assert!(tracker.needs_rebuild(pass_b));

        tracker.set_current(pass_b);
        assert!(!tracker.needs_rebuild(pass_b));
        assert!(tracker.needs_rebuild(pass_a));
    }

    #[test]
    fn three_slot_frame_sequence_rebuilds_exactly_twice() {
        // Slots 0 and 1 present distinct render passes, slot 2 repeats
        // slot 1's: two rebuilds total, none at slot 2.
        let passes = [
            vk::RenderPass::from_raw(0xA),
            vk::RenderPass::from_raw(0xB),
            vk::RenderPass::from_raw(0xB),
        ];

        let mut tracker = PassTracker::default();
        let mut rebuilds = 0;
        for pass in passes {
            if tracker.needs_rebuild(pass) {
                rebuilds += 1;
                tracker.set_current(pass);
            }
        }
        assert_eq!(rebuilds, 2);
    }

    #[test]
    fn embedded_shader_binaries_decode_as_spirv() {
        for spv in [DISTORTION_VERT_SPV, DISTORTION_FRAG_SPV] {
            let words = ash::util::read_spv(&mut Cursor::new(spv)).unwrap();
            assert_eq!(words[0], 0x0723_0203, "SPIR-V magic word");
            assert!(words.len() > 5);
        }
    }
}
