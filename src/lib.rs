//! Stereo lens-distortion rendering for Vulkan viewers.
//!
//! Given a pair of eye textures and a precomputed distortion mesh per
//! eye, [`DistortionRenderer`] warps each eye's source texture into the
//! left or right half of a shared output surface, compensating for the
//! optics of the viewer's lenses.
//!
//! The host application owns the Vulkan instance, device, swapchain,
//! render pass, and frame synchronization; this crate owns only the GPU
//! objects it creates (pipelines, buffers, descriptor sets, texture
//! views) and keeps them consistent across output-image rotation, mesh
//! replacement, render-pass changes, and per-frame eye texture handles.
//!
//! ```no_run
//! # use ash::vk;
//! # fn demo(
//! #     instance: &ash::Instance,
//! #     device: &ash::Device,
//! #     physical_device: vk::PhysicalDevice,
//! #     swapchain: vk::SwapchainKHR,
//! #     command_buffer: vk::CommandBuffer,
//! #     render_pass: vk::RenderPass,
//! #     left_image: vk::Image,
//! #     right_image: vk::Image,
//! # ) -> lenswarp::Result<()> {
//! use lenswarp::{
//!     DistortionMesh, DistortionRenderer, Eye, EyeTexture, RenderTarget, RendererConfig,
//! };
//!
//! let mut renderer = unsafe {
//!     DistortionRenderer::new(&RendererConfig {
//!         instance,
//!         device,
//!         physical_device,
//!         swapchain,
//!     })?
//! };
//!
//! let mesh = DistortionMesh {
//!     positions: &[-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
//!     texcoords: &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
//!     indices: &[0, 1, 2, 3],
//! };
//! renderer.set_mesh(&mesh, Eye::Left)?;
//! renderer.set_mesh(&mesh, Eye::Right)?;
//!
//! let target = RenderTarget {
//!     command_buffer,
//!     render_pass,
//!     image_index: 0,
//! };
//! let left = EyeTexture {
//!     image: left_image,
//!     left_u: 0.0,
//!     right_u: 1.0,
//!     top_v: 0.0,
//!     bottom_v: 1.0,
//! };
//! let right = EyeTexture {
//!     image: right_image,
//!     left_u: 0.0,
//!     right_u: 1.0,
//!     top_v: 0.0,
//!     bottom_v: 1.0,
//! };
//! unsafe { renderer.render_eye_to_display(&target, 0, 0, 1280, 720, &left, &right)? };
//! # Ok(())
//! # }
//! ```

pub mod renderer;

pub use renderer::DistortionRenderer;
pub use renderer::config::RendererConfig;
pub use renderer::error::{RendererError, Result};
pub use renderer::eye::{Eye, PerEye};
pub use renderer::mesh::DistortionMesh;
pub use renderer::shader_data::{MeshVertex, UvBounds};
pub use renderer::target::{EyeTexture, RenderTarget};
