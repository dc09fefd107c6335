use ash::vk;
use thiserror::Error;

use crate::renderer::eye::Eye;

/// Errors surfaced by the distortion renderer.
///
/// Every fallible Vulkan call reports the call site and result code and
/// aborts the operation, instead of continuing with a possibly invalid
/// handle.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("{name} handle must not be null")]
    NullHandle { name: &'static str },

    #[error("{call} failed with {code}")]
    VulkanCall { call: &'static str, code: vk::Result },

    #[error(
        "no device memory type satisfies type bits {type_bits:#x} \
         with properties {properties:?}"
    )]
    NoSuitableMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    },

    #[error("output image slot {slot} is outside the image set length {image_count}")]
    SlotOutOfRange { slot: u32, image_count: u32 },

    #[error(
        "distortion mesh for {eye:?} has {positions} positions \
         but {texcoords} texture coordinates"
    )]
    MeshArityMismatch {
        eye: Eye,
        positions: usize,
        texcoords: usize,
    },

    #[error("embedded shader binary is malformed: {0}")]
    InvalidShader(#[from] std::io::Error),
}

pub type Result<T, E = RendererError> = std::result::Result<T, E>;

/// Attaches the originating call name to a raw `vk::Result`.
pub(crate) trait VkCall<T> {
    fn vk_call(self, call: &'static str) -> Result<T>;
}

impl<T> VkCall<T> for ash::prelude::VkResult<T> {
    fn vk_call(self, call: &'static str) -> Result<T> {
        self.map_err(|code| RendererError::VulkanCall { call, code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulkan_call_errors_carry_the_call_site() {
        let err: Result<()> =
            Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY).vk_call("vkCreateBuffer");
        let message = err.unwrap_err().to_string();
        assert!(message.contains("vkCreateBuffer"));
        assert!(message.contains("ERROR_OUT_OF_DEVICE_MEMORY"));
    }

    #[test]
    fn vk_call_passes_success_through() {
        let ok: Result<u32> = Ok(7u32).vk_call("vkAnything");
        assert_eq!(ok.unwrap(), 7);
    }

    #[test]
    fn slot_error_names_both_bounds() {
        let err = RendererError::SlotOutOfRange {
            slot: 5,
            image_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "output image slot 5 is outside the image set length 3"
        );
    }
}
