use ash::vk;

use crate::renderer::error::{RendererError, Result};

/// Externally owned Vulkan objects the renderer is built over.
///
/// None of these are owned or reference-counted by the renderer: the
/// instance, device, and swapchain are borrowed, and the caller must keep
/// them alive for the whole lifetime of the [`DistortionRenderer`] built
/// from them.
///
/// [`DistortionRenderer`]: crate::renderer::DistortionRenderer
pub struct RendererConfig<'a> {
    pub instance: &'a ash::Instance,
    pub device: &'a ash::Device,
    pub physical_device: vk::PhysicalDevice,
    /// Output image set the renderer draws into. Its length is queried
    /// once at construction and never re-queried.
    pub swapchain: vk::SwapchainKHR,
}

impl RendererConfig<'_> {
    /// Rejects null handles before any GPU object is created. The
    /// instance and device references cannot be null by construction.
    pub(crate) fn validate(&self) -> Result<()> {
        validate_handles(self.physical_device, self.swapchain)
    }
}

fn validate_handles(
    physical_device: vk::PhysicalDevice,
    swapchain: vk::SwapchainKHR,
) -> Result<()> {
    if physical_device == vk::PhysicalDevice::null() {
        return Err(RendererError::NullHandle {
            name: "physical_device",
        });
    }
    if swapchain == vk::SwapchainKHR::null() {
        return Err(RendererError::NullHandle { name: "swapchain" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn null_physical_device_is_rejected() {
        let err = validate_handles(
            vk::PhysicalDevice::null(),
            vk::SwapchainKHR::from_raw(0x10),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RendererError::NullHandle {
                name: "physical_device"
            }
        ));
    }

    #[test]
    fn null_swapchain_is_rejected() {
        let err =
            validate_handles(vk::PhysicalDevice::from_raw(0x10), vk::SwapchainKHR::null())
                .unwrap_err();
        assert!(matches!(err, RendererError::NullHandle { name: "swapchain" }));
    }

    #[test]
    fn non_null_handles_pass() {
        assert!(
            validate_handles(
                vk::PhysicalDevice::from_raw(0x10),
                vk::SwapchainKHR::from_raw(0x20),
            )
            .is_ok()
        );
    }
}
