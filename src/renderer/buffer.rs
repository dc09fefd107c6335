use ash::vk;

use crate::renderer::error::{RendererError, Result, VkCall};

/// Host-visible device buffer created with the explicit two-step
/// allocate-then-bind protocol: create the buffer, query its memory
/// requirements, allocate backing memory of a compatible type, bind.
///
/// Everything the renderer uploads is tiny (a handful of vertices, one
/// 4-float uniform), so all buffers live in host-visible, host-coherent
/// memory and writes go through a scoped map/copy/unmap with no explicit
/// flush and no persistent mapping.
pub(crate) struct DeviceBuffer {
    pub buffer: vk::Buffer,

    memory: vk::DeviceMemory,
    device: ash::Device,
}

impl DeviceBuffer {
    pub fn new(
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        device: &ash::Device,
    ) -> Result<Self> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer =
            unsafe { device.create_buffer(&buffer_info, None) }.vk_call("vkCreateBuffer")?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let wanted =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let Some(memory_type_index) =
            find_memory_type(memory_properties, requirements.memory_type_bits, wanted)
        else {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(RendererError::NoSuitableMemoryType {
                type_bits: requirements.memory_type_bits,
                properties: wanted,
            });
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = match unsafe { device.allocate_memory(&alloc_info, None) }
            .vk_call("vkAllocateMemory")
        {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(err);
            }
        };

        if let Err(err) = unsafe { device.bind_buffer_memory(buffer, memory, 0) }
            .vk_call("vkBindBufferMemory")
        {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(err);
        }

        Ok(Self {
            buffer,
            memory,
            device: device.clone(),
        })
    }

    /// Copies `data` to the start of the buffer through a scoped
    /// map/copy/unmap; no mapping outlives the call.
    pub fn write<T: bytemuck::Pod>(&self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mapped = unsafe {
            self.device.map_memory(
                self.memory,
                0,
                bytes.len() as vk::DeviceSize,
                vk::MemoryMapFlags::empty(),
            )
        }
        .vk_call("vkMapMemory")?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Walks the device's memory types for one that both satisfies the
/// buffer's requirement bits and carries the wanted property flags.
fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    wanted: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory_properties.memory_types[..memory_properties.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(wanted)
        })
        .map(|(index, _)| index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties_with(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (i, flags) in types.iter().enumerate() {
            properties.memory_types[i].property_flags = *flags;
        }
        properties
    }

    #[test]
    fn selects_the_first_type_satisfying_bits_and_flags() {
        let wanted =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            wanted,
            wanted,
        ]);

        // All types allowed: index 2 is the first fully matching one.
        assert_eq!(find_memory_type(&properties, 0b1111, wanted), Some(2));
        // Requirement bits exclude index 2.
        assert_eq!(find_memory_type(&properties, 0b1011, wanted), Some(3));
    }

    #[test]
    fn no_compatible_type_is_a_miss_not_a_fallback() {
        let properties = properties_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        let wanted =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&properties, 0b1, wanted), None);
    }
}
