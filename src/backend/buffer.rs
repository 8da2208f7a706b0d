// Vertex buffer upload
//
// Creates one host-visible buffer, fills it with the triangle payload and
// binds it. Any failure unwinds what was already created before returning.

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;
use thiserror::Error;

use super::vertex;

/// Memory flags the upload path needs: CPU writes, no explicit flushes
const UPLOAD_MEMORY_FLAGS: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("vertex payload is empty")]
    EmptyPayload,
    #[error("vkCreateBuffer failed with {0}")]
    Create(#[source] vk::Result),
    #[error("no host-visible memory type in type bits {type_bits:#b}")]
    NoMemoryType { type_bits: u32 },
    #[error("vkAllocateMemory failed with {0}")]
    Alloc(#[source] vk::Result),
    #[error("vkMapMemory failed with {0}")]
    Map(#[source] vk::Result),
    #[error("vkBindBufferMemory failed with {0}")]
    Bind(#[source] vk::Result),
}

/// Host view of mapped device memory
#[derive(Debug, Clone, Copy)]
pub struct MappedRange {
    pub ptr: NonNull<c_void>,
    /// Bytes the driver made accessible from `ptr`
    pub len: usize,
}

/// The device calls the buffer upload needs
///
/// Implemented by [`super::VulkanDevice`]; tests substitute a recording fake.
pub trait BufferDevice {
    fn create_buffer(&self, info: &vk::BufferCreateInfo) -> VkResult<vk::Buffer>;
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;
    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo) -> VkResult<vk::DeviceMemory>;

    /// Map `size` bytes of `memory` starting at offset 0
    ///
    /// # Safety
    /// `memory` must be host-visible and not already mapped. The returned
    /// range stays valid until [`BufferDevice::unmap_memory`] is called.
    unsafe fn map_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VkResult<MappedRange>;

    fn unmap_memory(&self, memory: vk::DeviceMemory);
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> VkResult<()>;
    fn destroy_buffer(&self, buffer: vk::Buffer);
    fn free_memory(&self, memory: vk::DeviceMemory);
}

impl<T: BufferDevice + ?Sized> BufferDevice for Arc<T> {
    fn create_buffer(&self, info: &vk::BufferCreateInfo) -> VkResult<vk::Buffer> {
        (**self).create_buffer(info)
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        (**self).buffer_memory_requirements(buffer)
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        (**self).memory_properties()
    }

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo) -> VkResult<vk::DeviceMemory> {
        (**self).allocate_memory(info)
    }

    unsafe fn map_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VkResult<MappedRange> {
        (**self).map_memory(memory, size)
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        (**self).unmap_memory(memory)
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> VkResult<()> {
        (**self).bind_buffer_memory(buffer, memory, offset)
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        (**self).destroy_buffer(buffer)
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        (**self).free_memory(memory)
    }
}

/// A vertex buffer bound to its own host-visible allocation
///
/// Release with [`VertexBuffer::destroy`]; dropping the value leaks the
/// native handles.
#[must_use = "the buffer must be released with VertexBuffer::destroy"]
pub struct VertexBuffer<D: BufferDevice> {
    device: D,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    allocation_size: vk::DeviceSize,
    payload_size: vk::DeviceSize,
}

impl<D: BufferDevice> VertexBuffer<D> {
    /// Create the triangle vertex buffer
    pub fn new_triangle(device: D, queue_family_index: u32) -> Result<Self, BufferError> {
        Self::with_bytes(device, queue_family_index, vertex::triangle_bytes())
    }

    /// Create a vertex buffer holding `payload`
    ///
    /// Vulkan rejects zero-sized buffers, so an empty payload fails before
    /// any device call.
    pub fn with_bytes(device: D, queue_family_index: u32, payload: &[u8]) -> Result<Self, BufferError> {
        if payload.is_empty() {
            return Err(BufferError::EmptyPayload);
        }
        let payload_size = payload.len() as vk::DeviceSize;

        // Phase 1: buffer object
        let queue_family_indices = [queue_family_index];
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(payload_size)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_family_indices);

        let buffer = device.create_buffer(&buffer_info).map_err(BufferError::Create)?;

        // Phase 2: memory type
        let requirements = device.buffer_memory_requirements(buffer);
        let memory_type_index = match find_memory_type(
            &device.memory_properties(),
            requirements.memory_type_bits,
            UPLOAD_MEMORY_FLAGS,
        ) {
            Some(index) => index,
            None => {
                device.destroy_buffer(buffer);
                return Err(BufferError::NoMemoryType {
                    type_bits: requirements.memory_type_bits,
                });
            }
        };

        // Phase 3: allocate and fill
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match device.allocate_memory(&alloc_info) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_buffer(buffer);
                return Err(BufferError::Alloc(e));
            }
        };

        let release = |device: &D| {
            device.destroy_buffer(buffer);
            device.free_memory(memory);
        };

        if let Err(e) = upload(&device, memory, payload) {
            release(&device);
            return Err(BufferError::Map(e));
        }

        // Phase 4: bind
        if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
            release(&device);
            return Err(BufferError::Bind(e));
        }

        log::debug!(
            "Vertex buffer ready: {} payload bytes in {} byte allocation (memory type {})",
            payload_size,
            requirements.size,
            memory_type_index
        );

        Ok(Self {
            device,
            buffer,
            memory,
            allocation_size: requirements.size,
            payload_size,
        })
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Size of the backing allocation, as reported by the memory requirements
    pub fn allocation_size(&self) -> vk::DeviceSize {
        self.allocation_size
    }

    pub fn payload_size(&self) -> vk::DeviceSize {
        self.payload_size
    }

    /// Destroy the buffer and free its memory
    pub fn destroy(self) {
        self.device.destroy_buffer(self.buffer);
        self.device.free_memory(self.memory);
    }
}

/// Map, copy, unmap. A short mapping is logged, not treated as an error.
fn upload<D: BufferDevice>(device: &D, memory: vk::DeviceMemory, payload: &[u8]) -> VkResult<()> {
    let mapped = unsafe { device.map_memory(memory, payload.len() as vk::DeviceSize)? };

    let copied = payload.len().min(mapped.len);
    unsafe {
        std::ptr::copy_nonoverlapping(payload.as_ptr(), mapped.ptr.as_ptr().cast::<u8>(), copied);
    }
    if copied != payload.len() {
        log::warn!(
            "Short copy into vertex buffer memory: {} of {} bytes",
            copied,
            payload.len()
        );
    }

    device.unmap_memory(memory);
    Ok(())
}

/// Find the first memory type allowed by `type_bits` that has all of `flags`
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..properties.memory_type_count).find(|&i| {
        let allowed = (type_bits & (1 << i)) != 0;
        allowed
            && properties.memory_types[i as usize]
                .property_flags
                .contains(flags)
    })
}
