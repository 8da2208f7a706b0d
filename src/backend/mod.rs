// Backend module - Vulkan helpers
//
// Design: Thin wrapper around ash. One vertex buffer, one optional surface.

pub mod buffer;
pub mod device;
pub mod spirv;
#[cfg(target_os = "android")]
pub mod surface;
pub mod vertex;

pub use buffer::{BufferDevice, BufferError, VertexBuffer};
pub use device::VulkanDevice;
