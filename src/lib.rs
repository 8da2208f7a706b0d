// tri-upload - Minimal Vulkan helpers
//
// A host-visible triangle vertex buffer, an Android surface factory and a
// SPIR-V word decoder.

pub mod backend;
pub mod config;

pub use backend::{BufferDevice, BufferError, VertexBuffer, VulkanDevice};
pub use config::Config;
