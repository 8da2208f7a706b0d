// =============================================================================
// TRI-UPLOAD - Vertex buffer upload smoke run
// =============================================================================
//
// FLOW:
// 1. Load config.toml
// 2. Create Vulkan device (no window needed)
// 3. Upload the triangle into a host-visible vertex buffer
// 4. Destroy the buffer and tear the device down
//
// =============================================================================

use anyhow::{Context, Result};
use ash::vk::Handle;
use tri_upload::{Config, VertexBuffer, VulkanDevice};

fn main() -> Result<()> {
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting tri-upload");

    let enable_validation = cfg!(debug_assertions) && config.debug.validation_layers;
    let device = VulkanDevice::new(
        &config.app.name,
        enable_validation,
        config.device.prefer_discrete_gpu,
    )?;

    let buffer = VertexBuffer::new_triangle(device.clone(), device.queue_family)
        .context("Failed to upload triangle vertex buffer")?;

    log::info!(
        "Vertex buffer {:#x}: {} bytes uploaded, {} bytes allocated",
        buffer.buffer().as_raw(),
        buffer.payload_size(),
        buffer.allocation_size()
    );

    buffer.destroy();
    device.wait_idle()?;

    log::info!("Done");
    Ok(())
}

/// Initialize logging; RUST_LOG overrides the configured level
fn init_logging(config: &Config) {
    use env_logger::{Builder, Env};

    let mut builder = Builder::new();
    builder.filter_level(config.log_filter());
    builder.parse_env(Env::default());
    builder.init();
}
