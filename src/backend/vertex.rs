// Vertex payload - the single triangle uploaded by the allocator

use glam::Vec3;

/// Triangle in normalized device coordinates
pub static TRIANGLE: [Vec3; 3] = [
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
];

/// Size of the triangle payload in bytes (3 vertices x 3 floats x 4 bytes)
pub const TRIANGLE_BYTES: usize = std::mem::size_of::<[Vec3; 3]>();

/// The triangle as tightly packed `f32` bytes
pub fn triangle_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&TRIANGLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_nine_packed_floats() {
        assert_eq!(TRIANGLE_BYTES, 36);
        assert_eq!(triangle_bytes().len(), TRIANGLE_BYTES);

        let floats: &[f32] = bytemuck::cast_slice(&TRIANGLE);
        assert_eq!(floats, &[-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
