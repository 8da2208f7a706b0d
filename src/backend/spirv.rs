// SPIR-V word decoding
//
// SPIR-V is a stream of little-endian 32-bit words. Decoding copies into
// a fresh Vec so the input needs no particular alignment.

/// Decode `bytes` into 32-bit little-endian words
///
/// Trailing bytes that do not form a whole word are dropped with a warning.
pub fn repack_u32(bytes: &[u8]) -> Vec<u32> {
    let chunks = bytes.chunks_exact(4);
    let remainder = chunks.remainder().len();
    if remainder != 0 {
        log::warn!(
            "Byte length {} is not a multiple of 4, dropping {} trailing bytes",
            bytes.len(),
            remainder
        );
    }

    chunks
        .map(|word| {
            u32::from(word[0])
                | u32::from(word[1]) << 8
                | u32::from(word[2]) << 16
                | u32::from(word[3]) << 24
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_words() {
        let bytes = [0x01, 0, 0, 0, 0x02, 0, 0, 0, 0x03, 0, 0, 0];
        assert_eq!(repack_u32(&bytes), vec![1, 2, 3]);
    }

    #[test]
    fn decodes_spirv_magic() {
        let bytes = [0x03, 0x02, 0x23, 0x07];
        assert_eq!(repack_u32(&bytes), vec![0x0723_0203]);
    }

    #[test]
    fn drops_trailing_bytes() {
        let bytes = [0xff, 0, 0, 0, 0xaa, 0xbb];
        assert_eq!(repack_u32(&bytes), vec![0xff]);
        assert!(repack_u32(&[1, 2, 3]).is_empty());
        assert!(repack_u32(&[]).is_empty());
    }
}
