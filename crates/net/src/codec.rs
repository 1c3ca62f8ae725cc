//! Frame encoding and decoding.
//!
//! Frame format: `[length: u32][discriminator: u8][payload: bytes]`, all
//! big-endian. `length` counts the discriminator and the payload but not itself.

use anyhow::Result;
use blake3::Hash;

/// Protocol version folded into the schema hash.
pub const PROTOCOL_VERSION: u16 = 1;

/// Bytes preceding the payload.
pub const FRAME_HEADER_LEN: usize = 5;

/// Largest accepted frame body (discriminator + payload).
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// A decoded frame borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Message type discriminator.
    pub discriminator: u8,
    /// Encoded message.
    pub payload: &'a [u8],
}

/// Wrap `payload` in a frame.
pub fn encode_frame(discriminator: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let body_len = 1 + payload.len();
    if body_len > MAX_FRAME_LEN {
        anyhow::bail!(
            "Frame too large: {} bytes (maximum {})",
            body_len,
            MAX_FRAME_LEN
        );
    }

    let mut frame = Vec::with_capacity(4 + body_len);
    frame.extend_from_slice(&(body_len as u32).to_be_bytes());
    frame.push(discriminator);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Split a frame into discriminator and payload.
///
/// Bytes beyond the declared length are ignored; they belong to the next frame.
pub fn decode_frame(data: &[u8]) -> Result<Frame<'_>> {
    if data.len() < FRAME_HEADER_LEN {
        return Err(anyhow::anyhow!(
            "Frame too short: {} bytes (minimum {})",
            data.len(),
            FRAME_HEADER_LEN
        ));
    }

    let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

    if length == 0 {
        return Err(anyhow::anyhow!("Frame has no discriminator"));
    }
    if length > MAX_FRAME_LEN {
        return Err(anyhow::anyhow!(
            "Frame too large: {} bytes (maximum {})",
            length,
            MAX_FRAME_LEN
        ));
    }
    if data.len() < 4 + length {
        return Err(anyhow::anyhow!(
            "Incomplete frame: expected {} bytes, got {}",
            4 + length,
            data.len()
        ));
    }

    Ok(Frame {
        discriminator: data[4],
        payload: &data[FRAME_HEADER_LEN..4 + length],
    })
}

/// Compute a schema hash from the registered message set.
///
/// Both ends must register the same messages under the same discriminators for
/// the hashes to agree.
pub fn compute_schema_hash<'a, I>(messages: I) -> u64
where
    I: IntoIterator<Item = (u8, &'a str)>,
{
    let mut hasher = blake3::Hasher::new();
    hasher.update(&PROTOCOL_VERSION.to_be_bytes());
    for (discriminator, name) in messages {
        hasher.update(&[discriminator]);
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    let hash: Hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_be_bytes(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_hash_deterministic() {
        let a = compute_schema_hash([(0, "command")]);
        let b = compute_schema_hash([(0, "command")]);
        assert_eq!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn test_schema_hash_depends_on_discriminator() {
        let a = compute_schema_hash([(0, "command")]);
        let b = compute_schema_hash([(1, "command")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_encode_decode_frame() {
        let frame = encode_frame(7, b"hello").expect("encode");
        assert_eq!(&frame[..5], &[0, 0, 0, 6, 7]);

        let decoded = decode_frame(&frame).expect("decode");
        assert_eq!(decoded.discriminator, 7);
        assert_eq!(decoded.payload, b"hello");
    }

    #[test]
    fn test_decode_ignores_following_frame() {
        let mut data = encode_frame(1, b"a").unwrap();
        data.extend(encode_frame(2, b"b").unwrap());
        let decoded = decode_frame(&data).unwrap();
        assert_eq!(decoded.payload, b"a");
    }

    #[test]
    fn test_decode_incomplete_frame() {
        let data = vec![0, 0, 0, 10, 0]; // Length says 10 bytes, only 1 present
        assert!(decode_frame(&data).is_err());
    }

    #[test]
    fn test_decode_too_short() {
        assert!(decode_frame(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_decode_zero_length() {
        assert!(decode_frame(&[0, 0, 0, 0, 9]).is_err());
    }
}
