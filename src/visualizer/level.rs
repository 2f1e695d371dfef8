//! RMS level of raw PCM chunks.

/// Bytes per sample of the 16-bit stream the decode worker requests.
pub const PCM16_WIDTH: usize = 2;

/// Root-mean-square level of a chunk of signed little-endian mono PCM,
/// normalized to `[0.0, 1.0]`.
///
/// `sample_width` is the number of bytes per sample (1 to 4). A trailing
/// partial sample is ignored. Empty chunks and unsupported widths yield 0.0.
pub fn rms_level(chunk: &[u8], sample_width: usize) -> f32 {
    if !(1..=4).contains(&sample_width) {
        return 0.0;
    }
    let mut count = 0usize;
    let mut sum_squares = 0.0f64;
    for sample in chunk.chunks_exact(sample_width) {
        let value = decode_sample(sample) as f64;
        sum_squares += value * value;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    let full_scale = (1u64 << (sample_width * 8 - 1)) as f64;
    let level = ((sum_squares / count as f64).sqrt() / full_scale) as f32;
    if level.is_nan() {
        return 0.0;
    }
    level.clamp(0.0, 1.0)
}

/// Sign-extend one little-endian sample of 1 to 4 bytes.
fn decode_sample(bytes: &[u8]) -> i32 {
    // Sample bytes land in the high end so the arithmetic shift sign-extends.
    let mut widened = [0u8; 4];
    widened[4 - bytes.len()..].copy_from_slice(bytes);
    i32::from_le_bytes(widened) >> ((4 - bytes.len()) * 8)
}
