// Shared numeric helpers for the analysis and denoise paths.

/// Full-scale divisor used when mapping i16 samples into [-1, 1].
pub const I16_SCALE: f32 = 32768.0;

/// Periodic Hann window of length `len` (suitable for 50% overlap STFT).
pub fn make_hann_window(len: usize) -> Vec<f32> {
    let n = len.max(1) as f32;
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n).cos()))
        .collect()
}

pub fn frame_rms(x: &[f32]) -> f32 {
    let mut s = 0.0f32;
    for &v in x {
        s += v * v;
    }
    (s / (x.len().max(1) as f32)).sqrt()
}

/// RMS over a window of `len` samples starting at `start`; samples past the
/// end of `x` count as zero.
pub fn padded_rms_i16(x: &[i16], start: usize, len: usize) -> f32 {
    let mut s = 0.0f64;
    for j in 0..len {
        let v = x.get(start + j).copied().unwrap_or(0) as f64;
        s += v * v;
    }
    (s / len.max(1) as f64).sqrt() as f32
}

/// Saturating truncation into the i16 range. NaN maps to zero.
#[inline]
pub fn saturate_i16(v: f32) -> i16 {
    // `as` casts from float saturate at the integer bounds and truncate toward zero.
    v as i16
}

#[inline]
pub fn saturate_i32_to_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

pub fn i16_to_f32(input: &[i16]) -> Vec<f32> {
    input.iter().map(|&s| s as f32 / I16_SCALE).collect()
}

/// Scales normalized samples back to i16, keeping at most `out_len` of them.
pub fn f32_to_i16(input: &[f32], out_len: usize) -> Vec<i16> {
    input
        .iter()
        .take(out_len)
        .map(|&s| saturate_i16(s * I16_SCALE))
        .collect()
}
