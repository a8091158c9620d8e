//! PCM container plumbing
//!
//! Mono 16-bit PCM in a canonical 44-byte RIFF/WAVE container, plus the
//! sample-domain helpers the pipeline needs (linear resampling, mixing,
//! residual extraction).
//!
//! Decoding is deliberately header-agnostic: the first 44 bytes are skipped and
//! everything after is read as little-endian i16. A byte stream shorter than the
//! header decodes to an empty buffer. Encoding goes through `hound`, which
//! back-patches the RIFF and data sizes when the writer is finalized.
//!
//! All float -> i16 conversions saturate at the i16 bounds; overflow is clipping,
//! never an error.

use crate::dsp::utils::{saturate_i16, saturate_i32_to_i16};
use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

/// Size of the canonical PCM WAVE header.
pub const WAV_HEADER_LEN: usize = 44;
const SAMPLE_RATE_OFFSET: usize = 24;
const BITS_PER_SAMPLE: u16 = 16;
// More channels switch hound to the 68-byte extensible header.
const MAX_PCM_CHANNELS: u16 = 2;

/// Mono i16 samples at a known rate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// =============================================================================
// Container codec
// =============================================================================

/// Strips the 44-byte header and reinterprets the payload as LE i16 samples.
///
/// The sample rate is read from header bytes 24..28. A stream shorter than the
/// header yields an empty buffer with rate 0. A trailing odd byte is ignored.
pub fn decode(bytes: &[u8]) -> SampleBuffer {
    decode_with_rate(bytes, 0)
}

/// [`decode`], reporting `default_rate` when the header is too short to carry one.
pub fn decode_with_rate(bytes: &[u8], default_rate: u32) -> SampleBuffer {
    if bytes.len() < WAV_HEADER_LEN {
        return SampleBuffer::new(Vec::new(), default_rate);
    }
    let rate_bytes = [
        bytes[SAMPLE_RATE_OFFSET],
        bytes[SAMPLE_RATE_OFFSET + 1],
        bytes[SAMPLE_RATE_OFFSET + 2],
        bytes[SAMPLE_RATE_OFFSET + 3],
    ];
    SampleBuffer {
        samples: decode_samples(bytes),
        sample_rate: u32::from_le_bytes(rate_bytes),
    }
}

/// Payload-only variant of [`decode`].
pub fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    if bytes.len() < WAV_HEADER_LEN {
        return Vec::new();
    }
    bytes[WAV_HEADER_LEN..]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Writes `samples` behind a canonical PCM header.
///
/// Byte rate and block align are derived from `channels`; sizes are patched in
/// once the payload has been written. Only mono and stereo fit the plain PCM
/// header; wider layouts would need WAVE_FORMAT_EXTENSIBLE and are rejected.
pub fn encode(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    if !(1..=MAX_PCM_CHANNELS).contains(&channels) {
        bail!(
            "cannot encode {} channels into a {}-byte PCM header",
            channels,
            WAV_HEADER_LEN
        );
    }
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };
    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2);
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)
            .context("failed to start WAV container")?;
        for &s in samples {
            writer
                .write_sample(s)
                .context("failed to write PCM payload")?;
        }
        writer.finalize().context("failed to patch WAV header")?;
    }
    Ok(bytes)
}

// =============================================================================
// Sample-domain helpers
// =============================================================================

/// Linear-interpolation resampler on normalized samples.
///
/// Output length is `round(len * out_rate / in_rate)`, at least 1. Source
/// indices are clamped at the buffer edges. Empty input stays empty.
pub fn resample_linear_f32(input: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if input.is_empty() || in_rate == out_rate || in_rate == 0 || out_rate == 0 {
        return input.to_vec();
    }
    let out_len = ((input.len() as f64 * out_rate as f64 / in_rate as f64).round() as usize).max(1);
    let ratio = in_rate as f64 / out_rate as f64;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx.min(last)];
            let b = input[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

/// [`resample_linear_f32`] in the i16 domain; interpolated values saturate.
pub fn resample_linear(samples: &[i16], in_rate: u32, out_rate: u32) -> Vec<i16> {
    if in_rate == out_rate {
        return samples.to_vec();
    }
    let as_f32: Vec<f32> = samples.iter().map(|&s| s as f32).collect();
    resample_linear_f32(&as_f32, in_rate, out_rate)
        .into_iter()
        .map(|v| saturate_i16(v.round()))
        .collect()
}

/// `alpha * a + (1 - alpha) * b` per sample over the shorter of the two inputs.
pub fn mix(a: &[i16], b: &[i16], alpha: f32) -> Vec<i16> {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| saturate_i16(alpha * x as f32 + (1.0 - alpha) * y as f32))
        .collect()
}

/// Residual noise track: `original - clean`, clamped.
pub fn subtract(original: &[i16], clean: &[i16]) -> Vec<i16> {
    original
        .iter()
        .zip(clean.iter())
        .map(|(&o, &c)| saturate_i32_to_i16(o as i32 - c as i32))
        .collect()
}

// =============================================================================
// File helpers
// =============================================================================

/// Reads a mono 16-bit integer WAV file.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<SampleBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV '{}'", path.display()))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != BITS_PER_SAMPLE {
        bail!(
            "'{}' is not 16-bit integer PCM ({:?}, {} bits)",
            path.display(),
            spec.sample_format,
            spec.bits_per_sample
        );
    }
    if spec.channels != 1 {
        bail!(
            "'{}' has {} channels; only mono is supported",
            path.display(),
            spec.channels
        );
    }
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read samples from '{}'", path.display()))?;
    Ok(SampleBuffer::new(samples, spec.sample_rate))
}

/// Writes mono 16-bit samples to a WAV file.
pub fn write_wav_file(path: impl AsRef<Path>, samples: &[i16], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(samples, sample_rate, 1)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write WAV '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(b: &[u8], off: usize) -> u32 {
        u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
    }

    fn u16_at(b: &[u8], off: usize) -> u16 {
        u16::from_le_bytes([b[off], b[off + 1]])
    }

    #[test]
    fn test_header_layout() {
        let samples = [1i16, -2, 3, i16::MIN, i16::MAX];
        let bytes = encode(&samples, 44100, 1).unwrap();

        assert_eq!(bytes.len(), WAV_HEADER_LEN + samples.len() * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 1);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 44100 * 2);
        assert_eq!(u16_at(&bytes, 32), 2);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40) as usize, samples.len() * 2);
    }

    #[test]
    fn test_round_trip() {
        let samples: Vec<i16> = (0..1000).map(|i| ((i * 73) % 65536 - 32768) as i16).collect();
        let bytes = encode(&samples, 22050, 1).unwrap();
        let decoded = decode(&bytes);
        assert_eq!(decoded.samples, samples);
        assert_eq!(decoded.sample_rate, 22050);
    }

    #[test]
    fn test_empty_round_trip() {
        let bytes = encode(&[], 48000, 1).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        assert!(decode(&bytes).is_empty());
    }

    #[test]
    fn test_short_stream_decodes_empty() {
        let decoded = decode(&[0u8; 43]);
        assert!(decoded.is_empty());
        assert_eq!(decoded.sample_rate, 0);
    }

    #[test]
    fn test_decode_with_rate_defaults_on_short_header() {
        let decoded = decode_with_rate(&[0u8; 20], 16000);
        assert!(decoded.is_empty());
        assert_eq!(decoded.sample_rate, 16000);

        let bytes = encode(&[7, -7, 9], 22050, 1).unwrap();
        let decoded = decode_with_rate(&bytes, 16000);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.samples, vec![7, -7, 9]);
        assert_eq!(decoded.sample_rate, 22050);
    }

    #[test]
    fn test_encode_rejects_extensible_layouts() {
        assert!(encode(&[1, 2, 3, 4, 5, 6], 8000, 3).is_err());
        assert!(encode(&[1, 2], 8000, 0).is_err());

        let stereo = encode(&[1, 2, 3, 4], 8000, 2).unwrap();
        assert_eq!(stereo.len(), WAV_HEADER_LEN + 8);
        assert_eq!(u16_at(&stereo, 20), 1);
        assert_eq!(u16_at(&stereo, 22), 2);
        assert_eq!(u32_at(&stereo, 28), 8000 * 4);
        assert_eq!(u16_at(&stereo, 32), 4);
        assert_eq!(decode_samples(&stereo), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_resample_identity() {
        let x = vec![5i16, -7, 100, 32767, -32768];
        assert_eq!(resample_linear(&x, 16000, 16000), x);
    }

    #[test]
    fn test_resample_length_and_interpolation() {
        let x: Vec<i16> = vec![0, 100, 200, 300];
        let up = resample_linear(&x, 1, 2);
        assert_eq!(up.len(), 8);
        assert_eq!(up[0], 0);
        assert_eq!(up[1], 50);
        assert_eq!(up[2], 100);
        // Tail clamps to the last input sample.
        assert_eq!(up[7], 300);

        let down = resample_linear(&x, 3, 1);
        assert_eq!(down.len(), 1);
    }

    #[test]
    fn test_resample_float_rate_change() {
        let x = vec![0.5f32; 441];
        let y = resample_linear_f32(&x, 44100, 48000);
        assert_eq!(y.len(), 480);
        assert!(y.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_mix_saturates() {
        let a = [30000i16, 10, 0];
        let b = [30000i16, 20];
        assert_eq!(mix(&a, &b, 0.5), vec![30000, 15]);
        assert_eq!(mix(&[i16::MAX], &[i16::MAX], 1.5), vec![i16::MAX]);
    }

    #[test]
    fn test_subtract_reconstructs_original() {
        let original = [1000i16, -2000, 3000, 0];
        let clean = [400i16, -2500, 3000, 7];
        let residual = subtract(&original, &clean);
        for i in 0..original.len() {
            assert_eq!(residual[i] as i32 + clean[i] as i32, original[i] as i32);
        }
        assert_eq!(subtract(&[i16::MIN], &[1]), vec![i16::MIN]);
    }

    #[test]
    fn test_wav_file_round_trip() {
        let path = std::env::temp_dir().join(format!("vocalcore_pcm_{}.wav", std::process::id()));
        let samples: Vec<i16> = (0..256).map(|i| (i * 100) as i16).collect();
        write_wav_file(&path, &samples, 16000).unwrap();
        let buf = read_wav_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(buf.samples, samples);
        assert_eq!(buf.sample_rate, 16000);
        assert!((buf.duration_secs() - 0.016).abs() < 1e-6);
    }
}
