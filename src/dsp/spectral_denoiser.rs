//! Spectral Subtraction Denoiser (offline fallback)
//!
//! # Perceptual Contract
//! - **Target Source**: Monophonic vocal takes captured on a phone microphone.
//! - **Intended Effect**: Remove stationary background noise (hiss, hum, room tone) ahead of
//!   clean/residual separation.
//! - **Failure Modes**:
//!   - "Musical noise" if the floor is lowered too far.
//!   - Quiet sustained notes treated as noise when the whole take is loud and dense.
//! - **Will Not Do**:
//!   - Track non-stationary noise; the profile is fixed for the whole recording.
//!
//! # Noise Reduction Model
//! 1. **Framing**: 50%-overlap Hann frames over the full recording.
//! 2. **Noise Profile**: frames at or below the 20th-percentile RMS rank are averaged in the
//!    power domain to form a per-bin noise PSD.
//! 3. **Gain**: `max(floor, 1 - alpha * noise / power)` per bin (over-subtraction with a
//!    spectral floor).
//! 4. **Synthesis**: weighted overlap-add, normalized by the accumulated squared window.
//!
//! Inputs shorter than `min_frames` frames are returned untouched.

use crate::config::SpectralDenoiseConfig;
use crate::dsp::fft::SpectralFft;
use crate::dsp::utils::{make_hann_window, padded_rms_i16, saturate_i16};
use log::{debug, warn};
use rustfft::num_complex::Complex;

// Bin power below this gets the floor gain.
const POWER_EPS: f32 = 1e-10;
// OLA normalization floor.
const OLA_NORM_EPS: f32 = 1e-6;

/// Per-bin average noise power. Scoped to one denoise call.
#[derive(Debug, Clone, PartialEq)]
pub struct NoisePowerProfile {
    pub power: Vec<f32>,
    /// Number of frames averaged into `power`.
    pub frames: usize,
}

pub struct SpectralDenoiser {
    config: SpectralDenoiseConfig,
    fft: SpectralFft,
    window: Vec<f32>,
    spec: Vec<Complex<f32>>,
}

impl SpectralDenoiser {
    pub fn new(config: SpectralDenoiseConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("Invalid spectral denoise config ({:#}), using defaults", e);
                SpectralDenoiseConfig::default()
            }
        };
        Self {
            fft: SpectralFft::new(config.frame_size),
            window: make_hann_window(config.frame_size),
            spec: vec![Complex::new(0.0, 0.0); config.frame_size],
            config,
        }
    }

    pub fn config(&self) -> &SpectralDenoiseConfig {
        &self.config
    }

    fn num_frames(&self, len: usize) -> usize {
        let n = self.config.frame_size;
        if len < n {
            return 0;
        }
        (len - n) / self.config.hop_size + 1
    }

    /// Denoises a whole recording.
    pub fn process(&mut self, samples: &[i16]) -> Vec<i16> {
        let n = self.config.frame_size;
        if samples.len() < n * self.config.min_frames.max(1) {
            debug!(
                "Spectral denoise pass-through: {} samples is under {} frames",
                samples.len(),
                self.config.min_frames
            );
            return samples.to_vec();
        }

        let profile = self.estimate_noise_profile(samples);
        debug!(
            "Noise profile from {} of {} frames",
            profile.frames,
            self.num_frames(samples.len())
        );
        self.apply(samples, &profile)
    }

    /// Averages the power spectra of the quietest frames.
    pub fn estimate_noise_profile(&mut self, samples: &[i16]) -> NoisePowerProfile {
        let n = self.config.frame_size;
        let hop = self.config.hop_size;
        let num_frames = self.num_frames(samples.len());
        let mut power = vec![0.0f32; n];
        if num_frames == 0 {
            return NoisePowerProfile { power, frames: 0 };
        }

        let frame_rms: Vec<f32> = (0..num_frames)
            .map(|fi| padded_rms_i16(samples, fi * hop, n))
            .collect();

        let mut sorted = frame_rms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let threshold = sorted[(num_frames / self.config.noise_fraction_div).min(num_frames - 1)];

        let mut count = 0usize;
        for (fi, &rms) in frame_rms.iter().enumerate() {
            if rms > threshold {
                continue;
            }
            self.load_windowed(samples, fi * hop);
            self.fft.forward(&mut self.spec);
            for (p, c) in power.iter_mut().zip(self.spec.iter()) {
                *p += c.re * c.re + c.im * c.im;
            }
            count += 1;
        }

        if count > 0 {
            let inv = 1.0 / count as f32;
            for p in &mut power {
                *p *= inv;
            }
        }

        NoisePowerProfile {
            power,
            frames: count,
        }
    }

    /// Gain-shapes every frame against `profile` and overlap-adds the result.
    pub fn apply(&mut self, samples: &[i16], profile: &NoisePowerProfile) -> Vec<i16> {
        let n = self.config.frame_size;
        let hop = self.config.hop_size;
        let num_frames = self.num_frames(samples.len());
        let alpha = self.config.alpha;
        let floor = self.config.floor;

        let mut output = vec![0.0f32; samples.len() + n];
        let mut window_energy = vec![0.0f32; samples.len() + n];

        for fi in 0..num_frames {
            let start = fi * hop;
            self.load_windowed(samples, start);
            self.fft.forward(&mut self.spec);

            for (c, &noise) in self.spec.iter_mut().zip(profile.power.iter()) {
                let psd = c.re * c.re + c.im * c.im;
                let gain = if psd > POWER_EPS {
                    (1.0 - alpha * noise / psd).max(floor)
                } else {
                    floor
                };
                *c *= gain;
            }

            self.fft.inverse(&mut self.spec);

            for j in 0..n {
                let w = self.window[j];
                output[start + j] += self.spec[j].re * w;
                window_energy[start + j] += w * w;
            }
        }

        (0..samples.len())
            .map(|i| {
                let v = if window_energy[i] > OLA_NORM_EPS {
                    output[i] / window_energy[i]
                } else {
                    output[i]
                };
                saturate_i16(v)
            })
            .collect()
    }

    fn load_windowed(&mut self, samples: &[i16], start: usize) {
        for (j, c) in self.spec.iter_mut().enumerate() {
            let x = samples.get(start + j).copied().unwrap_or(0) as f32;
            *c = Complex::new(x * self.window[j], 0.0);
        }
    }
}

/// Convenience entry point with the default settings.
pub fn spectral_denoise(samples: &[i16]) -> Vec<i16> {
    SpectralDenoiser::new(SpectralDenoiseConfig::default()).process(samples)
}
