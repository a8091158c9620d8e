use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// PITCH TRACKER
// =============================================================================

/// Tuning for the YIN pitch tracker.
/// Defaults target ~44.1 kHz voice captures; lags are derived from the actual rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    /// First CMNDF dip below this value is taken as the period.
    pub yin_threshold: f32,
    /// Global-minimum fallback is accepted only below this value.
    pub fallback_threshold: f32,
    pub min_f0_hz: f32,
    pub max_f0_hz: f32,
    /// Frame RMS (in i16 units) below which a frame is skipped as silence.
    pub silence_rms: f32,
    pub min_voiced_frames: usize,
    pub low_percentile: f32,
    pub high_percentile: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            yin_threshold: 0.15,
            fallback_threshold: 0.5,
            min_f0_hz: 80.0,
            max_f0_hz: 1000.0,
            silence_rms: 500.0,
            min_voiced_frames: 5,
            low_percentile: 0.10,
            high_percentile: 0.90,
        }
    }
}

impl PitchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_size < 4 || self.hop_size == 0 {
            bail!(
                "pitch frame/hop must be non-zero (frame {}, hop {})",
                self.frame_size,
                self.hop_size
            );
        }
        if !(self.min_f0_hz > 0.0 && self.min_f0_hz < self.max_f0_hz) {
            bail!(
                "pitch range must satisfy 0 < min < max ({} .. {})",
                self.min_f0_hz,
                self.max_f0_hz
            );
        }
        if !(0.0..=1.0).contains(&self.low_percentile)
            || !(0.0..=1.0).contains(&self.high_percentile)
            || self.low_percentile > self.high_percentile
        {
            bail!("pitch percentiles must be ordered within 0..1");
        }
        Ok(())
    }
}

// =============================================================================
// SPECTRAL DENOISER
// =============================================================================

/// Spectral subtraction settings for the fallback denoiser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralDenoiseConfig {
    /// STFT frame size; must be a power of two.
    pub frame_size: usize,
    pub hop_size: usize,
    /// Over-subtraction factor.
    pub alpha: f32,
    /// Spectral floor; gains never drop below this.
    pub floor: f32,
    /// Inputs shorter than `min_frames * frame_size` samples pass through untouched.
    pub min_frames: usize,
    /// Noise reference frames are those at or below sorted RMS `[num_frames / noise_fraction_div]`.
    pub noise_fraction_div: usize,
}

impl Default for SpectralDenoiseConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            alpha: 2.0,
            floor: 0.07,
            min_frames: 4,
            noise_fraction_div: 5,
        }
    }
}

impl SpectralDenoiseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            bail!("spectral frame size {} is not a power of two", self.frame_size);
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            bail!(
                "spectral hop {} must be in 1..={}",
                self.hop_size,
                self.frame_size
            );
        }
        if self.noise_fraction_div == 0 {
            bail!("noise_fraction_div must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.floor) || self.alpha < 0.0 {
            bail!(
                "invalid gain shaping (alpha {}, floor {})",
                self.alpha,
                self.floor
            );
        }
        Ok(())
    }
}

// =============================================================================
// TOP LEVEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pitch: PitchConfig,
    pub spectral: SpectralDenoiseConfig,
}

impl AnalysisConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: AnalysisConfig =
            serde_json::from_str(json).context("failed to parse analysis config JSON")?;
        cfg.pitch.validate().context("invalid pitch config")?;
        cfg.spectral.validate().context("invalid spectral config")?;
        Ok(cfg)
    }

    /// Like [`AnalysisConfig::from_json`], but malformed input is non-fatal and
    /// yields the defaults.
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Using default analysis config: {:#}", e);
                Self::default()
            }
        }
    }
}
