//! Denoise orchestration
//!
//! Picks one of two strategies when the orchestrator is built:
//! - `ExternalModel`: resample to the model rate, zero-pad to whole frames, run the frames
//!   through a scoped model session, then trim and resample back.
//! - `SpectralFallback`: the FFT spectral subtraction denoiser on the original samples.
//!
//! A failing external run is routed to the spectral path on the original input. The
//! failure cause is logged and dropped; callers always get samples back.

use crate::config::SpectralDenoiseConfig;
use crate::dsp::neural::{default_model, NeuralDenoiser, NeuralError};
use crate::dsp::spectral_denoiser::SpectralDenoiser;
use crate::dsp::utils::{f32_to_i16, i16_to_f32};
use crate::pcm::{decode_samples, resample_linear_f32, subtract};
use log::{debug, info, warn};

/// Clean vocal plus the residual (`original - clean`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DenoisedResult {
    pub clean: Vec<i16>,
    pub residual: Vec<i16>,
}

pub enum DenoiseStrategy<'m> {
    ExternalModel(&'m dyn NeuralDenoiser),
    SpectralFallback,
}

impl DenoiseStrategy<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            DenoiseStrategy::ExternalModel(model) => model.name(),
            DenoiseStrategy::SpectralFallback => "spectral",
        }
    }
}

pub struct DenoiseOrchestrator<'m> {
    strategy: DenoiseStrategy<'m>,
    spectral: SpectralDenoiseConfig,
}

impl<'m> DenoiseOrchestrator<'m> {
    /// Probes `model` once and fixes the strategy for this orchestrator.
    pub fn new(model: &'m dyn NeuralDenoiser, spectral: SpectralDenoiseConfig) -> Self {
        let strategy = if model.is_available() {
            DenoiseStrategy::ExternalModel(model)
        } else {
            DenoiseStrategy::SpectralFallback
        };
        info!("Denoise strategy: {}", strategy.name());
        Self { strategy, spectral }
    }

    pub fn strategy(&self) -> &DenoiseStrategy<'m> {
        &self.strategy
    }

    /// Decodes a container and denoises its samples.
    pub fn denoise(&self, container: &[u8], source_rate: u32) -> Vec<i16> {
        self.denoise_samples(&decode_samples(container), source_rate)
    }

    pub fn denoise_samples(&self, samples: &[i16], source_rate: u32) -> Vec<i16> {
        if samples.is_empty() {
            return Vec::new();
        }
        match &self.strategy {
            DenoiseStrategy::SpectralFallback => self.spectral_path(samples),
            DenoiseStrategy::ExternalModel(model) => {
                match run_external(*model, samples, source_rate) {
                    Ok(clean) => clean,
                    Err(e) => {
                        warn!(
                            "Neural denoiser '{}' failed ({}), falling back to spectral",
                            model.name(),
                            e
                        );
                        self.spectral_path(samples)
                    }
                }
            }
        }
    }

    /// [`DenoiseOrchestrator::denoise`] plus the residual noise track.
    pub fn denoise_with_residual(&self, container: &[u8], source_rate: u32) -> DenoisedResult {
        let original = decode_samples(container);
        let clean = self.denoise_samples(&original, source_rate);
        let residual = subtract(&original, &clean);
        DenoisedResult { clean, residual }
    }

    fn spectral_path(&self, samples: &[i16]) -> Vec<i16> {
        SpectralDenoiser::new(self.spectral).process(samples)
    }
}

fn run_external(
    model: &dyn NeuralDenoiser,
    samples: &[i16],
    source_rate: u32,
) -> Result<Vec<i16>, NeuralError> {
    let model_rate = model.sample_rate();
    let frame = model.frame_size();
    if frame == 0 {
        return Err(NeuralError::FrameFailed("model reports zero frame size".into()));
    }

    let normalized = i16_to_f32(samples);
    let mut input = if source_rate == model_rate {
        normalized
    } else {
        resample_linear_f32(&normalized, source_rate, model_rate)
    };
    let unpadded_len = input.len();
    let padded_len = unpadded_len.div_ceil(frame) * frame;
    input.resize(padded_len, 0.0);

    let mut denoised = vec![0.0f32; padded_len];
    let mut confidence_sum = 0.0f32;
    {
        let mut session = model.create_session()?;
        for (src, dst) in input.chunks_exact(frame).zip(denoised.chunks_exact_mut(frame)) {
            confidence_sum += session.process_frame(src, dst)?;
        }
    }
    let frames = padded_len / frame;
    debug!(
        "Neural denoiser '{}': {} frames, mean voiced confidence {:.3}",
        model.name(),
        frames,
        confidence_sum / frames.max(1) as f32
    );

    denoised.truncate(unpadded_len);
    let restored = if source_rate == model_rate {
        denoised
    } else {
        resample_linear_f32(&denoised, model_rate, source_rate)
    };

    let mut clean = f32_to_i16(&restored, samples.len());
    // Rate round-trips can land one sample short.
    clean.resize(samples.len(), 0);
    Ok(clean)
}

/// Denoises a container with the best compiled-in model and default settings.
pub fn denoise(container: &[u8], source_rate: u32) -> Vec<i16> {
    let model = default_model();
    DenoiseOrchestrator::new(model.as_ref(), SpectralDenoiseConfig::default())
        .denoise(container, source_rate)
}

/// [`denoise`] plus the residual noise track.
pub fn denoise_with_residual(container: &[u8], source_rate: u32) -> DenoisedResult {
    let model = default_model();
    DenoiseOrchestrator::new(model.as_ref(), SpectralDenoiseConfig::default())
        .denoise_with_residual(container, source_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::neural::{NeuralSession, UnavailableModel};
    use crate::dsp::spectral_denoiser::spectral_denoise;
    use crate::pcm::encode;
    use std::cell::Cell;

    /// Frame model that halves its input and counts session lifetimes.
    struct ScriptedModel {
        rate: u32,
        frame: usize,
        fail_create: bool,
        fail_at_frame: Option<usize>,
        created: Cell<usize>,
        released: Cell<usize>,
        frames_seen: Cell<usize>,
    }

    impl ScriptedModel {
        fn new(rate: u32, frame: usize) -> Self {
            Self {
                rate,
                frame,
                fail_create: false,
                fail_at_frame: None,
                created: Cell::new(0),
                released: Cell::new(0),
                frames_seen: Cell::new(0),
            }
        }
    }

    struct ScriptedSession<'a> {
        model: &'a ScriptedModel,
        index: usize,
    }

    impl NeuralSession for ScriptedSession<'_> {
        fn process_frame(&mut self, input: &[f32], output: &mut [f32]) -> Result<f32, NeuralError> {
            assert_eq!(input.len(), self.model.frame);
            if self.model.fail_at_frame == Some(self.index) {
                return Err(NeuralError::FrameFailed("scripted".into()));
            }
            self.index += 1;
            self.model.frames_seen.set(self.model.frames_seen.get() + 1);
            for (o, &i) in output.iter_mut().zip(input) {
                *o = i * 0.5;
            }
            Ok(0.9)
        }
    }

    impl Drop for ScriptedSession<'_> {
        fn drop(&mut self) {
            self.model.released.set(self.model.released.get() + 1);
        }
    }

    impl NeuralDenoiser for ScriptedModel {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn frame_size(&self) -> usize {
            self.frame
        }

        fn create_session(&self) -> Result<Box<dyn NeuralSession + '_>, NeuralError> {
            if self.fail_create {
                return Err(NeuralError::SessionCreateFailed("scripted".into()));
            }
            self.created.set(self.created.get() + 1);
            Ok(Box::new(ScriptedSession {
                model: self,
                index: 0,
            }))
        }
    }

    fn test_signal(len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| ((i as f32 * 0.05).sin() * 8000.0 + ((i * 7919) % 601) as f32 - 300.0) as i16)
            .collect()
    }

    #[test]
    fn test_unavailable_model_matches_spectral() {
        let samples = test_signal(20000);
        let container = encode(&samples, 44100, 1).unwrap();
        let model = UnavailableModel;
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        assert!(matches!(
            orchestrator.strategy(),
            DenoiseStrategy::SpectralFallback
        ));
        assert_eq!(
            orchestrator.denoise(&container, 44100),
            spectral_denoise(&samples)
        );
    }

    #[test]
    fn test_empty_input_short_circuits() {
        let model = ScriptedModel::new(48000, 480);
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        assert!(orchestrator.denoise(&[], 48000).is_empty());
        assert!(orchestrator.denoise(&encode(&[], 48000, 1).unwrap(), 48000).is_empty());
        assert_eq!(model.created.get(), 0);
    }

    #[test]
    fn test_external_path_same_rate() {
        let model = ScriptedModel::new(48000, 480);
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        let samples = test_signal(1000);
        let clean = orchestrator.denoise_samples(&samples, 48000);

        assert_eq!(clean.len(), samples.len());
        // 1000 samples pad to three 480-sample frames.
        assert_eq!(model.frames_seen.get(), 3);
        assert_eq!(model.created.get(), 1);
        assert_eq!(model.released.get(), 1);
        for (c, s) in clean.iter().zip(&samples) {
            assert!((*c as i32 - *s as i32 / 2).abs() <= 1);
        }
    }

    #[test]
    fn test_external_path_resamples() {
        let model = ScriptedModel::new(48000, 480);
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        let samples = vec![10000i16; 4410];
        let clean = orchestrator.denoise_samples(&samples, 44100);

        assert_eq!(clean.len(), samples.len());
        // 4410 samples at 44.1k -> 4800 at 48k -> exactly ten frames.
        assert_eq!(model.frames_seen.get(), 10);
        assert!(clean.iter().all(|&c| (c - 5000).abs() <= 1));
    }

    #[test]
    fn test_session_failure_falls_back_and_releases() {
        let mut model = ScriptedModel::new(48000, 480);
        model.fail_at_frame = Some(2);
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        let samples = test_signal(20000);
        let clean = orchestrator.denoise_samples(&samples, 48000);

        assert_eq!(clean, spectral_denoise(&samples));
        assert_eq!(model.created.get(), 1);
        assert_eq!(model.released.get(), 1);
    }

    #[test]
    fn test_create_failure_falls_back() {
        let mut model = ScriptedModel::new(48000, 480);
        model.fail_create = true;
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        let samples = test_signal(20000);
        assert_eq!(
            orchestrator.denoise_samples(&samples, 48000),
            spectral_denoise(&samples)
        );
        assert_eq!(model.released.get(), 0);
    }

    #[test]
    fn test_residual_plus_clean_restores_original() {
        let model = ScriptedModel::new(48000, 480);
        let orchestrator = DenoiseOrchestrator::new(&model, SpectralDenoiseConfig::default());
        let samples = test_signal(3000);
        let container = encode(&samples, 48000, 1).unwrap();
        let result = orchestrator.denoise_with_residual(&container, 48000);

        assert_eq!(result.clean.len(), samples.len());
        assert_eq!(result.residual.len(), samples.len());
        for i in 0..samples.len() {
            assert_eq!(
                result.clean[i] as i32 + result.residual[i] as i32,
                samples[i] as i32
            );
        }
    }
}
