//! Neural Denoise Layer (external frame model)
//!
//! The neural denoiser is consumed as a black box: a fixed native sample rate,
//! a fixed frame size, and a per-frame transform on normalized f32 samples in
//! [-1, 1] that also reports a voiced confidence.
//!
//! Design constraints
//! - Capability probe up front: callers check `is_available()` once and pick a strategy.
//! - Scoped sessions: a model instance lives exactly as long as its `NeuralSession` value;
//!   dropping the session releases it, on success and on failure alike.
//! - No session is shared between invocations.
//!
//! Backends
//! - `RnnoiseModel` (feature `rnnoise`): RNNoise via the pure-Rust `nnnoiseless` port,
//!   480-sample frames at 48 kHz.
//! - `UnavailableModel`: always reports unavailable; used when no backend is compiled in.

use log::info;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeuralError {
    /// No backend compiled in or it failed its capability probe.
    Unavailable,
    /// A model instance could not be allocated.
    SessionCreateFailed(String),
    /// Frame processing failed mid-stream.
    FrameFailed(String),
}

impl fmt::Display for NeuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuralError::Unavailable => write!(f, "neural denoiser unavailable"),
            NeuralError::SessionCreateFailed(msg) => {
                write!(f, "failed to create neural denoiser session: {}", msg)
            }
            NeuralError::FrameFailed(msg) => write!(f, "neural frame processing failed: {}", msg),
        }
    }
}

impl std::error::Error for NeuralError {}

/// A live model instance. Dropping it releases the instance.
pub trait NeuralSession {
    /// Transforms exactly one frame. Returns the model's voiced confidence (0..1).
    fn process_frame(&mut self, input: &[f32], output: &mut [f32]) -> Result<f32, NeuralError>;
}

/// Capability surface of an external frame denoiser.
pub trait NeuralDenoiser {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Native sample rate the model expects (Hz).
    fn sample_rate(&self) -> u32;

    /// Fixed frame length in samples.
    fn frame_size(&self) -> usize;

    fn create_session(&self) -> Result<Box<dyn NeuralSession + '_>, NeuralError>;
}

// -----------------------------------------------------------------------------
// Unavailable backend
// -----------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableModel;

impl NeuralDenoiser for UnavailableModel {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn sample_rate(&self) -> u32 {
        48_000
    }

    fn frame_size(&self) -> usize {
        480
    }

    fn create_session(&self) -> Result<Box<dyn NeuralSession + '_>, NeuralError> {
        Err(NeuralError::Unavailable)
    }
}

// -----------------------------------------------------------------------------
// RNNoise backend
// -----------------------------------------------------------------------------

#[cfg(feature = "rnnoise")]
mod rnnoise_backend {
    use super::{NeuralDenoiser, NeuralError, NeuralSession};
    use crate::dsp::utils::I16_SCALE;
    use nnnoiseless::DenoiseState;

    const RNNOISE_RATE: u32 = 48_000;

    /// RNNoise through `nnnoiseless`. The model works in i16-scaled floats, so
    /// frames are rescaled on the way in and out.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RnnoiseModel;

    struct RnnoiseSession {
        state: Box<DenoiseState<'static>>,
        scaled_in: Vec<f32>,
        scaled_out: Vec<f32>,
    }

    impl NeuralSession for RnnoiseSession {
        fn process_frame(&mut self, input: &[f32], output: &mut [f32]) -> Result<f32, NeuralError> {
            if input.len() != DenoiseState::FRAME_SIZE || output.len() != DenoiseState::FRAME_SIZE {
                return Err(NeuralError::FrameFailed(format!(
                    "expected {} samples, got {} in / {} out",
                    DenoiseState::FRAME_SIZE,
                    input.len(),
                    output.len()
                )));
            }
            for (dst, &src) in self.scaled_in.iter_mut().zip(input) {
                *dst = src * I16_SCALE;
            }
            let vad = self.state.process_frame(&mut self.scaled_out, &self.scaled_in);
            for (dst, &src) in output.iter_mut().zip(&self.scaled_out) {
                *dst = src / I16_SCALE;
            }
            Ok(vad)
        }
    }

    impl NeuralDenoiser for RnnoiseModel {
        fn name(&self) -> &'static str {
            "rnnoise"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn sample_rate(&self) -> u32 {
            RNNOISE_RATE
        }

        fn frame_size(&self) -> usize {
            DenoiseState::FRAME_SIZE
        }

        fn create_session(&self) -> Result<Box<dyn NeuralSession + '_>, NeuralError> {
            Ok(Box::new(RnnoiseSession {
                state: DenoiseState::new(),
                scaled_in: vec![0.0; DenoiseState::FRAME_SIZE],
                scaled_out: vec![0.0; DenoiseState::FRAME_SIZE],
            }))
        }
    }
}

#[cfg(feature = "rnnoise")]
pub use rnnoise_backend::RnnoiseModel;

/// The best backend compiled into this build.
pub fn default_model() -> Box<dyn NeuralDenoiser> {
    #[cfg(feature = "rnnoise")]
    {
        info!("Neural denoiser backend: rnnoise");
        Box::new(RnnoiseModel)
    }
    #[cfg(not(feature = "rnnoise"))]
    {
        info!("Neural denoiser backend: none compiled in");
        Box::new(UnavailableModel)
    }
}
