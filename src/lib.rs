//! On-device analysis and cleanup for monophonic vocal takes.
//!
//! - [`pitch`]: YIN pitch tracking and vocal range estimation.
//! - [`voice_classifier`]: maps a range onto Bass/Tenor/Alto/Soprano.
//! - [`denoise`]: neural denoising with a spectral subtraction fallback.
//! - [`pcm`]: 16-bit mono WAV container codec and sample helpers.
//!
//! Every entry point is synchronous and works on complete buffers. Callers that
//! need responsiveness run the whole pipeline on their own worker.

pub mod config;
pub mod denoise;
pub mod dsp;
pub mod pcm;
pub mod pitch;
pub mod voice_classifier;

pub use config::{AnalysisConfig, PitchConfig, SpectralDenoiseConfig};
pub use denoise::{denoise, denoise_with_residual, DenoiseOrchestrator, DenoiseStrategy, DenoisedResult};
pub use pcm::{
    decode, decode_samples, decode_with_rate, encode, mix, read_wav_file, resample_linear,
    resample_linear_f32, subtract, write_wav_file, SampleBuffer,
};
pub use pitch::{
    analyze_pitch, hz_to_midi, hz_to_note_name, note_name_to_hz, PitchRange, PitchTracker,
};
pub use voice_classifier::{classify_voice, ClassificationResult, VoiceType};
