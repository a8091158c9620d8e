pub mod fft;
pub mod neural;
pub mod spectral_denoiser;
pub mod utils;

pub use fft::SpectralFft;
pub use neural::{default_model, NeuralDenoiser, NeuralError, NeuralSession, UnavailableModel};
#[cfg(feature = "rnnoise")]
pub use neural::RnnoiseModel;
pub use spectral_denoiser::{spectral_denoise, NoisePowerProfile, SpectralDenoiser};
