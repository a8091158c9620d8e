//! Planned complex FFT pair used by the spectral stages.
//!
//! Forward transforms are unscaled; inverse transforms are scaled by `1/N`
//! so that `inverse(forward(x)) == x`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub struct SpectralFft {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    size: usize,
}

impl SpectralFft {
    /// Plans a forward/inverse pair. `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        assert!(
            size >= 2 && size.is_power_of_two(),
            "FFT size must be a power of two >= 2, got {size}"
        );
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            forward,
            inverse,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn forward(&mut self, buf: &mut [Complex<f32>]) {
        debug_assert_eq!(buf.len(), self.size);
        self.forward.process_with_scratch(buf, &mut self.scratch);
    }

    pub fn inverse(&mut self, buf: &mut [Complex<f32>]) {
        debug_assert_eq!(buf.len(), self.size);
        self.inverse.process_with_scratch(buf, &mut self.scratch);
        let inv_n = 1.0 / self.size as f32;
        for c in buf.iter_mut() {
            *c *= inv_n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_rejects_non_power_of_two() {
        let _ = SpectralFft::new(1000);
    }

    #[test]
    fn test_inverse_restores_signal() {
        let mut fft = SpectralFft::new(64);
        assert_eq!(fft.size(), 64);
        let original: Vec<Complex<f32>> = (0..64)
            .map(|i| Complex::new((i as f32 * 0.3).sin(), 0.0))
            .collect();
        let mut buf = original.clone();
        fft.forward(&mut buf);
        fft.inverse(&mut buf);
        for (a, b) in original.iter().zip(buf.iter()) {
            assert!((a.re - b.re).abs() < 1e-4);
            assert!(b.im.abs() < 1e-4);
        }
    }

    #[test]
    fn test_tone_lands_in_expected_bin() {
        let n = 256;
        let mut fft = SpectralFft::new(n);
        let mut buf: Vec<Complex<f32>> = (0..n)
            .map(|i| {
                let x = (2.0 * std::f32::consts::PI * 8.0 * i as f32 / n as f32).cos();
                Complex::new(x, 0.0)
            })
            .collect();
        fft.forward(&mut buf);
        let peak = (0..n / 2)
            .max_by(|&a, &b| buf[a].norm().total_cmp(&buf[b].norm()))
            .unwrap();
        assert_eq!(peak, 8);
    }
}
