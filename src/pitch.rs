//! YIN pitch tracker
//!
//! Estimates a singer's vocal range from a complete, already captured mono
//! buffer. Each analysis frame runs the YIN difference function and its
//! cumulative mean normalized form (CMNDF); the first dip below the absolute
//! threshold is followed to its local minimum and refined by parabolic
//! interpolation. Voiced estimates are collected across the recording and the
//! low/high percentiles become the reported range.
//!
//! Reference: de Cheveigné & Kawahara (2002), "YIN, a fundamental frequency
//! estimator for speech and music".

use crate::config::PitchConfig;
use crate::dsp::utils::frame_rms;
use log::{debug, warn};

/// Equal-tempered pitch classes, sharps only.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Accepted spellings (sharps and flats) to semitone offset from C.
const NOTE_SEMITONES: [(&str, i32); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

const A4_HZ: f32 = 440.0;
const A4_MIDI: i32 = 69;

/// Detected vocal range. `low_hz <= high_hz`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchRange {
    pub low_hz: f32,
    pub high_hz: f32,
    pub low_note: String,
    pub high_note: String,
}

pub struct PitchTracker {
    config: PitchConfig,
    frame: Vec<f32>,
    diff: Vec<f32>,
    cmndf: Vec<f32>,
}

impl PitchTracker {
    pub fn new(config: PitchConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("Invalid pitch config ({:#}), using defaults", e);
                PitchConfig::default()
            }
        };
        let half = config.frame_size / 2;
        Self {
            frame: vec![0.0; config.frame_size],
            diff: vec![0.0; half],
            cmndf: vec![1.0; half],
            config,
        }
    }

    pub fn config(&self) -> &PitchConfig {
        &self.config
    }

    /// Scans the whole buffer and reports the percentile range of voiced frames,
    /// or `None` when fewer than `min_voiced_frames` estimates survive.
    pub fn analyze(&mut self, samples: &[i16], sample_rate: u32) -> Option<PitchRange> {
        if sample_rate == 0 {
            return None;
        }
        let n = self.config.frame_size;
        let hop = self.config.hop_size;
        let mut pitches: Vec<f32> = Vec::new();

        let mut pos = 0;
        while pos + n <= samples.len() {
            for (dst, &src) in self.frame.iter_mut().zip(&samples[pos..pos + n]) {
                *dst = src as f32;
            }
            pos += hop;

            if frame_rms(&self.frame) < self.config.silence_rms {
                continue;
            }
            if let Some(f0) = self.estimate_frame(sample_rate) {
                if f0 >= self.config.min_f0_hz && f0 <= self.config.max_f0_hz {
                    pitches.push(f0);
                }
            }
        }

        if pitches.len() < self.config.min_voiced_frames.max(1) {
            debug!(
                "No pitch detected: {} voiced frames (need {})",
                pitches.len(),
                self.config.min_voiced_frames
            );
            return None;
        }

        pitches.sort_by(|a, b| a.total_cmp(b));
        let last = pitches.len() - 1;
        let low_idx = ((pitches.len() as f32 * self.config.low_percentile) as usize).min(last);
        let high_idx = ((pitches.len() as f32 * self.config.high_percentile) as usize).min(last);
        let low_hz = pitches[low_idx];
        let high_hz = pitches[high_idx];

        debug!(
            "Pitch range {:.1}..{:.1} Hz from {} voiced frames",
            low_hz,
            high_hz,
            pitches.len()
        );

        Some(PitchRange {
            low_hz,
            high_hz,
            low_note: hz_to_note_name(low_hz),
            high_note: hz_to_note_name(high_hz),
        })
    }

    /// YIN on the frame currently loaded in `self.frame`.
    fn estimate_frame(&mut self, sample_rate: u32) -> Option<f32> {
        let half = self.frame.len() / 2;
        let rate = sample_rate as f32;
        let x = &self.frame;

        // Difference function
        self.diff[0] = 0.0;
        for tau in 1..half {
            let mut sum = 0.0f64;
            for j in 0..half {
                let d = (x[j] - x[j + tau]) as f64;
                sum += d * d;
            }
            self.diff[tau] = sum as f32;
        }

        // Cumulative mean normalized difference
        self.cmndf[0] = 1.0;
        let mut running = 0.0f64;
        for tau in 1..half {
            running += self.diff[tau] as f64;
            self.cmndf[tau] = if running == 0.0 {
                1.0
            } else {
                (self.diff[tau] as f64 * tau as f64 / running) as f32
            };
        }

        let min_tau = ((rate / self.config.max_f0_hz) as usize).max(1);
        let max_tau = ((rate / self.config.min_f0_hz) as usize).min(half.saturating_sub(1));
        if min_tau >= max_tau {
            return None;
        }

        let cmndf = &self.cmndf;

        // Absolute threshold: first dip, followed down to its local minimum.
        let mut tau = min_tau;
        while tau < max_tau {
            if cmndf[tau] < self.config.yin_threshold {
                while tau + 1 < max_tau && cmndf[tau + 1] < cmndf[tau] {
                    tau += 1;
                }
                let refined = parabolic_vertex(cmndf, tau, max_tau);
                return if refined > 0.0 {
                    Some(rate / refined)
                } else {
                    None
                };
            }
            tau += 1;
        }

        // No dip crossed the threshold: accept a sufficiently deep global minimum.
        let mut min_val = f32::MAX;
        let mut min_idx = min_tau;
        for t in min_tau..=max_tau {
            if cmndf[t] < min_val {
                min_val = cmndf[t];
                min_idx = t;
            }
        }
        if min_val < self.config.fallback_threshold && min_idx > 0 {
            Some(rate / min_idx as f32)
        } else {
            None
        }
    }
}

/// Three-point vertex fit around `tau`. Window edges are left unrefined.
fn parabolic_vertex(cmndf: &[f32], tau: usize, max_tau: usize) -> f32 {
    if tau == 0 || tau >= max_tau || tau + 1 >= cmndf.len() {
        return tau as f32;
    }
    let s0 = cmndf[tau - 1];
    let s1 = cmndf[tau];
    let s2 = cmndf[tau + 1];
    let denom = s0 - 2.0 * s1 + s2;
    if denom == 0.0 {
        tau as f32
    } else {
        tau as f32 + (s0 - s2) / (2.0 * denom)
    }
}

/// Convenience entry point with the default tracker settings.
pub fn analyze_pitch(samples: &[i16], sample_rate: u32) -> Option<PitchRange> {
    PitchTracker::new(PitchConfig::default()).analyze(samples, sample_rate)
}

// =============================================================================
// Note naming (A4 = 440 Hz = MIDI 69)
// =============================================================================

/// Fractional MIDI number; 0 for non-positive input.
pub fn hz_to_midi(hz: f32) -> f32 {
    if hz <= 0.0 {
        return 0.0;
    }
    12.0 * (hz / A4_HZ).log2() + A4_MIDI as f32
}

/// e.g. `"A4 (440 Hz)"`. Non-positive input yields `"?"`.
pub fn hz_to_note_name(hz: f32) -> String {
    if hz <= 0.0 {
        return "?".to_string();
    }
    let midi = hz_to_midi(hz).round() as i32;
    let octave = midi.div_euclid(12) - 1;
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    format!("{}{} ({} Hz)", name, octave, hz as i32)
}

/// Parses the first `<letter>[#|b]<octave>` token in `note` (e.g. `"C#3"`,
/// `"Bb-1"`). Returns 0 when nothing parses.
pub fn note_name_to_hz(note: &str) -> f32 {
    let Some((pitch_class, octave)) = find_note_token(note) else {
        return 0.0;
    };
    let Some(&(_, semitone)) = NOTE_SEMITONES.iter().find(|(name, _)| *name == pitch_class) else {
        return 0.0;
    };
    let midi = (octave + 1) * 12 + semitone;
    A4_HZ * 2f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

fn find_note_token(s: &str) -> Option<(&str, i32)> {
    let bytes = s.as_bytes();
    for start in 0..bytes.len() {
        if !(b'A'..=b'G').contains(&bytes[start]) {
            continue;
        }
        let mut end = start + 1;
        if bytes.get(end) == Some(&b'#') {
            end += 1;
        }
        if bytes.get(end) == Some(&b'b') {
            end += 1;
        }
        let mut digits_start = end;
        if bytes.get(digits_start) == Some(&b'-') {
            digits_start += 1;
        }
        let mut digits_end = digits_start;
        while digits_end < bytes.len() && bytes[digits_end].is_ascii_digit() {
            digits_end += 1;
        }
        if digits_end == digits_start {
            continue;
        }
        if let Ok(octave) = s[end..digits_end].parse::<i32>() {
            return Some((&s[start..end], octave));
        }
    }
    None
}
