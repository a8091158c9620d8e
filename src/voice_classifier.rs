//! Voice type classification from a detected pitch range.
//!
//! Score = overlap ratio (intersection over union, in Hz) minus 0.05 per
//! semitone between the range centers. Canonical ranges: Bass E2-E4,
//! Tenor C3-C5, Alto F3-F5, Soprano C4-C6.

use crate::pitch::{hz_to_midi, hz_to_note_name, note_name_to_hz};
use once_cell::sync::Lazy;
use std::fmt;

const CENTER_PENALTY_PER_SEMITONE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceType {
    Bass,
    Tenor,
    Alto,
    Soprano,
}

impl VoiceType {
    pub fn name(&self) -> &'static str {
        match self {
            VoiceType::Bass => "Bass",
            VoiceType::Tenor => "Tenor",
            VoiceType::Alto => "Alto",
            VoiceType::Soprano => "Soprano",
        }
    }
}

impl fmt::Display for VoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceRangeTemplate {
    pub voice_type: VoiceType,
    pub low_hz: f32,
    pub high_hz: f32,
}

/// Templates in tie-break order.
pub static VOICE_RANGES: Lazy<[VoiceRangeTemplate; 4]> = Lazy::new(|| {
    let t = |voice_type, low: &str, high: &str| VoiceRangeTemplate {
        voice_type,
        low_hz: note_name_to_hz(low),
        high_hz: note_name_to_hz(high),
    };
    [
        t(VoiceType::Bass, "E2", "E4"),
        t(VoiceType::Tenor, "C3", "C5"),
        t(VoiceType::Alto, "F3", "F5"),
        t(VoiceType::Soprano, "C4", "C6"),
    ]
});

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub voice_type: VoiceType,
    pub explanation: String,
    pub score: f32,
}

/// Per-template match terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateScore {
    pub overlap_ratio: f32,
    pub center_distance: f32,
    pub score: f32,
}

pub fn score_template(low_hz: f32, high_hz: f32, template: &VoiceRangeTemplate) -> TemplateScore {
    let overlap = (high_hz.min(template.high_hz) - low_hz.max(template.low_hz)).max(0.0);
    let union = high_hz.max(template.high_hz) - low_hz.min(template.low_hz);
    let overlap_ratio = if union > 0.0 { overlap / union } else { 0.0 };

    let user_mid = hz_to_midi((low_hz + high_hz) / 2.0);
    let template_mid = hz_to_midi((template.low_hz + template.high_hz) / 2.0);
    let center_distance = (user_mid - template_mid).abs();

    TemplateScore {
        overlap_ratio,
        center_distance,
        score: overlap_ratio - CENTER_PENALTY_PER_SEMITONE * center_distance,
    }
}

pub fn classify_voice(low_hz: f32, high_hz: f32) -> ClassificationResult {
    let ranges = &*VOICE_RANGES;
    let mut template = &ranges[0];
    let mut s = score_template(low_hz, high_hz, template);
    for candidate in &ranges[1..] {
        let cs = score_template(low_hz, high_hz, candidate);
        // Strict comparison keeps the earliest template on ties.
        if cs.score > s.score {
            template = candidate;
            s = cs;
        }
    }

    let explanation = format!(
        "Classified as {name}.\n\
         Singing range: {low} - {high}.\n\
         Best match: {name}: overlap={overlap}%, center offset={offset:.1} semitones, score={score:.3}.\n\
         Scoring: overlap ratio minus 0.05×semitone distance from voice center.",
        name = template.voice_type,
        low = hz_to_note_name(low_hz),
        high = hz_to_note_name(high_hz),
        overlap = (s.overlap_ratio * 100.0) as i32,
        offset = s.center_distance,
        score = s.score,
    );

    ClassificationResult {
        voice_type: template.voice_type,
        explanation,
        score: s.score,
    }
}
