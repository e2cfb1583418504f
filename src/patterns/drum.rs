// Drum pattern - per-part hit grid with derived intensity variants
//
// The configured grid is the medium variant. Low and high are derived once
// at construction and stay pinned; the energy manager's hype level picks
// which variant plays.

use crate::looper::context::{HypeLevel, PatternContext};
use crate::looper::rng::{entropy_random, RandomSource};
use crate::patterns::{NoteEvent, Pattern, PitchSpec};
use serde::{Deserialize, Serialize};

const LOW_RETAIN_PROBABILITY: f64 = 0.3;
const HIGH_INSERT_PROBABILITY: f64 = 0.4;
const DRUM_VELOCITY: u8 = 100;

/// One drum voice: a name, its trigger pitch, and the medium-intensity grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrumPartSpec {
    pub name: String,
    /// Hit grid, one entry per step; non-zero means "hit".
    pub hits: Vec<u8>,
    /// Trigger pitch; defaults to C3.
    #[serde(default = "default_drum_pitch")]
    pub pitch: PitchSpec,
}

fn default_drum_pitch() -> PitchSpec {
    PitchSpec::Name("C3".to_string())
}

impl DrumPartSpec {
    pub fn new(name: &str, hits: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            hits,
            pitch: default_drum_pitch(),
        }
    }

    pub fn with_pitch(mut self, pitch: impl Into<PitchSpec>) -> Self {
        self.pitch = pitch.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl From<HypeLevel> for Intensity {
    fn from(hype: HypeLevel) -> Self {
        match hype {
            HypeLevel::Low => Intensity::Low,
            HypeLevel::Medium => Intensity::Medium,
            HypeLevel::High => Intensity::High,
        }
    }
}

#[derive(Debug, Clone)]
struct DrumPart {
    name: String,
    semitone: u8,
    low: Vec<bool>,
    medium: Vec<bool>,
    high: Vec<bool>,
}

impl DrumPart {
    fn variant(&self, intensity: Intensity) -> &[bool] {
        match intensity {
            Intensity::Low => &self.low,
            Intensity::Medium => &self.medium,
            Intensity::High => &self.high,
        }
    }
}

pub struct DrumPattern {
    parts: Vec<DrumPart>,
    pattern_length: u32,
    intensity: Intensity,
}

impl DrumPattern {
    /// Derive the low/high variants from the given medium grids. The same
    /// random source replayed yields identical variants.
    pub fn new(parts: Vec<DrumPartSpec>, pattern_length: u32, mut random: RandomSource) -> Self {
        let pattern_length = pattern_length.max(1);
        let len = pattern_length as usize;

        let parts = parts
            .into_iter()
            .map(|spec| {
                // Tile or truncate the configured grid to the pattern length
                let medium: Vec<bool> = (0..len)
                    .map(|i| {
                        if spec.hits.is_empty() {
                            false
                        } else {
                            spec.hits[i % spec.hits.len()] != 0
                        }
                    })
                    .collect();

                let low: Vec<bool> = medium
                    .iter()
                    .enumerate()
                    .map(|(i, &hit)| {
                        hit && (i % 4 == 0 || random() < LOW_RETAIN_PROBABILITY)
                    })
                    .collect();

                let high: Vec<bool> = medium
                    .iter()
                    .enumerate()
                    .map(|(i, &hit)| {
                        hit || (i % 2 != 0 && random() < HIGH_INSERT_PROBABILITY)
                    })
                    .collect();

                DrumPart {
                    semitone: spec.pitch.semitone(),
                    name: spec.name,
                    low,
                    medium,
                    high,
                }
            })
            .collect();

        Self {
            parts,
            pattern_length,
            intensity: Intensity::Medium,
        }
    }

    pub fn with_default_random(parts: Vec<DrumPartSpec>, pattern_length: u32) -> Self {
        Self::new(parts, pattern_length, entropy_random())
    }

    /// Intensity used when no energy manager is present.
    pub fn set_intensity(&mut self, intensity: Intensity) {
        self.intensity = intensity;
    }

    /// Hit count of one part's variant. Test/inspection hook.
    pub fn hit_count(&self, part_name: &str, intensity: Intensity) -> Option<usize> {
        self.parts
            .iter()
            .find(|part| part.name == part_name)
            .map(|part| part.variant(intensity).iter().filter(|&&hit| hit).count())
    }
}

impl Pattern for DrumPattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        let intensity = match &ctx.energy {
            Some(energy) => Intensity::from(energy.hype_level()),
            None => self.intensity,
        };
        let index = (step % self.pattern_length) as usize;

        self.parts
            .iter()
            .filter(|part| part.variant(intensity)[index])
            .map(|part| NoteEvent {
                pitch: PitchSpec::Semitone(part.semitone),
                velocity: DRUM_VELOCITY,
                duration_steps: 1,
            })
            .collect()
    }

    fn length(&self) -> u32 {
        self.pattern_length
    }

    fn to_config(&self) -> serde_json::Value {
        let parts: Vec<DrumPartSpec> = self
            .parts
            .iter()
            .map(|part| DrumPartSpec {
                name: part.name.clone(),
                hits: part.medium.iter().map(|&hit| hit as u8).collect(),
                pitch: PitchSpec::Semitone(part.semitone),
            })
            .collect();
        serde_json::json!({
            "parts": parts,
            "pattern_length": self.pattern_length,
        })
    }
}
