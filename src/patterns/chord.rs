// Chord pattern - triggers whole voicings at chord-duration boundaries

use crate::looper::context::{Chord, PatternContext};
use crate::midi::note_name::semitone_from_name;
use crate::patterns::{NoteEvent, Pattern, PitchSpec};
use serde::{Deserialize, Serialize};

/// Octave distribution applied to the chord tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voicing {
    /// Tones as given by the interval table.
    Close,
    /// Third raised an octave (triads only).
    Open,
    /// Tones fanned out over multiple octaves.
    Spread,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordPatternParams {
    pub voicing: Voicing,
    /// Octave the root lands in when the chord supplies no explicit notes.
    pub octave: i8,
    /// Velocity per trigger, cycled: trigger 0 of the cycle gets index 0.
    pub velocities: Vec<u8>,
    /// Reported pattern length for boundary scheduling.
    pub length: u32,
}

impl Default for ChordPatternParams {
    fn default() -> Self {
        Self {
            voicing: Voicing::Close,
            octave: 4,
            velocities: vec![120, 90, 90, 90],
            length: 16,
        }
    }
}

/// Emits the current chord's voicing whenever the step lands on a
/// chord-duration boundary; silent otherwise.
#[derive(Debug, Clone)]
pub struct ChordPattern {
    params: ChordPatternParams,
}

impl ChordPattern {
    pub fn new(params: ChordPatternParams) -> Self {
        let mut params = params;
        if params.velocities.is_empty() {
            params.velocities.push(90);
        }
        for velocity in &mut params.velocities {
            *velocity = (*velocity).clamp(1, 127);
        }
        params.length = params.length.max(1);
        Self { params }
    }

    pub fn with_voicing(voicing: Voicing) -> Self {
        Self::new(ChordPatternParams {
            voicing,
            ..ChordPatternParams::default()
        })
    }

    fn voicing_shift(&self, index: usize, tone_count: usize) -> i32 {
        match self.params.voicing {
            Voicing::Close => 0,
            Voicing::Open => {
                if tone_count == 3 && index == 1 {
                    12
                } else {
                    0
                }
            }
            Voicing::Spread => {
                if tone_count == 3 {
                    12 * index as i32
                } else if index == 0 {
                    0
                } else {
                    12 * ((index as i32 + 1) / 2)
                }
            }
        }
    }

    fn voiced_semitones(&self, chord: &Chord) -> Vec<u8> {
        let base = 12 * (self.params.octave as i32 + 1) + chord.root_pitch_class() as i32;
        let intervals = chord.intervals();
        intervals
            .iter()
            .enumerate()
            .map(|(index, &interval)| {
                let shift = self.voicing_shift(index, intervals.len());
                (base + interval as i32 + shift).clamp(0, 127) as u8
            })
            .collect()
    }
}

impl Pattern for ChordPattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        let Some(chord) = ctx.chord_at(step) else {
            return Vec::new();
        };
        let duration = chord.duration.max(1);
        if step % duration != 0 {
            return Vec::new();
        }

        let trigger = (step / duration) as usize;
        let velocity = self.params.velocities[trigger % self.params.velocities.len()];

        if !chord.notes.is_empty() {
            // Explicit voicing: resolve names, honour per-note durations
            chord
                .notes
                .iter()
                .map(|name| {
                    let steps = chord
                        .note_durations
                        .get(name)
                        .copied()
                        .unwrap_or(duration);
                    NoteEvent {
                        pitch: PitchSpec::Semitone(semitone_from_name(name)),
                        velocity,
                        duration_steps: steps,
                    }
                })
                .collect()
        } else {
            self.voiced_semitones(&chord)
                .into_iter()
                .map(|semitone| NoteEvent {
                    pitch: PitchSpec::Semitone(semitone),
                    velocity,
                    duration_steps: duration,
                })
                .collect()
        }
    }

    fn length(&self) -> u32 {
        self.params.length
    }

    fn to_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }
}
