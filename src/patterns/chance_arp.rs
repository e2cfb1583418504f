// Chance-step arpeggiator - probabilistic chord-tone walker
//
// Walks the current chord's tones with chance-driven advancement, rests,
// octave jumps and velocity jitter. Under tension it leans into approach
// notes (chord tone +/- 1 semitone); under hype it plays louder and rests
// less.

use crate::looper::context::{HypeLevel, PatternContext, TensionLevel};
use crate::looper::rng::{entropy_random, RandomSource};
use crate::patterns::{NoteEvent, Pattern, PitchSpec};
use crate::midi::note_name::semitone_from_name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChanceArpParams {
    /// Chance (0..=100) of stepping to the next chord tone.
    pub probability_to_advance: u8,
    /// Chance (0..=100) of playing nothing this step.
    pub rest_probability: u8,
    /// Force advancement when the same tone would repeat.
    pub avoid_repeats: bool,
    /// After playing the root, jump to the top chord tone.
    pub root_jump: bool,
    /// Velocity jitter radius around `base_velocity`.
    pub velocity_variation: u8,
    /// Octave shifts are drawn from 0..octave_range.
    pub octave_range: u8,
    pub base_velocity: u8,
    /// Base probability of replacing the tone with an approach note,
    /// scaled by the tension factor.
    pub tension_approach_prob: f64,
}

impl Default for ChanceArpParams {
    fn default() -> Self {
        Self {
            probability_to_advance: 70,
            rest_probability: 10,
            avoid_repeats: true,
            root_jump: false,
            velocity_variation: 10,
            octave_range: 1,
            base_velocity: 100,
            tension_approach_prob: 0.2,
        }
    }
}

pub struct ChanceArpPattern {
    params: ChanceArpParams,
    current_index: usize,
    last_played: Option<String>,
    random: RandomSource,
}

impl ChanceArpPattern {
    pub fn new(params: ChanceArpParams, random: RandomSource) -> Self {
        let mut params = params;
        params.probability_to_advance = params.probability_to_advance.min(100);
        params.rest_probability = params.rest_probability.min(100);
        params.tension_approach_prob = params.tension_approach_prob.clamp(0.0, 1.0);
        Self {
            params,
            current_index: 0,
            last_played: None,
            random,
        }
    }

    pub fn with_default_random(params: ChanceArpParams) -> Self {
        Self::new(params, entropy_random())
    }

    fn hype_velocity_scale(hype: HypeLevel) -> f64 {
        match hype {
            HypeLevel::Low => 1.0,
            HypeLevel::Medium => 1.1,
            HypeLevel::High => 1.2,
        }
    }
}

impl Pattern for ChanceArpPattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        let Some(chord) = ctx.chord_at(step) else {
            return Vec::new();
        };
        let notes = chord.resolved_note_names(4);
        if notes.is_empty() {
            return Vec::new();
        }
        self.current_index %= notes.len();

        let tension = ctx.tension();
        let hype = ctx.hype();

        // Rest check; high tension halves the rest chance
        let rest_chance = if tension == TensionLevel::High {
            self.params.rest_probability as f64 * 0.5
        } else {
            self.params.rest_probability as f64
        };
        if (self.random)() * 100.0 < rest_chance {
            return Vec::new();
        }

        let mut advance =
            (self.random)() * 100.0 < self.params.probability_to_advance as f64;
        if self.params.avoid_repeats
            && self.last_played.as_deref() == Some(notes[self.current_index].as_str())
        {
            advance = true;
        }

        if self.params.root_jump && self.last_played.as_deref() == Some(notes[0].as_str()) {
            self.current_index = notes.len() - 1;
        } else if advance {
            self.current_index = (self.current_index + 1) % notes.len();
        }

        let name = notes[self.current_index].clone();
        let base = semitone_from_name(&name) as i32;

        let octave_shift =
            12 * ((self.random)() * self.params.octave_range as f64).floor() as i32;

        let jitter = (2.0 * (self.random)() - 1.0) * self.params.velocity_variation as f64;
        let velocity = (self.params.base_velocity as f64 * Self::hype_velocity_scale(hype)
            + jitter)
            .round()
            .clamp(1.0, 127.0) as u8;

        // Approach note: chord tone nudged a semitone, more likely under tension
        let approach_chance =
            (self.params.tension_approach_prob * tension.factor()).min(1.0);
        let mut semitone = base + octave_shift;
        if (self.random)() < approach_chance {
            semitone += if (self.random)() < 0.5 { 1 } else { -1 };
        }

        self.last_played = Some(name);

        vec![NoteEvent {
            pitch: PitchSpec::Semitone(semitone.clamp(0, 127) as u8),
            velocity,
            duration_steps: 1,
        }]
    }

    fn length(&self) -> u32 {
        16
    }

    fn reset(&mut self) {
        self.current_index = 0;
        self.last_played = None;
    }

    fn to_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }
}
