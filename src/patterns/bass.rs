// Syncopated bass - genre-seeded multi-step event grid with density shaping
//
// The grid stores, per step, either 0 (rest/continuation) or N: an event
// starting here that covers the next N steps. Density shaping inserts or
// removes whole events and never breaks an existing one.

use crate::looper::context::{HypeLevel, PatternContext, TensionLevel};
use crate::looper::rng::{entropy_random, RandomSource};
use crate::midi::note_name::semitone_from_name;
use crate::patterns::{NoteEvent, Pattern, PitchSpec};
use serde::{Deserialize, Serialize};

const BASS_BASE_VELOCITY: i32 = 90;
const TWO_STEP_PROBABILITY: f64 = 0.3;
const TENSION_SHIFT_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Funk,
    Latin,
    Reggae,
    HipHop,
    Rock,
    House,
    Afrobeat,
}

impl Genre {
    /// 16-step seed grid. Events never cross the 16-step boundary, so the
    /// grid tiles cleanly.
    fn seed(&self) -> [u8; 16] {
        match self {
            Genre::Funk => [2, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0],
            Genre::Latin => [1, 0, 0, 2, 0, 0, 1, 0, 0, 0, 2, 0, 0, 1, 0, 0],
            Genre::Reggae => [0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 1, 0],
            Genre::HipHop => [2, 0, 0, 0, 0, 0, 1, 0, 0, 2, 0, 0, 0, 0, 0, 1],
            Genre::Rock => [2, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0],
            Genre::House => [1, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 0],
            Genre::Afrobeat => [1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncopatedBassParams {
    pub pattern_length: u32,
    pub genre: Genre,
    /// Octave the bass is forced into.
    pub octave: i8,
    /// Fraction of steps that should carry an event, 0.0 to 1.0.
    pub density: f64,
}

impl Default for SyncopatedBassParams {
    fn default() -> Self {
        Self {
            pattern_length: 16,
            genre: Genre::Funk,
            octave: 2,
            density: 0.4,
        }
    }
}

pub struct SyncopatedBassPattern {
    params: SyncopatedBassParams,
    grid: Vec<u8>,
    random: RandomSource,
}

impl SyncopatedBassPattern {
    pub fn new(params: SyncopatedBassParams, mut random: RandomSource) -> Self {
        let mut params = params;
        params.pattern_length = params.pattern_length.max(1);
        params.density = params.density.clamp(0.0, 1.0);

        let grid = Self::build_grid(&params, &mut random);
        Self {
            params,
            grid,
            random,
        }
    }

    pub fn with_default_random(params: SyncopatedBassParams) -> Self {
        Self::new(params, entropy_random())
    }

    fn build_grid(params: &SyncopatedBassParams, random: &mut RandomSource) -> Vec<u8> {
        let len = params.pattern_length as usize;
        let seed = params.genre.seed();

        // Tile (longer) or truncate (shorter), clamping any event that would
        // overflow the trimmed end
        let mut grid: Vec<u8> = (0..len).map(|i| seed[i % 16]).collect();
        for i in 0..len {
            let duration = grid[i] as usize;
            if duration > len - i {
                grid[i] = (len - i) as u8;
            }
        }

        if params.density == 0.0 {
            grid.iter_mut().for_each(|step| *step = 0);
            return grid;
        }

        if params.density >= 1.0 {
            Self::fill_gaps(&mut grid, random);
            return grid;
        }

        let target = (len as f64 * params.density).floor() as usize;

        // Thin: drop uniformly chosen events until at the target
        let mut starts = event_starts(&grid);
        while starts.len() > target {
            let victim = (random() * starts.len() as f64).floor() as usize % starts.len();
            grid[starts[victim]] = 0;
            starts.remove(victim);
        }

        // Grow: bounded random placement, then a deterministic sweep for
        // whatever the retries missed
        let mut count = starts.len();
        let mut attempts = 0;
        while count < target && attempts < 8 * len {
            attempts += 1;
            let position = (random() * len as f64).floor() as usize % len;
            if covered(&grid, position) {
                continue;
            }
            grid[position] = Self::draw_duration(&grid, position, random);
            count += 1;
        }
        let mut position = 0;
        while count < target && position < len {
            if !covered(&grid, position) {
                grid[position] = Self::draw_duration(&grid, position, random);
                count += 1;
            }
            position += 1;
        }

        grid
    }

    /// Duration for a newly inserted event at `position`: 2 with probability
    /// 0.3 when two contiguous free steps exist, otherwise 1.
    fn draw_duration(grid: &[u8], position: usize, random: &mut RandomSource) -> u8 {
        let has_room = position + 1 < grid.len() && !covered(grid, position + 1);
        if has_room && random() < TWO_STEP_PROBABILITY {
            2
        } else {
            1
        }
    }

    fn fill_gaps(grid: &mut Vec<u8>, random: &mut RandomSource) {
        let mut position = 0;
        while position < grid.len() {
            if covered(grid, position) {
                position += 1;
                continue;
            }
            let duration = Self::draw_duration(grid, position, random);
            grid[position] = duration;
            position += duration as usize;
        }
    }

    /// The shaped event grid. Entry N > 0 starts an N-step event.
    pub fn pattern_array(&self) -> &[u8] {
        &self.grid
    }

    pub fn event_count(&self) -> usize {
        event_starts(&self.grid).len()
    }

    /// Weighted chord-tone choice: root 50%, third 30%, fifth 15%,
    /// extension 5%. Missing tones fold back to the root.
    fn choose_tone(notes_len: usize, roll: f64) -> usize {
        let index = if roll < 0.5 {
            0
        } else if roll < 0.8 {
            1
        } else if roll < 0.95 {
            2
        } else {
            3
        };
        if index < notes_len { index } else { 0 }
    }
}

fn event_starts(grid: &[u8]) -> Vec<usize> {
    grid.iter()
        .enumerate()
        .filter(|&(_, &duration)| duration > 0)
        .map(|(i, _)| i)
        .collect()
}

/// Whether `position` falls inside any event's span (including its start).
fn covered(grid: &[u8], position: usize) -> bool {
    grid.iter()
        .enumerate()
        .take(position + 1)
        .any(|(i, &duration)| duration > 0 && i + duration as usize > position)
}

impl Pattern for SyncopatedBassPattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        let index = (step % self.params.pattern_length) as usize;
        let duration = self.grid[index];
        if duration == 0 {
            return Vec::new();
        }

        let Some(chords) = &ctx.chords else {
            return Vec::new();
        };
        let notes = chords.current_chord_notes();
        if notes.is_empty() {
            return Vec::new();
        }

        let tone = Self::choose_tone(notes.len(), (self.random)());
        let mut semitone = semitone_from_name(&notes[tone]) as i32;

        if ctx.tension() == TensionLevel::High && (self.random)() < TENSION_SHIFT_PROBABILITY {
            semitone += if (self.random)() < 0.5 { 1 } else { -1 };
        }

        // Force into the configured octave
        let pitch_class = semitone.rem_euclid(12);
        let pitch = (pitch_class + 12 * (self.params.octave as i32 + 1)).clamp(0, 127) as u8;

        let mut velocity = BASS_BASE_VELOCITY;
        match ctx.hype() {
            HypeLevel::Low => {}
            HypeLevel::Medium => velocity += 10,
            HypeLevel::High => velocity += 20,
        }
        if let Some(rhythm) = &ctx.rhythm {
            if rhythm.is_downbeat(step) {
                velocity += 10;
            } else if rhythm.is_offbeat(step) {
                velocity -= 10;
            }
        }

        vec![NoteEvent {
            pitch: PitchSpec::Semitone(pitch),
            velocity: velocity.clamp(1, 127) as u8,
            duration_steps: duration as u32,
        }]
    }

    fn length(&self) -> u32 {
        self.params.pattern_length
    }

    fn to_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }
}
