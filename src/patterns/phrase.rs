// Phrase-contour melody - multi-bar phrase-structured melodic generator
//
// A phrase is divided into named sub-sections, each with its own pitch
// direction, note-length range and dynamics, plus a trailing cadence that
// holds the low chord tone into the next phrase. The pattern tracks its own
// holds so a sustained note is not re-triggered; the runtime owns the
// noteOff via the emitted duration.

use crate::looper::context::PatternContext;
use crate::looper::rng::{entropy_random, RandomSource};
use crate::midi::note_name::semitone_from_name;
use crate::patterns::{NoteEvent, Pattern, PitchSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubSection {
    Intro,
    Build,
    Peak,
    Plateau,
    Fall,
    Resolve,
    Cadence,
    Bridge,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PitchDirection {
    MildAscend,
    Ascend,
    High,
    UpperStable,
    Descend,
    StableLow,
    RootHold,
    Wander,
    Repeat,
}

struct SectionPreset {
    direction: PitchDirection,
    duration_beats: (f64, f64),
    velocity_factor: f64,
    velocity_jitter: f64,
}

impl SubSection {
    fn preset(&self) -> SectionPreset {
        use PitchDirection::*;
        let (direction, duration_beats, velocity_factor, velocity_jitter) = match self {
            SubSection::Intro => (MildAscend, (0.5, 1.0), 0.9, 5.0),
            SubSection::Build => (Ascend, (0.25, 0.5), 1.0, 10.0),
            SubSection::Peak => (High, (0.75, 1.5), 1.2, 5.0),
            SubSection::Plateau => (UpperStable, (0.5, 1.0), 1.1, 5.0),
            SubSection::Fall => (Descend, (0.5, 1.0), 1.0, 8.0),
            SubSection::Resolve => (StableLow, (0.5, 1.0), 0.9, 5.0),
            SubSection::Cadence => (RootHold, (2.0, 2.0), 0.8, 3.0),
            SubSection::Bridge => (Wander, (0.25, 0.75), 1.0, 10.0),
            SubSection::Tag => (Repeat, (0.5, 1.0), 1.0, 5.0),
        };
        SectionPreset {
            direction,
            duration_beats,
            velocity_factor,
            velocity_jitter,
        }
    }
}

/// Velocity/density scalar per hype level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypeDynamics {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for HypeDynamics {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 1.2,
            high: 1.4,
        }
    }
}

impl HypeDynamics {
    fn scale(&self, hype: crate::looper::context::HypeLevel) -> f64 {
        use crate::looper::context::HypeLevel;
        match hype {
            HypeLevel::Low => self.low,
            HypeLevel::Medium => self.medium,
            HypeLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseContourParams {
    pub phrase_bars: u32,
    pub sub_sections: Vec<SubSection>,
    pub steps_per_bar: u32,
    /// Length of the closing cadence, in beats (4 beats per bar).
    pub cadence_beats: f64,
    /// Fraction of eligible steps that start a note, 0.0 to 1.0.
    pub melodic_density: f64,
    pub base_velocity: u8,
    /// Base probability of a +/-1 semitone embellishment, scaled by tension.
    pub tension_embellish_prob: f64,
    pub hype_dynamics: HypeDynamics,
}

impl Default for PhraseContourParams {
    fn default() -> Self {
        Self {
            phrase_bars: 4,
            sub_sections: vec![SubSection::Build, SubSection::Peak, SubSection::Resolve],
            steps_per_bar: 16,
            cadence_beats: 2.0,
            melodic_density: 0.7,
            base_velocity: 96,
            tension_embellish_prob: 0.15,
            hype_dynamics: HypeDynamics::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: u32,
    end: u32,
    section: SubSection,
}

pub struct PhraseContourPattern {
    params: PhraseContourParams,
    segments: Vec<Segment>,
    total_steps: u32,
    cadence_start: u32,
    /// End steps (phrase-local, exclusive) of notes this pattern started.
    holds: Vec<u32>,
    last_local: u32,
    random: RandomSource,
}

impl PhraseContourPattern {
    pub fn new(params: PhraseContourParams, random: RandomSource) -> Self {
        let mut params = params;
        params.phrase_bars = params.phrase_bars.max(1);
        params.steps_per_bar = params.steps_per_bar.max(1);
        params.melodic_density = params.melodic_density.clamp(0.0, 1.0);
        params.tension_embellish_prob = params.tension_embellish_prob.clamp(0.0, 1.0);
        params.cadence_beats = params.cadence_beats.max(0.0);
        if params.sub_sections.is_empty() {
            params.sub_sections.push(SubSection::Build);
        }

        let total_steps = params.phrase_bars * params.steps_per_bar;
        let steps_per_beat = params.steps_per_bar as f64 / 4.0;
        let cadence_steps =
            ((params.cadence_beats * steps_per_beat).floor() as u32).min(total_steps);
        let main_steps = total_steps - cadence_steps;

        // Contiguous sub-section segments over the main zone, last absorbs
        // the remainder, then the trailing cadence
        let mut segments = Vec::new();
        let count = params.sub_sections.len() as u32;
        let per_section = main_steps / count;
        let mut cursor = 0;
        for (index, &section) in params.sub_sections.iter().enumerate() {
            let end = if index as u32 == count - 1 {
                main_steps
            } else {
                cursor + per_section
            };
            segments.push(Segment {
                start: cursor,
                end,
                section,
            });
            cursor = end;
        }
        if cadence_steps > 0 {
            segments.push(Segment {
                start: main_steps,
                end: total_steps,
                section: SubSection::Cadence,
            });
        }

        Self {
            params,
            segments,
            total_steps,
            cadence_start: main_steps,
            holds: Vec::new(),
            last_local: 0,
            random,
        }
    }

    pub fn with_default_random(params: PhraseContourParams) -> Self {
        Self::new(params, entropy_random())
    }

    fn section_at(&self, local_step: u32) -> SubSection {
        self.segments
            .iter()
            .find(|segment| local_step >= segment.start && local_step < segment.end)
            .map(|segment| segment.section)
            .unwrap_or(SubSection::Build)
    }

    fn pick_target(&mut self, direction: PitchDirection, sorted: &[u8]) -> u8 {
        use PitchDirection::*;
        let len = sorted.len();
        let index = match direction {
            Ascend | High => len - 1,
            Descend | StableLow | RootHold => 0,
            UpperStable => len.saturating_sub(2),
            Repeat => len / 2,
            MildAscend => {
                let half_start = len / 2;
                let half_len = len - half_start;
                half_start + (((self.random)() * half_len as f64).floor() as usize).min(half_len - 1)
            }
            Wander => (((self.random)() * len as f64).floor() as usize).min(len - 1),
        };
        sorted[index]
    }

    /// Segment table, for inspection/tests: (start, end, section).
    pub fn segment_spans(&self) -> Vec<(u32, u32, SubSection)> {
        self.segments
            .iter()
            .map(|segment| (segment.start, segment.end, segment.section))
            .collect()
    }
}

impl Pattern for PhraseContourPattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        let local = step % self.total_steps;

        // Phrase wrap invalidates holds from the previous phrase
        if local < self.last_local {
            self.holds.clear();
        }
        self.last_local = local;

        self.holds.retain(|&end| end > local);
        if !self.holds.is_empty() {
            // A sustained note still covers this step
            return Vec::new();
        }

        let Some(chord) = ctx.chord_at(step) else {
            return Vec::new();
        };
        let names = chord.resolved_note_names(4);
        if names.is_empty() {
            return Vec::new();
        }

        let tension = ctx.tension();
        let hype_scale = self.params.hype_dynamics.scale(ctx.hype());
        let embellish_chance =
            (self.params.tension_embellish_prob * tension.factor()).min(1.0);
        let scaled_density = (self.params.melodic_density * hype_scale).min(1.0);

        let in_cadence = local >= self.cadence_start;

        // Rest roll; the cadence zone always sounds
        if !in_cadence && (self.random)() >= scaled_density {
            return Vec::new();
        }

        let section = if in_cadence {
            SubSection::Cadence
        } else {
            self.section_at(local)
        };
        let preset = section.preset();

        let mut sorted: Vec<u8> = names.iter().map(|name| semitone_from_name(name)).collect();
        sorted.sort_unstable();
        let mut semitone = self.pick_target(preset.direction, &sorted) as i32;

        if (self.random)() < embellish_chance {
            semitone += if (self.random)() < 0.5 { 1 } else { -1 };
        }

        let jitter = preset.velocity_jitter * ((self.random)() - 0.5);
        let velocity = (self.params.base_velocity as f64 * hype_scale * preset.velocity_factor
            + jitter)
            .round()
            .clamp(1.0, 127.0) as u8;

        let steps_per_beat = self.params.steps_per_bar as f64 / 4.0;
        let (lo, hi) = preset.duration_beats;
        let duration_beats = lo + (self.random)() * (hi - lo);
        let mut duration_steps = ((duration_beats * steps_per_beat).floor() as u32).max(1);
        if in_cadence {
            // Hold to the end of the phrase
            duration_steps = self.total_steps - local;
        }
        duration_steps = duration_steps.min(self.total_steps - local);

        self.holds.push(local + duration_steps);

        vec![NoteEvent {
            pitch: PitchSpec::Semitone(semitone.clamp(0, 127) as u8),
            velocity,
            duration_steps,
        }]
    }

    fn length(&self) -> u32 {
        self.total_steps
    }

    fn reset(&mut self) {
        self.holds.clear();
        self.last_local = 0;
    }

    fn to_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::context::{
        Chord, ChordManager, EnergyManager, EnergyState, HypeLevel, ProgressionManager,
        TensionLevel,
    };
    use crate::looper::rng::{fixed_random, seeded_random};
    use std::sync::Arc;

    fn c_major_context() -> PatternContext {
        let chords = vec![Chord::new("C", "maj")
            .with_notes(&["C4", "E4", "G4"])
            .with_duration(64)];
        PatternContext {
            chords: Some(Arc::new(ProgressionManager::new(chords))
                as Arc<dyn ChordManager + Send + Sync>),
            ..PatternContext::empty()
        }
    }

    fn dense_params() -> PhraseContourParams {
        PhraseContourParams {
            melodic_density: 1.0,
            tension_embellish_prob: 0.0,
            ..PhraseContourParams::default()
        }
    }

    #[test]
    fn test_segment_map_default() {
        let pattern =
            PhraseContourPattern::new(PhraseContourParams::default(), fixed_random(vec![0.5]));
        // 64 steps total, 8-step cadence, 56 main over 3 sections
        let spans = pattern.segment_spans();
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0], (0, 18, SubSection::Build));
        assert_eq!(spans[1], (18, 36, SubSection::Peak));
        // Last section absorbs the remainder
        assert_eq!(spans[2], (36, 56, SubSection::Resolve));
        assert_eq!(spans[3], (56, 64, SubSection::Cadence));
        assert_eq!(pattern.length(), 64);
    }

    #[test]
    fn test_build_section_picks_top_tone() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let ctx = c_major_context();

        // Step 0 is in the build section: top tone G4
        let events = pattern.notes_at(0, &ctx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pitch.semitone(), 67);
    }

    #[test]
    fn test_hold_suppresses_retrigger() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let ctx = c_major_context();

        let events = pattern.notes_at(0, &ctx);
        let duration = events[0].duration_steps;
        assert!(duration >= 1);

        for step in 1..duration {
            assert!(
                pattern.notes_at(step, &ctx).is_empty(),
                "expected hold at step {}",
                step
            );
        }
        assert!(!pattern.notes_at(duration, &ctx).is_empty());
    }

    #[test]
    fn test_cadence_holds_bottom_tone_to_phrase_end() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let ctx = c_major_context();

        // Straight into the cadence zone (starts at 56)
        let events = pattern.notes_at(56, &ctx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pitch.semitone(), 60); // root hold -> bottom
        assert_eq!(events[0].duration_steps, 8); // to phrase end
    }

    #[test]
    fn test_cadence_ignores_rest_roll() {
        let params = PhraseContourParams {
            melodic_density: 0.0,
            tension_embellish_prob: 0.0,
            ..PhraseContourParams::default()
        };
        let mut pattern = PhraseContourPattern::new(params, fixed_random(vec![0.99]));
        let ctx = c_major_context();

        // Density zero rests everywhere in the main zone
        assert!(pattern.notes_at(0, &ctx).is_empty());
        // The cadence still sounds
        assert!(!pattern.notes_at(56, &ctx).is_empty());
    }

    #[test]
    fn test_phrase_wrap_clears_holds() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let ctx = c_major_context();

        // Cadence hold covers through step 63
        pattern.notes_at(56, &ctx);
        assert!(pattern.notes_at(60, &ctx).is_empty());

        // Next phrase starts fresh
        let events = pattern.notes_at(64, &ctx);
        assert!(!events.is_empty());
    }

    #[test]
    fn test_note_never_crosses_phrase_end() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let ctx = c_major_context();

        for step in 0..256u32 {
            let local = step % 64;
            for event in pattern.notes_at(step, &ctx) {
                assert!(
                    local + event.duration_steps <= 64,
                    "step {}: duration {} crosses phrase end",
                    step,
                    event.duration_steps
                );
            }
        }
    }

    #[test]
    fn test_missing_chord_manager_is_silent() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        assert!(pattern.notes_at(0, &PatternContext::empty()).is_empty());
    }

    #[test]
    fn test_embellish_under_tension() {
        let energy = Arc::new(EnergyState::new(HypeLevel::Low, TensionLevel::High));
        let mut ctx = c_major_context();
        ctx.energy = Some(energy as Arc<dyn EnergyManager + Send + Sync>);

        let params = PhraseContourParams {
            melodic_density: 1.0,
            tension_embellish_prob: 0.3,
            ..PhraseContourParams::default()
        };
        // Draws: rest 0.0, embellish 0.5 < 0.75, sign 0.0 -> +1
        let mut pattern =
            PhraseContourPattern::new(params, fixed_random(vec![0.0, 0.5, 0.0, 0.5, 0.5]));
        let events = pattern.notes_at(0, &ctx);
        assert_eq!(events[0].pitch.semitone(), 68);
    }

    #[test]
    fn test_hype_scales_velocity() {
        let energy = Arc::new(EnergyState::new(HypeLevel::High, TensionLevel::None));
        let mut ctx = c_major_context();
        ctx.energy = Some(energy as Arc<dyn EnergyManager + Send + Sync>);

        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let events = pattern.notes_at(0, &ctx);
        // 96 * 1.4 hype * 1.0 build factor + 10 * (0.5 - 0.5) = 134 -> clamped
        assert_eq!(events[0].velocity, 127);
    }

    #[test]
    fn test_determinism_with_seeded_source() {
        let run = |seed: u64| {
            let mut pattern =
                PhraseContourPattern::new(PhraseContourParams::default(), seeded_random(seed));
            let ctx = c_major_context();
            (0..256).map(|step| pattern.notes_at(step, &ctx)).collect::<Vec<_>>()
        };
        assert_eq!(run(21), run(21));
    }

    #[test]
    fn test_reset_clears_holds() {
        let mut pattern = PhraseContourPattern::new(dense_params(), fixed_random(vec![0.5]));
        let ctx = c_major_context();

        pattern.notes_at(0, &ctx);
        pattern.reset();
        assert!(!pattern.notes_at(1, &ctx).is_empty());
    }
}
