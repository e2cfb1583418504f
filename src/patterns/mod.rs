// Pattern module - the pluggable note generators a LiveLoop runs

pub mod bass;
pub mod chance_arp;
pub mod chord;
pub mod drum;
pub mod explicit;
pub mod meta;
pub mod phrase;

pub use bass::{Genre, SyncopatedBassParams, SyncopatedBassPattern};
pub use chance_arp::{ChanceArpParams, ChanceArpPattern};
pub use chord::{ChordPattern, ChordPatternParams, Voicing};
pub use drum::{DrumPartSpec, DrumPattern, Intensity};
pub use explicit::ExplicitPattern;
pub use meta::MetaPhrasePattern;
pub use phrase::{PhraseContourParams, PhraseContourPattern, SubSection};

use crate::looper::context::PatternContext;
use crate::midi::note_name::{parse_note_name, semitone_from_name};
use serde::{Deserialize, Serialize};

/// A pitch given either as a scientific name or a raw semitone.
///
/// Semitones are preferred internally; names are resolved once at the point
/// of emission to keep string parsing out of hot paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PitchSpec {
    Semitone(u8),
    Name(String),
}

impl PitchSpec {
    /// Strict resolution; `None` when a name does not parse.
    pub fn try_semitone(&self) -> Option<u8> {
        match self {
            PitchSpec::Semitone(semitone) => Some(*semitone),
            PitchSpec::Name(name) => parse_note_name(name),
        }
    }

    /// Lenient resolution with the codec's middle-C fallback.
    pub fn semitone(&self) -> u8 {
        match self {
            PitchSpec::Semitone(semitone) => *semitone,
            PitchSpec::Name(name) => semitone_from_name(name),
        }
    }
}

impl From<u8> for PitchSpec {
    fn from(semitone: u8) -> Self {
        PitchSpec::Semitone(semitone)
    }
}

impl From<&str> for PitchSpec {
    fn from(name: &str) -> Self {
        PitchSpec::Name(name.to_string())
    }
}

impl From<String> for PitchSpec {
    fn from(name: String) -> Self {
        PitchSpec::Name(name)
    }
}

/// A note a pattern wants triggered at the current step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: PitchSpec,
    /// 1..=127. Defaults to 100.
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    /// Steps until release. Zero means "trigger then release this tick".
    /// `duration` is accepted as a legacy alias when deserializing.
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_steps: u32,
}

fn default_velocity() -> u8 {
    100
}

fn default_duration() -> u32 {
    1
}

impl NoteEvent {
    pub fn new(pitch: impl Into<PitchSpec>) -> Self {
        Self {
            pitch: pitch.into(),
            velocity: default_velocity(),
            duration_steps: default_duration(),
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_duration(mut self, duration_steps: u32) -> Self {
        self.duration_steps = duration_steps;
        self
    }
}

/// The two-method contract every pattern satisfies.
///
/// `notes_at` may update the pattern's own traversal state but must not
/// mutate the context. With an injected random source and fixed manager
/// outputs, its results are reproducible across runs.
pub trait Pattern: Send {
    /// Notes to trigger at `step`. Missing collaborators yield no notes.
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent>;

    /// Steps before intrinsic repetition (>= 1). Effectively-infinite
    /// patterns report a finite length for boundary scheduling.
    fn length(&self) -> u32;

    /// Rewind internal traversal state, where a pattern has any.
    fn reset(&mut self) {}

    /// Structural parameters for configuration UIs.
    fn to_config(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
