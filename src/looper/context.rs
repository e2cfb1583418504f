// Shared musical context - chord / energy / rhythm collaborators
// Patterns read these through trait objects; a missing collaborator is a
// legal state and degrades to "no notes".

use crate::midi::note_name::{note_name, parse_pitch_class};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

/// A chord as reported by a chord manager.
///
/// `notes` is an explicit voicing; when empty, the voicing is derived from
/// `kind` through the interval table. `duration` is in steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    /// Pitch-class name of the root, e.g. "C", "F#", "Bb".
    pub root: String,
    /// Chord-type tag, e.g. "maj", "min7", "7#9". Unknown tags voice as "maj".
    pub kind: String,
    /// Explicit note names; empty means "derive from kind".
    #[serde(default)]
    pub notes: Vec<String>,
    /// Duration in steps before the next chord.
    #[serde(default = "default_chord_duration")]
    pub duration: u32,
    /// Optional per-note durations (steps), keyed by note name.
    #[serde(default)]
    pub note_durations: HashMap<String, u32>,
}

fn default_chord_duration() -> u32 {
    16
}

impl Chord {
    pub fn new(root: &str, kind: &str) -> Self {
        Self {
            root: root.to_string(),
            kind: kind.to_string(),
            notes: Vec::new(),
            duration: default_chord_duration(),
            note_durations: HashMap::new(),
        }
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration.max(1);
        self
    }

    pub fn with_notes(mut self, notes: &[&str]) -> Self {
        self.notes = notes.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Semitone intervals from the root for this chord's type tag.
    pub fn intervals(&self) -> &'static [u8] {
        chord_intervals(&self.kind)
    }

    /// Pitch class of the root (0..=11); unparseable roots fall back to C.
    pub fn root_pitch_class(&self) -> u8 {
        parse_pitch_class(&self.root).unwrap_or(0)
    }

    /// Note names of this chord voiced at `octave`.
    ///
    /// Explicit `notes` win; otherwise the interval table supplies the tones.
    pub fn resolved_note_names(&self, octave: i8) -> Vec<String> {
        if !self.notes.is_empty() {
            return self.notes.clone();
        }
        let base = 12 * (octave as i32 + 1) + self.root_pitch_class() as i32;
        self.intervals()
            .iter()
            .map(|&interval| {
                let semitone = (base + interval as i32).clamp(0, 127) as u8;
                note_name(semitone)
            })
            .collect()
    }
}

/// Interval table keyed by chord-type tag. Unknown tags fall back to a
/// major triad.
pub fn chord_intervals(kind: &str) -> &'static [u8] {
    match kind {
        "maj" => &[0, 4, 7],
        "min" => &[0, 3, 7],
        "dim" => &[0, 3, 6],
        "aug" => &[0, 4, 8],
        "sus2" => &[0, 2, 7],
        "sus4" => &[0, 5, 7],
        "maj7" => &[0, 4, 7, 11],
        "min7" => &[0, 3, 7, 10],
        "7" => &[0, 4, 7, 10],
        "dim7" => &[0, 3, 6, 9],
        "min7b5" => &[0, 3, 6, 10],
        "aug7" => &[0, 4, 8, 10],
        "9" => &[0, 4, 7, 10, 14],
        "maj9" => &[0, 4, 7, 11, 14],
        "min9" => &[0, 3, 7, 10, 14],
        "7#9" => &[0, 4, 7, 10, 15],
        "7b9" => &[0, 4, 7, 10, 13],
        "7#11" => &[0, 4, 7, 10, 18],
        "maj7#11" => &[0, 4, 7, 11, 18],
        "maj7#5" => &[0, 4, 8, 11],
        "min7b9" => &[0, 3, 7, 10, 13],
        "maj6" => &[0, 4, 7, 9],
        "min6" => &[0, 3, 7, 9],
        _ => &[0, 4, 7],
    }
}

/// Hype scales loudness and activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypeLevel {
    Low,
    Medium,
    High,
}

/// Tension scales dissonance / approach-note probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensionLevel {
    None,
    Low,
    Mid,
    High,
}

impl TensionLevel {
    /// Multiplier applied to embellishment probabilities.
    pub fn factor(&self) -> f64 {
        match self {
            TensionLevel::None => 1.0,
            TensionLevel::Low => 0.5,
            TensionLevel::Mid => 1.5,
            TensionLevel::High => 2.5,
        }
    }
}

pub trait ChordManager {
    /// The chord sounding at `step`, if any.
    fn chord_at(&self, step: u32) -> Option<Chord>;
    /// Note names of the chord considered current.
    fn current_chord_notes(&self) -> Vec<String>;
}

pub trait EnergyManager {
    fn hype_level(&self) -> HypeLevel;
    fn tension_level(&self) -> TensionLevel;
}

pub trait RhythmManager {
    fn is_beat(&self, step: u32) -> bool;
    fn is_downbeat(&self, step: u32) -> bool;
    fn is_offbeat(&self, step: u32) -> bool;
    /// 0 = downbeat, 1 = other beat, 2 = offbeat, 3 = other subdivision.
    fn subdivision(&self, step: u32) -> u8;
}

/// Context handed to every `Pattern::notes_at` call.
///
/// Collaborators are shared across loops; all of them are optional.
#[derive(Clone, Default)]
pub struct PatternContext {
    pub chords: Option<Arc<dyn ChordManager + Send + Sync>>,
    pub energy: Option<Arc<dyn EnergyManager + Send + Sync>>,
    pub rhythm: Option<Arc<dyn RhythmManager + Send + Sync>>,
}

impl PatternContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Hype with the missing-collaborator default (low).
    pub fn hype(&self) -> HypeLevel {
        self.energy
            .as_ref()
            .map(|e| e.hype_level())
            .unwrap_or(HypeLevel::Low)
    }

    /// Tension with the missing-collaborator default (none).
    pub fn tension(&self) -> TensionLevel {
        self.energy
            .as_ref()
            .map(|e| e.tension_level())
            .unwrap_or(TensionLevel::None)
    }

    /// The chord at `step`, when a chord manager is present.
    pub fn chord_at(&self, step: u32) -> Option<Chord> {
        self.chords.as_ref().and_then(|c| c.chord_at(step))
    }
}

/// Fixed chord list cycled by total duration. Carries no harmonic logic;
/// the progression is whatever the caller programmed.
///
/// `chord_at` remembers the queried step so `current_chord_notes` can answer
/// without one.
pub struct ProgressionManager {
    chords: Vec<Chord>,
    total_steps: u32,
    last_step: AtomicU32,
}

impl ProgressionManager {
    pub fn new(chords: Vec<Chord>) -> Self {
        let total_steps = chords.iter().map(|c| c.duration.max(1)).sum::<u32>().max(1);
        Self {
            chords,
            total_steps,
            last_step: AtomicU32::new(0),
        }
    }

    fn chord_index_at(&self, step: u32) -> Option<usize> {
        if self.chords.is_empty() {
            return None;
        }
        let mut position = step % self.total_steps;
        for (index, chord) in self.chords.iter().enumerate() {
            let duration = chord.duration.max(1);
            if position < duration {
                return Some(index);
            }
            position -= duration;
        }
        None
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }
}

impl ChordManager for ProgressionManager {
    fn chord_at(&self, step: u32) -> Option<Chord> {
        self.last_step.store(step, Ordering::Relaxed);
        self.chord_index_at(step).map(|i| self.chords[i].clone())
    }

    fn current_chord_notes(&self) -> Vec<String> {
        let step = self.last_step.load(Ordering::Relaxed);
        self.chord_index_at(step)
            .map(|i| self.chords[i].resolved_note_names(4))
            .unwrap_or_default()
    }
}

/// Step-grid rhythm arithmetic: `steps_per_beat` subdivisions, bars of
/// `beats_per_bar` beats.
pub struct StepRhythm {
    steps_per_beat: u32,
    beats_per_bar: u32,
}

impl StepRhythm {
    pub fn new(steps_per_beat: u32, beats_per_bar: u32) -> Self {
        Self {
            steps_per_beat: steps_per_beat.max(1),
            beats_per_bar: beats_per_bar.max(1),
        }
    }

    /// The common default: 4 steps per beat, 4 beats per bar (16-step bars).
    pub fn sixteenths() -> Self {
        Self::new(4, 4)
    }

    fn steps_per_bar(&self) -> u32 {
        self.steps_per_beat * self.beats_per_bar
    }
}

impl RhythmManager for StepRhythm {
    fn is_beat(&self, step: u32) -> bool {
        step % self.steps_per_beat == 0
    }

    fn is_downbeat(&self, step: u32) -> bool {
        step % self.steps_per_bar() == 0
    }

    fn is_offbeat(&self, step: u32) -> bool {
        step % self.steps_per_beat == self.steps_per_beat / 2 && self.steps_per_beat > 1
    }

    fn subdivision(&self, step: u32) -> u8 {
        if self.is_downbeat(step) {
            0
        } else if self.is_beat(step) {
            1
        } else if self.is_offbeat(step) {
            2
        } else {
            3
        }
    }
}

/// Settable hype/tension levels, shareable across loops.
pub struct EnergyState {
    hype: AtomicU8,
    tension: AtomicU8,
}

impl EnergyState {
    pub fn new(hype: HypeLevel, tension: TensionLevel) -> Self {
        Self {
            hype: AtomicU8::new(hype as u8),
            tension: AtomicU8::new(tension as u8),
        }
    }

    pub fn set_hype(&self, hype: HypeLevel) {
        self.hype.store(hype as u8, Ordering::Relaxed);
    }

    pub fn set_tension(&self, tension: TensionLevel) {
        self.tension.store(tension as u8, Ordering::Relaxed);
    }
}

impl EnergyManager for EnergyState {
    fn hype_level(&self) -> HypeLevel {
        match self.hype.load(Ordering::Relaxed) {
            0 => HypeLevel::Low,
            1 => HypeLevel::Medium,
            _ => HypeLevel::High,
        }
    }

    fn tension_level(&self) -> TensionLevel {
        match self.tension.load(Ordering::Relaxed) {
            0 => TensionLevel::None,
            1 => TensionLevel::Low,
            2 => TensionLevel::Mid,
            _ => TensionLevel::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_duration_default() {
        let chord = Chord::new("C", "maj7");
        assert_eq!(chord.duration, 16);
    }

    #[test]
    fn test_interval_table_known_types() {
        assert_eq!(chord_intervals("maj"), &[0, 4, 7]);
        assert_eq!(chord_intervals("min7"), &[0, 3, 7, 10]);
        assert_eq!(chord_intervals("7#9"), &[0, 4, 7, 10, 15]);
        assert_eq!(chord_intervals("maj6"), &[0, 4, 7, 9]);
    }

    #[test]
    fn test_interval_table_unknown_falls_back_to_major() {
        assert_eq!(chord_intervals("mystery13sus"), &[0, 4, 7]);
    }

    #[test]
    fn test_resolved_notes_from_kind() {
        let chord = Chord::new("C", "maj7");
        assert_eq!(chord.resolved_note_names(4), vec!["C4", "E4", "G4", "B4"]);
    }

    #[test]
    fn test_resolved_notes_explicit_win() {
        let chord = Chord::new("C", "maj").with_notes(&["E4", "G4", "C5"]);
        assert_eq!(chord.resolved_note_names(4), vec!["E4", "G4", "C5"]);
    }

    #[test]
    fn test_progression_cycles() {
        let manager = ProgressionManager::new(vec![
            Chord::new("C", "maj").with_duration(16),
            Chord::new("A", "min").with_duration(16),
        ]);
        assert_eq!(manager.total_steps(), 32);

        assert_eq!(manager.chord_at(0).unwrap().root, "C");
        assert_eq!(manager.chord_at(15).unwrap().root, "C");
        assert_eq!(manager.chord_at(16).unwrap().root, "A");
        assert_eq!(manager.chord_at(32).unwrap().root, "C");
    }

    #[test]
    fn test_progression_current_notes_follow_queries() {
        let manager = ProgressionManager::new(vec![
            Chord::new("C", "maj").with_duration(16),
            Chord::new("A", "min").with_duration(16),
        ]);

        manager.chord_at(0);
        assert_eq!(manager.current_chord_notes(), vec!["C4", "E4", "G4"]);

        manager.chord_at(20);
        assert_eq!(manager.current_chord_notes(), vec!["A4", "C5", "E5"]);
    }

    #[test]
    fn test_progression_empty() {
        let manager = ProgressionManager::new(vec![]);
        assert!(manager.chord_at(0).is_none());
        assert!(manager.current_chord_notes().is_empty());
    }

    #[test]
    fn test_step_rhythm_grid() {
        let rhythm = StepRhythm::sixteenths();

        assert!(rhythm.is_downbeat(0));
        assert!(rhythm.is_downbeat(16));
        assert!(!rhythm.is_downbeat(4));

        assert!(rhythm.is_beat(0));
        assert!(rhythm.is_beat(4));
        assert!(!rhythm.is_beat(3));

        assert!(rhythm.is_offbeat(2));
        assert!(rhythm.is_offbeat(6));
        assert!(!rhythm.is_offbeat(4));

        assert_eq!(rhythm.subdivision(0), 0);
        assert_eq!(rhythm.subdivision(4), 1);
        assert_eq!(rhythm.subdivision(2), 2);
        assert_eq!(rhythm.subdivision(1), 3);
    }

    #[test]
    fn test_energy_state_levels() {
        let energy = EnergyState::new(HypeLevel::Low, TensionLevel::None);
        assert_eq!(energy.hype_level(), HypeLevel::Low);
        assert_eq!(energy.tension_level(), TensionLevel::None);

        energy.set_hype(HypeLevel::High);
        energy.set_tension(TensionLevel::Mid);
        assert_eq!(energy.hype_level(), HypeLevel::High);
        assert_eq!(energy.tension_level(), TensionLevel::Mid);
    }

    #[test]
    fn test_context_defaults_without_energy_manager() {
        let ctx = PatternContext::empty();
        assert_eq!(ctx.hype(), HypeLevel::Low);
        assert_eq!(ctx.tension(), TensionLevel::None);
        assert!(ctx.chord_at(0).is_none());
    }

    #[test]
    fn test_tension_factors() {
        assert_eq!(TensionLevel::None.factor(), 1.0);
        assert_eq!(TensionLevel::Low.factor(), 0.5);
        assert_eq!(TensionLevel::Mid.factor(), 1.5);
        assert_eq!(TensionLevel::High.factor(), 2.5);
    }
}
