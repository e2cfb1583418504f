// LiveLoop runtime - the per-loop tick engine
//
// Externally driven: a clock source calls tick(step, dt) and everything
// happens synchronously in a fixed order. The loop owns the active-note
// table; patterns only declare intended durations.

use crate::looper::context::PatternContext;
use crate::looper::lfo::{Lfo, LfoUpdate};
use crate::midi::bus::MidiSink;
use crate::patterns::Pattern;
use std::collections::BTreeMap;

/// A note currently sounding, from the loop's bookkeeping perspective.
///
/// `end_step` is exclusive: the note is retired at the first tick whose
/// step index reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveNote {
    pub semitone: u8,
    pub velocity: u8,
    pub channel: u8,
    pub end_step: u32,
}

/// Construction parameters for a [`LiveLoop`].
pub struct LiveLoopConfig {
    pub pattern: Box<dyn Pattern>,
    pub lfos: Vec<Lfo>,
    /// MIDI channel 1..=16 (clamped).
    pub channel: u8,
    pub context: PatternContext,
    pub muted: bool,
    /// Semitone offset applied to every emitted note.
    pub transpose: i32,
}

impl LiveLoopConfig {
    pub fn new(pattern: Box<dyn Pattern>, channel: u8) -> Self {
        Self {
            pattern,
            lfos: Vec::new(),
            channel,
            context: PatternContext::empty(),
            muted: false,
            transpose: 0,
        }
    }

    pub fn with_context(mut self, context: PatternContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_lfo(mut self, lfo: Lfo) -> Self {
        self.lfos.push(lfo);
        self
    }
}

pub struct LiveLoop {
    pattern: Box<dyn Pattern>,
    pending_pattern: Option<Box<dyn Pattern>>,
    lfos: Vec<Lfo>,
    pending_lfo_updates: Vec<(usize, LfoUpdate)>,
    channel: u8,
    context: PatternContext,
    muted: bool,
    transpose: i32,
    // Keyed by semitone: at most one active note per (channel, semitone),
    // and retirement order is deterministic (ascending pitch).
    active_notes: BTreeMap<u8, ActiveNote>,
}

impl LiveLoop {
    pub fn new(config: LiveLoopConfig) -> Self {
        Self {
            pattern: config.pattern,
            pending_pattern: None,
            lfos: config.lfos,
            pending_lfo_updates: Vec::new(),
            channel: config.channel.clamp(1, 16),
            context: config.context,
            muted: config.muted,
            transpose: config.transpose,
            active_notes: BTreeMap::new(),
        }
    }

    /// Advance one step. `dt` is the wall-clock time since the previous tick,
    /// used only by the LFOs. The tick never fails; malformed pattern output
    /// is dropped.
    pub fn tick(&mut self, step: u32, dt: f64, sink: &mut dyn MidiSink) {
        // 1. Pattern-boundary hot-swap of queued pattern / LFO updates
        let length = self.pattern.length().max(1);
        if step > 0 && step % length == 0 {
            if let Some(pattern) = self.pending_pattern.take() {
                self.pattern = pattern;
            }
            for (index, update) in std::mem::take(&mut self.pending_lfo_updates) {
                if let Some(lfo) = self.lfos.get_mut(index) {
                    lfo.apply_update(&update);
                }
            }
        }

        // 2. Retire expired notes before anything new can trigger. The
        //    noteOff fires regardless of mute so nothing sticks.
        self.retire_expired(step, sink, true);

        // 3. Ask the pattern for this step's notes
        let events = self.pattern.notes_at(step, &self.context);

        // 4. Emit, retriggering same-pitch notes with their own noteOff first
        for event in events {
            let Some(semitone) = event.pitch.try_semitone() else {
                log::warn!("dropping note event with unparseable pitch {:?}", event.pitch);
                continue;
            };
            let note = (semitone as i32 + self.transpose).clamp(0, 127) as u8;

            if self.active_notes.remove(&note).is_some() {
                sink.note_off(self.channel, note);
            }

            let velocity = event.velocity.clamp(1, 127);
            if !self.muted {
                sink.note_on(self.channel, note, velocity);
            }
            self.active_notes.insert(
                note,
                ActiveNote {
                    semitone: note,
                    velocity,
                    channel: self.channel,
                    end_step: step.saturating_add(event.duration_steps),
                },
            );
        }

        // 5. Zero-duration notes release within the same tick
        self.retire_expired(step, sink, !self.muted);

        // 6. LFOs run every tick, independent of pattern output and mute
        for lfo in &mut self.lfos {
            let value = lfo.update(dt);
            sink.control_change(self.channel, lfo.controller(), value);
        }
    }

    fn retire_expired(&mut self, step: u32, sink: &mut dyn MidiSink, emit_off: bool) {
        let expired: Vec<u8> = self
            .active_notes
            .iter()
            .filter(|(_, note)| step >= note.end_step)
            .map(|(&key, _)| key)
            .collect();
        for key in expired {
            self.active_notes.remove(&key);
            if emit_off {
                sink.note_off(self.channel, key);
            }
        }
    }

    /// Replace the pattern now, or at the next pattern boundary.
    pub fn set_pattern(&mut self, pattern: Box<dyn Pattern>, immediate: bool) {
        if immediate {
            self.pattern = pattern;
            self.pending_pattern = None;
        } else {
            self.pending_pattern = Some(pattern);
        }
    }

    pub fn add_lfo(&mut self, lfo: Lfo) {
        self.lfos.push(lfo);
    }

    /// Update one LFO's parameters now, or at the next pattern boundary.
    /// Indexes past the end are ignored.
    pub fn update_lfo(&mut self, index: usize, update: LfoUpdate, immediate: bool) {
        if immediate {
            if let Some(lfo) = self.lfos.get_mut(index) {
                lfo.apply_update(&update);
            }
        } else {
            self.pending_lfo_updates.push((index, update));
        }
    }

    /// Takes effect on the subsequent tick, never retroactively.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_transpose(&mut self, transpose: i32) {
        self.transpose = transpose;
    }

    /// Force silence: noteOff for every tracked note, table cleared.
    /// Idempotent.
    pub fn stop_all(&mut self, sink: &mut dyn MidiSink) {
        let notes: Vec<u8> = self.active_notes.keys().copied().collect();
        for note in notes {
            sink.note_off(self.channel, note);
        }
        self.active_notes.clear();
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    pub fn pattern_length(&self) -> u32 {
        self.pattern.length()
    }

    pub fn has_pending_pattern(&self) -> bool {
        self.pending_pattern.is_some()
    }

    pub fn lfo_count(&self) -> usize {
        self.lfos.len()
    }

    pub fn active_note_count(&self) -> usize {
        self.active_notes.len()
    }

    pub fn active_notes(&self) -> impl Iterator<Item = &ActiveNote> {
        self.active_notes.values()
    }
}
