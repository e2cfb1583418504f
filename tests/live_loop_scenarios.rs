//! End-to-end LiveLoop scenarios
//!
//! Drives full loops through the public API and checks the emitted MIDI
//! stream against the tick contract: noteOn/noteOff pairing, retirement
//! ordering, mute isolation, transpose clamping and boundary hot-swaps.

use looplab::looper::context::{Chord, ChordManager, PatternContext, ProgressionManager};
use looplab::looper::live_loop::{LiveLoop, LiveLoopConfig};
use looplab::midi::bus::EventRecorder;
use looplab::midi::event::MidiEvent;
use looplab::patterns::chord::{ChordPattern, Voicing};
use looplab::patterns::{NoteEvent, Pattern};
use std::sync::Arc;

/// Emits its configured events on step 0 only; silent forever after.
struct OnceAtZero {
    events: Vec<NoteEvent>,
}

impl Pattern for OnceAtZero {
    fn notes_at(&mut self, step: u32, _ctx: &PatternContext) -> Vec<NoteEvent> {
        if step == 0 {
            self.events.clone()
        } else {
            Vec::new()
        }
    }

    fn length(&self) -> u32 {
        16
    }
}

/// Emits one fixed note every step.
struct Always {
    pitch: &'static str,
    duration: u32,
    length: u32,
}

impl Pattern for Always {
    fn notes_at(&mut self, _step: u32, _ctx: &PatternContext) -> Vec<NoteEvent> {
        vec![NoteEvent::new(self.pitch).with_duration(self.duration)]
    }

    fn length(&self) -> u32 {
        self.length
    }
}

fn note_ons(events: &[MidiEvent]) -> Vec<(u8, u8, u8)> {
    events
        .iter()
        .filter_map(|e| match e {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => Some((*channel, *note, *velocity)),
            _ => None,
        })
        .collect()
}

fn note_offs(events: &[MidiEvent]) -> Vec<(u8, u8)> {
    events
        .iter()
        .filter_map(|e| match e {
            MidiEvent::NoteOff { channel, note } => Some((*channel, *note)),
            _ => None,
        })
        .collect()
}

#[test]
fn simple_note_with_automatic_release() {
    // E1: one C4 at step 0, duration 1
    let mut looper = LiveLoop::new(LiveLoopConfig::new(
        Box::new(OnceAtZero {
            events: vec![NoteEvent::new("C4").with_velocity(80)],
        }),
        1,
    ));
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    assert_eq!(
        recorder.events(),
        &[MidiEvent::NoteOn {
            channel: 1,
            note: 60,
            velocity: 80
        }]
    );
    assert_eq!(looper.active_note_count(), 1);

    looper.tick(1, 0.0, &mut recorder);
    assert_eq!(
        recorder.events()[1],
        MidiEvent::NoteOff {
            channel: 1,
            note: 60
        }
    );
    assert_eq!(looper.active_note_count(), 0);
}

#[test]
fn transpose_clamps_at_range_top() {
    // E2: resolved semitone 126, transpose +5
    let mut looper = LiveLoop::new(LiveLoopConfig::new(
        Box::new(OnceAtZero {
            events: vec![NoteEvent::new(126u8)],
        }),
        1,
    ));
    looper.set_transpose(5);
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    assert_eq!(note_ons(recorder.events()), vec![(1, 127, 100)]);
}

#[test]
fn retrigger_before_expiry_pairs_correctly() {
    // E3: C4 dur 3 at step 0, then C4 dur 2 at step 1
    struct TwoTriggers;
    impl Pattern for TwoTriggers {
        fn notes_at(&mut self, step: u32, _ctx: &PatternContext) -> Vec<NoteEvent> {
            match step {
                0 => vec![NoteEvent::new("C4").with_duration(3)],
                1 => vec![NoteEvent::new("C4").with_duration(2)],
                _ => Vec::new(),
            }
        }
        fn length(&self) -> u32 {
            16
        }
    }

    let mut looper = LiveLoop::new(LiveLoopConfig::new(Box::new(TwoTriggers), 1));
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    looper.tick(1, 0.0, &mut recorder);

    assert_eq!(
        recorder.events(),
        &[
            MidiEvent::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            },
            // Retrigger: the old instance is released first
            MidiEvent::NoteOff {
                channel: 1,
                note: 60
            },
            MidiEvent::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            },
        ]
    );

    // The retriggered note ends at step 1 + 2
    let note = looper.active_notes().next().unwrap();
    assert_eq!(note.end_step, 3);
}

#[test]
fn queued_swap_waits_for_pattern_boundary() {
    // E4: pattern A length 8 emits C4; queue B (length 4, G4) at step 2
    let mut looper = LiveLoop::new(LiveLoopConfig::new(
        Box::new(Always {
            pitch: "C4",
            duration: 1,
            length: 8,
        }),
        1,
    ));
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    looper.tick(1, 0.0, &mut recorder);
    looper.set_pattern(
        Box::new(Always {
            pitch: "G4",
            duration: 1,
            length: 4,
        }),
        false,
    );

    for step in 2..8 {
        looper.tick(step, 0.0, &mut recorder);
    }
    // Steps 2..7 still play C4
    assert!(note_ons(recorder.events()).iter().all(|&(_, note, _)| note == 60));

    looper.tick(8, 0.0, &mut recorder);
    let ons = note_ons(recorder.events());
    assert_eq!(ons.last().unwrap().1, 67);
}

#[test]
fn chord_trigger_lifecycle() {
    // E6: Cmaj7 every 16 steps, close voicing
    let progression = ProgressionManager::new(vec![Chord::new("C", "maj7").with_duration(16)]);
    let context = PatternContext {
        chords: Some(Arc::new(progression) as Arc<dyn ChordManager + Send + Sync>),
        ..PatternContext::empty()
    };
    let mut looper = LiveLoop::new(
        LiveLoopConfig::new(
            Box::new(ChordPattern::with_voicing(Voicing::Close)),
            1,
        )
        .with_context(context),
    );
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    let ons: Vec<u8> = note_ons(recorder.events()).iter().map(|&(_, n, _)| n).collect();
    assert_eq!(ons, vec![60, 64, 67, 71]);
    assert_eq!(looper.active_note_count(), 4);

    // Nothing new between boundaries
    for step in 1..16 {
        looper.tick(step, 0.0, &mut recorder);
        assert_eq!(note_ons(recorder.events()).len(), 4, "step {}", step);
    }

    recorder.clear();
    looper.tick(16, 0.0, &mut recorder);

    // All four noteOffs precede the four re-triggered noteOns
    let events = recorder.events();
    assert_eq!(note_offs(events), vec![(1, 60), (1, 64), (1, 67), (1, 71)]);
    assert_eq!(note_ons(events).len(), 4);
    let first_on = events
        .iter()
        .position(|e| matches!(e, MidiEvent::NoteOn { .. }))
        .unwrap();
    let last_off = events
        .iter()
        .rposition(|e| matches!(e, MidiEvent::NoteOff { .. }))
        .unwrap();
    assert!(last_off < first_on);
}

#[test]
fn mute_isolation_holds_over_long_runs() {
    let mut looper = LiveLoop::new(LiveLoopConfig::new(
        Box::new(Always {
            pitch: "C4",
            duration: 4,
            length: 16,
        }),
        1,
    ));
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    looper.set_muted(true);
    for step in 1..32 {
        looper.tick(step, 0.0, &mut recorder);
    }

    // Exactly one noteOn (pre-mute); its noteOff still arrived
    assert_eq!(note_ons(recorder.events()).len(), 1);
    assert!(!note_offs(recorder.events()).is_empty());

    // Unmuting resumes emission on the next tick
    looper.set_muted(false);
    recorder.clear();
    looper.tick(32, 0.0, &mut recorder);
    assert_eq!(note_ons(recorder.events()).len(), 1);
}

#[test]
fn stop_all_silences_and_stays_idempotent() {
    let mut looper = LiveLoop::new(LiveLoopConfig::new(
        Box::new(OnceAtZero {
            events: vec![
                NoteEvent::new("C4").with_duration(100),
                NoteEvent::new("E4").with_duration(100),
                NoteEvent::new("G4").with_duration(100),
            ],
        }),
        1,
    ));
    let mut recorder = EventRecorder::new();

    looper.tick(0, 0.0, &mut recorder);
    assert_eq!(looper.active_note_count(), 3);

    recorder.clear();
    looper.stop_all(&mut recorder);
    assert_eq!(note_offs(recorder.events()), vec![(1, 60), (1, 64), (1, 67)]);
    assert_eq!(looper.active_note_count(), 0);

    looper.stop_all(&mut recorder);
    assert_eq!(recorder.len(), 3);
}

#[test]
fn every_note_on_is_eventually_paired() {
    // Paired invariant over a mixed run with retriggers and durations
    struct Cycling;
    impl Pattern for Cycling {
        fn notes_at(&mut self, step: u32, _ctx: &PatternContext) -> Vec<NoteEvent> {
            match step % 4 {
                0 => vec![
                    NoteEvent::new("C4").with_duration(3),
                    NoteEvent::new("E4").with_duration(2),
                ],
                2 => vec![NoteEvent::new("C4").with_duration(1)],
                3 => vec![NoteEvent::new("G4").with_duration(0)],
                _ => Vec::new(),
            }
        }
        fn length(&self) -> u32 {
            4
        }
    }

    let mut looper = LiveLoop::new(LiveLoopConfig::new(Box::new(Cycling), 5));
    let mut recorder = EventRecorder::new();

    for step in 0..64 {
        looper.tick(step, 0.0, &mut recorder);
    }
    looper.stop_all(&mut recorder);

    // Per pitch: ons and offs balance, and the running balance never
    // exceeds one active instance
    for pitch in [60u8, 64, 67] {
        let mut balance = 0i32;
        for event in recorder.events() {
            match event {
                MidiEvent::NoteOn { note, .. } if *note == pitch => {
                    balance += 1;
                    assert!(balance <= 1, "two overlapping instances of {}", pitch);
                }
                MidiEvent::NoteOff { note, .. } if *note == pitch => {
                    balance -= 1;
                    assert!(balance >= 0, "noteOff without noteOn for {}", pitch);
                }
                _ => {}
            }
        }
        assert_eq!(balance, 0, "unpaired noteOn for {}", pitch);
    }
}
