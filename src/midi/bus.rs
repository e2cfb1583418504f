// MIDI bus - the sink every loop writes into

use crate::midi::event::MidiEvent;

/// Synchronous sink for engine-emitted MIDI events.
///
/// The engine serialises all writes within a tick; implementations never see
/// concurrent calls. Out-of-range values are the caller's responsibility
/// (the runtime clamps before emitting).
pub trait MidiSink {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
    fn control_change(&mut self, channel: u8, controller: u8, value: u8);
}

/// In-memory sink that records events in emission order.
///
/// Used by tests to assert ordering/pairing invariants and by the demo binary
/// when no hardware port is available.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<MidiEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in emission order.
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    /// Drain the recorded events, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<MidiEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl MidiSink for EventRecorder {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.events.push(MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        self.events.push(MidiEvent::NoteOff { channel, note });
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.events.push(MidiEvent::ControlChange {
            channel,
            controller,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_preserves_order() {
        let mut recorder = EventRecorder::new();
        recorder.note_on(1, 60, 100);
        recorder.control_change(1, 74, 64);
        recorder.note_off(1, 60);

        assert_eq!(recorder.len(), 3);
        assert_eq!(
            recorder.events()[0],
            MidiEvent::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            }
        );
        assert_eq!(
            recorder.events()[2],
            MidiEvent::NoteOff {
                channel: 1,
                note: 60
            }
        );
    }

    #[test]
    fn test_recorder_take_drains() {
        let mut recorder = EventRecorder::new();
        recorder.note_on(1, 60, 100);

        let taken = recorder.take();
        assert_eq!(taken.len(), 1);
        assert!(recorder.is_empty());
    }
}
