// MIDI module - event types, bus abstraction, pitch naming, output ports

pub mod bus;
pub mod event;
pub mod note_name;
pub mod output;

pub use bus::{EventRecorder, MidiSink};
pub use event::MidiEvent;
pub use note_name::{note_name, parse_note_name, semitone_from_name, FALLBACK_SEMITONE};
pub use output::{MidiOutputError, MidiOutputManager};
