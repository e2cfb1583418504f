// LoopLab - deterministic MIDI live-looping engine
// Library exports for the demo binary, tests and benchmarks

pub mod looper;
pub mod midi;
pub mod patterns;

// Re-export commonly used types for convenience
pub use looper::context::{
    Chord, ChordManager, EnergyManager, EnergyState, HypeLevel, PatternContext,
    ProgressionManager, RhythmManager, StepRhythm, TensionLevel,
};
pub use looper::lfo::{Lfo, LfoParams, LfoShape, LfoUpdate};
pub use looper::live_loop::{ActiveNote, LiveLoop, LiveLoopConfig};
pub use looper::rng::{entropy_random, fixed_random, seeded_random, RandomSource};
pub use midi::bus::{EventRecorder, MidiSink};
pub use midi::event::MidiEvent;
pub use midi::output::{MidiOutputError, MidiOutputManager};
pub use patterns::{NoteEvent, Pattern, PitchSpec};
