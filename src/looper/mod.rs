// Looper module - runtime, modulation, context, randomness

pub mod context;
pub mod lfo;
pub mod live_loop;
pub mod rng;

pub use context::{
    Chord, ChordManager, EnergyManager, EnergyState, HypeLevel, PatternContext,
    ProgressionManager, RhythmManager, StepRhythm, TensionLevel,
};
pub use lfo::{Lfo, LfoParams, LfoShape, LfoUpdate};
pub use live_loop::{ActiveNote, LiveLoop, LiveLoopConfig};
pub use rng::{entropy_random, fixed_random, seeded_random, RandomSource};
