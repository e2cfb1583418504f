// LoopLab demo - a four-loop arrangement driven by a sleep-based clock
//
// Routes to the first available MIDI output port; without one, events are
// printed to the console instead.

use looplab::looper::context::{
    Chord, ChordManager, EnergyManager, EnergyState, HypeLevel, PatternContext,
    ProgressionManager, RhythmManager, StepRhythm, TensionLevel,
};
use looplab::looper::lfo::{Lfo, LfoParams, LfoShape};
use looplab::looper::live_loop::{LiveLoop, LiveLoopConfig};
use looplab::looper::rng::entropy_random;
use looplab::midi::bus::MidiSink;
use looplab::midi::note_name::note_name;
use looplab::midi::output::MidiOutputManager;
use looplab::patterns::{
    ChanceArpParams, ChanceArpPattern, ChordPattern, DrumPartSpec, DrumPattern,
    MetaPhrasePattern, PhraseContourParams, PhraseContourPattern, SyncopatedBassParams,
    SyncopatedBassPattern, Voicing,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const BPM: f64 = 100.0;
const STEPS_PER_BEAT: u32 = 4;
const DEMO_STEPS: u32 = 320;

/// Prints each event instead of sending it anywhere.
struct ConsoleSink;

impl MidiSink for ConsoleSink {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        println!("  ch{:<2} noteOn  {:<4} vel {}", channel, note_name(note), velocity);
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        println!("  ch{:<2} noteOff {}", channel, note_name(note));
    }

    fn control_change(&mut self, _channel: u8, _controller: u8, _value: u8) {
        // CC spam is not worth printing
    }
}

fn build_context() -> PatternContext {
    let progression = ProgressionManager::new(vec![
        Chord::new("C", "maj7").with_duration(16),
        Chord::new("A", "min7").with_duration(16),
        Chord::new("F", "maj7").with_duration(16),
        Chord::new("G", "7").with_duration(16),
    ]);
    let energy = EnergyState::new(HypeLevel::Medium, TensionLevel::Low);
    let rhythm = StepRhythm::sixteenths();

    PatternContext {
        chords: Some(Arc::new(progression) as Arc<dyn ChordManager + Send + Sync>),
        energy: Some(Arc::new(energy) as Arc<dyn EnergyManager + Send + Sync>),
        rhythm: Some(Arc::new(rhythm) as Arc<dyn RhythmManager + Send + Sync>),
    }
}

fn build_loops(context: &PatternContext) -> Vec<LiveLoop> {
    let drums = DrumPattern::new(
        vec![
            DrumPartSpec::new("kick", vec![1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0])
                .with_pitch("C2"),
            DrumPartSpec::new("snare", vec![0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0])
                .with_pitch("D2"),
            DrumPartSpec::new("hat", vec![1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0])
                .with_pitch("F#2"),
        ],
        16,
        entropy_random(),
    );

    let bass = SyncopatedBassPattern::with_default_random(SyncopatedBassParams {
        density: 0.5,
        ..SyncopatedBassParams::default()
    });

    let chords = ChordPattern::with_voicing(Voicing::Open);

    // Lead: 4 bars of phrase melody, then a 1-bar arpeggiated fill
    let lead = MetaPhrasePattern::new(
        Box::new(PhraseContourPattern::with_default_random(
            PhraseContourParams::default(),
        )),
        Box::new(ChanceArpPattern::with_default_random(ChanceArpParams {
            probability_to_advance: 90,
            rest_probability: 5,
            ..ChanceArpParams::default()
        })),
        4,
        1,
        16,
    )
    .on_phrase_start(|phrase| log::info!("phrase {} begins", phrase));

    let filter_sweep = Lfo::new(
        LfoParams::new(LfoShape::Sine, 0.2, 0.6, 74).with_offset(0.3),
    );

    vec![
        LiveLoop::new(
            LiveLoopConfig::new(Box::new(drums), 10).with_context(context.clone()),
        ),
        LiveLoop::new(
            LiveLoopConfig::new(Box::new(bass), 2).with_context(context.clone()),
        ),
        LiveLoop::new(
            LiveLoopConfig::new(Box::new(chords), 3).with_context(context.clone()),
        ),
        LiveLoop::new(
            LiveLoopConfig::new(Box::new(lead), 4)
                .with_context(context.clone())
                .with_lfo(filter_sweep),
        ),
    ]
}

fn main() {
    env_logger::init();

    println!("=== LoopLab ===");
    println!("Deterministic MIDI live-looping demo\n");

    let mut sink: Box<dyn MidiSink> = match MidiOutputManager::connect_first() {
        Ok(output) => {
            println!("MIDI output: {}\n", output.port_name());
            Box::new(output)
        }
        Err(e) => {
            println!("No MIDI output ({}), printing events instead\n", e);
            Box::new(ConsoleSink)
        }
    };

    let context = build_context();
    let mut loops = build_loops(&context);

    let step_duration = 60.0 / (BPM * STEPS_PER_BEAT as f64);
    println!(
        "{} BPM, {} steps/beat -> {:.1} ms per step, {} steps\n",
        BPM,
        STEPS_PER_BEAT,
        step_duration * 1000.0,
        DEMO_STEPS
    );

    for step in 0..DEMO_STEPS {
        for live_loop in &mut loops {
            live_loop.tick(step, step_duration, sink.as_mut());
        }
        thread::sleep(Duration::from_secs_f64(step_duration));
    }

    // Leave nothing ringing
    for live_loop in &mut loops {
        live_loop.stop_all(sink.as_mut());
    }

    println!("\nDone.");
}
