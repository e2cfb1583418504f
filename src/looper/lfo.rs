// LFO - continuous-time modulator emitting MIDI controller values
//
// Unlike an audio-rate oscillator this advances by wall-clock dt, once per
// tick, and quantizes its output to a 0..=127 controller value.

use crate::looper::rng::{entropy_random, RandomSource};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoShape {
    Sine,
    Triangle,
    Square,
    Saw,
    /// Random value drawn once per cycle and held.
    SampleHold,
}

/// Structural LFO parameters.
///
/// `phase` is the starting phase in radians; the running phase is owned by
/// [`Lfo`] and survives parameter updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LfoParams {
    pub shape: LfoShape,
    /// Cycles per second.
    pub frequency: f64,
    /// Modulation depth, 0.0 to 1.0.
    pub amplitude: f64,
    /// Baseline added before scaling to the controller range, 0.0 to 1.0.
    pub offset: f64,
    /// Initial phase in radians.
    pub phase: f64,
    /// Target controller number (0..=127).
    pub controller: u8,
}

impl LfoParams {
    pub fn new(shape: LfoShape, frequency: f64, amplitude: f64, controller: u8) -> Self {
        Self {
            shape,
            frequency: frequency.max(0.0),
            amplitude: amplitude.clamp(0.0, 1.0),
            offset: 0.0,
            phase: 0.0,
            controller: controller.min(127),
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset.clamp(0.0, 1.0);
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            shape: LfoShape::Sine,
            frequency: 1.0,
            amplitude: 1.0,
            offset: 0.0,
            phase: 0.0,
            controller: 1, // mod wheel
        }
    }
}

/// Partial parameter update applied through the runtime's hot-swap path.
///
/// Only the named fields are replaced; the running phase is preserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LfoUpdate {
    pub shape: Option<LfoShape>,
    pub frequency: Option<f64>,
    pub amplitude: Option<f64>,
    pub offset: Option<f64>,
    pub controller: Option<u8>,
}

pub struct Lfo {
    params: LfoParams,
    phase: f64,
    held: f64,
    last_value: u8,
    random: RandomSource,
}

impl Lfo {
    pub fn new(params: LfoParams) -> Self {
        Self::with_random(params, entropy_random())
    }

    /// Inject the random source used by the sample-and-hold shape.
    pub fn with_random(params: LfoParams, mut random: RandomSource) -> Self {
        let held = 2.0 * random() - 1.0;
        Self {
            phase: params.phase,
            params,
            held,
            last_value: 0,
            random,
        }
    }

    /// Advance by `dt` seconds and produce the controller value.
    pub fn update(&mut self, dt: f64) -> u8 {
        self.phase += TAU * self.params.frequency * dt.max(0.0);
        if self.phase >= TAU {
            self.phase %= TAU;
            // New cycle: sample-and-hold draws its next value here
            self.held = 2.0 * (self.random)() - 1.0;
        }

        let t = self.phase / TAU;
        let waveform = match self.params.shape {
            LfoShape::Sine => self.phase.sin(),
            LfoShape::Triangle => {
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
            LfoShape::Square => {
                if t < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::Saw => 2.0 * t - 1.0,
            LfoShape::SampleHold => self.held,
        };

        let unit = (self.params.offset + self.params.amplitude * (waveform + 1.0) / 2.0)
            .clamp(0.0, 1.0);
        self.last_value = (unit * 127.0).round() as u8;
        self.last_value
    }

    /// Replace the named fields, keeping the accumulated phase.
    pub fn apply_update(&mut self, update: &LfoUpdate) {
        if let Some(shape) = update.shape {
            self.params.shape = shape;
        }
        if let Some(frequency) = update.frequency {
            self.params.frequency = frequency.max(0.0);
        }
        if let Some(amplitude) = update.amplitude {
            self.params.amplitude = amplitude.clamp(0.0, 1.0);
        }
        if let Some(offset) = update.offset {
            self.params.offset = offset.clamp(0.0, 1.0);
        }
        if let Some(controller) = update.controller {
            self.params.controller = controller.min(127);
        }
    }

    pub fn params(&self) -> &LfoParams {
        &self.params
    }

    pub fn controller(&self) -> u8 {
        self.params.controller
    }

    pub fn last_value(&self) -> u8 {
        self.last_value
    }

    /// Rewind the phase to the configured starting phase.
    pub fn reset(&mut self) {
        self.phase = self.params.phase;
    }
}
