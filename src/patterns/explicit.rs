// Explicit-note pattern - a fixed cyclic sequence of (possibly chordal) steps

use crate::looper::context::PatternContext;
use crate::patterns::{NoteEvent, Pattern};
use serde::{Deserialize, Serialize};

/// Serialisable form of the step list. Each step is the bag of notes that
/// trigger together; an empty bag is a rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitParams {
    pub steps: Vec<Vec<NoteEvent>>,
}

/// Plays a fixed sequence, one bag of events per step, cycling at
/// `steps.len()`. When a rhythm manager is present, steps that fall off the
/// beat grid yield nothing.
#[derive(Debug, Clone)]
pub struct ExplicitPattern {
    steps: Vec<Vec<NoteEvent>>,
}

impl ExplicitPattern {
    /// Build from normalised steps. An empty sequence degenerates to a
    /// single silent step so `length()` stays >= 1.
    pub fn new(steps: Vec<Vec<NoteEvent>>) -> Self {
        let mut steps = steps;
        if steps.is_empty() {
            steps.push(Vec::new());
        }
        for event in steps.iter_mut().flatten() {
            event.velocity = event.velocity.clamp(1, 127);
        }
        Self { steps }
    }

    /// One single note per step, default velocity and duration.
    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Self {
        Self::new(
            names
                .into_iter()
                .map(|name| vec![NoteEvent::new(name)])
                .collect(),
        )
    }

    /// One event per step.
    pub fn from_events<I: IntoIterator<Item = NoteEvent>>(events: I) -> Self {
        Self::new(events.into_iter().map(|event| vec![event]).collect())
    }
}

impl Pattern for ExplicitPattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        if let Some(rhythm) = &ctx.rhythm {
            if !rhythm.is_beat(step) {
                return Vec::new();
            }
        }
        let index = (step as usize) % self.steps.len();
        self.steps[index].clone()
    }

    fn length(&self) -> u32 {
        self.steps.len() as u32
    }

    fn to_config(&self) -> serde_json::Value {
        serde_json::to_value(ExplicitParams {
            steps: self.steps.clone(),
        })
        .unwrap_or(serde_json::Value::Null)
    }
}
