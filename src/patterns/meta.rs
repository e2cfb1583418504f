// Meta-phrase wrapper - composes a main pattern and a fill into one phrase
//
// The phrase is main_bars of the main pattern followed by fill_bars of the
// fill. Sub-patterns see phrase-local steps, so a fill always starts from
// its own step 0 regardless of the phrase position in absolute time.

use crate::looper::context::PatternContext;
use crate::patterns::{NoteEvent, Pattern};

type PhraseCallback = Box<dyn FnMut(u32) + Send>;

pub struct MetaPhrasePattern {
    main: Box<dyn Pattern>,
    fill: Box<dyn Pattern>,
    main_bars: u32,
    fill_bars: u32,
    bar_steps: u32,
    current_phrase: Option<u32>,
    cache: Option<(u32, Vec<NoteEvent>)>,
    on_phrase_start: Option<PhraseCallback>,
    on_phrase_end: Option<PhraseCallback>,
}

impl MetaPhrasePattern {
    /// `main_bars` of `main` followed by `fill_bars` of `fill`, with bars of
    /// `bar_steps` steps.
    pub fn new(
        main: Box<dyn Pattern>,
        fill: Box<dyn Pattern>,
        main_bars: u32,
        fill_bars: u32,
        bar_steps: u32,
    ) -> Self {
        Self {
            main,
            fill,
            main_bars: main_bars.max(1),
            fill_bars: fill_bars.max(1),
            bar_steps: bar_steps.max(1),
            current_phrase: None,
            cache: None,
            on_phrase_start: None,
            on_phrase_end: None,
        }
    }

    /// Invoked with the phrase index when a new phrase begins.
    pub fn on_phrase_start(mut self, callback: impl FnMut(u32) + Send + 'static) -> Self {
        self.on_phrase_start = Some(Box::new(callback));
        self
    }

    /// Invoked with the previous phrase index when a phrase completes.
    pub fn on_phrase_end(mut self, callback: impl FnMut(u32) + Send + 'static) -> Self {
        self.on_phrase_end = Some(Box::new(callback));
        self
    }

    fn main_span(&self) -> u32 {
        self.main_bars * self.bar_steps
    }
}

impl Pattern for MetaPhrasePattern {
    fn notes_at(&mut self, step: u32, ctx: &PatternContext) -> Vec<NoteEvent> {
        // Same-step re-query (e.g. a debug UI) must not re-run probabilistic
        // sub-patterns
        if let Some((cached_step, events)) = &self.cache {
            if *cached_step == step {
                return events.clone();
            }
        }

        let length = self.length();
        let phrase = step / length;
        if self.current_phrase != Some(phrase) {
            if let Some(previous) = self.current_phrase {
                if let Some(callback) = &mut self.on_phrase_end {
                    callback(previous);
                }
            }
            if let Some(callback) = &mut self.on_phrase_start {
                callback(phrase);
            }
            self.current_phrase = Some(phrase);
        }

        let step_in_phrase = step % length;
        let events = if step_in_phrase < self.main_span() {
            self.main.notes_at(step_in_phrase, ctx)
        } else {
            self.fill.notes_at(step_in_phrase - self.main_span(), ctx)
        };

        self.cache = Some((step, events.clone()));
        events
    }

    fn length(&self) -> u32 {
        (self.main_bars + self.fill_bars) * self.bar_steps
    }

    fn reset(&mut self) {
        self.main.reset();
        self.fill.reset();
        self.current_phrase = None;
        self.cache = None;
    }

    fn to_config(&self) -> serde_json::Value {
        serde_json::json!({
            "main_bars": self.main_bars,
            "fill_bars": self.fill_bars,
            "bar_steps": self.bar_steps,
            "main": self.main.to_config(),
            "fill": self.fill.to_config(),
        })
    }
}
