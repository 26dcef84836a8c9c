//! The orchestration state machine.
//!
//! [`Model::update`] is a pure transition function over a closed set of
//! events. It never performs I/O; the returned [`Action`] tells the event
//! loop what to do next.

/// A key press, reduced to what the view cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Ctrl-C in raw mode, or SIGINT/SIGTERM delivered to the wrapper
    Interrupt,
    Other,
}

impl Key {
    pub fn is_quit(self) -> bool {
        matches!(self, Key::Char('q') | Key::Interrupt)
    }
}

/// Everything that can reach the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Key(Key),
    ExplanationReady(String),
    ExplanationFailed(String),
    SpinnerTick,
}

/// What is currently on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading { frame: usize },
    Explained(String),
    Errored(String),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing changed
    Ignore,
    Redraw,
    /// Redraw and schedule the next spinner tick
    RedrawAndTick,
    /// Leave the loop
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    phase: Phase,
    dismissed: bool,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading { frame: 0 },
            dismissed: false,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// True once the user quit. Every later event is ignored.
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    pub fn update(&mut self, event: UiEvent) -> Action {
        if self.dismissed {
            return Action::Ignore;
        }

        let loading_frame = match self.phase {
            Phase::Loading { frame } => Some(frame),
            _ => None,
        };

        match event {
            UiEvent::Key(key) if key.is_quit() => {
                self.dismissed = true;
                Action::Quit
            }
            UiEvent::Key(_) => Action::Ignore,
            UiEvent::SpinnerTick => match loading_frame {
                Some(frame) => {
                    self.phase = Phase::Loading {
                        frame: frame.wrapping_add(1),
                    };
                    Action::RedrawAndTick
                }
                None => Action::Ignore,
            },
            UiEvent::ExplanationReady(text) if loading_frame.is_some() => {
                self.phase = Phase::Explained(text);
                Action::Redraw
            }
            UiEvent::ExplanationFailed(err) if loading_frame.is_some() => {
                self.phase = Phase::Errored(err);
                Action::Redraw
            }
            UiEvent::ExplanationReady(_) | UiEvent::ExplanationFailed(_) => Action::Ignore,
        }
    }
}
