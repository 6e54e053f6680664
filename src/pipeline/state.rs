use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the producer that walks the listing.
///
/// `PAGINATING ⇄ DRAINING`, ending in `DONE` (range walked), `EXHAUSTED`
/// (an empty page arrived first) or `FAILED` (a fetch failed or nobody is
/// left to read the queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerState {
    Paginating,
    Draining,
    Done,
    Exhausted,
    Failed,
}

impl ProducerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProducerState::Done | ProducerState::Exhausted | ProducerState::Failed
        )
    }
}

impl fmt::Display for ProducerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerState::Paginating => write!(f, "PAGINATING"),
            ProducerState::Draining => write!(f, "DRAINING"),
            ProducerState::Done => write!(f, "DONE"),
            ProducerState::Exhausted => write!(f, "EXHAUSTED"),
            ProducerState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Something that happened to the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerEvent {
    /// A page came back with this many ids.
    PageFetched(usize),
    /// The page fetch returned an error.
    FetchFailed,
    /// Every id of the current page is in the queue.
    PageDrained,
    /// All receivers are gone; nothing more can be enqueued.
    QueueClosed,
}

/// Drives [`ProducerState`] through its transitions.
#[derive(Debug, Clone)]
pub struct ProducerMachine {
    state: ProducerState,
}

impl Default for ProducerMachine {
    fn default() -> Self {
        Self {
            state: ProducerState::Paginating,
        }
    }
}

impl ProducerMachine {
    /// Apply `event` and return the new state.
    ///
    /// Terminal states absorb every event. Events that do not apply to the
    /// current state leave it unchanged.
    pub fn next(&mut self, event: ProducerEvent) -> ProducerState {
        use ProducerEvent::*;
        use ProducerState::*;

        self.state = match (self.state, event) {
            (s, _) if s.is_terminal() => s,
            (Paginating, PageFetched(0)) => Exhausted,
            (Paginating, PageFetched(_)) => Draining,
            (Paginating, FetchFailed) => Failed,
            (Draining, PageDrained) => Paginating,
            (_, QueueClosed) => Failed,
            (s, _) => s,
        };
        self.state
    }

    /// Called once the window iterator runs dry. A producer still paginating
    /// at that point has walked the whole range.
    pub fn finish(&mut self) -> ProducerState {
        if self.state == ProducerState::Paginating {
            self.state = ProducerState::Done;
        }
        self.state
    }
}
