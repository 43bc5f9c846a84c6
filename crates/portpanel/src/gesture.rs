//! Press-and-hold drag detection for reordering ports.
//!
//! A press arms a hold timer. Moving further than [`MOVE_TOLERANCE_PX`]
//! before it fires turns the gesture into a plain click; releasing cancels
//! it. Only an undisturbed hold starts a drag. Time is passed in
//! explicitly so the tracker stays a pure state machine.

use std::time::{Duration, Instant};

/// Hold delay for mouse presses.
pub const MOUSE_HOLD: Duration = Duration::from_millis(300);

/// Hold delay for touch presses.
pub const TOUCH_HOLD: Duration = Duration::from_millis(600);

/// Movement that cancels a pending hold.
pub const MOVE_TOLERANCE_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

impl PointerKind {
    pub fn hold_delay(&self) -> Duration {
        match self {
            PointerKind::Mouse => MOUSE_HOLD,
            PointerKind::Touch => TOUCH_HOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Pending {
        kind: PointerKind,
        origin: Point,
        deadline: Instant,
    },
    /// Moved too far; nothing happens until release.
    Moved,
    Dragging {
        kind: PointerKind,
    },
}

/// What a release ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Nothing was in progress.
    None,
    /// Released before the hold fired.
    Tap,
    /// Released after the pointer wandered off.
    Cancelled,
    /// Released while dragging: drop here.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressTracker {
    state: State,
}

impl Default for PressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PressTracker {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Starts a press. Non-primary mouse buttons are ignored.
    pub fn press(&mut self, kind: PointerKind, primary: bool, at: Point, now: Instant) {
        if kind == PointerKind::Mouse && !primary {
            return;
        }
        self.state = State::Pending {
            kind,
            origin: at,
            deadline: now + kind.hold_delay(),
        };
    }

    /// Pointer movement. Returns true if this movement cancelled a pending
    /// hold.
    pub fn moved(&mut self, to: Point) -> bool {
        if let State::Pending { origin, .. } = self.state {
            if origin.distance(&to) > MOVE_TOLERANCE_PX {
                self.state = State::Moved;
                return true;
            }
        }
        false
    }

    /// Advances time. Returns true when a drag starts.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            State::Pending { kind, deadline, .. } if now >= deadline => {
                self.state = State::Dragging { kind };
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self) -> Release {
        let outcome = match self.state {
            State::Idle => Release::None,
            State::Pending { .. } => Release::Tap,
            State::Moved => Release::Cancelled,
            State::Dragging { .. } => Release::Drop,
        };
        self.state = State::Idle;
        outcome
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, State::Dragging { .. })
    }

    /// Deadline of the pending hold timer, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            State::Pending { deadline, .. } => Some(deadline),
            _ => None,
        }
    }
}

/// Index at which a dragged box dropped at `x` is inserted among the other
/// boxes, given their horizontal centres: before the nearest box whose
/// centre lies right of `x`, else at the end.
pub fn insertion_index(centres: &[f64], x: f64) -> usize {
    centres
        .iter()
        .enumerate()
        .filter(|(_, c)| x - **c < 0.0)
        .max_by(|(_, a), (_, b)| b.total_cmp(a))
        .map_or(centres.len(), |(i, _)| i)
}
