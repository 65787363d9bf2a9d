//! Focus guard: decides whether an external candidate may overwrite the live buffer.
//!
//! Rules, first match wins:
//! 1. The candidate is an echo of a value this field itself delivered -> Apply (no-op refresh).
//! 2. The field is not focused -> Apply.
//! 3. Focused, and the edit window has elapsed since the last keystroke (or there was none)
//!    -> Apply.
//! 4. Otherwise -> Defer; the controller parks the candidate until blur.
//!
//! The guard owns nothing but the configured window; every input is passed in,
//! so the same decision can be replayed in tests at any instant.

use crate::state::FieldState;
use core_config::Config;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Apply,
    Defer,
}

/// Which rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Echo,
    Unfocused,
    EditWindowElapsed,
    EditInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: Reason,
}

impl Verdict {
    const fn apply(reason: Reason) -> Self {
        Self {
            decision: Decision::Apply,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusGuard {
    edit_window: Duration,
}

impl Default for FocusGuard {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FocusGuard {
    pub fn new(edit_window: Duration) -> Self {
        Self { edit_window }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.edit_window())
    }

    pub fn edit_window(&self) -> Duration {
        self.edit_window
    }

    /// `own_echo` must be true only when the candidate carries an echo tag the
    /// dispatcher recognizes as one of this field's deliveries.
    pub fn decide(&self, state: &FieldState, own_echo: bool, now: Instant) -> Verdict {
        if own_echo {
            return Verdict::apply(Reason::Echo);
        }
        if !state.has_focus() {
            return Verdict::apply(Reason::Unfocused);
        }
        let idle = state
            .last_edit()
            .map(|at| now.saturating_duration_since(at))
            .is_none_or(|elapsed| elapsed >= self.edit_window);
        if idle {
            return Verdict::apply(Reason::EditWindowElapsed);
        }
        Verdict {
            decision: Decision::Defer,
            reason: Reason::EditInProgress,
        }
    }
}
