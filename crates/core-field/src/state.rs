//! Per-widget field state.
//!
//! Invariants:
//! - `cursor <= char_len(live_value)` after every mutation (all writes go
//!   through `set_live`, which clamps).
//! - `committed_value` is written only by `commit`, which the controller calls
//!   when the dispatcher reports a successful delivery.

use core_text::{char_len, clamp_cursor};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    live_value: String,
    committed_value: String,
    cursor: usize,
    has_focus: bool,
    last_edit: Option<Instant>,
    pending_external: Option<String>,
}

impl FieldState {
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        let cursor = char_len(&initial);
        Self {
            committed_value: initial.clone(),
            live_value: initial,
            cursor,
            has_focus: false,
            last_edit: None,
            pending_external: None,
        }
    }

    pub fn live_value(&self) -> &str {
        &self.live_value
    }
    pub fn committed_value(&self) -> &str {
        &self.committed_value
    }
    pub fn cursor(&self) -> usize {
        self.cursor
    }
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }
    pub fn last_edit(&self) -> Option<Instant> {
        self.last_edit
    }
    pub fn pending_external(&self) -> Option<&str> {
        self.pending_external.as_deref()
    }

    /// Replace the buffer and place the cursor, clamping it to the new length.
    pub(crate) fn set_live(&mut self, value: String, cursor: usize) {
        self.cursor = clamp_cursor(&value, cursor);
        self.live_value = value;
    }

    /// Swap in an external value keeping the cursor where it was when possible.
    pub(crate) fn swap_live(&mut self, value: String) {
        let cursor = self.cursor;
        self.set_live(value, cursor);
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_edit = Some(now);
    }

    pub(crate) fn set_focus(&mut self, focused: bool) {
        self.has_focus = focused;
    }

    pub(crate) fn defer(&mut self, value: String) {
        self.pending_external = Some(value);
    }

    pub(crate) fn take_pending(&mut self) -> Option<String> {
        self.pending_external.take()
    }

    pub(crate) fn commit(&mut self, value: &str) {
        if self.committed_value != value {
            self.committed_value = value.to_string();
        }
    }
}
