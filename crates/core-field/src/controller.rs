//! Editable field controller: owns one widget's live buffer and arbitrates external updates.
//!
//! The controller is the only writer of its `FieldState`. User edits land
//! immediately and are forwarded to the shared dispatcher; external candidates
//! go through the focus guard and are applied, acknowledged (echoes), or parked
//! until blur. When an applied swap happens while the widget is focused the
//! controller raises a focus-restoration request that the host drains with
//! `take_focus_request` after re-rendering.
//!
//! Teardown cancels the field's queued dispatch and any focus request, and is
//! also run on drop. Events delivered after teardown are ignored.

use crate::dispatcher::DispatcherHandle;
use crate::guard::{Decision, FocusGuard, Reason, Verdict};
use crate::state::FieldState;
use core_config::Config;
use core_events::{EchoTag, FieldEvent, FieldId};
use core_text::char_len;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// What the widget should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub buffer: String,
    pub cursor: usize,
    pub has_focus: bool,
}

/// Outcome of routing one external candidate into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The live buffer was replaced.
    Applied,
    /// The candidate was this field's own echo; nothing changed.
    Acknowledged,
    /// The candidate already equals the live buffer; nothing changed.
    Unchanged,
    /// The user is mid-edit; the candidate waits in `pending_external`.
    Deferred,
    /// The controller has been torn down.
    Ignored,
}

pub struct EditableFieldController {
    id: FieldId,
    state: FieldState,
    guard: FocusGuard,
    dispatcher: DispatcherHandle,
    /// Highest dispatcher delivery sequence folded into `committed_value`.
    absorbed_seq: u64,
    /// `absorbed_seq` at the moment the current pending value was deferred.
    deferred_at_seq: u64,
    focus_request: bool,
    torn_down: bool,
}

impl EditableFieldController {
    pub fn new(
        id: FieldId,
        initial: impl Into<String>,
        guard: FocusGuard,
        dispatcher: DispatcherHandle,
    ) -> Self {
        let state = FieldState::new(initial);
        debug!(
            target: "field.controller",
            field = %id,
            initial_len = state.live_value().len(),
            "field_initialized"
        );
        Self {
            id,
            state,
            guard,
            dispatcher,
            absorbed_seq: 0,
            deferred_at_seq: 0,
            focus_request: false,
            torn_down: false,
        }
    }

    pub fn with_config(
        id: FieldId,
        initial: impl Into<String>,
        config: &Config,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self::new(id, initial, FocusGuard::from_config(config), dispatcher)
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }
    pub fn state(&self) -> &FieldState {
        &self.state
    }
    pub fn live_value(&self) -> &str {
        self.state.live_value()
    }
    pub fn committed_value(&self) -> &str {
        self.state.committed_value()
    }
    pub fn cursor(&self) -> usize {
        self.state.cursor()
    }
    pub fn has_focus(&self) -> bool {
        self.state.has_focus()
    }
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn view(&self) -> FieldView {
        FieldView {
            buffer: self.state.live_value().to_string(),
            cursor: self.state.cursor(),
            has_focus: self.state.has_focus(),
        }
    }

    /// Fold successful dispatcher deliveries for this field into `committed_value`.
    ///
    /// Every entry point calls this first; hosts may also call it right after a flush.
    pub fn absorb_deliveries(&mut self) {
        if self.torn_down {
            return;
        }
        let Ok(dispatcher) = self.dispatcher.try_borrow() else {
            return;
        };
        if let Some(delivery) = dispatcher.delivered(&self.id)
            && delivery.seq > self.absorbed_seq
        {
            self.absorbed_seq = delivery.seq;
            self.state.commit(&delivery.value);
            trace!(target: "field.controller", field = %self.id, seq = delivery.seq, "committed");
        }
    }

    pub fn on_user_edit(&mut self, text: impl Into<String>, cursor: usize) {
        self.on_user_edit_at(text, cursor, Instant::now());
    }

    pub fn on_user_edit_at(&mut self, text: impl Into<String>, cursor: usize, now: Instant) {
        if self.torn_down {
            return;
        }
        self.absorb_deliveries();
        let text = text.into();
        self.state.set_live(text, cursor);
        self.state.touch(now);
        self.propose(now);
        trace!(
            target: "field.controller",
            field = %self.id,
            len = self.state.live_value().len(),
            cursor = self.state.cursor(),
            "user_edit"
        );
    }

    pub fn on_focus(&mut self) {
        if self.torn_down {
            return;
        }
        self.absorb_deliveries();
        self.state.set_focus(true);
        trace!(target: "field.controller", field = %self.id, "focus");
    }

    /// Leaving the field releases any deferred external value.
    pub fn on_blur(&mut self) {
        if self.torn_down {
            return;
        }
        self.absorb_deliveries();
        self.state.set_focus(false);
        self.focus_request = false;
        if let Some(value) = self.state.take_pending() {
            debug!(
                target: "field.controller",
                field = %self.id,
                value_len = value.len(),
                "deferred_applied_on_blur"
            );
            self.state.swap_live(value);
        }
    }

    pub fn reconcile_external(
        &mut self,
        candidate: impl Into<String>,
        echo: Option<EchoTag>,
    ) -> Reconciled {
        self.reconcile_external_at(candidate, echo, Instant::now())
    }

    pub fn reconcile_external_at(
        &mut self,
        candidate: impl Into<String>,
        echo: Option<EchoTag>,
        now: Instant,
    ) -> Reconciled {
        if self.torn_down {
            return Reconciled::Ignored;
        }
        self.absorb_deliveries();
        let candidate = candidate.into();
        let own_echo = echo.is_some_and(|tag| self.is_own_echo(&candidate, tag));
        let verdict = self.guard.decide(&self.state, own_echo, now);
        self.settle(candidate, verdict)
    }

    /// Re-arbitrate a deferred value. Lets a focused-but-idle field pick up an
    /// external correction without waiting for blur.
    pub fn poll_deferred_at(&mut self, now: Instant) -> Reconciled {
        if self.torn_down {
            return Reconciled::Ignored;
        }
        let Some(pending) = self.state.pending_external().map(str::to_string) else {
            return Reconciled::Unchanged;
        };
        let verdict = self.guard.decide(&self.state, false, now);
        if verdict.decision == Decision::Defer {
            return Reconciled::Deferred;
        }
        self.settle(pending, verdict)
    }

    /// Programmatic replacement (form reset). Proposed upstream like an edit but
    /// does not count as user activity for the focus guard.
    pub fn reset(&mut self, value: impl Into<String>) {
        if self.torn_down {
            return;
        }
        self.absorb_deliveries();
        let value = value.into();
        let end = char_len(&value);
        self.state.set_live(value, end);
        self.state.take_pending();
        self.propose(Instant::now());
        debug!(target: "field.controller", field = %self.id, "field_reset");
    }

    /// Returns true once per applied-while-focused swap; the host re-asserts focus.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_request)
    }

    /// Cancel the queued dispatch and any focus request. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.focus_request = false;
        match self.dispatcher.try_borrow_mut() {
            Ok(mut dispatcher) => {
                dispatcher.cancel(&self.id);
            }
            Err(_) => {
                warn!(target: "field.controller", field = %self.id, "teardown_dispatcher_busy");
            }
        }
        debug!(target: "field.controller", field = %self.id, "teardown");
    }

    pub fn handle(&mut self, event: FieldEvent) -> Option<Reconciled> {
        self.handle_at(event, Instant::now())
    }

    /// Widget boundary entry point. Returns the reconciliation outcome for external events.
    pub fn handle_at(&mut self, event: FieldEvent, now: Instant) -> Option<Reconciled> {
        trace!(target: "field.controller", field = %self.id, kind = event.kind(), "event");
        match event {
            FieldEvent::Keystroke { text, cursor } => {
                self.on_user_edit_at(text, cursor, now);
                None
            }
            FieldEvent::Focus => {
                self.on_focus();
                None
            }
            FieldEvent::Blur => {
                self.on_blur();
                None
            }
            FieldEvent::External { value, echo } => {
                Some(self.reconcile_external_at(value, echo, now))
            }
        }
    }

    fn is_own_echo(&self, candidate: &str, tag: EchoTag) -> bool {
        self.dispatcher
            .try_borrow()
            .is_ok_and(|d| d.is_own_echo(&self.id, candidate, tag))
    }

    fn propose(&self, now: Instant) {
        match self.dispatcher.try_borrow_mut() {
            Ok(mut dispatcher) => dispatcher.notify_at(&self.id, self.state.live_value(), now),
            Err(_) => {
                warn!(target: "field.controller", field = %self.id, "propose_dispatcher_busy");
            }
        }
    }

    fn settle(&mut self, candidate: String, verdict: Verdict) -> Reconciled {
        if verdict.reason == Reason::Echo {
            trace!(target: "field.guard", field = %self.id, "echo_acknowledged");
            self.drop_superseded_pending(&candidate);
            return Reconciled::Acknowledged;
        }
        match verdict.decision {
            Decision::Defer => {
                trace!(
                    target: "field.guard",
                    field = %self.id,
                    candidate_len = candidate.len(),
                    "focus_conflict_deferred"
                );
                self.state.defer(candidate);
                self.deferred_at_seq = self.absorbed_seq;
                Reconciled::Deferred
            }
            Decision::Apply => {
                self.state.take_pending();
                if candidate == self.state.live_value() {
                    return Reconciled::Unchanged;
                }
                let had_focus = self.state.has_focus();
                self.state.swap_live(candidate);
                if had_focus {
                    self.focus_request = true;
                }
                trace!(
                    target: "field.guard",
                    field = %self.id,
                    reason = ?verdict.reason,
                    len = self.state.live_value().len(),
                    refocus = had_focus,
                    "external_applied"
                );
                Reconciled::Applied
            }
        }
    }

    /// An echo of a delivery newer than the deferral means the model already
    /// holds this field's text over the deferred value.
    fn drop_superseded_pending(&mut self, candidate: &str) {
        if self.state.pending_external().is_none() {
            return;
        }
        let superseded = self.dispatcher.try_borrow().is_ok_and(|d| {
            d.delivered(&self.id).is_some_and(|delivery| {
                delivery.seq > self.deferred_at_seq && delivery.value == candidate
            })
        });
        if superseded {
            self.state.take_pending();
            debug!(target: "field.controller", field = %self.id, "deferred_superseded_by_echo");
        }
    }
}

impl Drop for EditableFieldController {
    fn drop(&mut self) {
        self.teardown();
    }
}
