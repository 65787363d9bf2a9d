//! End-to-end scenarios for one field driven by a user and an external updater at once.

use core_events::{EchoTag, ExternalModel, FieldEvent, FieldId, MemoryModel};
use core_field::{ChangeDispatcher, DispatcherHandle, EditableFieldController, FocusGuard, Reconciled};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(300);

fn field(initial: &str) -> (EditableFieldController, DispatcherHandle) {
    let dispatcher = Rc::new(RefCell::new(ChangeDispatcher::new(Duration::ZERO)));
    let ctl = EditableFieldController::new(
        FieldId::new("subject"),
        initial,
        FocusGuard::new(WINDOW),
        dispatcher.clone(),
    );
    (ctl, dispatcher)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn typing_under_external_churn_keeps_keystrokes() {
    let t0 = Instant::now();
    let (mut ctl, _) = field("");
    ctl.on_focus();
    let mut typed = String::new();
    for (i, ch) in "hello".chars().enumerate() {
        let at = t0 + ms(i as u64 * 40);
        typed.push(ch);
        ctl.on_user_edit_at(typed.clone(), typed.chars().count(), at);
        let out = ctl.reconcile_external_at("hi", None, at + ms(5));
        assert_eq!(out, Reconciled::Deferred);
        assert_eq!(ctl.live_value(), typed);
    }
    assert_eq!(ctl.live_value(), "hello");
    assert_eq!(ctl.cursor(), 5);
    assert!(!ctl.take_focus_request());
}

#[test]
fn blur_applies_deferred_value() {
    let t0 = Instant::now();
    let (mut ctl, _) = field("");
    ctl.handle_at(FieldEvent::Focus, t0);
    ctl.handle_at(
        FieldEvent::Keystroke {
            text: "my draft".into(),
            cursor: 8,
        },
        t0,
    );
    let out = ctl.handle_at(
        FieldEvent::External {
            value: "external-update".into(),
            echo: None,
        },
        t0 + ms(20),
    );
    assert_eq!(out, Some(Reconciled::Deferred));
    assert_eq!(ctl.state().pending_external(), Some("external-update"));

    ctl.handle_at(FieldEvent::Blur, t0 + ms(30));
    assert_eq!(ctl.live_value(), "external-update");
    assert_eq!(ctl.cursor(), 8);
    assert!(ctl.state().pending_external().is_none());
    assert!(!ctl.view().has_focus);
}

#[test]
fn newer_external_replaces_older_deferred() {
    let t0 = Instant::now();
    let (mut ctl, _) = field("");
    ctl.on_focus();
    ctl.on_user_edit_at("x", 1, t0);
    ctl.reconcile_external_at("first", None, t0 + ms(1));
    ctl.reconcile_external_at("second", None, t0 + ms(2));
    ctl.on_blur();
    assert_eq!(ctl.live_value(), "second");
}

#[test]
fn echo_round_trip_leaves_buffer_and_cursor_alone() {
    let t0 = Instant::now();
    let (mut ctl, dispatcher) = field("");
    let mut model = MemoryModel::new();
    let id = ctl.id().clone();

    ctl.on_focus();
    ctl.on_user_edit_at("abc", 1, t0);
    dispatcher.borrow_mut().flush_at(&mut model, t0);
    let echo = model.candidate(&id).expect("model holds a value");

    // The user keeps typing before the echo comes back.
    ctl.on_user_edit_at("abXc", 3, t0 + ms(2));
    let out = ctl.handle_at(echo, t0 + ms(500));
    assert_eq!(out, Some(Reconciled::Acknowledged));
    assert_eq!(ctl.live_value(), "abXc");
    assert_eq!(ctl.cursor(), 3);
    assert_eq!(ctl.committed_value(), "abc");
}

#[test]
fn newer_delivery_echo_supersedes_deferred_value() {
    let t0 = Instant::now();
    let (mut ctl, dispatcher) = field("");
    let mut model = MemoryModel::new();
    let id = ctl.id().clone();

    ctl.on_focus();
    ctl.on_user_edit_at("ab", 2, t0);
    model.set_external(&id, "X");
    let third_party = model.candidate(&id).expect("value present");
    assert_eq!(ctl.handle_at(third_party, t0 + ms(5)), Some(Reconciled::Deferred));

    ctl.on_user_edit_at("abc", 3, t0 + ms(10));
    dispatcher.borrow_mut().flush_at(&mut model, t0 + ms(10));
    let echo = model.candidate(&id).expect("value present");
    assert_eq!(ctl.handle_at(echo, t0 + ms(15)), Some(Reconciled::Acknowledged));
    assert!(ctl.state().pending_external().is_none());

    ctl.on_blur();
    assert_eq!(ctl.live_value(), "abc");
    assert_eq!(model.current_value(&id).as_deref(), Some(ctl.live_value()));
}

#[test]
fn echo_of_older_delivery_keeps_deferred_value() {
    let t0 = Instant::now();
    let (mut ctl, dispatcher) = field("");
    let mut model = MemoryModel::new();
    let id = ctl.id().clone();

    ctl.on_focus();
    ctl.on_user_edit_at("ab", 2, t0);
    dispatcher.borrow_mut().flush_at(&mut model, t0);
    let stale_echo = model.candidate(&id).expect("value present");

    assert_eq!(
        ctl.reconcile_external_at("X", None, t0 + ms(5)),
        Reconciled::Deferred
    );
    assert_eq!(ctl.handle_at(stale_echo, t0 + ms(10)), Some(Reconciled::Acknowledged));
    assert_eq!(ctl.state().pending_external(), Some("X"));

    ctl.on_blur();
    assert_eq!(ctl.live_value(), "X");
}

#[test]
fn echo_is_recognized_even_when_unfocused() {
    let (mut ctl, dispatcher) = field("");
    let mut model = MemoryModel::new();
    ctl.on_user_edit("v1", 2);
    dispatcher.borrow_mut().flush(&mut model);
    ctl.on_user_edit("v2", 2);
    let out = ctl.reconcile_external("v1", Some(EchoTag::of(ctl.id(), "v1")));
    assert_eq!(out, Reconciled::Acknowledged);
    assert_eq!(ctl.live_value(), "v2");
}

#[test]
fn forged_tag_is_not_an_echo() {
    let t0 = Instant::now();
    let (mut ctl, _) = field("");
    ctl.on_focus();
    ctl.on_user_edit_at("mine", 4, t0);
    // A tag for this value that the dispatcher never delivered.
    let forged = EchoTag::of(ctl.id(), "theirs");
    let out = ctl.reconcile_external_at("theirs", Some(forged), t0 + ms(1));
    assert_eq!(out, Reconciled::Deferred);
    assert_eq!(ctl.live_value(), "mine");
}

#[test]
fn third_party_change_lands_once_user_pauses() {
    let t0 = Instant::now();
    let (mut ctl, dispatcher) = field("");
    let mut model = MemoryModel::new();
    let id = ctl.id().clone();
    ctl.on_focus();
    ctl.on_user_edit_at("helo", 4, t0);
    dispatcher.borrow_mut().flush_at(&mut model, t0);

    // Another part of the dashboard corrects the value.
    model.set_external(&id, "hello");
    let candidate = model.candidate(&id).expect("value present");
    assert_eq!(ctl.handle_at(candidate, t0 + ms(350)), Some(Reconciled::Applied));
    assert_eq!(ctl.live_value(), "hello");
    assert_eq!(ctl.cursor(), 4);
    assert!(ctl.take_focus_request(), "focus must be re-asserted after the swap");
    assert_eq!(model.current_value(&id).as_deref(), Some("hello"));
}

#[test]
fn two_fields_share_one_dispatcher() {
    let t0 = Instant::now();
    let dispatcher = Rc::new(RefCell::new(ChangeDispatcher::new(Duration::ZERO)));
    let guard = FocusGuard::new(WINDOW);
    let mut subject =
        EditableFieldController::new(FieldId::new("subject"), "", guard, dispatcher.clone());
    let mut content =
        EditableFieldController::new(FieldId::new("content"), "", guard, dispatcher.clone());
    let mut model = MemoryModel::new();

    subject.on_user_edit_at("S", 1, t0);
    content.on_user_edit_at("C", 1, t0);
    subject.on_user_edit_at("Su", 2, t0);
    let report = dispatcher.borrow_mut().flush_at(&mut model, t0);
    assert_eq!(report.delivered, 2);

    subject.absorb_deliveries();
    content.absorb_deliveries();
    assert_eq!(subject.committed_value(), "Su");
    assert_eq!(content.committed_value(), "C");

    content.teardown();
    content.on_user_edit_at("ignored", 7, t0);
    assert!(!dispatcher.borrow().has_pending(&FieldId::new("content")));
}
