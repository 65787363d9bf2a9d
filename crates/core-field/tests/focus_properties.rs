//! Property tests: interleaved keystrokes and external candidates never lose user input.

use core_events::{FieldId, MemoryModel};
use core_field::{ChangeDispatcher, EditableFieldController, FocusGuard, Reconciled};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Op {
    Type(char),
    Backspace,
    External(String),
    FlushAndEcho,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => proptest::char::range('a', 'z').prop_map(Op::Type),
        1 => Just(Op::Backspace),
        3 => "[a-z]{0,8}".prop_map(Op::External),
        2 => Just(Op::FlushAndEcho),
    ]
}

proptest! {
    // While focused and within the edit window of the last keystroke, the buffer equals
    // what the keystrokes alone produce.
    #[test]
    fn focused_buffer_follows_keystrokes_only(ops in prop::collection::vec(op(), 1..60), step_ms in 0u64..5) {
        let dispatcher = Rc::new(RefCell::new(ChangeDispatcher::new(Duration::ZERO)));
        let mut ctl = EditableFieldController::new(
            FieldId::new("notes"),
            "",
            FocusGuard::new(Duration::from_millis(300)),
            dispatcher.clone(),
        );
        let mut model = MemoryModel::new();
        let id = ctl.id().clone();
        let t0 = Instant::now();
        ctl.on_focus();
        // One keystroke up front so every later event is inside the window.
        ctl.on_user_edit_at("", 0, t0);

        let mut expected = String::new();
        for (i, op) in ops.into_iter().enumerate() {
            let now = t0 + Duration::from_millis(i as u64 * step_ms);
            match op {
                Op::Type(c) => {
                    expected.push(c);
                    ctl.on_user_edit_at(expected.clone(), expected.chars().count(), now);
                }
                Op::Backspace => {
                    expected.pop();
                    ctl.on_user_edit_at(expected.clone(), expected.chars().count(), now);
                }
                Op::External(value) => {
                    let out = ctl.reconcile_external_at(value, None, now);
                    prop_assert!(matches!(out, Reconciled::Deferred | Reconciled::Unchanged));
                }
                Op::FlushAndEcho => {
                    dispatcher.borrow_mut().flush_at(&mut model, now);
                    if let Some(echo) = model.candidate(&id) {
                        let cursor = ctl.cursor();
                        let out = ctl.handle_at(echo, now);
                        prop_assert!(out.is_some());
                        prop_assert_eq!(ctl.cursor(), cursor);
                    }
                }
            }
            prop_assert_eq!(ctl.live_value(), expected.as_str());
            prop_assert!(ctl.cursor() <= ctl.live_value().chars().count());
        }
    }

    // Applying any external value keeps the cursor within the new buffer.
    #[test]
    fn cursor_stays_in_bounds_after_apply(initial in "\\PC{0,20}", cursor in 0usize..40, next in "\\PC{0,20}") {
        let dispatcher = Rc::new(RefCell::new(ChangeDispatcher::new(Duration::ZERO)));
        let mut ctl = EditableFieldController::new(
            FieldId::new("notes"),
            initial.clone(),
            FocusGuard::new(Duration::from_millis(300)),
            dispatcher,
        );
        ctl.on_user_edit(initial, cursor);
        ctl.on_blur();
        ctl.reconcile_external(next.clone(), None);
        prop_assert_eq!(ctl.live_value(), next.as_str());
        prop_assert!(ctl.cursor() <= next.chars().count());
    }
}
