//! Focus-preserving synchronization between a widget's live buffer and an external model.
//!
//! Data flow for one field:
//!
//! ```text
//! keystroke -> EditableFieldController (live buffer) -> ChangeDispatcher (coalesced, echo-tagged)
//!           -> ExternalModel -> re-render candidate -> FocusGuard -> apply | acknowledge | defer
//! ```
//!
//! All types are single-threaded: a form shares one `DispatcherHandle`
//! (`Rc<RefCell<ChangeDispatcher>>`) between its controllers, and the host
//! drives everything from its UI thread.

pub mod controller;
pub mod dispatcher;
pub mod guard;
pub mod state;

pub use controller::{EditableFieldController, FieldView, Reconciled};
pub use dispatcher::{ChangeDispatcher, Delivery, DispatcherHandle, FlushReport};
pub use guard::{Decision, FocusGuard, Reason, Verdict};
pub use state::FieldState;
