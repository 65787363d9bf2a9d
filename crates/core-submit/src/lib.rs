//! Composite form submission.
//!
//! A `FormSchema` names the fields of a form; `SubmissionCoordinator` owns one
//! `EditableFieldController` per field, reads their live buffers at submit
//! time, validates and parses them into a `FormPayload`, and hands that to a
//! `SubmitCollaborator`. Buffers reset on success (when configured) and are
//! kept on failure.

pub mod coordinator;
pub mod error;
pub mod payload;
pub mod schema;

pub use coordinator::{
    BatchSubmission, ParsedBatch, SubmissionCoordinator, SubmissionState, SubmitCollaborator,
    SubmitReport,
};
pub use error::{SubmitError, SubmitFailure, ValidationError};
pub use payload::{BulkUrlPayload, EmailCampaignPayload, FormPayload, Priority, SubmitReceipt};
pub use schema::{FieldKind, FieldSpec, FormSchema};
