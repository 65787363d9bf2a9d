//! Submission coordinator: gather -> validate -> submit -> reset | retain, single-flight.
//!
//! State machine:
//!
//! ```text
//! Idle -> Submitting -> Succeeded -> Idle   (buffers reset when the policy says so)
//!                    -> Failed    -> Idle   (buffers retained for correction)
//! ```
//!
//! `submit` takes `&self` so a second call can observe `Submitting` while the
//! first is suspended on the collaborator; that second call returns
//! `SubmitReport::InFlight` without touching anything. Field controllers stay
//! reachable through `field_mut` during the await, so keystrokes keep landing
//! in the live buffers. No `RefCell` borrow is held across the await.
//!
//! The in-flight flag is released by a drop guard, so a collaborator future
//! that is dropped before completing (timeout, unmount) cannot leave the
//! coordinator wedged in `Submitting`.

use crate::error::{SubmitError, SubmitFailure, ValidationError};
use crate::payload::{FormPayload, SubmitReceipt};
use crate::schema::{FieldKind, FieldSpec, FormSchema};
use core_config::Config;
use core_events::FieldId;
use core_field::{ChangeDispatcher, DispatcherHandle, EditableFieldController, FocusGuard};
use core_text::{ParseSummary, ValidatedEntry, parse, validate_formats};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, info, warn};

/// The external submit collaborator (HTTP client, queue, test double).
pub trait SubmitCollaborator {
    fn submit(
        &self,
        payload: FormPayload,
    ) -> impl Future<Output = Result<SubmitReceipt, SubmitFailure>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    pub raw_text: String,
    pub items: Vec<ValidatedEntry>,
}

/// Per-form record of the latest submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSubmission {
    pub batches: BTreeMap<String, ParsedBatch>,
    pub aux_fields: BTreeMap<String, String>,
    pub state: SubmissionState,
    pub summary: ParseSummary,
}

impl Default for BatchSubmission {
    fn default() -> Self {
        Self {
            batches: BTreeMap::new(),
            aux_fields: BTreeMap::new(),
            state: SubmissionState::Idle,
            summary: ParseSummary::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReport {
    /// Another submission was already in flight; this call did nothing.
    InFlight,
    Submitted {
        receipt: SubmitReceipt,
        summary: ParseSummary,
    },
}

struct Prepared {
    payload: FormPayload,
    record: BatchSubmission,
}

pub struct SubmissionCoordinator<C> {
    schema: FormSchema,
    collaborator: C,
    dispatcher: DispatcherHandle,
    fields: RefCell<BTreeMap<String, EditableFieldController>>,
    record: RefCell<BatchSubmission>,
    state: Cell<SubmissionState>,
    last_outcome: Cell<Option<SubmissionState>>,
    reset_on_success: bool,
}

/// Releases the in-flight flag if the submit future is dropped mid-await.
struct InFlightGuard<'a> {
    state: &'a Cell<SubmissionState>,
    record: &'a RefCell<BatchSubmission>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.state.get() == SubmissionState::Submitting {
            warn!(target: "submit", "submit_abandoned_in_flight");
            self.state.set(SubmissionState::Idle);
            if let Ok(mut record) = self.record.try_borrow_mut() {
                record.state = SubmissionState::Idle;
            }
        }
    }
}

impl<C: SubmitCollaborator> SubmissionCoordinator<C> {
    pub fn new(schema: FormSchema, collaborator: C, config: &Config) -> Self {
        let dispatcher = ChangeDispatcher::shared(config);
        let guard = FocusGuard::from_config(config);
        let fields = schema
            .fields
            .iter()
            .map(|spec| {
                let controller = EditableFieldController::new(
                    FieldId::new(spec.name.as_str()),
                    "",
                    guard,
                    dispatcher.clone(),
                );
                (spec.name.clone(), controller)
            })
            .collect();
        Self {
            schema,
            collaborator,
            dispatcher,
            fields: RefCell::new(fields),
            record: RefCell::new(BatchSubmission::default()),
            state: Cell::new(SubmissionState::Idle),
            last_outcome: Cell::new(None),
            reset_on_success: config.reset_on_success(),
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Dispatcher shared by this form's fields; the host flushes it into its model.
    pub fn dispatcher(&self) -> DispatcherHandle {
        self.dispatcher.clone()
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    pub fn state(&self) -> SubmissionState {
        self.state.get()
    }

    /// `Succeeded` or `Failed` for the most recent completed submission.
    pub fn last_outcome(&self) -> Option<SubmissionState> {
        self.last_outcome.get()
    }

    /// Held across a submit's completion, the record misses that attempt's state updates.
    pub fn record(&self) -> Ref<'_, BatchSubmission> {
        self.record.borrow()
    }

    /// Mutable access to one field's controller; `None` while another field is borrowed.
    /// Held across a successful submit's completion, it blocks reset-on-success.
    pub fn field_mut(&self, name: &str) -> Option<RefMut<'_, EditableFieldController>> {
        let fields = self.fields.try_borrow_mut().ok()?;
        RefMut::filter_map(fields, |fields| fields.get_mut(name)).ok()
    }

    /// Live value of every field; the authoritative read path at submit time.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.fields
            .borrow()
            .iter()
            .map(|(name, ctl)| (name.clone(), ctl.live_value().to_string()))
            .collect()
    }

    pub async fn submit(&self) -> Result<SubmitReport, SubmitError> {
        if self.state.get() == SubmissionState::Submitting {
            debug!(target: "submit", form = %self.schema.name, "submit_ignored_in_flight");
            return Ok(SubmitReport::InFlight);
        }

        let snapshot = self.snapshot();
        let prepared = self.prepare(&snapshot).inspect_err(|err| {
            info!(target: "submit", form = %self.schema.name, error = %err, "validation_failed");
        })?;
        let summary = prepared.record.summary;
        match self.record.try_borrow_mut() {
            Ok(mut record) => *record = prepared.record,
            Err(_) => warn!(target: "submit", form = %self.schema.name, "record_busy"),
        }

        self.transition(SubmissionState::Submitting);
        let guard = InFlightGuard {
            state: &self.state,
            record: &self.record,
        };
        let outcome = self.collaborator.submit(prepared.payload).await;

        let result = match outcome {
            Ok(receipt) => {
                self.transition(SubmissionState::Succeeded);
                self.last_outcome.set(Some(SubmissionState::Succeeded));
                if self.reset_on_success {
                    self.reset_fields();
                }
                info!(
                    target: "submit",
                    form = %self.schema.name,
                    accepted = ?receipt.accepted,
                    duplicates = ?receipt.duplicates,
                    skipped = summary.skipped,
                    "submit_succeeded"
                );
                Ok(SubmitReport::Submitted { receipt, summary })
            }
            Err(failure) => {
                self.transition(SubmissionState::Failed);
                self.last_outcome.set(Some(SubmissionState::Failed));
                warn!(target: "submit", form = %self.schema.name, reason = %failure.reason, "submit_failed");
                Err(SubmitError::Submission(failure))
            }
        };
        self.transition(SubmissionState::Idle);
        drop(guard);
        result
    }

    fn transition(&self, next: SubmissionState) {
        let prev = self.state.replace(next);
        match self.record.try_borrow_mut() {
            Ok(mut record) => record.state = next,
            Err(_) => warn!(target: "submit", form = %self.schema.name, to = ?next, "record_busy"),
        }
        debug!(target: "submit", form = %self.schema.name, from = ?prev, to = ?next, "state");
    }

    fn reset_fields(&self) {
        let Ok(mut fields) = self.fields.try_borrow_mut() else {
            warn!(target: "submit", form = %self.schema.name, "reset_skipped_fields_busy");
            return;
        };
        for ctl in fields.values_mut() {
            ctl.reset("");
        }
    }

    fn prepare(&self, snapshot: &BTreeMap<String, String>) -> Result<Prepared, ValidationError> {
        let mut payload = FormPayload {
            form: self.schema.name.clone(),
            ..FormPayload::default()
        };
        let mut record = BatchSubmission::default();
        let value_of = |spec: &FieldSpec| snapshot.get(&spec.name).map(String::as_str).unwrap_or("");

        // Required scalar fields first, then batches.
        for spec in &self.schema.fields {
            let raw = value_of(spec);
            let value = match &spec.kind {
                FieldKind::Batch { .. } => continue,
                FieldKind::Text => raw.trim().to_string(),
                FieldKind::Choice { options, default } => {
                    let chosen = raw.trim().to_ascii_lowercase();
                    match (chosen.is_empty(), default) {
                        (true, Some(default)) => default.clone(),
                        (true, None) => String::new(),
                        (false, _) if options.contains(&chosen) => chosen,
                        (false, _) => {
                            return Err(ValidationError::InvalidChoice {
                                field: spec.name.clone(),
                                allowed: options.join(", "),
                            });
                        }
                    }
                }
            };
            if spec.required && value.is_empty() {
                return Err(ValidationError::MissingField {
                    field: spec.name.clone(),
                });
            }
            record.aux_fields.insert(spec.name.clone(), raw.to_string());
            payload.fields.insert(spec.name.clone(), value);
        }

        for spec in &self.schema.fields {
            let FieldKind::Batch { item, strict } = spec.kind else {
                continue;
            };
            let raw = value_of(spec);
            let mut items = parse(raw, item);
            let summary = if strict {
                validate_formats(&mut items, item)
            } else {
                ParseSummary::of(&items)
            };
            if spec.required && summary.accepted == 0 {
                return Err(ValidationError::EmptyBatch {
                    field: spec.name.clone(),
                });
            }
            record.summary = record.summary.merge(summary);
            payload.batches.insert(
                spec.name.clone(),
                items
                    .iter()
                    .filter(|e| e.valid)
                    .map(|e| e.value.clone())
                    .collect(),
            );
            record.batches.insert(
                spec.name.clone(),
                ParsedBatch {
                    raw_text: raw.to_string(),
                    items,
                },
            );
        }

        Ok(Prepared { payload, record })
    }
}
