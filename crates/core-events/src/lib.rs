//! Shared event and boundary types for field synchronization.
//!
//! Everything that crosses a widget boundary lives here: the identifier of a
//! field, the echo tag attached to outbound notifications, the events a host
//! routes into a controller, and the external state model contract.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters. They can be inspected in tests or periodically logged by a host.
// -------------------------------------------------------------------------------------------------
pub static PROPOSALS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
pub static PROPOSALS_REJECTED: AtomicU64 = AtomicU64::new(0);
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Stable identifier of one field within a form (e.g. `"subject"`, `"recipients"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Tag identifying a value a controller itself sent upstream.
///
/// Computed as a content hash of `(field_id, value)`. `DefaultHasher::new()`
/// uses fixed keys, so the same pair hashes identically for the lifetime of
/// the process, which is all the round trip needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EchoTag(u64);

impl EchoTag {
    pub fn of(field: &FieldId, value: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        field.hash(&mut hasher);
        value.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// True when this tag was produced for exactly `(field, value)`.
    pub fn matches(&self, field: &FieldId, value: &str) -> bool {
        *self == Self::of(field, value)
    }
}

/// Outbound notification produced by the dispatcher for one coalesced burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub field: FieldId,
    pub value: String,
    pub echo: EchoTag,
}

impl Notification {
    pub fn new(field: FieldId, value: String) -> Self {
        let echo = EchoTag::of(&field, &value);
        Self { field, value, echo }
    }
}

/// Events a host routes into a single field controller.
///
/// Payload-bearing variants are never logged verbatim; consumers log only
/// discriminants or lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    /// The widget's buffer after a keystroke, paste, or cut, with the new cursor (char index).
    Keystroke { text: String, cursor: usize },
    Focus,
    Blur,
    /// The external model re-rendered the widget with a candidate value. `echo` is present
    /// when the model is replaying a notification it received from this widget.
    External {
        value: String,
        echo: Option<EchoTag>,
    },
}

impl FieldEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldEvent::Keystroke { .. } => "keystroke",
            FieldEvent::Focus => "focus",
            FieldEvent::Blur => "blur",
            FieldEvent::External { .. } => "external",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("external model rejected proposal for field `{field}`: {reason}")]
    Rejected { field: FieldId, reason: String },
    #[error("external model channel closed")]
    Closed,
    #[error("external model channel full")]
    Full,
}

/// The externally owned state model that controllers read from and propose values to.
///
/// Controllers never mutate it directly: values reach it only through
/// `ChangeDispatcher::flush`, and changes come back as `FieldEvent::External`.
pub trait ExternalModel {
    fn current_value(&self, field: &FieldId) -> Option<String>;
    fn propose(&mut self, notification: &Notification) -> Result<(), ModelError>;
}

/// In-memory external model.
///
/// Records every accepted proposal and remembers the echo tag of the last one
/// per field so `candidate` can replay it the way a re-rendering host would.
#[derive(Debug, Default, Clone)]
pub struct MemoryModel {
    values: BTreeMap<FieldId, String>,
    last_echo: BTreeMap<FieldId, EchoTag>,
    proposals: Vec<Notification>,
    rejecting: bool,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Third-party write (another widget, a server push, a derived value).
    pub fn set_external(&mut self, field: &FieldId, value: impl Into<String>) {
        self.values.insert(field.clone(), value.into());
        self.last_echo.remove(field);
    }

    /// Candidate event a re-render would feed back to the widget for `field`.
    pub fn candidate(&self, field: &FieldId) -> Option<FieldEvent> {
        let value = self.values.get(field)?.clone();
        let echo = self
            .last_echo
            .get(field)
            .copied()
            .filter(|tag| tag.matches(field, &value));
        Some(FieldEvent::External { value, echo })
    }

    pub fn proposals(&self) -> &[Notification] {
        &self.proposals
    }

    /// Make subsequent proposals fail (simulates a model that refuses writes).
    pub fn set_rejecting(&mut self, rejecting: bool) {
        self.rejecting = rejecting;
    }
}

impl ExternalModel for MemoryModel {
    fn current_value(&self, field: &FieldId) -> Option<String> {
        self.values.get(field).cloned()
    }

    fn propose(&mut self, notification: &Notification) -> Result<(), ModelError> {
        if self.rejecting {
            PROPOSALS_REJECTED.fetch_add(1, Ordering::Relaxed);
            return Err(ModelError::Rejected {
                field: notification.field.clone(),
                reason: "model is read-only".to_string(),
            });
        }
        PROPOSALS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
        self.values
            .insert(notification.field.clone(), notification.value.clone());
        self.last_echo
            .insert(notification.field.clone(), notification.echo);
        self.proposals.push(notification.clone());
        Ok(())
    }
}

/// External model adapter that forwards proposals to an async consumer.
///
/// `propose` uses `try_send` so the UI thread never parks on a slow consumer;
/// a full or closed channel is reported as a failed proposal.
pub struct ChannelModel {
    tx: Sender<Notification>,
    mirror: BTreeMap<FieldId, String>,
}

impl ChannelModel {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self {
            tx,
            mirror: BTreeMap::new(),
        }
    }
}

impl ExternalModel for ChannelModel {
    fn current_value(&self, field: &FieldId) -> Option<String> {
        self.mirror.get(field).cloned()
    }

    fn propose(&mut self, notification: &Notification) -> Result<(), ModelError> {
        match self.tx.try_send(notification.clone()) {
            Ok(()) => {
                self.mirror
                    .insert(notification.field.clone(), notification.value.clone());
                Ok(())
            }
            Err(err) => {
                CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "events.channel",
                    field = %notification.field,
                    value_len = notification.value.len(),
                    "notification_send_failed"
                );
                Err(match err {
                    TrySendError::Full(_) => ModelError::Full,
                    TrySendError::Closed(_) => ModelError::Closed,
                })
            }
        }
    }
}
