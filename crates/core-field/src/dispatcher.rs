//! Change dispatcher: coalesces per-field edit bursts into single outbound notifications.
//!
//! Producers call `notify` on every keystroke. `flush` hands each coalesced
//! burst to the external model as one `Notification` once the burst has been
//! quiet for the debounce window (a zero window flushes everything queued in
//! the current tick).
//!
//! Merge semantics:
//! - Within one field only the last value of a burst is sent.
//! - Distinct fields keep the order in which their bursts started.
//! - A burst still inside its window stays queued; later ready bursts are not
//!   held back by it.
//! - A rejected proposal is dropped, not retried. Transport failures belong to
//!   submission, not per-keystroke sync.
//!
//! Successful proposals are recorded per field (value, echo tag, sequence) so
//! controllers can advance their committed value and recognize echoes. A short
//! history of tags is kept: a model may replay an older delivery after a newer
//! one has already gone out, and that stale echo must not be mistaken for a
//! third-party change.

use core_config::Config;
use core_events::{EchoTag, ExternalModel, FieldId, Notification};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Number of delivered echo tags remembered per field.
pub const ECHO_HISTORY: usize = 8;

/// Shared handle: every controller of a form proposes through the same dispatcher.
pub type DispatcherHandle = Rc<RefCell<ChangeDispatcher>>;

#[derive(Debug, Clone)]
struct PendingBurst {
    field: FieldId,
    value: String,
    last_at: Instant,
}

/// Last successful proposal for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub value: String,
    pub echo: EchoTag,
    /// Monotonic per dispatcher; lets a controller tell whether it has seen this delivery.
    pub seq: u64,
}

#[derive(Debug)]
struct DeliveryLog {
    last: Delivery,
    recent: VecDeque<EchoTag>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
    pub held: usize,
}

#[derive(Debug, Default)]
pub struct DispatchMetrics {
    notified: AtomicU64,
    coalesced: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub notified: u64,
    pub coalesced: u64,
    pub delivered: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl DispatchMetrics {
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            notified: self.notified.load(Relaxed),
            coalesced: self.coalesced.load(Relaxed),
            delivered: self.delivered.load(Relaxed),
            failed: self.failed.load(Relaxed),
            cancelled: self.cancelled.load(Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct ChangeDispatcher {
    debounce_window: Duration,
    /// Queue of bursts in first-arrival order.
    pending: Vec<PendingBurst>,
    deliveries: BTreeMap<FieldId, DeliveryLog>,
    seq: u64,
    metrics: DispatchMetrics,
}

impl Default for ChangeDispatcher {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ChangeDispatcher {
    pub fn new(debounce_window: Duration) -> Self {
        Self {
            debounce_window,
            pending: Vec::new(),
            deliveries: BTreeMap::new(),
            seq: 0,
            metrics: DispatchMetrics::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.debounce_window())
    }

    pub fn shared(config: &Config) -> DispatcherHandle {
        Rc::new(RefCell::new(Self::from_config(config)))
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub fn metrics_snapshot(&self) -> DispatchMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn notify(&mut self, field: &FieldId, value: &str) {
        self.notify_at(field, value, Instant::now());
    }

    /// Record the latest value for `field`. Repeated calls before a flush collapse into one.
    pub fn notify_at(&mut self, field: &FieldId, value: &str, now: Instant) {
        self.metrics.notified.fetch_add(1, Relaxed);
        if let Some(burst) = self.pending.iter_mut().find(|b| &b.field == field) {
            self.metrics.coalesced.fetch_add(1, Relaxed);
            burst.value.clear();
            burst.value.push_str(value);
            burst.last_at = now;
        } else {
            self.pending.push(PendingBurst {
                field: field.clone(),
                value: value.to_string(),
                last_at: now,
            });
        }
        trace!(target: "field.dispatch", %field, value_len = value.len(), "notify");
    }

    pub fn has_pending(&self, field: &FieldId) -> bool {
        self.pending.iter().any(|b| &b.field == field)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop a queued burst (widget teardown). Returns true when something was cancelled.
    pub fn cancel(&mut self, field: &FieldId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|b| &b.field != field);
        let cancelled = self.pending.len() != before;
        if cancelled {
            self.metrics.cancelled.fetch_add(1, Relaxed);
            trace!(target: "field.dispatch", %field, "burst_cancelled");
        }
        cancelled
    }

    pub fn flush(&mut self, model: &mut dyn ExternalModel) -> FlushReport {
        self.flush_at(model, Instant::now())
    }

    /// Send every burst that has been quiet for at least the debounce window.
    pub fn flush_at(&mut self, model: &mut dyn ExternalModel, now: Instant) -> FlushReport {
        let mut report = FlushReport::default();
        let window = self.debounce_window;
        let (ready, held): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|b| now.saturating_duration_since(b.last_at) >= window);
        self.pending = held;
        report.held = self.pending.len();

        for burst in ready {
            let notification = Notification::new(burst.field, burst.value);
            match model.propose(&notification) {
                Ok(()) => {
                    report.delivered += 1;
                    self.metrics.delivered.fetch_add(1, Relaxed);
                    self.record_delivery(notification);
                }
                Err(err) => {
                    report.failed += 1;
                    self.metrics.failed.fetch_add(1, Relaxed);
                    warn!(
                        target: "field.dispatch",
                        field = %notification.field,
                        value_len = notification.value.len(),
                        error = %err,
                        "proposal_rejected"
                    );
                }
            }
        }
        if report != FlushReport::default() {
            trace!(
                target: "field.dispatch",
                delivered = report.delivered,
                failed = report.failed,
                held = report.held,
                "flush"
            );
        }
        report
    }

    fn record_delivery(&mut self, notification: Notification) {
        self.seq += 1;
        let delivery = Delivery {
            value: notification.value,
            echo: notification.echo,
            seq: self.seq,
        };
        match self.deliveries.get_mut(&notification.field) {
            Some(log) => {
                if log.recent.len() == ECHO_HISTORY {
                    log.recent.pop_front();
                }
                log.recent.push_back(delivery.echo);
                log.last = delivery;
            }
            None => {
                let mut recent = VecDeque::with_capacity(ECHO_HISTORY);
                recent.push_back(delivery.echo);
                self.deliveries.insert(
                    notification.field,
                    DeliveryLog {
                        last: delivery,
                        recent,
                    },
                );
            }
        }
    }

    /// Last successful delivery for `field`.
    pub fn delivered(&self, field: &FieldId) -> Option<&Delivery> {
        self.deliveries.get(field).map(|log| &log.last)
    }

    /// True when `tag` was produced for `(field, value)` and belongs to one of
    /// this field's recent deliveries.
    pub fn is_own_echo(&self, field: &FieldId, value: &str, tag: EchoTag) -> bool {
        tag.matches(field, value)
            && self
                .deliveries
                .get(field)
                .is_some_and(|log| log.recent.contains(&tag))
    }
}
