//! In-process publish/subscribe dispatcher.
//!
//! Handlers are registered per [`EventType`] for the lifetime of the bus.
//! [`EventBus::publish`] snapshots the handlers subscribed at that moment,
//! runs them concurrently and returns once every one of them has finished.
//! A failing or panicking handler never prevents its siblings from running;
//! each failure is recorded in the returned [`PublishReport`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;

use super::base_event::{Event, EventType};

// ---------------------------------------------------------------------------
// Handler types
// ---------------------------------------------------------------------------

/// Asynchronous event handler.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Arc<Event>) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an [`EventHandler`].
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, event: Arc<Event>) -> anyhow::Result<()> {
        (self.0)(event).await
    }
}

/// Unique identifier for a subscribed handler.
#[derive(Clone)]
pub struct HandlerId {
    /// Human-readable name.
    pub name: String,
    id: u64,
}

impl fmt::Debug for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerId({}:{})", self.id, self.name)
    }
}

impl PartialEq for HandlerId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for HandlerId {}

static HANDLER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl HandlerId {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: HANDLER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[derive(Clone)]
struct HandlerEntry {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
}

// ---------------------------------------------------------------------------
// Publish report
// ---------------------------------------------------------------------------

/// Why a handler did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    Error(String),
    Panicked(String),
}

/// One handler's failure during a publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    pub handler: String,
    pub reason: FailureReason,
}

/// Outcome of a single [`EventBus::publish`] call.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub event_id: String,
    pub event_type: EventType,
    /// Number of handlers invoked.
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

impl PublishReport {
    /// True when every invoked handler returned `Ok`.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Typed publish/subscribe dispatcher.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventType, Vec<HandlerEntry>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(ty, entries)| (ty.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event_type`. There is no unsubscribe.
    pub fn subscribe(
        &self,
        event_type: EventType,
        name: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> HandlerId {
        let id = HandlerId::new(name);
        log::debug!("[EventBus] {:?} subscribed to {}", id, event_type);
        self.handlers
            .write()
            .entry(event_type)
            .or_default()
            .push(HandlerEntry {
                id: id.clone(),
                handler,
            });
        id
    }

    /// Register an async closure as a handler.
    pub fn subscribe_fn<F, Fut>(
        &self,
        event_type: EventType,
        name: impl Into<String>,
        handler: F,
    ) -> HandlerId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe(event_type, name, Arc::new(FnHandler(handler)))
    }

    /// Number of handlers currently subscribed to `event_type`.
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver `event` to every handler subscribed right now and wait for all
    /// of them. Handler failures are collected, never propagated.
    pub async fn publish(&self, event: Event) -> PublishReport {
        let event = Arc::new(event);
        let entries: Vec<HandlerEntry> = {
            let handlers = self.handlers.read();
            handlers.get(&event.event_type()).cloned().unwrap_or_default()
        };

        let mut report = PublishReport {
            event_id: event.id().to_string(),
            event_type: event.event_type(),
            delivered: entries.len(),
            failures: Vec::new(),
        };

        if entries.is_empty() {
            log::debug!("[EventBus] {} published with no subscribers", event.event_type());
            return report;
        }

        let runs = entries.into_iter().map(|entry| {
            let event = Arc::clone(&event);
            async move {
                let outcome = AssertUnwindSafe(entry.handler.handle(event))
                    .catch_unwind()
                    .await;
                let reason = match outcome {
                    Ok(Ok(())) => return None,
                    Ok(Err(err)) => FailureReason::Error(format!("{err:#}")),
                    Err(panic) => FailureReason::Panicked(panic_message(panic.as_ref())),
                };
                Some(HandlerFailure {
                    handler: entry.id.name,
                    reason,
                })
            }
        });

        report.failures = join_all(runs).await.into_iter().flatten().collect();

        for failure in &report.failures {
            log::error!(
                "[EventBus] handler '{}' failed on {}: {:?}",
                failure.handler,
                report.event_type,
                failure.reason
            );
        }
        log::debug!(
            "[EventBus] {} delivered to {} handler(s), {} failure(s)",
            report.event_type,
            report.delivered,
            report.failures.len()
        );
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn explode() -> anyhow::Result<()> {
        panic!("handler exploded")
    }

    fn attendance_event() -> Event {
        Event::new(
            EventType::AttendanceBelowThreshold,
            "academic",
            json!({"student_id": "S1", "percentage": 72}),
        )
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        let report = bus.publish(attendance_event()).await;
        assert_eq!(report.delivered, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_each_handler_runs_once_despite_failures() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let calls = calls.clone();
            bus.subscribe_fn(EventType::AttendanceBelowThreshold, format!("ok-{i}"), move |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }
        let failing_calls = calls.clone();
        bus.subscribe_fn(EventType::AttendanceBelowThreshold, "failing", move |_| {
            let calls = failing_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("database unavailable")
            }
        });
        let panicking_calls = calls.clone();
        bus.subscribe_fn(EventType::AttendanceBelowThreshold, "panicking", move |_| {
            let calls = panicking_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                explode()
            }
        });

        let report = bus.publish(attendance_event()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(report.delivered, 5);
        assert_eq!(report.failures.len(), 2);

        let failing = report.failures.iter().find(|f| f.handler == "failing").unwrap();
        assert_eq!(
            failing.reason,
            FailureReason::Error("database unavailable".to_string())
        );
        let panicking = report.failures.iter().find(|f| f.handler == "panicking").unwrap();
        assert_eq!(
            panicking.reason,
            FailureReason::Panicked("handler exploded".to_string())
        );
    }

    #[tokio::test]
    async fn test_handlers_run_concurrently_and_publish_joins() {
        let bus = EventBus::new();
        let finished = Arc::new(AtomicUsize::new(0));
        for i in 0..4 {
            let finished = finished.clone();
            bus.subscribe_fn(EventType::GradeChanged, format!("slow-{i}"), move |_| {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        let started = Instant::now();
        let report = bus
            .publish(Event::new(EventType::GradeChanged, "exam", json!({})))
            .await;
        let elapsed = started.elapsed();

        assert_eq!(finished.load(Ordering::SeqCst), 4, "publish returned before handlers finished");
        assert!(report.is_clean());
        assert!(elapsed < Duration::from_millis(700), "handlers ran sequentially: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(attendance_event()).await;

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        bus.subscribe_fn(EventType::AttendanceBelowThreshold, "late", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        bus.publish(attendance_event()).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handlers_only_receive_their_type() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        bus.subscribe_fn(EventType::WorkflowCompleted, "wf", move |event| {
            let counter = counter.clone();
            async move {
                assert_eq!(event.event_type(), EventType::WorkflowCompleted);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        bus.publish(attendance_event()).await;
        bus.publish(Event::new(EventType::WorkflowCompleted, "workflow", json!({})))
            .await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(EventType::WorkflowCompleted), 1);
        assert_eq!(bus.handler_count(EventType::GradeChanged), 0);
    }
}
