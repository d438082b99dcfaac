//! In-process notification bus.
//!
//! Observers subscribe to one [`EventKind`] (or all of them) with a closure.
//! [`NotificationBus::publish`] calls every handler for the event's kind,
//! synchronously and in registration order. A handler that returns an error
//! or panics is logged and skipped; the remaining handlers still run.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::Serialize;
use steamwatch_core::{AppRecord, EventKind, Field, FieldValue, PackageId, PackageRecord};

use crate::error::HandlerError;

/// Event-specific data passed to handlers next to the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// `app_added` / `app_removed`: the app itself is the payload.
    App,
    PackageLinked { package: PackageRecord },
    /// A `*_changed` event. `package` is `None` for app-level fields.
    FieldChanged {
        package: Option<PackageId>,
        field: Field,
        previous: Option<FieldValue>,
        current: FieldValue,
    },
    /// A package price dropped to or below the app's threshold.
    Threshold {
        package: PackageId,
        threshold: i64,
        price: i64,
        currency: Option<String>,
    },
}

/// One published notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub app: AppRecord,
    pub payload: Payload,
}

/// Observer calling convention: `(kind, app, payload)`.
pub type Handler = Rc<dyn Fn(EventKind, &AppRecord, &Payload) -> Result<(), HandlerError>>;

/// What happened to one published event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct NotificationBus {
    handlers: BTreeMap<EventKind, Vec<Handler>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<H>(&mut self, kind: EventKind, handler: H)
    where
        H: Fn(EventKind, &AppRecord, &Payload) -> Result<(), HandlerError> + 'static,
    {
        self.handlers.entry(kind).or_default().push(Rc::new(handler));
    }

    /// Register one handler for every event kind.
    pub fn subscribe_all<H>(&mut self, handler: H)
    where
        H: Fn(EventKind, &AppRecord, &Payload) -> Result<(), HandlerError> + 'static,
    {
        let handler: Handler = Rc::new(handler);
        for kind in EventKind::all() {
            self.handlers
                .entry(*kind)
                .or_default()
                .push(Rc::clone(&handler));
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    pub fn publish(&self, event: &Event) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(handlers) = self.handlers.get(&event.kind) else {
            tracing::trace!(kind = %event.kind, "no handlers");
            return delivery;
        };

        for (index, handler) in handlers.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                handler(event.kind, &event.app, &event.payload)
            }));
            match outcome {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(err)) => {
                    delivery.failed += 1;
                    tracing::error!(
                        kind = %event.kind,
                        app = %event.app.id,
                        handler = index,
                        error = %err,
                        "handler failed"
                    );
                }
                Err(panic) => {
                    delivery.failed += 1;
                    tracing::error!(
                        kind = %event.kind,
                        app = %event.app.id,
                        handler = index,
                        panic = %panic_message(panic.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }
        tracing::debug!(kind = %event.kind, app = %event.app.id, ?delivery, "published");
        delivery
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
