//! Delivery and fault handler registration
//!
//! Handlers are broadcast targets: every registered delivery handler sees
//! every drained item, in registration order, and every registered fault
//! handler sees every fault. The worker takes a snapshot of the handler lists
//! before invoking them so no lock is held while user code runs.

use crate::core::sync::recover_poison;
use std::any::Any;
use std::sync::{Arc, RwLock};

/// Error a delivery handler may return to report a failed delivery
pub type DeliveryError = Box<dyn std::error::Error + Send + Sync>;

pub type DeliveryResult = Result<(), DeliveryError>;

pub(crate) type DeliveryHandler<T> = Arc<dyn Fn(&T) -> DeliveryResult + Send + Sync>;
pub(crate) type FaultHandler = Arc<dyn Fn(&HandlerFault) + Send + Sync>;

/// A delivery handler returned an error or panicked
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Delivery handler #{handler_index} failed for priority {priority} item: {message}")]
pub struct HandlerFault {
    /// Priority the item was enqueued with
    pub priority: i32,
    /// Registration index of the handler that failed
    pub handler_index: usize,
    pub message: String,
    /// True when the handler panicked rather than returning an error
    pub panicked: bool,
}

impl HandlerFault {
    pub(crate) fn from_error(priority: i32, handler_index: usize, error: &DeliveryError) -> Self {
        Self {
            priority,
            handler_index,
            message: error.to_string(),
            panicked: false,
        }
    }

    pub(crate) fn from_panic(
        priority: i32,
        handler_index: usize,
        payload: &(dyn Any + Send),
    ) -> Self {
        Self {
            priority,
            handler_index,
            message: panic_message(payload),
            panicked: true,
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub(crate) struct HandlerRegistry<T> {
    delivery: RwLock<Vec<DeliveryHandler<T>>>,
    fault: RwLock<Vec<FaultHandler>>,
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self {
            delivery: RwLock::new(Vec::new()),
            fault: RwLock::new(Vec::new()),
        }
    }

    pub fn add_delivery(&self, handler: DeliveryHandler<T>) {
        recover_poison(self.delivery.write(), "delivery handlers").push(handler);
    }

    pub fn add_fault(&self, handler: FaultHandler) {
        recover_poison(self.fault.write(), "fault handlers").push(handler);
    }

    pub fn delivery_snapshot(&self) -> Vec<DeliveryHandler<T>> {
        recover_poison(self.delivery.read(), "delivery handlers").clone()
    }

    pub fn fault_snapshot(&self) -> Vec<FaultHandler> {
        recover_poison(self.fault.read(), "fault handlers").clone()
    }

    pub fn delivery_handler_count(&self) -> usize {
        recover_poison(self.delivery.read(), "delivery handlers").len()
    }

    pub fn fault_handler_count(&self) -> usize {
        recover_poison(self.fault.read(), "fault handlers").len()
    }
}
