//! In-process reconciler counters (reset on restart)

use super::ReconcileOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ReconcileStats {
    applied: AtomicU64,
    noop: AtomicU64,
    duplicate: AtomicU64,
    illegal_transition: AtomicU64,
    unknown_order: AtomicU64,
    internal_error: AtomicU64,
    signature_rejected: AtomicU64,
}

/// Point-in-time copy for the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounters {
    pub applied: u64,
    pub noop: u64,
    pub duplicate: u64,
    pub illegal_transition: u64,
    pub unknown_order: u64,
    pub internal_error: u64,
    pub signature_rejected: u64,
}

impl ReconcileStats {
    pub fn record(&self, outcome: &ReconcileOutcome) {
        let counter = match outcome {
            ReconcileOutcome::Applied { .. } => &self.applied,
            ReconcileOutcome::NoOp => &self.noop,
            ReconcileOutcome::Duplicate => &self.duplicate,
            ReconcileOutcome::IllegalTransition { .. } => &self.illegal_transition,
            ReconcileOutcome::UnknownOrder => &self.unknown_order,
            ReconcileOutcome::InternalError => &self.internal_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_signature_rejected(&self) {
        self.signature_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReconcileCounters {
        ReconcileCounters {
            applied: self.applied.load(Ordering::Relaxed),
            noop: self.noop.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            illegal_transition: self.illegal_transition.load(Ordering::Relaxed),
            unknown_order: self.unknown_order.load(Ordering::Relaxed),
            internal_error: self.internal_error.load(Ordering::Relaxed),
            signature_rejected: self.signature_rejected.load(Ordering::Relaxed),
        }
    }
}
