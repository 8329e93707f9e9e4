//! Callback Reconciler
//!
//! Applies authenticated gateway notifications to the order ledger.
//!
//! Safe under duplicate, concurrent and out-of-order delivery:
//! - `payment_event (transaction_id, transaction_status)` is the dedup guard
//! - `UPDATE orders ... WHERE status = 'PENDING'` is the reordering guard
//!
//! The event insert is the first statement of the unit of work, so SQLite
//! hands us the write lock before any state is read.

use super::mapping::target_status;
use super::stats::ReconcileStats;
use super::transition::apply_transition;
use super::{ReconcileError, ReconcileOutcome};
use crate::db::repository::{RepoError, RepoResult, order, payment_event, product};
use crate::gateway::{PaymentCallback, PaymentGateway};
use crate::notify::ChannelRegistry;
use crate::security_log;
use shared::order::OrderStatus;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Outcome labels stored on `payment_event.outcome`
const OUTCOME_APPLIED: &str = "APPLIED";
const OUTCOME_NOOP: &str = "NOOP";
const OUTCOME_ILLEGAL: &str = "ILLEGAL_TRANSITION";
const OUTCOME_AMOUNT_MISMATCH: &str = "AMOUNT_MISMATCH";

#[derive(Clone)]
pub struct Reconciler {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    channels: ChannelRegistry,
    notify_wake: mpsc::Sender<()>,
    stats: Arc<ReconcileStats>,
    unit_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        channels: ChannelRegistry,
        notify_wake: mpsc::Sender<()>,
        stats: Arc<ReconcileStats>,
        unit_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            gateway,
            channels,
            notify_wake,
            stats,
            unit_timeout,
        }
    }

    pub fn stats(&self) -> &Arc<ReconcileStats> {
        &self.stats
    }

    /// Process one callback. Only a bad signature is an error; everything
    /// else is acknowledged with an outcome.
    pub async fn handle(
        &self,
        callback: &PaymentCallback,
        raw_payload: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = callback.order_id.as_str();

        // 1. Order lookup
        match order::find_by_reference(&self.pool, reference).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                security_log!(
                    "WARN",
                    "callback_unknown_order",
                    reference = reference,
                    transaction_id = callback.transaction_id.as_str()
                );
                return Ok(self.finish(ReconcileOutcome::UnknownOrder));
            }
            Err(e) => {
                tracing::error!(reference = %reference, error = %e, "Callback order lookup failed");
                return Ok(self.finish(ReconcileOutcome::InternalError));
            }
        }

        // 2. Authenticity
        let verification = self.gateway.verify(callback);
        if !verification.authentic {
            self.stats.record_signature_rejected();
            security_log!(
                "WARN",
                "callback_signature_invalid",
                reference = reference,
                transaction_id = callback.transaction_id.as_str()
            );
            return Err(ReconcileError::SignatureInvalid);
        }

        // 3-8. One unit of work, bounded
        let status = verification.status;
        let event_key = status.event_key();
        let target = target_status(&status);
        let unit = self.apply(callback, &event_key, target, raw_payload);
        let outcome = match tokio::time::timeout(self.unit_timeout, unit).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(
                    reference = %reference,
                    transaction_id = %callback.transaction_id,
                    status = %event_key,
                    error = %e,
                    "Callback processing failed, needs manual follow-up"
                );
                ReconcileOutcome::InternalError
            }
            Err(_) => {
                tracing::error!(
                    reference = %reference,
                    transaction_id = %callback.transaction_id,
                    status = %event_key,
                    "Callback processing timed out, needs manual follow-up"
                );
                ReconcileOutcome::InternalError
            }
        };

        // 9. Post-commit, best effort
        if let ReconcileOutcome::Applied { to, .. } = outcome {
            let _ = self.notify_wake.try_send(());
            if to == OrderStatus::Paid {
                self.spawn_sold_count(reference.to_string());
            }
        }

        Ok(self.finish(outcome))
    }

    async fn apply(
        &self,
        callback: &PaymentCallback,
        event_key: &str,
        target: Option<OrderStatus>,
        raw_payload: &str,
    ) -> RepoResult<ReconcileOutcome> {
        let txn_id = callback.transaction_id.as_str();
        let reference = callback.order_id.as_str();
        let mut tx = self.pool.begin().await?;

        if !payment_event::insert_if_new(&mut tx, txn_id, event_key, reference, raw_payload).await? {
            tracing::debug!(reference = %reference, transaction_id = %txn_id, status = %event_key, "Duplicate callback");
            return Ok(ReconcileOutcome::Duplicate);
        }

        let current = order::find_by_reference_tx(&mut tx, reference)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("order {reference}")))?;

        let Some(to) = target else {
            payment_event::set_outcome(&mut tx, txn_id, event_key, OUTCOME_NOOP).await?;
            tx.commit().await?;
            tracing::info!(reference = %reference, status = %event_key, current = %current.status, "Callback requires no transition");
            return Ok(ReconcileOutcome::NoOp);
        };

        if callback.gross_amount_minor() != Some(current.total) {
            payment_event::set_outcome(&mut tx, txn_id, event_key, OUTCOME_AMOUNT_MISMATCH).await?;
            tx.commit().await?;
            security_log!(
                "WARN",
                "callback_amount_mismatch",
                reference = reference,
                gross_amount = callback.gross_amount.as_str(),
                expected = current.total
            );
            return Ok(ReconcileOutcome::IllegalTransition {
                current: current.status,
                attempted: to,
            });
        }

        match apply_transition(&mut tx, &current, to, Some(txn_id), &self.channels).await? {
            Some(applied) => {
                payment_event::set_outcome(&mut tx, txn_id, event_key, OUTCOME_APPLIED).await?;
                tx.commit().await?;
                tracing::info!(
                    reference = %reference,
                    transaction_id = %txn_id,
                    from = %applied.from,
                    to = %applied.to,
                    stock_restored = applied.stock_restored,
                    "Payment callback applied"
                );
                Ok(ReconcileOutcome::Applied {
                    from: applied.from,
                    to: applied.to,
                })
            }
            None => {
                payment_event::set_outcome(&mut tx, txn_id, event_key, OUTCOME_ILLEGAL).await?;
                tx.commit().await?;
                tracing::warn!(
                    reference = %reference,
                    transaction_id = %txn_id,
                    current = %current.status,
                    attempted = %to,
                    "Illegal transition ignored"
                );
                Ok(ReconcileOutcome::IllegalTransition {
                    current: current.status,
                    attempted: to,
                })
            }
        }
    }

    fn finish(&self, outcome: ReconcileOutcome) -> ReconcileOutcome {
        self.stats.record(&outcome);
        outcome
    }

    /// Analytics only; failures never affect the callback
    fn spawn_sold_count(&self, reference: String) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let result: RepoResult<()> = async {
                let Some(order) = order::find_by_reference(&pool, &reference).await? else {
                    return Ok(());
                };
                for item in order::find_items(&pool, order.id).await? {
                    product::add_sold_count(&pool, item.product_id, item.quantity).await?;
                }
                Ok(())
            }
            .await;
            if let Err(e) = result {
                tracing::warn!(reference = %reference, error = %e, "Failed to update sold_count");
            }
        });
    }
}
