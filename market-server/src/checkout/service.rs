//! Checkout service - 下单、取消、重新支付
//!
//! No transaction is ever held across gateway I/O: the order is committed
//! first, the payment handle is requested and attached afterwards.

use super::reference::generate_reference;
use super::validator::{ValidatedRequest, price_lines, validate_request};
use super::{CheckoutError, CheckoutRequest, CheckoutResult};
use crate::core::config::PricingConfig;
use crate::db::repository::order::NewOrder;
use crate::db::repository::{RepoError, buyer, order, product, stock};
use crate::gateway::{PaymentGateway, PaymentHandle};
use crate::notify::ChannelRegistry;
use crate::pricing::{Quote, quote};
use crate::reconcile::transition::apply_transition;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::order::{Order, OrderDetail, OrderLineItem, OrderStatus, PaymentStatus};
use sqlx::SqlitePool;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;

/// Produces a candidate order reference for the given instant
type ReferenceSource = Arc<dyn Fn(DateTime<Utc>) -> String + Send + Sync>;

/// Fresh references tried before giving up
const MAX_REFERENCE_ATTEMPTS: usize = 5;

/// Stale orders cancelled per sweep
const SWEEP_BATCH: i64 = 100;

#[derive(Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    channels: ChannelRegistry,
    notify_wake: mpsc::Sender<()>,
    pricing: PricingConfig,
    unit_timeout: Duration,
    next_reference: ReferenceSource,
}

impl CheckoutService {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        channels: ChannelRegistry,
        notify_wake: mpsc::Sender<()>,
        pricing: PricingConfig,
        unit_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            gateway,
            channels,
            notify_wake,
            pricing,
            unit_timeout,
            next_reference: Arc::new(generate_reference),
        }
    }

    #[cfg(test)]
    fn with_reference_source(mut self, source: ReferenceSource) -> Self {
        self.next_reference = source;
        self
    }

    /// Place an order for `buyer_id` and open a hosted payment page for it
    pub async fn checkout(&self, buyer_id: i64, req: CheckoutRequest) -> AppResult<CheckoutResult> {
        let mut validated = validate_request(&req)?;

        let buyer = buyer::find_by_id(&self.pool, buyer_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::BuyerNotFound))?;
        let member_pricing =
            validated.use_member_price && buyer.membership_status.is_eligible_for_member_price();

        // 未填写联系邮箱时使用买家档案中的邮箱，作为通知的备用通道
        if validated.contact_email.is_none() {
            validated.contact_email = buyer.email.clone().filter(|e| !e.trim().is_empty());
        }

        let ids: Vec<i64> = validated.lines.iter().map(|(id, _)| *id).collect();
        let products = product::find_by_ids(&self.pool, &ids).await?;
        let now = Utc::now();
        let lines = price_lines(&validated.lines, &products, now.timestamp_millis(), member_pricing)?;
        let quote = quote(
            lines,
            &validated.shipping.province,
            validated.payment_method,
            &self.pricing,
        );

        let order_id = self.place_with_fresh_reference(buyer_id, &validated, &quote, now).await?;

        let order = order::find_by_id(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::internal("order vanished after commit"))?;
        tracing::info!(
            order_id = order.id,
            reference = %order.reference,
            buyer_id,
            total = order.total,
            "Order placed"
        );

        let payment = self.open_payment(&order).await?;
        Ok(CheckoutResult {
            order_id: order.id,
            reference: order.reference.clone(),
            costs: order.costs(),
            payment,
        })
    }

    /// Run the unit of work, drawing a fresh reference after each UNIQUE collision
    async fn place_with_fresh_reference(
        &self,
        buyer_id: i64,
        validated: &ValidatedRequest,
        quote: &Quote,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let reference = (self.next_reference)(now);
            let new_order = NewOrder {
                id: shared::util::snowflake_id(),
                reference: &reference,
                buyer_id,
                costs: quote.costs,
                shipping: &validated.shipping,
                contact_email: validated.contact_email.as_deref(),
                payment_method: validated.payment_method,
                created_at: now.timestamp_millis(),
            };
            match self.place_order(&new_order, quote).await {
                Ok(()) => return Ok(new_order.id),
                Err(CheckoutError::ReferenceCollision) => {
                    tracing::warn!(reference = %reference, attempt, "Order reference collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::error!(buyer_id, attempts = MAX_REFERENCE_ATTEMPTS, "No free order reference");
        Err(AppError::new(ErrorCode::OrderReferenceExhausted))
    }

    /// Order header, line items and stock reservations in one transaction
    async fn place_order(&self, new_order: &NewOrder<'_>, quote: &Quote) -> Result<(), CheckoutError> {
        let unit = async {
            let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

            // First statement is a write: takes the SQLite write lock
            match order::insert(&mut tx, new_order).await {
                Ok(()) => {}
                Err(RepoError::Duplicate(_)) => return Err(CheckoutError::ReferenceCollision),
                Err(e) => return Err(e.into()),
            }

            for line in &quote.lines {
                if !stock::reserve(&mut tx, line.product_id, line.quantity).await? {
                    let available = stock::available(&mut tx, line.product_id).await?;
                    return Err(CheckoutError::OutOfStock {
                        product_id: line.product_id,
                        requested: line.quantity,
                        available,
                    });
                }
                let item = OrderLineItem {
                    id: shared::util::snowflake_id(),
                    order_id: new_order.id,
                    product_id: line.product_id,
                    product_name: line.product_name.clone(),
                    base_price: line.base_price,
                    unit_price: line.unit_price,
                    weight_grams: line.weight_grams,
                    quantity: line.quantity,
                    subtotal: line.subtotal(),
                };
                order::insert_item(&mut tx, &item).await?;
            }

            tx.commit().await.map_err(RepoError::from)?;
            Ok::<(), CheckoutError>(())
        };

        tokio::time::timeout(self.unit_timeout, unit)
            .await
            .map_err(|_| CheckoutError::Timeout)?
    }

    /// Create and attach a payment handle for a committed PENDING order
    async fn open_payment(&self, order: &Order) -> AppResult<PaymentHandle> {
        let items = order::find_items(&self.pool, order.id).await?;
        let handle = self.gateway.create_handle(order, &items).await.map_err(|e| {
            tracing::warn!(
                order_id = order.id,
                reference = %order.reference,
                error = %e,
                "Payment handle creation failed, order stays PENDING"
            );
            AppError::gateway(e.to_string())
                .with_detail("reference", order.reference.clone())
                .with_detail("order_id", order.id)
        })?;

        if !order::attach_payment_handle(&self.pool, order.id, &handle.token, &handle.redirect_url).await? {
            return Err(AppError::illegal_transition("order is no longer pending")
                .with_detail("reference", order.reference.clone()));
        }
        Ok(handle)
    }

    /// Order with line items, only for its owner
    pub async fn get_order(&self, buyer_id: i64, reference: &str) -> AppResult<OrderDetail> {
        match order::find_detail(&self.pool, reference).await? {
            Some(detail) if detail.order.buyer_id == buyer_id => Ok(detail),
            _ => Err(AppError::new(ErrorCode::OrderNotFound).with_detail("reference", reference)),
        }
    }

    async fn owned_order(&self, buyer_id: i64, reference: &str) -> AppResult<Order> {
        match order::find_by_reference(&self.pool, reference).await? {
            Some(order) if order.buyer_id == buyer_id => Ok(order),
            _ => Err(AppError::new(ErrorCode::OrderNotFound).with_detail("reference", reference)),
        }
    }

    /// Buyer cancellation: only before a payment handle exists
    pub async fn cancel_order(&self, buyer_id: i64, reference: &str) -> AppResult<Order> {
        let current = self.owned_order(buyer_id, reference).await?;
        if !self.cancel_unpaid(&current).await? {
            return Err(AppError::with_message(
                ErrorCode::OrderNotCancellable,
                format!("order {reference} can no longer be cancelled"),
            )
            .with_detail("status", current.status.as_str()));
        }
        tracing::info!(reference = %reference, buyer_id, "Order cancelled by buyer");
        order::find_by_id(&self.pool, current.id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))
    }

    /// PENDING/unpaid/no-handle → CANCELLED with stock restore and notification.
    /// Returns `false` if the order is not in that state anymore.
    async fn cancel_unpaid(&self, current: &Order) -> AppResult<bool> {
        if current.status != OrderStatus::Pending
            || current.payment_status != PaymentStatus::Pending
            || current.has_payment_handle()
        {
            return Ok(false);
        }

        let unit = async {
            let mut tx = self.pool.begin().await?;
            if !order::lock_cancellable(&mut tx, current.id).await? {
                return Ok(false);
            }
            let applied =
                apply_transition(&mut tx, current, OrderStatus::Cancelled, None, &self.channels).await?;
            tx.commit().await?;
            Ok::<_, RepoError>(applied.is_some())
        };
        let cancelled = tokio::time::timeout(self.unit_timeout, unit)
            .await
            .map_err(|_| AppError::timeout("cancellation timed out"))??;

        if cancelled {
            let _ = self.notify_wake.try_send(());
        }
        Ok(cancelled)
    }

    /// Buyer asks for the payment page again
    pub async fn retry_payment(&self, buyer_id: i64, reference: &str) -> AppResult<PaymentHandle> {
        let current = self.owned_order(buyer_id, reference).await?;
        if current.status != OrderStatus::Pending {
            return Err(AppError::illegal_transition(format!("order {reference} is {}", current.status))
                .with_detail("status", current.status.as_str()));
        }
        if let (Some(token), Some(redirect_url)) = (&current.payment_token, &current.payment_url) {
            return Ok(PaymentHandle {
                token: token.clone(),
                redirect_url: redirect_url.clone(),
            });
        }
        self.open_payment(&current).await
    }

    /// Cancel PENDING orders without a payment handle created before `cutoff` (ms).
    /// Returns the number of orders cancelled.
    pub async fn sweep_stale(&self, cutoff: i64) -> AppResult<usize> {
        let stale = order::find_stale_pending(&self.pool, cutoff, SWEEP_BATCH).await?;
        let mut cancelled = 0;
        for current in &stale {
            match self.cancel_unpaid(current).await {
                Ok(true) => {
                    cancelled += 1;
                    tracing::info!(reference = %current.reference, "Stale order cancelled");
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(reference = %current.reference, error = %e, "Failed to cancel stale order");
                }
            }
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::CheckoutItem;
    use crate::core::config::GatewayConfig;
    use crate::db::DbService;
    use crate::gateway::MidtransGateway;
    use shared::models::{MembershipStatus, ProductCreate};
    use shared::order::ShippingAddress;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BUYER: i64 = 11;

    async fn setup() -> (DbService, CheckoutService) {
        let db = DbService::open_in_memory().await.unwrap();
        buyer::upsert(&db.pool, BUYER, "Rina", Some("+62812000111"), None, MembershipStatus::Active)
            .await
            .unwrap();
        // Never called: these tests stop before the payment page is requested
        let gateway = MidtransGateway::new(&GatewayConfig {
            base_url: "http://127.0.0.1:9".into(),
            server_key: "SB-Mid-server-unit".into(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();
        let (wake, _) = mpsc::channel(1);
        let svc = CheckoutService::new(
            db.pool.clone(),
            Arc::new(gateway),
            ChannelRegistry::default(),
            wake,
            PricingConfig::default(),
            Duration::from_secs(5),
        );
        (db, svc)
    }

    async fn seed(db: &DbService, name: &str, stock: i64) -> i64 {
        product::create(
            &db.pool,
            ProductCreate {
                name: name.into(),
                price: 20_000,
                member_price: None,
                flash_sale_price: None,
                flash_sale_start: None,
                flash_sale_end: None,
                stock,
                weight_grams: 250,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn stock_of(db: &DbService, id: i64) -> i64 {
        product::find_by_id(&db.pool, id).await.unwrap().unwrap().stock
    }

    async fn rows(db: &DbService, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    /// Validated and priced, as `checkout` does before the unit of work
    async fn quoted(svc: &CheckoutService, items: &[(i64, i64)]) -> (ValidatedRequest, Quote) {
        let req = CheckoutRequest {
            items: items
                .iter()
                .map(|&(product_id, quantity)| CheckoutItem { product_id, quantity })
                .collect(),
            shipping_address: ShippingAddress {
                recipient_name: "Rina".into(),
                phone: "+62812000111".into(),
                address_line: "Jl. Sudirman 3".into(),
                city: "Semarang".into(),
                province: "Jawa Tengah".into(),
                postal_code: "50131".into(),
            },
            payment_method: "qris".into(),
            use_member_price: false,
            contact_email: None,
        };
        let validated = validate_request(&req).unwrap();
        let ids: Vec<i64> = validated.lines.iter().map(|(id, _)| *id).collect();
        let products = product::find_by_ids(&svc.pool, &ids).await.unwrap();
        let lines = price_lines(&validated.lines, &products, Utc::now().timestamp_millis(), false).unwrap();
        let quote = quote(lines, &validated.shipping.province, validated.payment_method, &svc.pricing);
        (validated, quote)
    }

    /// Hands out `refs` in order, repeating the last one
    fn scripted(refs: &[&'static str]) -> (ReferenceSource, Arc<AtomicUsize>) {
        let refs = refs.to_vec();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source: ReferenceSource = Arc::new(move |_: DateTime<Utc>| {
            let i = counter.fetch_add(1, Ordering::SeqCst);
            refs[i.min(refs.len() - 1)].to_string()
        });
        (source, calls)
    }

    #[tokio::test]
    async fn failed_reservation_rolls_back_earlier_lines() {
        let (db, svc) = setup().await;
        let teh = seed(&db, "Teh Tubruk", 10).await;
        let kopi = seed(&db, "Kopi Gayo", 5).await;
        let (validated, quote) = quoted(&svc, &[(teh, 3), (kopi, 4)]).await;

        // Sold elsewhere between pricing and the unit of work
        sqlx::query("UPDATE product SET stock = 2 WHERE id = ?")
            .bind(kopi)
            .execute(&db.pool)
            .await
            .unwrap();

        let err = svc
            .place_with_fresh_reference(BUYER, &validated, &quote, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        let details = err.details.unwrap();
        assert_eq!(details["product_id"], kopi);
        assert_eq!(details["available"], 2);

        // Teh was decremented inside the transaction before kopi failed
        assert_eq!(stock_of(&db, teh).await, 10);
        assert_eq!(stock_of(&db, kopi).await, 2);
        assert_eq!(rows(&db, "orders").await, 0);
        assert_eq!(rows(&db, "order_item").await, 0);
    }

    #[tokio::test]
    async fn reference_collision_retries_with_fresh_reference() {
        let (db, svc) = setup().await;
        let teh = seed(&db, "Teh Tubruk", 10).await;

        let (taken, _) = scripted(&["ORD-20261016-TAKEN2"]);
        let first = svc.clone().with_reference_source(taken);
        let (validated, quote) = quoted(&first, &[(teh, 1)]).await;
        first
            .place_with_fresh_reference(BUYER, &validated, &quote, Utc::now())
            .await
            .unwrap();

        let (source, calls) = scripted(&["ORD-20261016-TAKEN2", "ORD-20261016-FRESH3"]);
        let second = svc.with_reference_source(source);
        let (validated, quote) = quoted(&second, &[(teh, 2)]).await;
        let order_id = second
            .place_with_fresh_reference(BUYER, &validated, &quote, Utc::now())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let placed = order::find_by_id(&db.pool, order_id).await.unwrap().unwrap();
        assert_eq!(placed.reference, "ORD-20261016-FRESH3");
        assert_eq!(stock_of(&db, teh).await, 7);
        assert_eq!(rows(&db, "orders").await, 2);
        assert_eq!(rows(&db, "order_item").await, 2);
    }

    #[tokio::test]
    async fn persistent_collisions_give_up_without_reserving() {
        let (db, svc) = setup().await;
        let teh = seed(&db, "Teh Tubruk", 10).await;

        let (taken, _) = scripted(&["ORD-20261016-TAKEN2"]);
        let svc = svc.with_reference_source(taken);
        let (validated, quote) = quoted(&svc, &[(teh, 1)]).await;
        svc.place_with_fresh_reference(BUYER, &validated, &quote, Utc::now())
            .await
            .unwrap();

        let (source, calls) = scripted(&["ORD-20261016-TAKEN2"]);
        let svc = svc.with_reference_source(source);
        let err = svc
            .place_with_fresh_reference(BUYER, &validated, &quote, Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::OrderReferenceExhausted);
        assert_eq!(calls.load(Ordering::SeqCst), MAX_REFERENCE_ATTEMPTS);
        assert_eq!(stock_of(&db, teh).await, 9);
        assert_eq!(rows(&db, "orders").await, 1);
    }

    #[tokio::test]
    async fn buyer_profile_email_backs_up_missing_contact_email() {
        let (db, svc) = setup().await;
        buyer::upsert(
            &db.pool,
            BUYER,
            "Rina",
            Some("+62812000111"),
            Some("rina@koperasi.id"),
            MembershipStatus::Active,
        )
        .await
        .unwrap();
        let teh = seed(&db, "Teh Tubruk", 10).await;

        // The unreachable gateway fails the payment page; the order is already committed
        let (validated, _) = quoted(&svc, &[(teh, 1)]).await;
        let req = CheckoutRequest {
            items: vec![CheckoutItem { product_id: teh, quantity: 1 }],
            shipping_address: validated.shipping.clone(),
            payment_method: "qris".into(),
            use_member_price: false,
            contact_email: None,
        };
        let err = svc.checkout(BUYER, req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentGatewayError);

        let reference = err.details.unwrap()["reference"].as_str().unwrap().to_string();
        let placed = order::find_by_reference(&db.pool, &reference).await.unwrap().unwrap();
        assert_eq!(placed.contact_email.as_deref(), Some("rina@koperasi.id"));
    }
}
