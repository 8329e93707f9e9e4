//! Shared integration test harness: on-disk SQLite, a gateway that never
//! leaves the process, and recording notification channels.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use market_server::checkout::{CheckoutItem, CheckoutRequest};
use market_server::core::config::{GatewayConfig, NotifyConfig, PricingConfig};
use market_server::db::DbService;
use market_server::db::repository::product;
use market_server::gateway::{
    GatewayError, MidtransGateway, PaymentCallback, PaymentGateway, PaymentHandle, Verification,
};
use market_server::notify::{ChannelRegistry, NotificationChannel, NotificationMessage, SendError};
use market_server::{Config, ServerState};
use shared::models::{ChannelKind, MembershipStatus, Product, ProductCreate};
use shared::order::{Order, OrderLineItem, ShippingAddress};

pub const SERVER_KEY: &str = "SB-Mid-server-integration";
pub const BUYER_ID: i64 = 7001;
pub const BUYER_PHONE: &str = "+6281234567890";

pub fn test_config(db_path: &str) -> Config {
    Config {
        database_path: db_path.to_string(),
        http_port: 0,
        environment: "test".into(),
        jwt_secret: "integration-secret-with-enough-entropy".into(),
        jwt_issuer: "market-accounts".into(),
        jwt_audience: "market-buyers".into(),
        db_timeout: Duration::from_secs(5),
        pending_order_ttl: Duration::from_secs(1_800),
        sweep_interval: Duration::from_secs(60),
        pricing: PricingConfig::default(),
        gateway: GatewayConfig {
            base_url: "http://127.0.0.1:9".into(),
            server_key: SERVER_KEY.into(),
            timeout: Duration::from_secs(1),
        },
        notify: NotifyConfig {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: 2,
            ..NotifyConfig::default()
        },
        log_level: "debug".into(),
        log_dir: None,
        log_json: false,
    }
}

/// Hands out deterministic payment handles; verifies with the real signature scheme
pub struct FakeGateway {
    verifier: MidtransGateway,
    pub failing: AtomicBool,
    pub handles_created: AtomicUsize,
}

impl FakeGateway {
    fn new(config: &GatewayConfig) -> Self {
        Self {
            verifier: MidtransGateway::new(config).expect("gateway client"),
            failing: AtomicBool::new(false),
            handles_created: AtomicUsize::new(0),
        }
    }

    pub fn sign(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        self.verifier.signature(order_id, status_code, gross_amount)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_handle(
        &self,
        order: &Order,
        _items: &[OrderLineItem],
    ) -> Result<PaymentHandle, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 503,
                body: "sandbox unavailable".into(),
            });
        }
        self.handles_created.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentHandle {
            token: format!("snap-{}", order.reference),
            redirect_url: format!("https://pay.test/snap/{}", order.reference),
        })
    }

    fn verify(&self, callback: &PaymentCallback) -> Verification {
        self.verifier.verify(callback)
    }
}

/// Records every message; optionally rejects all sends
pub struct RecordingChannel {
    kind: ChannelKind,
    pub failing: AtomicBool,
    pub sent: Mutex<Vec<(String, NotificationMessage)>>,
    pub attempts: AtomicUsize,
}

impl RecordingChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            failing: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, target: &str, message: &NotificationMessage) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SendError::Rejected {
                status: 500,
                body: "provider down".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), message.clone()));
        Ok(())
    }
}

pub struct TestApp {
    pub state: ServerState,
    pub gateway: Arc<FakeGateway>,
    pub whatsapp: Arc<RecordingChannel>,
    pub email: Arc<RecordingChannel>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("market.db");
        let config = test_config(db_path.to_str().expect("utf-8 path"));
        let db = DbService::new(&config.database_path, config.db_timeout)
            .await
            .expect("database");

        let gateway = Arc::new(FakeGateway::new(&config.gateway));
        let whatsapp = Arc::new(RecordingChannel::new(ChannelKind::Whatsapp));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));
        let channels = ChannelRegistry::new(vec![
            whatsapp.clone() as Arc<dyn NotificationChannel>,
            email.clone() as Arc<dyn NotificationChannel>,
        ]);

        let state = ServerState::with_parts(config, db, gateway.clone(), channels);
        let app = Self {
            state,
            gateway,
            whatsapp,
            email,
            _dir: dir,
        };
        app.seed_buyer(
            BUYER_ID,
            "Siti Rahma",
            Some("siti@example.id"),
            MembershipStatus::Active,
        )
        .await;
        app
    }

    /// Buyers are synced from the membership service, so tests write the row directly
    pub async fn seed_buyer(
        &self,
        id: i64,
        name: &str,
        email: Option<&str>,
        status: MembershipStatus,
    ) {
        sqlx::query(
            "INSERT INTO buyer (id, name, phone, email, membership_status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id)
        .bind(name)
        .bind(BUYER_PHONE)
        .bind(email)
        .bind(status)
        .bind(shared::util::now_millis())
        .execute(&self.state.db.pool)
        .await
        .expect("seed buyer");
    }

    /// Catalog withdrawal happens in the catalog service
    pub async fn set_product_active(&self, product_id: i64, active: bool) {
        sqlx::query("UPDATE product SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(product_id)
            .execute(&self.state.db.pool)
            .await
            .expect("toggle product");
    }

    pub async fn seed_product(&self, name: &str, price: i64, stock: i64) -> Product {
        product::create(
            &self.state.db.pool,
            ProductCreate {
                name: name.into(),
                price,
                member_price: None,
                flash_sale_price: None,
                flash_sale_start: None,
                flash_sale_end: None,
                stock,
                weight_grams: 500,
            },
        )
        .await
        .expect("seed product")
    }

    pub async fn stock_of(&self, product_id: i64) -> i64 {
        product::find_by_id(&self.state.db.pool, product_id)
            .await
            .expect("product lookup")
            .expect("product exists")
            .stock
    }

    pub fn token(&self, buyer_id: i64) -> String {
        self.state
            .jwt
            .generate_token(buyer_id, chrono::Duration::minutes(30))
            .expect("token")
    }

    /// Run one request through the full router
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = market_server::api::build_app(self.state.clone())
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// A gateway notification signed with the test server key
    pub fn callback(
        &self,
        reference: &str,
        transaction_id: &str,
        transaction_status: &str,
        fraud_status: Option<&str>,
        gross_amount: &str,
    ) -> PaymentCallback {
        let status_code = match transaction_status {
            "settlement" | "capture" => "200",
            "pending" => "201",
            _ => "202",
        };
        PaymentCallback {
            order_id: reference.into(),
            transaction_id: transaction_id.into(),
            transaction_status: transaction_status.into(),
            status_code: status_code.into(),
            signature_key: self.gateway.sign(reference, status_code, gross_amount),
            gross_amount: gross_amount.into(),
            fraud_status: fraud_status.map(Into::into),
            payment_type: Some("bank_transfer".into()),
            transaction_time: Some("2026-10-16 10:00:00".into()),
            settlement_time: None,
        }
    }
}

pub fn java_address() -> ShippingAddress {
    ShippingAddress {
        recipient_name: "Siti Rahma".into(),
        phone: BUYER_PHONE.into(),
        address_line: "Jl. Merdeka No. 10".into(),
        city: "Bandung".into(),
        province: "Jawa Barat".into(),
        postal_code: "40111".into(),
    }
}

pub fn checkout_request(items: &[(i64, i64)], payment_method: &str) -> CheckoutRequest {
    CheckoutRequest {
        items: items
            .iter()
            .map(|&(product_id, quantity)| CheckoutItem {
                product_id,
                quantity,
            })
            .collect(),
        shipping_address: java_address(),
        payment_method: payment_method.into(),
        use_member_price: false,
        contact_email: Some("siti@example.id".into()),
    }
}
