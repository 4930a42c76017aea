use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{is_valid_transition, Gateway, OrderRecord, PaymentStatus, PaymentTransaction};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Permanent: the transaction id was never created by this application.
    #[error("payment transaction '{0}' not found")]
    PaymentNotFound(String),
    /// Permanent: the payment row references an order that does not exist.
    #[error("order '{0}' not found")]
    OrderNotFound(String),
    /// Transient; the caller should answer with a retryable status so the
    /// gateway redelivers.
    #[error("settlement store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Applied,
    /// Redelivery, out-of-order update, or pending-after-terminal; persisted
    /// state was left untouched.
    AlreadySettled { current: PaymentStatus },
}

#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub transaction_id: String,
    pub gateway: Gateway,
    pub status: PaymentStatus,
    pub gateway_reference: Option<String>,
    pub raw_response: Option<serde_json::Value>,
}

/// Persistence seam for settlement. `(transaction_id, gateway)` is the
/// idempotency key; `apply` must enforce the single pending -> terminal
/// transition atomically, never via read-then-write.
#[async_trait::async_trait]
pub trait SettlementStore: Send + Sync {
    async fn get_payment(
        &self,
        transaction_id: &str,
        gateway: Gateway,
    ) -> Result<Option<PaymentTransaction>, StoreError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, StoreError>;

    async fn apply(&self, req: ApplyRequest) -> Result<SettlementOutcome, StoreError>;
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

pub struct PgSettlementStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgSettlementStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn apply_inner(&self, req: ApplyRequest) -> Result<SettlementOutcome, StoreError> {
        // Pending deliveries never mutate: either the row is still pending
        // (nothing to do) or it is terminal (must not regress).
        if !req.status.is_terminal() {
            let current = self
                .get_payment_inner(&req.transaction_id, req.gateway)
                .await?
                .ok_or_else(|| StoreError::PaymentNotFound(req.transaction_id.clone()))?;
            let current_status =
                PaymentStatus::from_str(&current.status).unwrap_or(PaymentStatus::Pending);
            return Ok(SettlementOutcome::AlreadySettled { current: current_status });
        }

        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        // Single conditional update; concurrent deliveries race on the
        // `status = 'pending'` predicate and exactly one wins.
        let updated = sqlx::query_as::<_, PaymentTransaction>(
            r#"UPDATE payment_transactions
               SET status = $3,
                   gateway_reference = COALESCE($4, gateway_reference),
                   raw_response = COALESCE($5, raw_response),
                   updated_at = now()
               WHERE transaction_id = $1 AND gateway = $2 AND status = 'pending'
               RETURNING transaction_id, order_id, gateway, amount, status,
                         gateway_reference, raw_response, created_at, updated_at"#,
        )
        .bind(&req.transaction_id)
        .bind(req.gateway.as_str())
        .bind(req.status.as_str())
        .bind(req.gateway_reference.as_deref())
        .bind(req.raw_response.as_ref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?;

        match updated {
            Some(payment) => {
                let result = sqlx::query(
                    r#"UPDATE orders SET payment_status = $2, updated_at = now()
                       WHERE id = $1 AND payment_status = 'pending'"#,
                )
                .bind(&payment.order_id)
                .bind(req.status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?;

                if result.rows_affected() == 0 {
                    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = $1")
                        .bind(&payment.order_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(unavailable)?;
                    if exists.is_none() {
                        // Dropping the transaction rolls the payment update back.
                        return Err(StoreError::OrderNotFound(payment.order_id));
                    }
                    // Order already settled by another attempt; the payment
                    // row transition still stands.
                }

                tx.commit().await.map_err(unavailable)?;
                info!(
                    gateway = req.gateway.as_str(),
                    txn_id = %req.transaction_id,
                    order_id = %payment.order_id,
                    status = req.status.as_str(),
                    "settlement applied"
                );
                Ok(SettlementOutcome::Applied)
            }
            None => {
                let current = self
                    .get_payment_inner(&req.transaction_id, req.gateway)
                    .await?
                    .ok_or_else(|| StoreError::PaymentNotFound(req.transaction_id.clone()))?;
                let current_status =
                    PaymentStatus::from_str(&current.status).unwrap_or(PaymentStatus::Pending);
                if current_status != req.status {
                    warn!(
                        gateway = req.gateway.as_str(),
                        txn_id = %req.transaction_id,
                        current = current_status.as_str(),
                        attempted = req.status.as_str(),
                        "ignoring terminal status overwrite attempt"
                    );
                }
                Ok(SettlementOutcome::AlreadySettled { current: current_status })
            }
        }
    }

    async fn get_payment_inner(
        &self,
        transaction_id: &str,
        gateway: Gateway,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        sqlx::query_as::<_, PaymentTransaction>(
            r#"SELECT transaction_id, order_id, gateway, amount, status,
                      gateway_reference, raw_response, created_at, updated_at
               FROM payment_transactions
               WHERE transaction_id = $1 AND gateway = $2"#,
        )
        .bind(transaction_id)
        .bind(gateway.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)
    }
}

#[async_trait::async_trait]
impl SettlementStore for PgSettlementStore {
    async fn get_payment(
        &self,
        transaction_id: &str,
        gateway: Gateway,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        tokio::time::timeout(self.timeout, self.get_payment_inner(transaction_id, gateway))
            .await
            .map_err(|_| StoreError::Unavailable("settlement store timed out".to_string()))?
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, StoreError> {
        let query = sqlx::query_as::<_, OrderRecord>(
            "SELECT id, payment_status FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool);
        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Unavailable("settlement store timed out".to_string()))?
            .map_err(unavailable)
    }

    async fn apply(&self, req: ApplyRequest) -> Result<SettlementOutcome, StoreError> {
        tokio::time::timeout(self.timeout, self.apply_inner(req))
            .await
            .map_err(|_| StoreError::Unavailable("settlement store timed out".to_string()))?
    }
}

/// In-memory store for tests and DB-less local runs. Same contract as the
/// Postgres store; the mutex stands in for the atomic conditional update.
#[derive(Default)]
pub struct MemorySettlementStore {
    payments: Mutex<HashMap<(String, Gateway), PaymentTransaction>>,
    orders: Mutex<HashMap<String, String>>,
}

impl MemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pending transaction and its order.
    pub fn seed_payment(&self, transaction_id: &str, gateway: Gateway, order_id: &str, amount: &str) {
        let now = Utc::now();
        let payment = PaymentTransaction {
            transaction_id: transaction_id.to_string(),
            order_id: order_id.to_string(),
            gateway: gateway.as_str().to_string(),
            amount: amount.to_string(),
            status: PaymentStatus::Pending.as_str().to_string(),
            gateway_reference: None,
            raw_response: None,
            created_at: now,
            updated_at: now,
        };
        self.payments
            .lock()
            .expect("payments lock poisoned")
            .insert((transaction_id.to_string(), gateway), payment);
        self.orders
            .lock()
            .expect("orders lock poisoned")
            .insert(order_id.to_string(), PaymentStatus::Pending.as_str().to_string());
    }

    pub fn payment_status(&self, transaction_id: &str, gateway: Gateway) -> Option<PaymentStatus> {
        self.payments
            .lock()
            .expect("payments lock poisoned")
            .get(&(transaction_id.to_string(), gateway))
            .and_then(|p| PaymentStatus::from_str(&p.status))
    }

    pub fn order_payment_status(&self, order_id: &str) -> Option<PaymentStatus> {
        self.orders
            .lock()
            .expect("orders lock poisoned")
            .get(order_id)
            .and_then(|s| PaymentStatus::from_str(s))
    }
}

#[async_trait::async_trait]
impl SettlementStore for MemorySettlementStore {
    async fn get_payment(
        &self,
        transaction_id: &str,
        gateway: Gateway,
    ) -> Result<Option<PaymentTransaction>, StoreError> {
        Ok(self
            .payments
            .lock()
            .expect("payments lock poisoned")
            .get(&(transaction_id.to_string(), gateway))
            .cloned())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self
            .orders
            .lock()
            .expect("orders lock poisoned")
            .get(order_id)
            .map(|status| OrderRecord { id: order_id.to_string(), payment_status: status.clone() }))
    }

    async fn apply(&self, req: ApplyRequest) -> Result<SettlementOutcome, StoreError> {
        let mut payments = self.payments.lock().expect("payments lock poisoned");
        let payment = payments
            .get_mut(&(req.transaction_id.clone(), req.gateway))
            .ok_or_else(|| StoreError::PaymentNotFound(req.transaction_id.clone()))?;

        let current =
            PaymentStatus::from_str(&payment.status).unwrap_or(PaymentStatus::Pending);

        if !is_valid_transition(&payment.status, req.status) {
            if current.is_terminal() && req.status.is_terminal() && current != req.status {
                warn!(
                    gateway = req.gateway.as_str(),
                    txn_id = %req.transaction_id,
                    current = current.as_str(),
                    attempted = req.status.as_str(),
                    "ignoring terminal status overwrite attempt"
                );
            }
            return Ok(SettlementOutcome::AlreadySettled { current });
        }

        payment.status = req.status.as_str().to_string();
        if req.gateway_reference.is_some() {
            payment.gateway_reference = req.gateway_reference.clone();
        }
        if req.raw_response.is_some() {
            payment.raw_response = req.raw_response.clone();
        }
        payment.updated_at = Utc::now();
        let order_id = payment.order_id.clone();
        drop(payments);

        let mut orders = self.orders.lock().expect("orders lock poisoned");
        match orders.get_mut(&order_id) {
            Some(status) if status == PaymentStatus::Pending.as_str() => {
                *status = req.status.as_str().to_string();
            }
            Some(_) => {}
            None => return Err(StoreError::OrderNotFound(order_id)),
        }

        Ok(SettlementOutcome::Applied)
    }
}
