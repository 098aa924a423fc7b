//! PostgreSQL implementation of the ledger session traits
//!
//! Each session is one database transaction. Reads made with intent to write
//! take row locks (`FOR UPDATE`), so concurrent sales of the same variant
//! queue on the variant and batch rows instead of losing updates. Lock waits
//! are bounded by `lock_timeout`; timeouts, deadlocks and serialization
//! failures surface as `TransactionConflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::ledger::{LedgerError, LedgerResult, LedgerStore, StockSession};
use shared::models::{
    Batch, BundleOf, NewBatch, NewOrder, NewOrderItem, NewPendingPayment, Order, OrderItem,
    OrderRequest, OrderStatus, PaymentStatus, PendingPayment, Product, Variant,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// SQLSTATEs that mean "another transaction got there first"
const CONFLICT_CODES: &[&str] = &["40001", "40P01", "55P03"];

/// Map a database error into the ledger taxonomy
pub fn db_err(err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().is_some_and(|code| CONFLICT_CODES.contains(&&*code)) {
            return LedgerError::TransactionConflict(db.message().to_string());
        }
    }
    LedgerError::Storage(err.to_string())
}

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
    lock_timeout_ms: u64,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore instance
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            lock_timeout_ms: 5_000,
        }
    }

    /// Override how long a session waits on a locked row
    pub fn with_lock_timeout(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = lock_timeout_ms;
        self
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Session = PgSession;

    async fn begin(&self) -> LedgerResult<PgSession> {
        let mut tx = self.db.begin().await.map_err(db_err)?;
        sqlx::query(&format!("SET LOCAL lock_timeout = {}", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Ok(PgSession { tx })
    }
}

/// One database transaction
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

/// Row for variant queries
#[derive(Debug, FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    label: String,
    price: Decimal,
    stock: i64,
    buying_price: Decimal,
    profit_margin: Decimal,
    discount: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            id: row.id,
            product_id: row.product_id,
            label: row.label,
            price: row.price,
            stock: row.stock,
            buying_price: row.buying_price,
            profit_margin: row.profit_margin,
            discount: row.discount,
            updated_at: row.updated_at,
        }
    }
}

/// Row for product queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    is_bundle: bool,
    bundle_of: Json<BundleOf>,
    is_deleted: bool,
}

/// Row for batch queries
#[derive(Debug, FromRow)]
struct BatchRow {
    id: i64,
    variant_id: Uuid,
    quantity_received: i64,
    buying_price: Decimal,
    remaining_quantity: i64,
    date_received: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            variant_id: row.variant_id,
            quantity_received: row.quantity_received,
            buying_price: row.buying_price,
            remaining_quantity: row.remaining_quantity,
            date_received: row.date_received,
        }
    }
}

/// Row for order queries
#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Option<Uuid>,
    buyer_phone: Option<String>,
    total_amount: Decimal,
    status: String,
    channel: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = LedgerError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            buyer_id: row.buyer_id,
            buyer_phone: row.buyer_phone,
            total_amount: row.total_amount,
            status: row.status.parse().map_err(LedgerError::Storage)?,
            channel: row.channel.parse().map_err(LedgerError::Storage)?,
            created_at: row.created_at,
        })
    }
}

/// Row for order item queries
#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    variant_id: Uuid,
    name: String,
    image: Option<String>,
    serial_number: Option<String>,
    quantity: i64,
    price: Decimal,
    unit_buying_price: Decimal,
    unit_discount: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            variant_id: row.variant_id,
            name: row.name,
            image: row.image,
            serial_number: row.serial_number,
            quantity: row.quantity,
            price: row.price,
            unit_buying_price: row.unit_buying_price,
            unit_discount: row.unit_discount,
        }
    }
}

/// Row for pending payment queries
#[derive(Debug, FromRow)]
struct PaymentRow {
    checkout_id: String,
    buyer_id: Option<Uuid>,
    phone: String,
    amount: Decimal,
    request: Json<OrderRequest>,
    status: String,
    order_id: Option<Uuid>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PendingPayment {
    type Error = LedgerError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PendingPayment {
            checkout_id: row.checkout_id,
            buyer_id: row.buyer_id,
            phone: row.phone,
            amount: row.amount,
            request: row.request.0,
            status: row.status.parse::<PaymentStatus>().map_err(LedgerError::Storage)?,
            order_id: row.order_id,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const VARIANT_COLUMNS: &str =
    "id, product_id, label, price, stock, buying_price, profit_margin, discount, updated_at";
const BATCH_COLUMNS: &str =
    "id, variant_id, quantity_received, buying_price, remaining_quantity, date_received";
const ORDER_COLUMNS: &str = "id, buyer_id, buyer_phone, total_amount, status, channel, created_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, variant_id, name, image, serial_number, quantity, \
                                  price, unit_buying_price, unit_discount";
const PAYMENT_COLUMNS: &str = "checkout_id, buyer_id, phone, amount, request, status, order_id, \
                               failure_reason, created_at, updated_at";

impl PgSession {
    async fn fetch_variant(&mut self, variant_id: Uuid, lock: bool) -> LedgerResult<Option<Variant>> {
        let sql = format!(
            "SELECT {} FROM variants WHERE id = $1{}",
            VARIANT_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(variant_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(row.map(Variant::from))
    }

    async fn fetch_payment(
        &mut self,
        checkout_id: &str,
        lock: bool,
    ) -> LedgerResult<Option<PendingPayment>> {
        let sql = format!(
            "SELECT {} FROM mobile_payments WHERE checkout_id = $1{}",
            PAYMENT_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(checkout_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .map(PendingPayment::try_from)
            .transpose()
    }
}

#[async_trait]
impl StockSession for PgSession {
    async fn load_variant(&mut self, variant_id: Uuid) -> LedgerResult<Option<Variant>> {
        self.fetch_variant(variant_id, false).await
    }

    async fn lock_variant(&mut self, variant_id: Uuid) -> LedgerResult<Option<Variant>> {
        self.fetch_variant(variant_id, true).await
    }

    async fn add_stock(&mut self, variant_id: Uuid, delta: i64) -> LedgerResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE variants SET stock = stock + $2, updated_at = NOW() WHERE id = $1 RETURNING stock",
        )
        .bind(variant_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::VariantNotFound(variant_id))
    }

    async fn set_buying_price(
        &mut self,
        variant_id: Uuid,
        buying_price: Decimal,
    ) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE variants SET buying_price = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(variant_id)
        .bind(buying_price)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::VariantNotFound(variant_id));
        }
        Ok(())
    }

    async fn stock_levels(&mut self, variant_ids: &[Uuid]) -> LedgerResult<Vec<(Uuid, i64)>> {
        sqlx::query_as::<_, (Uuid, i64)>("SELECT id, stock FROM variants WHERE id = ANY($1)")
            .bind(variant_ids.to_vec())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)
    }

    async fn load_product(&mut self, product_id: Uuid) -> LedgerResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, is_bundle, bundle_of, is_deleted FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;

        Ok(row.map(|r| Product {
            id: r.id,
            name: r.name,
            is_bundle: r.is_bundle,
            bundle_of: r.bundle_of.0,
            is_deleted: r.is_deleted,
        }))
    }

    async fn insert_batch(&mut self, batch: NewBatch) -> LedgerResult<Batch> {
        let sql = format!(
            r#"
            INSERT INTO product_batches (variant_id, quantity_received, buying_price, remaining_quantity)
            VALUES ($1, $2, $3, $2)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(batch.variant_id)
            .bind(batch.quantity_received)
            .bind(batch.buying_price)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn lock_open_batches(&mut self, variant_id: Uuid) -> LedgerResult<Vec<Batch>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM product_batches
            WHERE variant_id = $1 AND remaining_quantity > 0
            ORDER BY date_received ASC, id ASC
            FOR UPDATE
            "#,
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(variant_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Batch::from).collect())
    }

    async fn list_batches(&mut self, variant_id: Uuid) -> LedgerResult<Vec<Batch>> {
        let sql = format!(
            "SELECT {} FROM product_batches WHERE variant_id = $1 ORDER BY date_received ASC, id ASC",
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(variant_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Batch::from).collect())
    }

    async fn has_batch_history(&mut self, variant_id: Uuid) -> LedgerResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product_batches WHERE variant_id = $1)",
        )
        .bind(variant_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)
    }

    async fn set_batch_remaining(&mut self, batch_id: i64, remaining: i64) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE product_batches SET remaining_quantity = $2 WHERE id = $1")
            .bind(batch_id)
            .bind(remaining)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::Storage(format!("batch {} not found", batch_id)));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> LedgerResult<Order> {
        let sql = format!(
            r#"
            INSERT INTO orders (buyer_id, buyer_phone, total_amount, status, channel)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.buyer_id)
            .bind(&order.buyer_phone)
            .bind(order.total_amount)
            .bind(order.status.as_str())
            .bind(order.channel.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?
            .try_into()
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> LedgerResult<OrderItem> {
        let sql = format!(
            r#"
            INSERT INTO order_items (
                order_id, variant_id, name, image, serial_number,
                quantity, price, unit_buying_price, unit_discount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            ORDER_ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(item.order_id)
            .bind(item.variant_id)
            .bind(&item.name)
            .bind(&item.image)
            .bind(&item.serial_number)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.unit_buying_price)
            .bind(item.unit_discount)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn set_item_unit_cost(
        &mut self,
        item_id: Uuid,
        unit_buying_price: Decimal,
    ) -> LedgerResult<()> {
        sqlx::query("UPDATE order_items SET unit_buying_price = $2 WHERE id = $1")
            .bind(item_id)
            .bind(unit_buying_price)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn load_order(&mut self, order_id: Uuid) -> LedgerResult<Option<(Order, Vec<OrderItem>)>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
            ORDER_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;

        Ok(Some((
            Order::try_from(row)?,
            items.into_iter().map(OrderItem::from).collect(),
        )))
    }

    async fn insert_pending_payment(
        &mut self,
        payment: NewPendingPayment,
    ) -> LedgerResult<PendingPayment> {
        let sql = format!(
            r#"
            INSERT INTO mobile_payments (checkout_id, buyer_id, phone, amount, request, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(&payment.checkout_id)
            .bind(payment.buyer_id)
            .bind(&payment.phone)
            .bind(payment.amount)
            .bind(Json(&payment.request))
            .bind(PaymentStatus::Pending.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?
            .try_into()
    }

    async fn load_pending_payment(
        &mut self,
        checkout_id: &str,
    ) -> LedgerResult<Option<PendingPayment>> {
        self.fetch_payment(checkout_id, false).await
    }

    async fn lock_pending_payment(
        &mut self,
        checkout_id: &str,
    ) -> LedgerResult<Option<PendingPayment>> {
        self.fetch_payment(checkout_id, true).await
    }

    async fn settle_pending_payment(
        &mut self,
        checkout_id: &str,
        status: PaymentStatus,
        order_id: Option<Uuid>,
        failure_reason: Option<String>,
    ) -> LedgerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE mobile_payments
            SET status = $2, order_id = $3, failure_reason = $4, updated_at = NOW()
            WHERE checkout_id = $1
            "#,
        )
        .bind(checkout_id)
        .bind(status.as_str())
        .bind(order_id)
        .bind(&failure_reason)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::PaymentNotFound(checkout_id.to_string()));
        }
        Ok(())
    }

    async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await.map_err(db_err)
    }

    async fn rollback(self) -> LedgerResult<()> {
        self.tx.rollback().await.map_err(db_err)
    }
}
