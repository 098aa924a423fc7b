//! HTTP handlers for order endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::ledger::{FulfilledOrder, OrderWithItems};
use shared::models::{LineItemRequest, OrderRequest, OrderStatus};
use shared::types::SaleChannel;
use shared::validation::validate_display_name;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, CurrentUser};
use crate::AppState;

/// One line of a checkout or POS sale
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LineItemInput {
    pub variant_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i64,
    #[validate(custom = "validate_money")]
    pub unit_price: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_money")]
    pub unit_discount: Decimal,
    #[validate(custom = "validate_name")]
    pub name: String,
    pub image: Option<String>,
    pub serial_number: Option<String>,
}

impl From<LineItemInput> for LineItemRequest {
    fn from(input: LineItemInput) -> Self {
        LineItemRequest {
            variant_id: input.variant_id,
            quantity: input.quantity,
            unit_price: input.unit_price,
            unit_discount: input.unit_discount,
            name: input.name,
            image: input.image,
            serial_number: input.serial_number,
        }
    }
}

/// Web checkout by a signed-in buyer
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutInput {
    pub buyer_phone: Option<String>,
    #[validate(custom = "validate_money")]
    pub total_amount: Decimal,
    #[validate]
    pub items: Vec<LineItemInput>,
}

/// Sale recorded at the point of sale
#[derive(Debug, Deserialize, Validate)]
pub struct PosSaleInput {
    pub buyer_id: Option<Uuid>,
    pub buyer_phone: Option<String>,
    #[validate(custom = "validate_money")]
    pub total_amount: Decimal,
    #[validate]
    pub items: Vec<LineItemInput>,
}

pub(crate) fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_amount");
        err.message = Some("Amount cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_name(value: &str) -> Result<(), ValidationError> {
    validate_display_name(value).map_err(|msg| {
        let mut err = ValidationError::new("invalid_name");
        err.message = Some(msg.into());
        err
    })
}

pub(crate) fn into_request(
    buyer_id: Option<Uuid>,
    buyer_phone: Option<String>,
    total_amount: Decimal,
    channel: SaleChannel,
    items: Vec<LineItemInput>,
) -> OrderRequest {
    OrderRequest {
        buyer_id,
        buyer_phone,
        total_amount,
        status: OrderStatus::Paid,
        channel,
        items: items.into_iter().map(LineItemRequest::from).collect(),
    }
}

/// Place a web order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CheckoutInput>,
) -> AppResult<Json<FulfilledOrder>> {
    input.validate()?;

    let user = current_user.0;
    let request = into_request(
        Some(user.user_id),
        input.buyer_phone.or(user.phone),
        input.total_amount,
        SaleChannel::Web,
        input.items,
    );

    let order = state.ledger.fulfill(request).await?;
    Ok(Json(order))
}

/// Record a point-of-sale sale
pub async fn create_pos_sale(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(input): Json<PosSaleInput>,
) -> AppResult<Json<FulfilledOrder>> {
    input.validate()?;

    let request = into_request(
        input.buyer_id,
        input.buyer_phone,
        input.total_amount,
        SaleChannel::Pos,
        input.items,
    );

    let order = state.ledger.fulfill(request).await?;
    tracing::info!(order_id = %order.order.id, cashier = %admin.0.user_id, "POS sale recorded");
    Ok(Json(order))
}

/// Get an order with its items
///
/// Buyers only see their own orders; admins see all of them.
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderWithItems>> {
    let order = state.ledger.order(order_id).await?;

    let user = current_user.0;
    if !user.is_admin && order.order.buyer_id != Some(user.user_id) {
        return Err(AppError::NotFound(format!("Order {}", order_id)));
    }

    Ok(Json(order))
}
