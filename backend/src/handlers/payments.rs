//! HTTP handlers for mobile-money payments

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::CallbackOutcome;
use shared::models::{GatewayCallback, PendingPayment};
use shared::types::SaleChannel;
use shared::validation::validate_mobile_money_phone;
use validator::{Validate, ValidationError};

use super::orders::{into_request, validate_money, LineItemInput};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

/// Checkout paid from the buyer's mobile-money wallet
#[derive(Debug, Deserialize, Validate)]
pub struct MobilePaymentInput {
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(custom = "validate_money")]
    pub total_amount: Decimal,
    #[validate]
    pub items: Vec<LineItemInput>,
}

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    validate_mobile_money_phone(value).map_err(|msg| {
        let mut err = ValidationError::new("invalid_phone");
        err.message = Some(msg.into());
        err
    })
}

/// Acknowledgement returned to the gateway
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CallbackOutcome>,
}

/// Start a mobile-money checkout
pub async fn initiate_mobile_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MobilePaymentInput>,
) -> AppResult<Json<PendingPayment>> {
    input.validate()?;

    let request = into_request(
        Some(current_user.0.user_id),
        None,
        input.total_amount,
        SaleChannel::MobileMoney,
        input.items,
    );

    let pending = state
        .ledger
        .initiate_mobile_payment(&input.phone, request)
        .await?;
    Ok(Json(pending))
}

/// Poll the state of a checkout
pub async fn get_payment_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(checkout_id): Path<String>,
) -> AppResult<Json<PendingPayment>> {
    let pending = state.ledger.payment_status(&checkout_id).await?;

    let user = current_user.0;
    if !user.is_admin && pending.buyer_id != Some(user.user_id) {
        return Err(AppError::NotFound(format!("Payment {}", checkout_id)));
    }

    Ok(Json(pending))
}

/// Gateway result callback
///
/// Always acknowledged with 200 so the gateway does not redeliver; problems
/// are logged and recorded on the payment.
pub async fn payment_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<CallbackAck> {
    let callback: GatewayCallback = match serde_json::from_slice(&body) {
        Ok(callback) => callback,
        Err(e) => {
            tracing::warn!(error = %e, "malformed payment callback ignored");
            return Json(CallbackAck {
                received: true,
                outcome: None,
            });
        }
    };

    let checkout_id = callback.checkout_id.clone();
    match state.ledger.handle_gateway_callback(callback).await {
        Ok(outcome) => Json(CallbackAck {
            received: true,
            outcome: Some(outcome),
        }),
        Err(e) => {
            tracing::error!(%checkout_id, error = %e, "payment callback processing failed");
            Json(CallbackAck {
                received: true,
                outcome: None,
            })
        }
    }
}
