use axum::{Json, extract::State, extract::rejection::JsonRejection};

use super::error::ApiError;
use super::state::AppState;
use super::types::{
    BalanceResponse, GetBalanceRequest, JsonObject, ReferralRequest, StatusResponse,
    UpdateBalanceRequest, UpdateBalanceResponse, coerce_points, coerce_user_id,
};

pub const LIVENESS_MESSAGE: &str = "✅ DiceMint Backend (SQLite) is Live!";

/// GET / - liveness check
pub async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

/// POST /get_balance
pub async fn get_balance(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let Json(body) = payload?;
    let req = GetBalanceRequest::from(body);
    let telegram_id = coerce_user_id("telegram_id", req.telegram_id.as_ref())?;

    let balance = state.balances.get_balance(&telegram_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

/// POST /update_balance - overwrites the balance, it does not add to it
pub async fn update_balance(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> Result<Json<UpdateBalanceResponse>, ApiError> {
    let Json(body) = payload?;
    let req = UpdateBalanceRequest::from(body);
    let telegram_id = coerce_user_id("telegram_id", req.telegram_id.as_ref())?;
    let balance = coerce_points("balance", req.balance.as_ref())?;

    state.balances.set_balance(&telegram_id, balance).await?;
    Ok(Json(UpdateBalanceResponse {
        success: true,
        new_balance: balance,
    }))
}

/// POST /api/referral
pub async fn register_referral(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(body) = payload?;
    let req = ReferralRequest::from(body);
    let new_user_id = coerce_user_id("new_user_id", req.new_user_id.as_ref())?;
    let referrer_id = coerce_user_id("referrer_id", req.referrer_id.as_ref())?;

    let outcome = state
        .referrals
        .register_referral(&new_user_id, &referrer_id)
        .await?;
    Ok(Json(StatusResponse::new(outcome.status(), outcome.message())))
}
