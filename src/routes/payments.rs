use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    dto::payments::{
        BalanceResponse, CreatePaymentRequest, CreatePaymentResponse, EstimateQuery,
        EstimateResponse, IpnOutcome, TransactionList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::TransactionListQuery,
    services::{balance_service, payment_service},
    state::AppState,
    webhook::SIGNATURE_HEADER,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(balance))
        .route("/transactions", get(transactions))
        .route("/estimate", get(estimate))
        .route("/create-payment", post(create_payment))
        .route("/ipn", post(ipn))
        .route("/payment-status/{payment_id}", get(payment_status))
        .route("/payment-success", get(payment_success))
        .route("/payment-cancel", get(payment_cancel))
}

#[utoipa::path(
    get,
    path = "/api/balance",
    responses(
        (status = 200, description = "Current balance, zero when never credited", body = ApiResponse<BalanceResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn balance(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BalanceResponse>>> {
    let resp = balance_service::get_balance(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/transactions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses((status = 200, description = "Caller's transactions, newest first", body = ApiResponse<TransactionList>)),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = payment_service::list_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/estimate",
    params(
        ("amount" = String, Query, description = "Fiat amount"),
        ("currency" = String, Query, description = "Fiat currency, e.g. USD"),
        ("pay_currency" = String, Query, description = "Settlement coin, e.g. LTC")
    ),
    responses(
        (status = 200, description = "Estimated crypto amount", body = ApiResponse<EstimateResponse>),
        (status = 400, description = "Invalid amount or currency"),
        (status = 502, description = "Gateway failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn estimate(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<EstimateQuery>,
) -> AppResult<Json<ApiResponse<EstimateResponse>>> {
    let resp = payment_service::estimate(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/create-payment",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Hosted invoice created", body = ApiResponse<CreatePaymentResponse>),
        (status = 400, description = "Invalid amount or currency"),
        (status = 502, description = "Gateway failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<CreatePaymentResponse>>> {
    let resp = payment_service::create_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

/// Gateway callback. The body is taken raw so the signature is checked
/// against exactly what was sent.
#[utoipa::path(
    post,
    path = "/api/ipn",
    request_body(content = String, description = "Signed IPN JSON", content_type = "application/json"),
    params(("x-nowpayments-sig" = String, Header, description = "Hex HMAC-SHA512 of the sorted-key body")),
    responses(
        (status = 200, description = "Processed, including repeated deliveries", body = ApiResponse<IpnOutcome>),
        (status = 400, description = "Bad signature or malformed payload"),
        (status = 404, description = "Unknown payment id")
    ),
    tag = "Payments"
)]
pub async fn ipn(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<IpnOutcome>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = payment_service::handle_ipn(&state, &body, signature).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payment-status/{payment_id}",
    params(("payment_id" = String, Path, description = "Gateway payment id")),
    responses(
        (status = 200, description = "Gateway payment record, passed through unchanged"),
        (status = 502, description = "Gateway failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(payment_id): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = payment_service::payment_status(&state, &payment_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payment-success",
    responses((status = 303, description = "Redirect to the frontend")),
    tag = "Payments"
)]
pub async fn payment_success(State(state): State<AppState>) -> Redirect {
    frontend_redirect(&state, "payment-success")
}

#[utoipa::path(
    get,
    path = "/api/payment-cancel",
    responses((status = 303, description = "Redirect to the frontend")),
    tag = "Payments"
)]
pub async fn payment_cancel(State(state): State<AppState>) -> Redirect {
    frontend_redirect(&state, "payment-cancel")
}

fn frontend_redirect(state: &AppState, page: &str) -> Redirect {
    let base = state.config.frontend_url.trim_end_matches('/');
    Redirect::to(&format!("{base}/{page}"))
}
