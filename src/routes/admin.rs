use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::{
        admin::{AddAdminRequest, AdminProfile, EarningsQuery, EarningsReport, UserList},
        orders::{OrderList, TrackingUpdated, UpdateOrderStatusRequest, UpdateTrackingRequest},
        payments::{AddBalanceRequest, BalanceResponse, TransactionList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, User},
    response::ApiResponse,
    routes::params::{AdminOrderQuery, Pagination, TransactionListQuery},
    services::{admin_service, auth_service, earnings_service, order_service, payment_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(admin_details))
        .route("/users", get(list_users))
        .route("/admins", post(add_admin))
        .route("/balance", post(add_balance))
        .route("/orders", get(list_all_orders))
        .route("/orders/{key}", get(get_order_admin))
        .route("/orders/{key}/status", put(update_order_status))
        .route("/orders/{key}/tracking", put(update_tracking))
        .route("/earnings", get(earnings))
        .route("/transactions", get(list_all_transactions))
}

#[utoipa::path(
    get,
    path = "/api/admin/me",
    responses(
        (status = 200, description = "Calling admin", body = ApiResponse<AdminProfile>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_details(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AdminProfile>>> {
    let resp = admin_service::admin_details(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Customers with balances and order counts", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/admins",
    request_body = AddAdminRequest,
    responses(
        (status = 201, description = "Admin account created", body = ApiResponse<User>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddAdminRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = auth_service::add_admin(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/admin/balance",
    request_body = AddBalanceRequest,
    responses(
        (status = 200, description = "Balance credited", body = ApiResponse<BalanceResponse>),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_balance(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddBalanceRequest>,
) -> AppResult<Json<ApiResponse<BalanceResponse>>> {
    let resp = admin_service::add_balance(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("carrier" = Option<String>, Query, description = "Filter by carrier"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("user_id" = Option<String>, Query, description = "Filter by owner"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders across all users", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminOrderQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::admin_list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{key}",
    params(("key" = String, Path, description = "Order UUID or order number")),
    responses(
        (status = 200, description = "Order", body = ApiResponse<Order>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::admin_get_order(&state, &user, &key).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{key}/status",
    params(("key" = String, Path, description = "Order UUID or order number")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::admin_update_status(&state, &user, &key, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{key}/tracking",
    params(("key" = String, Path, description = "Order UUID or order number")),
    request_body = UpdateTrackingRequest,
    responses(
        (status = 200, description = "Tracking code stored", body = ApiResponse<TrackingUpdated>),
        (status = 400, description = "Tracking code missing"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
    Json(payload): Json<UpdateTrackingRequest>,
) -> AppResult<Json<ApiResponse<TrackingUpdated>>> {
    let resp = order_service::update_tracking(&state, &user, &key, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/earnings",
    params(("carrier" = Option<String>, Query, description = "Restrict to one carrier")),
    responses(
        (status = 200, description = "Daily, monthly and yearly earnings", body = ApiResponse<EarningsReport>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn earnings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EarningsQuery>,
) -> AppResult<Json<ApiResponse<EarningsReport>>> {
    let resp = earnings_service::earnings(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/transactions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("user_id" = Option<String>, Query, description = "Filter by owner")
    ),
    responses(
        (status = 200, description = "Deposit transactions", body = ApiResponse<TransactionList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = payment_service::admin_list_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}
