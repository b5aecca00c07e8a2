use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderList, OrderRef, QuoteRequest, QuoteResponse,
        UpdateOrderStatusRequest,
    },
    entity::sea_orm_active_enums::Carrier,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

/// Mounted under `/api/orders/{carrier}`; every handler is generic over the carrier.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{carrier}", get(list_orders).post(create_order))
        .route("/{carrier}/quote", post(quote))
        .route("/{carrier}/{key}", get(get_order).delete(delete_order))
        .route("/{carrier}/{key}/status", put(update_status))
        .route("/{carrier}/{key}/duplicate", post(duplicate_order))
}

#[utoipa::path(
    get,
    path = "/api/orders/{carrier}",
    params(
        ("carrier" = Carrier, Path, description = "usps, fedex-domestic, fedex-international or dhl"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Caller's orders for the carrier", body = ApiResponse<OrderList>),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(carrier): Path<Carrier>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, carrier, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{carrier}",
    params(("carrier" = Carrier, Path, description = "Carrier slug")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<Order>),
        (status = 400, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(carrier): Path<Carrier>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let resp = order_service::create_order(&state, &user, carrier, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{carrier}/quote",
    params(("carrier" = Carrier, Path, description = "Carrier slug")),
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Price for the service", body = ApiResponse<QuoteResponse>),
        (status = 400, description = "Invalid order type")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn quote(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(carrier): Path<Carrier>,
    Json(payload): Json<QuoteRequest>,
) -> AppResult<Json<ApiResponse<QuoteResponse>>> {
    let resp = order_service::quote(&state, carrier, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{carrier}/{key}",
    params(
        ("carrier" = Carrier, Path, description = "Carrier slug"),
        ("key" = String, Path, description = "Order UUID or order number")
    ),
    responses(
        (status = 200, description = "Order", body = ApiResponse<Order>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path((carrier, key)): Path<(Carrier, String)>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::get_order(&state, &user, carrier, &key).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{carrier}/{key}/status",
    params(
        ("carrier" = Carrier, Path, description = "Carrier slug"),
        ("key" = String, Path, description = "Order UUID or order number")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((carrier, key)): Path<(Carrier, String)>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_status(&state, &user, carrier, &key, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{carrier}/{key}/duplicate",
    params(
        ("carrier" = Carrier, Path, description = "Carrier slug"),
        ("key" = String, Path, description = "Order UUID or order number")
    ),
    responses(
        (status = 201, description = "Copy created with a new number", body = ApiResponse<Order>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn duplicate_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path((carrier, key)): Path<(Carrier, String)>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let resp = order_service::duplicate_order(&state, &user, carrier, &key).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{carrier}/{key}",
    params(
        ("carrier" = Carrier, Path, description = "Carrier slug"),
        ("key" = String, Path, description = "Order UUID or order number")
    ),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<OrderRef>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path((carrier, key)): Path<(Carrier, String)>,
) -> AppResult<Json<ApiResponse<OrderRef>>> {
    let resp = order_service::delete_order(&state, &user, carrier, &key).await?;
    Ok(Json(resp))
}
