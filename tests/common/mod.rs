#![allow(dead_code)]

use axum::{Json, Router, extract::Query, routing::{get, post}};
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use shipping_orders_api::{
    config::{AppConfig, GatewayConfig, JwtConfig},
    db::run_migrations,
    entity::sea_orm_active_enums::Role,
    middleware::auth::AuthUser,
    services::auth_service::{NewAccount, create_account},
    state::AppState,
};
use std::collections::HashMap;

pub const IPN_SECRET: &str = "test-ipn-secret";
pub const JWT_SECRET: &str = "test-jwt-secret";

pub fn config(gateway_url: &str) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://frontend.test".into(),
        cors_origins: vec!["http://frontend.test".into()],
        fedex_flat_rate: 30.0,
        jwt: JwtConfig {
            secret: JWT_SECRET.into(),
            ttl_minutes: 60,
        },
        gateway: GatewayConfig {
            api_url: gateway_url.into(),
            api_key: "test-api-key".into(),
            ipn_secret: IPN_SECRET.into(),
            timeout_secs: 5,
            ipn_callback_url: "http://api.test/api/ipn".into(),
            success_url: "http://api.test/api/payment-success".into(),
            cancel_url: "http://api.test/api/payment-cancel".into(),
            price_currencies: vec!["USD".into()],
            pay_currencies: vec!["BTC".into(), "LTC".into(), "ETH".into()],
        },
    }
}

/// In-memory SQLite holds one database per connection, so the pool is pinned to one.
pub async fn state_with_gateway(gateway_url: &str) -> anyhow::Result<AppState> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;
    AppState::new(orm, config(gateway_url))
}

pub async fn state() -> anyhow::Result<AppState> {
    state_with_gateway("http://127.0.0.1:9").await
}

pub async fn create_user(state: &AppState, username: &str, role: Role) -> anyhow::Result<AuthUser> {
    let user = create_account(
        &state.orm,
        NewAccount {
            name: format!("{username} name"),
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "secret-password".into(),
        },
        role,
    )
    .await?;
    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub fn bearer(state: &AppState, user: &AuthUser) -> String {
    let token = state
        .tokens
        .issue(user.user_id, user.role)
        .expect("token");
    format!("Bearer {token}")
}

/// Starts a stand-in for the payment gateway on an ephemeral port.
/// Invoices are numbered from `invoice_id`; estimates convert at a fixed 0.0104 rate.
pub async fn mock_gateway(invoice_id: u64) -> anyhow::Result<String> {
    let app = Router::new()
        .route(
            "/invoice",
            post(move |Json(body): Json<Value>| async move {
                Json(json!({
                    "id": invoice_id,
                    "order_id": body["order_id"],
                    "invoice_url": format!("https://pay.test/invoice/{invoice_id}"),
                }))
            }),
        )
        .route(
            "/estimate",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                let amount: f64 = query
                    .get("amount")
                    .and_then(|a| a.parse().ok())
                    .unwrap_or_default();
                Json(json!({
                    "currency_from": query.get("currency_from"),
                    "currency_to": query.get("currency_to"),
                    "estimated_amount": format!("{:.4}", amount * 0.0104),
                }))
            }),
        )
        .route(
            "/payment/{id}",
            get(|axum::extract::Path(id): axum::extract::Path<String>| async move {
                Json(json!({ "payment_id": id, "payment_status": "waiting" }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// Gateway that rejects every call.
pub async fn failing_gateway() -> anyhow::Result<String> {
    let app = Router::new().fallback(|| async {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "gateway down" })),
        )
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

pub fn sign(state: &AppState, body: &Value) -> String {
    state.ipn.sign(body)
}

/// Inserts a pending deposit as if an invoice had just been created.
pub async fn seed_transaction(
    state: &AppState,
    user: &AuthUser,
    payment_id: &str,
    amount: f64,
) -> anyhow::Result<String> {
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};
    use shipping_orders_api::entity::{
        sea_orm_active_enums::TransactionStatus, transactions::ActiveModel,
    };
    use uuid::Uuid;

    let reference = format!("order_1700000000000_{}", user.user_id);
    let now = Utc::now().fixed_offset();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        payment_id: Set(payment_id.to_string()),
        order_reference: Set(reference.clone()),
        amount: Set(amount),
        currency: Set("USD".into()),
        pay_currency: Set("LTC".into()),
        amount_paid: Set(0.0),
        status: Set(TransactionStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;
    Ok(reference)
}

pub fn ipn_body(payment_id: &str, order_id: &str, status: &str, actually_paid: Option<f64>) -> Value {
    let mut body = json!({
        "payment_id": payment_id,
        "order_id": order_id,
        "payment_status": status,
        "price_amount": 50,
        "price_currency": "usd",
        "pay_currency": "ltc",
    });
    if let Some(paid) = actually_paid {
        body["actually_paid"] = json!(paid);
    }
    body
}
