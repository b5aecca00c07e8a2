mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::Value;
use shipping_orders_api::{
    dto::payments::{CreatePaymentRequest, IpnOutcome},
    entity::{
        Transactions,
        sea_orm_active_enums::{Role, TransactionStatus},
        transactions::{Column as TxCol, Model as TransactionModel},
    },
    error::AppError,
    response::ApiResponse,
    routes::build_app,
    services::{balance_service, payment_service},
    state::AppState,
};
use tokio::task::JoinSet;
use tower::ServiceExt;

async fn transaction(state: &AppState, payment_id: &str) -> anyhow::Result<TransactionModel> {
    Transactions::find()
        .filter(TxCol::PaymentId.eq(payment_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("transaction {payment_id} missing"))
}

async fn deliver(state: &AppState, body: &Value) -> Result<ApiResponse<IpnOutcome>, AppError> {
    let raw = serde_json::to_vec(body).expect("serialize");
    let sig = common::sign(state, body);
    payment_service::handle_ipn(state, &raw, Some(&sig)).await
}

#[tokio::test]
async fn finished_payment_credits_once_across_redeliveries() -> anyhow::Result<()> {
    let gateway = common::mock_gateway(5077125051).await?;
    let state = common::state_with_gateway(&gateway).await?;
    let user = common::create_user(&state, "payer", Role::User).await?;

    let created = payment_service::create_payment(
        &state,
        &user,
        CreatePaymentRequest {
            amount: 50.0,
            currency: "usd".into(),
            pay_currency: "ltc".into(),
        },
    )
    .await?;
    let created = created.data.expect("payment data");
    assert_eq!(created.payment_id, "5077125051");
    assert_eq!(created.invoice_url, "https://pay.test/invoice/5077125051");

    let stored = transaction(&state, "5077125051").await?;
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(stored.amount, 50.0);
    assert_eq!(stored.amount_paid, 0.0);

    let body = common::ipn_body("5077125051", &stored.order_reference, "finished", Some(0.52));
    let first = deliver(&state, &body).await?.data.expect("outcome");
    assert!(first.credited);
    assert_eq!(first.status, TransactionStatus::Completed);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.52);

    for _ in 0..3 {
        let again = deliver(&state, &body).await?.data.expect("outcome");
        assert!(!again.credited);
        assert_eq!(again.status, TransactionStatus::Completed);
    }
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.52);

    let stored = transaction(&state, "5077125051").await?;
    assert_eq!(stored.status, TransactionStatus::Completed);
    assert_eq!(stored.amount_paid, 0.52);
    assert_eq!(stored.pay_currency, "LTC");
    Ok(())
}

#[tokio::test]
async fn waiting_then_finished_credits_on_completion_only() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "waiter", Role::User).await?;
    let reference = common::seed_transaction(&state, &user, "p-wait", 50.0).await?;

    let waiting = deliver(&state, &common::ipn_body("p-wait", &reference, "waiting", None))
        .await?
        .data
        .expect("outcome");
    assert!(!waiting.credited);
    assert_eq!(waiting.status, TransactionStatus::Pending);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.0);

    let partial = deliver(&state, &common::ipn_body("p-wait", &reference, "partially_paid", None))
        .await?
        .data
        .expect("outcome");
    assert_eq!(partial.status, TransactionStatus::Unknown);
    assert!(!partial.credited);

    // Without actually_paid the requested amount is credited.
    let finished = deliver(&state, &common::ipn_body("p-wait", &reference, "finished", None))
        .await?
        .data
        .expect("outcome");
    assert!(finished.credited);
    assert_eq!(finished.amount_paid, 50.0);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 50.0);
    Ok(())
}

#[tokio::test]
async fn failed_transactions_stay_failed() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "unlucky", Role::User).await?;
    let reference = common::seed_transaction(&state, &user, "p-fail", 20.0).await?;

    deliver(&state, &common::ipn_body("p-fail", &reference, "failed", None)).await?;
    let late = deliver(&state, &common::ipn_body("p-fail", &reference, "finished", Some(0.2)))
        .await?
        .data
        .expect("outcome");

    assert!(!late.credited);
    assert_eq!(late.status, TransactionStatus::Failed);
    assert_eq!(transaction(&state, "p-fail").await?.status, TransactionStatus::Failed);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.0);
    Ok(())
}

#[tokio::test]
async fn bad_signatures_change_nothing() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "target", Role::User).await?;
    let reference = common::seed_transaction(&state, &user, "p-forged", 50.0).await?;

    let body = common::ipn_body("p-forged", &reference, "finished", Some(1000.0));
    let raw = serde_json::to_vec(&body)?;
    let forged = shipping_orders_api::webhook::IpnVerifier::new("wrong-secret")?.sign(&body);

    for signature in [None, Some(""), Some("deadbeef"), Some(forged.as_str())] {
        let err = payment_service::handle_ipn(&state, &raw, signature)
            .await
            .expect_err("must reject");
        assert!(matches!(err, AppError::InvalidSignature));
    }

    let stored = transaction(&state, "p-forged").await?;
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.0);
    Ok(())
}

#[tokio::test]
async fn unknown_and_malformed_notifications_are_rejected() -> anyhow::Result<()> {
    let state = common::state().await?;

    let unknown = common::ipn_body("nope", "order_x", "finished", Some(1.0));
    let err = deliver(&state, &unknown).await.expect_err("unknown");
    assert!(matches!(err, AppError::UnknownTransaction(id) if id == "nope"));

    let mut malformed = common::ipn_body("nope", "order_x", "finished", None);
    malformed.as_object_mut().expect("object").remove("payment_status");
    let err = deliver(&state, &malformed).await.expect_err("malformed");
    assert!(matches!(err, AppError::MalformedWebhook(field) if field == "payment_status"));
    Ok(())
}

#[tokio::test]
async fn externally_signed_dust_amounts_are_credited() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "dust", Role::User).await?;
    common::seed_transaction(&state, &user, "p-tiny", 0.00001).await?;

    // HMAC-SHA512 with the test secret over the key-sorted JSON.stringify output.
    let raw = br#"{"payment_id":"p-tiny","order_id":"order-tiny","payment_status":"finished","price_amount":0.00001,"actually_paid":0.000005,"pay_currency":"btc","fee":{"depositFee":0.0000001,"currency":"btc"}}"#;
    let sig = "8e945cfa6ee301628aa77431678c29c6217f62d8963e3572beb4159af0c3f9ba2b465faa91cbc73c2a441c1168ed9568b307ba2393b1eccb1445f6d358382b2a";

    let outcome = payment_service::handle_ipn(&state, raw, Some(sig))
        .await?
        .data
        .expect("outcome");
    assert!(outcome.credited);
    assert_eq!(outcome.status, TransactionStatus::Completed);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.000005);
    assert_eq!(transaction(&state, "p-tiny").await?.pay_currency, "BTC");
    Ok(())
}

// SQLite in memory serves a single connection, so these tasks interleave at
// await points rather than racing on the row; they check the guarded update
// and upsert logic, not database-level contention.
#[tokio::test]
async fn concurrent_deliveries_credit_exactly_once() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "racer", Role::User).await?;
    let reference = common::seed_transaction(&state, &user, "p-race", 50.0).await?;
    let body = common::ipn_body("p-race", &reference, "finished", Some(0.52));

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let state = state.clone();
        let body = body.clone();
        set.spawn(async move { deliver(&state, &body).await });
    }
    let mut credited = 0;
    while let Some(result) = set.join_next().await {
        if result??.data.expect("outcome").credited {
            credited += 1;
        }
    }

    assert_eq!(credited, 1);
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 0.52);
    Ok(())
}

#[tokio::test]
async fn ipn_endpoint_reads_signature_header() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "http", Role::User).await?;
    let reference = common::seed_transaction(&state, &user, "p-http", 50.0).await?;
    let body = common::ipn_body("p-http", &reference, "finished", Some(0.52));
    let raw = serde_json::to_vec(&body)?;
    let app = build_app(state.clone());

    let unsigned = app
        .clone()
        .oneshot(
            Request::post("/api/ipn")
                .header("content-type", "application/json")
                .body(Body::from(raw.clone()))?,
        )
        .await?;
    assert_eq!(unsigned.status(), StatusCode::BAD_REQUEST);

    let signed = app
        .oneshot(
            Request::post("/api/ipn")
                .header("content-type", "application/json")
                .header("x-nowpayments-sig", common::sign(&state, &body))
                .body(Body::from(raw))?,
        )
        .await?;
    assert_eq!(signed.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&to_bytes(signed.into_body(), usize::MAX).await?)?;
    assert_eq!(json["message"], "IPN received successfully");
    assert_eq!(json["data"]["credited"], true);
    Ok(())
}
