mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{EntityTrait, PaginatorTrait};
use shipping_orders_api::{
    dto::payments::{AddBalanceRequest, CreatePaymentRequest, EstimateQuery},
    entity::{Transactions, sea_orm_active_enums::Role},
    error::AppError,
    routes::{build_app, params::TransactionListQuery},
    services::{admin_service, balance_service, payment_service},
};
use tower::ServiceExt;

fn deposit(amount: f64, pay_currency: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        amount,
        currency: "USD".into(),
        pay_currency: pay_currency.into(),
    }
}

#[tokio::test]
async fn balance_defaults_to_zero() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "fresh", Role::User).await?;

    let resp = balance_service::get_balance(&state, &user).await?;
    assert_eq!(resp.data.expect("balance").balance, 0.0);
    Ok(())
}

#[tokio::test]
async fn gateway_failure_persists_nothing() -> anyhow::Result<()> {
    let gateway = common::failing_gateway().await?;
    let state = common::state_with_gateway(&gateway).await?;
    let user = common::create_user(&state, "blocked", Role::User).await?;

    let err = payment_service::create_payment(&state, &user, deposit(50.0, "BTC"))
        .await
        .expect_err("gateway is down");
    assert!(matches!(err, AppError::PaymentGateway(_)));
    assert_eq!(Transactions::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_deposits_never_reach_the_gateway() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "sloppy", Role::User).await?;

    for (amount, coin) in [(0.0, "BTC"), (-1.0, "BTC"), (10.0, "DOGE")] {
        let err = payment_service::create_payment(&state, &user, deposit(amount, coin))
            .await
            .expect_err("invalid deposit");
        assert!(matches!(err, AppError::Validation(_)));
    }
    assert_eq!(Transactions::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn estimate_validates_and_converts() -> anyhow::Result<()> {
    let gateway = common::mock_gateway(1).await?;
    let state = common::state_with_gateway(&gateway).await?;

    let ok = payment_service::estimate(
        &state,
        EstimateQuery {
            amount: Some("50".into()),
            currency: Some("usd".into()),
            pay_currency: Some("ltc".into()),
        },
    )
    .await?
    .data
    .expect("estimate");
    assert_eq!(ok.estimated_amount, 0.52);
    assert_eq!(ok.pay_currency, "LTC");

    let err = payment_service::estimate(
        &state,
        EstimateQuery {
            amount: Some("fifty".into()),
            currency: Some("USD".into()),
            pay_currency: Some("LTC".into()),
        },
    )
    .await
    .expect_err("bad amount");
    assert_eq!(err.to_string(), "Invalid amount");
    Ok(())
}

#[tokio::test]
async fn payment_status_is_passed_through() -> anyhow::Result<()> {
    let gateway = common::mock_gateway(1).await?;
    let state = common::state_with_gateway(&gateway).await?;

    let status = payment_service::payment_status(&state, "42")
        .await?
        .data
        .expect("status");
    assert_eq!(status["payment_id"], "42");
    assert_eq!(status["payment_status"], "waiting");
    Ok(())
}

#[tokio::test]
async fn transactions_are_listed_per_owner() -> anyhow::Result<()> {
    let state = common::state().await?;
    let alice = common::create_user(&state, "alice", Role::User).await?;
    let bob = common::create_user(&state, "bob", Role::User).await?;
    let admin = common::create_user(&state, "boss", Role::Admin).await?;
    common::seed_transaction(&state, &alice, "a-1", 10.0).await?;
    common::seed_transaction(&state, &alice, "a-2", 20.0).await?;
    common::seed_transaction(&state, &bob, "b-1", 30.0).await?;

    let mine = payment_service::list_transactions(&state, &alice, TransactionListQuery::default())
        .await?;
    let items = mine.data.expect("items").items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|t| t.user_id == alice.user_id));

    let err = payment_service::admin_list_transactions(&state, &alice, TransactionListQuery::default())
        .await
        .expect_err("not admin");
    assert!(matches!(err, AppError::Forbidden));

    let all = payment_service::admin_list_transactions(&state, &admin, TransactionListQuery::default())
        .await?;
    assert_eq!(all.meta.expect("meta").total, Some(3));
    Ok(())
}

#[tokio::test]
async fn admin_credit_accumulates() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "topped", Role::User).await?;
    let admin = common::create_user(&state, "cashier", Role::Admin).await?;

    for amount in [5.0, 7.5] {
        admin_service::add_balance(
            &state,
            &admin,
            AddBalanceRequest {
                user_id: user.user_id,
                amount,
            },
        )
        .await?;
    }
    assert_eq!(balance_service::balance_of(&state.orm, user.user_id).await?, 12.5);

    let err = admin_service::add_balance(
        &state,
        &user,
        AddBalanceRequest {
            user_id: user.user_id,
            amount: 100.0,
        },
    )
    .await
    .expect_err("users cannot credit themselves");
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn payment_pages_redirect_to_frontend() -> anyhow::Result<()> {
    let state = common::state().await?;
    let app = build_app(state);

    for (path, target) in [
        ("/api/payment-success", "http://frontend.test/payment-success"),
        ("/api/payment-cancel", "http://frontend.test/payment-cancel"),
    ] {
        let resp = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty())?)
            .await?;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], target);
    }
    Ok(())
}
