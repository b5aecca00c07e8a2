mod common;

use chrono::{NaiveDate, Utc};
use shipping_orders_api::{
    dto::orders::{
        CreateOrderRequest, FedexOrderInput, PickupInput, QuoteRequest, UpdateOrderStatusRequest,
        UpdateTrackingRequest,
    },
    entity::sea_orm_active_enums::{Carrier, OrderStatus, Role},
    error::AppError,
    middleware::auth::AuthUser,
    models::{LabelDetails, Order, OrderDetails, PickupWindow, PostalAddress, Shipment, ShipmentItem},
    routes::params::{AdminOrderQuery, OrderListQuery, Pagination},
    services::{admin_service, earnings_service, order_service},
    state::AppState,
};
use tokio::task::JoinSet;

fn address(name: &str) -> PostalAddress {
    PostalAddress {
        name: name.into(),
        company_name: None,
        street1: "1 Main St".into(),
        street2: None,
        city: "Springfield".into(),
        state: Some("IL".into()),
        zip: "62701".into(),
        country: "US".into(),
        phone: None,
        email: None,
    }
}

fn label_order(order_type: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        from_address: address("Sender"),
        to_address: address("Recipient"),
        note: Some("  fragile  ".into()),
        label: Some(LabelDetails {
            order_type: order_type.into(),
            weight: 2.5,
            template: None,
        }),
        fedex: None,
    }
}

fn fedex_order() -> CreateOrderRequest {
    CreateOrderRequest {
        from_address: address("Sender"),
        to_address: address("Recipient"),
        note: None,
        label: None,
        fedex: Some(FedexOrderInput {
            signature: Some(true),
            pickup: Some(PickupInput {
                address: address("Dock"),
                window: PickupWindow {
                    date: NaiveDate::from_ymd_opt(2026, 11, 2).expect("date"),
                    from_time: "09:00".into(),
                    to_time: "12:00".into(),
                },
            }),
            shipment: Shipment {
                purpose: "Gift".into(),
                currency: None,
                items: vec![
                    ShipmentItem {
                        units: 2,
                        description: Some("Mugs".into()),
                        weight: 1.5,
                        value: 20.0,
                        tariff: "6912.00".into(),
                    },
                    ShipmentItem {
                        units: 1,
                        description: None,
                        weight: 0.4,
                        value: 5.0,
                        tariff: "4901.99".into(),
                    },
                ],
            },
        }),
    }
}

async fn create(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    req: CreateOrderRequest,
) -> anyhow::Result<Order> {
    Ok(order_service::create_order(state, user, carrier, req)
        .await?
        .data
        .expect("order"))
}

#[tokio::test]
async fn label_orders_are_numbered_priced_and_scoped() -> anyhow::Result<()> {
    let state = common::state().await?;
    let owner = common::create_user(&state, "shipper", Role::User).await?;
    let stranger = common::create_user(&state, "stranger", Role::User).await?;

    let first = create(&state, &owner, Carrier::Usps, label_order("USPS Priority")).await?;
    let second = create(&state, &owner, Carrier::Usps, label_order("USPS Express")).await?;
    assert_eq!(first.order_number, "SHUSPS1000");
    assert_eq!(second.order_number, "SHUSPS1001");
    assert_eq!(first.price, 20.0);
    assert_eq!(second.price, 30.0);
    assert_eq!(first.status, OrderStatus::Pending);
    assert_eq!(first.note.as_deref(), Some("fragile"));
    assert!(matches!(first.details, OrderDetails::Label(_)));

    // Counters are per carrier.
    let dhl = create(&state, &owner, Carrier::Dhl, label_order("DHL Ground lb")).await?;
    assert_eq!(dhl.order_number, "SHDFL1000");
    assert_eq!(dhl.price, 15.0);

    let by_number = order_service::get_order(&state, &owner, Carrier::Usps, "SHUSPS1001").await?;
    assert_eq!(by_number.data.expect("order").id, second.id);
    let by_id = order_service::get_order(&state, &owner, Carrier::Usps, &first.id.to_string()).await?;
    assert_eq!(by_id.data.expect("order").order_number, "SHUSPS1000");

    let err = order_service::get_order(&state, &stranger, Carrier::Usps, "SHUSPS1000")
        .await
        .expect_err("other users cannot see it");
    assert!(matches!(err, AppError::NotFound));
    let err = order_service::get_order(&state, &owner, Carrier::Dhl, "SHUSPS1000")
        .await
        .expect_err("wrong carrier");
    assert!(matches!(err, AppError::NotFound));

    let list = order_service::list_orders(&state, &owner, Carrier::Usps, OrderListQuery::default())
        .await?;
    assert_eq!(list.meta.expect("meta").total, Some(2));
    Ok(())
}

#[tokio::test]
async fn invalid_orders_are_rejected() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "careless", Role::User).await?;

    let err = order_service::create_order(&state, &user, Carrier::Usps, label_order("Teleport"))
        .await
        .expect_err("unknown service");
    assert_eq!(err.to_string(), "Invalid order type");

    let err = order_service::create_order(&state, &user, Carrier::FedexDomestic, label_order("USPS Priority"))
        .await
        .expect_err("fedex needs fedex details");
    assert_eq!(err.to_string(), "fedex details are required");

    let mut missing_city = label_order("USPS Priority");
    missing_city.to_address.city = "  ".into();
    let err = order_service::create_order(&state, &user, Carrier::Usps, missing_city)
        .await
        .expect_err("city required");
    assert_eq!(err.to_string(), "to_address.city is required");

    // Rejected requests do not consume numbers.
    let ok = create(&state, &user, Carrier::Usps, label_order("USPS Priority")).await?;
    assert_eq!(ok.order_number, "SHUSPS1000");
    Ok(())
}

// Single-connection SQLite serializes these tasks; this covers the counter
// upsert inside the order transaction, not row contention under Postgres.
#[tokio::test]
async fn concurrent_creates_get_contiguous_numbers() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "busy", Role::User).await?;

    let mut set = JoinSet::new();
    for _ in 0..10 {
        let state = state.clone();
        let user = user.clone();
        set.spawn(async move {
            order_service::create_order(&state, &user, Carrier::Dhl, label_order("DHL Priority"))
                .await
                .map(|resp| resp.data.expect("order").order_number)
        });
    }
    let mut numbers = Vec::new();
    while let Some(result) = set.join_next().await {
        numbers.push(result??);
    }
    numbers.sort();

    let expected: Vec<String> = (1000..1010).map(|n| format!("SHDFL{n}")).collect();
    assert_eq!(numbers, expected);
    Ok(())
}

#[tokio::test]
async fn fedex_orders_keep_shipment_and_duplicate_cleanly() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "exporter", Role::User).await?;
    let admin = common::create_user(&state, "ops", Role::Admin).await?;

    let order = create(&state, &user, Carrier::FedexInternational, fedex_order()).await?;
    assert_eq!(order.order_number, "SHFDIN1000");
    assert_eq!(order.price, 30.0);
    assert_eq!(order.pickup_address.as_ref().map(|a| a.name.as_str()), Some("Dock"));
    let shipment = order.shipment.clone().expect("shipment");
    assert_eq!(shipment.currency.as_deref(), Some("USD"));
    assert_eq!(shipment.items.len(), 2);
    assert_eq!(shipment.items[0].description.as_deref(), Some("Mugs"));
    match &order.details {
        OrderDetails::Fedex(details) => {
            assert!(details.signature);
            assert_eq!(details.pickup.as_ref().map(|p| p.from_time.as_str()), Some("09:00"));
        }
        other => panic!("unexpected details {other:?}"),
    }

    order_service::update_status(
        &state,
        &user,
        Carrier::FedexInternational,
        &order.order_number,
        UpdateOrderStatusRequest {
            status: "In Progress".into(),
        },
    )
    .await?;
    let tracked = order_service::update_tracking(
        &state,
        &admin,
        &order.order_number,
        UpdateTrackingRequest {
            tracking: " 7946 0000 1234 ".into(),
        },
    )
    .await?
    .data
    .expect("tracking");
    assert_eq!(tracked.tracking, "7946 0000 1234");
    assert_eq!(tracked.carrier, Carrier::FedexInternational);

    let copy = order_service::duplicate_order(
        &state,
        &user,
        Carrier::FedexInternational,
        &order.id.to_string(),
    )
    .await?
    .data
    .expect("copy");
    assert_eq!(copy.order_number, "SHFDIN1001");
    assert_ne!(copy.id, order.id);
    assert_eq!(copy.status, OrderStatus::Pending);
    assert_eq!(copy.tracking, "");
    assert_eq!(copy.shipment, order.shipment);
    assert_eq!(copy.pickup_address, order.pickup_address);
    assert_eq!(copy.details, order.details);

    let source = order_service::get_order(&state, &user, Carrier::FedexInternational, "SHFDIN1000")
        .await?
        .data
        .expect("source");
    assert_eq!(source.status, OrderStatus::InProcess);
    assert_eq!(source.tracking, "7946 0000 1234");
    Ok(())
}

#[tokio::test]
async fn status_updates_accept_aliases_only() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "mover", Role::User).await?;
    let order = create(&state, &user, Carrier::Usps, label_order("USPS Ground OZ")).await?;

    let err = order_service::update_status(
        &state,
        &user,
        Carrier::Usps,
        &order.order_number,
        UpdateOrderStatusRequest {
            status: "Shipped".into(),
        },
    )
    .await
    .expect_err("unknown status");
    assert!(matches!(err, AppError::InvalidStatus(s) if s == "Shipped"));

    let done = order_service::update_status(
        &state,
        &user,
        Carrier::Usps,
        &order.order_number,
        UpdateOrderStatusRequest {
            status: "Completed".into(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(done.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn deleted_orders_are_gone() -> anyhow::Result<()> {
    let state = common::state().await?;
    let user = common::create_user(&state, "tidy", Role::User).await?;
    let order = create(&state, &user, Carrier::FedexDomestic, fedex_order()).await?;

    let deleted = order_service::delete_order(&state, &user, Carrier::FedexDomestic, &order.order_number)
        .await?
        .data
        .expect("ref");
    assert_eq!(deleted.id, order.id);

    let err = order_service::get_order(&state, &user, Carrier::FedexDomestic, &order.order_number)
        .await
        .expect_err("deleted");
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn quotes_follow_the_price_table() -> anyhow::Result<()> {
    let state = common::state().await?;

    let usps = order_service::quote(
        &state,
        Carrier::Usps,
        QuoteRequest {
            order_type: Some("USPS Priority v2".into()),
        },
    )
    .await?
    .data
    .expect("quote");
    assert_eq!(usps.price, 25.0);
    assert!(usps.services.contains(&"USPS Express".to_string()));

    let fedex = order_service::quote(&state, Carrier::FedexDomestic, QuoteRequest { order_type: None })
        .await?
        .data
        .expect("quote");
    assert_eq!(fedex.price, 30.0);
    Ok(())
}

#[tokio::test]
async fn admin_views_span_all_users_and_carriers() -> anyhow::Result<()> {
    let state = common::state().await?;
    let admin = common::create_user(&state, "chief", Role::Admin).await?;
    let a = common::create_user(&state, "customer-a", Role::User).await?;
    let b = common::create_user(&state, "customer-b", Role::User).await?;

    create(&state, &a, Carrier::Usps, label_order("USPS Priority")).await?;
    create(&state, &a, Carrier::Dhl, label_order("DHL Express")).await?;
    create(&state, &b, Carrier::FedexDomestic, fedex_order()).await?;

    let all = order_service::admin_list_orders(&state, &admin, AdminOrderQuery::default()).await?;
    assert_eq!(all.meta.expect("meta").total, Some(3));

    let only_a = order_service::admin_list_orders(
        &state,
        &admin,
        AdminOrderQuery {
            user_id: Some(a.user_id),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(only_a.meta.expect("meta").total, Some(2));

    let err = order_service::admin_list_orders(&state, &a, AdminOrderQuery::default())
        .await
        .expect_err("customers are not admins");
    assert!(matches!(err, AppError::Forbidden));

    let users = admin_service::list_users(&state, &admin, Pagination::default())
        .await?
        .data
        .expect("users")
        .items;
    assert_eq!(users.len(), 2);
    let overview_a = users
        .iter()
        .find(|u| u.user.id == a.user_id)
        .expect("customer a listed");
    assert_eq!(overview_a.total_orders, 2);
    assert_eq!(overview_a.balance, 0.0);

    let report = earnings_service::earnings_at(&state.orm, Utc::now(), None).await?;
    assert_eq!(report.total.daily, 20.0 + 30.0 + 30.0);
    assert_eq!(report.total.yearly, report.total.daily);
    let dhl = report
        .carriers
        .iter()
        .find(|c| c.carrier == Carrier::Dhl)
        .expect("dhl row");
    assert_eq!(dhl.earnings.monthly, 30.0);

    let fedex_only = earnings_service::earnings_at(&state.orm, Utc::now(), Some(Carrier::FedexDomestic)).await?;
    assert_eq!(fedex_only.carriers.len(), 1);
    assert_eq!(fedex_only.total.daily, 30.0);
    Ok(())
}
