use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CreateOrderRequest, OrderList, OrderRef, QuoteRequest, QuoteResponse,
        TrackingUpdated, UpdateOrderStatusRequest, UpdateTrackingRequest,
    },
    entity::{
        OrderAddresses, Orders, ShipmentItems, Shipments,
        order_addresses::{
            ActiveModel as OrderAddressActive, Column as AddressCol, Model as OrderAddressModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        sea_orm_active_enums::{AddressRole, Carrier, OrderStatus},
        shipment_items::{
            ActiveModel as ItemActive, Column as ItemCol, Model as ItemModel,
        },
        shipments::{ActiveModel as ShipmentActive, Column as ShipmentCol, Model as ShipmentModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        FedexDetails, LabelDetails, Order, OrderDetails, PostalAddress, Shipment, ShipmentItem,
    },
    pricing,
    response::{ApiResponse, Meta},
    routes::params::{AdminOrderQuery, OrderListQuery, SortOrder},
    services::counter_service,
    state::AppState,
};

/// Which orders a lookup may see.
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    owner: Option<Uuid>,
    carrier: Option<Carrier>,
}

/// A create request after validation, ready to persist.
#[derive(Debug, Clone)]
struct NewOrder {
    price: f64,
    note: Option<String>,
    details: OrderDetails,
    from_address: PostalAddress,
    to_address: PostalAddress,
    pickup_address: Option<PostalAddress>,
    shipment: Option<Shipment>,
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let new_order = validate_order(carrier, payload, state.config.fedex_flat_rate)?;

    let txn = state.orm.begin().await?;
    let order = insert_order(&txn, user.user_id, carrier, &new_order).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        carrier = %carrier,
        order_number = %order.order_number,
        "order created"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_create",
        "orders",
        json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    let order = load_one(&state.orm, order).await?;
    Ok(ApiResponse::success("Order created", order, Some(Meta::empty())))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let mut condition = Condition::all()
        .add(OrderCol::UserId.eq(user.user_id))
        .add(OrderCol::Carrier.eq(carrier));
    if let Some(status) = parse_status_filter(query.status.as_deref())? {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = sorted(Orders::find().filter(condition), query.sort_order);
    paginate(state, finder, query.pagination().normalize()).await
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    key: &str,
) -> AppResult<ApiResponse<Order>> {
    let order = find_scoped(&state.orm, key, owned(user, carrier)).await?;
    let order = load_one(&state.orm, order).await?;
    Ok(ApiResponse::success("Ok", order, Some(Meta::empty())))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    key: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    set_status(state, user, key, owned(user, carrier), payload).await
}

pub async fn duplicate_order(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    key: &str,
) -> AppResult<ApiResponse<Order>> {
    let source = find_scoped(&state.orm, key, owned(user, carrier)).await?;
    let source = load_one(&state.orm, source).await?;

    let copy = NewOrder {
        price: source.price,
        note: source.note.clone(),
        details: source.details.clone(),
        from_address: source.from_address.clone(),
        to_address: source.to_address.clone(),
        pickup_address: source.pickup_address.clone(),
        shipment: source.shipment.clone(),
    };

    let txn = state.orm.begin().await?;
    let order = insert_order(&txn, user.user_id, carrier, &copy).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        carrier = %carrier,
        source = %source.order_number,
        order_number = %order.order_number,
        "order duplicated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_duplicate",
        "orders",
        json!({ "source_id": source.id, "order_id": order.id }),
    )
    .await;

    let order = load_one(&state.orm, order).await?;
    Ok(ApiResponse::success("Order duplicated", order, Some(Meta::empty())))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    carrier: Carrier,
    key: &str,
) -> AppResult<ApiResponse<OrderRef>> {
    let order = find_scoped(&state.orm, key, owned(user, carrier)).await?;

    let txn = state.orm.begin().await?;
    let shipment_ids: Vec<Uuid> = Shipments::find()
        .filter(ShipmentCol::OrderId.eq(order.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if !shipment_ids.is_empty() {
        ShipmentItems::delete_many()
            .filter(ItemCol::ShipmentId.is_in(shipment_ids))
            .exec(&txn)
            .await?;
    }
    Shipments::delete_many()
        .filter(ShipmentCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    OrderAddresses::delete_many()
        .filter(AddressCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delete",
        "orders",
        json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        OrderRef {
            id: order.id,
            carrier: order.carrier,
            order_number: order.order_number,
        },
        Some(Meta::empty()),
    ))
}

pub async fn quote(
    state: &AppState,
    carrier: Carrier,
    payload: QuoteRequest,
) -> AppResult<ApiResponse<QuoteResponse>> {
    let price = pricing::quote(
        carrier,
        payload.order_type.as_deref(),
        state.config.fedex_flat_rate,
    )?;
    Ok(ApiResponse::success(
        "Ok",
        QuoteResponse {
            carrier,
            price,
            services: pricing::services(carrier)
                .into_iter()
                .map(str::to_string)
                .collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn admin_list_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminOrderQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let mut condition = Condition::all();
    if let Some(carrier) = query.carrier {
        condition = condition.add(OrderCol::Carrier.eq(carrier));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = parse_status_filter(query.status.as_deref())? {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = sorted(Orders::find().filter(condition), query.sort_order);
    paginate(state, finder, query.pagination().normalize()).await
}

pub async fn admin_get_order(
    state: &AppState,
    user: &AuthUser,
    key: &str,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let order = find_scoped(&state.orm, key, Scope::default()).await?;
    let order = load_one(&state.orm, order).await?;
    Ok(ApiResponse::success("Ok", order, Some(Meta::empty())))
}

pub async fn admin_update_status(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    set_status(state, user, key, Scope::default(), payload).await
}

/// Sets the tracking code on whichever carrier's order matches `key`.
pub async fn update_tracking(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    payload: UpdateTrackingRequest,
) -> AppResult<ApiResponse<TrackingUpdated>> {
    ensure_admin(user)?;
    let tracking = payload.tracking.trim().to_string();
    if tracking.is_empty() {
        return Err(AppError::Validation("tracking is required".into()));
    }

    let order = find_scoped(&state.orm, key, Scope::default()).await?;
    let mut active: OrderActive = order.into();
    active.tracking = Set(tracking);
    active.updated_at = Set(Utc::now().fixed_offset());
    let order = active.update(&state.orm).await?;

    tracing::info!(
        carrier = %order.carrier,
        order_number = %order.order_number,
        "tracking updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "tracking_update",
        "orders",
        json!({ "order_id": order.id, "tracking": order.tracking }),
    )
    .await;

    Ok(ApiResponse::success(
        "Tracking updated",
        TrackingUpdated {
            id: order.id,
            carrier: order.carrier,
            order_number: order.order_number,
            tracking: order.tracking,
        },
        Some(Meta::empty()),
    ))
}

async fn set_status(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    scope: Scope,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let status = parse_status(&payload.status)?;
    let order = find_scoped(&state.orm, key, scope).await?;

    let mut active: OrderActive = order.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let order = active.update(&state.orm).await?;

    tracing::info!(
        user_id = %user.user_id,
        order_number = %order.order_number,
        status = ?status,
        "order status updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status",
        "orders",
        json!({ "order_id": order.id, "status": payload.status.trim() }),
    )
    .await;

    let order = load_one(&state.orm, order).await?;
    Ok(ApiResponse::success("Order updated", order, Some(Meta::empty())))
}

fn owned(user: &AuthUser, carrier: Carrier) -> Scope {
    Scope {
        owner: Some(user.user_id),
        carrier: Some(carrier),
    }
}

pub fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|_| AppError::InvalidStatus(raw.trim().to_string()))
}

fn parse_status_filter(raw: Option<&str>) -> AppResult<Option<OrderStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_status(raw).map(Some),
        None => Ok(None),
    }
}

fn sorted(finder: Select<Orders>, order: Option<SortOrder>) -> Select<Orders> {
    match order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder
            .order_by_asc(OrderCol::CreatedAt)
            .order_by_asc(OrderCol::Sequence),
        SortOrder::Desc => finder
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Sequence),
    }
}

async fn paginate(
    state: &AppState,
    finder: Select<Orders>,
    (page, limit, offset): (i64, i64, i64),
) -> AppResult<ApiResponse<OrderList>> {
    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = assemble(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Looks an order up by UUID or by its human order number.
async fn find_scoped<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    scope: Scope,
) -> AppResult<OrderModel> {
    let key = key.trim();
    let mut condition = match Uuid::parse_str(key) {
        Ok(id) => Condition::all().add(OrderCol::Id.eq(id)),
        Err(_) => Condition::all().add(OrderCol::OrderNumber.eq(key)),
    };
    if let Some(owner) = scope.owner {
        condition = condition.add(OrderCol::UserId.eq(owner));
    }
    if let Some(carrier) = scope.carrier {
        condition = condition.add(OrderCol::Carrier.eq(carrier));
    }

    Orders::find()
        .filter(condition)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

fn validate_order(
    carrier: Carrier,
    payload: CreateOrderRequest,
    fedex_flat_rate: f64,
) -> AppResult<NewOrder> {
    let from_address = clean_address("from_address", payload.from_address)?;
    let to_address = clean_address("to_address", payload.to_address)?;
    let note = payload
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    if carrier.is_fedex() {
        let fedex = payload
            .fedex
            .ok_or_else(|| AppError::Validation("fedex details are required".into()))?;
        let shipment = clean_shipment(fedex.shipment)?;
        let (pickup_address, pickup) = match fedex.pickup {
            Some(pickup) => {
                let address = clean_address("pickup.address", pickup.address)?;
                require("pickup.from_time", &pickup.window.from_time)?;
                require("pickup.to_time", &pickup.window.to_time)?;
                (Some(address), Some(pickup.window))
            }
            None => (None, None),
        };

        return Ok(NewOrder {
            price: pricing::quote(carrier, None, fedex_flat_rate)?,
            note,
            details: OrderDetails::Fedex(FedexDetails {
                signature: fedex.signature.unwrap_or(false),
                pickup,
            }),
            from_address,
            to_address,
            pickup_address,
            shipment: Some(shipment),
        });
    }

    let label = payload
        .label
        .ok_or_else(|| AppError::Validation("label details are required".into()))?;
    require("label.order_type", &label.order_type)?;
    if !(label.weight.is_finite() && label.weight > 0.0) {
        return Err(AppError::Validation("label.weight must be positive".into()));
    }
    let price = pricing::quote(carrier, Some(&label.order_type), fedex_flat_rate)?;

    Ok(NewOrder {
        price,
        note,
        details: OrderDetails::Label(LabelDetails {
            order_type: label.order_type.trim().to_string(),
            weight: label.weight,
            template: label
                .template
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }),
        from_address,
        to_address,
        pickup_address: None,
        shipment: None,
    })
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_address(prefix: &str, address: PostalAddress) -> AppResult<PostalAddress> {
    require(&format!("{prefix}.name"), &address.name)?;
    require(&format!("{prefix}.street1"), &address.street1)?;
    require(&format!("{prefix}.city"), &address.city)?;
    require(&format!("{prefix}.zip"), &address.zip)?;
    require(&format!("{prefix}.country"), &address.country)?;

    Ok(PostalAddress {
        name: address.name.trim().to_string(),
        company_name: trimmed(address.company_name),
        street1: address.street1.trim().to_string(),
        street2: trimmed(address.street2),
        city: address.city.trim().to_string(),
        state: trimmed(address.state),
        zip: address.zip.trim().to_string(),
        country: address.country.trim().to_string(),
        phone: trimmed(address.phone),
        email: trimmed(address.email),
    })
}

fn clean_shipment(shipment: Shipment) -> AppResult<Shipment> {
    require("shipment.purpose", &shipment.purpose)?;
    if shipment.items.is_empty() {
        return Err(AppError::Validation(
            "shipment.items must not be empty".into(),
        ));
    }

    let mut items = Vec::with_capacity(shipment.items.len());
    for (i, item) in shipment.items.into_iter().enumerate() {
        if item.units <= 0 {
            return Err(AppError::Validation(format!(
                "shipment.items[{i}].units must be positive"
            )));
        }
        if !(item.weight.is_finite() && item.weight > 0.0) {
            return Err(AppError::Validation(format!(
                "shipment.items[{i}].weight must be positive"
            )));
        }
        if !(item.value.is_finite() && item.value >= 0.0) {
            return Err(AppError::Validation(format!(
                "shipment.items[{i}].value must not be negative"
            )));
        }
        require(&format!("shipment.items[{i}].tariff"), &item.tariff)?;
        items.push(ShipmentItem {
            units: item.units,
            description: trimmed(item.description),
            weight: item.weight,
            value: item.value,
            tariff: item.tariff.trim().to_string(),
        });
    }

    Ok(Shipment {
        purpose: shipment.purpose.trim().to_string(),
        currency: Some(
            trimmed(shipment.currency)
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
        ),
        items,
    })
}

/// Writes the order and its owned rows. The caller commits.
async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    carrier: Carrier,
    new_order: &NewOrder,
) -> AppResult<OrderModel> {
    let sequence = counter_service::next_order_sequence(conn, carrier).await?;
    let details = serde_json::to_value(&new_order.details)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let now = Utc::now().fixed_offset();

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        carrier: Set(carrier),
        sequence: Set(sequence),
        order_number: Set(carrier.order_number(sequence)),
        status: Set(OrderStatus::Pending),
        price: Set(new_order.price),
        tracking: Set(String::new()),
        note: Set(new_order.note.clone()),
        details: Set(details),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    let mut addresses = vec![
        address_row(order.id, AddressRole::From, &new_order.from_address),
        address_row(order.id, AddressRole::To, &new_order.to_address),
    ];
    if let Some(pickup) = &new_order.pickup_address {
        addresses.push(address_row(order.id, AddressRole::Pickup, pickup));
    }
    OrderAddresses::insert_many(addresses)
        .exec_without_returning(conn)
        .await?;

    if let Some(shipment) = &new_order.shipment {
        let shipment_id = Uuid::new_v4();
        ShipmentActive {
            id: Set(shipment_id),
            order_id: Set(order.id),
            purpose: Set(shipment.purpose.clone()),
            currency: Set(shipment.currency.clone().unwrap_or_else(|| "USD".into())),
        }
        .insert(conn)
        .await?;

        let items: Vec<ItemActive> = shipment
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| ItemActive {
                id: Set(Uuid::new_v4()),
                shipment_id: Set(shipment_id),
                position: Set(position as i32),
                units: Set(item.units),
                description: Set(item.description.clone()),
                weight: Set(item.weight),
                value: Set(item.value),
                tariff: Set(item.tariff.clone()),
            })
            .collect();
        if !items.is_empty() {
            ShipmentItems::insert_many(items)
                .exec_without_returning(conn)
                .await?;
        }
    }

    Ok(order)
}

fn address_row(order_id: Uuid, role: AddressRole, address: &PostalAddress) -> OrderAddressActive {
    OrderAddressActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        role: Set(role),
        name: Set(address.name.clone()),
        company_name: Set(address.company_name.clone()),
        street1: Set(address.street1.clone()),
        street2: Set(address.street2.clone()),
        city: Set(address.city.clone()),
        state: Set(address.state.clone()),
        zip: Set(address.zip.clone()),
        country: Set(address.country.clone()),
        phone: Set(address.phone.clone()),
        email: Set(address.email.clone()),
    }
}

async fn load_one<C: ConnectionTrait>(conn: &C, model: OrderModel) -> AppResult<Order> {
    assemble(conn, vec![model])
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

/// Joins addresses and shipments onto a page of orders with one query per table.
pub(crate) async fn assemble<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut addresses: HashMap<Uuid, Vec<OrderAddressModel>> = HashMap::new();
    for address in OrderAddresses::find()
        .filter(AddressCol::OrderId.is_in(ids.clone()))
        .all(conn)
        .await?
    {
        addresses.entry(address.order_id).or_default().push(address);
    }

    let shipments = Shipments::find()
        .filter(ShipmentCol::OrderId.is_in(ids))
        .all(conn)
        .await?;
    let mut items: HashMap<Uuid, Vec<ItemModel>> = HashMap::new();
    if !shipments.is_empty() {
        let shipment_ids: Vec<Uuid> = shipments.iter().map(|s| s.id).collect();
        for item in ShipmentItems::find()
            .filter(ItemCol::ShipmentId.is_in(shipment_ids))
            .order_by_asc(ItemCol::Position)
            .all(conn)
            .await?
        {
            items.entry(item.shipment_id).or_default().push(item);
        }
    }
    let mut shipments: HashMap<Uuid, Shipment> = shipments
        .into_iter()
        .map(|s| {
            let order_id = s.order_id;
            let lines = items.remove(&s.id).unwrap_or_default();
            (order_id, shipment_from_entity(s, lines))
        })
        .collect();

    models
        .into_iter()
        .map(|model| {
            let parts = addresses.remove(&model.id).unwrap_or_default();
            let shipment = shipments.remove(&model.id);
            order_from_entity(model, parts, shipment)
        })
        .collect()
}

fn order_from_entity(
    model: OrderModel,
    addresses: Vec<OrderAddressModel>,
    shipment: Option<Shipment>,
) -> AppResult<Order> {
    let details: OrderDetails = serde_json::from_value(model.details).map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unreadable details: {e}",
            model.order_number
        ))
    })?;

    let mut from_address = None;
    let mut to_address = None;
    let mut pickup_address = None;
    for address in addresses {
        let role = address.role;
        let postal = postal_from_entity(address);
        match role {
            AddressRole::From => from_address = Some(postal),
            AddressRole::To => to_address = Some(postal),
            AddressRole::Pickup => pickup_address = Some(postal),
        }
    }
    let missing = |side: &str| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has no {side} address",
            model.order_number
        ))
    };

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        carrier: model.carrier,
        from_address: from_address.ok_or_else(|| missing("from"))?,
        to_address: to_address.ok_or_else(|| missing("to"))?,
        order_number: model.order_number.clone(),
        status: model.status,
        price: model.price,
        tracking: model.tracking,
        note: model.note,
        details,
        pickup_address,
        shipment,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn postal_from_entity(model: OrderAddressModel) -> PostalAddress {
    PostalAddress {
        name: model.name,
        company_name: model.company_name,
        street1: model.street1,
        street2: model.street2,
        city: model.city,
        state: model.state,
        zip: model.zip,
        country: model.country,
        phone: model.phone,
        email: model.email,
    }
}

fn shipment_from_entity(model: ShipmentModel, items: Vec<ItemModel>) -> Shipment {
    Shipment {
        purpose: model.purpose,
        currency: Some(model.currency),
        items: items
            .into_iter()
            .map(|item| ShipmentItem {
                units: item.units,
                description: item.description,
                weight: item.weight,
                value: item.value,
                tariff: item.tariff,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::orders::FedexOrderInput;

    fn address(name: &str) -> PostalAddress {
        PostalAddress {
            name: name.into(),
            company_name: None,
            street1: "1 Main St".into(),
            street2: Some("  ".into()),
            city: "Springfield".into(),
            state: Some("IL".into()),
            zip: "62701".into(),
            country: "US".into(),
            phone: None,
            email: None,
        }
    }

    fn label_request(order_type: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            from_address: address("Sender"),
            to_address: address("Receiver"),
            note: None,
            label: Some(LabelDetails {
                order_type: order_type.into(),
                weight: 2.5,
                template: None,
            }),
            fedex: None,
        }
    }

    #[test]
    fn label_orders_are_priced_from_the_service_table() {
        let order = validate_order(Carrier::Usps, label_request("USPS Express"), 30.0).unwrap();
        assert_eq!(order.price, 30.0);
        assert_eq!(order.from_address.street2, None);
        assert!(matches!(order.details, OrderDetails::Label(_)));
    }

    #[test]
    fn label_orders_need_a_known_service() {
        let err = validate_order(Carrier::Dhl, label_request("USPS Express"), 30.0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid order type");

        let mut missing = label_request("DHL Express");
        missing.label = None;
        assert!(matches!(
            validate_order(Carrier::Dhl, missing, 30.0),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn blank_address_fields_are_rejected() {
        let mut request = label_request("USPS Priority");
        request.to_address.city = "   ".into();
        let err = validate_order(Carrier::Usps, request, 30.0).unwrap_err();
        assert_eq!(err.to_string(), "to_address.city is required");
    }

    #[test]
    fn fedex_orders_need_line_items_and_use_flat_rate() {
        let shipment = Shipment {
            purpose: "Gift".into(),
            currency: None,
            items: vec![ShipmentItem {
                units: 1,
                description: Some("Book".into()),
                weight: 1.0,
                value: 20.0,
                tariff: "4901".into(),
            }],
        };
        let mut request = label_request("ignored");
        request.label = None;
        request.fedex = Some(FedexOrderInput {
            signature: Some(true),
            pickup: None,
            shipment: shipment.clone(),
        });

        let order = validate_order(Carrier::FedexInternational, request.clone(), 42.5).unwrap();
        assert_eq!(order.price, 42.5);
        assert_eq!(
            order.shipment.as_ref().and_then(|s| s.currency.as_deref()),
            Some("USD")
        );

        let mut empty = request;
        if let Some(fedex) = empty.fedex.as_mut() {
            fedex.shipment.items.clear();
        }
        assert!(validate_order(Carrier::FedexDomestic, empty, 42.5).is_err());
    }

    #[test]
    fn status_vocabulary_accepts_aliases_and_rejects_others() {
        assert_eq!(parse_status("In Progress").unwrap(), OrderStatus::InProcess);
        assert!(matches!(
            parse_status("Shipped"),
            Err(AppError::InvalidStatus(s)) if s == "Shipped"
        ));
        assert_eq!(parse_status_filter(Some(" ")).unwrap(), None);
    }
}
