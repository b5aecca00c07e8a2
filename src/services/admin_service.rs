use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Expr,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{AdminProfile, CarrierCount, UserList, UserOverview},
        payments::{AddBalanceRequest, BalanceResponse},
    },
    entity::{
        Balances, Orders, Users,
        balances::Column as BalanceCol,
        orders::Column as OrderCol,
        sea_orm_active_enums::{Carrier, Role},
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{auth_service::user_from_entity, balance_service},
    state::AppState,
};

pub async fn admin_details(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminProfile>> {
    ensure_admin(user)?;
    let admin = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Ok",
        AdminProfile {
            id: admin.id,
            name: admin.name,
        },
        Some(Meta::empty()),
    ))
}

/// Customer accounts with their balance and order counts per carrier.
pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find()
        .filter(UserCol::Role.eq(Role::User))
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let users = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();

    let mut counts: HashMap<(Uuid, Carrier), i64> = HashMap::new();
    let mut balances: HashMap<Uuid, f64> = HashMap::new();
    if !ids.is_empty() {
        let rows = Orders::find()
            .select_only()
            .column(OrderCol::UserId)
            .column(OrderCol::Carrier)
            .column_as(Expr::col(OrderCol::Id).count(), "orders")
            .filter(OrderCol::UserId.is_in(ids.clone()))
            .group_by(OrderCol::UserId)
            .group_by(OrderCol::Carrier)
            .into_tuple::<(Uuid, Carrier, i64)>()
            .all(&state.orm)
            .await?;
        for (user_id, carrier, n) in rows {
            counts.insert((user_id, carrier), n);
        }

        for balance in Balances::find()
            .filter(BalanceCol::UserId.is_in(ids))
            .all(&state.orm)
            .await?
        {
            balances.insert(balance.user_id, balance.amount);
        }
    }

    let items = users
        .into_iter()
        .map(|model| {
            let order_counts: Vec<CarrierCount> = Carrier::ALL
                .iter()
                .map(|carrier| CarrierCount {
                    carrier: *carrier,
                    orders: counts.get(&(model.id, *carrier)).copied().unwrap_or(0),
                })
                .collect();
            let total_orders = order_counts.iter().map(|c| c.orders).sum();
            UserOverview {
                balance: balances.get(&model.id).copied().unwrap_or(0.0),
                user: user_from_entity(model),
                order_counts,
                total_orders,
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Manual credit through the same atomic primitive the IPN flow uses.
pub async fn add_balance(
    state: &AppState,
    user: &AuthUser,
    payload: AddBalanceRequest,
) -> AppResult<ApiResponse<BalanceResponse>> {
    ensure_admin(user)?;
    if !(payload.amount.is_finite() && payload.amount > 0.0) {
        return Err(AppError::Validation("Invalid amount".into()));
    }
    Users::find_by_id(payload.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    balance_service::credit(&state.orm, payload.user_id, payload.amount).await?;
    let balance = balance_service::balance_of(&state.orm, payload.user_id).await?;

    tracing::info!(
        user_id = %payload.user_id,
        admin_id = %user.user_id,
        amount = payload.amount,
        "manual balance credit"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "balance_manual_credit",
        "balances",
        json!({ "user_id": payload.user_id, "amount": payload.amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Balance updated",
        BalanceResponse { balance },
        Some(Meta::empty()),
    ))
}
