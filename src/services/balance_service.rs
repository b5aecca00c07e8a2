use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    dto::payments::BalanceResponse,
    entity::{
        Balances,
        balances::{ActiveModel as BalanceActive, Column as BalanceCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Adds `amount` to the user's balance in one statement, creating the row on first credit.
pub async fn credit<C: ConnectionTrait>(conn: &C, user_id: Uuid, amount: f64) -> AppResult<()> {
    if !amount.is_finite() {
        return Err(AppError::Validation("Invalid amount".into()));
    }
    let now = Utc::now().fixed_offset();

    let on_conflict = OnConflict::column(BalanceCol::UserId)
        .value(
            BalanceCol::Amount,
            Expr::col((Balances, BalanceCol::Amount)).add(amount),
        )
        .value(BalanceCol::UpdatedAt, now)
        .to_owned();

    Balances::insert(BalanceActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        amount: Set(amount),
        updated_at: Set(now),
    })
    .on_conflict(on_conflict)
    .exec_without_returning(conn)
    .await?;

    tracing::debug!(user_id = %user_id, amount, "balance credited");
    Ok(())
}

/// Current balance; a user who was never credited has zero.
pub async fn balance_of<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<f64> {
    let balance = Balances::find()
        .filter(BalanceCol::UserId.eq(user_id))
        .one(conn)
        .await?;
    Ok(balance.map(|b| b.amount).unwrap_or(0.0))
}

pub async fn get_balance(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<BalanceResponse>> {
    let balance = balance_of(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Ok",
        BalanceResponse { balance },
        Some(Meta::empty()),
    ))
}
