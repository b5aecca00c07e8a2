use sea_orm::{
    ConnectionTrait, EntityTrait, Set,
    sea_query::{Expr, OnConflict},
};

use crate::{
    entity::{
        SequenceCounters,
        sea_orm_active_enums::Carrier,
        sequence_counters::{ActiveModel as CounterActive, Column as CounterCol},
    },
    error::{AppError, AppResult},
};

/// First number handed out by a fresh counter.
pub const FIRST_SEQUENCE: i64 = 1000;

/// Increments the named counter and returns the new value.
///
/// The increment is a single upsert, so concurrent callers never observe the
/// same value. Run it inside the transaction that consumes the number to keep
/// the sequence free of gaps on rollback.
pub async fn next_value<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<i64> {
    let on_conflict = OnConflict::column(CounterCol::Name)
        .value(
            CounterCol::Seq,
            Expr::col((SequenceCounters, CounterCol::Seq)).add(1),
        )
        .to_owned();

    SequenceCounters::insert(CounterActive {
        name: Set(name.to_string()),
        seq: Set(FIRST_SEQUENCE),
    })
    .on_conflict(on_conflict)
    .exec_without_returning(conn)
    .await?;

    SequenceCounters::find_by_id(name.to_string())
        .one(conn)
        .await?
        .map(|row| row.seq)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("counter {name} vanished")))
}

pub async fn next_order_sequence<C: ConnectionTrait>(conn: &C, carrier: Carrier) -> AppResult<i64> {
    next_value(conn, &carrier.counter_key()).await
}
