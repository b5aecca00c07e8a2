use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, sea_query::Expr,
};

use crate::{
    dto::admin::{CarrierEarnings, EarningsQuery, EarningsReport, EarningsWindow},
    entity::{Orders, orders::Column as OrderCol, sea_orm_active_enums::Carrier},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Half-open UTC range `[start, end)`.
pub type Range = (DateTime<Utc>, DateTime<Utc>);

/// Today, this month and this year as seen from `now`.
pub fn windows(now: DateTime<Utc>) -> AppResult<[Range; 3]> {
    let today = now.date_naive();
    let (year, month) = (today.year(), today.month());
    let (next_month_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let day_start = today;
    let day_end = today
        .succ_opt()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("date overflow")))?;

    Ok([
        (midnight(day_start)?, midnight(day_end)?),
        (ymd(year, month, 1)?, ymd(next_month_year, next_month, 1)?),
        (ymd(year, 1, 1)?, ymd(year + 1, 1, 1)?),
    ])
}

fn ymd(year: i32, month: u32, day: u32) -> AppResult<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid date {year}-{month}-{day}")))?;
    midnight(date)
}

fn midnight(date: NaiveDate) -> AppResult<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid midnight for {date}")))
}

/// Sums order prices per carrier inside `range`.
async fn sum_by_carrier<C: ConnectionTrait>(
    conn: &C,
    (start, end): Range,
    carrier: Option<Carrier>,
) -> AppResult<HashMap<Carrier, f64>> {
    let mut select = Orders::find()
        .select_only()
        .column(OrderCol::Carrier)
        .column_as(Expr::col(OrderCol::Price).sum(), "total")
        .filter(OrderCol::CreatedAt.gte(start.fixed_offset()))
        .filter(OrderCol::CreatedAt.lt(end.fixed_offset()))
        .group_by(OrderCol::Carrier);
    if let Some(carrier) = carrier {
        select = select.filter(OrderCol::Carrier.eq(carrier));
    }

    let rows = select
        .into_tuple::<(Carrier, Option<f64>)>()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(carrier, total)| (carrier, total.unwrap_or(0.0)))
        .collect())
}

pub async fn earnings(
    state: &AppState,
    user: &AuthUser,
    query: EarningsQuery,
) -> AppResult<ApiResponse<EarningsReport>> {
    ensure_admin(user)?;
    let report = earnings_at(&state.orm, Utc::now(), query.carrier).await?;
    Ok(ApiResponse::success("Ok", report, Some(Meta::empty())))
}

pub async fn earnings_at<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
    only: Option<Carrier>,
) -> AppResult<EarningsReport> {
    let [day, month, year] = windows(now)?;
    let daily = sum_by_carrier(conn, day, only).await?;
    let monthly = sum_by_carrier(conn, month, only).await?;
    let yearly = sum_by_carrier(conn, year, only).await?;

    let carriers: Vec<Carrier> = match only {
        Some(carrier) => vec![carrier],
        None => Carrier::ALL.to_vec(),
    };

    let mut total = EarningsWindow::default();
    let carriers = carriers
        .into_iter()
        .map(|carrier| {
            let earnings = EarningsWindow {
                daily: daily.get(&carrier).copied().unwrap_or(0.0),
                monthly: monthly.get(&carrier).copied().unwrap_or(0.0),
                yearly: yearly.get(&carrier).copied().unwrap_or(0.0),
            };
            total.daily += earnings.daily;
            total.monthly += earnings.monthly;
            total.yearly += earnings.yearly;
            CarrierEarnings { carrier, earnings }
        })
        .collect();

    Ok(EarningsReport { carriers, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn windows_cover_day_month_and_year() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 18, 30, 0).unwrap();
        let [day, month, year] = windows(now).unwrap();
        assert_eq!(day.0, Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap());
        assert_eq!(day.1, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(month.0, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(month.1, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(year.0, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(year.1, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn february_month_window_ends_on_march_first() {
        let now = Utc.with_ymd_and_hms(2028, 2, 29, 1, 0, 0).unwrap();
        let [_, month, _] = windows(now).unwrap();
        assert_eq!(month.1, Utc.with_ymd_and_hms(2028, 3, 1, 0, 0, 0).unwrap());
    }
}
