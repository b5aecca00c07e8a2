use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::sea_orm_active_enums::Carrier, models::User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAdminRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarrierCount {
    pub carrier: Carrier,
    pub orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserOverview {
    pub user: User,
    pub balance: f64,
    pub order_counts: Vec<CarrierCount>,
    pub total_orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<UserOverview>,
}

#[derive(Debug, Default, Clone, Copy, Serialize, ToSchema)]
pub struct EarningsWindow {
    pub daily: f64,
    pub monthly: f64,
    pub yearly: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarrierEarnings {
    pub carrier: Carrier,
    pub earnings: EarningsWindow,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EarningsReport {
    pub carriers: Vec<CarrierEarnings>,
    pub total: EarningsWindow,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EarningsQuery {
    pub carrier: Option<Carrier>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProfile {
    pub id: Uuid,
    pub name: String,
}
