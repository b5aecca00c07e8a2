use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::{Carrier, OrderStatus, Role, TransactionStatus};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub company_name: Option<String>,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Address as captured on an order, also the shape accepted when creating one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostalAddress {
    pub name: String,
    pub company_name: Option<String>,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentItem {
    pub units: i32,
    pub description: Option<String>,
    pub weight: f64,
    pub value: f64,
    pub tariff: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    pub purpose: String,
    pub currency: Option<String>,
    pub items: Vec<ShipmentItem>,
}

/// Label based services (USPS, DHL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabelDetails {
    pub order_type: String,
    pub weight: f64,
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PickupWindow {
    pub date: NaiveDate,
    pub from_time: String,
    pub to_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FedexDetails {
    pub signature: bool,
    pub pickup: Option<PickupWindow>,
}

/// Carrier specific part of an order, persisted as JSON on the order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderDetails {
    Label(LabelDetails),
    Fedex(FedexDetails),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub carrier: Carrier,
    pub order_number: String,
    pub status: OrderStatus,
    pub price: f64,
    pub tracking: String,
    pub note: Option<String>,
    pub details: OrderDetails,
    pub from_address: PostalAddress,
    pub to_address: PostalAddress,
    pub pickup_address: Option<PostalAddress>,
    pub shipment: Option<Shipment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_id: String,
    pub order_reference: String,
    pub amount: f64,
    pub currency: String,
    pub pay_currency: String,
    pub amount_paid: f64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
