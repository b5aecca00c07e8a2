use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::Carrier,
    models::{LabelDetails, Order, PickupWindow, PostalAddress, Shipment},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub from_address: PostalAddress,
    pub to_address: PostalAddress,
    pub note: Option<String>,
    /// Required for USPS and DHL.
    pub label: Option<LabelDetails>,
    /// Required for both FedEx variants.
    pub fedex: Option<FedexOrderInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FedexOrderInput {
    pub signature: Option<bool>,
    pub pickup: Option<PickupInput>,
    pub shipment: Shipment,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PickupInput {
    pub address: PostalAddress,
    #[serde(flatten)]
    pub window: PickupWindow,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTrackingRequest {
    pub tracking: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingUpdated {
    pub id: Uuid,
    pub carrier: Carrier,
    pub order_number: String,
    pub tracking: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub order_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub carrier: Carrier,
    pub price: f64,
    pub services: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderRef {
    pub id: Uuid,
    pub carrier: Carrier,
    pub order_number: String,
}
