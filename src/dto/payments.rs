use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::sea_orm_active_enums::TransactionStatus, models::Transaction};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub amount: f64,
    pub currency: String,
    pub pay_currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePaymentResponse {
    pub invoice_url: String,
    pub payment_id: String,
}

/// Query strings arrive untyped so that bad numbers surface as validation errors.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EstimateQuery {
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub pay_currency: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EstimateResponse {
    pub estimated_amount: f64,
    pub currency: String,
    pub pay_currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub balance: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionList {
    pub items: Vec<Transaction>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddBalanceRequest {
    pub user_id: Uuid,
    pub amount: f64,
}

/// What a processed IPN did; returned with 200 even when nothing changed.
#[derive(Debug, Serialize, ToSchema)]
pub struct IpnOutcome {
    pub payment_id: String,
    pub status: TransactionStatus,
    pub amount_paid: f64,
    pub credited: bool,
}
