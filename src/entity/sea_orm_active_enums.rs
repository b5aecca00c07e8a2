use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The four shipping integrations. Each has its own order number prefix and counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "kebab-case")]
pub enum Carrier {
    #[sea_orm(string_value = "usps")]
    Usps,
    #[sea_orm(string_value = "fedex-domestic")]
    FedexDomestic,
    #[sea_orm(string_value = "fedex-international")]
    FedexInternational,
    #[sea_orm(string_value = "dhl")]
    Dhl,
}

impl Carrier {
    pub const ALL: [Carrier; 4] = [
        Carrier::FedexDomestic,
        Carrier::FedexInternational,
        Carrier::Usps,
        Carrier::Dhl,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            Carrier::Usps => "SHUSPS",
            Carrier::FedexDomestic => "SHFEDO",
            Carrier::FedexInternational => "SHFDIN",
            Carrier::Dhl => "SHDFL",
        }
    }

    pub fn counter_key(&self) -> String {
        format!("order_no:{}", self.slug())
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Carrier::Usps => "usps",
            Carrier::FedexDomestic => "fedex-domestic",
            Carrier::FedexInternational => "fedex-international",
            Carrier::Dhl => "dhl",
        }
    }

    pub fn is_fedex(&self) -> bool {
        matches!(self, Carrier::FedexDomestic | Carrier::FedexInternational)
    }

    pub fn order_number(&self, sequence: i64) -> String {
        format!("{}{}", self.prefix(), sequence)
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "In Process")]
    #[serde(rename = "In Process", alias = "In Progress")]
    InProcess,
    #[sea_orm(string_value = "Completed")]
    Completed,
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            // DHL screens used "Waiting" for orders nobody has picked up yet.
            "Pending" | "Waiting" => Ok(OrderStatus::Pending),
            "In Process" | "In Progress" => Ok(OrderStatus::InProcess),
            "Completed" => Ok(OrderStatus::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Failed")]
    Failed,
    #[sea_orm(string_value = "Unknown")]
    Unknown,
}

impl TransactionStatus {
    pub const TERMINAL: [TransactionStatus; 2] =
        [TransactionStatus::Completed, TransactionStatus::Failed];

    /// Maps the gateway's `payment_status` vocabulary onto local states.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "finished" => TransactionStatus::Completed,
            "failed" => TransactionStatus::Failed,
            "waiting" => TransactionStatus::Pending,
            _ => TransactionStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum AddressRole {
    #[sea_orm(string_value = "from")]
    From,
    #[sea_orm(string_value = "to")]
    To,
    #[sea_orm(string_value = "pickup")]
    Pickup,
}
