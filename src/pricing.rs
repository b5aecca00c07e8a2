use crate::{
    entity::sea_orm_active_enums::Carrier,
    error::{AppError, AppResult},
};

const USPS_RATES: [(&str, f64); 5] = [
    ("USPS Ground OZ", 10.0),
    ("USPS Ground lb", 15.0),
    ("USPS Priority", 20.0),
    ("USPS Express", 30.0),
    ("USPS Priority v2", 25.0),
];

const DHL_RATES: [(&str, f64); 5] = [
    ("DHL Ground OZ", 10.0),
    ("DHL Ground lb", 15.0),
    ("DHL Priority", 20.0),
    ("DHL Express", 30.0),
    ("DHL Priority v2", 25.0),
];

/// Price for a label service. FedEx orders ignore `order_type` and use the flat rate.
pub fn quote(carrier: Carrier, order_type: Option<&str>, fedex_flat_rate: f64) -> AppResult<f64> {
    let table: &[(&str, f64)] = match carrier {
        Carrier::FedexDomestic | Carrier::FedexInternational => return Ok(fedex_flat_rate),
        Carrier::Usps => &USPS_RATES,
        Carrier::Dhl => &DHL_RATES,
    };
    let order_type = order_type.map(str::trim).unwrap_or_default();
    table
        .iter()
        .find(|(name, _)| *name == order_type)
        .map(|(_, price)| *price)
        .ok_or_else(|| AppError::Validation("Invalid order type".into()))
}

/// Service names offered for a carrier, in display order.
pub fn services(carrier: Carrier) -> Vec<&'static str> {
    match carrier {
        Carrier::Usps => USPS_RATES.iter().map(|(name, _)| *name).collect(),
        Carrier::Dhl => DHL_RATES.iter().map(|(name, _)| *name).collect(),
        Carrier::FedexDomestic | Carrier::FedexInternational => Vec::new(),
    }
}

/// Lenient parser for prices written as currency strings, e.g. `"$1,250.50"`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("US").unwrap_or(trimmed);
    let cleaned: String = trimmed
        .trim_start_matches(['$', ' '])
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
