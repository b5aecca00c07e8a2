pub mod address_service;
pub mod admin_service;
pub mod auth_service;
pub mod balance_service;
pub mod counter_service;
pub mod earnings_service;
pub mod order_service;
pub mod payment_service;
