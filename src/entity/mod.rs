pub mod addresses;
pub mod audit_logs;
pub mod balances;
pub mod order_addresses;
pub mod orders;
pub mod sea_orm_active_enums;
pub mod sequence_counters;
pub mod shipment_items;
pub mod shipments;
pub mod transactions;
pub mod users;

pub use addresses::Entity as AddressBook;
pub use audit_logs::Entity as AuditLogs;
pub use balances::Entity as Balances;
pub use order_addresses::Entity as OrderAddresses;
pub use orders::Entity as Orders;
pub use sequence_counters::Entity as SequenceCounters;
pub use shipment_items::Entity as ShipmentItems;
pub use shipments::Entity as Shipments;
pub use transactions::Entity as Transactions;
pub use users::Entity as Users;
