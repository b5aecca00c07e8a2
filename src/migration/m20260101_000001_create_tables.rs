use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityName, EntityTrait, Schema};

use crate::entity::{
    AddressBook, AuditLogs, Balances, OrderAddresses, Orders, SequenceCounters, ShipmentItems,
    Shipments, Transactions, Users, orders,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Parents before children so foreign keys resolve.
        create(manager, &schema, Users).await?;
        create(manager, &schema, AddressBook).await?;
        create(manager, &schema, SequenceCounters).await?;
        create(manager, &schema, Orders).await?;
        create(manager, &schema, OrderAddresses).await?;
        create(manager, &schema, Shipments).await?;
        create(manager, &schema, ShipmentItems).await?;
        create(manager, &schema, Balances).await?;
        create(manager, &schema, Transactions).await?;
        create(manager, &schema, AuditLogs).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_carrier_sequence")
                    .table(Orders)
                    .col(orders::Column::Carrier)
                    .col(orders::Column::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_user_created")
                    .table(Orders)
                    .col(orders::Column::UserId)
                    .col(orders::Column::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            AuditLogs.table_ref(),
            Transactions.table_ref(),
            Balances.table_ref(),
            ShipmentItems.table_ref(),
            Shipments.table_ref(),
            OrderAddresses.table_ref(),
            Orders.table_ref(),
            SequenceCounters.table_ref(),
            AddressBook.table_ref(),
            Users.table_ref(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

async fn create<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}
