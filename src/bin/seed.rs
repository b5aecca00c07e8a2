use std::env;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use shipping_orders_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{Users, sea_orm_active_enums::Role, users::Column as UserCol},
    services::auth_service::{NewAccount, create_account},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_account(
        &orm,
        NewAccount {
            name: "Administrator".into(),
            username: env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            email: env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into()),
            password: env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into()),
        },
        Role::Admin,
    )
    .await?;
    let user_id = ensure_account(
        &orm,
        NewAccount {
            name: "Demo User".into(),
            username: "demo".into(),
            email: "user@example.com".into(),
            password: "user123".into(),
        },
        Role::User,
    )
    .await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_account(
    orm: &sea_orm::DatabaseConnection,
    account: NewAccount,
    role: Role,
) -> anyhow::Result<Uuid> {
    let existing = Users::find()
        .filter(UserCol::Username.eq(account.username.as_str()))
        .one(orm)
        .await?;
    if let Some(user) = existing {
        println!("Account {} already present", user.username);
        return Ok(user.id);
    }

    let username = account.username.clone();
    let user = create_account(orm, account, role)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    println!("Created {username} (role={})", role.as_str());
    Ok(user.id)
}
