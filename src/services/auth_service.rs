use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::AddAdminRequest,
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
            SignupRequest, UpdatePasswordRequest,
        },
    },
    entity::{
        Users,
        sea_orm_active_enums::Role,
        users::{ActiveModel as UserActive, Column as UserCol, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const RESET_TOKEN_TTL_MINUTES: i64 = 10;
const FORGOT_PASSWORD_MESSAGE: &str = "If that email is registered, a reset link has been sent";

pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<ApiResponse<User>> {
    let user = create_account(
        &state.orm,
        NewAccount {
            name: payload.name,
            username: payload.username,
            email: payload.email,
            password: payload.password,
        },
        Role::User,
    )
    .await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_signup",
        "users",
        json!({ "user_id": user.id }),
    )
    .await;
    Ok(ApiResponse::success(
        "User registered successfully",
        user_from_entity(user),
        Some(Meta::empty()),
    ))
}

pub async fn add_admin(
    state: &AppState,
    caller: &AuthUser,
    payload: AddAdminRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(caller)?;
    let admin = create_account(
        &state.orm,
        NewAccount {
            name: payload.name,
            username: payload.username,
            email: payload.email,
            password: payload.password,
        },
        Role::Admin,
    )
    .await?;

    tracing::info!(user_id = %caller.user_id, admin_id = %admin.id, "admin created");
    audit::record(
        &state.orm,
        Some(caller.user_id),
        "admin_create",
        "users",
        json!({ "admin_id": admin.id }),
    )
    .await;
    Ok(ApiResponse::success(
        "Admin created successfully",
        user_from_entity(admin),
        Some(Meta::empty()),
    ))
}

pub async fn login(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let invalid = || AppError::Validation("Invalid username or password".into());

    let user = Users::find()
        .filter(UserCol::Username.eq(payload.username.trim()))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&user.password_hash, &payload.password)? {
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id, user.role)?;

    tracing::info!(user_id = %user.id, "user logged in");
    audit::record(
        &state.orm,
        Some(user.id),
        "user_login",
        "users",
        json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in successfully",
        LoginResponse {
            token,
            user: user_from_entity(user),
        },
        Some(Meta::empty()),
    ))
}

pub async fn profile(state: &AppState, caller: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(caller.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Ok", user_from_entity(user), Some(Meta::empty())))
}

pub async fn update_password(
    state: &AppState,
    caller: &AuthUser,
    payload: UpdatePasswordRequest,
) -> AppResult<ApiResponse<User>> {
    check_new_password(&payload.new_password, &payload.confirm_password)?;

    let user = Users::find_by_id(caller.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !verify_password(&user.password_hash, &payload.old_password)? {
        return Err(AppError::Validation("Incorrect old password".into()));
    }

    let now = Utc::now().fixed_offset();
    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.password_changed_at = Set(Some(now));
    active.updated_at = Set(now);
    let user = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "password_update",
        "users",
        json!({ "user_id": user.id }),
    )
    .await;
    Ok(ApiResponse::success(
        "Password changed successfully",
        user_from_entity(user),
        Some(Meta::empty()),
    ))
}

/// Stores a hashed one-time token and logs the reset link.
/// Answers identically whether or not the address is registered.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<()>> {
    let email = payload.email.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }

    let Some(user) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
    else {
        return Ok(ApiResponse::message(FORGOT_PASSWORD_MESSAGE));
    };

    let token = new_reset_token();
    let now = Utc::now();
    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_reset_token = Set(Some(digest_token(&token)));
    active.password_reset_expires =
        Set(Some((now + Duration::minutes(RESET_TOKEN_TTL_MINUTES)).fixed_offset()));
    active.updated_at = Set(now.fixed_offset());
    active.update(&state.orm).await?;

    let link = format!(
        "{}/reset-password/{token}",
        state.config.frontend_url.trim_end_matches('/')
    );
    // Mail delivery lives outside this service; operators pick the link up from the log.
    tracing::info!(user_id = %user_id, link = %link, "password reset requested");

    Ok(ApiResponse::message(FORGOT_PASSWORD_MESSAGE))
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<()>> {
    check_new_password(&payload.password, &payload.confirm_password)?;

    let now = Utc::now().fixed_offset();
    let user = Users::find()
        .filter(
            Condition::all()
                .add(UserCol::PasswordResetToken.eq(digest_token(token.trim())))
                .add(UserCol::PasswordResetExpires.gt(now)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Validation("Token is invalid or has expired".into()))?;

    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.password_reset_token = Set(None);
    active.password_reset_expires = Set(None);
    active.password_changed_at = Set(Some(now));
    active.updated_at = Set(now);
    let user = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.id),
        "password_reset",
        "users",
        json!({ "user_id": user.id }),
    )
    .await;
    Ok(ApiResponse::message("Password has been reset"))
}

pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Validates and inserts an account with the given role.
pub async fn create_account<C: ConnectionTrait>(
    conn: &C,
    account: NewAccount,
    role: Role,
) -> AppResult<UserModel> {
    let name = account.name.trim().to_string();
    let username = account.username.trim().to_string();
    let email = account.email.trim().to_ascii_lowercase();
    if name.is_empty() || username.is_empty() || email.is_empty() || account.password.is_empty() {
        return Err(AppError::Validation("Please fill in all fields".into()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email".into()));
    }

    let exists = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Username.eq(username.as_str()))
                .add(UserCol::Email.eq(email.as_str())),
        )
        .one(conn)
        .await?;
    if exists.is_some() {
        return Err(AppError::Validation("User already exists".into()));
    }

    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        username: Set(username),
        email: Set(email),
        password_hash: Set(hash_password(&account.password)?),
        role: Set(role),
        password_reset_token: Set(None),
        password_reset_expires: Set(None),
        password_changed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    Ok(user)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn check_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::Validation("New password is required".into()));
    }
    if password != confirm {
        return Err(AppError::Validation("New passwords do not match".into()));
    }
    Ok(())
}

fn new_reset_token() -> String {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only the SHA-256 of a reset token is persisted.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        name: model.name,
        username: model.username,
        email: model.email,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
