use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    dto::addresses::{AddressList, AddressRequest},
    entity::{
        AddressBook,
        addresses::{ActiveModel as AddressActive, Column as AddressCol, Model as AddressModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Trimmed copy of the request with the required fields checked.
fn clean(payload: AddressRequest) -> AppResult<AddressRequest> {
    fn required(field: &str, value: String) -> AppResult<String> {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
        Ok(value)
    }
    fn optional(value: Option<String>) -> Option<String> {
        value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    Ok(AddressRequest {
        name: required("name", payload.name)?,
        company_name: optional(payload.company_name),
        street1: required("street1", payload.street1)?,
        street2: optional(payload.street2),
        city: required("city", payload.city)?,
        state: required("state", payload.state)?,
        zip: required("zip", payload.zip)?,
        country: required("country", payload.country)?,
        phone: optional(payload.phone),
    })
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let payload = clean(payload)?;
    let now = Utc::now().fixed_offset();

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        name: Set(payload.name),
        company_name: Set(payload.company_name),
        street1: Set(payload.street1),
        street2: Set(payload.street2),
        city: Set(payload.city),
        state: Set(payload.state),
        zip: Set(payload.zip),
        country: Set(payload.country),
        phone: Set(payload.phone),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Address saved",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items: Vec<Address> = AddressBook::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Ok", AddressList { items }, Some(meta)))
}

pub async fn get_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let address = find_owned(state, user, id).await?;
    Ok(ApiResponse::success(
        "Ok",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let payload = clean(payload)?;
    let address = find_owned(state, user, id).await?;

    let mut active: AddressActive = address.into();
    active.name = Set(payload.name);
    active.company_name = Set(payload.company_name);
    active.street1 = Set(payload.street1);
    active.street2 = Set(payload.street2);
    active.city = Set(payload.city);
    active.state = Set(payload.state);
    active.zip = Set(payload.zip);
    active.country = Set(payload.country);
    active.phone = Set(payload.phone);
    active.updated_at = Set(Utc::now().fixed_offset());
    let address = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Address updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let address = find_owned(state, user, id).await?;
    AddressBook::delete_by_id(address.id)
        .exec(&state.orm)
        .await?;
    Ok(ApiResponse::success(
        "Address deleted",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<AddressModel> {
    AddressBook::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        name: model.name,
        company_name: model.company_name,
        street1: model.street1,
        street2: model.street2,
        city: model.city,
        state: model.state,
        zip: model.zip,
        country: model.country,
        phone: model.phone,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
