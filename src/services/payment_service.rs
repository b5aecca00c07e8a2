use chrono::Utc;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    config::GatewayConfig,
    dto::payments::{
        CreatePaymentRequest, CreatePaymentResponse, EstimateQuery, EstimateResponse, IpnOutcome,
        TransactionList,
    },
    entity::{
        Transactions,
        sea_orm_active_enums::TransactionStatus,
        transactions::{
            ActiveModel as TransactionActive, Column as TxCol, Model as TransactionModel,
        },
    },
    error::{AppError, AppResult},
    gateway::InvoiceRequest,
    middleware::auth::{AuthUser, ensure_admin},
    models::Transaction,
    response::{ApiResponse, Meta},
    routes::params::TransactionListQuery,
    services::balance_service,
    state::AppState,
    webhook::IpnPayload,
};

/// Amount and currencies a deposit was requested with, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositInput {
    pub amount: f64,
    pub currency: String,
    pub pay_currency: String,
}

/// Checks a deposit request against the configured currency allow-lists.
/// Currency codes are compared case-insensitively and returned upper-cased.
pub fn validate_deposit(
    amount: Option<f64>,
    currency: Option<&str>,
    pay_currency: Option<&str>,
    config: &GatewayConfig,
) -> AppResult<DepositInput> {
    let amount = amount
        .filter(|a| a.is_finite() && *a > 0.0)
        .ok_or_else(|| AppError::Validation("Invalid amount".into()))?;

    let currency = currency
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| config.price_currencies.contains(c))
        .ok_or_else(|| AppError::Validation("Unsupported or missing currency".into()))?;

    let pay_currency = pay_currency
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| config.pay_currencies.contains(c))
        .ok_or_else(|| AppError::Validation("Unsupported or missing payment currency".into()))?;

    Ok(DepositInput {
        amount,
        currency,
        pay_currency,
    })
}

/// Local reference sent to the gateway as `order_id`.
pub fn order_reference(user_id: Uuid) -> String {
    format!("order_{}_{}", Utc::now().timestamp_millis(), user_id)
}

pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<CreatePaymentResponse>> {
    let gateway = &state.config.gateway;
    let input = validate_deposit(
        Some(payload.amount),
        Some(&payload.currency),
        Some(&payload.pay_currency),
        gateway,
    )?;

    let reference = order_reference(user.user_id);
    let invoice = state
        .gateway
        .create_invoice(&InvoiceRequest {
            price_amount: input.amount,
            price_currency: input.currency.clone(),
            pay_currency: input.pay_currency.clone(),
            order_id: reference.clone(),
            ipn_callback_url: gateway.ipn_callback_url.clone(),
            success_url: gateway.success_url.clone(),
            cancel_url: gateway.cancel_url.clone(),
        })
        .await
        .map_err(|err| {
            tracing::error!(user_id = %user.user_id, error = %err, "invoice creation failed");
            AppError::from(err)
        })?;

    let now = Utc::now().fixed_offset();
    let transaction = TransactionActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        payment_id: Set(invoice.id.clone()),
        order_reference: Set(reference),
        amount: Set(input.amount),
        currency: Set(input.currency),
        pay_currency: Set(input.pay_currency),
        amount_paid: Set(0.0),
        status: Set(TransactionStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        user_id = %user.user_id,
        payment_id = %transaction.payment_id,
        amount = transaction.amount,
        "payment created"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "payment_create",
        "transactions",
        json!({ "payment_id": transaction.payment_id, "amount": transaction.amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment created",
        CreatePaymentResponse {
            invoice_url: invoice.invoice_url,
            payment_id: transaction.payment_id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn estimate(
    state: &AppState,
    query: EstimateQuery,
) -> AppResult<ApiResponse<EstimateResponse>> {
    let amount = query
        .amount
        .as_deref()
        .and_then(|a| a.trim().parse::<f64>().ok());
    let input = validate_deposit(
        amount,
        query.currency.as_deref(),
        query.pay_currency.as_deref(),
        &state.config.gateway,
    )?;

    let estimated_amount = state
        .gateway
        .estimate(input.amount, &input.currency, &input.pay_currency)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, currency = %input.pay_currency, "estimate failed");
            AppError::from(err)
        })?;

    Ok(ApiResponse::success(
        "Ok",
        EstimateResponse {
            estimated_amount,
            currency: input.currency,
            pay_currency: input.pay_currency,
        },
        Some(Meta::empty()),
    ))
}

pub async fn payment_status(state: &AppState, payment_id: &str) -> AppResult<ApiResponse<Value>> {
    let payment_id = payment_id.trim();
    if payment_id.is_empty() {
        return Err(AppError::Validation("payment_id is required".into()));
    }
    let status = state
        .gateway
        .payment_status(payment_id)
        .await
        .map_err(|err| {
            tracing::error!(payment_id, error = %err, "payment status lookup failed");
            AppError::from(err)
        })?;
    Ok(ApiResponse::success("Ok", status, Some(Meta::empty())))
}

pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    query_transactions(state, Some(user.user_id), query).await
}

pub async fn admin_list_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    ensure_admin(user)?;
    let owner = query.user_id;
    query_transactions(state, owner, query).await
}

async fn query_transactions(
    state: &AppState,
    owner: Option<Uuid>,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(owner) = owner {
        condition = condition.add(TxCol::UserId.eq(owner));
    }

    let finder = Transactions::find()
        .filter(condition)
        .order_by_desc(TxCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(transaction_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        TransactionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Verifies, parses and applies one IPN delivery.
pub async fn handle_ipn(
    state: &AppState,
    raw_body: &[u8],
    signature: Option<&str>,
) -> AppResult<ApiResponse<IpnOutcome>> {
    let document = state.ipn.verify(raw_body, signature).inspect_err(|_| {
        tracing::warn!("IPN rejected: bad signature");
    })?;
    let payload = IpnPayload::try_from(&document)?;
    let outcome = reconcile(state, &payload).await?;
    Ok(ApiResponse::success(
        "IPN received successfully",
        outcome,
        Some(Meta::empty()),
    ))
}

/// Applies a notification to its transaction and credits the balance at most once.
///
/// The status write only matches rows that are not yet terminal, so a
/// redelivered `finished` notification updates nothing and credits nothing.
pub async fn reconcile(state: &AppState, payload: &IpnPayload) -> AppResult<IpnOutcome> {
    let existing = Transactions::find()
        .filter(TxCol::PaymentId.eq(payload.payment_id.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            tracing::warn!(payment_id = %payload.payment_id, "IPN for unknown transaction");
            AppError::UnknownTransaction(payload.payment_id.clone())
        })?;

    if existing.order_reference != payload.order_id {
        tracing::warn!(
            payment_id = %payload.payment_id,
            expected = %existing.order_reference,
            received = %payload.order_id,
            "IPN order reference mismatch"
        );
    }

    let status = payload.status();
    let amount_paid = payload.actually_paid.unwrap_or(existing.amount);
    let pay_currency = payload
        .pay_currency
        .clone()
        .unwrap_or_else(|| existing.pay_currency.clone());
    let terminal: Vec<String> = TransactionStatus::TERMINAL
        .iter()
        .map(|s| s.to_value())
        .collect();

    if existing.status.is_terminal() {
        return Ok(settled_outcome(existing, payload));
    }

    let txn = state.orm.begin().await?;

    let updated = Transactions::update_many()
        .col_expr(TxCol::Status, Expr::value(status.to_value()))
        .col_expr(TxCol::AmountPaid, Expr::value(amount_paid))
        .col_expr(TxCol::PayCurrency, Expr::value(pay_currency))
        .col_expr(TxCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(TxCol::Id.eq(existing.id))
        .filter(TxCol::Status.is_not_in(terminal))
        .exec(&txn)
        .await?
        .rows_affected;

    let credited = updated == 1 && status == TransactionStatus::Completed;
    if credited {
        balance_service::credit(&txn, existing.user_id, amount_paid).await?;
    }

    txn.commit().await?;

    if updated == 0 {
        let current = Transactions::find_by_id(existing.id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        return Ok(settled_outcome(current, payload));
    }

    tracing::info!(
        payment_id = %payload.payment_id,
        user_id = %existing.user_id,
        status = ?status,
        amount_paid,
        credited,
        "transaction reconciled"
    );
    if credited {
        audit::record(
            &state.orm,
            Some(existing.user_id),
            "balance_credit",
            "balances",
            json!({ "payment_id": payload.payment_id, "amount": amount_paid }),
        )
        .await;
    }

    Ok(IpnOutcome {
        payment_id: existing.payment_id,
        status,
        amount_paid,
        credited,
    })
}

/// Redelivery for a Completed/Failed transaction: reports the stored state.
fn settled_outcome(current: TransactionModel, payload: &IpnPayload) -> IpnOutcome {
    tracing::warn!(
        payment_id = %payload.payment_id,
        status = ?current.status,
        received = %payload.payment_status,
        "IPN for settled transaction ignored"
    );
    IpnOutcome {
        payment_id: current.payment_id,
        status: current.status,
        amount_paid: current.amount_paid,
        credited: false,
    }
}

pub fn transaction_from_entity(model: TransactionModel) -> Transaction {
    Transaction {
        id: model.id,
        user_id: model.user_id,
        payment_id: model.payment_id,
        order_reference: model.order_reference,
        amount: model.amount,
        currency: model.currency,
        pay_currency: model.pay_currency,
        amount_paid: model.amount_paid,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
