use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

/// Why a bearer token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    NoToken,
    Expired,
    Invalid,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", unauthorized_message(.0))]
    Unauthorized(AuthFailure),

    #[error("Access denied")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Payment gateway error")]
    PaymentGateway(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid IPN data: {0}")]
    MalformedWebhook(String),

    #[error("Transaction not found")]
    UnknownTransaction(String),

    #[error("ORM error")]
    Orm(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

fn unauthorized_message(failure: &AuthFailure) -> &'static str {
    match failure {
        AuthFailure::NoToken => "No token provided",
        AuthFailure::Expired => "Token has expired. Please log in again.",
        AuthFailure::Invalid => "Invalid token",
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound | AppError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidStatus(_)
            | AppError::InvalidSignature
            | AppError::MalformedWebhook(_) => StatusCode::BAD_REQUEST,
            AppError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Orm(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(AuthFailure::NoToken) => "no_token",
            AppError::Unauthorized(AuthFailure::Expired) => "token_expired",
            AppError::Unauthorized(AuthFailure::Invalid) => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::PaymentGateway(_) => "payment_gateway_error",
            AppError::InvalidSignature => "invalid_signature",
            AppError::MalformedWebhook(_) => "malformed_webhook",
            AppError::UnknownTransaction(_) => "unknown_transaction",
            AppError::Orm(_) | AppError::Internal(_) => "server_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Orm(err) => tracing::error!(error = %err, "database failure"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal failure"),
            AppError::PaymentGateway(detail) => {
                tracing::error!(detail = %detail, "payment gateway failure")
            }
            _ => {}
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData {
                error: message,
                code: self.code(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
