use actix_web::{http::StatusCode, ResponseError};
use log::error;
use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

use crate::response::response_from_error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { code: i32, msg: String },
    /// Validation failure bound to one form field.
    #[error("{field}: {msg}")]
    Field { field: String, msg: String },
    /// Missing or not visible to the requester. Never reported as forbidden.
    #[error("not found")]
    NotFound,
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Biz { code: 1, msg: msg.into() }
    }

    pub fn field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            msg: msg.into(),
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Biz { code: 2, msg: msg.into() }
    }

    pub fn need_login() -> Self {
        Self::Biz { code: 3, msg: "please login first".to_string() }
    }

    pub fn system_exception() -> Self {
        Self::Biz { code: 99, msg: "system_exception".to_string() }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Biz { code, .. } => *code,
            Self::Field { .. } => 1,
            Self::NotFound => 4,
        }
    }

    pub fn msg(&self) -> String {
        match self {
            Self::Biz { msg, .. } => msg.clone(),
            Self::Field { msg, .. } => msg.clone(),
            Self::NotFound => "not found".to_string(),
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        error!("database error: {}", err);
        AppError::system_exception()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::OK,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

pub fn map_tx_error(err: TransactionError<AppError>) -> AppError {
    match err {
        TransactionError::Connection(e) => AppError::from(e),
        TransactionError::Transaction(app) => app,
    }
}
