use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    operation::{
        get_item::GetItemError, put_item::PutItemError, query::QueryError, scan::ScanError,
        transact_write_items::TransactWriteItemsError,
    },
};
use axum::{
    http::{self, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::{PartialSchema, ToSchema};

use crate::models::listing::ListingStatus;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: u16,
    pub inner_status: Option<u16>,
    pub message: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let code =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);

        (code, body).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("DynamoDB Error: GetItem: {0}")]
    DynamoDBGetError(#[from] DynamoSdkError<GetItemError>),
    #[error("DynamoDB Error: PutItem: {0}")]
    DynamoDBPutError(#[from] DynamoSdkError<PutItemError>),
    #[error("DynamoDB Error: Query: {0}")]
    DynamoDBQueryError(#[from] DynamoSdkError<QueryError>),
    #[error("DynamoDB Error: Scan: {0}")]
    DynamoDBScanError(#[from] DynamoSdkError<ScanError>),
    #[error("DynamoDB Error: TransactWriteItems: {0}")]
    DynamoDBTransactWriteItemsError(#[from] DynamoSdkError<TransactWriteItemsError>),
    #[error("Failed to build transaction: {0}")]
    TransactionBuildError(#[from] aws_sdk_dynamodb::error::BuildError),
    #[error("JWT operation failed: {0}")]
    JWTError(#[from] jsonwebtoken::errors::Error),
    #[error("SerdeDynamo failed to process DynamoDB data: {0}")]
    SerdeDynamoError(#[from] serde_dynamo::Error),
    #[error("HTTP library error: {0}")]
    HttpError(#[from] http::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Listing {0} is not open for bidding (status: {1})")]
    ListingNotBiddable(Ulid, ListingStatus),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Concurrent update rejected: {0}")]
    ConcurrencyConflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Handler failed with status {0}: {1}")]
    HandlerError(StatusCode, String),
}

impl HandlerError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ListingNotBiddable(..)
            | Self::InvalidTransition(_)
            | Self::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::HandlerError(s, _) => *s,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HandlerError> for ErrorResponse {
    fn from(value: HandlerError) -> Self {
        Self {
            status: value.status().as_u16(),
            inner_status: match &value {
                HandlerError::DynamoDBGetError(e) => e.raw_response().map(|r| r.status().as_u16()),
                HandlerError::DynamoDBPutError(e) => e.raw_response().map(|r| r.status().as_u16()),
                HandlerError::DynamoDBQueryError(e) => {
                    e.raw_response().map(|r| r.status().as_u16())
                }
                HandlerError::DynamoDBScanError(e) => {
                    e.raw_response().map(|r| r.status().as_u16())
                }
                HandlerError::DynamoDBTransactWriteItemsError(e) => {
                    e.raw_response().map(|r| r.status().as_u16())
                }
                _ => None,
            },
            message: value.to_string(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        ErrorResponse::from(self).into_response()
    }
}

impl PartialSchema for HandlerError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl ToSchema for HandlerError {
    fn schemas(
        schemas: &mut Vec<(
            String,
            utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
        )>,
    ) {
        <ErrorResponse as ToSchema>::schemas(schemas);
    }
}
