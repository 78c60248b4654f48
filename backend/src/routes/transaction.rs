use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    Extension,
};
use ulid::Ulid;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    errors::HandlerError,
    models::{
        auth::Claim,
        transaction::{
            AttachLogisticsRequest, RecordPaymentRequest, Transaction,
            UpdateTransactionStatusRequest,
        },
    },
    services::transactions,
    state::AppState,
};

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(get_own_transactions))
        .routes(routes!(get_transaction))
        .routes(routes!(buyer_record_payment))
        .routes(routes!(processor_update_status))
        .routes(routes!(attach_logistics))
        .routes(routes!(buyer_confirm_delivery))
}

/// Get transactions where the caller is buyer or seller.
#[utoipa::path(
    get,
    path = "/v1/transaction",
    tag = "Transaction",
    responses(
        (status = OK, description = "Caller's transactions, newest first", body = Vec<Transaction>),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn get_own_transactions(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Transaction>>, HandlerError> {
    Ok(Json(
        transactions::transactions_for_user(state.store.as_ref(), &claim).await?,
    ))
}

/// Get a transaction by transactionId.
#[utoipa::path(
    get,
    path = "/v1/transaction/{transactionId}",
    tag = "Transaction",
    params(
        ("transactionId" = String, Path, description = "Transaction ID to get", format = Ulid),
    ),
    responses(
        (status = OK, description = "Returns specified transaction", body = Transaction),
        (status = FORBIDDEN, description = "Not a party to the transaction", body = HandlerError),
        (status = NOT_FOUND, description = "Transaction not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn get_transaction(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Ulid>,
) -> Result<Json<Transaction>, HandlerError> {
    Ok(Json(
        transactions::get_transaction(state.store.as_ref(), &claim, transaction_id).await?,
    ))
}

/// Record the buyer's payment.
#[utoipa::path(
    post,
    path = "/v1/transaction/{transactionId}/payment",
    tag = "Transaction",
    params(
        ("transactionId" = String, Path, description = "Transaction ID to pay", format = Ulid),
    ),
    request_body = RecordPaymentRequest,
    responses(
        (status = OK, description = "Payment recorded", body = Transaction),
        (status = FORBIDDEN, description = "Not the buyer", body = HandlerError),
        (status = NOT_FOUND, description = "Transaction not found", body = HandlerError),
        (status = CONFLICT, description = "Transaction is not pending", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn buyer_record_payment(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Ulid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Json<Transaction>, HandlerError> {
    Ok(Json(
        transactions::record_payment(state.store.as_ref(), &claim, transaction_id, payload.method)
            .await?,
    ))
}

/// Payment processor status callback.
#[utoipa::path(
    post,
    path = "/v1/transaction/{transactionId}/status",
    tag = "Transaction",
    params(
        ("transactionId" = String, Path, description = "Transaction ID to update", format = Ulid),
    ),
    request_body = UpdateTransactionStatusRequest,
    responses(
        (status = OK, description = "Status updated", body = Transaction),
        (status = FORBIDDEN, description = "Not the payment processor", body = HandlerError),
        (status = NOT_FOUND, description = "Transaction not found", body = HandlerError),
        (status = CONFLICT, description = "Transition not allowed", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn processor_update_status(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Ulid>,
    Json(payload): Json<UpdateTransactionStatusRequest>,
) -> Result<Json<Transaction>, HandlerError> {
    Ok(Json(
        transactions::update_status(state.store.as_ref(), &claim, transaction_id, payload.status)
            .await?,
    ))
}

/// Link a logistics booking to a transaction.
#[utoipa::path(
    post,
    path = "/v1/transaction/{transactionId}/logistics",
    tag = "Transaction",
    params(
        ("transactionId" = String, Path, description = "Transaction ID", format = Ulid),
    ),
    request_body = AttachLogisticsRequest,
    responses(
        (status = OK, description = "Logistics booking linked", body = Transaction),
        (status = BAD_REQUEST, description = "Empty logistics id", body = HandlerError),
        (status = FORBIDDEN, description = "Not a party to the transaction", body = HandlerError),
        (status = NOT_FOUND, description = "Transaction not found", body = HandlerError),
        (status = CONFLICT, description = "Transaction failed or refunded", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn attach_logistics(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Ulid>,
    Json(payload): Json<AttachLogisticsRequest>,
) -> Result<Json<Transaction>, HandlerError> {
    Ok(Json(
        transactions::attach_logistics(
            state.store.as_ref(),
            &claim,
            transaction_id,
            payload.logistics_id,
        )
        .await?,
    ))
}

/// Confirm the produce was delivered.
#[utoipa::path(
    post,
    path = "/v1/transaction/{transactionId}/delivery",
    tag = "Transaction",
    params(
        ("transactionId" = String, Path, description = "Transaction ID", format = Ulid),
    ),
    responses(
        (status = OK, description = "Delivery confirmed", body = Transaction),
        (status = FORBIDDEN, description = "Not the buyer", body = HandlerError),
        (status = NOT_FOUND, description = "Transaction not found", body = HandlerError),
        (status = CONFLICT, description = "Not paid yet or already confirmed", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
    security(
        ("http-jwt" = []),
    ),
)]
async fn buyer_confirm_delivery(
    Extension(claim): Extension<Claim>,
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Ulid>,
) -> Result<Json<Transaction>, HandlerError> {
    Ok(Json(
        transactions::confirm_delivery(state.store.as_ref(), &claim, transaction_id).await?,
    ))
}
