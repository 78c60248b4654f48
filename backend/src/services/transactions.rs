use lambda_http::tracing;
use ulid::Ulid;

use crate::{
    errors::HandlerError,
    models::{
        auth::Claim,
        transaction::{PaymentMethod, Transaction, TransactionStatus},
    },
    store::MarketStore,
    utils::now_millis,
};

/// Loads a transaction visible to the caller: its buyer, its seller or an admin.
pub async fn get_transaction(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Transaction, HandlerError> {
    let transaction = store
        .get_transaction(id)
        .await?
        .ok_or_else(|| HandlerError::not_found(format!("transaction {}", id)))?;
    if !transaction.is_party(&caller.id) && !caller.is_admin() {
        return Err(HandlerError::Forbidden(format!(
            "transaction {} belongs to other users",
            id
        )));
    }
    Ok(transaction)
}

pub async fn transactions_for_user(
    store: &dyn MarketStore,
    caller: &Claim,
) -> Result<Vec<Transaction>, HandlerError> {
    store.transactions_for_user(&caller.id).await
}

async fn save(
    store: &dyn MarketStore,
    before: &Transaction,
    after: Transaction,
) -> Result<Transaction, HandlerError> {
    store.replace_transaction(&after).await?;
    tracing::info!(
        "Transaction {}: {} -> {} (version {})",
        after.id,
        before.status,
        after.status,
        after.version
    );
    Ok(after)
}

pub async fn record_payment(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
    method: PaymentMethod,
) -> Result<Transaction, HandlerError> {
    let transaction = get_transaction(store, caller, id).await?;
    if transaction.buyer_id != caller.id {
        return Err(HandlerError::Forbidden(
            "only the buyer can pay for a transaction".to_string(),
        ));
    }
    let updated = transaction.record_payment(method, now_millis())?;
    save(store, &transaction, updated).await
}

/// Status callback from the payment processor.
pub async fn update_status(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
    status: TransactionStatus,
) -> Result<Transaction, HandlerError> {
    if !caller.is_admin() {
        return Err(HandlerError::Forbidden(
            "only the payment processor can set transaction status".to_string(),
        ));
    }
    let transaction = get_transaction(store, caller, id).await?;
    let updated = transaction.advance(status, now_millis())?;
    save(store, &transaction, updated).await
}

pub async fn attach_logistics(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
    logistics_id: String,
) -> Result<Transaction, HandlerError> {
    let transaction = get_transaction(store, caller, id).await?;
    if !transaction.is_party(&caller.id) {
        return Err(HandlerError::Forbidden(
            "only the buyer or seller can book logistics".to_string(),
        ));
    }
    let updated = transaction.attach_logistics(logistics_id, now_millis())?;
    save(store, &transaction, updated).await
}

pub async fn confirm_delivery(
    store: &dyn MarketStore,
    caller: &Claim,
    id: Ulid,
) -> Result<Transaction, HandlerError> {
    let transaction = get_transaction(store, caller, id).await?;
    if transaction.buyer_id != caller.id {
        return Err(HandlerError::Forbidden(
            "only the buyer can confirm delivery".to_string(),
        ));
    }
    let updated = transaction.confirm_delivery(now_millis())?;
    save(store, &transaction, updated).await
}
