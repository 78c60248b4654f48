use crate::{
    errors::HandlerError,
    models::{
        transaction::{PaymentMethod, Transaction, TransactionStatus},
        user::UserRole,
    },
    services::{settlement, transactions},
    store::MemoryStore,
    tests::{buyer, claim, farmer, seed_bid, seed_listing, trader},
};

async fn settled(store: &MemoryStore) -> Transaction {
    let listing = seed_listing(store, 100).await;
    let bid = seed_bid(store, &listing, &buyer(), 100).await;
    settlement::accept_bid_and_settle(store, &farmer(), bid.id)
        .await
        .unwrap()
}

fn admin() -> crate::models::auth::Claim {
    claim("admin_ops", UserRole::Admin)
}

#[tokio::test]
async fn test_get_transaction_visibility() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    for caller in [buyer(), farmer(), admin()] {
        let found = transactions::get_transaction(&store, &caller, transaction.id)
            .await
            .unwrap();
        assert_eq!(found, transaction);
    }

    let err = transactions::get_transaction(&store, &trader(), transaction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Forbidden(_)));

    let err = transactions::get_transaction(&store, &buyer(), ulid::Ulid::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[tokio::test]
async fn test_transactions_for_user() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    let mine = transactions::transactions_for_user(&store, &buyer())
        .await
        .unwrap();
    assert_eq!(mine, vec![transaction.clone()]);

    let sold = transactions::transactions_for_user(&store, &farmer())
        .await
        .unwrap();
    assert_eq!(sold, vec![transaction]);

    assert!(transactions::transactions_for_user(&store, &trader())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_payment_lifecycle() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    let err = transactions::record_payment(&store, &farmer(), transaction.id, PaymentMethod::Upi)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Forbidden(_)));

    let paid = transactions::record_payment(&store, &buyer(), transaction.id, PaymentMethod::Upi)
        .await
        .unwrap();
    assert_eq!(paid.status, TransactionStatus::Processing);
    assert_eq!(paid.payment_method, Some(PaymentMethod::Upi));

    let err = transactions::record_payment(&store, &buyer(), transaction.id, PaymentMethod::Neft)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidTransition(_)));

    let err = transactions::update_status(
        &store,
        &buyer(),
        transaction.id,
        TransactionStatus::Completed,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HandlerError::Forbidden(_)));

    let completed = transactions::update_status(
        &store,
        &admin(),
        transaction.id,
        TransactionStatus::Completed,
    )
    .await
    .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);

    let refunded = transactions::update_status(
        &store,
        &admin(),
        transaction.id,
        TransactionStatus::Refunded,
    )
    .await
    .unwrap();
    assert_eq!(refunded.status, TransactionStatus::Refunded);
    assert_eq!(refunded.version, transaction.version + 3);
    assert_eq!(refunded.total_amount, transaction.total_amount);
}

#[tokio::test]
async fn test_failed_payment_can_be_retried() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    transactions::record_payment(&store, &buyer(), transaction.id, PaymentMethod::Wallet)
        .await
        .unwrap();
    transactions::update_status(&store, &admin(), transaction.id, TransactionStatus::Failed)
        .await
        .unwrap();

    let err = transactions::update_status(
        &store,
        &admin(),
        transaction.id,
        TransactionStatus::Refunded,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidTransition(_)));

    let reset = transactions::update_status(
        &store,
        &admin(),
        transaction.id,
        TransactionStatus::Pending,
    )
    .await
    .unwrap();
    assert_eq!(reset.status, TransactionStatus::Pending);

    let paid = transactions::record_payment(&store, &buyer(), transaction.id, PaymentMethod::Upi)
        .await
        .unwrap();
    assert_eq!(paid.status, TransactionStatus::Processing);
    assert_eq!(paid.payment_method, Some(PaymentMethod::Upi));
}

#[tokio::test]
async fn test_pending_transaction_cannot_complete() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    let err = transactions::update_status(
        &store,
        &admin(),
        transaction.id,
        TransactionStatus::Completed,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_logistics_and_delivery() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    let err = transactions::attach_logistics(&store, &farmer(), transaction.id, " ".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidInput(_)));

    let booked =
        transactions::attach_logistics(&store, &farmer(), transaction.id, "LGX-4471".to_string())
            .await
            .unwrap();
    assert_eq!(booked.logistics_id.as_deref(), Some("LGX-4471"));

    let err = transactions::confirm_delivery(&store, &buyer(), transaction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidTransition(_)));

    transactions::record_payment(&store, &buyer(), transaction.id, PaymentMethod::Escrow)
        .await
        .unwrap();

    let err = transactions::confirm_delivery(&store, &farmer(), transaction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Forbidden(_)));

    let delivered = transactions::confirm_delivery(&store, &buyer(), transaction.id)
        .await
        .unwrap();
    assert!(delivered.delivery_confirmed);
    assert!(delivered.delivery_confirmed_at.is_some());

    let err = transactions::confirm_delivery(&store, &buyer(), transaction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_only_parties_book_logistics() {
    let store = MemoryStore::new();
    let transaction = settled(&store).await;

    for caller in [admin(), trader()] {
        let err = transactions::attach_logistics(
            &store,
            &caller,
            transaction.id,
            "LGX-9001".to_string(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HandlerError::Forbidden(_)));
    }

    let booked =
        transactions::attach_logistics(&store, &buyer(), transaction.id, "LGX-9001".to_string())
            .await
            .unwrap();
    assert_eq!(booked.logistics_id.as_deref(), Some("LGX-9001"));
}
