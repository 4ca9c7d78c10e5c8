//! Concurrency tests for the single-writer guarantees
//!
//! Every mutation is serialized through one writer task, so concurrent
//! callers can never overdraw a wallet, double-reward a referral, or
//! create two referrals for one referee.

use uuid::Uuid;
use wallet_core::{
    Config, Error, Paise, TransactionContext, TransactionSource, WalletService,
};

async fn create_test_service() -> (WalletService, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    (WalletService::open(config).await.unwrap(), temp_dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_debits_never_overdraw() {
    let (service, _temp) = create_test_service().await;
    let user_id = Uuid::new_v4();

    service
        .wallets()
        .credit(
            user_id,
            Paise::from_rupees(100),
            TransactionContext::new(TransactionSource::AdminCredit, "Opening balance"),
        )
        .await
        .unwrap();

    // Ten tasks race to debit ₹30 from a ₹100 balance
    let mut handles = Vec::new();
    for _ in 0..10 {
        let wallets = service.wallets();
        handles.push(tokio::spawn(async move {
            wallets
                .debit(
                    user_id,
                    Paise::from_rupees(30),
                    TransactionContext::new(TransactionSource::Purchase, "Racing debit"),
                )
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok((wallet, _)) => {
                assert!(!wallet.balance.is_negative());
                successes += 1;
            }
            Err(Error::InsufficientBalance(_)) => {}
            Err(other) => panic!("Unexpected error: {}", other),
        }
    }

    // Only three ₹30 debits fit into ₹100
    assert_eq!(successes, 3);

    let wallet = service.wallets().get(user_id).unwrap().unwrap();
    assert_eq!(wallet.balance, Paise::from_rupees(10));
    assert_eq!(
        service.ledger().replayed_balance(user_id).unwrap(),
        wallet.balance
    );

    service.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completes_reward_once() {
    let (service, _temp) = create_test_service().await;

    let referrer = Uuid::new_v4();
    let referral = service
        .referrals()
        .create(referrer, Uuid::new_v4(), "FRIEND1")
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let referrals = service.referrals();
        let referral_id = referral.referral_id;
        handles.push(tokio::spawn(async move {
            referrals.complete(referral_id, referrer).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(Error::InvalidState(_)) => {}
            Err(other) => panic!("Unexpected error: {}", other),
        }
    }

    // Exactly one caller observed Pending and proceeded
    assert_eq!(successes, 1);

    let wallet = service.wallets().get(referrer).unwrap().unwrap();
    assert_eq!(wallet.balance, Paise::from_rupees(500));

    let (_, total) = service
        .ledger()
        .query(referrer, Default::default(), 1, 100)
        .unwrap();
    assert_eq!(total, 1);

    service.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_keep_referee_unique() {
    let (service, _temp) = create_test_service().await;
    let referee = Uuid::new_v4();

    let mut handles = Vec::new();
    for i in 0..10 {
        let referrals = service.referrals();
        handles.push(tokio::spawn(async move {
            referrals
                .create(Uuid::new_v4(), referee, format!("CODE{}", i))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(Error::Validation(_)) => {}
            Err(other) => panic!("Unexpected error: {}", other),
        }
    }

    assert_eq!(successes, 1);

    service.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_or_create_yields_one_wallet() {
    let (service, _temp) = create_test_service().await;
    let user_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let wallets = service.wallets();
        handles.push(tokio::spawn(
            async move { wallets.get_or_create(user_id).await },
        ));
    }

    let mut wallet_ids = Vec::new();
    for handle in handles {
        wallet_ids.push(handle.await.unwrap().unwrap().wallet_id);
    }

    wallet_ids.dedup();
    assert_eq!(wallet_ids.len(), 1);

    service.shutdown().await.unwrap();
}
