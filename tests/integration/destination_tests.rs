use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tgwatch::db::destinations::DestinationRepo;
use tgwatch::db::forwarded_messages::ForwardedMessageRepo;
use tgwatch::db::models::ForwardOutcome;
use tgwatch::db::organizations::OrganizationRepo;
use tgwatch::db::users::UserRepo;
use tgwatch::forwarding::{Deliverer, DeliveryError, ForwardRequest, ForwardingEngine, RateLimit};

use crate::test_utils::{create_destination, create_tenant};
use crate::TestDatabase;

struct CountingDeliverer {
    calls: AtomicUsize,
}

#[async_trait]
impl Deliverer for CountingDeliverer {
    async fn deliver(&self, _destination_chat_id: &str, _text: &str) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct AlwaysPermanentFailureDeliverer;

#[async_trait]
impl Deliverer for AlwaysPermanentFailureDeliverer {
    async fn deliver(&self, _destination_chat_id: &str, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Permanent("chat not found".into()))
    }
}

fn request(tenant_id: i32, destination_id: i32, source_ref: i32) -> ForwardRequest {
    ForwardRequest {
        tenant_id,
        source_message_ref: source_ref,
        username: Some("alice".into()),
        group_name: "Acme Chat".into(),
        destination_id,
        message_text: Some("hi".into()),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn delivered_forward_is_recorded_and_bumps_destination_counters() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let destinations = DestinationRepo::new(db.pool.clone());
    let ledger = ForwardedMessageRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 5001).await.expect("tenant");
    let dest = create_destination(&destinations, tenant.id, "-100900", "Archive").await.expect("dest");

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let deliverer = Arc::new(CountingDeliverer { calls: AtomicUsize::new(0) });
    let engine = ForwardingEngine::new(
        destinations.clone(),
        ledger.clone(),
        tgwatch::forwarding::DestinationRateLimiter::new(RateLimit { per_minute: 1000.0, burst: 1000.0 }),
        deliverer,
        shutdown_rx,
    );

    engine.enqueue(request(tenant.id, dest.id, 1)).await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let recorded = ledger.list(tenant.id, None, Some(dest.id), 10, 0).await.expect("list ledger");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].outcome, ForwardOutcome::Delivered);

    let updated = destinations.get(tenant.id, dest.id).await.expect("get destination");
    assert_eq!(updated.message_count, 1);
    assert!(updated.last_forwarded.is_some());

    db.cleanup().await.expect("cleanup");
}

#[tokio::test]
async fn inactive_destination_records_a_failed_ledger_row_without_delivering() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let destinations = DestinationRepo::new(db.pool.clone());
    let ledger = ForwardedMessageRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 5002).await.expect("tenant");
    let dest = create_destination(&destinations, tenant.id, "-100901", "Archive").await.expect("dest");
    destinations.deactivate(tenant.id, dest.id).await.expect("deactivate");

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let deliverer = Arc::new(CountingDeliverer { calls: AtomicUsize::new(0) });
    let engine = ForwardingEngine::new(
        destinations.clone(),
        ledger.clone(),
        tgwatch::forwarding::DestinationRateLimiter::new(RateLimit { per_minute: 1000.0, burst: 1000.0 }),
        deliverer,
        shutdown_rx,
    );

    engine.enqueue(request(tenant.id, dest.id, 2)).await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let recorded = ledger.list(tenant.id, None, Some(dest.id), 10, 0).await.expect("list ledger");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].outcome, ForwardOutcome::Failed);
    assert_eq!(recorded[0].failure_reason.as_deref(), Some("destination_inactive"));

    db.cleanup().await.expect("cleanup");
}

#[tokio::test]
async fn permanent_delivery_failure_is_not_retried_and_is_recorded_failed() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let destinations = DestinationRepo::new(db.pool.clone());
    let ledger = ForwardedMessageRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 5003).await.expect("tenant");
    let dest = create_destination(&destinations, tenant.id, "-100902", "Archive").await.expect("dest");

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let deliverer = Arc::new(AlwaysPermanentFailureDeliverer);
    let engine = ForwardingEngine::new(
        destinations.clone(),
        ledger.clone(),
        tgwatch::forwarding::DestinationRateLimiter::new(RateLimit { per_minute: 1000.0, burst: 1000.0 }),
        deliverer,
        shutdown_rx,
    );

    engine.enqueue(request(tenant.id, dest.id, 3)).await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let recorded = ledger.list(tenant.id, None, Some(dest.id), 10, 0).await.expect("list ledger");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].outcome, ForwardOutcome::Failed);
    assert_eq!(recorded[0].failure_reason.as_deref(), Some("chat not found"));

    db.cleanup().await.expect("cleanup");
}
