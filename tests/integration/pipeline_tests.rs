use std::collections::HashMap;

use tgwatch::db::destinations::DestinationRepo;
use tgwatch::db::groups::GroupRepo;
use tgwatch::db::messages::MessageRepo;
use tgwatch::db::models::{IngestedVia, MessageType};
use tgwatch::db::organizations::OrganizationRepo;
use tgwatch::db::users::UserRepo;
use tgwatch::db::watchlist::WatchlistRepo;
use tgwatch::pipeline::{IncomingMessage, PipelineEngine};

use crate::test_utils::{create_destination, create_group, create_tenant};
use crate::TestDatabase;

fn engine(db: &TestDatabase) -> PipelineEngine {
    PipelineEngine::new(
        WatchlistRepo::new(db.pool.clone()),
        MessageRepo::new(db.pool.clone()),
        GroupRepo::new(db.pool.clone()),
        DestinationRepo::new(db.pool.clone()),
    )
}

fn incoming(tenant_id: i32, group_id: i32, message_id: i64, username: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        tenant_id,
        group_id,
        group_name: "Acme Chat".into(),
        user_id: Some(555),
        username: Some(username.to_string()),
        message_id,
        message_text: Some(text.to_string()),
        message_type: MessageType::Text,
        media_info: HashMap::new(),
        ingested_via: IngestedVia::Session,
    }
}

#[tokio::test]
async fn keyword_match_archives_and_produces_one_forward_request_per_destination() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());
    let watchlist = WatchlistRepo::new(db.pool.clone());
    let destinations = DestinationRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 4001).await.expect("tenant");
    let group = create_group(&groups, tenant.id, "-100555", "Acme Chat").await.expect("group");
    let dest_a = create_destination(&destinations, tenant.id, "-100777", "Archive Channel").await.expect("dest a");
    let dest_b = create_destination(&destinations, tenant.id, "-100778", "Alerts Channel").await.expect("dest b");

    watchlist
        .create(tenant.id, "alice", Some("Alice"), &[group.id], &["btc".to_string()], &[dest_a.id, dest_b.id])
        .await
        .expect("create watch user");

    let pipeline = engine(&db);
    let outcome = pipeline
        .process(incoming(tenant.id, group.id, 1, "alice", "just bought some BTC today"))
        .await
        .expect("process");

    assert!(outcome.archived);
    assert_eq!(outcome.forward_requests.len(), 2);

    db.cleanup().await.expect("cleanup");
}

#[tokio::test]
async fn non_matching_keyword_is_neither_archived_nor_forwarded() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());
    let watchlist = WatchlistRepo::new(db.pool.clone());
    let destinations = DestinationRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 4002).await.expect("tenant");
    let group = create_group(&groups, tenant.id, "-100556", "Acme Chat").await.expect("group");
    let dest = create_destination(&destinations, tenant.id, "-100779", "Archive Channel").await.expect("dest");

    watchlist
        .create(tenant.id, "alice", None, &[group.id], &["btc".to_string()], &[dest.id])
        .await
        .expect("create watch user");

    let pipeline = engine(&db);
    let outcome = pipeline
        .process(incoming(tenant.id, group.id, 2, "alice", "what a nice day outside"))
        .await
        .expect("process");

    assert!(!outcome.archived);
    assert!(outcome.forward_requests.is_empty());

    db.cleanup().await.expect("cleanup");
}

#[tokio::test]
async fn reingesting_the_same_message_id_does_not_duplicate_or_reforward() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());
    let watchlist = WatchlistRepo::new(db.pool.clone());
    let destinations = DestinationRepo::new(db.pool.clone());
    let messages = MessageRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 4003).await.expect("tenant");
    let group = create_group(&groups, tenant.id, "-100557", "Acme Chat").await.expect("group");
    let dest = create_destination(&destinations, tenant.id, "-100780", "Archive Channel").await.expect("dest");

    watchlist
        .create(tenant.id, "alice", None, &[], &[], &[dest.id])
        .await
        .expect("create watch user");

    let pipeline = engine(&db);
    let first = pipeline.process(incoming(tenant.id, group.id, 3, "alice", "hello")).await.expect("first process");
    assert!(first.archived);
    assert_eq!(first.forward_requests.len(), 1);

    let second = pipeline.process(incoming(tenant.id, group.id, 3, "alice", "hello")).await.expect("second process");
    assert!(!second.archived);
    assert!(second.forward_requests.is_empty());

    let archived = messages.list(tenant.id, Some("alice"), None, None, 10, 0).await.expect("list");
    assert_eq!(archived.len(), 1);

    db.cleanup().await.expect("cleanup");
}
