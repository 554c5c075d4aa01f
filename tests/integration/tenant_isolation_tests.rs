use tgwatch::db::groups::GroupRepo;
use tgwatch::db::organizations::OrganizationRepo;
use tgwatch::db::users::UserRepo;
use tgwatch::error::AppError;

use crate::test_utils::{create_group, create_tenant};
use crate::TestDatabase;

#[tokio::test]
async fn group_lookup_is_scoped_to_its_own_tenant() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());

    let (tenant_a, _) = create_tenant(&organizations, &users, "Tenant A", 1001).await.expect("tenant a");
    let (tenant_b, _) = create_tenant(&organizations, &users, "Tenant B", 1002).await.expect("tenant b");

    let group = create_group(&groups, tenant_a.id, "-100111", "A's group").await.expect("create group");

    let err = groups.get(tenant_b.id, group.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let found = groups.get(tenant_a.id, group.id).await.expect("owning tenant sees it");
    assert_eq!(found.id, group.id);

    db.cleanup().await.expect("cleanup");
}

#[tokio::test]
async fn same_external_group_id_can_be_registered_by_two_tenants() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());

    let (tenant_a, _) = create_tenant(&organizations, &users, "Tenant A", 2001).await.expect("tenant a");
    let (tenant_b, _) = create_tenant(&organizations, &users, "Tenant B", 2002).await.expect("tenant b");

    create_group(&groups, tenant_a.id, "-100222", "Shared chat (A's view)")
        .await
        .expect("tenant a registers group");
    create_group(&groups, tenant_b.id, "-100222", "Shared chat (B's view)")
        .await
        .expect("tenant b registers the same external group independently");

    assert_eq!(groups.list(tenant_a.id).await.expect("list a").len(), 1);
    assert_eq!(groups.list(tenant_b.id).await.expect("list b").len(), 1);

    db.cleanup().await.expect("cleanup");
}
