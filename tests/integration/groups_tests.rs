use tgwatch::db::groups::GroupRepo;
use tgwatch::db::organizations::OrganizationRepo;
use tgwatch::db::users::UserRepo;
use tgwatch::error::AppError;

use crate::test_utils::create_tenant;
use crate::TestDatabase;

#[tokio::test]
async fn registering_the_same_group_twice_conflicts() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 3001).await.expect("tenant");

    groups
        .create(tenant.id, "-100333", "Acme Chat", tgwatch::db::models::GroupType::Supergroup, None, None)
        .await
        .expect("first registration succeeds");

    let err = groups
        .create(tenant.id, "-100333", "Acme Chat (dup)", tgwatch::db::models::GroupType::Supergroup, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    db.cleanup().await.expect("cleanup");
}

#[tokio::test]
async fn deactivated_group_no_longer_lists_active_but_remains_gettable() {
    let db = TestDatabase::create_fresh().await.expect("create test database");
    let organizations = OrganizationRepo::new(db.pool.clone());
    let users = UserRepo::new(db.pool.clone());
    let groups = GroupRepo::new(db.pool.clone());

    let (tenant, _) = create_tenant(&organizations, &users, "Acme", 3002).await.expect("tenant");
    let group = groups
        .create(tenant.id, "-100444", "Acme Chat", tgwatch::db::models::GroupType::Supergroup, None, None)
        .await
        .expect("create group");

    let deactivated = groups.deactivate(tenant.id, group.id).await.expect("deactivate");
    assert!(!deactivated.is_active);

    let fetched = groups.get(tenant.id, group.id).await.expect("still gettable");
    assert!(!fetched.is_active);

    db.cleanup().await.expect("cleanup");
}
