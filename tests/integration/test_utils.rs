use tgwatch::db::destinations::DestinationRepo;
use tgwatch::db::groups::GroupRepo;
use tgwatch::db::models::{Destination, DestinationType, Group, GroupType, Organization, User};
use tgwatch::db::organizations::OrganizationRepo;
use tgwatch::db::users::UserRepo;

/// creates a tenant plus its owner user, the entry point every scenario
/// below starts from, mirroring the registration flow in `http::auth::register`.
pub async fn create_tenant(
    organizations: &OrganizationRepo,
    users: &UserRepo,
    org_name: &str,
    owner_telegram_id: i64,
) -> Result<(Organization, User), Box<dyn std::error::Error + Send + Sync>> {
    let org = organizations.create(org_name).await?;
    let owner = users
        .create_owner(org.id, owner_telegram_id, Some("owner"), "Owner", None, None)
        .await?;
    Ok((org, owner))
}

pub async fn create_group(
    groups: &GroupRepo,
    tenant_id: i32,
    group_id: &str,
    name: &str,
) -> Result<Group, Box<dyn std::error::Error + Send + Sync>> {
    Ok(groups.create(tenant_id, group_id, name, GroupType::Supergroup, None, None).await?)
}

pub async fn create_destination(
    destinations: &DestinationRepo,
    tenant_id: i32,
    destination_id: &str,
    name: &str,
) -> Result<Destination, Box<dyn std::error::Error + Send + Sync>> {
    Ok(destinations
        .create(tenant_id, destination_id, name, DestinationType::Channel, None)
        .await?)
}
