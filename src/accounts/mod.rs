pub mod artifact_store;

use crate::db::accounts::AccountRepo;
use crate::db::models::{Account, AccountStatus};
use crate::error::AppResult;
use crate::supervisor::SupervisorHandle;

use artifact_store::{parse_metadata, validate_extension, ArtifactStore};

/// orchestrates the account state machine: upload validates and stores
/// artifacts and creates a `pending` row; activate/deactivate/delete
/// additionally drive the session client supervisor.
#[derive(Clone)]
pub struct AccountService {
    accounts: AccountRepo,
    artifacts: ArtifactStore,
}

impl AccountService {
    pub fn new(accounts: AccountRepo, artifacts: ArtifactStore) -> Self {
        Self { accounts, artifacts }
    }

    pub async fn upload(
        &self,
        tenant_id: i32,
        name: &str,
        session_filename: &str,
        session_bytes: &[u8],
        json_filename: &str,
        json_bytes: &[u8],
    ) -> AppResult<Account> {
        validate_extension(session_filename, "session")?;
        validate_extension(json_filename, "json")?;
        let metadata = parse_metadata(json_bytes)?;

        let timestamp = chrono::Utc::now().timestamp();
        let (session_path, metadata_path) = self
            .artifacts
            .save(tenant_id, timestamp, session_bytes, json_bytes)
            .await?;

        let account = self.accounts.create(tenant_id, name, &session_path, &metadata_path).await?;

        if metadata.phone_number.is_some()
            || metadata.username.is_some()
            || metadata.first_name.is_some()
            || metadata.last_name.is_some()
        {
            self.accounts
                .update_identity(
                    account.id,
                    metadata.phone_number.as_deref(),
                    metadata.username.as_deref(),
                    metadata.first_name.as_deref(),
                    metadata.last_name.as_deref(),
                )
                .await?;
            return self.accounts.get(tenant_id, account.id).await;
        }

        Ok(account)
    }

    /// `pending|inactive|error ──▶ active`; the supervisor is told to start
    /// the receiver, which will set `error`+`last_error` itself if the
    /// connection attempt fails.
    pub async fn activate(&self, tenant_id: i32, id: i32, supervisor: &SupervisorHandle) -> AppResult<Account> {
        let account = self.accounts.get(tenant_id, id).await?;
        self.accounts.update_status(id, AccountStatus::Active, None).await?;
        supervisor.start_account(account.id);
        self.accounts.get(tenant_id, id).await
    }

    pub async fn deactivate(&self, tenant_id: i32, id: i32, supervisor: &SupervisorHandle) -> AppResult<Account> {
        let account = self.accounts.deactivate(tenant_id, id).await?;
        supervisor.stop_account(account.id);
        Ok(account)
    }

    pub async fn delete(&self, tenant_id: i32, id: i32, supervisor: &SupervisorHandle) -> AppResult<()> {
        let account = self.accounts.get(tenant_id, id).await?;
        supervisor.stop_account(account.id);
        self.artifacts
            .delete(&account.session_artifact_path, &account.metadata_artifact_path)
            .await?;
        self.accounts.delete(tenant_id, id).await
    }
}
