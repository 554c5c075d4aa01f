use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::{AppError, AppResult};

/// filesystem layout for uploaded account artifacts:
/// `{root}/sessions/{tenant}/{hash}.session` and `{root}/json/{tenant}/{hash}.json`,
/// hashing the uploaded bytes for the `{hash}` component.
#[derive(Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn hash_name(tenant_id: i32, timestamp: i64) -> String {
        let digest = Sha256::digest(format!("{tenant_id}:{timestamp}").as_bytes());
        hex::encode(digest)
    }

    fn session_path(&self, tenant_id: i32, hash: &str) -> PathBuf {
        self.root
            .join("sessions")
            .join(tenant_id.to_string())
            .join(format!("{hash}.session"))
    }

    fn json_path(&self, tenant_id: i32, hash: &str) -> PathBuf {
        self.root
            .join("json")
            .join(tenant_id.to_string())
            .join(format!("{hash}.json"))
    }

    /// writes both artifacts and returns their paths; the caller already
    /// validated the `.json` bytes parse before calling this.
    pub async fn save(
        &self,
        tenant_id: i32,
        timestamp: i64,
        session_bytes: &[u8],
        json_bytes: &[u8],
    ) -> AppResult<(String, String)> {
        let hash = Self::hash_name(tenant_id, timestamp);
        let session_path = self.session_path(tenant_id, &hash);
        let json_path = self.json_path(tenant_id, &hash);

        if let Some(parent) = session_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Some(parent) = json_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&session_path, session_bytes).await?;
        fs::write(&json_path, json_bytes).await?;

        Ok((
            session_path.to_string_lossy().into_owned(),
            json_path.to_string_lossy().into_owned(),
        ))
    }

    pub async fn delete(&self, session_artifact_path: &str, metadata_artifact_path: &str) -> AppResult<()> {
        Self::remove_if_exists(session_artifact_path).await?;
        Self::remove_if_exists(metadata_artifact_path).await?;
        Ok(())
    }

    async fn remove_if_exists(path: &str) -> AppResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(e.to_string())),
        }
    }
}

/// metadata fields optionally present in the uploaded `.json` artifact.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AccountMetadata {
    pub phone_number: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub fn parse_metadata(json_bytes: &[u8]) -> AppResult<AccountMetadata> {
    serde_json::from_slice(json_bytes)
        .map_err(|_| AppError::ArtifactInvalid("metadata artifact is not valid JSON".into()))
}

pub fn validate_extension(filename: &str, expected: &str) -> AppResult<()> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if ext != expected {
        return Err(AppError::ArtifactInvalid(format!(
            "expected a .{expected} file, got .{ext}"
        )));
    }
    Ok(())
}
