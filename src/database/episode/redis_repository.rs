use anyhow::{Context, Result};
use redis::AsyncCommands;
use sha2::{Digest, Sha256};

use super::model::{ResolutionRepository, ResolvedVideo};
use crate::database::RedisDatabase;

// page urls can get long, hash them so keys stay a fixed size
fn resolution_key(page_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_url.as_bytes());
    format!("episode:resolution:{}", hex::encode(hasher.finalize()))
}

#[async_trait::async_trait]
impl ResolutionRepository for RedisDatabase {
    async fn get_resolution(&self, page_url: &str) -> Result<Option<ResolvedVideo>> {
        let mut conn = self.connection.clone();

        let cached: Option<String> = conn
            .get(resolution_key(page_url))
            .await
            .context("failed to read cached resolution")?;

        cached
            .map(|json| serde_json::from_str(&json).context("cached resolution is not valid json"))
            .transpose()
    }

    async fn set_resolution(
        &self,
        page_url: &str,
        resolved: &ResolvedVideo,
        ttl_secs: u64,
    ) -> Result<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(resolved).context("failed to serialize resolution")?;

        let _: () = conn
            .set_ex(resolution_key(page_url), json, ttl_secs)
            .await
            .context("failed to cache resolution")?;

        Ok(())
    }
}
