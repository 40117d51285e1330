use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the episode endpoint hands back, and what gets cached per episode page.
///
/// `servidores` is the field name the players already read, so it stays spanish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    #[serde(rename = "video")]
    pub source_url: String,
    // only set when a rendered embed actually gave up a media file
    #[serde(rename = "directLink", default, skip_serializing_if = "Option::is_none")]
    pub direct_link: Option<String>,
    #[serde(rename = "servidores")]
    pub all_candidates: Vec<String>,
}

pub type DynResolutionRepository = Arc<dyn ResolutionRepository + Send + Sync>;

#[async_trait::async_trait]
pub trait ResolutionRepository {
    async fn get_resolution(&self, page_url: &str) -> Result<Option<ResolvedVideo>>;
    async fn set_resolution(
        &self,
        page_url: &str,
        resolved: &ResolvedVideo,
        ttl_secs: u64,
    ) -> Result<()>;
}
