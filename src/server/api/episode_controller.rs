use axum::{Extension, Json, Router, routing::get};
use tracing::info;

use crate::{
    database::episode::ResolvedVideo,
    server::{
        dtos::episode_dto::EpisodeQuery,
        error::{AppResult, Error},
        extractors::ValidatedQuery,
        services::AppServices,
    },
};

pub struct EpisodeController;

impl EpisodeController {
    pub fn app() -> Router {
        // /resolve is the same thing under the name the players use
        Router::new()
            .route("/episode", get(Self::resolve_episode))
            .route("/resolve", get(Self::resolve_episode))
    }

    async fn resolve_episode(
        Extension(services): Extension<AppServices>,
        ValidatedQuery(query): ValidatedQuery<EpisodeQuery>,
    ) -> AppResult<Json<ResolvedVideo>> {
        let page_url = query
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::MissingParameter("url".to_string()))?;

        if !page_url.starts_with("http://") && !page_url.starts_with("https://") {
            return Err(Error::BadRequest("Invalid URL format".to_string()));
        }

        info!("resolving episode page: {}", page_url);
        let resolved = services.episodes.resolve_episode(&page_url).await?;

        Ok(Json(resolved))
    }
}
