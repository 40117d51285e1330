use serde::Deserialize;
use validator::Validate;

/// `?url=` is optional at the type level so a missing one turns into our own 400 instead of
/// axum's query rejection
#[derive(Debug, Deserialize, Validate)]
pub struct EpisodeQuery {
    #[validate(url(message = "url must be an absolute episode page url"))]
    pub url: Option<String>,
}
