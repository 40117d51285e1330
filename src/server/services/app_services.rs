use std::sync::Arc;

use tracing::info;

use crate::{
    config::AppConfig,
    database::{RedisDatabase, episode::DynResolutionRepository},
    resolver::{
        DynRenderingResolver, RenderingResolver, ServerClassifier,
        chromium::ChromiumLauncher,
        session::{DynSessionLauncher, NavigateOptions},
    },
};

use super::{
    episode_services::{DynEpisodeService, EpisodeService},
    fetch_services::{DynPageFetcher, PageFetcher},
};

/// everything the handlers need, handed to axum as an extension
/// redis is optional here, without it nothing gets cached
#[derive(Clone)]
pub struct AppServices {
    pub episodes: DynEpisodeService,
    pub redis: Option<Arc<RedisDatabase>>,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(redis_db: Option<RedisDatabase>, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        info!("starting services...");

        let classifier = Arc::new(ServerClassifier::new(&config.rendering_domains));
        info!(
            "classifier ok, {} rendering domains: {:?}",
            classifier.rendering_domains().len(),
            classifier.rendering_domains()
        );

        let fetcher = Arc::new(PageFetcher::new(&config.user_agent, config.fetch_timeout())?)
            as DynPageFetcher;

        let launcher = Arc::new(ChromiumLauncher::new(
            config.chrome_executable.clone(),
            config.user_agent.clone(),
        )) as DynSessionLauncher;
        let renderer = Arc::new(RenderingResolver::new(
            launcher,
            NavigateOptions {
                quiesce_wait: config.quiesce_wait(),
                timeout: config.navigation_timeout(),
            },
        )) as DynRenderingResolver;

        let redis = redis_db.map(Arc::new);

        let mut episodes = EpisodeService::new(fetcher, classifier, renderer, config.fallback_policy);
        if let Some(redis) = &redis {
            info!("resolution cache enabled (ttl {}s)", config.resolution_cache_ttl_secs);
            episodes = episodes.with_cache(
                redis.clone() as DynResolutionRepository,
                config.resolution_cache_ttl_secs,
            );
        } else {
            info!("no redis configured, resolution cache disabled");
        }

        Ok(Self::from_parts(Arc::new(episodes), redis, config))
    }

    pub fn from_parts(
        episodes: DynEpisodeService,
        redis: Option<Arc<RedisDatabase>>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            episodes,
            redis,
            config,
        }
    }
}
