// the whole episode -> playable link pipeline, fetch, manifest, classify then the fallback chain
use async_trait::async_trait;
use metrics::counter;
use mockall::automock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    config::FallbackPolicy,
    database::episode::{DynResolutionRepository, ResolvedVideo},
    resolver::{
        Classification, DynRenderingResolver, ServerClassifier, ServerEntry,
        chain::{CandidateOutcome, ChainOutcome, first_success},
        direct, extract_manifest,
    },
    server::{
        error::{AppResult, Error},
        services::fetch_services::DynPageFetcher,
    },
};

pub type DynEpisodeService = Arc<dyn EpisodeServiceTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait EpisodeServiceTrait {
    async fn resolve_episode(&self, page_url: &str) -> AppResult<ResolvedVideo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolutionStage {
    Fetching,
    ManifestParsed,
    Classifying,
    Resolving,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Rendered,
    Direct,
    Fallback,
}

impl SourceKind {
    fn as_label(&self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::Direct => "direct",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug)]
struct ChosenSource {
    url: String,
    kind: SourceKind,
}

pub struct EpisodeService {
    fetcher: DynPageFetcher,
    classifier: Arc<ServerClassifier>,
    renderer: DynRenderingResolver,
    policy: FallbackPolicy,
    cache: Option<DynResolutionRepository>,
    cache_ttl_secs: u64,
}

impl EpisodeService {
    pub fn new(
        fetcher: DynPageFetcher,
        classifier: Arc<ServerClassifier>,
        renderer: DynRenderingResolver,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            renderer,
            policy,
            cache: None,
            cache_ttl_secs: 0,
        }
    }

    pub fn with_cache(mut self, cache: DynResolutionRepository, ttl_secs: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl_secs = ttl_secs;
        self
    }

    fn failed(&self, page_url: &str, err: Error) -> Error {
        warn!(stage = ?ResolutionStage::Failed, "resolving {} failed: {}", page_url, err);
        counter!("episode_resolutions_total", "outcome" => "failed").increment(1);
        err
    }

    async fn try_render(&self, code: &str) -> CandidateOutcome<ChosenSource> {
        match self.renderer.resolve(code).await {
            Ok(Some(url)) => {
                counter!("render_attempts_total", "result" => "success").increment(1);
                CandidateOutcome::Success(ChosenSource {
                    url,
                    kind: SourceKind::Rendered,
                })
            }
            Ok(None) => {
                counter!("render_attempts_total", "result" => "miss").increment(1);
                info!("no media url found rendering {}, trying next server", code);
                CandidateOutcome::Skip
            }
            Err(e) => {
                // a broken server never sinks the whole request
                counter!("render_attempts_total", "result" => "error").increment(1);
                warn!("rendering {} failed, trying next server: {}", code, e);
                CandidateOutcome::Skip
            }
        }
    }

    /// `servers` is never empty here
    async fn choose_source(&self, servers: &[(ServerEntry, Classification)]) -> ChosenSource {
        let chain = match self.policy {
            FallbackPolicy::PreferRendered => {
                let rendering = servers
                    .iter()
                    .filter(|(_, c)| *c == Classification::RequiresRendering)
                    .map(|(entry, _)| entry.code.clone())
                    .collect::<Vec<_>>();

                match first_success(rendering, |code| async move { self.try_render(&code).await }).await {
                    ChainOutcome::Success(source) => return source,
                    ChainOutcome::Exhausted => servers
                        .iter()
                        .find(|(_, c)| *c == Classification::Direct)
                        .map(|(entry, _)| ChosenSource {
                            url: direct::resolve(&entry.code),
                            kind: SourceKind::Direct,
                        }),
                }
            }
            FallbackPolicy::FirstDirect => {
                let candidates = servers
                    .iter()
                    .map(|(entry, classification)| (entry.code.clone(), *classification))
                    .collect::<Vec<_>>();

                let outcome = first_success(candidates, |(code, classification)| async move {
                    match classification {
                        Classification::Direct => CandidateOutcome::Success(ChosenSource {
                            url: direct::resolve(&code),
                            kind: SourceKind::Direct,
                        }),
                        Classification::RequiresRendering => self.try_render(&code).await,
                    }
                })
                .await;

                match outcome {
                    ChainOutcome::Success(source) => Some(source),
                    ChainOutcome::Exhausted => None,
                }
            }
        };

        chain.unwrap_or_else(|| {
            let first = servers.first().map(|(entry, _)| entry.code.clone()).unwrap_or_default();
            info!("every server failed, falling back to the first one: {}", first);
            ChosenSource {
                url: first,
                kind: SourceKind::Fallback,
            }
        })
    }

    async fn cached(&self, page_url: &str) -> Option<ResolvedVideo> {
        let cache = self.cache.as_ref()?;

        match cache.get_resolution(page_url).await {
            Ok(hit) => hit,
            Err(e) => {
                error!("failed to read resolution cache: {}", e);
                None
            }
        }
    }

    async fn store(&self, page_url: &str, resolved: &ResolvedVideo) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        if let Err(e) = cache
            .set_resolution(page_url, resolved, self.cache_ttl_secs)
            .await
        {
            // Don't fail the request, just log the error
            error!("failed to cache resolution for {}: {}", page_url, e);
        }
    }
}

#[async_trait]
impl EpisodeServiceTrait for EpisodeService {
    async fn resolve_episode(&self, page_url: &str) -> AppResult<ResolvedVideo> {
        if let Some(hit) = self.cached(page_url).await {
            info!("cache hit for episode: {}", page_url);
            counter!("episode_resolutions_total", "outcome" => "cached").increment(1);
            return Ok(hit);
        }

        debug!(stage = ?ResolutionStage::Fetching, "resolving episode {}", page_url);
        let html = self
            .fetcher
            .fetch(page_url)
            .await
            .map_err(|e| self.failed(page_url, e))?;

        let manifest =
            extract_manifest(&html).map_err(|e| self.failed(page_url, Error::from(e)))?;
        debug!(
            stage = ?ResolutionStage::ManifestParsed,
            "manifest tracks: {:?}",
            manifest.track_names().collect::<Vec<_>>()
        );

        let subtitled = manifest.subtitled();
        if subtitled.is_empty() {
            return Err(self.failed(page_url, Error::NoServersFound));
        }

        debug!(stage = ?ResolutionStage::Classifying, "classifying {} servers", subtitled.len());
        let servers = subtitled
            .iter()
            .map(|entry| (entry.clone(), self.classifier.classify(&entry.code)))
            .collect::<Vec<_>>();

        debug!(stage = ?ResolutionStage::Resolving, policy = ?self.policy, "picking a source");
        let chosen = self.choose_source(&servers).await;

        let resolved = ResolvedVideo {
            direct_link: (chosen.kind == SourceKind::Rendered).then(|| chosen.url.clone()),
            source_url: chosen.url,
            all_candidates: subtitled.iter().map(|entry| entry.code.clone()).collect(),
        };

        info!(
            stage = ?ResolutionStage::Done,
            "resolved {} via {} server: {}",
            page_url,
            chosen.kind.as_label(),
            resolved.source_url
        );
        counter!("episode_resolutions_total", "outcome" => chosen.kind.as_label()).increment(1);

        if chosen.kind != SourceKind::Fallback {
            self.store(page_url, &resolved).await;
        }

        Ok(resolved)
    }
}
