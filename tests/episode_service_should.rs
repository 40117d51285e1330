use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockall::Sequence;

use episode_api::{
    FallbackPolicy,
    database::episode::{ResolutionRepository, ResolvedVideo},
    resolver::{ServerClassifier, rendering::MockRenderingResolverTrait, session::RenderError},
    server::{
        error::Error,
        services::{
            EpisodeService, EpisodeServiceTrait, fetch_services::MockPageFetcherTrait,
        },
    },
};

const PAGE_URL: &str = "https://www3.animeflv.net/ver/one-piece-1";

const MIXED_PAGE: &str = r#"<script>var videos = {"SUB":[{"code":"https://ok.ru/embed/1"},{"code":"https://directcdn.example/file"}]};</script>"#;

const RENDERING_ONLY_PAGE: &str = r#"<script>var videos = {"SUB":[{"code":"https://ok.ru/embed/1"},{"code":"https://streamtape.com/e/2"}]};</script>"#;

const DIRECT_FIRST_PAGE: &str = r#"<script>var videos = {"SUB":[{"code":"https://directcdn.example/file"},{"code":"https://ok.ru/embed/1"}]};</script>"#;

fn fetcher_returning(html: &'static str) -> MockPageFetcherTrait {
    let mut fetcher = MockPageFetcherTrait::new();
    fetcher
        .expect_fetch()
        .withf(|url: &str| url == PAGE_URL)
        .times(1)
        .returning(move |_| Ok(html.to_string()));
    fetcher
}

fn service(
    fetcher: MockPageFetcherTrait,
    renderer: MockRenderingResolverTrait,
    policy: FallbackPolicy,
) -> EpisodeService {
    EpisodeService::new(
        Arc::new(fetcher),
        Arc::new(ServerClassifier::new(["ok.ru", "streamtape.com"])),
        Arc::new(renderer),
        policy,
    )
}

#[derive(Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, ResolvedVideo>>,
}

#[async_trait::async_trait]
impl ResolutionRepository for MemoryCache {
    async fn get_resolution(&self, page_url: &str) -> anyhow::Result<Option<ResolvedVideo>> {
        Ok(self.entries.lock().unwrap().get(page_url).cloned())
    }

    async fn set_resolution(
        &self,
        page_url: &str,
        resolved: &ResolvedVideo,
        _ttl_secs: u64,
    ) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(page_url.to_string(), resolved.clone());
        Ok(())
    }
}

#[tokio::test]
async fn fall_back_to_the_first_direct_server_when_rendering_fails() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer
        .expect_resolve()
        .withf(|code: &str| code == "https://ok.ru/embed/1")
        .times(1)
        .returning(|_| Err(RenderError::NavigationTimeout(Duration::from_secs(20))));

    let resolved = service(fetcher_returning(MIXED_PAGE), renderer, FallbackPolicy::PreferRendered)
        .resolve_episode(PAGE_URL)
        .await
        .unwrap();

    assert_eq!(resolved.source_url, "https://directcdn.example/file");
    assert_eq!(resolved.direct_link, None);
    assert_eq!(
        resolved.all_candidates,
        vec!["https://ok.ru/embed/1", "https://directcdn.example/file"]
    );
}

#[tokio::test]
async fn prefer_a_rendered_media_url_over_a_direct_server() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer
        .expect_resolve()
        .times(1)
        .returning(|_| Ok(Some("https://vd.okcdn.ru/video/1.mp4".to_string())));

    let resolved = service(fetcher_returning(MIXED_PAGE), renderer, FallbackPolicy::PreferRendered)
        .resolve_episode(PAGE_URL)
        .await
        .unwrap();

    assert_eq!(resolved.source_url, "https://vd.okcdn.ru/video/1.mp4");
    assert_eq!(resolved.direct_link.as_deref(), Some("https://vd.okcdn.ru/video/1.mp4"));
    assert_eq!(resolved.all_candidates.len(), 2);
}

#[tokio::test]
async fn render_candidates_one_after_another_in_manifest_order() {
    let mut seq = Sequence::new();
    let mut renderer = MockRenderingResolverTrait::new();
    renderer
        .expect_resolve()
        .withf(|code: &str| code == "https://ok.ru/embed/1")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    renderer
        .expect_resolve()
        .withf(|code: &str| code == "https://streamtape.com/e/2")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(Some("https://cdn.streamtape.example/2.mp4".to_string())));

    let resolved = service(
        fetcher_returning(RENDERING_ONLY_PAGE),
        renderer,
        FallbackPolicy::PreferRendered,
    )
    .resolve_episode(PAGE_URL)
    .await
    .unwrap();

    assert_eq!(resolved.source_url, "https://cdn.streamtape.example/2.mp4");
}

#[tokio::test]
async fn return_the_first_code_when_every_render_fails() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer
        .expect_resolve()
        .times(2)
        .returning(|_| Err(RenderError::Navigation("net::ERR_CONNECTION_RESET".to_string())));

    let resolved = service(
        fetcher_returning(RENDERING_ONLY_PAGE),
        renderer,
        FallbackPolicy::PreferRendered,
    )
    .resolve_episode(PAGE_URL)
    .await
    .unwrap();

    assert_eq!(resolved.source_url, "https://ok.ru/embed/1");
    assert_eq!(resolved.direct_link, None);
    assert_eq!(
        resolved.all_candidates,
        vec!["https://ok.ru/embed/1", "https://streamtape.com/e/2"]
    );
}

#[tokio::test]
async fn fail_with_no_servers_and_never_render_for_an_empty_track() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer.expect_resolve().times(0);

    let result = service(
        fetcher_returning(r#"var videos = {"SUB":[],"LAT":[{"code":"https://ok.ru/embed/9"}]};"#),
        renderer,
        FallbackPolicy::PreferRendered,
    )
    .resolve_episode(PAGE_URL)
    .await;

    assert!(matches!(result, Err(Error::NoServersFound)));
}

#[tokio::test]
async fn fail_with_manifest_not_found() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer.expect_resolve().times(0);

    let result = service(
        fetcher_returning("<html><body>Episodio no disponible</body></html>"),
        renderer,
        FallbackPolicy::PreferRendered,
    )
    .resolve_episode(PAGE_URL)
    .await;

    assert!(matches!(result, Err(Error::ManifestNotFound)));
}

#[tokio::test]
async fn fail_with_a_parse_error_for_a_broken_manifest() {
    let result = service(
        fetcher_returning(r#"var videos = {"SUB":[{"code":"https://x/1"]};"#),
        MockRenderingResolverTrait::new(),
        FallbackPolicy::PreferRendered,
    )
    .resolve_episode(PAGE_URL)
    .await;

    assert!(matches!(result, Err(Error::ManifestParseError(_))));
}

#[tokio::test]
async fn pass_fetch_failures_through() {
    let mut fetcher = MockPageFetcherTrait::new();
    fetcher.expect_fetch().times(1).returning(|_| {
        Err(Error::FetchFailed {
            status: Some(503),
            message: "upstream returned 503".to_string(),
        })
    });

    let result = service(
        fetcher,
        MockRenderingResolverTrait::new(),
        FallbackPolicy::PreferRendered,
    )
    .resolve_episode(PAGE_URL)
    .await;

    assert!(matches!(result, Err(Error::FetchFailed { status: Some(503), .. })));
}

#[tokio::test]
async fn return_a_direct_server_immediately_under_first_direct() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer.expect_resolve().times(0);

    let resolved = service(
        fetcher_returning(DIRECT_FIRST_PAGE),
        renderer,
        FallbackPolicy::FirstDirect,
    )
    .resolve_episode(PAGE_URL)
    .await
    .unwrap();

    assert_eq!(resolved.source_url, "https://directcdn.example/file");
    assert_eq!(resolved.direct_link, None);
}

#[tokio::test]
async fn try_earlier_rendering_servers_first_under_first_direct() {
    let mut renderer = MockRenderingResolverTrait::new();
    renderer
        .expect_resolve()
        .times(1)
        .returning(|_| Ok(Some("https://vd.okcdn.ru/video/1.mp4".to_string())));

    let resolved = service(fetcher_returning(MIXED_PAGE), renderer, FallbackPolicy::FirstDirect)
        .resolve_episode(PAGE_URL)
        .await
        .unwrap();

    assert_eq!(resolved.source_url, "https://vd.okcdn.ru/video/1.mp4");
}

#[tokio::test]
async fn serve_cached_resolutions_without_fetching() {
    let cache = Arc::new(MemoryCache::default());
    let cached = ResolvedVideo {
        source_url: "https://directcdn.example/file".to_string(),
        direct_link: None,
        all_candidates: vec!["https://directcdn.example/file".to_string()],
    };
    cache
        .set_resolution(PAGE_URL, &cached, 300)
        .await
        .unwrap();

    let mut fetcher = MockPageFetcherTrait::new();
    fetcher.expect_fetch().times(0);

    let resolved = service(
        fetcher,
        MockRenderingResolverTrait::new(),
        FallbackPolicy::PreferRendered,
    )
    .with_cache(cache, 300)
    .resolve_episode(PAGE_URL)
    .await
    .unwrap();

    assert_eq!(resolved, cached);
}

#[tokio::test]
async fn cache_confirmed_sources_but_not_fallbacks() {
    let cache = Arc::new(MemoryCache::default());
    let mut renderer = MockRenderingResolverTrait::new();
    renderer.expect_resolve().times(2).returning(|_| Ok(None));

    service(
        fetcher_returning(RENDERING_ONLY_PAGE),
        renderer,
        FallbackPolicy::PreferRendered,
    )
    .with_cache(cache.clone(), 300)
    .resolve_episode(PAGE_URL)
    .await
    .unwrap();

    assert!(cache.entries.lock().unwrap().is_empty());

    let mut renderer = MockRenderingResolverTrait::new();
    renderer.expect_resolve().times(1).returning(|_| Ok(None));

    service(fetcher_returning(MIXED_PAGE), renderer, FallbackPolicy::PreferRendered)
        .with_cache(cache.clone(), 300)
        .resolve_episode(PAGE_URL)
        .await
        .unwrap();

    assert!(cache.entries.lock().unwrap().contains_key(PAGE_URL));
}
