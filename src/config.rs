use std::path::PathBuf;
use std::time::Duration;

/// hosts whose embed page has to be rendered before the media url shows up
pub const DEFAULT_RENDERING_DOMAINS: &str =
    "ok.ru,yourupload.com,streamtape.com,mp4upload.com,streamwish,filemoon";

#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

/// how the orchestrator picks between direct servers and ones that need rendering
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// try every rendering-required server first, the first direct server is only the fallback
    #[default]
    PreferRendered,
    /// manifest order wins, a direct server is returned as soon as it's reached
    FirstDirect,
}

#[derive(clap::Parser)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,

    // resolved episodes get cached here, leave it out to run without a cache
    #[clap(long, env)]
    pub redis_url: Option<String>,

    // the episode site blocks empty user agents, anything browser-ish works
    #[clap(long, env, default_value = "Mozilla/5.0")]
    pub user_agent: String,

    #[clap(long, env, default_value = "30")]
    pub fetch_timeout_secs: u64,

    // upper bound for a single embed page to load inside the headless browser
    #[clap(long, env, default_value = "20")]
    pub navigation_timeout_secs: u64,

    // how long to let the embed page settle after load before reading the dom
    #[clap(long, env, default_value = "1500")]
    pub quiesce_wait_ms: u64,

    #[clap(long, env, value_delimiter = ',', default_value = DEFAULT_RENDERING_DOMAINS)]
    pub rendering_domains: Vec<String>,

    #[clap(long, env, value_enum, default_value = "prefer-rendered")]
    pub fallback_policy: FallbackPolicy,

    // chromium is looked up on the PATH when this isn't set
    #[clap(long, env)]
    pub chrome_executable: Option<PathBuf>,

    #[clap(long, env, default_value = "300")]
    pub resolution_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn quiesce_wait(&self) -> Duration {
        Duration::from_millis(self.quiesce_wait_ms)
    }
}

impl Default for AppConfig {
    // mostly used by tests, the real values come from clap
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            cors_origin: "*".to_string(),
            sentry_dsn: None,
            redis_url: None,
            user_agent: "Mozilla/5.0".to_string(),
            fetch_timeout_secs: 30,
            navigation_timeout_secs: 20,
            quiesce_wait_ms: 1500,
            rendering_domains: DEFAULT_RENDERING_DOMAINS.split(',').map(String::from).collect(),
            fallback_policy: FallbackPolicy::PreferRendered,
            chrome_executable: None,
            resolution_cache_ttl_secs: 300,
        }
    }
}
