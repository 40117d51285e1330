pub mod app_services;
pub mod episode_services;
pub mod fetch_services;

pub use app_services::AppServices;
pub use episode_services::{DynEpisodeService, EpisodeService, EpisodeServiceTrait};
pub use fetch_services::{DynPageFetcher, PageFetcher, PageFetcherTrait};
