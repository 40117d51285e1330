pub mod episode_controller;
pub mod health_controller;
pub mod metrics_controller;
