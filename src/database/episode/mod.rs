mod model;
mod redis_repository;

pub use model::*;
