pub mod chain;
pub mod chromium;
pub mod classifier;
pub mod direct;
pub mod manifest;
pub mod rendering;
pub mod session;

pub use classifier::{Classification, ServerClassifier};
pub use manifest::{ServerEntry, ServerManifest, extract_manifest};
pub use rendering::{DynRenderingResolver, RenderingResolver, RenderingResolverTrait};
