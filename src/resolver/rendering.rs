use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, info, warn};

use super::session::{
    DynSessionLauncher, ExtractionStrategy, NavigateOptions, RenderError, ScopedSession,
};

pub type DynRenderingResolver = Arc<dyn RenderingResolverTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait RenderingResolverTrait {
    /// `Ok(None)` means the page rendered fine but nothing in it looked like a media url
    async fn resolve(&self, code: &str) -> Result<Option<String>, RenderError>;
}

pub struct RenderingResolver {
    launcher: DynSessionLauncher,
    options: NavigateOptions,
}

impl RenderingResolver {
    pub fn new(launcher: DynSessionLauncher, options: NavigateOptions) -> Self {
        Self { launcher, options }
    }

    async fn render(&self, session: &mut ScopedSession, code: &str) -> Result<Option<String>, RenderError> {
        session.navigate(code, self.options).await?;

        // a failing strategy doesn't stop the later ones, the error only surfaces if none hit
        let mut last_error = None;
        for strategy in ExtractionStrategy::PRIORITY {
            match session.extract(strategy).await {
                Ok(Some(source)) => {
                    info!("extracted media url with {:?}: {}", strategy, source);
                    return Ok(Some(source));
                }
                Ok(None) => debug!("{:?} found nothing on {}", strategy, code),
                Err(e) => {
                    warn!("{:?} failed on {}: {}", strategy, code, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RenderingResolverTrait for RenderingResolver {
    async fn resolve(&self, code: &str) -> Result<Option<String>, RenderError> {
        info!("rendering embed page: {}", code);

        let mut session = ScopedSession::open(self.launcher.as_ref()).await?;
        let result = self.render(&mut session, code).await;
        session.close().await;

        result
    }
}
