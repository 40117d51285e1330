#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// the embed code can be handed to a player as is
    Direct,
    /// the media url only shows up once the embed page is rendered
    RequiresRendering,
}

/// Sorts server codes by whether their host needs a browser to give up the media url.
///
/// The domain list is plain data passed in at startup, matching is a case insensitive
/// substring check against the whole code.
#[derive(Debug, Clone)]
pub struct ServerClassifier {
    rendering_domains: Vec<String>,
}

impl ServerClassifier {
    pub fn new<I, S>(rendering_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rendering_domains = rendering_domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Self { rendering_domains }
    }

    pub fn classify(&self, code: &str) -> Classification {
        let code = code.to_ascii_lowercase();

        if self
            .rendering_domains
            .iter()
            .any(|domain| code.contains(domain.as_str()))
        {
            Classification::RequiresRendering
        } else {
            Classification::Direct
        }
    }

    pub fn rendering_domains(&self) -> &[String] {
        &self.rendering_domains
    }
}
