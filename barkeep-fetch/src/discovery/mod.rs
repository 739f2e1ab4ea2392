//! Endpoint discovery.
//!
//! Recovers the retailer's internal search API without documentation:
//! render the listing page, perform a bounded plan of interactions, and take
//! the first observed exchange that looks like a search call. The result is
//! an immutable [`EndpointDescriptor`].
//!
//! Discovery is a one-shot operation. The catalog fetcher never rediscovers
//! on its own; it reports [`CrawlError::EndpointStale`](crate::CrawlError)
//! and the caller runs discovery again.

mod renderer;
mod signature;

pub use renderer::{
    HttpPageRenderer, Interaction, ObservedExchange, PageRenderer, RenderedPage, ScriptConfig,
};
pub use signature::{extract_descriptor, ApiSignature, GrammarDefaults};

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::descriptor::EndpointDescriptor;
use crate::error::DiscoveryError;

/// Default listing page.
pub const DEFAULT_TARGET_URL: &str = "https://www.lcbo.com/en/products";

// ============================================================================
// Config
// ============================================================================

/// Discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Page to render.
    pub target_url: String,
    /// What a search call looks like.
    pub signature: ApiSignature,
    /// Interactions to try, in order.
    pub interactions: Vec<Interaction>,
    /// Upper bound on interactions performed.
    pub max_interactions: usize,
    /// Fallbacks for grammar parts the exchange does not reveal.
    pub defaults: GrammarDefaults,
}

impl DiscoveryConfig {
    /// Creates a config for a target page.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }

    /// Sets the API signature.
    #[must_use]
    pub fn with_signature(mut self, signature: ApiSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Sets the interaction bound.
    #[must_use]
    pub fn with_max_interactions(mut self, max: usize) -> Self {
        self.max_interactions = max;
        self
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.into(),
            signature: ApiSignature::default(),
            interactions: vec![
                Interaction::Load,
                Interaction::Scroll,
                Interaction::Search("wine".into()),
                Interaction::OpenCategoryMenu("Spirits".into()),
                Interaction::Search("vodka".into()),
            ],
            max_interactions: 5,
            defaults: GrammarDefaults::default(),
        }
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Where a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorSource {
    /// Produced by a discovery run just now.
    Discovered,
    /// Last-known-good descriptor from the cache.
    Cached,
}

/// Runs endpoint discovery against a renderer.
pub struct EndpointDiscovery {
    renderer: Arc<dyn PageRenderer>,
    config: DiscoveryConfig,
}

impl EndpointDiscovery {
    /// Creates a discovery runner.
    pub fn new(renderer: Arc<dyn PageRenderer>, config: DiscoveryConfig) -> Self {
        Self { renderer, config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discovers the search endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::EndpointNotFound`] if no matching exchange
    /// is observed within `max_interactions`.
    #[instrument(skip(self), fields(target = %self.config.target_url))]
    pub async fn discover(&self) -> Result<EndpointDescriptor, DiscoveryError> {
        let target = &self.config.target_url;
        let mut performed = 0;

        for interaction in self
            .config
            .interactions
            .iter()
            .take(self.config.max_interactions)
        {
            performed += 1;
            let page = match self.renderer.render(target, interaction).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, %interaction, "Interaction failed");
                    continue;
                }
            };
            debug!(
                %interaction,
                exchanges = page.exchanges.len(),
                "Interaction performed"
            );

            for exchange in &page.exchanges {
                let Some(shape) = self.config.signature.matches(exchange) else {
                    continue;
                };
                if let Some(descriptor) =
                    extract_descriptor(exchange, shape, &page, &self.config.defaults)
                {
                    info!(
                        base_url = %descriptor.base_url,
                        interactions = performed,
                        "Search endpoint discovered"
                    );
                    return Ok(descriptor);
                }
            }
        }

        Err(DiscoveryError::EndpointNotFound {
            target: target.clone(),
            interactions: performed,
        })
    }

    /// Discovers the endpoint, falling back to a cached descriptor.
    ///
    /// # Errors
    ///
    /// Returns the discovery error when there is nothing to fall back to.
    pub async fn discover_or_cached(
        &self,
        cached: Option<EndpointDescriptor>,
    ) -> Result<(EndpointDescriptor, DescriptorSource), DiscoveryError> {
        match self.discover().await {
            Ok(descriptor) => Ok((descriptor, DescriptorSource::Discovered)),
            Err(e) => match cached {
                Some(descriptor) => {
                    warn!(
                        error = %e,
                        discovered_at = %descriptor.discovered_at,
                        "Discovery failed, using last-known-good descriptor"
                    );
                    Ok((descriptor, DescriptorSource::Cached))
                }
                None => Err(e),
            },
        }
    }
}

impl std::fmt::Debug for EndpointDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDiscovery")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::coveo_descriptor;
    use crate::descriptor::{HttpMethod, SearchRequest};
    use crate::host::http::HttpResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Renderer that only produces a search call on the n-th interaction.
    struct ScriptedRenderer {
        search_on: Option<usize>,
        seen: Mutex<Vec<Interaction>>,
    }

    impl ScriptedRenderer {
        fn new(search_on: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                search_on,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    fn exchange(url: &str, body: serde_json::Value) -> ObservedExchange {
        ObservedExchange {
            request: SearchRequest {
                method: HttpMethod::Post,
                url: url.into(),
                headers: BTreeMap::from([("authorization".into(), "Bearer t".into())]),
                body: Some(json!({"q": "", "firstResult": 0, "numberOfResults": 24})),
            },
            response: HttpResponse {
                status: 200,
                content_type: Some("application/json".into()),
                retry_after: None,
                body: body.to_string(),
            },
        }
    }

    #[async_trait]
    impl PageRenderer for ScriptedRenderer {
        async fn render(
            &self,
            url: &str,
            interaction: &Interaction,
        ) -> Result<RenderedPage, DiscoveryError> {
            let index = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(interaction.clone());
                seen.len() - 1
            };
            // analytics noise on every interaction
            let mut exchanges = vec![exchange(
                "https://analytics.cloud.coveo.com/rest/ua/v15/analytics/search",
                json!({"ok": true}),
            )];
            if Some(index) == self.search_on {
                exchanges.push(exchange(
                    "https://platform.cloud.coveo.com/rest/search/v2",
                    json!({"totalCount": 10, "results": []}),
                ));
            }
            Ok(RenderedPage {
                url: url.into(),
                html: String::new(),
                exchanges,
            })
        }
    }

    #[tokio::test]
    async fn test_discovers_on_later_interaction() {
        let renderer = ScriptedRenderer::new(Some(2));
        let discovery = EndpointDiscovery::new(renderer.clone(), DiscoveryConfig::default());

        let descriptor = discovery.discover().await.unwrap();
        assert_eq!(
            descriptor.base_url,
            "https://platform.cloud.coveo.com/rest/search/v2"
        );
        assert_eq!(renderer.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_not_found_within_bound() {
        let renderer = ScriptedRenderer::new(Some(4));
        let discovery = EndpointDiscovery::new(
            renderer.clone(),
            DiscoveryConfig::default().with_max_interactions(3),
        );

        match discovery.discover().await {
            Err(DiscoveryError::EndpointNotFound { interactions, .. }) => {
                assert_eq!(interactions, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(renderer.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_cache() {
        let discovery =
            EndpointDiscovery::new(ScriptedRenderer::new(None), DiscoveryConfig::default());
        let cached = coveo_descriptor();

        let (descriptor, source) = discovery
            .discover_or_cached(Some(cached.clone()))
            .await
            .unwrap();
        assert_eq!(source, DescriptorSource::Cached);
        assert_eq!(descriptor, cached);

        assert!(discovery.discover_or_cached(None).await.is_err());
    }
}
