//! Catalog loading and menu cards.
//!
//! The catalog JSON comes from a URL or a local file and is cached with
//! `moka` for the configured TTL. Sold-out state from the site configuration
//! is overlaid per request, so admin toggles show up without waiting for the
//! cache to expire.
//!
//! When the catalog cannot be loaded the [`FallbackPolicy`] decides between
//! serving a single sample product and reporting the failure.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use farmhouse_core::Price;
use farmhouse_core::catalog::{Catalog, CatalogError, Category, DietaryPricing, Product};
use farmhouse_core::site_config::SiteConfig;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogConfig;

/// Single cache slot; there is only ever one catalog.
const CACHE_KEY: &str = "catalog";

/// Where the catalog JSON lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Url(Url),
    Path(PathBuf),
}

impl FromStr for CatalogSource {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(Url::parse(s)?))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// What to do when the catalog cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Serve [`Catalog::sample`] and log a warning.
    #[default]
    Sample,
    /// Show the failure to the visitor.
    Error,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" => Ok(Self::Sample),
            "error" => Ok(Self::Error),
            other => Err(format!("expected 'sample' or 'error', got {other:?}")),
        }
    }
}

/// Errors loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// HTTP request failed or timed out.
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("catalog request returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Catalog file could not be read.
    #[error("cannot read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not a usable catalog.
    #[error("invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Fetches, caches and overlays the catalog.
#[derive(Clone)]
pub struct CatalogLoader {
    inner: Arc<CatalogLoaderInner>,
}

struct CatalogLoaderInner {
    source: CatalogSource,
    fallback: FallbackPolicy,
    client: reqwest::Client,
    cache: Cache<&'static str, Arc<Catalog>>,
}

impl CatalogLoader {
    /// Create a loader for the configured source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogLoaderInner {
                source: config.source.clone(),
                fallback: config.fallback,
                client,
                cache,
            }),
        })
    }

    #[must_use]
    pub fn source(&self) -> &CatalogSource {
        &self.inner.source
    }

    #[must_use]
    pub fn fallback(&self) -> FallbackPolicy {
        self.inner.fallback
    }

    /// The parsed, normalized catalog, from cache when fresh.
    ///
    /// Failures are not cached; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be fetched or parsed.
    #[instrument(skip(self), fields(source = %self.inner.source))]
    pub async fn load(&self) -> Result<Arc<Catalog>, CatalogLoadError> {
        if let Some(catalog) = self.inner.cache.get(CACHE_KEY).await {
            debug!("Cache hit for catalog");
            return Ok(catalog);
        }

        let text = self.fetch().await?;
        let catalog = Arc::new(Catalog::parse(&text)?);
        tracing::info!(products = catalog.products.len(), "Catalog loaded");

        self.inner.cache.insert(CACHE_KEY, catalog.clone()).await;
        Ok(catalog)
    }

    /// The catalog with sold-out state from `site` applied, after the
    /// fallback policy.
    ///
    /// # Errors
    ///
    /// Returns the load error only under [`FallbackPolicy::Error`].
    pub async fn load_with_overlay(&self, site: &SiteConfig) -> Result<Catalog, CatalogLoadError> {
        let mut catalog = match self.load().await {
            Ok(catalog) => Catalog::clone(&catalog),
            Err(e) => match self.inner.fallback {
                FallbackPolicy::Sample => {
                    tracing::warn!(error = %e, "Catalog unavailable, serving sample product");
                    Catalog::sample()
                }
                FallbackPolicy::Error => {
                    tracing::error!(error = %e, "Catalog unavailable");
                    return Err(e);
                }
            },
        };
        catalog.apply_site_config(site);
        Ok(catalog)
    }

    async fn fetch(&self) -> Result<String, CatalogLoadError> {
        match &self.inner.source {
            CatalogSource::Url(url) => {
                let response = self.inner.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(CatalogLoadError::Status(status));
                }
                Ok(response.text().await?)
            }
            CatalogSource::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CatalogLoadError::Io {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}

// =============================================================================
// Menu cards
// =============================================================================

/// One size choice on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeOption {
    pub index: usize,
    pub name: String,
    pub price: String,
}

/// An opt-in dietary checkbox, e.g. `Gluten-free (+$3)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DietaryOption {
    pub label: String,
}

impl DietaryOption {
    fn new(offered: bool, name: &str, surcharge: Price) -> Option<Self> {
        offered.then(|| {
            let label = if surcharge.is_positive() {
                format!("{name} (+{})", surcharge.display_short())
            } else {
                name.to_string()
            };
            Self { label }
        })
    }
}

/// Display data for one product card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub image: Option<String>,
    pub emoji: Option<String>,
    pub price: String,
    pub sizes: Vec<SizeOption>,
    pub gluten_free: Option<DietaryOption>,
    pub sugar_free: Option<DietaryOption>,
    pub vegan: bool,
    pub ingredients: Option<String>,
    pub allergens: Option<String>,
    pub shippable: bool,
    pub featured: bool,
    pub sold_out: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, pricing: &DietaryPricing) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.label(),
            description: product.description.clone(),
            image: product
                .image
                .as_deref()
                .map(image_src)
                .filter(|s| !s.is_empty()),
            emoji: product.emoji.clone(),
            price: product.price_display(),
            sizes: product
                .sizes
                .iter()
                .enumerate()
                .map(|(index, size)| SizeOption {
                    index,
                    name: size.name.clone(),
                    price: size.price.display(),
                })
                .collect(),
            gluten_free: DietaryOption::new(
                product.dietary.gluten_free,
                "Gluten-free",
                pricing.gluten_free,
            ),
            sugar_free: DietaryOption::new(
                product.dietary.sugar_free,
                "Sugar-free",
                pricing.sugar_free,
            ),
            vegan: product.dietary.vegan,
            ingredients: product
                .ingredients
                .as_ref()
                .filter(|t| !t.is_blank())
                .map(farmhouse_core::catalog::TextList::display),
            allergens: product
                .allergens
                .as_ref()
                .filter(|t| !t.is_blank())
                .map(farmhouse_core::catalog::TextList::display),
            shippable: product.shippable,
            featured: product.featured,
            sold_out: product.sold_out,
        }
    }
}

/// Image reference as stored in the catalog: a full URL, a data URI, or a
/// file name under `/static/images/`.
fn image_src(image: &str) -> String {
    let image = image.trim();
    if image.is_empty()
        || image.starts_with("http://")
        || image.starts_with("https://")
        || image.starts_with("data:")
        || image.starts_with('/')
    {
        image.to_string()
    } else {
        format!("/static/images/{image}")
    }
}

/// Cards for the products in `category`, or for every product.
#[must_use]
pub fn render(catalog: &Catalog, category: Option<&Category>) -> Vec<ProductCard> {
    catalog
        .in_category(category)
        .into_iter()
        .map(|p| ProductCard::new(p, &catalog.dietary_pricing))
        .collect()
}
