//! Integration tests for Yellow Farmhouse Treats.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p farmhouse-integration-tests
//! ```
//!
//! Each test starts the storefront and admin servers on ephemeral ports.
//! Both point at the same catalog file and site data directory inside a
//! temporary directory, so a setting changed through the admin panel is
//! visible to the storefront exactly as in production.
//!
//! # Test Categories
//!
//! - `checkout_flow` - Menu, cart and order placement on the storefront
//! - `admin_settings` - Admin login, site settings and the catalog editor

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use farmhouse_admin::config::AdminConfig;
use farmhouse_core::catalog::Catalog;
use farmhouse_core::order::PaymentHandles;
use farmhouse_core::shipping::ShippingRates;
use farmhouse_storefront::catalog::{CatalogSource, FallbackPolicy};
use farmhouse_storefront::config::{CatalogConfig, StorefrontConfig};
use secrecy::SecretString;
use tempfile::TempDir;

/// Password the test admin server accepts.
pub const ADMIN_PASSWORD: &str = "test-password";

/// Product id of the sample catalog's only product.
pub const SAMPLE_PRODUCT: &str = "sample-chocolate-chip";

/// Running storefront and admin servers sharing one data directory.
pub struct TestContext {
    pub storefront_url: String,
    pub admin_url: String,
    pub catalog_path: PathBuf,
    pub site_data_dir: PathBuf,
    _dir: TempDir,
}

impl TestContext {
    /// Start both servers over the sample catalog.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or a listener cannot be set up.
    #[allow(clippy::expect_used)]
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let catalog_path = dir.path().join("products-data.json");
        let json = Catalog::sample()
            .to_pretty_json()
            .expect("Failed to serialize sample catalog");
        std::fs::write(&catalog_path, json).expect("Failed to write catalog");
        let site_data_dir = dir.path().join("site");

        let storefront = farmhouse_storefront::state::AppState::new(storefront_config(
            &catalog_path,
            &site_data_dir,
        ))
        .expect("Failed to build storefront state");
        let admin = farmhouse_admin::state::AppState::new(admin_config(&catalog_path, &site_data_dir))
            .expect("Failed to build admin state");

        let storefront_addr = serve(farmhouse_storefront::app(storefront)).await;
        let admin_addr = serve(farmhouse_admin::app(admin)).await;

        Self {
            storefront_url: format!("http://{storefront_addr}"),
            admin_url: format!("http://{admin_addr}"),
            catalog_path,
            site_data_dir,
            _dir: dir,
        }
    }

    /// Storefront URL for `path`.
    #[must_use]
    pub fn storefront(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// Admin URL for `path`.
    #[must_use]
    pub fn admin(&self, path: &str) -> String {
        format!("{}{path}", self.admin_url)
    }

    /// A client that keeps cookies and does not follow redirects, so one
    /// client is one visitor session.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client")
    }

    /// A client logged in to the admin panel.
    ///
    /// # Panics
    ///
    /// Panics if the login request fails or is rejected.
    #[allow(clippy::expect_used)]
    pub async fn admin_client(&self) -> reqwest::Client {
        let client = Self::client();
        let resp = client
            .post(self.admin("/auth/login"))
            .form(&[("password", ADMIN_PASSWORD)])
            .send()
            .await
            .expect("Failed to log in");
        assert!(
            resp.status().is_redirection(),
            "login rejected: {}",
            resp.status()
        );
        client
    }
}

fn storefront_config(catalog_path: &Path, site_data_dir: &Path) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost".to_string(),
        catalog: CatalogConfig {
            source: CatalogSource::Path(catalog_path.to_path_buf()),
            fallback: FallbackPolicy::Error,
            cache_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(5),
        },
        site_data_dir: site_data_dir.to_path_buf(),
        static_dir: PathBuf::from("../storefront/static"),
        shipping: ShippingRates::default(),
        payments: PaymentHandles::default(),
        sentry_dsn: None,
        sentry_environment: None,
        json_logs: false,
    }
}

fn admin_config(catalog_path: &Path, site_data_dir: &Path) -> AdminConfig {
    AdminConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost".to_string(),
        password: SecretString::from(ADMIN_PASSWORD),
        catalog_path: catalog_path.to_path_buf(),
        site_data_dir: site_data_dir.to_path_buf(),
        sentry_dsn: None,
        sentry_environment: None,
        json_logs: false,
    }
}

/// Serve `app` on an ephemeral port for the rest of the test.
#[allow(clippy::expect_used)]
async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
