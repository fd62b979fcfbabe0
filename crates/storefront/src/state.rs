//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::PgCartStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    cart_store: PgCartStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let cart_store = PgCartStore::new(pool.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cart_store,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a handle to the `PostgreSQL` cart store.
    #[must_use]
    pub fn cart_store(&self) -> PgCartStore {
        self.inner.cart_store.clone()
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by a lazy pool pointing at a closed port.
    pub(crate) fn unreachable() -> Self {
        use std::time::Duration;

        use secrecy::SecretString;
        use sqlx::postgres::PgPoolOptions;
        use url::Url;

        use crate::config::SentryConfig;

        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost:1/unreachable"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: Url::parse("http://localhost:3000").unwrap(),
            store_name: "Chatcart".to_string(),
            whatsapp_phone: "5355555555".to_string(),
            low_stock_threshold: 5,
            sentry: SentryConfig::default(),
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy("postgres://localhost:1/unreachable")
            .unwrap();
        Self::new(config, pool)
    }
}
