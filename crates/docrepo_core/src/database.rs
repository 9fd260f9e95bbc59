//! Database facade.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::registry::RepositoryRegistry;
use crate::repository::RepositoryType;
use crate::scope::TransactionScope;
use docrepo_driver::{Client, Connector, InMemoryClient};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

static GLOBAL: OnceCell<Arc<Database>> = OnceCell::new();

/// Entry point tying a driver client to its repository registry.
///
/// # Example
///
/// ```rust
/// use docrepo_core::{Config, Database};
/// use docrepo_driver::InMemoryConnector;
///
/// let config = Config::new().database("app");
/// let db = Database::connect::<InMemoryConnector>(&config).unwrap();
/// assert_eq!(db.client().database_name(), "app");
/// ```
pub struct Database {
    client: Arc<dyn Client>,
    registry: RepositoryRegistry,
}

impl Database {
    /// Wraps an established client.
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self {
            registry: RepositoryRegistry::new(Arc::clone(&client)),
            client,
        }
    }

    /// Connects with connector `C` using `config`.
    ///
    /// # Errors
    ///
    /// Returns the connector's error unchanged.
    pub fn connect<C: Connector>(config: &Config) -> CoreResult<Self> {
        let uri = config.connection_uri();
        let client = C::connect(&uri, &config.database)?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connected to document store"
        );
        Ok(Self::new(client))
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory(database: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemoryClient::new(database)))
    }

    /// Returns the driver client.
    pub fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    /// Returns the repository registry.
    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    /// Returns the single shared instance of repository type `R`.
    ///
    /// # Errors
    ///
    /// Returns the construction error on first use; later calls retry.
    pub fn repository<R: RepositoryType>(&self) -> CoreResult<Arc<R>> {
        self.registry.get_or_create::<R>()
    }

    /// Runs `f` as one transaction spanning every repository it calls.
    ///
    /// Joins the current call chain's transaction if there is one.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<CoreError>,
    {
        TransactionScope::run(self.client.as_ref(), |_| f())
    }

    /// Installs `database` as the process-wide default.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` if a default is already installed.
    pub fn install_global(database: Database) -> CoreResult<Arc<Database>> {
        let database = Arc::new(database);
        GLOBAL
            .set(Arc::clone(&database))
            .map_err(|_| CoreError::config("a global database is already installed"))?;
        info!(database = %database.client.database_name(), "installed global database");
        Ok(database)
    }

    /// Returns the process-wide default, if installed.
    pub fn global() -> Option<Arc<Database>> {
        GLOBAL.get().cloned()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("database", &self.client.database_name())
            .field("registry", &self.registry)
            .finish()
    }
}
