//! Application context - dependency injection container

use std::sync::Arc;

use panelpost_core::{
    ensure_fresh_auth_context, AuthContext, FreshnessInput, ImageCompressor, KeyValueStore,
    PostOptions, PosterService, SessionCache,
};
use panelpost_domain::{Config, DisplayRegistry, PanelPostError, Result};
use panelpost_infra::auth::{
    AtProtoRefresher, OAuthClient, PasswordAuthClient, PendingAuthorizationStore,
    SessionPersistence,
};
use panelpost_infra::scheduling::{KvSchedulerStore, SchedulerEngine, SchedulerEngineConfig};
use panelpost_infra::{config, FileStore, HttpClient, ImageReencoder, XrpcClient};
use tracing::{debug, info, instrument};

use crate::adapters::ScheduledThreadHandler;

/// Type alias for key-value store port trait object
type DynKeyValueStore = dyn KeyValueStore + 'static;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,

    // Storage
    pub durable: Arc<DynKeyValueStore>,
    pub ephemeral: Arc<DynKeyValueStore>,
    pub sessions: SessionPersistence,
    pub pending: PendingAuthorizationStore,
    pub scheduler_store: Arc<KvSchedulerStore>,

    // Remote services
    pub oauth: OAuthClient,
    pub password: PasswordAuthClient,
    pub refresher: AtProtoRefresher,
    pub xrpc: XrpcClient,

    pub compressor: Arc<dyn ImageCompressor>,
    pub registry: DisplayRegistry,
}

impl AppContext {
    /// Create a context from the loaded configuration
    pub async fn new() -> Result<Self> {
        Self::new_with_config(config::load()?).await
    }

    /// Create a context with file stores under the configured directories
    /// and restore any persisted sessions.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let durable: Arc<DynKeyValueStore> = Arc::new(FileStore::new(&config.storage.data_dir));
        let ephemeral: Arc<DynKeyValueStore> =
            Arc::new(FileStore::new(&config.storage.session_dir));
        let http = HttpClient::builder()
            .user_agent(concat!("panelpost/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let context = Self::with_stores(config, durable, ephemeral, http);
        context.restore_sessions().await?;
        Ok(context)
    }

    /// Assemble a context over explicit stores and HTTP client.
    ///
    /// Nothing is read from the stores; call [`Self::restore_sessions`].
    pub fn with_stores(
        config: Config,
        durable: Arc<DynKeyValueStore>,
        ephemeral: Arc<DynKeyValueStore>,
        http: HttpClient,
    ) -> Self {
        let oauth = OAuthClient::new(http.clone());
        let password = PasswordAuthClient::new(http.clone());

        Self {
            sessions: SessionPersistence::new(
                Arc::clone(&durable),
                Arc::clone(&ephemeral),
                SessionCache::new(),
            ),
            pending: PendingAuthorizationStore::new(Arc::clone(&ephemeral)),
            scheduler_store: Arc::new(KvSchedulerStore::new(Arc::clone(&durable))),
            refresher: AtProtoRefresher::new(oauth.clone(), password.clone()),
            xrpc: XrpcClient::new(http),
            oauth,
            password,
            compressor: Arc::new(ImageReencoder),
            registry: DisplayRegistry::new(),
            durable,
            ephemeral,
            config,
        }
    }

    /// Load persisted sessions into the cache.
    pub async fn restore_sessions(&self) -> Result<()> {
        let oauth = self.sessions.load().await?;
        let app_password = self.sessions.load_app_password().await?;
        debug!(oauth = oauth.is_some(), app_password = app_password.is_some(), "sessions restored");
        Ok(())
    }

    pub fn session_cache(&self) -> &SessionCache {
        self.sessions.cache()
    }

    /// A usable context for posting, refreshing tokens that are about to
    /// expire and persisting whatever replaced them.
    ///
    /// # Errors
    ///
    /// `Auth` when nobody is signed in; refresh failures propagate.
    #[instrument(skip(self))]
    pub async fn fresh_auth_context(&self) -> Result<AuthContext> {
        let cache = self.session_cache();
        let cached = cache.get();
        let app_password = cache.app_password();
        let input = FreshnessInput {
            session: cached.as_ref().map(|c| &c.session),
            key_pair: cached.as_ref().map(|c| &c.key_pair),
            oauth_config: self.config.oauth.as_ref(),
            app_password: app_password.as_ref(),
        };

        let now_ms = chrono::Utc::now().timestamp_millis();
        let fresh = ensure_fresh_auth_context(input, &self.refresher, now_ms).await?;

        if fresh.refreshed {
            if let (Some(session), Some(AuthContext::OAuth { key_pair, .. })) =
                (&fresh.session, &fresh.context)
            {
                self.sessions.persist(session, key_pair).await?;
            }
            if let Some(app_password) = &fresh.app_password {
                self.sessions.persist_app_password(app_password).await?;
            }
            info!("Refreshed session persisted");
        }

        fresh.context.ok_or_else(|| PanelPostError::Auth("Not signed in".into()))
    }

    pub fn poster(&self, auth: AuthContext) -> PosterService {
        let api = Arc::new(self.xrpc.clone());
        PosterService::new(auth, api, Arc::clone(&self.compressor))
    }

    /// Posting options from the configured budget and concurrency.
    pub fn post_options(&self) -> PostOptions {
        PostOptions::from(&self.config.posting)
    }

    /// Engine that replays due entries through this context.
    pub fn scheduler_engine(self: &Arc<Self>) -> SchedulerEngine {
        SchedulerEngine::new(
            self.scheduler_store.clone(),
            Arc::new(ScheduledThreadHandler::new(Arc::clone(self))),
            self.registry.clone(),
            SchedulerEngineConfig::from(&self.config.scheduler),
        )
    }
}
