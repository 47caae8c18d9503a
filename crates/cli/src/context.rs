//! Application context - wires everything together

use anyhow::Context;
use artvault_approval::ApprovalWorkflow;
use artvault_auth::IdentityStore;
use artvault_bus::{dispatch, EventBus, LoggingSubscriber};
use artvault_config::AppConfig;
use artvault_core::Role;
use artvault_market::Gallery;
use artvault_oracle::RateService;
use artvault_store::{SessionRecord, Store};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Application context - owns the store and every service built on it
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<Store>,
    pub rates: Arc<RateService>,
    pub bus: Arc<EventBus>,
    pub identities: IdentityStore,
    pub approvals: ApprovalWorkflow,
    pub gallery: Gallery,
    event_log: Option<JoinHandle<u64>>,
}

impl AppContext {
    /// Open the configured database and build the services
    pub fn new(config: AppConfig) -> Result<Self, anyhow::Error> {
        let store = Store::open(&config.storage.path).with_context(|| {
            format!("opening database {}", config.storage.path.display())
        })?;
        Self::with_store(config, store)
    }

    /// Build the services over an already opened store
    pub fn with_store(config: AppConfig, store: Store) -> Result<Self, anyhow::Error> {
        let rates = RateService::from_config(&config.rates).context("building rate service")?;
        Ok(Self::with_parts(config, store, rates))
    }

    /// Build the services from a store and a rate service
    pub fn with_parts(config: AppConfig, store: Store, rates: RateService) -> Self {
        let store = Arc::new(store);
        let rates = Arc::new(rates);
        let bus = Arc::new(EventBus::new(store.clone()));

        let identities = IdentityStore::new(store.clone(), &config.auth);
        let approvals = ApprovalWorkflow::new(store.clone(), rates.clone(), bus.clone());
        let gallery = Gallery::new(store.clone(), rates.clone(), bus.clone(), &config.fees);

        Self {
            config,
            store,
            rates,
            bus,
            identities,
            approvals,
            gallery,
            event_log: None,
        }
    }

    /// Log every published balance event from a background task
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start_event_log(&mut self) {
        if self.event_log.is_some() {
            return;
        }
        let rx = self.bus.subscribe();
        self.event_log = Some(tokio::spawn(async move {
            dispatch(rx, &LoggingSubscriber).await
        }));
    }

    /// Active session of a role, or an error telling the user to log in
    pub fn require_session(&self, role: Role) -> Result<SessionRecord, anyhow::Error> {
        self.identities
            .current_session(role)?
            .ok_or_else(|| match role {
                Role::Admin => anyhow::anyhow!("Admin login required: run `artvault login --admin`"),
                Role::User => anyhow::anyhow!("No user is logged in: run `artvault login`"),
            })
    }

    /// Drop every service and wait for the event log to drain
    pub async fn shutdown(mut self) {
        let event_log = self.event_log.take();
        drop(self);

        if let Some(handle) = event_log {
            match handle.await {
                Ok(count) => tracing::debug!(count, "Event log drained"),
                Err(e) => tracing::warn!(error = %e, "Event log task failed"),
            }
        }
    }
}
