//! Tallybook Core - business logic for personal finance entries
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: entries, drafts, identities, routes and their validation
//! - **ports**: traits for persistence and session storage
//! - **services**: session, authorization gate, entry lifecycle and friends
//! - **adapters**: DuckDB store, REST client, session files

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::rest::RestClient;
use adapters::session_file::FileSessionStorage;
use config::{Backend, Config};
use ports::{BalanceProvider, EntryRepository, SessionStorage, UserRepository};
use services::*;

pub use domain::result::Error;
pub use domain::{
    EntryDraft, EntryField, EntryFilter, EntryStatus, EntryType, FinancialEntry, Identity,
    NewUser, Route,
};
pub use services::{EntryPoint, LogEvent, LoggingService};

pub const STORE_FILE: &str = "tallybook.duckdb";

/// The persistence ports a context runs against
#[derive(Clone)]
pub struct Ports {
    pub entries: Arc<dyn EntryRepository>,
    pub users: Arc<dyn UserRepository>,
    pub balances: Arc<dyn BalanceProvider>,
}

impl Ports {
    /// All three ports served by one backend
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: EntryRepository + UserRepository + BalanceProvider + 'static,
    {
        Self {
            entries: backend.clone(),
            users: backend.clone(),
            balances: backend,
        }
    }

    fn open(config: &Config, data_dir: &Path) -> Result<Self> {
        match config.backend {
            Backend::Local => {
                let repository = DuckDbRepository::new(&data_dir.join(STORE_FILE))?;
                repository.ensure_schema()?;
                Ok(Self::shared(Arc::new(repository)))
            }
            Backend::Remote => Ok(Self::shared(Arc::new(RestClient::new(&config.api_url)?))),
        }
    }
}

/// Main context for Tallybook operations
///
/// Holds the configuration, the application session and every service,
/// all wired to the same persistence ports.
pub struct TallybookContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub session: SessionStore,
    pub gate: AuthorizationGate,
    pub auth_service: AuthService,
    pub registration_service: RegistrationService,
    pub balance_service: BalanceService,
    pub query_service: EntryQueryService,
    ports: Ports,
}

impl TallybookContext {
    /// Open the context for `data_dir`, restoring a saved session if any
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;
        let ports = Ports::open(&config, data_dir)?;
        let storage = Arc::new(FileSessionStorage::new(data_dir));
        Ok(Self::from_parts(config, data_dir, ports, storage))
    }

    /// Wire a context from explicit parts
    pub fn from_parts(
        config: Config,
        data_dir: &Path,
        ports: Ports,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let session = SessionStore::new(storage);
        session.restore();

        Self {
            gate: AuthorizationGate::new(session.clone()),
            auth_service: AuthService::new(Arc::clone(&ports.users), session.clone()),
            registration_service: RegistrationService::new(Arc::clone(&ports.users)),
            balance_service: BalanceService::new(Arc::clone(&ports.balances)),
            query_service: EntryQueryService::new(Arc::clone(&ports.entries)),
            session,
            config,
            data_dir: data_dir.to_path_buf(),
            ports,
        }
    }

    /// A fresh entry form bound to this context's session
    pub fn new_lifecycle(&self) -> EntryLifecycle {
        EntryLifecycle::new(Arc::clone(&self.ports.entries), self.session.clone())
    }

    /// Ask the gate whether `route` may be opened
    pub fn navigate(&self, route: Route) -> Decision {
        self.gate.check(route)
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }
}
