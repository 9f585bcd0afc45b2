//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
mod balance;
pub mod gate;
pub mod lifecycle;
pub mod logging;
pub mod migration;
pub mod observer;
mod query;
mod registration;
pub mod session;

pub use auth::AuthService;
pub use balance::{BalanceService, BalanceSummary};
pub use gate::{authorize, AuthorizationGate, Decision};
pub use lifecycle::{EntryLifecycle, LifecycleSnapshot, LifecycleState, Notification, Outcome};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use query::{net_total, EntryQueryService};
pub use registration::RegistrationService;
pub use session::{Session, SessionStore};
