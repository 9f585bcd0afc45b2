//! Durable session storage port

use crate::domain::result::Result;
use crate::domain::Identity;

/// Storage that keeps the signed-in identity across restarts
pub trait SessionStorage: Send + Sync {
    fn put(&self, identity: &Identity) -> Result<()>;

    fn get(&self) -> Result<Option<Identity>>;

    fn clear(&self) -> Result<()>;
}
