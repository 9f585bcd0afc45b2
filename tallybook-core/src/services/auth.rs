//! Auth service - login and logout against the user repository

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::Identity;
use crate::ports::UserRepository;

use super::session::SessionStore;

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    session: SessionStore,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, session: SessionStore) -> Self {
        Self { users, session }
    }

    /// Check the credentials and start a session for the matching user
    ///
    /// A failed login leaves any existing session untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let identity = self.users.authenticate(email.trim(), password).await?;
        self.session.start_session(identity.clone());
        tracing::info!(user_id = identity.id, "signed in");
        Ok(identity)
    }

    /// End the current session, returning the identity that was signed in
    pub fn logout(&self) -> Option<Identity> {
        let previous = self.session.current_identity();
        if previous.is_some() {
            self.session.end_session();
        }
        previous
    }
}
