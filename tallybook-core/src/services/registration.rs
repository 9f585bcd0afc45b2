//! Registration service - validated user sign-up

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::{validate_registration, Identity, NewUser};
use crate::ports::UserRepository;

pub struct RegistrationService {
    users: Arc<dyn UserRepository>,
}

impl RegistrationService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Validate the sign-up form and create the user
    ///
    /// Validation failures come back as `Error::Validation` carrying every
    /// violated rule; the repository is only called for a valid form. The new
    /// user is not signed in.
    pub async fn register(&self, user: NewUser) -> Result<Identity> {
        validate_registration(&user)?;

        let user = NewUser {
            name: user.name.trim().to_string(),
            email: user.email.trim().to_string(),
            ..user
        };
        let identity = self.users.create(&user).await?;
        tracing::info!(user_id = identity.id, "user registered");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::domain::result::Error;
    use crate::domain::validation::{EMAIL_INVALID, NAME_REQUIRED, PASSWORDS_DO_NOT_MATCH};

    #[derive(Default)]
    struct CountingUsers {
        creates: AtomicUsize,
    }

    #[async_trait]
    impl UserRepository for CountingUsers {
        async fn create(&self, user: &NewUser) -> Result<Identity> {
            let n = self.creates.fetch_add(1, Ordering::SeqCst) as i64;
            Ok(Identity::new(n + 1, &user.name, &user.email))
        }

        async fn authenticate(&self, _email: &str, _password: &str) -> Result<Identity> {
            Err(Error::authentication("not supported"))
        }
    }

    #[tokio::test]
    async fn test_register_valid_user() {
        let users = Arc::new(CountingUsers::default());
        let service = RegistrationService::new(users.clone());

        let identity = service
            .register(NewUser::new(" Ana ", "ana@example.com ", "secret", "secret"))
            .await
            .unwrap();

        assert_eq!(identity, Identity::new(1, "Ana", "ana@example.com"));
        assert_eq!(users.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_sent() {
        let users = Arc::new(CountingUsers::default());
        let service = RegistrationService::new(users.clone());

        let err = service
            .register(NewUser::new("", "not-an-email", "secret", "other"))
            .await
            .unwrap_err();

        let Error::Validation(invalid) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            invalid.messages,
            vec![NAME_REQUIRED, EMAIL_INVALID, PASSWORDS_DO_NOT_MATCH]
        );
        assert_eq!(users.creates.load(Ordering::SeqCst), 0);
    }
}
