use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use bookshop_types::{NewUser, User};

use crate::error::{Result, StoreError};
use crate::password::{hash_password, verify_password};
use crate::store::RecordStore;

/// Signup and login over the user table.
pub struct UserDirectory {
    store: RecordStore<User>,
}

impl UserDirectory {
    pub fn new(store: RecordStore<User>) -> Self {
        Self { store }
    }

    /// Register a new user. The email must not be taken yet (exact,
    /// case-sensitive comparison).
    pub fn signup(&self, new_user: NewUser) -> Result<User> {
        new_user.validate().map_err(StoreError::InvalidInput)?;

        // Hash outside the table lock.
        let password_hash = hash_password(&new_user.password)?;

        let user = self.store.modify(|users| {
            if users.iter().any(|u| u.email == new_user.email) {
                return Err(StoreError::DuplicateEmail);
            }

            let user = User {
                id: Uuid::new_v4(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                email: new_user.email,
                password_hash,
                role: new_user.role,
                created_at: Utc::now(),
            };
            users.push(user.clone());
            Ok(user)
        })?;

        info!("User {} signed up as {}", user.id, user.role);
        Ok(user)
    }

    /// Return the first user, in table order, whose email matches and whose
    /// stored hash accepts `password`.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        for user in self.store.read_all()? {
            if user.email == email && verify_password(password, &user.password_hash)? {
                info!("User {} logged in", user.id);
                return Ok(user);
            }
        }

        warn!("Failed login attempt for {}", email);
        Err(StoreError::InvalidCredentials)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.store.read_all()?.into_iter().find(|u| u.id == id))
    }
}
