//! User administration.
//!
//! Admin-created accounts go through [`UserForm`], which is validated before
//! anything is sent.

use std::sync::Arc;

use marketplace_core::models::{NewUser, Page, User};
use marketplace_core::{Email, EmailError, Role, RoleParseError, UserId};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryFamily, QueryKey};
use crate::error::{ClientError, Result};
use crate::notify::Notifier;
use crate::service::Backend;

const USER_LIST_KEYS: &[&str] = &["data", "users"];
const USER_KEYS: &[&str] = &["data", "user"];

/// Why a user form was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("full name is required")]
    MissingFullname,
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
    #[error(transparent)]
    Role(#[from] RoleParseError),
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

impl From<FormError> for ClientError {
    fn from(err: FormError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Raw user form input, as typed.
#[derive(Debug, Clone, Default)]
pub struct UserForm {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl UserForm {
    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Check the form and build the request payload.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, checking name, email, role and then
    /// password.
    pub fn validate(&self) -> std::result::Result<NewUser, FormError> {
        let fullname = self.fullname.trim();
        if fullname.is_empty() {
            return Err(FormError::MissingFullname);
        }
        let email = Email::parse(&self.email)?;
        let role: Role = self.role.parse()?;
        if self.password.chars().count() < Self::MIN_PASSWORD_LENGTH {
            return Err(FormError::PasswordTooShort {
                min: Self::MIN_PASSWORD_LENGTH,
            });
        }
        Ok(NewUser {
            fullname: fullname.to_string(),
            email,
            password: self.password.clone(),
            role,
        })
    }
}

#[derive(Serialize)]
struct RoleBody {
    role: Role,
}

/// Admin user management.
#[derive(Clone)]
pub struct UserService {
    backend: Backend,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

impl UserService {
    #[must_use]
    pub fn new(api: ApiClient, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend: Backend::new(api, cache, notifier),
        }
    }

    /// One page of accounts.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32) -> Result<Page<User>> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::Users { page },
                |value| match value {
                    CacheValue::Users(page) => Some(page),
                    _ => None,
                },
                CacheValue::Users,
                async {
                    api.get_query("/users", &[("page", page.max(1).to_string())])
                        .await?
                        .page(USER_LIST_KEYS, page)
                },
            )
            .await
    }

    /// Validate the form and create the account.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without sending anything if the form is invalid,
    /// otherwise the request or decoding error.
    #[instrument(skip(self, form))]
    pub async fn create(&self, form: &UserForm) -> Result<User> {
        let new_user = form.validate()?;
        let result = async {
            self.backend
                .api
                .post("/users", &new_user)
                .await?
                .field::<User>(USER_KEYS)
        }
        .await;
        self.backend
            .settle(result, QueryFamily::Users, "User created", "Cannot create user")
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn update_role(&self, id: &UserId, role: Role) -> Result<()> {
        let result = self
            .backend
            .api
            .patch(&format!("/users/{id}/role"), &RoleBody { role })
            .await
            .map(|_| ());
        self.backend
            .settle(result, QueryFamily::Users, "Role updated", "Cannot update role")
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &UserId) -> Result<()> {
        let result = self
            .backend
            .api
            .delete(&format!("/users/{id}"))
            .await
            .map(|_| ());
        self.backend
            .settle(result, QueryFamily::Users, "User deleted", "Cannot delete user")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> UserForm {
        UserForm {
            fullname: "  Youssef Amrani ".to_string(),
            email: "youssef@example.com".to_string(),
            password: "hunter22".to_string(),
            role: "seller".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let user = form().validate().unwrap();
        assert_eq!(user.fullname, "Youssef Amrani");
        assert_eq!(user.role, Role::Seller);
    }

    #[test]
    fn test_missing_fullname() {
        let mut form = form();
        form.fullname = "   ".to_string();
        assert_eq!(form.validate().unwrap_err(), FormError::MissingFullname);
    }

    #[test]
    fn test_invalid_email() {
        let mut form = form();
        form.email = "not-an-email".to_string();
        assert!(matches!(form.validate().unwrap_err(), FormError::Email(_)));
    }

    #[test]
    fn test_role_must_be_known() {
        let mut form = form();
        form.role = "superuser".to_string();
        assert!(matches!(form.validate().unwrap_err(), FormError::Role(_)));

        form.role = "user".to_string();
        assert_eq!(form.validate().unwrap().role, Role::Shopper);
    }

    #[test]
    fn test_short_password() {
        let mut form = form();
        form.password = "abc".to_string();
        assert_eq!(
            form.validate().unwrap_err(),
            FormError::PasswordTooShort { min: 6 }
        );
    }

    #[test]
    fn test_form_error_becomes_validation_error() {
        let err: ClientError = FormError::MissingFullname.into();
        assert!(matches!(err, ClientError::Validation(msg) if msg == "full name is required"));
    }
}
