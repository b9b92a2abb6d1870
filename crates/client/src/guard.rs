//! Role-gated access.
//!
//! Decides whether the current session may see a protected page.

use marketplace_core::Role;
use marketplace_core::models::User;

use crate::session::Session;

/// Where denied visitors are sent.
pub const DENIED_REDIRECT: &str = "/";

/// What a page requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, logged in or not.
    Public,
    /// Any logged-in user.
    Authenticated,
    /// A logged-in user with this role.
    Role(Role),
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No token, or no user stored with it.
    Unauthenticated,
    /// Logged in, but with another role.
    Unauthorized { required: Role, actual: Role },
}

impl Denial {
    /// Page to redirect to. Both denials currently lead to the home page.
    #[must_use]
    pub const fn redirect(&self) -> &'static str {
        DENIED_REDIRECT
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Allowed; carries the user when one is logged in.
    Granted(Option<User>),
    Denied(Denial),
}

impl Access {
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Check `session` against `requirement`.
///
/// A token without a stored user counts as logged out.
#[must_use]
pub fn check(session: &Session, requirement: Requirement) -> Access {
    let user = session.user.as_ref().filter(|_| session.has_token());

    match (requirement, user) {
        (Requirement::Public, user) => Access::Granted(user.cloned()),
        (_, None) => Access::Denied(Denial::Unauthenticated),
        (Requirement::Authenticated, Some(user)) => Access::Granted(Some(user.clone())),
        (Requirement::Role(required), Some(user)) if user.role == required => {
            Access::Granted(Some(user.clone()))
        }
        (Requirement::Role(required), Some(user)) => Access::Denied(Denial::Unauthorized {
            required,
            actual: user.role,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::{Email, UserId};
    use secrecy::SecretString;

    use super::*;

    fn user(role: Role) -> User {
        User {
            id: UserId::new("u1"),
            fullname: "Test".to_string(),
            email: Email::parse("test@example.com").unwrap(),
            role,
        }
    }

    fn session(token: bool, user: Option<User>) -> Session {
        Session {
            token: token.then(|| SecretString::from("tok".to_string())),
            user,
        }
    }

    #[test]
    fn test_no_token_is_denied() {
        let access = check(&session(false, Some(user(Role::Admin))), Requirement::Authenticated);
        assert_eq!(access, Access::Denied(Denial::Unauthenticated));
    }

    #[test]
    fn test_no_user_is_denied() {
        let access = check(&session(true, None), Requirement::Role(Role::Admin));
        assert_eq!(access, Access::Denied(Denial::Unauthenticated));
    }

    #[test]
    fn test_role_mismatch_is_unauthorized() {
        let access = check(&session(true, Some(user(Role::Shopper))), Requirement::Role(Role::Admin));
        let Access::Denied(denial) = access else {
            panic!("expected denial");
        };
        assert_eq!(
            denial,
            Denial::Unauthorized {
                required: Role::Admin,
                actual: Role::Shopper
            }
        );
        assert_eq!(denial.redirect(), "/");
        assert_eq!(Denial::Unauthenticated.redirect(), "/");
    }

    #[test]
    fn test_matching_role_is_granted() {
        let access = check(&session(true, Some(user(Role::Seller))), Requirement::Role(Role::Seller));
        assert!(access.is_granted());
    }

    #[test]
    fn test_public_needs_nothing() {
        assert_eq!(
            check(&Session::default(), Requirement::Public),
            Access::Granted(None)
        );
    }
}
