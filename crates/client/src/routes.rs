//! Route table.
//!
//! Maps a path to a page and applies the guard for that page.

use marketplace_core::{ProductId, Role};

use crate::guard::{self, Access, Requirement};
use crate::session::Session;

/// Pages of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Products,
    ProductDetail(ProductId),
    ClientDashboard,
    ClientProfile,
    ClientOrders,
    Cart,
    SellerDashboard,
    AdminDashboard,
    AdminProducts,
    AdminCategories,
    AdminUsers,
    AdminFeedback,
    Orders,
    DeletedOrders,
}

impl Route {
    /// Parse a path such as `/products/42?tab=reviews`.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["signup"] => Self::Signup,
            ["products"] => Self::Products,
            ["products", id] => Self::ProductDetail(ProductId::new(*id)),
            ["client"] => Self::ClientDashboard,
            ["client", "profile"] => Self::ClientProfile,
            ["client", "orders"] => Self::ClientOrders,
            ["cart"] => Self::Cart,
            ["seller"] => Self::SellerDashboard,
            ["admin"] => Self::AdminDashboard,
            ["admin", "products"] => Self::AdminProducts,
            ["admin", "categories"] => Self::AdminCategories,
            ["admin", "users"] => Self::AdminUsers,
            ["admin", "feedback"] => Self::AdminFeedback,
            ["orders"] => Self::Orders,
            ["orders", "deleted"] => Self::DeletedOrders,
            _ => return None,
        };
        Some(route)
    }

    /// Who may see the page.
    #[must_use]
    pub const fn requirement(&self) -> Requirement {
        match self {
            Self::Home | Self::Login | Self::Signup | Self::Products | Self::ProductDetail(_) => {
                Requirement::Public
            }
            Self::ClientDashboard | Self::ClientProfile | Self::ClientOrders | Self::Cart => {
                Requirement::Authenticated
            }
            Self::SellerDashboard => Requirement::Role(Role::Seller),
            Self::AdminDashboard
            | Self::AdminProducts
            | Self::AdminCategories
            | Self::AdminUsers
            | Self::AdminFeedback
            | Self::Orders
            | Self::DeletedOrders => Requirement::Role(Role::Admin),
        }
    }
}

/// Result of navigating to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(&'static str),
    NotFound,
}

/// Resolve `path` for the given session.
#[must_use]
pub fn navigate(path: &str, session: &Session) -> Navigation {
    let Some(route) = Route::parse(path) else {
        return Navigation::NotFound;
    };
    match guard::check(session, route.requirement()) {
        Access::Granted(_) => Navigation::Render(route),
        Access::Denied(denial) => Navigation::Redirect(denial.redirect()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::models::User;
    use marketplace_core::{Email, UserId};
    use secrecy::SecretString;

    use super::*;

    fn logged_in(role: Role) -> Session {
        Session {
            token: Some(SecretString::from("tok".to_string())),
            user: Some(User {
                id: UserId::new("u1"),
                fullname: "Test".to_string(),
                email: Email::parse("test@example.com").unwrap(),
                role,
            }),
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse(""), Some(Route::Home));
        assert_eq!(
            Route::parse("/products/abc123?ref=home"),
            Some(Route::ProductDetail(ProductId::new("abc123")))
        );
        assert_eq!(Route::parse("/orders/deleted/"), Some(Route::DeletedOrders));
        assert_eq!(Route::parse("/admin/unknown"), None);
    }

    #[test]
    fn test_public_pages_render_when_logged_out() {
        let session = Session::default();
        assert_eq!(navigate("/", &session), Navigation::Render(Route::Home));
        assert_eq!(
            navigate("/products", &session),
            Navigation::Render(Route::Products)
        );
    }

    #[test]
    fn test_protected_pages_redirect_home() {
        let session = Session::default();
        assert_eq!(navigate("/client", &session), Navigation::Redirect("/"));
        assert_eq!(navigate("/cart", &session), Navigation::Redirect("/"));

        let shopper = logged_in(Role::Shopper);
        assert_eq!(navigate("/admin/users", &shopper), Navigation::Redirect("/"));
        assert_eq!(navigate("/seller", &shopper), Navigation::Redirect("/"));
        assert_eq!(
            navigate("/client/orders", &shopper),
            Navigation::Render(Route::ClientOrders)
        );
    }

    #[test]
    fn test_admin_pages() {
        let admin = logged_in(Role::Admin);
        assert_eq!(
            navigate("/orders/deleted", &admin),
            Navigation::Render(Route::DeletedOrders)
        );
        assert_eq!(
            navigate("/admin/feedback", &admin),
            Navigation::Render(Route::AdminFeedback)
        );
    }

    #[test]
    fn test_unknown_path() {
        assert_eq!(navigate("/nope", &Session::default()), Navigation::NotFound);
    }
}
