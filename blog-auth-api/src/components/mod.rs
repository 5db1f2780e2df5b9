//! Headless UI components: state machines and view models, no rendering.

pub mod auth_form;
pub mod navbar;

pub use auth_form::{AuthForm, FormError, LoadingFlag, SubmitOutcome};
pub use navbar::{Navbar, NavbarView, UserBadge};

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";

/// Page navigation performed by the host environment.
pub trait Navigator {
    /// Full page load of `path`, discarding in-memory client state.
    fn hard_navigate(&mut self, path: &str);
}
