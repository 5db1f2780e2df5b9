//! # blog-auth-api
//!
//! Shared types for the blog-auth service and the client side of its
//! email/password authentication.
//!
//! ## Contents
//!
//! - Request and response DTOs of the `/api/auth` endpoints
//! - Error response format (`ErrorResponse`) and persistence error codes
//! - Login/signup validation schemas, used by both client and server
//! - `AuthClient` binding and its HTTP implementation
//! - `SessionStore`, the observable client-side session state
//! - Headless `AuthForm` and `Navbar` components
//!
//! ## Example
//!
//! ```rust,no_run
//! use blog_auth_api::components::{AuthForm, Navbar};
//! use blog_auth_api::{HttpAuthClient, session_store};
//!
//! let store = session_store::init_global();
//! let client = HttpAuthClient::new("http://localhost:8080", store.clone());
//! let navbar = Navbar::mount(&store);
//! let form = AuthForm::new();
//! # let _ = (client, navbar, form);
//! ```

pub mod client;
pub mod components;
pub mod error;
pub mod requests;
pub mod responses;
pub mod session_store;
pub mod validation;

// Re-exports for convenient access
pub use client::{AuthClient, ClientError, HttpAuthClient};
pub use error::{ErrorResponse, store_codes};
pub use requests::*;
pub use responses::*;
pub use session_store::{SessionState, SessionStore, Subscription};
pub use validation::{Field, FormMode};
