pub mod account;
pub mod post;
pub mod session;
pub mod user;
pub mod verification;
