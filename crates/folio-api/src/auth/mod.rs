//! Authentication collaborator
//!
//! The upload route only needs "who is this?": an [`Authenticator`] turns a
//! bearer token into an [`Identity`] or rejects it. The shipped implementation
//! compares against a single configured token.

pub mod authenticator;
pub mod middleware;
pub mod models;

pub use authenticator::{Authenticator, StaticTokenAuthenticator};
pub use models::{AuthenticatedUser, Identity};
