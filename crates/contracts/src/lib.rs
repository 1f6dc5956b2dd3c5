//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Identity Model
//! - `Email::id` is the idempotency key, assigned by the caller
//! - Backend names are diagnostic labels only

mod backend;
mod blueprint;
mod email;
mod error;

pub use backend::*;
pub use blueprint::*;
pub use email::*;
pub use error::*;
