//! # csvsense API
//!
//! HTTP front end: one table per session, embeddings computed in the
//! background, questions answered against the session's current table.

pub mod rest;
pub mod session;

pub use rest::RestApi;
pub use session::{LoadStatus, SessionError, SessionId, SessionInfo, SessionStore, Upload};
