//! Session lifecycle.
//!
//! A [`Session`] binds a server-issued token to one server URL. The
//! [`SessionRegistry`] keeps every live session in registration order;
//! resolution of the implicit "default" session is first-wins.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 Client                  │
//! │   resolve_session / connect / disconnect│
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SessionRegistry              │
//! │  id → Session {url, user, bytes, cache} │
//! └─────────────────────────────────────────┘
//! ```

mod registry;

pub use registry::{Session, SessionRegistry};
