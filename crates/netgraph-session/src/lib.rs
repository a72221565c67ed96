//! FortiManager session-token cache.
//!
//! FortiManager JSON-RPC sessions last about 30 minutes and every login
//! costs a round trip plus an audit-log entry on the manager. This crate
//! keeps the token from a successful login in a shared key/value store
//! (Redis) so every poller process reuses it, and forgets it before the
//! manager would.
//!
//! ```text
//!            login ok                 soft TTL / invalidate / logout
//!  ABSENT ─────────────► CACHED ──────────────────────────────────► ABSENT
//! ```
//!
//! When the shared store is unreachable the cache switches to an
//! in-process map with the same TTL behaviour. Callers never see
//! backend errors; a miss just means "log in".
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SC-23: Session Authenticity - Tokens are only reused within their soft lifetime
//! - AC-12: Session Termination - Explicit invalidate and logout paths
//! - IA-11: Re-authentication - Rejected tokens force a fresh login

pub mod broker;
pub mod cache;
pub mod clock;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use broker::{Authenticator, Session, SessionBroker, SessionOrigin};
pub use cache::{CacheMode, CachedSession, SessionCache, SessionKey, DEFAULT_SOFT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, Result, StoreError};
pub use memory::MemoryStore;
pub use redis_store::{RedisConfig, RedisStore};
pub use store::SessionStore;
