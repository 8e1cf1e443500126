/// Session store: shared token/blacklist/rate-limit state
///
/// All cross-instance auth state lives in a shared key/value store. This
/// module provides:
///
/// - [`client`]: Redis connection wrapper with health checks
/// - [`session`]: The `SessionStore` trait plus Redis and in-memory backends
/// - [`breaker`]: Circuit breaker shielding callers from store outages
/// - [`tokens`]: The token store gateway (active records and blacklist)
///
/// Correctness under horizontal scaling relies on single-key atomic writes
/// in the backing store, not on in-process locking.

pub mod breaker;
pub mod client;
pub mod session;
pub mod tokens;
