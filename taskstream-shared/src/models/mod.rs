/// Data models and data-access interfaces
///
/// The auth core does not own the user-management subsystem; it consumes the
/// user table through the `UserStore` interface defined here.

pub mod user;
