/// Database layer
///
/// Connection pooling for the shared Postgres instance. The auth core only
/// reads and updates the `users` table; schema ownership and migrations
/// belong to the user-management subsystem.

pub mod pool;
