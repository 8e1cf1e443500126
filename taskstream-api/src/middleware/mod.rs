/// Middleware modules for the API server
///
/// - `security`: OWASP-recommended response headers

pub mod security;
