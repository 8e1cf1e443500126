/// Symmetric encryption for secrets at rest
///
/// - [`cipher`]: AES-256-GCM encrypt/decrypt with explicit IV and tag fields
/// - [`keys`]: Versioned key material with scheduled rotation
///
/// Encryption here covers data the service must read back (MFA secrets,
/// stored integration credentials); password hashing is one-way and lives in
/// [`crate::auth::password`].

pub mod cipher;
pub mod keys;
