//! # TaskStream Auth API Server
//!
//! HTTP surface for the TaskStream AI authentication core: login, token
//! verification, refresh, and logout over the shared auth service.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
