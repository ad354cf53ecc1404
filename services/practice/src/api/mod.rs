//! Practice HTTP API module.
//!
//! # Purpose
//! Route handlers, request/response types, the bearer-token caller extractor
//! and the OpenAPI document.
pub mod accounts;
pub mod articles;
pub mod bookings;
pub mod bootstrap;
pub mod error;
pub mod extract;
pub mod openapi;
pub mod system;
pub mod types;
