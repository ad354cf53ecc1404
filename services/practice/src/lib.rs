//! Wellness-practice backend library crate.
//!
//! # Purpose
//! Exposes the booking, account and blog API surface, together with the
//! identity, notification and storage backends it runs on, for use by the
//! binary and tests.
//!
//! # Notes
//! Handlers in `api` stay thin; the rules live in `service`.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod identity;
pub mod model;
pub mod notify;
pub mod observability;
pub mod service;
pub mod store;
