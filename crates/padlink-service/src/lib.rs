//! # padlink-service - DartPad Service Client
//!
//! Talks to the remote DartPad `/api/v3` service: compile (full and hot
//! reload), analyze, format, complete, version and the AI code endpoints.
//!
//! Depends on [`padlink_core`] for payload types and error handling.
//!
//! ## Public API
//!
//! - [`DartServices`] / [`LocalDartServices`] - Service trait consumed by the app layer
//! - [`DartServicesClient`] - reqwest implementation
//! - [`Channel`] - Release channel → host URL resolution
//! - [`Endpoint`] - Endpoint names and paths
//! - `test_utils::FakeDartServices` - Scripted fake (feature `test-helpers`)

pub mod channel;
pub mod client;
pub mod services;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use channel::{Channel, Endpoint, LOCAL_HOST_URL};
pub use client::{DartServicesClient, DEFAULT_REQUEST_TIMEOUT, REQUEST_CONTENT_TYPE};
pub use services::{DartServices, LocalDartServices};
