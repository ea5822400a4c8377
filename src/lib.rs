//! Deepfake detection gateway
//!
//! Accepts video uploads, forwards them to an external inference backend
//! when one is configured and normalizes its verdicts, or fabricates mock
//! results when it is not. Also ships the upload client used to talk to the
//! gateway.

pub mod app_state;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
