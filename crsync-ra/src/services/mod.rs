//! Reconciliation core services
//!
//! Everything here is trigger-agnostic: the HTTP surface and the host
//! scheduler call in, nothing calls out.

pub mod call_log_matcher;
pub mod duration_probe;
pub mod filename_parser;
pub mod recording_scanner;
pub mod remote_client;
pub mod sync_orchestrator;
