//! Core library for the document workflow automation service.
//!
//! The interesting machinery lives under [`workflows::documents`]: the
//! per-document-type state machines, the counterparty matcher, the duplicate
//! detector, and the automation safety gate that decides whether a document
//! may be linked or have a draft record created in the ERP.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
