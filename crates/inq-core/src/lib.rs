//! # inq-core
//!
//! Core types, ID generation, and error types for Inquest.
//!
//! This crate provides the foundational types shared across all Inquest crates:
//! - Entity structs for investigations, anomalies, and audit entries
//! - Status enums with state machine transitions
//! - The investigation lifecycle (`start`, `advance`, `complete`, `fail`)
//! - ID prefix constants and generation
//! - Cross-cutting error types
//! - Lifecycle event envelope for JSONL persistence
//! - Audit detail sub-types

pub mod audit_detail;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod lifecycle;
pub mod trail;
