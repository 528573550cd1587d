//! Entity structs for Inquest domain objects.
//!
//! Each entity maps to a table in the libSQL database (see `inq-db/migrations`).
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip
//! and schema validation.

mod anomaly;
mod audit;
mod investigation;

pub use anomaly::{Anomaly, NewAnomaly};
pub use audit::AuditEntry;
pub use investigation::{Investigation, NewInvestigation};
