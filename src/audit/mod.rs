//! Audit logging for Kesef
//!
//! Every create, update, delete and repair made through the services is
//! appended to a JSONL log with before/after snapshots and a field diff.
//!
//! ```rust,ignore
//! use kesef::audit::{AuditEntry, AuditLogger, EntityType};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::create(EntityType::Category, id, Some(name), &category))?;
//! ```

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
