//! Core firewall rule management
//!
//! - [`firewall`]: Entities, closed enums and raw candidates
//! - [`rule_constraints`]: Predicates behind the port and IP-family invariants
//! - [`store`]: SQLite persistence with scoped lookups and cascading deletes
//! - [`pagination`]: Page requests, page responses and sort keys
//! - [`error`]: Error types and the constraint-to-message mapping
//! - [`service`]: Use cases composing validation, storage and auditing

pub mod error;
pub mod firewall;
pub mod pagination;
pub mod rule_constraints;
pub mod service;
pub mod store;

#[cfg(test)]
pub mod test_helpers;
