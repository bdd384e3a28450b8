//! fireflow - firewall policy and rule management
//!
//! Defines firewalls, their filtering policies and the ordered rules inside
//! each policy, persisted in SQLite.
//!
//! # Architecture
//!
//! - [`core`] - Entities, storage, pagination, error mapping and use cases
//! - [`validators`] - Candidate validation and CIDR normalization
//! - [`audit`] - JSON-lines audit trail of mutating operations
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories)
//!
//! # Rule invariants
//!
//! - `order_index` is unique within a policy; lower values are evaluated first
//! - source and destination CIDRs, when both set, share an IP family
//! - each port pair is both null or `1 <= min <= max <= 65535`
//!
//! Each invariant is checked by [`validators`] before a write and again by a
//! database constraint; both failure paths produce the same message through
//! [`core::error::translate`].

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::error::{Error, Result};
pub use core::firewall::{FilteringPolicy, Firewall, FirewallRule, RuleCandidate};
pub use core::service::FirewallService;
pub use core::store::Store;
