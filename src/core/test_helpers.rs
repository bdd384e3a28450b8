//! Shared test utilities for core module tests
//!
//! Provides common fixtures to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::firewall::{
    Environment, Firewall, FilteringPolicy, NewFirewall, NewPolicy, NormalizedRule, PolicyAction,
    PolicyStatus, Protocol, RuleAction, RuleCandidate,
};
use crate::core::store::Store;

/// A validated production firewall with the given name
pub fn new_firewall(name: &str) -> NewFirewall {
    NewFirewall {
        name: name.to_string(),
        environment: Environment::Production,
        scope: "datacenter".to_string(),
        description: None,
    }
}

/// A validated policy with default priority, action and status
pub fn new_policy(name: &str) -> NewPolicy {
    NewPolicy {
        name: name.to_string(),
        description: None,
        priority: 100,
        action: PolicyAction::Allow,
        status: PolicyStatus::Active,
    }
}

/// A rule matching any tcp traffic at the given position
pub fn normalized_rule(order_index: i64) -> NormalizedRule {
    NormalizedRule {
        order_index,
        source_cidr: None,
        destination_cidr: None,
        protocol: Protocol::Tcp,
        source_ports: None,
        destination_ports: None,
        action: RuleAction::Allow,
    }
}

/// Candidate for the first end-to-end scenario: web traffic into a /8
pub fn web_candidate(order_index: i64) -> RuleCandidate {
    RuleCandidate {
        source_cidr: Some("192.168.1.5/24".to_string()),
        destination_cidr: Some("10.0.0.0/8".to_string()),
        protocol: Some("tcp".to_string()),
        destination_port_minimum: Some(80),
        destination_port_maximum: Some(80),
        ..RuleCandidate::new(order_index)
    }
}

/// In-memory store holding one firewall ("edge") with one policy ("default").
///
/// # Panics
///
/// Panics if the in-memory database cannot be created.
pub fn seeded_store() -> (Store, Firewall, FilteringPolicy) {
    let store = Store::open_in_memory().expect("in-memory store");
    let firewall = store
        .create_firewall(&new_firewall("edge"))
        .expect("seed firewall");
    let policy = store
        .create_policy(firewall.id, &new_policy("default"))
        .expect("seed policy");
    (store, firewall, policy)
}
