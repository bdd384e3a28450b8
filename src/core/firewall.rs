//! Firewall, filtering policy and rule data structures
//!
//! Ownership is a strict tree: a [`Firewall`] owns [`FilteringPolicy`] records,
//! which own [`FirewallRule`] records. Rules inside a policy are evaluated
//! first-match-wins by ascending `order_index`.
//!
//! Raw client input arrives as a candidate ([`FirewallCandidate`],
//! [`PolicyCandidate`], [`RuleCandidate`]) and only becomes a persisted entity
//! after passing through [`crate::validators`].
//!
//! # Example
//!
//! ```
//! use fireflow::core::firewall::{PortRange, Protocol, RuleAction};
//! use std::str::FromStr;
//!
//! assert_eq!(Protocol::from_str("udp").unwrap(), Protocol::Udp);
//! assert!(RuleAction::from_str("drop").is_err());
//! assert_eq!(PortRange::single(443).to_string(), "443");
//! ```

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Longest CIDR text accepted (`ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128`)
pub const MAX_CIDR_LEN: usize = 43;

/// Deployment environment a firewall belongs to
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[strum(serialize = "production")]
    Production,
    #[strum(serialize = "staging")]
    Staging,
    #[strum(serialize = "development")]
    Development,
}

impl Environment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

/// Action a filtering policy applies
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    #[default]
    #[strum(serialize = "allow")]
    Allow,
    #[strum(serialize = "deny")]
    Deny,
    /// Let traffic through but record it
    #[strum(serialize = "log")]
    Log,
}

impl PolicyAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            PolicyAction::Allow => "allow",
            PolicyAction::Deny => "deny",
            PolicyAction::Log => "log",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    #[default]
    #[strum(serialize = "active")]
    Active,
    #[strum(serialize = "inactive")]
    Inactive,
}

impl PolicyStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Inactive => "inactive",
        }
    }
}

/// Transport protocol matched by a rule
///
/// `Copy` trait allows efficient passing by value for this small enum.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Transmission Control Protocol
    #[default]
    #[strum(serialize = "tcp")]
    Tcp,
    /// User Datagram Protocol
    #[strum(serialize = "udp")]
    Udp,
}

impl Protocol {
    /// Returns lowercase protocol name as stored in the database
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Rule action (Allow, Deny, or Reject)
///
/// Controls what happens when a packet matches this rule.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Let the packet through
    #[default]
    #[strum(serialize = "allow")]
    Allow,
    /// Drop the packet silently
    #[strum(serialize = "deny")]
    Deny,
    /// Drop the packet and notify the sender
    #[strum(serialize = "reject")]
    Reject,
}

impl RuleAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Deny => "deny",
            RuleAction::Reject => "reject",
        }
    }
}

/// Inclusive port range. Only constructed through validation, so
/// `1 <= start <= end <= 65535` always holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Which of the two port pairs a message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortPair {
    Source,
    Destination,
}

impl PortPair {
    /// Field prefix used in client payloads and column names
    pub const fn field_prefix(self) -> &'static str {
        match self {
            PortPair::Source => "source_port",
            PortPair::Destination => "destination_port",
        }
    }
}

impl fmt::Display for PortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{0}_minimum/{0}_maximum",
            self.field_prefix()
        )
    }
}

/// Which CIDR field a message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CidrField {
    Source,
    Destination,
}

impl CidrField {
    pub const fn as_str(self) -> &'static str {
        match self {
            CidrField::Source => "source_cidr",
            CidrField::Destination => "destination_cidr",
        }
    }
}

impl fmt::Display for CidrField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Persisted entities
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Firewall {
    pub id: i64,
    pub name: String,
    pub environment: Environment,
    pub scope: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilteringPolicy {
    pub id: i64,
    pub firewall_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Lower value is evaluated first
    pub priority: i64,
    pub action: PolicyAction,
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated firewall that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFirewall {
    pub name: String,
    pub environment: Environment,
    pub scope: String,
    pub description: Option<String>,
}

/// A validated filtering policy that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPolicy {
    pub name: String,
    pub description: Option<String>,
    pub priority: i64,
    pub action: PolicyAction,
    pub status: PolicyStatus,
}

/// A validated rule that has not been persisted yet.
///
/// Produced by [`crate::validators::validate_rule`]; every field already
/// satisfies the port-pair and IP-family invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRule {
    pub order_index: i64,
    pub source_cidr: Option<IpNetwork>,
    pub destination_cidr: Option<IpNetwork>,
    pub protocol: Protocol,
    pub source_ports: Option<PortRange>,
    pub destination_ports: Option<PortRange>,
    pub action: RuleAction,
}

/// A persisted rule. `policy_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    pub id: i64,
    pub policy_id: i64,
    pub order_index: i64,
    pub source_cidr: Option<IpNetwork>,
    pub destination_cidr: Option<IpNetwork>,
    pub protocol: Protocol,
    pub source_ports: Option<PortRange>,
    pub destination_ports: Option<PortRange>,
    pub action: RuleAction,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat wire shape of a rule, matching the candidate field names
#[derive(Serialize)]
struct FlatRule<'a> {
    id: i64,
    policy_id: i64,
    order_index: i64,
    source_cidr: Option<String>,
    destination_cidr: Option<String>,
    protocol: &'static str,
    source_port_minimum: Option<u16>,
    source_port_maximum: Option<u16>,
    destination_port_minimum: Option<u16>,
    destination_port_maximum: Option<u16>,
    action: &'static str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

impl Serialize for FirewallRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FlatRule {
            id: self.id,
            policy_id: self.policy_id,
            order_index: self.order_index,
            source_cidr: self.source_cidr.map(|c| c.to_string()),
            destination_cidr: self.destination_cidr.map(|c| c.to_string()),
            protocol: self.protocol.as_str(),
            source_port_minimum: self.source_ports.map(|p| p.start),
            source_port_maximum: self.source_ports.map(|p| p.end),
            destination_port_minimum: self.destination_ports.map(|p| p.start),
            destination_port_maximum: self.destination_ports.map(|p| p.end),
            action: self.action.as_str(),
            created_at: &self.created_at,
            updated_at: &self.updated_at,
        }
        .serialize(serializer)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Candidates (unvalidated client input)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallCandidate {
    pub name: String,
    pub environment: String,
    pub scope: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyCandidate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to 100 when absent
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Raw rule fields as decoded from a client payload.
///
/// Ports are kept as `i64` so out-of-range values (0, negative, > 65535)
/// reach the validator and are reported instead of failing decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleCandidate {
    pub order_index: i64,
    #[serde(default)]
    pub source_cidr: Option<String>,
    #[serde(default)]
    pub destination_cidr: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source_port_minimum: Option<i64>,
    #[serde(default)]
    pub source_port_maximum: Option<i64>,
    #[serde(default)]
    pub destination_port_minimum: Option<i64>,
    #[serde(default)]
    pub destination_port_maximum: Option<i64>,
    #[serde(default)]
    pub action: Option<String>,
}

impl RuleCandidate {
    pub fn new(order_index: i64) -> Self {
        Self {
            order_index,
            ..Self::default()
        }
    }

    pub fn ports(&self, pair: PortPair) -> (Option<i64>, Option<i64>) {
        match pair {
            PortPair::Source => (self.source_port_minimum, self.source_port_maximum),
            PortPair::Destination => (
                self.destination_port_minimum,
                self.destination_port_maximum,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_enum_string_round_trip() {
        for p in Protocol::iter() {
            assert_eq!(Protocol::from_str(p.as_str()).unwrap(), p);
            assert_eq!(p.to_string(), p.as_str());
        }
        for a in RuleAction::iter() {
            assert_eq!(RuleAction::from_str(a.as_str()).unwrap(), a);
        }
        for a in PolicyAction::iter() {
            assert_eq!(PolicyAction::from_str(a.as_str()).unwrap(), a);
        }
        for s in PolicyStatus::iter() {
            assert_eq!(PolicyStatus::from_str(s.as_str()).unwrap(), s);
        }
        for e in Environment::iter() {
            assert_eq!(Environment::from_str(e.as_str()).unwrap(), e);
        }
    }

    #[test]
    fn test_unknown_enum_values_rejected() {
        assert!(Protocol::from_str("icmp").is_err());
        assert!(Protocol::from_str("TCP").is_err());
        assert!(RuleAction::from_str("accept").is_err());
        assert!(PolicyAction::from_str("reject").is_err());
        assert!(Environment::from_str("prod").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Protocol::default(), Protocol::Tcp);
        assert_eq!(RuleAction::default(), RuleAction::Allow);
        assert_eq!(PolicyAction::default(), PolicyAction::Allow);
        assert_eq!(PolicyStatus::default(), PolicyStatus::Active);
    }

    #[test]
    fn test_port_range_display() {
        assert_eq!(PortRange::single(22).to_string(), "22");
        assert_eq!(PortRange { start: 8000, end: 9000 }.to_string(), "8000-9000");
    }

    #[test]
    fn test_port_pair_display() {
        assert_eq!(
            PortPair::Source.to_string(),
            "source_port_minimum/source_port_maximum"
        );
        assert_eq!(
            PortPair::Destination.to_string(),
            "destination_port_minimum/destination_port_maximum"
        );
    }

    #[test]
    fn test_rule_serializes_flat() {
        let now = Utc::now();
        let rule = FirewallRule {
            id: 7,
            policy_id: 2,
            order_index: 1,
            source_cidr: Some("192.168.1.0/24".parse().unwrap()),
            destination_cidr: None,
            protocol: Protocol::Udp,
            source_ports: None,
            destination_ports: Some(PortRange { start: 53, end: 53 }),
            action: RuleAction::Deny,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["source_cidr"], "192.168.1.0/24");
        assert!(json["destination_cidr"].is_null());
        assert_eq!(json["protocol"], "udp");
        assert!(json["source_port_minimum"].is_null());
        assert_eq!(json["destination_port_minimum"], 53);
        assert_eq!(json["destination_port_maximum"], 53);
        assert_eq!(json["action"], "deny");
    }

    #[test]
    fn test_rule_candidate_defaults_from_json() {
        let candidate: RuleCandidate = serde_json::from_str(r#"{"order_index": 3}"#).unwrap();
        assert_eq!(candidate, RuleCandidate::new(3));
        assert_eq!(candidate.ports(PortPair::Source), (None, None));
    }
}
