//! Rule constraint functions for firewall rules
//!
//! This module centralizes the predicates behind the rule invariants so the
//! validator and the store agree on what a valid rule is:
//!
//! - when both CIDRs are set they share an IP family
//! - each port pair is either fully null or `1 <= min <= max <= 65535`
//!
//! The store repeats the same rules as SQL CHECK constraints; the tests in
//! `core::store` keep the two in step.
//!
//! # Examples
//!
//! ```
//! use fireflow::core::rule_constraints::*;
//! use ipnetwork::IpNetwork;
//!
//! assert!(port_pair_is_consistent(Some(80), Some(443)));
//! assert!(!port_pair_is_consistent(Some(443), Some(80)));
//!
//! let v4: IpNetwork = "10.0.0.0/8".parse().unwrap();
//! let v6: IpNetwork = "::/0".parse().unwrap();
//! assert!(!families_consistent(Some(&v4), Some(&v6)));
//! ```

use ipnetwork::IpNetwork;

pub const MIN_PORT: i64 = 1;
pub const MAX_PORT: i64 = 65_535;

// ═══════════════════════════════════════════════════════════════════════════
// Port Constraints
// ═══════════════════════════════════════════════════════════════════════════

/// Returns `true` if the value is a usable port number (port 0 is reserved).
#[inline]
pub fn port_in_range(port: i64) -> bool {
    (MIN_PORT..=MAX_PORT).contains(&port)
}

/// Returns `true` if exactly one side of a port pair is set.
///
/// # Examples
///
/// ```
/// use fireflow::core::rule_constraints::port_pair_is_partial;
///
/// assert!(port_pair_is_partial(Some(100), None));
/// assert!(port_pair_is_partial(None, Some(100)));
/// assert!(!port_pair_is_partial(None, None));
/// assert!(!port_pair_is_partial(Some(1), Some(2)));
/// ```
#[inline]
pub fn port_pair_is_partial(min: Option<i64>, max: Option<i64>) -> bool {
    min.is_some() != max.is_some()
}

/// Returns `true` if the pair is both null, or both set with
/// `1 <= min <= max <= 65535`.
#[inline]
pub fn port_pair_is_consistent(min: Option<i64>, max: Option<i64>) -> bool {
    match (min, max) {
        (None, None) => true,
        (Some(min), Some(max)) => port_in_range(min) && port_in_range(max) && min <= max,
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// IP Family Constraints
// ═══════════════════════════════════════════════════════════════════════════

/// Returns the IP version (4 or 6) of a network.
#[inline]
pub fn ip_version(net: &IpNetwork) -> u8 {
    if net.is_ipv4() { 4 } else { 6 }
}

/// Returns `true` if both networks belong to the same IP family.
#[inline]
pub fn same_ip_family(a: &IpNetwork, b: &IpNetwork) -> bool {
    ip_version(a) == ip_version(b)
}

/// Returns `true` unless both networks are set and differ in family.
#[inline]
pub fn families_consistent(source: Option<&IpNetwork>, destination: Option<&IpNetwork>) -> bool {
    match (source, destination) {
        (Some(s), Some(d)) => same_ip_family(s, d),
        _ => true,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CIDR Canonical Form
// ═══════════════════════════════════════════════════════════════════════════

/// Returns the network with host bits cleared (`10.0.0.5/24` → `10.0.0.0/24`).
///
/// # Examples
///
/// ```
/// use fireflow::core::rule_constraints::canonical_network;
/// use ipnetwork::IpNetwork;
///
/// let net: IpNetwork = "10.0.0.5/24".parse().unwrap();
/// assert_eq!(canonical_network(net).to_string(), "10.0.0.0/24");
/// ```
pub fn canonical_network(net: IpNetwork) -> IpNetwork {
    // Prefix is already valid for the family, so rebuilding cannot fail.
    IpNetwork::new(net.network(), net.prefix()).unwrap_or(net)
}
