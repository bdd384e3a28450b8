//! Input validation and normalization for fireflow
//!
//! Every candidate (firewall, policy, rule) passes through this module before
//! any write is attempted. Validation is fail-fast: the first violation found
//! is returned and nothing after it is checked.
//!
//! Rule checks run in this order: `source_cidr`, `destination_cidr`,
//! `protocol`, `action`, source ports, destination ports, IP family.

use crate::core::error::ValidationError;
use crate::core::firewall::{
    CidrField, Environment, FirewallCandidate, MAX_CIDR_LEN, NewFirewall, NewPolicy,
    NormalizedRule, PolicyAction, PolicyCandidate, PolicyStatus, PortPair, PortRange, Protocol,
    RuleAction, RuleCandidate,
};
use crate::core::rule_constraints::{
    canonical_network, port_pair_is_consistent, port_pair_is_partial, same_ip_family,
};
use ipnetwork::IpNetwork;
use std::str::FromStr;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SCOPE_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const DEFAULT_POLICY_PRIORITY: i64 = 100;

/// Normalizes a CIDR string.
///
/// Blank input of at most 43 characters means "no restriction" and yields
/// `None`. Host bits are permitted and cleared, so the result is canonical
/// and normalizing it again returns the same value.
///
/// # Examples
///
/// ```
/// use fireflow::core::firewall::CidrField;
/// use fireflow::validators::normalize_cidr;
///
/// let net = normalize_cidr(CidrField::Source, Some("10.0.0.5/24")).unwrap();
/// assert_eq!(net.unwrap().to_string(), "10.0.0.0/24");
///
/// assert_eq!(normalize_cidr(CidrField::Source, Some("   ")).unwrap(), None);
/// assert!(normalize_cidr(CidrField::Source, Some("10.0.0.0/33")).is_err());
/// ```
///
/// # Errors
///
/// Returns `InvalidCidr` if the text is longer than 43 characters or is not
/// an IPv4/IPv6 network.
pub fn normalize_cidr(
    field: CidrField,
    text: Option<&str>,
) -> Result<Option<IpNetwork>, ValidationError> {
    let Some(text) = text else {
        return Ok(None);
    };

    let invalid = || ValidationError::InvalidCidr {
        field,
        received: text.to_string(),
    };

    // Length applies to the raw text, blanks included
    if text.len() > MAX_CIDR_LEN {
        return Err(invalid());
    }
    if text.trim().is_empty() {
        return Ok(None);
    }

    let net = IpNetwork::from_str(text).map_err(|_| invalid())?;
    Ok(Some(canonical_network(net)))
}

/// Validates one min/max port pair.
///
/// # Errors
///
/// - `IncompletePortPair` if exactly one side is set
/// - `InvalidPortRange` unless `1 <= min <= max <= 65535`
pub fn validate_port_pair(
    pair: PortPair,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<Option<PortRange>, ValidationError> {
    if port_pair_is_partial(min, max) {
        return Err(ValidationError::IncompletePortPair { pair });
    }
    match (min, max) {
        (Some(lo), Some(hi)) if port_pair_is_consistent(min, max) => {
            // The guard bounds both to 1..=65535
            Ok(Some(PortRange {
                start: lo as u16,
                end: hi as u16,
            }))
        }
        (Some(lo), Some(hi)) => Err(ValidationError::InvalidPortRange {
            pair,
            min: lo,
            max: hi,
        }),
        _ => Ok(None),
    }
}

/// Validates that source and destination share an IP family.
///
/// # Errors
///
/// Returns `IpFamilyMismatch` if both are set and one is IPv4 while the other
/// is IPv6.
pub fn validate_ip_family(
    source: Option<&IpNetwork>,
    destination: Option<&IpNetwork>,
) -> Result<(), ValidationError> {
    if let (Some(s), Some(d)) = (source, destination)
        && !same_ip_family(s, d)
    {
        return Err(ValidationError::IpFamilyMismatch {
            source_cidr: *s,
            destination_cidr: *d,
        });
    }
    Ok(())
}

/// Parses an optional closed-set value, falling back to the type's default.
fn parse_choice<T>(
    field: &'static str,
    expected: &'static str,
    value: Option<&str>,
) -> Result<T, ValidationError>
where
    T: FromStr + Default,
{
    match value {
        None => Ok(T::default()),
        Some(raw) => T::from_str(raw).map_err(|_| ValidationError::InvalidChoice {
            field,
            expected,
            received: raw.to_string(),
        }),
    }
}

/// Validates a rule candidate and produces its normalized form.
///
/// # Errors
///
/// Returns the first `ValidationError` encountered.
pub fn validate_rule(candidate: &RuleCandidate) -> Result<NormalizedRule, ValidationError> {
    let source_cidr = normalize_cidr(CidrField::Source, candidate.source_cidr.as_deref())?;
    let destination_cidr =
        normalize_cidr(CidrField::Destination, candidate.destination_cidr.as_deref())?;

    let protocol: Protocol = parse_choice("protocol", "tcp, udp", candidate.protocol.as_deref())?;
    let action: RuleAction =
        parse_choice("action", "allow, deny, reject", candidate.action.as_deref())?;

    let (min, max) = candidate.ports(PortPair::Source);
    let source_ports = validate_port_pair(PortPair::Source, min, max)?;
    let (min, max) = candidate.ports(PortPair::Destination);
    let destination_ports = validate_port_pair(PortPair::Destination, min, max)?;

    validate_ip_family(source_cidr.as_ref(), destination_cidr.as_ref())?;

    Ok(NormalizedRule {
        order_index: candidate.order_index,
        source_cidr,
        destination_cidr,
        protocol,
        source_ports,
        destination_ports,
        action,
    })
}

/// Trims a required text field and enforces its length bounds.
fn required_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidField {
            field,
            message: "must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::InvalidField {
            field,
            message: format!("too long (max {max_len} characters)"),
        });
    }
    Ok(trimmed.to_string())
}

/// Blank descriptions are stored as null.
fn optional_description(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => {
            Err(ValidationError::InvalidField {
                field: "description",
                message: format!("too long (max {MAX_DESCRIPTION_LEN} characters)"),
            })
        }
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Validates a firewall candidate.
///
/// # Errors
///
/// Returns `InvalidField` for empty/overlong text and `InvalidChoice` for an
/// unknown environment.
pub fn validate_firewall(candidate: &FirewallCandidate) -> Result<NewFirewall, ValidationError> {
    let name = required_text("name", &candidate.name, MAX_NAME_LEN)?;
    let environment = Environment::from_str(&candidate.environment).map_err(|_| {
        ValidationError::InvalidChoice {
            field: "environment",
            expected: "production, staging, development",
            received: candidate.environment.clone(),
        }
    })?;

    let scope = candidate.scope.trim();
    if scope.chars().count() > MAX_SCOPE_LEN {
        return Err(ValidationError::InvalidField {
            field: "scope",
            message: format!("too long (max {MAX_SCOPE_LEN} characters)"),
        });
    }

    Ok(NewFirewall {
        name,
        environment,
        scope: scope.to_string(),
        description: optional_description(candidate.description.as_deref())?,
    })
}

/// Validates a filtering policy candidate.
///
/// # Errors
///
/// Returns `InvalidField` for bad text or a negative priority and
/// `InvalidChoice` for an unknown action or status.
pub fn validate_policy(candidate: &PolicyCandidate) -> Result<NewPolicy, ValidationError> {
    let name = required_text("name", &candidate.name, MAX_NAME_LEN)?;
    let description = optional_description(candidate.description.as_deref())?;

    let priority = candidate.priority.unwrap_or(DEFAULT_POLICY_PRIORITY);
    if priority < 0 {
        return Err(ValidationError::InvalidField {
            field: "priority",
            message: format!("must be >= 0 (got {priority})"),
        });
    }

    let action: PolicyAction =
        parse_choice("action", "allow, deny, log", candidate.action.as_deref())?;
    let status: PolicyStatus =
        parse_choice("status", "active, inactive", candidate.status.as_deref())?;

    Ok(NewPolicy {
        name,
        description,
        priority,
        action,
        status,
    })
}
