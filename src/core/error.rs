use crate::core::firewall::{CidrField, PortPair};
use ipnetwork::IpNetwork;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Core error types for fireflow
#[derive(Debug, Error)]
pub enum Error {
    /// Candidate input rejected before any write
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The policy does not exist or belongs to another firewall
    #[error(
        "Filtering policy with firewall id {firewall_id} and policy id {policy_id} not found"
    )]
    ParentNotFound { firewall_id: i64, policy_id: i64 },

    #[error("Firewall with id {0} not found")]
    FirewallNotFound(i64),

    #[error(
        "Firewall rule with firewall id {firewall_id} and policy id {policy_id} and rule id {rule_id} not found"
    )]
    RuleNotFound {
        firewall_id: i64,
        policy_id: i64,
        rule_id: i64,
    },

    /// `(policy_id, order_index)` is already taken
    #[error("order_index {order_index} already exists in policy {policy_id}")]
    DuplicateOrderIndex { policy_id: i64, order_index: i64 },

    #[error("Firewall with name '{0}' already exists")]
    DuplicateFirewallName(String),

    /// Payload could not be decoded into a candidate at all
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A storage-level CHECK or other constraint fired
    #[error("Constraint violation: {0}")]
    Constraint(ConstraintViolation),

    /// Any lower-level storage failure
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation failures. Exactly one is reported per call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "{field} must be a valid IPv4/IPv6 CIDR (e.g. 10.0.0.0/24 or ::/0). Received: {received}"
    )]
    InvalidCidr { field: CidrField, received: String },

    #[error("{pair} must both be specified or both be null")]
    IncompletePortPair { pair: PortPair },

    #[error("{pair} must be within 1..65535 with minimum <= maximum (got {min}..{max})")]
    InvalidPortRange { pair: PortPair, min: i64, max: i64 },

    #[error(
        "source_cidr ({source_cidr}) and destination_cidr ({destination_cidr}) must use the same IP version"
    )]
    IpFamilyMismatch {
        source_cidr: IpNetwork,
        destination_cidr: IpNetwork,
    },

    /// Value outside a closed set (protocol, action, status, ...)
    #[error("{field} must be one of {expected}. Received: {received}")]
    InvalidChoice {
        field: &'static str,
        expected: &'static str,
        received: String,
    },

    #[error("{field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    /// The storage constraint guarding the same invariant, if any
    pub fn violation(&self) -> Option<ConstraintViolation> {
        match self {
            ValidationError::IncompletePortPair { pair }
            | ValidationError::InvalidPortRange { pair, .. } => {
                Some(ConstraintViolation::port_range(*pair))
            }
            ValidationError::IpFamilyMismatch { .. } => Some(ConstraintViolation::IpFamilyMismatch),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Conflict mapping
// ═══════════════════════════════════════════════════════════════════════════

/// HTTP-equivalent status class for a translated error
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum StatusClass {
    #[strum(serialize = "Bad Request")]
    BadRequest,
    #[strum(serialize = "Not Found")]
    NotFound,
    #[strum(serialize = "Conflict")]
    Conflict,
    #[strum(serialize = "Unprocessable Entity")]
    Unprocessable,
    #[strum(serialize = "Internal Server Error")]
    Internal,
}

impl StatusClass {
    pub const fn code(self) -> u16 {
        match self {
            StatusClass::BadRequest => 400,
            StatusClass::NotFound => 404,
            StatusClass::Conflict => 409,
            StatusClass::Unprocessable => 422,
            StatusClass::Internal => 500,
        }
    }
}

/// Closed set of constraint failures the store can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConstraintViolation {
    #[strum(serialize = "uq_policy_id_order_index")]
    DuplicateOrderIndex,
    #[strum(serialize = "ck_src_ports_pair_and_range")]
    SourcePortRange,
    #[strum(serialize = "ck_dst_ports_pair_and_range")]
    DestinationPortRange,
    #[strum(serialize = "ck_same_ip_family_if_both_set")]
    IpFamilyMismatch,
    #[strum(serialize = "uq_firewall_name")]
    DuplicateFirewallName,
    #[strum(serialize = "other")]
    Other,
}

impl ConstraintViolation {
    pub const fn port_range(pair: PortPair) -> Self {
        match pair {
            PortPair::Source => ConstraintViolation::SourcePortRange,
            PortPair::Destination => ConstraintViolation::DestinationPortRange,
        }
    }

    /// Matches a raw storage error message against the known constraints.
    ///
    /// Both the constraint name and SQLite's column-list form of a UNIQUE
    /// failure are recognized.
    pub fn classify(msg: &str) -> Self {
        if msg.contains("uq_policy_id_order_index")
            || msg.contains(
                "UNIQUE constraint failed: firewall_rules.policy_id, firewall_rules.order_index",
            )
        {
            return ConstraintViolation::DuplicateOrderIndex;
        }

        if msg.contains("ck_src_ports_pair_and_range") {
            return ConstraintViolation::SourcePortRange;
        }

        if msg.contains("ck_dst_ports_pair_and_range") {
            return ConstraintViolation::DestinationPortRange;
        }

        if msg.contains("ck_same_ip_family_if_both_set") {
            return ConstraintViolation::IpFamilyMismatch;
        }

        if msg.contains("uq_firewall_name") || msg.contains("UNIQUE constraint failed: firewalls.name")
        {
            return ConstraintViolation::DuplicateFirewallName;
        }

        ConstraintViolation::Other
    }

    /// Classifies a rusqlite error, returning `None` for non-constraint failures
    pub fn from_storage(err: &rusqlite::Error) -> Option<Self> {
        if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            Some(Self::classify(&err.to_string()))
        } else {
            None
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            ConstraintViolation::DuplicateOrderIndex => {
                "A rule with this order_index already exists in this policy."
            }
            ConstraintViolation::SourcePortRange => {
                "source_port_minimum/maximum must both be null or 1..65535 with min <= max."
            }
            ConstraintViolation::DestinationPortRange => {
                "destination_port_minimum/maximum must both be null or 1..65535 with min <= max."
            }
            ConstraintViolation::IpFamilyMismatch => {
                "source_cidr and destination_cidr must be both IPv4 or both IPv6."
            }
            ConstraintViolation::DuplicateFirewallName => {
                "A firewall with this name already exists."
            }
            ConstraintViolation::Other => "Constraint violation.",
        }
    }

    pub const fn status(self) -> StatusClass {
        match self {
            ConstraintViolation::DuplicateOrderIndex
            | ConstraintViolation::DuplicateFirewallName => StatusClass::Conflict,
            _ => StatusClass::Unprocessable,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match ConstraintViolation::from_storage(&err) {
            Some(violation) => Error::Constraint(violation),
            None => Error::StorageUnavailable(err),
        }
    }
}

/// Represents a translated error ready to hand back to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTranslation {
    pub message: String,
    pub status: StatusClass,
    pub details: Option<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>, status: StatusClass) -> Self {
        Self {
            message: message.into(),
            status,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<ConstraintViolation> for ErrorTranslation {
    fn from(violation: ConstraintViolation) -> Self {
        ErrorTranslation::new(violation.message(), violation.status())
    }
}

/// Maps any core error onto the single client-facing vocabulary.
///
/// Validation failures that guard the same invariant as a storage constraint
/// get the constraint's message, so clients see one wording regardless of
/// which layer caught the problem.
pub fn translate(err: &Error) -> ErrorTranslation {
    match err {
        Error::Validation(v) => match v.violation() {
            Some(violation) => ErrorTranslation::from(violation).with_details(v.to_string()),
            None => ErrorTranslation::new(v.to_string(), StatusClass::Unprocessable),
        },
        Error::ParentNotFound { .. } | Error::FirewallNotFound(_) | Error::RuleNotFound { .. } => {
            ErrorTranslation::new(err.to_string(), StatusClass::NotFound)
        }
        Error::DuplicateOrderIndex { .. } => {
            ErrorTranslation::from(ConstraintViolation::DuplicateOrderIndex)
                .with_details(err.to_string())
        }
        Error::DuplicateFirewallName(_) => {
            ErrorTranslation::from(ConstraintViolation::DuplicateFirewallName)
                .with_details(err.to_string())
        }
        Error::Constraint(violation) => ErrorTranslation::from(*violation),
        Error::MalformedInput(reason) => {
            ErrorTranslation::new("Malformed request payload.", StatusClass::BadRequest)
                .with_details(reason.clone())
        }
        Error::StorageUnavailable(_) | Error::Io(_) | Error::Serialization(_) => {
            ErrorTranslation::new("Internal server error.", StatusClass::Internal)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
