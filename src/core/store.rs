//! SQLite persistence for firewalls, policies and rules
//!
//! The schema repeats the rule invariants as declarative constraints:
//!
//! - `uq_policy_id_order_index`: one rule per `(policy_id, order_index)`
//! - `ck_src_ports_pair_and_range` / `ck_dst_ports_pair_and_range`: port pairs
//! - `ck_same_ip_family_if_both_set`: source and destination share a family
//!
//! Validated input normally never trips them; when it does (a concurrent
//! writer, or a row written by another tool) the resulting `rusqlite::Error`
//! is classified by [`ConstraintViolation`] like any other failure.
//!
//! Every write that checks something before inserting runs inside a
//! `BEGIN IMMEDIATE` transaction, so the check and the insert see the same
//! database state even with several processes sharing the file.

use crate::core::error::{ConstraintViolation, Error, Result};
use crate::core::firewall::{
    Firewall, FilteringPolicy, FirewallRule, NewFirewall, NewPolicy, NormalizedRule, PortRange,
};
use crate::core::pagination::{
    FirewallSortKey, Page, PageRequest, PolicySortKey, RuleSortKey,
};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS firewalls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    environment TEXT NOT NULL
        CHECK (environment IN ('production', 'staging', 'development')),
    scope TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CONSTRAINT uq_firewall_name UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS filtering_policies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    firewall_id INTEGER NOT NULL REFERENCES firewalls(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    priority INTEGER NOT NULL DEFAULT 100 CHECK (priority >= 0),
    action TEXT NOT NULL DEFAULT 'allow' CHECK (action IN ('allow', 'deny', 'log')),
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS firewall_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    policy_id INTEGER NOT NULL REFERENCES filtering_policies(id) ON DELETE CASCADE,
    order_index INTEGER NOT NULL,
    source_cidr TEXT CHECK (source_cidr IS NULL OR length(source_cidr) <= 43),
    destination_cidr TEXT CHECK (destination_cidr IS NULL OR length(destination_cidr) <= 43),
    protocol TEXT NOT NULL DEFAULT 'tcp' CHECK (protocol IN ('tcp', 'udp')),
    source_port_minimum INTEGER,
    source_port_maximum INTEGER,
    destination_port_minimum INTEGER,
    destination_port_maximum INTEGER,
    action TEXT NOT NULL DEFAULT 'allow' CHECK (action IN ('allow', 'deny', 'reject')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CONSTRAINT uq_policy_id_order_index UNIQUE (policy_id, order_index),
    CONSTRAINT ck_src_ports_pair_and_range CHECK (
        (source_port_minimum IS NULL AND source_port_maximum IS NULL)
        OR (
            source_port_minimum IS NOT NULL AND source_port_maximum IS NOT NULL
            AND source_port_minimum BETWEEN 1 AND 65535
            AND source_port_maximum BETWEEN 1 AND 65535
            AND source_port_minimum <= source_port_maximum
        )
    ),
    CONSTRAINT ck_dst_ports_pair_and_range CHECK (
        (destination_port_minimum IS NULL AND destination_port_maximum IS NULL)
        OR (
            destination_port_minimum IS NOT NULL AND destination_port_maximum IS NOT NULL
            AND destination_port_minimum BETWEEN 1 AND 65535
            AND destination_port_maximum BETWEEN 1 AND 65535
            AND destination_port_minimum <= destination_port_maximum
        )
    ),
    CONSTRAINT ck_same_ip_family_if_both_set CHECK (
        source_cidr IS NULL OR destination_cidr IS NULL
        OR ((instr(source_cidr, ':') > 0) = (instr(destination_cidr, ':') > 0))
    )
);

CREATE INDEX IF NOT EXISTS idx_policies_firewall ON filtering_policies(firewall_id);
CREATE INDEX IF NOT EXISTS idx_rules_policy ON firewall_rules(policy_id);
";

const FIREWALL_COLUMNS: &str =
    "f.id, f.name, f.environment, f.scope, f.description, f.created_at, f.updated_at";

const POLICY_COLUMNS: &str = "p.id, p.firewall_id, p.name, p.description, p.priority, \
     p.action, p.status, p.created_at, p.updated_at";

const RULE_COLUMNS: &str = "r.id, r.policy_id, r.order_index, r.source_cidr, \
     r.destination_cidr, r.protocol, r.source_port_minimum, r.source_port_maximum, \
     r.destination_port_minimum, r.destination_port_maximum, r.action, r.created_at, \
     r.updated_at";

/// Row counts reported by the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub firewalls: u64,
    pub policies: u64,
    pub rules: u64,
}

/// SQLite-backed store for the firewall → policy → rule tree
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the database file and applies the schema.
    ///
    /// `busy_timeout` bounds how long a writer waits for another process
    /// holding the write lock before failing with `StorageUnavailable`.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        tracing::debug!("Opened database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A panic while holding the lock leaves no half-applied transaction
    /// behind (rusqlite rolls back on drop), so a poisoned lock is reused.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Confirms the database answers a trivial query
    pub fn ping(&self) -> Result<()> {
        self.conn()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let conn = self.conn();
        let count = |table: &str| -> Result<u64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(to_count(n))
        };
        Ok(StoreCounts {
            firewalls: count("firewalls")?,
            policies: count("filtering_policies")?,
            rules: count("firewall_rules")?,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Firewalls
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_firewall(&self, firewall: &NewFirewall) -> Result<Firewall> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM firewalls WHERE name = ?1)",
            params![firewall.name],
            |row| row.get(0),
        )?;
        if taken {
            return Err(Error::DuplicateFirewallName(firewall.name.clone()));
        }

        let now = now();
        let stamp = format_timestamp(&now);
        tx.execute(
            "INSERT INTO firewalls (name, environment, scope, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                firewall.name,
                firewall.environment.as_str(),
                firewall.scope,
                firewall.description,
                stamp
            ],
        )
        .map_err(|e| match Error::from(e) {
            Error::Constraint(ConstraintViolation::DuplicateFirewallName) => {
                Error::DuplicateFirewallName(firewall.name.clone())
            }
            other => other,
        })?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!("Inserted firewall {id} ({})", firewall.name);
        Ok(Firewall {
            id,
            name: firewall.name.clone(),
            environment: firewall.environment,
            scope: firewall.scope.clone(),
            description: firewall.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_firewall(&self, firewall_id: i64) -> Result<Option<Firewall>> {
        let conn = self.conn();
        let firewall = conn
            .query_row(
                &format!("SELECT {FIREWALL_COLUMNS} FROM firewalls f WHERE f.id = ?1"),
                params![firewall_id],
                firewall_from_row,
            )
            .optional()?;
        Ok(firewall)
    }

    pub fn list_firewalls(&self, request: &PageRequest<FirewallSortKey>) -> Result<Page<Firewall>> {
        let conn = self.conn();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM firewalls", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FIREWALL_COLUMNS} FROM firewalls f ORDER BY {} LIMIT ?1 OFFSET ?2",
            request.order_by()
        ))?;
        let items = stmt
            .query_map(
                params![i64::from(request.size()), to_offset(request.offset())],
                firewall_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(request, to_count(total), items))
    }

    /// Deletes a firewall with all of its policies and rules.
    ///
    /// Returns `false` if no such firewall existed.
    pub fn delete_firewall(&self, firewall_id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rules = tx.execute(
            "DELETE FROM firewall_rules WHERE policy_id IN
                (SELECT id FROM filtering_policies WHERE firewall_id = ?1)",
            params![firewall_id],
        )?;
        let policies = tx.execute(
            "DELETE FROM filtering_policies WHERE firewall_id = ?1",
            params![firewall_id],
        )?;
        let removed = tx.execute("DELETE FROM firewalls WHERE id = ?1", params![firewall_id])?;
        tx.commit()?;

        tracing::debug!(
            "Deleted firewall {firewall_id}: {removed} firewall, {policies} policies, {rules} rules"
        );
        Ok(removed > 0)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Filtering policies
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_policy(&self, firewall_id: i64, policy: &NewPolicy) -> Result<FilteringPolicy> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM firewalls WHERE id = ?1)",
            params![firewall_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::FirewallNotFound(firewall_id));
        }

        let now = now();
        let stamp = format_timestamp(&now);
        tx.execute(
            "INSERT INTO filtering_policies
                (firewall_id, name, description, priority, action, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                firewall_id,
                policy.name,
                policy.description,
                policy.priority,
                policy.action.as_str(),
                policy.status.as_str(),
                stamp
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!("Inserted policy {id} under firewall {firewall_id}");
        Ok(FilteringPolicy {
            id,
            firewall_id,
            name: policy.name.clone(),
            description: policy.description.clone(),
            priority: policy.priority,
            action: policy.action,
            status: policy.status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Scoped lookup: `None` unless the policy belongs to the firewall
    pub fn get_policy(&self, firewall_id: i64, policy_id: i64) -> Result<Option<FilteringPolicy>> {
        let conn = self.conn();
        let policy = conn
            .query_row(
                &format!(
                    "SELECT {POLICY_COLUMNS} FROM filtering_policies p
                     WHERE p.id = ?1 AND p.firewall_id = ?2"
                ),
                params![policy_id, firewall_id],
                policy_from_row,
            )
            .optional()?;
        Ok(policy)
    }

    pub fn list_policies(
        &self,
        firewall_id: i64,
        request: &PageRequest<PolicySortKey>,
    ) -> Result<Page<FilteringPolicy>> {
        let conn = self.conn();
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM filtering_policies WHERE firewall_id = ?1",
            params![firewall_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POLICY_COLUMNS} FROM filtering_policies p
             WHERE p.firewall_id = ?1
             ORDER BY {} LIMIT ?2 OFFSET ?3",
            request.order_by()
        ))?;
        let items = stmt
            .query_map(
                params![
                    firewall_id,
                    i64::from(request.size()),
                    to_offset(request.offset())
                ],
                policy_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(request, to_count(total), items))
    }

    /// Deletes a policy of the given firewall together with its rules.
    ///
    /// Returns `false` if the policy does not exist under that firewall.
    pub fn delete_policy(&self, firewall_id: i64, policy_id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rules = tx.execute(
            "DELETE FROM firewall_rules WHERE policy_id IN
                (SELECT id FROM filtering_policies WHERE id = ?1 AND firewall_id = ?2)",
            params![policy_id, firewall_id],
        )?;
        let removed = tx.execute(
            "DELETE FROM filtering_policies WHERE id = ?1 AND firewall_id = ?2",
            params![policy_id, firewall_id],
        )?;
        tx.commit()?;

        tracing::debug!("Deleted policy {policy_id}: {removed} policy, {rules} rules");
        Ok(removed > 0)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Firewall rules
    // ═══════════════════════════════════════════════════════════════════════

    /// Persists a validated rule under `(firewall_id, policy_id)`.
    ///
    /// The parent check, the duplicate check and the insert share one
    /// `BEGIN IMMEDIATE` transaction. Should the `UNIQUE` constraint still
    /// fire, it is reported as the same `DuplicateOrderIndex`.
    pub fn create_rule(
        &self,
        firewall_id: i64,
        policy_id: i64,
        rule: &NormalizedRule,
    ) -> Result<FirewallRule> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !policy_in_firewall(&tx, firewall_id, policy_id)? {
            return Err(Error::ParentNotFound {
                firewall_id,
                policy_id,
            });
        }

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM firewall_rules WHERE policy_id = ?1 AND order_index = ?2)",
            params![policy_id, rule.order_index],
            |row| row.get(0),
        )?;
        if taken {
            return Err(Error::DuplicateOrderIndex {
                policy_id,
                order_index: rule.order_index,
            });
        }

        let now = now();
        let id = RuleRow::from_normalized(policy_id, rule)
            .insert(&tx, &now)
            .map_err(|e| rule_insert_error(e, firewall_id, policy_id, rule.order_index))?;
        tx.commit()?;

        tracing::debug!(
            "Inserted rule {id} at order_index {} in policy {policy_id}",
            rule.order_index
        );
        Ok(FirewallRule {
            id,
            policy_id,
            order_index: rule.order_index,
            source_cidr: rule.source_cidr,
            destination_cidr: rule.destination_cidr,
            protocol: rule.protocol,
            source_ports: rule.source_ports,
            destination_ports: rule.destination_ports,
            action: rule.action,
            created_at: now,
            updated_at: now,
        })
    }

    /// Lists the rules of a policy, but only while that policy belongs to
    /// `firewall_id`; a mismatched chain yields an empty page.
    pub fn list_rules(
        &self,
        firewall_id: i64,
        policy_id: i64,
        request: &PageRequest<RuleSortKey>,
    ) -> Result<Page<FirewallRule>> {
        let conn = self.conn();
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM firewall_rules r
             JOIN filtering_policies p ON p.id = r.policy_id
             WHERE r.policy_id = ?1 AND p.firewall_id = ?2",
            params![policy_id, firewall_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM firewall_rules r
             JOIN filtering_policies p ON p.id = r.policy_id
             WHERE r.policy_id = ?1 AND p.firewall_id = ?2
             ORDER BY {} LIMIT ?3 OFFSET ?4",
            request.order_by()
        ))?;
        let items = stmt
            .query_map(
                params![
                    policy_id,
                    firewall_id,
                    i64::from(request.size()),
                    to_offset(request.offset())
                ],
                rule_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(request, to_count(total), items))
    }

    /// Three-way scoped lookup: `None` unless rule → policy → firewall
    /// form a consistent chain.
    pub fn get_rule(
        &self,
        firewall_id: i64,
        policy_id: i64,
        rule_id: i64,
    ) -> Result<Option<FirewallRule>> {
        let conn = self.conn();
        let rule = conn
            .query_row(
                &format!(
                    "SELECT {RULE_COLUMNS} FROM firewall_rules r
                     JOIN filtering_policies p ON p.id = r.policy_id
                     WHERE r.id = ?1 AND r.policy_id = ?2 AND p.firewall_id = ?3"
                ),
                params![rule_id, policy_id, firewall_id],
                rule_from_row,
            )
            .optional()?;
        Ok(rule)
    }

    /// Removes a rule by id. Returns `false` when nothing was deleted, so
    /// repeating the call is harmless.
    pub fn delete_rule(&self, rule_id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM firewall_rules WHERE id = ?1", params![rule_id])?;
        tracing::debug!("Delete rule {rule_id}: {removed} row(s)");
        Ok(removed > 0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Row helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Column values of a rule exactly as written to `firewall_rules`
#[derive(Debug, Clone, Default)]
struct RuleRow {
    policy_id: i64,
    order_index: i64,
    source_cidr: Option<String>,
    destination_cidr: Option<String>,
    protocol: String,
    source_port_minimum: Option<i64>,
    source_port_maximum: Option<i64>,
    destination_port_minimum: Option<i64>,
    destination_port_maximum: Option<i64>,
    action: String,
}

impl RuleRow {
    fn from_normalized(policy_id: i64, rule: &NormalizedRule) -> Self {
        Self {
            policy_id,
            order_index: rule.order_index,
            source_cidr: rule.source_cidr.map(|c| c.to_string()),
            destination_cidr: rule.destination_cidr.map(|c| c.to_string()),
            protocol: rule.protocol.as_str().to_string(),
            source_port_minimum: rule.source_ports.map(|p| i64::from(p.start)),
            source_port_maximum: rule.source_ports.map(|p| i64::from(p.end)),
            destination_port_minimum: rule.destination_ports.map(|p| i64::from(p.start)),
            destination_port_maximum: rule.destination_ports.map(|p| i64::from(p.end)),
            action: rule.action.as_str().to_string(),
        }
    }

    fn insert(&self, conn: &Connection, now: &DateTime<Utc>) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO firewall_rules (
                policy_id, order_index, source_cidr, destination_cidr, protocol,
                source_port_minimum, source_port_maximum,
                destination_port_minimum, destination_port_maximum,
                action, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                self.policy_id,
                self.order_index,
                self.source_cidr,
                self.destination_cidr,
                self.protocol,
                self.source_port_minimum,
                self.source_port_maximum,
                self.destination_port_minimum,
                self.destination_port_maximum,
                self.action,
                format_timestamp(now)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

fn rule_insert_error(err: rusqlite::Error, firewall_id: i64, policy_id: i64, order_index: i64) -> Error {
    let foreign_key = err.to_string().contains("FOREIGN KEY");
    match Error::from(err) {
        Error::Constraint(ConstraintViolation::DuplicateOrderIndex) => Error::DuplicateOrderIndex {
            policy_id,
            order_index,
        },
        Error::Constraint(ConstraintViolation::Other) if foreign_key => Error::ParentNotFound {
            firewall_id,
            policy_id,
        },
        other => other,
    }
}

fn policy_in_firewall(tx: &Transaction<'_>, firewall_id: i64, policy_id: i64) -> Result<bool> {
    let exists = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM filtering_policies WHERE id = ?1 AND firewall_id = ?2)",
        params![policy_id, firewall_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn now() -> DateTime<Utc> {
    // Stored with microsecond precision; truncate so returned values match reads
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

fn to_offset(offset: u64) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

/// Reads a TEXT column through `FromStr`
fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

fn port_range(row: &Row<'_>, min_idx: usize) -> rusqlite::Result<Option<PortRange>> {
    let min: Option<u16> = row.get(min_idx)?;
    let max: Option<u16> = row.get(min_idx + 1)?;
    Ok(match (min, max) {
        (Some(start), Some(end)) => Some(PortRange { start, end }),
        _ => None,
    })
}

fn firewall_from_row(row: &Row<'_>) -> rusqlite::Result<Firewall> {
    Ok(Firewall {
        id: row.get(0)?,
        name: row.get(1)?,
        environment: parsed(row, 2)?,
        scope: row.get(3)?,
        description: row.get(4)?,
        created_at: parsed(row, 5)?,
        updated_at: parsed(row, 6)?,
    })
}

fn policy_from_row(row: &Row<'_>) -> rusqlite::Result<FilteringPolicy> {
    Ok(FilteringPolicy {
        id: row.get(0)?,
        firewall_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        priority: row.get(4)?,
        action: parsed(row, 5)?,
        status: parsed(row, 6)?,
        created_at: parsed(row, 7)?,
        updated_at: parsed(row, 8)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<FirewallRule> {
    Ok(FirewallRule {
        id: row.get(0)?,
        policy_id: row.get(1)?,
        order_index: row.get(2)?,
        source_cidr: parsed_opt(row, 3)?,
        destination_cidr: parsed_opt(row, 4)?,
        protocol: parsed(row, 5)?,
        source_ports: port_range(row, 6)?,
        destination_ports: port_range(row, 8)?,
        action: parsed(row, 10)?,
        created_at: parsed(row, 11)?,
        updated_at: parsed(row, 12)?,
    })
}
