//! Integration tests for fireflow
//!
//! These tests run against a file-backed SQLite database in a temporary
//! directory, so they exercise WAL mode, the busy timeout and separate
//! connections the way several CLI processes would.
//!
//! ```bash
//! cargo test --test integration_tests
//! ```

#![allow(clippy::uninlined_format_args)]

use fireflow::audit::{AuditLog, EventType};
use fireflow::core::error::{Error, StatusClass, ValidationError, translate};
use fireflow::core::firewall::{
    FirewallCandidate, NormalizedRule, PolicyCandidate, PortPair, Protocol, RuleAction,
    RuleCandidate,
};
use fireflow::core::pagination::{PageRequest, RuleSortKey, SortDirection};
use fireflow::core::service::FirewallService;
use fireflow::core::store::Store;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tempfile::TempDir;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fireflow.db");
    (dir, path)
}

fn open(path: &Path) -> Store {
    Store::open(path, BUSY_TIMEOUT).unwrap()
}

fn firewall_candidate(name: &str) -> FirewallCandidate {
    FirewallCandidate {
        name: name.to_string(),
        environment: "staging".to_string(),
        scope: "eu-west".to_string(),
        description: Some("integration".to_string()),
    }
}

fn policy_candidate(name: &str) -> PolicyCandidate {
    PolicyCandidate {
        name: name.to_string(),
        ..PolicyCandidate::default()
    }
}

fn plain_rule(order_index: i64) -> NormalizedRule {
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

/// Service over a fresh database holding one firewall and one policy
async fn seeded_service(path: &Path) -> (FirewallService, i64, i64) {
    let service = FirewallService::new(open(path));
    let fw = service
        .create_firewall(&firewall_candidate("edge"))
        .await
        .unwrap();
    let pol = service
        .create_policy(fw.id, &policy_candidate("default"))
        .await
        .unwrap();
    (service, fw.id, pol.id)
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_create_rule_normalizes_source() {
    let (_dir, path) = temp_db();
    let (service, fw, pol) = seeded_service(&path).await;

    let candidate = RuleCandidate {
        source_cidr: Some("192.168.1.5/24".to_string()),
        destination_cidr: Some("10.0.0.0/8".to_string()),
        protocol: Some("tcp".to_string()),
        destination_port_minimum: Some(80),
        destination_port_maximum: Some(80),
        ..RuleCandidate::new(1)
    };
    let rule = service.create_rule(fw, pol, &candidate).await.unwrap();
    assert_eq!(rule.source_cidr.unwrap().to_string(), "192.168.1.0/24");

    // Survives a reopen of the database file
    drop(service);
    let store = open(&path);
    let stored = store.get_rule(fw, pol, rule.id).unwrap().unwrap();
    assert_eq!(stored.source_cidr.unwrap().to_string(), "192.168.1.0/24");
    assert_eq!(stored, rule);
}

#[tokio::test]
async fn test_incomplete_port_pair() {
    let (_dir, path) = temp_db();
    let (service, fw, pol) = seeded_service(&path).await;

    let candidate = RuleCandidate {
        source_port_minimum: Some(100),
        source_port_maximum: None,
        ..RuleCandidate::new(1)
    };
    let err = service.create_rule(fw, pol, &candidate).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::IncompletePortPair {
            pair: PortPair::Source
        })
    ));
    assert_eq!(
        translate(&err).message,
        "source_port_minimum/maximum must both be null or 1..65535 with min <= max."
    );
}

#[tokio::test]
async fn test_ip_family_mismatch() {
    let (_dir, path) = temp_db();
    let (service, fw, pol) = seeded_service(&path).await;

    let candidate = RuleCandidate {
        source_cidr: Some("192.168.1.0/24".to_string()),
        destination_cidr: Some("::1/128".to_string()),
        ..RuleCandidate::new(1)
    };
    let err = service.create_rule(fw, pol, &candidate).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::IpFamilyMismatch { .. })
    ));
}

#[tokio::test]
async fn test_duplicate_order_index_conflict() {
    let (_dir, path) = temp_db();
    let (service, fw, pol) = seeded_service(&path).await;

    service
        .create_rule(fw, pol, &RuleCandidate::new(1))
        .await
        .unwrap();
    let err = service
        .create_rule(fw, pol, &RuleCandidate::new(1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DuplicateOrderIndex { policy_id, order_index: 1 } if policy_id == pol
    ));
    assert_eq!(translate(&err).status, StatusClass::Conflict);
}

#[tokio::test]
async fn test_list_fifteen_rules() {
    let (_dir, path) = temp_db();
    let (service, fw, pol) = seeded_service(&path).await;

    for i in 1..=15 {
        service
            .create_rule(fw, pol, &RuleCandidate::new(i * 10))
            .await
            .unwrap();
    }

    let request = PageRequest::new(1, 10)
        .unwrap()
        .sorted(RuleSortKey::OrderIndex, SortDirection::Asc);
    let page = service.list_rules(fw, pol, &request).unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total, 15);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next);

    let order: Vec<i64> = page.items.iter().map(|r| r.order_index).collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted);
}

#[tokio::test]
async fn test_delete_missing_rule_returns_false() {
    let (_dir, path) = temp_db();
    let (service, _, _) = seeded_service(&path).await;
    assert!(!service.store().delete_rule(999).unwrap());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_duplicate_creates_one_winner() {
    let (_dir, path) = temp_db();
    let setup = open(&path);
    let fw = setup
        .create_firewall(&fireflow::core::firewall::NewFirewall {
            name: "race".to_string(),
            environment: fireflow::core::firewall::Environment::Development,
            scope: "ci".to_string(),
            description: None,
        })
        .unwrap();
    let pol = setup
        .create_policy(
            fw.id,
            &fireflow::validators::validate_policy(&policy_candidate("race")).unwrap(),
        )
        .unwrap();
    drop(setup);

    const WRITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                // Each writer gets its own connection, like a separate process
                let store = open(&path);
                barrier.wait();
                store.create_rule(fw.id, pol.id, &plain_rule(1))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one insert may succeed: {:?}", results);

    for err in results.into_iter().filter_map(Result::err) {
        assert!(
            matches!(err, Error::DuplicateOrderIndex { order_index: 1, .. }),
            "unexpected error: {:?}",
            err
        );
    }

    let store = open(&path);
    assert_eq!(store.counts().unwrap().rules, 1);
}

#[test]
fn test_concurrent_distinct_creates_all_succeed() {
    let (_dir, path) = temp_db();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (service, fw, pol) = runtime.block_on(seeded_service(&path));
    drop(service);

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let path = path.clone();
            std::thread::spawn(move || open(&path).create_rule(fw, pol, &plain_rule(i)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let page = open(&path)
        .list_rules(fw, pol, &PageRequest::default())
        .unwrap();
    assert_eq!(page.total, 4);
}

// ============================================================================
// Ownership tree
// ============================================================================

#[tokio::test]
async fn test_cascade_delete_firewall() {
    let (_dir, path) = temp_db();
    let (service, fw, pol) = seeded_service(&path).await;
    let second = service
        .create_policy(fw, &policy_candidate("second"))
        .await
        .unwrap();
    for i in 1..=3 {
        service
            .create_rule(fw, pol, &RuleCandidate::new(i))
            .await
            .unwrap();
        service
            .create_rule(fw, second.id, &RuleCandidate::new(i))
            .await
            .unwrap();
    }
    assert_eq!(service.status().unwrap().rules, 6);

    assert!(service.delete_firewall(fw).await.unwrap());

    let counts = service.status().unwrap();
    assert_eq!(counts.firewalls, 0);
    assert_eq!(counts.policies, 0);
    assert_eq!(counts.rules, 0);
}

#[tokio::test]
async fn test_scoped_lookup_across_firewalls() {
    let (_dir, path) = temp_db();
    let (service, fw_b, policy_x) = seeded_service(&path).await;
    let fw_a = service
        .create_firewall(&firewall_candidate("other"))
        .await
        .unwrap();
    let rule = service
        .create_rule(fw_b, policy_x, &RuleCandidate::new(1))
        .await
        .unwrap();

    let err = service.get_rule(fw_a.id, policy_x, rule.id).unwrap_err();
    assert!(matches!(err, Error::RuleNotFound { .. }));
    assert_eq!(translate(&err).status, StatusClass::NotFound);

    let page = service
        .list_rules(fw_a.id, policy_x, &PageRequest::default())
        .unwrap();
    assert!(page.items.is_empty());

    // Creating under the wrong firewall is a parent failure
    let err = service
        .create_rule(fw_a.id, policy_x, &RuleCandidate::new(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ParentNotFound { .. }));
}

#[tokio::test]
async fn test_duplicate_firewall_name_conflict() {
    let (_dir, path) = temp_db();
    let (service, _, _) = seeded_service(&path).await;
    let err = service
        .create_firewall(&firewall_candidate("edge"))
        .await
        .unwrap_err();
    let translation = translate(&err);
    assert_eq!(translation.status, StatusClass::Conflict);
    assert_eq!(translation.message, "A firewall with this name already exists.");
}

// ============================================================================
// Audit trail
// ============================================================================

#[tokio::test]
async fn test_audit_trail_records_outcomes() {
    let (dir, path) = temp_db();
    let audit = AuditLog::with_path(dir.path().join("audit.log"));
    let service = FirewallService::new(open(&path)).with_audit(audit.clone());

    let fw = service
        .create_firewall(&firewall_candidate("audited"))
        .await
        .unwrap();
    service
        .delete_policy(fw.id, 12345)
        .await
        .unwrap_err();
    service.delete_firewall(fw.id).await.unwrap();

    let events = audit.read_recent(10).await.unwrap();
    let kinds: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::DeleteFirewall,
            EventType::DeletePolicy,
            EventType::CreateFirewall
        ]
    );
    assert!(!events[1].success);
    assert!(events[1].error.as_deref().unwrap().contains("not found"));
}
