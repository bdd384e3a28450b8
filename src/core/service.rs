//! Use cases over the firewall → policy → rule tree
//!
//! Each mutating call validates its candidate, hands the normalized value to
//! the [`Store`], logs the outcome and, when configured, appends an audit
//! event. Failures are returned unchanged; callers map them to a client
//! message with [`crate::core::error::translate`].

use crate::audit::{AuditLog, EventType};
use crate::core::error::{Error, Result, translate};
use crate::core::firewall::{
    FilteringPolicy, Firewall, FirewallCandidate, FirewallRule, PolicyCandidate, RuleCandidate,
};
use crate::core::pagination::{FirewallSortKey, Page, PageRequest, PolicySortKey, RuleSortKey};
use crate::core::store::{Store, StoreCounts};
use crate::validators::{validate_firewall, validate_policy, validate_rule};
use serde_json::json;

/// Entry point for every operation the CLI exposes
pub struct FirewallService {
    store: Store,
    audit: Option<AuditLog>,
}

impl FirewallService {
    pub fn new(store: Store) -> Self {
        Self { store, audit: None }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    async fn record<T>(&self, event_type: EventType, details: serde_json::Value, result: &Result<T>) {
        match result {
            Ok(_) => tracing::info!("{:?} succeeded: {}", event_type, details),
            Err(e) => tracing::warn!("{:?} rejected: {}", event_type, e),
        }
        if let Some(audit) = &self.audit {
            let error = result.as_ref().err().map(|e| translate(e).message);
            audit.record(event_type, details, error).await;
        }
    }

    /// Confirms storage is reachable and reports row counts
    pub fn status(&self) -> Result<StoreCounts> {
        self.store.ping()?;
        self.store.counts()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Firewalls
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn create_firewall(&self, candidate: &FirewallCandidate) -> Result<Firewall> {
        let result = validate_firewall(candidate)
            .map_err(Error::from)
            .and_then(|firewall| self.store.create_firewall(&firewall));

        let details = match &result {
            Ok(fw) => json!({ "firewall_id": fw.id, "name": fw.name }),
            Err(_) => json!({ "name": candidate.name }),
        };
        self.record(EventType::CreateFirewall, details, &result).await;
        result
    }

    pub fn get_firewall(&self, firewall_id: i64) -> Result<Firewall> {
        self.store
            .get_firewall(firewall_id)?
            .ok_or(Error::FirewallNotFound(firewall_id))
    }

    pub fn list_firewalls(&self, request: &PageRequest<FirewallSortKey>) -> Result<Page<Firewall>> {
        self.store.list_firewalls(request)
    }

    /// Deletes a firewall and everything it owns
    pub async fn delete_firewall(&self, firewall_id: i64) -> Result<bool> {
        let result = self.get_firewall(firewall_id).and_then(|_| self.store.delete_firewall(firewall_id));
        self.record(
            EventType::DeleteFirewall,
            json!({ "firewall_id": firewall_id }),
            &result,
        )
        .await;
        result
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Filtering policies
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn create_policy(
        &self,
        firewall_id: i64,
        candidate: &PolicyCandidate,
    ) -> Result<FilteringPolicy> {
        let result = validate_policy(candidate)
            .map_err(Error::from)
            .and_then(|policy| self.store.create_policy(firewall_id, &policy));

        let details = match &result {
            Ok(policy) => json!({ "firewall_id": firewall_id, "policy_id": policy.id }),
            Err(_) => json!({ "firewall_id": firewall_id, "name": candidate.name }),
        };
        self.record(EventType::CreatePolicy, details, &result).await;
        result
    }

    pub fn get_policy(&self, firewall_id: i64, policy_id: i64) -> Result<FilteringPolicy> {
        self.store
            .get_policy(firewall_id, policy_id)?
            .ok_or(Error::ParentNotFound {
                firewall_id,
                policy_id,
            })
    }

    pub fn list_policies(
        &self,
        firewall_id: i64,
        request: &PageRequest<PolicySortKey>,
    ) -> Result<Page<FilteringPolicy>> {
        self.store.list_policies(firewall_id, request)
    }

    pub async fn delete_policy(&self, firewall_id: i64, policy_id: i64) -> Result<bool> {
        let result = self
            .get_policy(firewall_id, policy_id)
            .and_then(|_| self.store.delete_policy(firewall_id, policy_id));
        self.record(
            EventType::DeletePolicy,
            json!({ "firewall_id": firewall_id, "policy_id": policy_id }),
            &result,
        )
        .await;
        result
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Firewall rules
    // ═══════════════════════════════════════════════════════════════════════

    /// Validates a candidate and persists it under `(firewall_id, policy_id)`.
    ///
    /// Validation runs first, so a malformed candidate is rejected even when
    /// the parent does not exist.
    pub async fn create_rule(
        &self,
        firewall_id: i64,
        policy_id: i64,
        candidate: &RuleCandidate,
    ) -> Result<FirewallRule> {
        let result = validate_rule(candidate)
            .map_err(Error::from)
            .and_then(|rule| self.store.create_rule(firewall_id, policy_id, &rule));

        let mut details = json!({
            "firewall_id": firewall_id,
            "policy_id": policy_id,
            "order_index": candidate.order_index,
        });
        if let Ok(rule) = &result {
            details["rule_id"] = json!(rule.id);
        }
        self.record(EventType::CreateRule, details, &result).await;
        result
    }

    pub fn list_rules(
        &self,
        firewall_id: i64,
        policy_id: i64,
        request: &PageRequest<RuleSortKey>,
    ) -> Result<Page<FirewallRule>> {
        self.store.list_rules(firewall_id, policy_id, request)
    }

    pub fn get_rule(&self, firewall_id: i64, policy_id: i64, rule_id: i64) -> Result<FirewallRule> {
        self.store
            .get_rule(firewall_id, policy_id, rule_id)?
            .ok_or(Error::RuleNotFound {
                firewall_id,
                policy_id,
                rule_id,
            })
    }

    /// Scoped delete: the chain must exist, then the flat delete runs
    pub async fn delete_rule(&self, firewall_id: i64, policy_id: i64, rule_id: i64) -> Result<bool> {
        let result = self
            .get_rule(firewall_id, policy_id, rule_id)
            .and_then(|_| self.store.delete_rule(rule_id));
        self.record(
            EventType::DeleteRule,
            json!({
                "firewall_id": firewall_id,
                "policy_id": policy_id,
                "rule_id": rule_id,
            }),
            &result,
        )
        .await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{StatusClass, ValidationError};
    use crate::core::firewall::PortPair;
    use crate::core::test_helpers::{seeded_store, web_candidate};

    fn seeded_service() -> (FirewallService, i64, i64) {
        let (store, fw, pol) = seeded_store();
        (FirewallService::new(store), fw.id, pol.id)
    }

    #[tokio::test]
    async fn test_create_firewall_validates() {
        let (service, _, _) = seeded_service();
        let candidate = FirewallCandidate {
            name: "dmz".to_string(),
            environment: "qa".to_string(),
            scope: "lab".to_string(),
            description: None,
        };
        let err = service.create_firewall(&candidate).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidChoice {
                field: "environment",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_create_policy_defaults() {
        let (service, fw, _) = seeded_service();
        let candidate = PolicyCandidate {
            name: "web".to_string(),
            ..PolicyCandidate::default()
        };
        let policy = service.create_policy(fw, &candidate).await.unwrap();
        assert_eq!(policy.priority, 100);
        assert_eq!(service.get_policy(fw, policy.id).unwrap(), policy);
    }

    #[tokio::test]
    async fn test_validation_precedes_parent_check() {
        let (service, fw, _) = seeded_service();
        let mut candidate = RuleCandidate::new(1);
        candidate.source_port_minimum = Some(100);

        let err = service.create_rule(fw, 9999, &candidate).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::IncompletePortPair {
                pair: PortPair::Source
            })
        ));
    }

    #[tokio::test]
    async fn test_create_rule_normalizes() {
        let (service, fw, pol) = seeded_service();
        let rule = service.create_rule(fw, pol, &web_candidate(1)).await.unwrap();
        assert_eq!(rule.source_cidr.unwrap().to_string(), "192.168.1.0/24");
        assert_eq!(service.get_rule(fw, pol, rule.id).unwrap(), rule);
    }

    #[tokio::test]
    async fn test_delete_rule_scoped() {
        let (service, fw, pol) = seeded_service();
        let rule = service.create_rule(fw, pol, &web_candidate(1)).await.unwrap();

        let err = service.delete_rule(fw + 1, pol, rule.id).await.unwrap_err();
        assert_eq!(translate(&err).status, StatusClass::NotFound);

        assert!(service.delete_rule(fw, pol, rule.id).await.unwrap());
        let err = service.delete_rule(fw, pol, rule.id).await.unwrap_err();
        assert!(matches!(err, Error::RuleNotFound { rule_id, .. } if rule_id == rule.id));
    }

    #[tokio::test]
    async fn test_delete_missing_firewall() {
        let (service, fw, _) = seeded_service();
        assert!(matches!(
            service.delete_firewall(fw + 10).await.unwrap_err(),
            Error::FirewallNotFound(_)
        ));
        assert!(service.delete_firewall(fw).await.unwrap());
        assert_eq!(service.status().unwrap().policies, 0);
    }

    #[tokio::test]
    async fn test_mutations_are_audited() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::with_path(dir.path().join("audit.log"));
        let (store, fw, pol) = seeded_store();
        let service = FirewallService::new(store).with_audit(audit.clone());

        service.create_rule(fw.id, pol.id, &web_candidate(1)).await.unwrap();
        service
            .create_rule(fw.id, pol.id, &web_candidate(1))
            .await
            .unwrap_err();

        let events = audit.read_recent(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(!events[0].success);
        assert_eq!(
            events[0].error.as_deref(),
            Some("A rule with this order_index already exists in this policy.")
        );
        assert!(events[1].success);
        assert_eq!(events[1].event_type, EventType::CreateRule);
    }
}
