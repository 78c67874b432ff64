//! DNS names for registration entries
//!
//! Names come from two places: the services fronting a pod (auto-populated)
//! and the ClusterSPIFFEID's DNS name templates. The merged set is
//! deduplicated, validated label by label and returned sorted so that
//! entries compare equal across reconciliation passes.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::endpoints::ServiceEndpoint;

/// Maximum length of a single DNS label (RFC 1035)
pub const MAX_LABEL_LENGTH: usize = 63;

static LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?$").expect("label regex is valid")
});

/// Validate every label of `name`
///
/// Only per-label rules are enforced; the total name length is not checked.
/// The returned message names the offending label.
pub fn validate_dns_name(name: &str) -> Result<(), String> {
    for label in name.split('.') {
        if label.len() > MAX_LABEL_LENGTH {
            return Err(format!("label length exceeded: {label}"));
        }
        if !LABEL_REGEX.is_match(label) {
            return Err(format!("label does not match regex: {label}"));
        }
    }
    Ok(())
}

/// The DNS names a service makes resolvable for its pods
///
/// `<name>`, `<name>.<namespace>`, `<name>.<namespace>.svc` and, when the
/// cluster domain is known, `<name>.<namespace>.svc.<clusterDomain>`.
pub fn service_dns_names(endpoint: &ServiceEndpoint, cluster_domain: &str) -> Vec<String> {
    let name = &endpoint.name;
    let namespace = &endpoint.namespace;
    let mut names = vec![
        name.clone(),
        format!("{name}.{namespace}"),
        format!("{name}.{namespace}.svc"),
    ];
    if !cluster_domain.is_empty() {
        names.push(format!("{name}.{namespace}.svc.{cluster_domain}"));
    }
    names
}

/// A set of DNS names that lives for one derivation
#[derive(Debug, Default)]
pub struct DnsNameSet {
    names: Vec<String>,
    seen: HashSet<String>,
}

/// A name rejected by [`DnsNameSet::insert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDnsName {
    /// Full offending name
    pub name: String,
    /// Rule that failed
    pub reason: String,
}

impl DnsNameSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a name; duplicates are dropped silently
    pub fn insert(&mut self, name: String) -> Result<(), InvalidDnsName> {
        if self.seen.contains(&name) {
            return Ok(());
        }
        validate_dns_name(&name).map_err(|reason| InvalidDnsName {
            name: name.clone(),
            reason,
        })?;
        self.seen.insert(name.clone());
        self.names.push(name);
        Ok(())
    }

    /// Add the names of every service endpoint, in order
    pub fn extend_with_services(
        &mut self,
        endpoints: &[ServiceEndpoint],
        cluster_domain: &str,
    ) -> Result<(), InvalidDnsName> {
        for endpoint in endpoints {
            for name in service_dns_names(endpoint, cluster_domain) {
                self.insert(name)?;
            }
        }
        Ok(())
    }

    /// Consume the set, returning names in ascending order
    pub fn into_sorted(self) -> Vec<String> {
        let mut names = self.names;
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str, namespace: &str) -> ServiceEndpoint {
        ServiceEndpoint {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    // =========================================================================
    // Story: Label validation
    // =========================================================================

    #[test]
    fn accepts_ordinary_names() {
        for name in [
            "a",
            "web",
            "web-0.prod.svc.cluster.local",
            "A1-b2",
            "0abc",
            "x".repeat(MAX_LABEL_LENGTH).as_str(),
        ] {
            assert_eq!(validate_dns_name(name), Ok(()), "name: {name}");
        }
    }

    #[test]
    fn rejects_trailing_hyphen() {
        assert_eq!(
            validate_dns_name("a-"),
            Err("label does not match regex: a-".to_string())
        );
    }

    #[test]
    fn rejects_leading_hyphen_in_later_label() {
        assert_eq!(
            validate_dns_name("web.-prod"),
            Err("label does not match regex: -prod".to_string())
        );
    }

    #[test]
    fn rejects_disallowed_character() {
        assert_eq!(
            validate_dns_name("a@b"),
            Err("label does not match regex: a@b".to_string())
        );
    }

    #[test]
    fn rejects_empty_label() {
        assert!(validate_dns_name("web..svc").is_err());
        assert!(validate_dns_name("").is_err());
        assert!(validate_dns_name("web.").is_err());
    }

    #[test]
    fn rejects_long_label() {
        let label = "x".repeat(MAX_LABEL_LENGTH + 1);
        assert_eq!(
            validate_dns_name(&format!("{label}.svc")),
            Err(format!("label length exceeded: {label}"))
        );
    }

    #[test]
    fn total_length_is_not_limited() {
        let label = "x".repeat(MAX_LABEL_LENGTH);
        let name = [label.as_str(); 5].join(".");
        assert!(name.len() > 253);
        assert_eq!(validate_dns_name(&name), Ok(()));
    }

    // =========================================================================
    // Story: Service names
    // =========================================================================

    #[test]
    fn service_names_with_cluster_domain() {
        assert_eq!(
            service_dns_names(&endpoint("api", "payments"), "cluster.local"),
            vec![
                "api",
                "api.payments",
                "api.payments.svc",
                "api.payments.svc.cluster.local"
            ]
        );
    }

    #[test]
    fn service_names_without_cluster_domain() {
        assert_eq!(
            service_dns_names(&endpoint("api", "payments"), ""),
            vec!["api", "api.payments", "api.payments.svc"]
        );
    }

    // =========================================================================
    // Story: Set semantics
    // =========================================================================

    #[test]
    fn duplicates_are_dropped_and_output_sorted() {
        let mut set = DnsNameSet::new();
        set.extend_with_services(
            &[endpoint("web", "prod"), endpoint("api", "prod")],
            "cluster.local",
        )
        .expect("service names are valid");
        set.insert("web.prod.svc".to_string())
            .expect("duplicate is accepted");
        set.insert("zeta".to_string()).expect("valid name");

        let names = set.into_sorted();
        assert_eq!(names.len(), 9);
        let mut expected = names.clone();
        expected.sort();
        expected.dedup();
        assert_eq!(names, expected);
        assert_eq!(names.first().map(String::as_str), Some("api"));
        assert_eq!(names.last().map(String::as_str), Some("zeta"));
    }

    #[test]
    fn invalid_name_reports_full_name() {
        let mut set = DnsNameSet::new();
        let err = set
            .insert("test@end".to_string())
            .expect_err("invalid name must be rejected");
        assert_eq!(
            err,
            InvalidDnsName {
                name: "test@end".to_string(),
                reason: "label does not match regex: test@end".to_string(),
            }
        );
        assert!(set.into_sorted().is_empty());
    }

    #[test]
    fn invalid_service_name_is_rejected() {
        let mut set = DnsNameSet::new();
        let err = set
            .extend_with_services(&[endpoint("api", "bad_ns")], "")
            .expect_err("underscore is not a valid label character");
        assert_eq!(err.name, "api.bad_ns");
    }
}
