//! Render context for identity templates
//!
//! The context exposes a closed set of fields, named the way ClusterSPIFFEID
//! templates have always referred to them:
//! - `TrustDomain`, `ClusterName`, `ClusterDomain`
//! - `PodMeta.*`, `NodeMeta.*` - object metadata
//! - `PodSpec.*`, `NodeSpec.*` - a curated subset of the object specs
//!
//! Absent Kubernetes fields are rendered as empty strings, maps or lists,
//! never as undefined.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Node, NodeSpec, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use minijinja::Value;
use serde::Serialize;
use spiffe::TrustDomain;

/// All values available to identity templates for a single pod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderContext {
    /// `TrustDomain`
    pub trust_domain: String,
    /// `ClusterName`
    pub cluster_name: String,
    /// `ClusterDomain`, may be empty
    pub cluster_domain: String,
    /// `PodMeta.*`
    pub pod_meta: MetaContext,
    /// `PodSpec.*`
    pub pod_spec: PodSpecContext,
    /// `NodeMeta.*`
    pub node_meta: MetaContext,
    /// `NodeSpec.*`
    pub node_spec: NodeSpecContext,
}

impl RenderContext {
    /// Build the context for `pod` scheduled on `node`
    pub fn new(
        trust_domain: &TrustDomain,
        cluster_name: &str,
        cluster_domain: &str,
        pod: &Pod,
        node: &Node,
    ) -> Self {
        Self {
            trust_domain: trust_domain.to_string(),
            cluster_name: cluster_name.to_string(),
            cluster_domain: cluster_domain.to_string(),
            pod_meta: MetaContext::from(&pod.metadata),
            pod_spec: pod.spec.as_ref().map(PodSpecContext::from).unwrap_or_default(),
            node_meta: MetaContext::from(&node.metadata),
            node_spec: node
                .spec
                .as_ref()
                .map(NodeSpecContext::from)
                .unwrap_or_default(),
        }
    }

    /// `namespace/name` of the pod, used to label errors
    pub fn pod_key(&self) -> String {
        format!("{}/{}", self.pod_meta.namespace, self.pod_meta.name)
    }

    /// Convert to minijinja Value for rendering
    pub fn to_value(&self) -> Value {
        Value::from_serialize(self)
    }
}

/// Object metadata view: `PodMeta.*` and `NodeMeta.*`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaContext {
    /// `Name`
    pub name: String,
    /// `GenerateName`
    pub generate_name: String,
    /// `Namespace`
    pub namespace: String,
    /// `UID`
    #[serde(rename = "UID")]
    pub uid: String,
    /// `Labels.KEY`
    pub labels: BTreeMap<String, String>,
    /// `Annotations.KEY`
    pub annotations: BTreeMap<String, String>,
}

impl From<&ObjectMeta> for MetaContext {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.name.clone().unwrap_or_default(),
            generate_name: meta.generate_name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            uid: meta.uid.clone().unwrap_or_default(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations: meta.annotations.clone().unwrap_or_default(),
        }
    }
}

/// Pod spec view: `PodSpec.*`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PodSpecContext {
    /// `ServiceAccountName`
    pub service_account_name: String,
    /// `NodeName`
    pub node_name: String,
    /// `Hostname`
    pub hostname: String,
    /// `Subdomain`
    pub subdomain: String,
    /// `SchedulerName`
    pub scheduler_name: String,
    /// `PriorityClassName`
    pub priority_class_name: String,
    /// `RuntimeClassName`
    pub runtime_class_name: String,
    /// `NodeSelector.KEY`
    pub node_selector: BTreeMap<String, String>,
    /// `Containers`
    pub containers: Vec<ContainerContext>,
    /// `InitContainers`
    pub init_containers: Vec<ContainerContext>,
}

impl From<&PodSpec> for PodSpecContext {
    fn from(spec: &PodSpec) -> Self {
        Self {
            service_account_name: spec.service_account_name.clone().unwrap_or_default(),
            node_name: spec.node_name.clone().unwrap_or_default(),
            hostname: spec.hostname.clone().unwrap_or_default(),
            subdomain: spec.subdomain.clone().unwrap_or_default(),
            scheduler_name: spec.scheduler_name.clone().unwrap_or_default(),
            priority_class_name: spec.priority_class_name.clone().unwrap_or_default(),
            runtime_class_name: spec.runtime_class_name.clone().unwrap_or_default(),
            node_selector: spec.node_selector.clone().unwrap_or_default(),
            containers: spec.containers.iter().map(ContainerContext::from).collect(),
            init_containers: spec
                .init_containers
                .iter()
                .flatten()
                .map(ContainerContext::from)
                .collect(),
        }
    }
}

/// Container view, element of `PodSpec.Containers`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerContext {
    /// `Name`
    pub name: String,
    /// `Image`
    pub image: String,
}

impl From<&Container> for ContainerContext {
    fn from(container: &Container) -> Self {
        Self {
            name: container.name.clone(),
            image: container.image.clone().unwrap_or_default(),
        }
    }
}

/// Node spec view: `NodeSpec.*`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeSpecContext {
    /// `PodCIDR`
    #[serde(rename = "PodCIDR")]
    pub pod_cidr: String,
    /// `PodCIDRs`
    #[serde(rename = "PodCIDRs")]
    pub pod_cidrs: Vec<String>,
    /// `ProviderID`
    #[serde(rename = "ProviderID")]
    pub provider_id: String,
    /// `Unschedulable`
    pub unschedulable: bool,
}

impl From<&NodeSpec> for NodeSpecContext {
    fn from(spec: &NodeSpec) -> Self {
        Self {
            pod_cidr: spec.pod_cidr.clone().unwrap_or_default(),
            pod_cidrs: spec.pod_cidrs.clone().unwrap_or_default(),
            provider_id: spec.provider_id.clone().unwrap_or_default(),
            unschedulable: spec.unschedulable.unwrap_or_default(),
        }
    }
}

/// Shape of a context field, used to check templates at compile time
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldKind {
    /// Leaf value; no member access allowed
    Scalar,
    /// Leaf list; elements are reached through loops or subscripts
    List,
    /// String map; any key is accepted at compile time
    Map,
    /// Struct with a fixed set of members
    Struct(&'static [(&'static str, FieldKind)]),
}

const META_FIELDS: &[(&str, FieldKind)] = &[
    ("Name", FieldKind::Scalar),
    ("GenerateName", FieldKind::Scalar),
    ("Namespace", FieldKind::Scalar),
    ("UID", FieldKind::Scalar),
    ("Labels", FieldKind::Map),
    ("Annotations", FieldKind::Map),
];

const POD_SPEC_FIELDS: &[(&str, FieldKind)] = &[
    ("ServiceAccountName", FieldKind::Scalar),
    ("NodeName", FieldKind::Scalar),
    ("Hostname", FieldKind::Scalar),
    ("Subdomain", FieldKind::Scalar),
    ("SchedulerName", FieldKind::Scalar),
    ("PriorityClassName", FieldKind::Scalar),
    ("RuntimeClassName", FieldKind::Scalar),
    ("NodeSelector", FieldKind::Map),
    ("Containers", FieldKind::List),
    ("InitContainers", FieldKind::List),
];

const NODE_SPEC_FIELDS: &[(&str, FieldKind)] = &[
    ("PodCIDR", FieldKind::Scalar),
    ("PodCIDRs", FieldKind::List),
    ("ProviderID", FieldKind::Scalar),
    ("Unschedulable", FieldKind::Scalar),
];

/// Top-level fields of [`RenderContext`]
pub(crate) const CONTEXT_FIELDS: &[(&str, FieldKind)] = &[
    ("TrustDomain", FieldKind::Scalar),
    ("ClusterName", FieldKind::Scalar),
    ("ClusterDomain", FieldKind::Scalar),
    ("PodMeta", FieldKind::Struct(META_FIELDS)),
    ("PodSpec", FieldKind::Struct(POD_SPEC_FIELDS)),
    ("NodeMeta", FieldKind::Struct(META_FIELDS)),
    ("NodeSpec", FieldKind::Struct(NODE_SPEC_FIELDS)),
];

/// Check a dotted field path (`PodMeta.Labels.app`) against the schema
pub(crate) fn is_known_field(path: &str) -> bool {
    let mut segments = path.split('.');
    let Some(mut kind) = segments.next().and_then(|root| lookup(CONTEXT_FIELDS, root)) else {
        return false;
    };

    for segment in segments {
        match kind {
            FieldKind::Map => return true,
            FieldKind::Scalar | FieldKind::List => return false,
            FieldKind::Struct(fields) => match lookup(fields, segment) {
                Some(next) => kind = next,
                None => return false,
            },
        }
    }
    true
}

fn lookup(fields: &[(&str, FieldKind)], name: &str) -> Option<FieldKind> {
    fields
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Container;

    fn sample_pod() -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("test".to_string()),
                namespace: Some("namespace".to_string()),
                uid: Some("pod-uid-1".to_string()),
                labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                service_account_name: Some("test".to_string()),
                node_name: Some("node-1".to_string()),
                containers: vec![Container {
                    name: "main".to_string(),
                    image: Some("nginx:1.27".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn sample_node() -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("node-1".to_string()),
                uid: Some("uid".to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                provider_id: Some("aws:///us-east-1a/i-0abc".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn td() -> TrustDomain {
        TrustDomain::new("example.org").expect("valid trust domain")
    }

    // =========================================================================
    // Story: Context built from Kubernetes objects
    // =========================================================================

    #[test]
    fn test_context_copies_pod_and_node_fields() {
        let ctx = RenderContext::new(&td(), "test", "cluster.local", &sample_pod(), &sample_node());

        assert_eq!(ctx.trust_domain, "example.org");
        assert_eq!(ctx.cluster_name, "test");
        assert_eq!(ctx.cluster_domain, "cluster.local");
        assert_eq!(ctx.pod_meta.name, "test");
        assert_eq!(ctx.pod_meta.uid, "pod-uid-1");
        assert_eq!(ctx.pod_meta.labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(ctx.pod_spec.service_account_name, "test");
        assert_eq!(ctx.pod_spec.containers[0].image, "nginx:1.27");
        assert_eq!(ctx.node_meta.uid, "uid");
        assert_eq!(ctx.node_spec.provider_id, "aws:///us-east-1a/i-0abc");
        assert_eq!(ctx.pod_key(), "namespace/test");
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let ctx = RenderContext::new(&td(), "test", "", &Pod::default(), &Node::default());

        assert_eq!(ctx.cluster_domain, "");
        assert_eq!(ctx.pod_meta.name, "");
        assert!(ctx.pod_meta.labels.is_empty());
        assert_eq!(ctx.pod_spec.service_account_name, "");
        assert!(ctx.pod_spec.containers.is_empty());
        assert_eq!(ctx.node_meta.uid, "");
        assert!(!ctx.node_spec.unschedulable);
    }

    #[test]
    fn test_value_uses_template_field_names() {
        let ctx = RenderContext::new(&td(), "test", "cluster.local", &sample_pod(), &sample_node());
        let json = serde_json::to_value(&ctx).expect("context serializes");

        assert_eq!(json["TrustDomain"], "example.org");
        assert_eq!(json["PodMeta"]["UID"], "pod-uid-1");
        assert_eq!(json["PodSpec"]["ServiceAccountName"], "test");
        assert_eq!(json["NodeSpec"]["ProviderID"], "aws:///us-east-1a/i-0abc");
        assert_eq!(json["NodeSpec"]["PodCIDRs"], serde_json::json!([]));
    }

    // =========================================================================
    // Story: Closed field schema
    // =========================================================================

    #[test]
    fn test_known_fields() {
        assert!(is_known_field("TrustDomain"));
        assert!(is_known_field("PodMeta"));
        assert!(is_known_field("PodMeta.Namespace"));
        assert!(is_known_field("PodSpec.ServiceAccountName"));
        assert!(is_known_field("NodeMeta.UID"));
        assert!(is_known_field("PodMeta.Labels.app"));
        assert!(is_known_field("PodSpec.NodeSelector.zone"));
        assert!(is_known_field("PodSpec.Containers"));
    }

    #[test]
    fn test_unknown_fields() {
        assert!(!is_known_field("Trustdomain"));
        assert!(!is_known_field("PodMeta.Nmae"));
        assert!(!is_known_field("PodSpec.Volumes"));
        assert!(!is_known_field("TrustDomain.Name"));
        assert!(!is_known_field("PodSpec.Containers.Image"));
    }
}
