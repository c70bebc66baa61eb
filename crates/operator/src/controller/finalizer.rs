//! # Finalizers
//!
//! Set operations over a resource's finalizer list.
//!
//! `add_finalizer` and `remove_finalizer` report whether they changed anything;
//! callers skip the write when they didn't, to avoid needless update conflicts.

use kube::{Resource, ResourceExt};

/// Whether `token` is present on the resource
pub fn has_finalizer<K: Resource>(resource: &K, token: &str) -> bool {
    resource.finalizers().iter().any(|f| f == token)
}

/// Add `token` if absent. Returns `true` if the list changed.
pub fn add_finalizer<K: Resource>(resource: &mut K, token: &str) -> bool {
    if has_finalizer(resource, token) {
        return false;
    }
    resource.finalizers_mut().push(token.to_string());
    true
}

/// Remove every occurrence of `token`. Returns `true` if the list changed.
pub fn remove_finalizer<K: Resource>(resource: &mut K, token: &str) -> bool {
    let finalizers = resource.finalizers_mut();
    let before = finalizers.len();
    finalizers.retain(|f| f != token);
    finalizers.len() != before
}

/// Whether deletion has been requested for the resource
pub fn is_being_deleted<K: Resource>(resource: &K) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FINALIZER;
    use k8s_openapi::api::core::v1::ConfigMap;

    fn resource_with(finalizers: &[&str]) -> ConfigMap {
        let mut cm = ConfigMap::default();
        cm.metadata.name = Some("test".to_string());
        if !finalizers.is_empty() {
            cm.metadata.finalizers = Some(finalizers.iter().map(|f| (*f).to_string()).collect());
        }
        cm
    }

    #[test]
    fn test_add_finalizer_adds_once() {
        let mut cm = resource_with(&[]);
        assert!(add_finalizer(&mut cm, FINALIZER));
        assert!(has_finalizer(&cm, FINALIZER));
        assert!(!add_finalizer(&mut cm, FINALIZER));
        assert_eq!(cm.finalizers().len(), 1);
    }

    #[test]
    fn test_remove_finalizer_without_token_is_noop() {
        let mut cm = resource_with(&["other.io/cleanup"]);
        assert!(!remove_finalizer(&mut cm, FINALIZER));
        assert_eq!(cm.finalizers(), &["other.io/cleanup".to_string()]);
    }

    #[test]
    fn test_remove_finalizer_keeps_foreign_tokens() {
        let mut cm = resource_with(&["other.io/cleanup", FINALIZER]);
        assert!(remove_finalizer(&mut cm, FINALIZER));
        assert!(!has_finalizer(&cm, FINALIZER));
        assert!(has_finalizer(&cm, "other.io/cleanup"));
    }

    #[test]
    fn test_is_being_deleted() {
        let mut cm = resource_with(&[]);
        assert!(!is_being_deleted(&cm));
        cm.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2024-05-01T10:00:00Z")).unwrap());
        assert!(is_being_deleted(&cm));
    }
}
