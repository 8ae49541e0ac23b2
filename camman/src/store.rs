use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::config;

/// Point-in-time view of one node. Reachability is a liveness signal, not
/// a capability signal: an unreachable node stays a valid dispatch target
/// and may still hold untransferred footage.
#[derive(Debug, Clone, Serialize)]
pub struct NodeEntry {
    pub alias: String,
    pub url: String,
    #[serde(skip)]
    pub host: String,
    pub reachable: bool,
    pub display_name: String,
}

/// The static node set, in config order. Insertion order defines the
/// default dispatch order; health fields are updated in place by probes
/// and never persisted.
#[derive(Clone)]
pub struct NodeRegistry {
    list: Arc<RwLock<Vec<NodeEntry>>>,
}

impl NodeRegistry {
    pub fn new(nodes: &[config::Node]) -> Self {
        let list = nodes
            .iter()
            .map(|n| NodeEntry {
                alias: n.alias.clone(),
                url: n.url.clone(),
                host: n.host.clone(),
                reachable: false,
                display_name: n.alias.clone(),
            })
            .collect();
        Self {
            list: Arc::new(RwLock::new(list)),
        }
    }

    pub fn snapshot(&self) -> Vec<NodeEntry> {
        self.list.read().unwrap().clone()
    }

    pub fn get(&self, alias: &str) -> Option<NodeEntry> {
        self.list
            .read()
            .unwrap()
            .iter()
            .find(|n| n.alias == alias)
            .cloned()
    }

    pub fn set_health(&self, alias: &str, reachable: bool, identity: Option<String>) {
        if let Some(node) = self
            .list
            .write()
            .unwrap()
            .iter_mut()
            .find(|n| n.alias == alias)
        {
            node.reachable = reachable;
            if let Some(identity) = identity {
                node.display_name = identity;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<config::Node> {
        ["cam01", "cam02", "cam03"]
            .into_iter()
            .map(|alias| config::Node {
                alias: alias.to_string(),
                url: format!("http://{}.local:5000", alias),
                host: String::new(),
            })
            .collect()
    }

    #[test]
    fn preserves_config_order() {
        let registry = NodeRegistry::new(&nodes());
        let aliases: Vec<String> = registry.snapshot().into_iter().map(|n| n.alias).collect();
        assert_eq!(aliases, vec!["cam01", "cam02", "cam03"]);
    }

    #[test]
    fn health_updates_are_in_place() {
        let registry = NodeRegistry::new(&nodes());
        registry.set_health("cam02", true, Some("garage".to_string()));

        let entry = registry.get("cam02").unwrap();
        assert!(entry.reachable);
        assert_eq!(entry.display_name, "garage");
        assert!(!registry.get("cam01").unwrap().reachable);
    }
}
