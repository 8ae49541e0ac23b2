use api::request::Role;

use crate::config::Config;

/// The master assignment is a fixed, deterministic rule from config, not
/// a runtime negotiation: restarts never need consensus to agree on the
/// session timeline owner.
pub fn master_alias(cfg: &Config) -> Option<String> {
    cfg.session
        .master
        .clone()
        .or_else(|| cfg.nodes.first().map(|n| n.alias.clone()))
}

pub fn role_for(cfg: &Config, alias: &str) -> Role {
    match master_alias(cfg) {
        Some(master) if master == alias => Role::Master,
        _ => Role::Client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Node;

    fn cfg_with_nodes(master: Option<&str>) -> Config {
        let mut cfg = Config::default();
        cfg.nodes = ["cam01", "cam02", "cam03"]
            .into_iter()
            .map(|alias| Node {
                alias: alias.to_string(),
                url: format!("http://{}:5000", alias),
                host: String::new(),
            })
            .collect();
        cfg.session.master = master.map(|m| m.to_string());
        cfg
    }

    #[test]
    fn configured_master_wins() {
        let cfg = cfg_with_nodes(Some("cam02"));
        assert_eq!(role_for(&cfg, "cam02"), Role::Master);
        assert_eq!(role_for(&cfg, "cam01"), Role::Client);
        assert_eq!(role_for(&cfg, "cam03"), Role::Client);
    }

    #[test]
    fn first_node_is_master_by_default() {
        let cfg = cfg_with_nodes(None);
        assert_eq!(role_for(&cfg, "cam01"), Role::Master);
        assert_eq!(role_for(&cfg, "cam02"), Role::Client);
    }

    #[test]
    fn exactly_one_master_per_fleet() {
        for master in [None, Some("cam02")] {
            let cfg = cfg_with_nodes(master);
            let masters = cfg
                .nodes
                .iter()
                .filter(|n| role_for(&cfg, &n.alias) == Role::Master)
                .count();
            assert_eq!(masters, 1);
        }
    }

    #[test]
    fn empty_fleet_has_no_master() {
        let cfg = Config::default();
        assert_eq!(master_alias(&cfg), None);
    }
}
