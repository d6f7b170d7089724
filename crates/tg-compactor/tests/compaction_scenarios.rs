//! End-to-end compaction scenarios over realistic emulated-device trees.

use serde_json::json;
use std::collections::BTreeMap;
use tg_compactor::{
    CompactedView, CompactionConfig, CompactionStats, ConfigNode, Device, DeviceCompactor, Field,
    Group, Node, Tree,
};

// ============================================================
// Fixtures
// ============================================================

fn ipv4(address: &str) -> ConfigNode {
    ConfigNode::new()
        .with_leaf("name", format!("{address}.ip"))
        .with_leaf("address", address)
        .with_unset("prefix")
        .with_default("prefix", 24)
}

fn ethernet(name: &str, addresses: &[&str]) -> ConfigNode {
    ConfigNode::new()
        .with_leaf("name", format!("{name}.eth"))
        .with_unset("mtu")
        .with_default("mtu", 1500)
        .with_list("ipv4_addresses", addresses.iter().map(|a| ipv4(a)).collect())
}

fn router(name: &str, address: &str) -> ConfigNode {
    ConfigNode::new()
        .with_leaf("name", name)
        .with_leaf("container_name", "port1")
        .with_list("ethernets", vec![ethernet(name, &[address])])
}

fn bgp_router(name: &str, address: &str) -> ConfigNode {
    router(name, address).with_node(
        "bgp",
        ConfigNode::new().with_leaf("router_id", address).with_list("ipv4_interfaces", vec![]),
    )
}

fn address_ranges(name: &str, counts: &[i64]) -> ConfigNode {
    ConfigNode::new().with_leaf("name", name).with_list(
        "ranges",
        counts
            .iter()
            .map(|&c| ConfigNode::new().with_leaf("count", c).with_leaf("start", "10.0.0.1"))
            .collect(),
    )
}

fn compacted_tree<'g, D: Device + ?Sized>(group: &'g Group<'_, D>) -> &'g Tree {
    match group.compacted_view() {
        CompactedView::Tree(t) => t,
        CompactedView::Device(_) => panic!("expected a merged group"),
    }
}

fn t(v: serde_json::Value) -> Tree {
    Tree::from(v)
}

/// Every leaf of the compact tree, including the name lists, must hold
/// `count` values. Folded leaves never hold mappings, so a sequence of
/// mappings is a repeated sub-block.
fn assert_leaf_lengths(compact: &Tree, count: usize, config: &CompactionConfig) {
    let Some(fields) = compact.as_mapping() else {
        return;
    };
    for (key, value) in fields {
        let ignored = config.is_ignored(key) && *key != config.name_list_key;
        if ignored || *key == config.name_key {
            continue;
        }
        match value {
            Tree::Mapping(_) => assert_leaf_lengths(value, count, config),
            Tree::Sequence(items) if items.iter().all(|i| i.as_mapping().is_some()) => {
                for item in items {
                    assert_leaf_lengths(item, count, config);
                }
            }
            _ => assert_eq!(value.as_sequence().map(|v| v.len()), Some(count), "leaf {key}"),
        }
    }
}

// ============================================================
// Worked examples
// ============================================================

#[test]
fn test_two_shapes_two_groups() {
    let a = router("d1", "1.1.1.1");
    let b = router("d2", "1.1.1.2");
    let c = bgp_router("d3", "1.1.1.3");
    let devices = vec![a, b, c];

    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    assert_eq!(groups.len(), 2);

    let first = &groups[0];
    assert_eq!(first.count(), 2);
    let tree = compacted_tree(first);
    assert_eq!(tree.get("name_list"), Some(&t(json!(["d1", "d2"]))));
    let eth = &tree.get("ethernets").and_then(Tree::as_sequence).unwrap()[0];
    assert_eq!(eth.get("mtu"), Some(&t(json!([1500, 1500]))));
    let ip = &eth.get("ipv4_addresses").and_then(Tree::as_sequence).unwrap()[0];
    assert_eq!(ip.get("address"), Some(&t(json!(["1.1.1.1", "1.1.1.2"]))));
    assert_eq!(ip.get("prefix"), Some(&t(json!([24, 24]))));

    let second = &groups[1];
    assert_eq!(second.count(), 1);
    match second.compacted_view() {
        CompactedView::Device(d) => assert!(std::ptr::eq(d, &devices[2])),
        CompactedView::Tree(_) => panic!("singleton must stay uncompacted"),
    }
}

#[test]
fn test_matching_ranges_merge_per_position() {
    let devices = vec![address_ranges("D1", &[10, 10]), address_ranges("D2", &[5, 5])];
    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    assert_eq!(groups.len(), 1);
    let tree = compacted_tree(&groups[0]);
    assert_eq!(
        tree.get("ranges"),
        Some(&t(json!([
            {"count": [10, 5], "start": ["10.0.0.1", "10.0.0.1"]},
            {"count": [10, 5], "start": ["10.0.0.1", "10.0.0.1"]}
        ])))
    );
}

#[test]
fn test_range_count_mismatch_splits() {
    let devices = vec![address_ranges("D3", &[10]), address_ranges("D4", &[10, 10])];
    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.is_singleton()));
}

// ============================================================
// Properties
// ============================================================

#[test]
fn test_deterministic() {
    let devices: Vec<ConfigNode> = (0..20)
        .map(|i| {
            let name = format!("r{i}");
            if i % 3 == 0 { bgp_router(&name, "2.2.2.2") } else { router(&name, "3.3.3.3") }
        })
        .collect();
    let compactor = DeviceCompactor::default();
    let first = compactor.compact(&devices).unwrap();
    let second = compactor.compact(&devices).unwrap();
    assert_eq!(first.len(), second.len());
    for (g1, g2) in first.iter().zip(&second) {
        assert_eq!(g1.count(), g2.count());
        for (m1, m2) in g1.members().iter().zip(g2.members()) {
            assert!(std::ptr::eq(*m1, *m2));
        }
        assert_eq!(compacted_tree(g1), compacted_tree(g2));
    }
}

#[test]
fn test_group_order_follows_first_appearance() {
    let devices = vec![
        bgp_router("b1", "1.0.0.1"),
        router("r1", "1.0.0.2"),
        bgp_router("b2", "1.0.0.3"),
        address_ranges("x1", &[1]),
        router("r2", "1.0.0.4"),
    ];
    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    let founders: Vec<*const ConfigNode> =
        groups.iter().map(|g| g.founder() as *const ConfigNode).collect();
    let expected: Vec<*const ConfigNode> =
        [0, 1, 3].iter().map(|&i| &devices[i] as *const ConfigNode).collect();
    assert_eq!(founders, expected);
    assert_eq!(groups.iter().map(|g| g.count()).collect::<Vec<_>>(), vec![2, 2, 1]);
}

#[test]
fn test_leaf_sequences_match_count() {
    let config = CompactionConfig::default();
    let devices: Vec<ConfigNode> =
        (0..7).map(|i| router(&format!("r{i}"), &format!("10.0.0.{i}"))).collect();
    let groups = DeviceCompactor::new(config.clone()).compact(&devices).unwrap();
    assert_eq!(groups.len(), 1);
    let g = &groups[0];
    assert_leaf_lengths(compacted_tree(g), g.count(), &config);
    assert_eq!(g.member_names().len(), 7);
}

#[test]
fn test_leaf_sets_differ_between_members() {
    let config = CompactionConfig::default();
    let tuned = |name: &str, address: &str| router(name, address).with_leaf("mtu", 9000);
    let devices = vec![
        tuned("r0", "10.1.0.1"),
        router("r1", "10.1.0.2"),
        router("r2", "10.1.0.3").with_leaf("description", "spine"),
        router("r3", "10.1.0.4"),
        tuned("r4", "10.1.0.5"),
    ];
    let groups = DeviceCompactor::new(config.clone()).compact(&devices).unwrap();
    assert_eq!(groups.len(), 1);
    let g = &groups[0];
    let tree = compacted_tree(g);
    assert_leaf_lengths(tree, g.count(), &config);
    assert_eq!(tree.get("mtu"), Some(&t(json!([9000, null, null, null, 9000]))));
    assert_eq!(tree.get("description"), Some(&t(json!([null, null, "spine", null, null]))));
    let names: Vec<&str> = g.member_names().iter().filter_map(Tree::as_str).collect();
    assert_eq!(names, ["r0", "r1", "r2", "r3", "r4"]);
}

#[test]
fn test_unsupported_node_never_merges() {
    let with_policies = |name: &str| {
        router(name, "4.4.4.4").with_node(
            "bgp",
            ConfigNode::new()
                .with_list("sr_te_policies", vec![ConfigNode::new().with_leaf("color", 100)]),
        )
    };
    let devices = vec![with_policies("p1"), with_policies("p2")];
    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.is_singleton()));
}

#[test]
fn test_identical_devices_repeat_values() {
    let devices: Vec<ConfigNode> = (0..4).map(|_| router("same", "5.5.5.5")).collect();
    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    assert_eq!(groups.len(), 1);
    let tree = compacted_tree(&groups[0]);
    assert_eq!(tree.get("name_list"), Some(&t(json!(["same", "same", "same", "same"]))));
    let eth = &tree.get("ethernets").and_then(Tree::as_sequence).unwrap()[0];
    assert_eq!(eth.get("mtu"), Some(&t(json!([1500, 1500, 1500, 1500]))));
}

#[test]
fn test_stats_over_mixed_batch() {
    let mut devices: Vec<ConfigNode> =
        (0..9).map(|i| router(&format!("r{i}"), "6.6.6.6")).collect();
    devices.push(bgp_router("edge", "6.6.6.7"));
    let groups = DeviceCompactor::default().compact(&devices).unwrap();
    let stats = CompactionStats::from_groups(&groups);
    assert_eq!(stats.devices, 10);
    assert_eq!(stats.groups, 2);
    assert_eq!(stats.singletons, 1);
    assert_eq!(stats.largest_group, 9);
    assert!((stats.reduction_pct - 80.0).abs() < 1e-9);
    let reported = serde_json::to_value(stats).unwrap();
    assert_eq!(reported["groups"], json!(2));
}

#[test]
fn test_custom_config_from_json() {
    let config = CompactionConfig::from_json_str(r#"{"unsupported_nodes": ["bgp"]}"#).unwrap();
    let devices = vec![bgp_router("b1", "7.7.7.1"), bgp_router("b2", "7.7.7.2")];
    let groups = DeviceCompactor::new(config).compact(&devices).unwrap();
    assert_eq!(groups.len(), 2);
}

// ============================================================
// Hand-written device model
// ============================================================

struct Vlan {
    id: u32,
    priority: Option<u32>,
}

impl Node for Vlan {
    fn properties(&self) -> Vec<(String, Field<'_>)> {
        vec![("id".into(), Field::Leaf), ("priority".into(), Field::Leaf)]
    }

    fn default_of(&self, name: &str) -> Option<Tree> {
        (name == "priority").then(|| Tree::from(0))
    }
}

struct Host {
    name: String,
    vlans: Vec<Vlan>,
}

impl Node for Host {
    fn properties(&self) -> Vec<(String, Field<'_>)> {
        vec![
            ("name".into(), Field::Leaf),
            ("vlans".into(), Field::List(self.vlans.iter().map(|v| v as &dyn Node).collect())),
        ]
    }

    fn default_of(&self, _name: &str) -> Option<Tree> {
        None
    }
}

impl Device for Host {
    fn render(&self) -> Tree {
        let vlans = self
            .vlans
            .iter()
            .map(|v| {
                let mut m = BTreeMap::new();
                m.insert("id".to_string(), Tree::from(v.id));
                if let Some(p) = v.priority {
                    m.insert("priority".to_string(), Tree::from(p));
                }
                Tree::Mapping(m)
            })
            .collect();
        let mut m = BTreeMap::new();
        m.insert("name".to_string(), Tree::from(self.name.as_str()));
        m.insert("vlans".to_string(), Tree::Sequence(vlans));
        Tree::Mapping(m)
    }
}

#[test]
fn test_custom_device_model() {
    let vlan = |id, priority| Vlan { id, priority };
    let host = |name: &str, vlans| Host { name: name.into(), vlans };
    let hosts = vec![
        host("h1", vec![vlan(10, None), vlan(20, Some(3))]),
        host("h2", vec![vlan(11, Some(7)), vlan(21, None)]),
        host("h3", vec![vlan(12, None)]),
    ];
    let groups = DeviceCompactor::default().compact(&hosts).unwrap();
    assert_eq!(groups.len(), 2);
    let tree = compacted_tree(&groups[0]);
    assert_eq!(
        tree.to_json(),
        json!({
            "name": "h1",
            "name_list": ["h1", "h2"],
            "vlans": [
                {"id": [10, 11], "priority": [0, 7]},
                {"id": [20, 21], "priority": [3, 0]}
            ]
        })
    );
    assert!(groups[1].is_singleton());
}
