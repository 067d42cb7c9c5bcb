//! ---
//! devreg_section: "02-topology"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Uplink topology reconstruction from parent pointers."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
//! Rebuilds the device forest implied by uplink references.
//!
//! Both builders index children once and then assemble the trees
//! bottom-up from a breadth-first visit order, so the depth of an uplink
//! chain never translates into call-stack depth. Dropping a node is
//! iterative as well. Serializing a node recurses once per level, which is
//! why registration caps chains at [`MAX_TOPOLOGY_DEPTH`].

use std::collections::HashMap;

use devreg_logging::{reg_warn, LogContext};
use serde::{Deserialize, Serialize};

use crate::model::Device;

/// Deepest uplink chain the registry accepts, counted in devices from the
/// root down, the root included.
pub const MAX_TOPOLOGY_DEPTH: usize = 1_000;

/// One device in a reconstructed topology together with its downstream devices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub mac_address: String,
    #[serde(default)]
    pub children: Vec<TopologyNode>,
}

impl TopologyNode {
    pub fn new(mac_address: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: TopologyNode) {
        self.children.push(child);
    }

    /// Number of nodes in this tree, the node itself included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }

    /// Number of levels in this tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1usize)];
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.children.iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

impl Drop for TopologyNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Reconstruct every tree whose root has no uplink.
///
/// Children keep the order of `devices`. A device whose uplink does not
/// resolve to any device in the input is dropped, and so is every device on
/// an uplink cycle, since none of them is reachable from a root.
pub fn build_forest(devices: &[Device]) -> Vec<TopologyNode> {
    let index = ChildIndex::new(devices);
    let roots: Vec<usize> = devices
        .iter()
        .enumerate()
        .filter(|(_, device)| device.uplink.is_none())
        .map(|(position, _)| position)
        .collect();
    index.assemble(roots, vec![false; devices.len()])
}

/// Reconstruct the tree below `root_mac`.
///
/// The root node is produced even if `root_mac` is not among `devices`.
/// Each MAC appears at most once: a device that would re-enter a node already
/// in the tree closes an uplink cycle and is left out with a warning.
pub fn build_subtree(root_mac: &str, devices: &[Device]) -> TopologyNode {
    let index = ChildIndex::new(devices);
    let mut visited = vec![false; devices.len()];
    if let Some(&root) = index.position.get(root_mac) {
        visited[root] = true;
    }

    let mut starts = Vec::new();
    for (position, device) in devices.iter().enumerate() {
        if device.uplink.as_deref() != Some(root_mac) {
            continue;
        }
        if visited[position] {
            warn_cycle(&device.mac_address, root_mac);
            continue;
        }
        starts.push(position);
    }

    let mut root = TopologyNode::new(root_mac);
    root.children = index.assemble(starts, visited);
    root
}

struct ChildIndex<'a> {
    devices: &'a [Device],
    position: HashMap<&'a str, usize>,
    children: Vec<Vec<usize>>,
}

impl<'a> ChildIndex<'a> {
    fn new(devices: &'a [Device]) -> Self {
        let position: HashMap<&str, usize> = devices
            .iter()
            .enumerate()
            .map(|(position, device)| (device.mac_address.as_str(), position))
            .collect();

        let mut children = vec![Vec::new(); devices.len()];
        for (child, device) in devices.iter().enumerate() {
            if let Some(&parent) = device
                .uplink
                .as_deref()
                .and_then(|uplink| position.get(uplink))
            {
                children[parent].push(child);
            }
        }

        Self {
            devices,
            position,
            children,
        }
    }

    /// Build the trees rooted at `starts`, skipping anything already `visited`.
    fn assemble(&self, starts: Vec<usize>, mut visited: Vec<bool>) -> Vec<TopologyNode> {
        let mut order = Vec::with_capacity(self.devices.len());
        for &start in &starts {
            visited[start] = true;
            order.push(start);
        }

        let mut kept: Vec<Vec<usize>> = vec![Vec::new(); self.devices.len()];
        let mut cursor = 0;
        while cursor < order.len() {
            let parent = order[cursor];
            cursor += 1;
            for &child in &self.children[parent] {
                if visited[child] {
                    warn_cycle(
                        &self.devices[child].mac_address,
                        &self.devices[parent].mac_address,
                    );
                    continue;
                }
                visited[child] = true;
                kept[parent].push(child);
                order.push(child);
            }
        }

        let mut built: Vec<Option<TopologyNode>> = Vec::with_capacity(self.devices.len());
        built.resize_with(self.devices.len(), || None);
        for &position in order.iter().rev() {
            let children = kept[position]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[position] = Some(TopologyNode {
                mac_address: self.devices[position].mac_address.clone(),
                children,
            });
        }

        starts
            .iter()
            .filter_map(|&start| built[start].take())
            .collect()
    }
}

fn warn_cycle(mac: &str, uplink: &str) {
    let ctx = LogContext::new()
        .with_operation("topology")
        .with_mac(mac)
        .with_uplink(Some(uplink));
    reg_warn!(context = ctx, "uplink cycle detected; subtree truncated");
}
