// ============================================================================
// Layer tree operations — pure functions, input tree in, new tree out
// ============================================================================
//
// Every operation preserves the global id-uniqueness invariant and treats a
// missing id as a no-op. Old trees are never mutated in place, so history
// snapshots holding previous trees stay valid.

use std::collections::HashSet;

use uuid::Uuid;

use crate::canvas::{Group, Layer, LayerNode, PixelStore};

/// Depth-first search for a node by id, descending into groups.
pub fn find(layers: &[LayerNode], id: Uuid) -> Option<&LayerNode> {
    for node in layers {
        if node.id() == id {
            return Some(node);
        }
        if let LayerNode::Group(g) = node
            && let Some(found) = find(&g.children, id)
        {
            return Some(found);
        }
    }
    None
}

/// Id of the first paintable leaf in pre-order, descending into groups.
pub fn first_leaf_id(layers: &[LayerNode]) -> Option<Uuid> {
    for node in layers {
        match node {
            LayerNode::Layer(l) => return Some(l.id),
            LayerNode::Group(g) => {
                if let Some(id) = first_leaf_id(&g.children) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// Return a new tree with `f` applied to the node matching `id`.
/// No-op (returns a plain clone) when the id is absent.
pub fn update_by_id(layers: &[LayerNode], id: Uuid, f: &dyn Fn(&mut LayerNode)) -> Vec<LayerNode> {
    layers
        .iter()
        .map(|node| {
            let mut node = node.clone();
            apply_in_place(&mut node, id, f);
            node
        })
        .collect()
}

fn apply_in_place(node: &mut LayerNode, id: Uuid, f: &dyn Fn(&mut LayerNode)) {
    if node.id() == id {
        f(node);
        return;
    }
    if let LayerNode::Group(g) = node {
        for child in &mut g.children {
            apply_in_place(child, id, f);
        }
    }
}

/// Replace the pixel store of the layer matching `id`.
pub fn replace_pixels(layers: &[LayerNode], id: Uuid, pixels: PixelStore) -> Vec<LayerNode> {
    update_by_id(layers, id, &move |node| {
        if let LayerNode::Layer(l) = node {
            l.pixels = pixels.clone();
        }
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    /// Toward the front of the list (index 0 paints on top).
    Up,
    Down,
}

/// Swap the node matching `id` with its immediate sibling, at whatever
/// nesting depth the id is found. No-op at a list boundary.
pub fn move_node(layers: &[LayerNode], id: Uuid, direction: MoveDirection) -> Vec<LayerNode> {
    let mut out: Vec<LayerNode> = layers.to_vec();
    move_in_list(&mut out, id, direction);
    out
}

fn move_in_list(list: &mut Vec<LayerNode>, id: Uuid, direction: MoveDirection) -> bool {
    if let Some(idx) = list.iter().position(|n| n.id() == id) {
        match direction {
            MoveDirection::Up if idx > 0 => list.swap(idx, idx - 1),
            MoveDirection::Down if idx + 1 < list.len() => list.swap(idx, idx + 1),
            _ => {}
        }
        return true;
    }
    for node in list.iter_mut() {
        if let LayerNode::Group(g) = node
            && move_in_list(&mut g.children, id, direction)
        {
            return true;
        }
    }
    false
}

/// Remove every node (at any depth) whose id is in `ids`.
///
/// Returns the pruned tree and the removed nodes in pre-order. The caller
/// must guard against emptying the root list — a frame always keeps at
/// least one layer.
pub fn extract(layers: &[LayerNode], ids: &HashSet<Uuid>) -> (Vec<LayerNode>, Vec<LayerNode>) {
    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for node in layers {
        if ids.contains(&node.id()) {
            removed.push(node.clone());
            continue;
        }
        match node {
            LayerNode::Group(g) => {
                let (child_kept, child_removed) = extract(&g.children, ids);
                let mut g = g.clone();
                g.children = child_kept;
                kept.push(LayerNode::Group(g));
                removed.extend(child_removed);
            }
            LayerNode::Layer(_) => kept.push(node.clone()),
        }
    }
    (kept, removed)
}

/// Extract the nodes in `ids` and wrap them as children of a new group
/// prepended to the root list. Returns the new tree and the new group's id
/// (the group becomes the implicit selection target).
///
/// No-op when none of the ids exist in the tree.
pub fn group(layers: &[LayerNode], ids: &HashSet<Uuid>) -> (Vec<LayerNode>, Option<Uuid>) {
    let (kept, removed) = extract(layers, ids);
    if removed.is_empty() {
        return (layers.to_vec(), None);
    }
    let group = Group::new(next_group_name(layers), removed);
    let group_id = group.id;
    let mut out = Vec::with_capacity(kept.len() + 1);
    out.push(LayerNode::Group(group));
    out.extend(kept);
    (out, Some(group_id))
}

/// Replace every group whose id is in `ids` with its own children — one
/// level of flattening only. Non-group matches and unselected groups pass
/// through unchanged.
pub fn ungroup(layers: &[LayerNode], ids: &HashSet<Uuid>) -> Vec<LayerNode> {
    let mut out = Vec::new();
    for node in layers {
        match node {
            LayerNode::Group(g) if ids.contains(&g.id) => {
                out.extend(g.children.iter().cloned());
            }
            LayerNode::Group(g) => {
                let mut g = g.clone();
                g.children = ungroup(&g.children, ids);
                out.push(LayerNode::Group(g));
            }
            LayerNode::Layer(_) => out.push(node.clone()),
        }
    }
    out
}

/// Next free default layer name: scans all names matching `Layer <N>` and
/// returns `Layer <max+1>`, starting at `Layer 1`.
pub fn next_default_name(layers: &[LayerNode]) -> String {
    format!("Layer {}", max_numbered_suffix(layers, "Layer ") + 1)
}

/// Same scan for `Group <N>`.
pub fn next_group_name(layers: &[LayerNode]) -> String {
    format!("Group {}", max_numbered_suffix(layers, "Group ") + 1)
}

fn max_numbered_suffix(layers: &[LayerNode], prefix: &str) -> u32 {
    let mut max = 0;
    for node in layers {
        if let Some(n) = node
            .name()
            .strip_prefix(prefix)
            .and_then(|rest| rest.parse::<u32>().ok())
        {
            max = max.max(n);
        }
        if let LayerNode::Group(g) = node {
            max = max.max(max_numbered_suffix(&g.children, prefix));
        }
    }
    max
}

/// Insert a deep copy of the node matching `id` directly after it, with
/// fresh ids throughout and " (Copy)" appended to the name.
pub fn duplicate(layers: &[LayerNode], id: Uuid) -> Vec<LayerNode> {
    let mut out = Vec::with_capacity(layers.len() + 1);
    for node in layers {
        if node.id() == id {
            out.push(node.clone());
            let mut copy = regenerate_ids(node.clone());
            match &mut copy {
                LayerNode::Layer(l) => l.name = format!("{} (Copy)", l.name),
                LayerNode::Group(g) => g.name = format!("{} (Copy)", g.name),
            }
            out.push(copy);
        } else if let LayerNode::Group(g) = node {
            let mut g = g.clone();
            g.children = duplicate(&g.children, id);
            out.push(LayerNode::Group(g));
        } else {
            out.push(node.clone());
        }
    }
    out
}

/// Deep-copy id regeneration, used by duplicate and frame duplication.
pub fn regenerate_ids(mut node: LayerNode) -> LayerNode {
    match &mut node {
        LayerNode::Layer(l) => l.id = Uuid::new_v4(),
        LayerNode::Group(g) => {
            g.id = Uuid::new_v4();
            g.children = g.children.drain(..).map(regenerate_ids).collect();
        }
    }
    node
}

/// A fresh default layer using the next free default name.
pub fn new_layer(layers: &[LayerNode]) -> Layer {
    Layer::new(next_default_name(layers))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> LayerNode {
        LayerNode::Layer(Layer::new(name))
    }

    fn ids_of(layers: &[LayerNode]) -> Vec<Uuid> {
        layers.iter().map(|n| n.id()).collect()
    }

    #[test]
    fn find_descends_into_groups() {
        let inner = Layer::new("Inner");
        let inner_id = inner.id;
        let tree = vec![
            layer("Top"),
            LayerNode::Group(Group::new("G", vec![LayerNode::Layer(inner)])),
        ];
        assert_eq!(find(&tree, inner_id).map(|n| n.name()), Some("Inner"));
        assert!(find(&tree, Uuid::new_v4()).is_none());
    }

    #[test]
    fn update_missing_id_is_a_noop() {
        let tree = vec![layer("A"), layer("B")];
        let updated = update_by_id(&tree, Uuid::new_v4(), &|node| {
            if let LayerNode::Layer(l) = node {
                l.visible = false;
            }
        });
        assert!(updated.iter().all(|n| n.visible()));
    }

    #[test]
    fn update_reaches_nested_nodes() {
        let inner = Layer::new("Inner");
        let inner_id = inner.id;
        let tree = vec![LayerNode::Group(Group::new(
            "G",
            vec![LayerNode::Layer(inner)],
        ))];
        let updated = update_by_id(&tree, inner_id, &|node| {
            if let LayerNode::Layer(l) = node {
                l.opacity = 0.5;
            }
        });
        assert_eq!(find(&updated, inner_id).map(|n| n.opacity()), Some(0.5));
        // The original tree is untouched
        assert_eq!(find(&tree, inner_id).map(|n| n.opacity()), Some(1.0));
    }

    #[test]
    fn move_swaps_with_sibling_and_stops_at_boundary() {
        let tree = vec![layer("A"), layer("B"), layer("C")];
        let a = tree[0].id();

        let moved = move_node(&tree, a, MoveDirection::Down);
        assert_eq!(moved[1].id(), a);

        // Already at the top — no-op
        let moved = move_node(&tree, a, MoveDirection::Up);
        assert_eq!(ids_of(&moved), ids_of(&tree));
    }

    #[test]
    fn extract_returns_removed_in_preorder() {
        let a = layer("A");
        let b = Layer::new("B");
        let b_id = b.id;
        let c = Layer::new("C");
        let c_id = c.id;
        let tree = vec![
            a,
            LayerNode::Group(Group::new("G", vec![LayerNode::Layer(b)])),
            LayerNode::Layer(c),
        ];
        let ids: HashSet<Uuid> = [b_id, c_id].into_iter().collect();
        let (kept, removed) = extract(&tree, &ids);
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].id(), b_id);
        assert_eq!(removed[1].id(), c_id);
        assert_eq!(kept.len(), 2); // A and the now-empty group
    }

    #[test]
    fn group_then_ungroup_restores_order_and_ids() {
        let tree = vec![layer("A"), layer("B"), layer("C")];
        let original_ids = ids_of(&tree);
        let all: HashSet<Uuid> = original_ids.iter().copied().collect();

        let (grouped, group_id) = group(&tree, &all);
        let group_id = group_id.unwrap();
        assert_eq!(grouped.len(), 1);

        let ungrouped = ungroup(&grouped, &[group_id].into_iter().collect());
        assert_eq!(ids_of(&ungrouped), original_ids);
    }

    #[test]
    fn group_with_no_matches_is_a_noop() {
        let tree = vec![layer("A")];
        let (out, id) = group(&tree, &[Uuid::new_v4()].into_iter().collect());
        assert!(id.is_none());
        assert_eq!(ids_of(&out), ids_of(&tree));
    }

    #[test]
    fn ungroup_flattens_one_level_only() {
        let inner_group = Group::new("Inner", vec![layer("Deep")]);
        let outer = Group::new("Outer", vec![LayerNode::Group(inner_group)]);
        let outer_id = outer.id;
        let tree = vec![LayerNode::Group(outer)];

        let out = ungroup(&tree, &[outer_id].into_iter().collect());
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], LayerNode::Group(_)));
        assert_eq!(out[0].name(), "Inner");
    }

    #[test]
    fn default_name_scans_max_suffix() {
        let tree = vec![layer("Layer 1"), layer("Layer 7"), layer("Background")];
        assert_eq!(next_default_name(&tree), "Layer 8");
        assert_eq!(next_default_name(&[]), "Layer 1");
    }

    #[test]
    fn duplicate_appends_copy_suffix_with_fresh_id() {
        let tree = vec![layer("A")];
        let id = tree[0].id();
        let out = duplicate(&tree, id);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].name(), "A (Copy)");
        assert_ne!(out[1].id(), id);
    }
}
