//! Round-trip tests: decode(encode(tree)) keeps shape, cells and the
//! reference relationships, while identities are minted afresh.

use knecht_codec::{decode, encode, CodecError};
use knecht_common::{Cells, ItemId, NodeData};
use proptest::prelude::*;
use std::collections::HashMap;

/// Strip identities, keeping which nodes point at which
fn shape(nodes: &[NodeData]) -> Vec<String> {
    let mut ids: HashMap<ItemId, usize> = HashMap::new();
    let mut lines = Vec::new();
    for root in nodes {
        for node in root.walk() {
            if let Some(id) = node.cells.id {
                let next = ids.len();
                ids.entry(id).or_insert(next);
            }
        }
    }
    fn visit(node: &NodeData, depth: usize, ids: &HashMap<ItemId, usize>, lines: &mut Vec<String>) {
        let id = node.cells.id.and_then(|id| ids.get(&id)).map(|n| n.to_string());
        let reference = node
            .cells
            .reference
            .map(|r| ids.get(&r).map(|n| n.to_string()).unwrap_or_else(|| "dangling".to_string()));
        lines.push(format!(
            "{}{}|{}|{}|{}|{}|{:?}|{:?}|{}",
            "  ".repeat(depth),
            node.kind().tag(),
            node.cells.order,
            node.cells.name,
            node.cells.value,
            node.cells.item_type,
            id,
            reference,
            node.cells.description
        ));
        for child in &node.children {
            visit(child, depth + 1, ids, lines);
        }
    }
    for root in nodes {
        visit(root, 0, &ids, &mut lines);
    }
    lines
}

fn sample_document() -> Vec<NodeData> {
    let p1 = Cells::preset("P1", "trim_setup").with_description("Base trim");
    let u1 = p1.id.unwrap();
    vec![
        NodeData::new(p1).with_children(vec![Cells::variant(0, "Color", "red").into()]),
        NodeData::new(Cells::preset("P2", "package").with_order(1)).with_children(vec![
            Cells::reference("R", u1).into(),
            Cells::variant(1, "PR#1", "on").into(),
        ]),
        NodeData::new(Cells::default().with_type("separator").with_order(2)),
        NodeData::new(Cells::preset("Render", "render_preset").with_order(3)).with_children(vec![
            Cells::variant(0, "sampling", "4").with_type("sampling").into(),
            Cells::reference("Image", u1).with_order(1).into(),
        ]),
    ]
}

#[test]
fn test_roundtrip_preserves_shape() {
    let original = sample_document();
    let text = encode(&original).unwrap();
    let decoded = decode(&text).unwrap();
    assert_eq!(shape(&original), shape(&decoded));
}

#[test]
fn test_roundtrip_mints_fresh_identities() {
    let original = sample_document();
    let decoded = decode(&encode(&original).unwrap()).unwrap();
    assert_ne!(original[0].cells.id, decoded[0].cells.id);
    assert_eq!(decoded[1].children[0].cells.reference, decoded[0].cells.id);
    assert_eq!(decoded[3].children[1].cells.reference, decoded[0].cells.id);
}

#[test]
fn test_second_roundtrip_is_textually_stable() {
    let first = encode(&decode(&encode(&sample_document()).unwrap()).unwrap()).unwrap();
    let second = encode(&decode(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_tree_cannot_be_loaded_back() {
    let text = encode(&[]).unwrap();
    assert_eq!(decode(&text).unwrap_err(), CodecError::Empty);
}

fn arb_text() -> impl Strategy<Value = String> {
    "[ -~]{0,12}"
}

fn arb_leaf() -> impl Strategy<Value = NodeData> {
    (0i32..20, arb_text(), arb_text(), arb_text()).prop_map(|(order, name, value, description)| {
        NodeData::new(Cells::variant(order, name, value).with_description(description))
    })
}

fn arb_preset() -> impl Strategy<Value = NodeData> {
    (0i32..50, arb_text(), prop::collection::vec(arb_leaf(), 0..6)).prop_map(|(order, name, children)| {
        NodeData::new(Cells::preset(name, "preset").with_order(order)).with_children(children)
    })
}

fn arb_document() -> impl Strategy<Value = Vec<NodeData>> {
    (
        prop::collection::vec(arb_preset(), 1..6),
        prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..6),
    )
        .prop_map(|(mut presets, links)| {
            let ids: Vec<ItemId> = presets.iter().filter_map(|p| p.cells.id).collect();
            for (owner, target) in links {
                let target = ids[target.index(ids.len())];
                let owner = owner.index(presets.len());
                let order = presets[owner].children.len() as i32;
                presets[owner]
                    .children
                    .push(Cells::reference("ref", target).with_order(order).into());
            }
            presets
        })
}

proptest! {
    #[test]
    fn prop_roundtrip_preserves_shape(document in arb_document()) {
        let text = encode(&document).unwrap();
        let decoded = decode(&text).unwrap();
        prop_assert_eq!(shape(&document), shape(&decoded));
    }
}
