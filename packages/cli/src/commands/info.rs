use super::open_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use knecht_editor::{Document, ItemKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Exchange file to inspect
    pub input: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub nodes: usize,
    pub top_level: usize,
    pub presets: usize,
    pub references: usize,
    pub kinds: BTreeMap<String, usize>,
}

impl Summary {
    pub fn of(document: &Document) -> Self {
        let mut kinds = BTreeMap::new();
        for node in document.descendants(document.root()) {
            if node == document.root() {
                continue;
            }
            if let Some(cells) = document.cells(node) {
                *kinds.entry(kind_name(cells.kind())).or_insert(0) += 1;
            }
        }

        Self {
            nodes: document.len(),
            top_level: document.top_level().len(),
            presets: document.registry().preset_count(),
            references: document.registry().reference_count(),
            kinds,
        }
    }
}

fn kind_name(kind: ItemKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", kind))
}

pub fn info(args: InfoArgs) -> Result<()> {
    let document = open_document(&args.input)?;
    let summary = Summary::of(&document);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} {}", "File".bright_blue().bold(), args.input.display());
    println!("   Nodes:      {}", summary.nodes);
    println!("   Top level:  {}", summary.top_level);
    println!("   Presets:    {}", summary.presets);
    println!("   References: {}", summary.references);
    println!();
    for (kind, count) in &summary.kinds {
        println!("   {:<16} {}", kind, count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use knecht_editor::{Cells, NodeData};

    #[test]
    fn test_summary_counts_kinds() {
        let p1 = Cells::preset("P1", "trim_setup");
        let u1 = p1.id.unwrap();
        let document = Document::from_roots(vec![
            NodeData::new(p1).with_children(vec![Cells::variant(0, "Color", "red").into()]),
            NodeData::new(Cells::preset("P2", "package").with_order(1))
                .with_children(vec![Cells::reference("R", u1).into()]),
        ]);

        let summary = Summary::of(&document);
        assert_eq!(summary.nodes, 4);
        assert_eq!(summary.top_level, 2);
        assert_eq!(summary.presets, 2);
        assert_eq!(summary.references, 1);
        assert_eq!(summary.kinds.get("preset"), Some(&2));
        assert_eq!(summary.kinds.get("variant"), Some(&1));
        assert_eq!(summary.kinds.get("reference"), Some(&1));
    }
}
