use super::open_document;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use knecht_editor::{Editor, ResolveWarning, VariantList};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Exchange file holding the preset
    pub input: PathBuf,

    /// Name of the top-level preset to resolve
    pub preset: String,

    /// Resolve every reset preset first
    #[arg(long)]
    pub reset: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn resolve(args: ResolveArgs, config: &Config) -> Result<()> {
    let document = open_document(&args.input)?;
    let mut editor_config = config.editor.clone();
    editor_config.collect_reset |= args.reset;
    let editor = Editor::with_document(document, editor_config);

    let variants = editor
        .resolve_by_name(&args.preset)
        .ok_or_else(|| anyhow!("No top-level preset named {}", args.preset))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&variants)?);
    } else {
        print_variants(&args.preset, &variants);
    }
    Ok(())
}

fn print_variants(preset: &str, variants: &VariantList) {
    println!("{} {}", "Preset".bright_blue().bold(), preset.bright_white());

    let width = variants
        .variants
        .iter()
        .map(|variant| variant.name.chars().count())
        .max()
        .unwrap_or(0);
    for variant in &variants.variants {
        println!("  {:width$}  {}", variant.name, variant.value, width = width);
    }

    if let Some(path) = &variants.output_path {
        println!("  {} {}", "output:".dimmed(), path);
    }
    if let Some(path) = &variants.plm_xml_path {
        println!("  {} {}", "plmxml:".dimmed(), path);
    }
    for warning in &variants.warnings {
        println!("  {} {}", "⚠️".yellow(), describe_warning(warning).yellow());
    }
    println!();
    println!("   Variants: {}", variants.len());
}

fn describe_warning(warning: &ResolveWarning) -> String {
    match warning {
        ResolveWarning::MissingReference { name, target } => {
            format!("reference {} points at missing preset {}", name, target)
        }
        ResolveWarning::RecursionLimit { preset, depth } => {
            format!("stopped expanding {} at depth {}", preset, depth)
        }
        ResolveWarning::CameraValueMismatch { tag, value } => {
            format!("camera value {:?} does not fit {}", value, tag)
        }
        ResolveWarning::ResetMissing => "no reset preset found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knecht_editor::{save_file, Cells, Document, NodeData};

    #[test]
    fn test_unknown_preset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.xml");
        let document = Document::from_roots(vec![NodeData::new(Cells::preset("P1", "trim_setup"))
            .with_children(vec![Cells::variant(0, "Color", "red").into()])]);
        save_file(&document, &path).unwrap();

        let found = resolve(
            ResolveArgs {
                input: path.clone(),
                preset: "P1".into(),
                reset: false,
                json: true,
            },
            &Config::default(),
        );
        assert!(found.is_ok());

        let missing = resolve(
            ResolveArgs {
                input: path,
                preset: "Nope".into(),
                reset: false,
                json: false,
            },
            &Config::default(),
        );
        assert!(missing.is_err());
    }

    #[test]
    fn test_describe_warning() {
        assert_eq!(describe_warning(&ResolveWarning::ResetMissing), "no reset preset found");
        let text = describe_warning(&ResolveWarning::RecursionLimit {
            preset: "A".into(),
            depth: 4,
        });
        assert!(text.contains("depth 4"));
    }
}
