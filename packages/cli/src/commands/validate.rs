use super::open_document;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use knecht_editor::{Document, Editor, IntegrityReport, NodeId};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Exchange file or directory to validate
    pub input: PathBuf,
}

pub fn validate(args: ValidateArgs, config: &Config) -> Result<()> {
    println!("🔍 {} Knecht Validator", "Starting".green().bold());
    println!("   Input: {}", args.input.display());
    println!();

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_exchange_files(&args.input)
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let mut problems = 0;
    let mut unreadable = 0;
    for file in &files {
        match validate_file(file, config) {
            Ok(count) => problems += count,
            Err(e) => {
                unreadable += 1;
                eprintln!("  {} {} - {}", "✗".red(), file.display(), e.to_string().red());
            }
        }
    }

    println!();
    println!("   Files checked: {}", files.len());
    if problems > 0 || unreadable > 0 {
        return Err(anyhow!(
            "{} integrity problems, {} unreadable files",
            problems,
            unreadable
        ));
    }
    println!("✨ {} No integrity problems found", "Done".green().bold());
    Ok(())
}

fn validate_file(path: &Path, config: &Config) -> Result<usize> {
    let document = open_document(path)?;
    let mut editor = Editor::with_document(document, config.editor.clone());
    let report = editor.validate();

    if report.is_clean() {
        println!("  {} {}", "✓".green(), path.display());
        return Ok(0);
    }

    println!("  {} {}", "⚠️".yellow(), path.display());
    print_report(editor.document(), &report);
    Ok(report.invalid_references.len() + report.recursive.len() + report.duplicate_presets.len())
}

fn print_report(document: &Document, report: &IntegrityReport) {
    for reference in &report.invalid_references {
        println!(
            "     {} reference {} points at a missing preset",
            "invalid".red(),
            describe(document, *reference).bright_white()
        );
    }
    for (preset, child) in &report.recursive {
        println!(
            "     {} preset {} reaches itself through {}",
            "cycle".red(),
            describe(document, *preset).bright_white(),
            describe(document, *child).bright_white()
        );
    }
    for id in &report.duplicate_presets {
        println!("     {} preset id {} is declared more than once", "duplicate".yellow(), id);
    }
}

fn describe(document: &Document, node: NodeId) -> String {
    let name = document.cells(node).map_or("?", |cells| cells.name.as_str());
    let top = document
        .top_level_of(node)
        .filter(|top| *top != node)
        .and_then(|top| document.cells(top));
    match top {
        Some(top) => format!("{}/{}", top.name, name),
        None => name.to_string(),
    }
}

fn find_exchange_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("xml"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use knecht_editor::{save_file, Cells, ItemId, NodeData};

    #[test]
    fn test_dangling_reference_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        let document = Document::from_roots(vec![NodeData::new(Cells::preset("P2", "package"))
            .with_children(vec![Cells::reference("R", ItemId::new()).into()])]);
        save_file(&document, &path).unwrap();

        assert_eq!(validate_file(&path, &Config::default()).unwrap(), 1);
        let result = validate(
            ValidateArgs {
                input: dir.path().to_path_buf(),
            },
            &Config::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_clean_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.xml");
        let document = Document::from_roots(vec![NodeData::new(Cells::preset("P1", "trim_setup"))
            .with_children(vec![Cells::variant(0, "Color", "red").into()])]);
        save_file(&document, &path).unwrap();

        assert!(validate(ValidateArgs { input: path }, &Config::default()).is_ok());
    }
}
