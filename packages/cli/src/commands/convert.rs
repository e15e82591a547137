use super::open_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use knecht_editor::save_file;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Exchange file to read
    pub input: PathBuf,

    /// Where to write the re-encoded file
    pub output: PathBuf,
}

/// Load and save again; identities are compacted afresh
pub fn convert(args: ConvertArgs) -> Result<()> {
    let document = open_document(&args.input)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    save_file(&document, &args.output)?;

    println!(
        "  {} {} → {} ({} nodes)",
        "✓".green(),
        args.input.display(),
        args.output.display(),
        document.len()
    );
    Ok(())
}
