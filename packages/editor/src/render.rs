//! # Render Presets
//!
//! A top-level render preset lists references. Each reference becomes an
//! image, or a shot when it points at a viewset. Every image is rendered
//! once per shot:
//!
//! ```text
//! images [Front, Rear] x shots [Day, Night]
//!   000_Front_Day  001_Front_Night  002_Rear_Day  003_Rear_Night
//! ```

use crate::resolve::{Variant, VariantCollector, VariantList};
use knecht_common::ItemKind;
use knecht_document::{Document, NodeId};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, error};

pub const IMAGE_NAME_NOT_SET: &str = "Render_Image_Name_Not_Set";
pub const SHOT_VARIANT_NOT_SET: &str = "Shot_Variant_Not_Set";
pub const SHOT_NOT_SET: &str = "Shot_Not_Set";

/// Longest output path the render host accepts
pub const MAX_PATH_LENGTH: usize = 259;

/// Replace everything but word characters, `-`, `_` and `.` with `_`
pub fn file_safe_name(name: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    match PATTERN.get_or_init(|| Regex::new(r"[^\w\-_\.]").ok()) {
        Some(pattern) => pattern.replace_all(name, "_").into_owned(),
        None => name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderSettings {
    pub sampling: u32,
    pub file_extension: String,
    pub resolution: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sampling: 1,
            file_extension: ".hdr".to_string(),
            resolution: "2560 1920".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEntry {
    pub name: String,
    pub variants: VariantList,
}

/// One image to render: file name stem and the variants to switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderImage {
    pub name: String,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPreset {
    pub name: String,
    pub settings: RenderSettings,
    pub images: Vec<RenderEntry>,
    pub shots: Vec<RenderEntry>,
}

impl RenderPreset {
    pub fn new(name: &str) -> Self {
        Self {
            name: file_safe_name(name),
            settings: RenderSettings::default(),
            images: Vec::new(),
            shots: Vec::new(),
        }
    }

    pub fn add_image(&mut self, name: impl Into<String>, variants: VariantList) {
        self.images.push(RenderEntry {
            name: name.into(),
            variants,
        });
    }

    pub fn add_shot(&mut self, name: impl Into<String>, variants: VariantList) {
        self.shots.push(RenderEntry {
            name: name.into(),
            variants,
        });
    }

    pub fn image_count(&self) -> usize {
        self.shots.len().max(1) * self.images.len()
    }

    /// Every image crossed with every shot, in render order
    pub fn render_images(&self) -> Vec<RenderImage> {
        let mut out = Vec::with_capacity(self.image_count());
        for image in &self.images {
            if self.shots.is_empty() {
                out.push(self.render_image(out.len(), image, None));
                continue;
            }
            for shot in &self.shots {
                out.push(self.render_image(out.len(), image, Some(shot)));
            }
        }
        out
    }

    fn render_image(&self, index: usize, image: &RenderEntry, shot: Option<&RenderEntry>) -> RenderImage {
        let mut name = format!("{:03}_{}", index, image.name);
        let mut variants = image.variants.variants.clone();
        if let Some(shot) = shot {
            if !shot.name.is_empty() {
                name.push('_');
                name.push_str(&shot.name);
            }
            variants.extend(shot.variants.variants.iter().cloned());
        }
        RenderImage { name, variants }
    }

    /// Output files below `directory` that exceed [`MAX_PATH_LENGTH`]
    pub fn too_long_paths(&self, directory: &Path) -> Vec<PathBuf> {
        self.render_images()
            .into_iter()
            .map(|image| directory.join(format!("{}{}", image.name, self.settings.file_extension)))
            .filter(|path| path.to_string_lossy().len() >= MAX_PATH_LENGTH)
            .collect()
    }
}

/// Collect every top-level render preset of `document`
pub fn collect_render_presets(document: &Document, collector: &VariantCollector<'_>) -> Vec<RenderPreset> {
    document
        .ordered_children(document.root())
        .into_iter()
        .filter(|node| {
            document
                .cells(*node)
                .is_some_and(|cells| cells.kind() == ItemKind::RenderPreset)
        })
        .filter_map(|node| collect_render_preset(document, collector, node))
        .collect()
}

pub fn collect_render_preset(
    document: &Document,
    collector: &VariantCollector<'_>,
    node: NodeId,
) -> Option<RenderPreset> {
    let cells = document.cells(node)?;
    let mut preset = RenderPreset::new(&cells.name);

    for child in document.ordered_children(node) {
        let Some(child_cells) = document.cells(child) else {
            continue;
        };
        match child_cells.kind() {
            ItemKind::Reference => {}
            ItemKind::RenderSetting => {
                read_setting(&mut preset.settings, &child_cells.item_type, &child_cells.value);
                continue;
            }
            _ => continue,
        }

        let name = if child_cells.name.is_empty() {
            IMAGE_NAME_NOT_SET.to_string()
        } else {
            child_cells.name.clone()
        };
        let target = child_cells
            .reference
            .and_then(|id| document.preset_of(id));
        let target_is_viewset = target
            .and_then(|preset| document.cells(preset))
            .is_some_and(|cells| cells.item_type == "viewset");
        let is_viewset = child_cells.item_type == "viewset" || target_is_viewset;

        let variants = if target_is_viewset {
            collector.collect_with(child, false)
        } else {
            collector.collect(child)
        };

        if is_viewset {
            let mut variants = variants;
            if variants.is_empty() {
                error!(shot = %name, "no viewset variants for render preset shot");
                variants.variants.push(Variant::new(SHOT_VARIANT_NOT_SET, SHOT_NOT_SET, ""));
            }
            let shot_name = variants
                .variants
                .first()
                .map_or_else(|| SHOT_NOT_SET.to_string(), |variant| variant.value.clone());
            preset.add_shot(shot_name, variants);
        } else {
            preset.add_image(name, variants);
        }
    }

    debug!(
        preset = %preset.name,
        images = preset.images.len(),
        shots = preset.shots.len(),
        "collected render preset"
    );
    Some(preset)
}

fn read_setting(settings: &mut RenderSettings, key: &str, value: &str) {
    match key {
        "sampling" => match value.trim().parse() {
            Ok(sampling) => settings.sampling = sampling,
            Err(_) => error!(value, "invalid sampling value"),
        },
        "resolution" => settings.resolution = value.to_string(),
        "file_extension" => settings.file_extension = value.to_string(),
        _ => {}
    }
}
