use crate::schema::Cells;
use serde::{Deserialize, Serialize};

/// What a node is, derived from its type column and identity cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Preset,
    Variant,
    Reference,
    RenderPreset,
    RenderSetting,
    Separator,
    SubSeparator,
    OutputItem,
    PlmXmlItem,
    CameraItem,
}

/// Type keys that make a node a preset regardless of its id
pub const PRESET_TYPE_KEYS: [&str; 8] = [
    "trim_setup",
    "fakom_setup",
    "fakom_option",
    "options",
    "package",
    "viewset",
    "viewset_mask",
    "reset",
];

/// Type keys of render setting rows
pub const RENDER_SETTING_KEYS: [&str; 3] = ["sampling", "file_extension", "resolution"];

impl ItemKind {
    pub fn derive(cells: &Cells) -> Self {
        if cells.reference.is_some() {
            return ItemKind::Reference;
        }

        match cells.item_type.as_str() {
            t if PRESET_TYPE_KEYS.contains(&t) => ItemKind::Preset,
            t if RENDER_SETTING_KEYS.contains(&t) => ItemKind::RenderSetting,
            "render_preset" => ItemKind::RenderPreset,
            // Older files carry the misspelled keys
            "separator" | "seperator" => ItemKind::Separator,
            "sub_separator" | "sub_seperator" => ItemKind::SubSeparator,
            "output_item" => ItemKind::OutputItem,
            "plmxml_item" => ItemKind::PlmXmlItem,
            "camera_item" => ItemKind::CameraItem,
            t if cells.id.is_some() && !t.is_empty() => ItemKind::Preset,
            _ => ItemKind::Variant,
        }
    }

    /// Element tag used by the exchange format
    pub fn tag(self) -> &'static str {
        match self {
            ItemKind::Preset | ItemKind::OutputItem | ItemKind::PlmXmlItem | ItemKind::CameraItem => {
                "preset"
            }
            ItemKind::Variant => "variant",
            ItemKind::Reference => "reference",
            ItemKind::RenderPreset => "render_preset",
            ItemKind::RenderSetting => "render_setting",
            ItemKind::Separator => "separator",
            ItemKind::SubSeparator => "sub_separator",
        }
    }

    /// Tags accepted when reading, including legacy spellings
    pub fn is_known_tag(tag: &str) -> bool {
        matches!(
            tag,
            "preset"
                | "variant"
                | "reference"
                | "render_preset"
                | "render_setting"
                | "separator"
                | "seperator"
                | "sub_separator"
                | "sub_seperator"
        )
    }

    /// Kinds that may live at the top level and own children
    pub fn is_preset_like(self) -> bool {
        matches!(
            self,
            ItemKind::Preset
                | ItemKind::RenderPreset
                | ItemKind::OutputItem
                | ItemKind::PlmXmlItem
                | ItemKind::CameraItem
        )
    }

    pub fn is_separator(self) -> bool {
        matches!(self, ItemKind::Separator | ItemKind::SubSeparator)
    }
}

/// Icon key for a type column value
pub fn icon_key(item_type: &str) -> Option<&'static str> {
    let key = match item_type {
        "trim_setup" => "car",
        "fakom_setup" => "fakom_trim",
        "fakom_option" => "fakom",
        "options" => "options",
        "package" => "pkg",
        "reset" => "reset",
        "viewset" => "viewset",
        "viewset_mask" => "viewset_mask",
        "preset" => "preset",
        "preset_mask" => "preset_mask",
        "preset_ref" => "preset_ref",
        "OPT" | "COL" => "img",
        "RAD" | "SWL" | "SEA" => "img_free",
        "render_preset" | "sampling" | "file_extension" | "resolution" => "render",
        "copy" => "copy",
        "checkmark" => "checkmark",
        "output_item" => "folder",
        "camera_item" => "videocam",
        "plmxml_item" => "assignment",
        _ => return None,
    };
    Some(key)
}
