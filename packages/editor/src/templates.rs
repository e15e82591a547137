//! # Templates
//!
//! Detached subtrees for the "create" actions. Every template except the
//! separator carries a fresh preset id.

use knecht_common::{Cells, ItemKind, NodeData};

/// Camera tags understood by the rendering engine and their command formats
pub const CAMERA_COMMANDS: [(&str, &str); 5] = [
    ("rtt_Camera_FOV", "FOV CAMERA {0}"),
    ("rtt_Camera_Position", "POS CAMERA {0} {1} {2}"),
    ("rtt_Camera_Orientation", "ORIENT CAMERA {0} {1} {2} {3}"),
    ("knecht_clip_near", "CLIPPLANE_NEAR CAMERA {0}"),
    ("knecht_clip_far", "CLIPPLANE_FAR CAMERA {0}"),
];

pub const CAMERA_DESCRIPTIONS: [(&str, &str); 11] = [
    ("rtt_Camera_FOV", "Camera field of view: Angle"),
    ("rtt_Camera_Position", "Camera position: X, Y, Z"),
    ("rtt_Camera_Orientation", "Camera orientation: Rotation Vector X, Y, Z, Angle"),
    ("rtt_BackgroundColor_RGBA", "Viewer background color: R, G, B, A"),
    ("rtt_width", "Viewer width in px"),
    ("rtt_height", "Viewer height in px"),
    ("rtt_Camera_RenderOutputWidth", "Output width in px"),
    ("rtt_Camera_RenderOutputHeight", "Output height in px"),
    ("rtt_antiAliasQuality", "Anti Aliasing Sampling Factor"),
    ("knecht_clip_near", "Near Clipping Plane"),
    ("knecht_clip_far", "Far Clipping Plane"),
];

/// Example camera data used to pre-fill new camera items
pub const CAMERA_EXAMPLE_INFO: [(&str, &str); 24] = [
    ("Software", "3DEXCITE DELTAGEN 2017.1"),
    ("rtt_Camera_FOV", "38.8801"),
    ("rtt_Camera_FocalLength", "34"),
    ("rtt_Camera_Projection", "1"),
    ("rtt_Camera_EyeSeparation", "77.44"),
    ("rtt_Camera_ConvergenceDistance", "34"),
    ("rtt_Camera_PreScale", "1"),
    ("rtt_Camera_Overscan", "1"),
    ("rtt_Camera_HorizontalFilmOffset", "0"),
    ("rtt_Camera_VerticalFilmOffset", "0"),
    ("rtt_Camera_HorizontalSensorSize", "36"),
    ("rtt_Camera_VerticalSensorSize", "24"),
    ("rtt_Camera_FilmFit", "2"),
    ("rtt_Camera_RenderOutputWidth", "2880"),
    ("rtt_Camera_RenderOutputHeight", "1620"),
    ("rtt_Camera_Position", "-221.522, -143.877, 88.475"),
    ("rtt_Camera_Orientation", "0.734806, -0.397707, -0.549444, 89.13848193527295"),
    ("rtt_BackgroundColor_RGBA", "1, 1, 1, 1"),
    ("rtt_width", "1920"),
    ("rtt_height", "1080"),
    ("rtt_antiAliasQuality", "8"),
    ("rtt_FileName", "Some_File.csb"),
    ("knecht_clip_near", "100.0"),
    ("knecht_clip_far", "10000.0"),
];

/// Default render settings: type key and value
pub const RENDER_SETTING_DEFAULTS: [(&str, &str, &str); 3] = [
    ("Sampling", "sampling", "1"),
    ("File_Extension", "file_extension", ".hdr"),
    ("Resolution", "resolution", "2560 1920"),
];

pub fn camera_command(tag: &str) -> Option<&'static str> {
    CAMERA_COMMANDS
        .iter()
        .find(|(key, _)| *key == tag)
        .map(|(_, command)| *command)
}

pub fn camera_description(tag: &str) -> Option<&'static str> {
    CAMERA_DESCRIPTIONS
        .iter()
        .find(|(key, _)| *key == tag)
        .map(|(_, description)| *description)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Preset,
    TrimSetup,
    Options,
    Package,
    Reset,
    Viewset,
    FakomSetup,
    FakomOption,
    Output,
    PlmXml,
    Camera,
    Separator,
    RenderPreset,
}

impl Template {
    pub const ALL: [Template; 13] = [
        Template::Preset,
        Template::TrimSetup,
        Template::Options,
        Template::Package,
        Template::Reset,
        Template::Viewset,
        Template::FakomSetup,
        Template::FakomOption,
        Template::Output,
        Template::PlmXml,
        Template::Camera,
        Template::Separator,
        Template::RenderPreset,
    ];

    pub fn type_key(self) -> &'static str {
        match self {
            Template::Preset => "preset",
            Template::TrimSetup => "trim_setup",
            Template::Options => "options",
            Template::Package => "package",
            Template::Reset => "reset",
            Template::Viewset => "viewset",
            Template::FakomSetup => "fakom_setup",
            Template::FakomOption => "fakom_option",
            Template::Output => "output_item",
            Template::PlmXml => "plmxml_item",
            Template::Camera => "camera_item",
            Template::Separator => "separator",
            Template::RenderPreset => "render_preset",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Template::Preset => "User_Preset",
            Template::TrimSetup => "Trimline",
            Template::Options => "Options",
            Template::Package => "Package",
            Template::Reset => "Reset",
            Template::Viewset => "Viewset",
            Template::FakomSetup => "FaKom_Trim",
            Template::FakomOption => "FaKom_Option",
            Template::Output => "Output",
            Template::PlmXml => "PlmXml",
            Template::Camera => "Camera",
            Template::Separator => "",
            Template::RenderPreset => "Render_Preset",
        }
    }

    pub fn from_type_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|template| template.type_key() == key)
    }

    pub fn build(self) -> NodeData {
        self.build_named(self.default_name())
    }

    pub fn build_named(self, name: &str) -> NodeData {
        match self {
            Template::Separator => Cells::default().with_type(self.type_key()).into(),
            Template::Camera => camera_item(name, &CAMERA_EXAMPLE_INFO),
            Template::RenderPreset => render_preset(name, Vec::new()),
            _ => Cells::preset(name, self.type_key()).into(),
        }
    }
}

/// A camera item with one row per camera tag
pub fn camera_item(name: &str, info: &[(&str, &str)]) -> NodeData {
    let children = info
        .iter()
        .enumerate()
        .map(|(order, (tag, value))| {
            let cells = Cells::variant(order as i32, *tag, *value);
            match camera_description(tag) {
                Some(description) => cells.with_description(description).into(),
                None => cells.into(),
            }
        })
        .collect();
    NodeData::new(Cells::preset(name, Template::Camera.type_key())).with_children(children)
}

/// A render preset: `items` followed by the default render settings
pub fn render_preset(name: &str, items: Vec<NodeData>) -> NodeData {
    let offset = items.len();
    let mut children = number(items, 0);
    children.extend(
        RENDER_SETTING_DEFAULTS
            .iter()
            .enumerate()
            .map(|(i, (setting, key, value))| {
                Cells::variant((offset + i) as i32, *setting, *value)
                    .with_type(*key)
                    .into()
            }),
    );
    NodeData::new(Cells::preset(name, Template::RenderPreset.type_key())).with_children(children)
}

/// A user preset holding `items`
pub fn user_preset(name: &str, items: Vec<NodeData>) -> NodeData {
    NodeData::new(Cells::preset(name, Template::Preset.type_key())).with_children(number(items, 0))
}

/// Kinds that may be collected into a preset from a selection
pub fn accepted_in_preset(kind: ItemKind) -> bool {
    matches!(
        kind,
        ItemKind::Preset
            | ItemKind::Variant
            | ItemKind::Reference
            | ItemKind::OutputItem
            | ItemKind::CameraItem
            | ItemKind::PlmXmlItem
    )
}

fn number(items: Vec<NodeData>, start: i32) -> Vec<NodeData> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, mut item)| {
            item.cells.order = start + i as i32;
            item
        })
        .collect()
}
