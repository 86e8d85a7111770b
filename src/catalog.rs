//! Widget catalog loading
//!
//! The catalog is built once at startup from the JSON array passed on the
//! command line and never mutated afterwards. A malformed entry or an image
//! that fails to decode skips that entry with a warning; only an argument
//! that is not a JSON array at all is fatal.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::texture::Texture;
use crate::widget::{PackedColor, Widget, WidgetKind};

/// Fatal catalog failures (per-entry problems are logged and skipped)
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("widget definitions must be a JSON array: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Raw widget definition as it appears in the JSON argument
#[derive(Debug, Deserialize)]
struct WidgetEntry {
    id: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    content: String,
    width: u32,
    height: u32,
    #[serde(default)]
    vertical_anchor: f32,
    #[serde(default)]
    horizontal_anchor: f32,
    #[serde(default)]
    x_offset: i32,
    #[serde(default)]
    y_offset: i32,
    #[serde(default)]
    color: Option<[f32; 4]>,
    #[serde(default)]
    bg_color: Option<[f32; 4]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EntryKind {
    Text,
    Image,
}

/// The ordered collection of successfully loaded widgets.
/// Iteration order matches the input array and is the paint (z-)order.
#[derive(Debug, Default)]
pub struct Catalog {
    widgets: Vec<Widget>,
}

impl Catalog {
    /// Parse a JSON array of widget definitions.
    ///
    /// Entries that fail strict field decoding, name an unknown `type`, or
    /// reference an undecodable image are dropped with a warning.
    pub fn load(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;

        let mut widgets = Vec::with_capacity(entries.len());
        for entry in entries {
            let def: WidgetEntry = match serde_json::from_value(entry.clone()) {
                Ok(def) => def,
                Err(err) => {
                    warn!(%entry, %err, "skipping malformed widget entry");
                    continue;
                }
            };

            let kind = match def.kind {
                EntryKind::Text => WidgetKind::Text(def.content),
                EntryKind::Image => match Texture::load(Path::new(&def.content)) {
                    Ok(texture) => WidgetKind::Image(texture),
                    Err(err) => {
                        warn!(id = %def.id, path = %def.content, %err, "skipping widget: failed to load image");
                        continue;
                    }
                },
            };

            widgets.push(Widget {
                id: def.id,
                width: def.width,
                height: def.height,
                anchor: (def.horizontal_anchor, def.vertical_anchor),
                offset: (def.x_offset, def.y_offset),
                color: def.color.map_or(PackedColor::WHITE, PackedColor::from_components),
                bg_color: def
                    .bg_color
                    .map_or(PackedColor::TRANSPARENT, PackedColor::from_components),
                kind,
            });
        }

        Ok(Self { widgets })
    }

    /// Widgets in paint order
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_text_widget_with_defaults() {
        let catalog = Catalog::load(
            r#"[{"id":"a","type":"text","content":"hi","width":100,"height":50}]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        let widget = &catalog.widgets()[0];
        assert_eq!(widget.id, "a");
        assert_eq!((widget.width, widget.height), (100, 50));
        assert_eq!(widget.position(1280, 800), (0.0, 0.0));
        assert_eq!(widget.color, PackedColor::WHITE);
        assert_eq!(widget.bg_color, PackedColor::TRANSPARENT);
        assert_eq!(widget.kind, WidgetKind::Text("hi".to_string()));
    }

    #[test]
    fn applies_optional_placement_and_colors() {
        let catalog = Catalog::load(
            r#"[{
                "id": "clock",
                "type": "text",
                "content": "12:00",
                "width": 120,
                "height": 40,
                "horizontal_anchor": 0.5,
                "vertical_anchor": 1.0,
                "x_offset": -60,
                "y_offset": -40,
                "color": [1.0, 0.0, 0.0, 1.0],
                "bg_color": [0.0, 0.0, 0.0, 0.5]
            }]"#,
        )
        .unwrap();

        let widget = &catalog.widgets()[0];
        assert_eq!(widget.anchor, (0.5, 1.0));
        assert_eq!(widget.offset, (-60, -40));
        assert_eq!(widget.color.0, 0xFF00_00FF);
        assert_eq!(widget.bg_color.0, 0x0000_0080);
    }

    #[test]
    fn missing_required_field_skips_only_that_entry() {
        let with_field = r#"[
            {"id":"a","type":"text","content":"a","width":10,"height":10},
            {"id":"b","type":"text","content":"b","width":10,"height":10}
        ]"#;
        let without_field = r#"[
            {"id":"a","type":"text","content":"a","width":10,"height":10},
            {"id":"b","type":"text","content":"b","width":10}
        ]"#;

        let full = Catalog::load(with_field).unwrap();
        let partial = Catalog::load(without_field).unwrap();
        assert_eq!(full.len() - 1, partial.len());
        assert_eq!(partial.widgets()[0].id, "a");
    }

    #[test]
    fn mistyped_field_skips_only_that_entry() {
        let catalog = Catalog::load(
            r#"[
                {"id":"bad","type":"text","content":"x","width":"wide","height":10},
                {"id":"good","type":"text","content":"y","width":10,"height":10}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.widgets()[0].id, "good");
    }

    #[test]
    fn unknown_type_skips_the_entry() {
        let catalog = Catalog::load(
            r#"[{"id":"a","type":"video","content":"x","width":10,"height":10}]"#,
        )
        .unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn undecodable_image_drops_the_whole_widget() {
        let catalog = Catalog::load(
            r#"[{"id":"b","type":"image","content":"/nonexistent.png","width":10,"height":10}]"#,
        )
        .unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn image_widget_keeps_definition_size_not_natural_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([0, 255, 0, 255]))
            .save(&path)
            .unwrap();

        let json = format!(
            r#"[{{"id":"i","type":"image","content":{},"width":32,"height":32}}]"#,
            serde_json::to_string(path.to_str().unwrap()).unwrap()
        );
        let catalog = Catalog::load(&json).unwrap();

        assert_eq!(catalog.len(), 1);
        let widget = &catalog.widgets()[0];
        assert_eq!((widget.width, widget.height), (32, 32));
        match &widget.kind {
            WidgetKind::Image(texture) => {
                assert_eq!((texture.width(), texture.height()), (8, 4));
            }
            other => panic!("expected an image widget, got {other:?}"),
        }
    }

    #[test]
    fn ordering_matches_the_input_array() {
        let catalog = Catalog::load(
            r#"[
                {"id":"first","type":"text","content":"1","width":1,"height":1},
                {"id":"second","type":"text","content":"2","width":1,"height":1},
                {"id":"third","type":"text","content":"3","width":1,"height":1}
            ]"#,
        )
        .unwrap();

        let ids: Vec<_> = catalog.widgets().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn loading_twice_yields_equal_catalogs() {
        let json = r#"[
            {"id":"a","type":"text","content":"hi","width":100,"height":50},
            {"id":"b","type":"text","content":"yo","width":20,"height":20,"color":[0.0,1.0,0.0,1.0]}
        ]"#;

        let first = Catalog::load(json).unwrap();
        let second = Catalog::load(json).unwrap();
        assert_eq!(first.widgets(), second.widgets());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let catalog = Catalog::load(
            r#"[{"id":"a","type":"text","content":"hi","width":1,"height":1,"z_index":9}]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn non_array_input_is_fatal() {
        assert!(Catalog::load(r#"{"id":"a"}"#).is_err());
        assert!(Catalog::load("not json").is_err());
    }

    #[test]
    fn empty_array_is_an_empty_catalog() {
        assert!(Catalog::load("[]").unwrap().is_empty());
    }
}
