//! Widget records and color packing
//!
//! A `Widget` is immutable after the catalog is loaded. Its placement is an
//! anchor fraction of the work area plus a fixed pixel offset; its content is
//! either literal text or a decoded image, modeled as a sum type.

use tiny_skia::Color;

use crate::texture::Texture;

/// A packed 32-bit RGBA color (`0xRRGGBBAA`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedColor(pub u32);

impl PackedColor {
    /// Opaque white, the default text/tint color
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    /// Fully transparent, the default background color
    pub const TRANSPARENT: Self = Self(0);

    /// Pack `[r, g, b, a]` float channels in [0, 1] into a single value
    pub fn from_components(components: [f32; 4]) -> Self {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        Self(
            channel(components[0]) << 24
                | channel(components[1]) << 16
                | channel(components[2]) << 8
                | channel(components[3]),
        )
    }

    /// Unpack into float channels in [0, 1]
    pub fn components(self) -> [f32; 4] {
        let [r, g, b, a] = self.rgba8();
        [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ]
    }

    /// Unpack into 8-bit channels
    pub fn rgba8(self) -> [u8; 4] {
        [
            (self.0 >> 24) as u8,
            (self.0 >> 16) as u8,
            (self.0 >> 8) as u8,
            self.0 as u8,
        ]
    }

    /// Convert to a tiny-skia color for drawing
    pub fn to_color(self) -> Color {
        let [r, g, b, a] = self.rgba8();
        Color::from_rgba8(r, g, b, a)
    }
}

/// Widget content, one variant per supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    /// Literal text, word-wrapped to the widget width
    Text(String),
    /// Decoded image, scaled to the widget size and tinted by the text color
    Image(Texture),
}

/// A single overlay widget
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    /// Unique identifier from the definition entry
    pub id: String,
    /// Display width in pixels (governs size even for images)
    pub width: u32,
    /// Display height in pixels
    pub height: u32,
    /// (horizontal, vertical) anchor fractions of the work area, each in [0, 1]
    pub anchor: (f32, f32),
    /// (x, y) pixel offset added after anchor placement
    pub offset: (i32, i32),
    /// Text/tint color
    pub color: PackedColor,
    /// Panel background color
    pub bg_color: PackedColor,
    /// Content to render
    pub kind: WidgetKind,
}

impl Widget {
    /// Absolute top-left position within a work area of the given size:
    /// `offset + anchor * work_area_size`
    pub fn position(&self, work_width: u32, work_height: u32) -> (f32, f32) {
        (
            self.offset.0 as f32 + self.anchor.0 * work_width as f32,
            self.offset.1 as f32 + self.anchor.1 * work_height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_widget() -> Widget {
        Widget {
            id: "t".to_string(),
            width: 100,
            height: 50,
            anchor: (0.0, 0.0),
            offset: (0, 0),
            color: PackedColor::WHITE,
            bg_color: PackedColor::TRANSPARENT,
            kind: WidgetKind::Text("hi".to_string()),
        }
    }

    #[test]
    fn position_defaults_to_origin() {
        assert_eq!(text_widget().position(1280, 800), (0.0, 0.0));
    }

    #[test]
    fn position_is_affine_in_anchor_and_offset() {
        let mut widget = text_widget();
        widget.anchor = (0.5, 0.25);
        widget.offset = (10, -20);
        let (x, y) = widget.position(1280, 800);
        assert_eq!(x, 10.0 + 0.5 * 1280.0);
        assert_eq!(y, -20.0 + 0.25 * 800.0);
    }

    #[test]
    fn pack_red_matches_expected_value() {
        assert_eq!(PackedColor::from_components([1.0, 0.0, 0.0, 1.0]).0, 0xFF00_00FF);
    }

    #[test]
    fn pack_round_trips_within_channel_precision() {
        let input = [0.25, 0.5, 0.75, 1.0];
        let output = PackedColor::from_components(input).components();
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).abs() <= 1.0 / 255.0, "{a} vs {b}");
        }
    }

    #[test]
    fn pack_clamps_out_of_range_channels() {
        assert_eq!(
            PackedColor::from_components([2.0, -1.0, 0.0, 1.5]),
            PackedColor::from_components([1.0, 0.0, 0.0, 1.0])
        );
    }

    #[test]
    fn white_is_the_all_ones_packing() {
        assert_eq!(PackedColor::from_components([1.0; 4]), PackedColor::WHITE);
    }
}
