//! Per-frame composition of the widget catalog
//!
//! The scene owns the catalog and the renderer and redraws every widget each
//! frame into the pixel buffer the platform layer provides. Widgets paint in
//! catalog order, so later entries cover earlier ones.

use tiny_skia::Color;

use crate::catalog::Catalog;
use crate::renderer::Renderer;
use crate::widget::{PackedColor, WidgetKind};

/// Font size for text widgets, in pixels
const FONT_SIZE: f32 = 14.0;

pub struct Scene {
    catalog: Catalog,
    renderer: Renderer,
}

impl Scene {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            renderer: Renderer::new(),
        }
    }

    /// Render one frame into an RGBA buffer covering the work area
    pub fn render(&mut self, buffer: &mut [u8], width: u32, height: u32) {
        self.renderer
            .clear(buffer, width, height, Color::from_rgba8(0, 0, 0, 0));

        for widget in self.catalog.widgets() {
            let (x, y) = widget.position(width, height);
            let (w, h) = (widget.width as f32, widget.height as f32);

            if widget.bg_color != PackedColor::TRANSPARENT {
                self.renderer
                    .fill_rect(buffer, width, height, x, y, w, h, widget.bg_color.to_color());
            }

            match &widget.kind {
                WidgetKind::Text(text) => {
                    self.renderer.draw_text_wrapped(
                        buffer,
                        width,
                        height,
                        text,
                        x,
                        y,
                        w,
                        FONT_SIZE,
                        widget.color.to_color(),
                    );
                }
                WidgetKind::Image(texture) => {
                    self.renderer.draw_image(
                        buffer,
                        width,
                        height,
                        texture,
                        x,
                        y,
                        widget.width,
                        widget.height,
                        widget.color,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(buffer: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * width + x) * 4) as usize;
        [buffer[idx], buffer[idx + 1], buffer[idx + 2], buffer[idx + 3]]
    }

    #[test]
    fn paints_background_at_anchored_position() {
        let catalog = Catalog::load(
            r#"[{
                "id": "panel",
                "type": "text",
                "content": "",
                "width": 20,
                "height": 10,
                "horizontal_anchor": 0.5,
                "vertical_anchor": 0.5,
                "x_offset": 2,
                "y_offset": 3,
                "bg_color": [0.0, 0.0, 1.0, 1.0]
            }]"#,
        )
        .unwrap();
        let mut scene = Scene::new(catalog);

        let (width, height) = (100u32, 100u32);
        let mut buffer = Renderer::create_buffer(width, height);
        scene.render(&mut buffer, width, height);

        // Widget top-left is (2 + 50, 3 + 50); sample well inside it
        assert_eq!(pixel(&buffer, width, 60, 58), [0, 0, 255, 255]);
        // And the frame outside the widget stays fully transparent
        assert_eq!(pixel(&buffer, width, 10, 10), [0, 0, 0, 0]);
    }

    #[test]
    fn later_widgets_paint_over_earlier_ones() {
        let catalog = Catalog::load(
            r#"[
                {"id":"under","type":"text","content":"","width":10,"height":10,
                 "bg_color":[1.0,0.0,0.0,1.0]},
                {"id":"over","type":"text","content":"","width":10,"height":10,
                 "bg_color":[0.0,1.0,0.0,1.0]}
            ]"#,
        )
        .unwrap();
        let mut scene = Scene::new(catalog);

        let mut buffer = Renderer::create_buffer(32, 32);
        scene.render(&mut buffer, 32, 32);

        assert_eq!(pixel(&buffer, 32, 5, 5), [0, 255, 0, 255]);
    }

    #[test]
    fn renders_an_empty_catalog_to_a_transparent_frame() {
        let mut scene = Scene::new(Catalog::load("[]").unwrap());
        let mut buffer = Renderer::create_buffer(8, 8);
        buffer.fill(0xAA);
        scene.render(&mut buffer, 8, 8);
        assert!(buffer.iter().all(|&b| b == 0));
    }
}
