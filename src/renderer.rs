//! Software renderer using tiny-skia and cosmic-text
//!
//! All rendering is done on the CPU and produces an RGBA pixel buffer that
//! the platform layer hands to the X server. Text shaping results are cached
//! because the catalog is static and every frame redraws the same strings.
#![allow(clippy::too_many_arguments)]
use std::collections::HashMap;

use cosmic_text::{
    Attrs, Buffer, Color as CosmicColor, Family, FontSystem, LayoutGlyph, Metrics, Shaping,
    SwashCache, Wrap,
};
use tiny_skia::{Color, Paint, PixmapMut, Rect, Transform};

use crate::texture::Texture;
use crate::widget::PackedColor;

/// Maximum entries in the text shaping cache (LRU eviction when exceeded)
const TEXT_CACHE_MAX_ENTRIES: usize = 256;

/// A shaped glyph together with the baseline of the wrapped line it sits on
struct ShapedGlyph {
    glyph: LayoutGlyph,
    line_y: f32,
}

/// Cached result of shaping one string at one size and wrap width
struct CachedText {
    glyphs: Vec<ShapedGlyph>,
    /// LRU tracking: set to the access counter on each use
    last_used: u64,
}

/// Key for the text cache: (content, font size in tenths, wrap width in px)
type TextCacheKey = (String, u32, u32);

/// A software renderer for overlay content
pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    text_cache: HashMap<TextCacheKey, CachedText>,
    cache_access_counter: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            text_cache: HashMap::with_capacity(64),
            cache_access_counter: 0,
        }
    }

    /// Create a new pixel buffer (RGBA format)
    pub fn create_buffer(width: u32, height: u32) -> Vec<u8> {
        vec![0u8; (width * height * 4) as usize]
    }

    /// Clear a pixel buffer with a color
    pub fn clear(&self, buffer: &mut [u8], width: u32, height: u32, color: Color) {
        if let Some(mut pixmap) = PixmapMut::from_bytes(buffer, width, height) {
            pixmap.fill(color);
        }
    }

    /// Draw a filled rectangle
    pub fn fill_rect(
        &self,
        buffer: &mut [u8],
        width: u32,
        height: u32,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    ) {
        let Some(mut pixmap) = PixmapMut::from_bytes(buffer, width, height) else {
            return;
        };

        let rect = match Rect::from_xywh(x, y, w, h) {
            Some(r) => r,
            None => return,
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Draw word-wrapped text with its top-left corner at (x, y),
    /// wrapping at `wrap_width` pixels (uses the shaping cache)
    pub fn draw_text_wrapped(
        &mut self,
        buffer: &mut [u8],
        buf_width: u32,
        buf_height: u32,
        text: &str,
        x: f32,
        y: f32,
        wrap_width: f32,
        font_size: f32,
        color: Color,
    ) {
        let Some(mut pixmap) = PixmapMut::from_bytes(buffer, buf_width, buf_height) else {
            return;
        };

        self.ensure_cached(text, font_size, wrap_width);

        // Still needs a clone: swash_cache borrows self mutably while drawing
        let glyphs = self.cached_glyphs(text, font_size, wrap_width);

        let text_color = CosmicColor::rgba(
            (color.red() * 255.0) as u8,
            (color.green() * 255.0) as u8,
            (color.blue() * 255.0) as u8,
            (color.alpha() * 255.0) as u8,
        );

        for shaped in &glyphs {
            let physical_glyph = shaped.glyph.physical((x, y + shaped.line_y), 1.0);

            if let Some(image) = self
                .swash_cache
                .get_image(&mut self.font_system, physical_glyph.cache_key)
            {
                let glyph_x = physical_glyph.x + image.placement.left;
                let glyph_y = physical_glyph.y - image.placement.top;

                draw_glyph_to_pixmap(
                    &mut pixmap,
                    &image.data,
                    image.placement.width,
                    image.placement.height,
                    glyph_x,
                    glyph_y,
                    text_color,
                );
            }
        }
    }

    /// Draw a texture scaled (nearest-neighbor) to `w` x `h` with its
    /// top-left corner at (x, y), channel-multiplied by `tint`
    pub fn draw_image(
        &self,
        buffer: &mut [u8],
        buf_width: u32,
        buf_height: u32,
        texture: &Texture,
        x: f32,
        y: f32,
        w: u32,
        h: u32,
        tint: PackedColor,
    ) {
        if w == 0 || h == 0 || texture.width() == 0 || texture.height() == 0 {
            return;
        }

        let [tint_r, tint_g, tint_b, tint_a] = tint.rgba8();
        let dest_x = x.round() as i64;
        let dest_y = y.round() as i64;

        for dy in 0..h as i64 {
            let py = dest_y + dy;
            if py < 0 || py >= buf_height as i64 {
                continue;
            }
            let src_y = (dy as u64 * texture.height() as u64 / h as u64) as u32;

            for dx in 0..w as i64 {
                let px = dest_x + dx;
                if px < 0 || px >= buf_width as i64 {
                    continue;
                }
                let src_x = (dx as u64 * texture.width() as u64 / w as u64) as u32;

                let src = texture.pixel(src_x, src_y);
                let src_a = src[3] as u32 * tint_a as u32 / 255;
                if src_a == 0 {
                    continue;
                }
                let src_r = src[0] as u32 * tint_r as u32 / 255;
                let src_g = src[1] as u32 * tint_g as u32 / 255;
                let src_b = src[2] as u32 * tint_b as u32 / 255;
                let inv_a = 255 - src_a;

                let idx = ((py as u32 * buf_width + px as u32) * 4) as usize;
                buffer[idx] = ((src_r * src_a + buffer[idx] as u32 * inv_a) / 255) as u8;
                buffer[idx + 1] = ((src_g * src_a + buffer[idx + 1] as u32 * inv_a) / 255) as u8;
                buffer[idx + 2] = ((src_b * src_a + buffer[idx + 2] as u32 * inv_a) / 255) as u8;
                buffer[idx + 3] = (src_a + (buffer[idx + 3] as u32 * inv_a) / 255) as u8;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Text shaping cache
    // ─────────────────────────────────────────────────────────────────────

    /// Shape `text` into the cache if it is not there already
    fn ensure_cached(&mut self, text: &str, font_size: f32, wrap_width: f32) {
        let key = cache_key_parts(font_size, wrap_width);

        self.cache_access_counter += 1;
        let current_access = self.cache_access_counter;

        if let Some(cached) = self.find_cached(text, key) {
            cached.last_used = current_access;
            return;
        }

        let metrics = Metrics::new(font_size, font_size * 1.2);
        let mut text_buffer = Buffer::new(&mut self.font_system, metrics);

        let attrs = Attrs::new().family(Family::SansSerif);
        text_buffer.set_wrap(&mut self.font_system, Wrap::Word);
        text_buffer.set_size(&mut self.font_system, Some(wrap_width), None);
        text_buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        text_buffer.shape_until_scroll(&mut self.font_system, false);

        let mut glyphs = Vec::new();
        for run in text_buffer.layout_runs() {
            for glyph in run.glyphs.iter() {
                glyphs.push(ShapedGlyph {
                    glyph: glyph.clone(),
                    line_y: run.line_y,
                });
            }
        }

        self.text_cache.insert(
            (text.to_string(), key.0, key.1),
            CachedText {
                glyphs,
                last_used: current_access,
            },
        );
        self.evict_lru_if_needed();
    }

    /// Find a cached entry by borrowed key (avoids String allocation on hit)
    fn find_cached(&mut self, text: &str, key: (u32, u32)) -> Option<&mut CachedText> {
        // Linear scan: a catalog rarely holds more than a few dozen strings
        self.text_cache
            .iter_mut()
            .find(|(k, _)| k.0 == text && k.1 == key.0 && k.2 == key.1)
            .map(|(_, v)| v)
    }

    fn cached_glyphs(&mut self, text: &str, font_size: f32, wrap_width: f32) -> Vec<ShapedGlyph> {
        let key = cache_key_parts(font_size, wrap_width);
        self.find_cached(text, key)
            .map(|c| {
                c.glyphs
                    .iter()
                    .map(|s| ShapedGlyph {
                        glyph: s.glyph.clone(),
                        line_y: s.line_y,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Evict least recently used entries if the cache grew too large
    fn evict_lru_if_needed(&mut self) {
        if self.text_cache.len() <= TEXT_CACHE_MAX_ENTRIES {
            return;
        }

        let target_size = TEXT_CACHE_MAX_ENTRIES * 3 / 4;
        let mut entries: Vec<_> = self
            .text_cache
            .iter()
            .map(|(k, v)| (k.clone(), v.last_used))
            .collect();
        entries.sort_by_key(|(_, last_used)| *last_used);

        for (key, _) in entries
            .into_iter()
            .take(self.text_cache.len() - target_size)
        {
            self.text_cache.remove(&key);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key_parts(font_size: f32, wrap_width: f32) -> (u32, u32) {
    ((font_size * 10.0).round() as u32, wrap_width.round() as u32)
}

/// Draw a glyph image onto a pixmap with alpha blending
fn draw_glyph_to_pixmap(
    pixmap: &mut PixmapMut,
    glyph_data: &[u8],
    glyph_width: u32,
    glyph_height: u32,
    dest_x: i32,
    dest_y: i32,
    color: CosmicColor,
) {
    let pixmap_width = pixmap.width() as i32;
    let pixmap_height = pixmap.height() as i32;
    let data = pixmap.data_mut();

    for gy in 0..glyph_height as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= pixmap_height {
            continue;
        }

        for gx in 0..glyph_width as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= pixmap_width {
                continue;
            }

            let glyph_idx = (gy as u32 * glyph_width + gx as u32) as usize;
            if glyph_idx >= glyph_data.len() {
                continue;
            }

            let alpha = glyph_data[glyph_idx];
            if alpha == 0 {
                continue;
            }

            let pixel_idx = ((py as u32 * pixmap_width as u32 + px as u32) * 4) as usize;
            if pixel_idx + 3 >= data.len() {
                continue;
            }

            // Alpha blend the glyph onto the pixmap
            let src_a = (alpha as u32 * color.a() as u32) / 255;
            let inv_a = 255 - src_a;

            data[pixel_idx] =
                ((color.r() as u32 * src_a + data[pixel_idx] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 1] =
                ((color.g() as u32 * src_a + data[pixel_idx + 1] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 2] =
                ((color.b() as u32 * src_a + data[pixel_idx + 2] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 3] = (src_a + (data[pixel_idx + 3] as u32 * inv_a) / 255) as u8;
        }
    }
}
