//! Overlaid
//!
//! Renders a static set of text and image widgets as a transparent,
//! borderless window on top of gamescope (or any compositing X11 setup).
//! Widget definitions arrive as a single JSON array on the command line.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     scene                           │
//! │      per-frame composition of the catalog           │
//! ├─────────────────────────────────────────────────────┤
//! │               catalog / widget / texture            │
//! │     JSON loading, widget records, decoded images    │
//! ├─────────────────────────────────────────────────────┤
//! │                    renderer                         │
//! │             tiny-skia + cosmic-text                 │
//! │               (drawing primitives)                  │
//! ├─────────────────────────────────────────────────────┤
//! │                    platform                         │
//! │        x11rb window, SHM frames, work area          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod platform;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod widget;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError};
pub use platform::{OverlayWindow, PlatformError, WorkArea};
pub use renderer::Renderer;
pub use scene::Scene;
pub use texture::{Texture, TextureError};
pub use widget::{PackedColor, Widget, WidgetKind};

// Re-export tiny_skia Color for external use
pub use tiny_skia::Color;
