//! X11 overlay window
//!
//! Uses XCB via x11rb for a transparent window that tracks the primary
//! monitor's work area. Frames are transferred with MIT-SHM. The window is
//! tagged with `GAMESCOPE_EXTERNAL_OVERLAY` at creation so gamescope treats
//! it as an overlay layer; under a plain X11 window manager the EWMH hints
//! (dock type, above state) keep it on top instead.

use std::fs::File;
use std::os::fd::AsFd;

use rustix::fs::{MemfdFlags, memfd_create};
use rustix::mm::{MapFlags, ProtFlags, mmap};
use tracing::debug;
use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::{PlatformError, WorkArea};

atom_manager! {
    pub AtomCollection: AtomCollectionCookie {
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        _NET_WM_NAME,
        UTF8_STRING,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_STATE,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_SKIP_TASKBAR,
        _NET_WM_STATE_SKIP_PAGER,
        _NET_WORKAREA,
        _NET_CURRENT_DESKTOP,
        GAMESCOPE_EXTERNAL_OVERLAY,
        ATOM,
    }
}

/// SHM buffer for efficient pixel transfer
struct ShmBuffer {
    seg_id: shm::Seg,
    ptr: *mut u8,
    size: usize,
}

/// A transparent overlay window sized to the primary monitor's work area
pub struct OverlayWindow {
    conn: RustConnection,
    window: Window,
    root: Window,
    gc: Gcontext,
    atoms: AtomCollection,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    depth: u8,
    /// Full screen size, the work-area fallback of last resort
    screen_size: (u32, u32),

    // Pixel buffers
    pixel_data: Vec<u8>, // RGBA from the renderer
    shm_buffer: ShmBuffer,

    running: bool,
}

impl OverlayWindow {
    pub fn new(title: &str) -> Result<Self, PlatformError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| PlatformError::Connection(e.to_string()))?;

        // Intern atoms
        let atoms = AtomCollection::new(&conn)
            .map_err(|e| PlatformError::Request(e.to_string()))?
            .reply()
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        let setup = conn.setup();
        let screen = &setup.roots[screen_num];
        let root = screen.root;
        let screen_size = (
            screen.width_in_pixels as u32,
            screen.height_in_pixels as u32,
        );

        // Check for required extensions
        conn.shape_query_version()
            .map_err(|_| PlatformError::UnsupportedFeature("Shape extension"))?
            .reply()
            .map_err(|_| PlatformError::UnsupportedFeature("Shape extension"))?;

        conn.shm_query_version()
            .map_err(|_| PlatformError::UnsupportedFeature("SHM extension"))?
            .reply()
            .map_err(|_| PlatformError::UnsupportedFeature("SHM extension"))?;

        // Find 32-bit visual for transparency
        let (visual, depth) =
            Self::find_argb_visual(screen).ok_or(PlatformError::NoArgbVisual)?;

        // Create colormap for 32-bit visual
        let colormap = conn
            .generate_id()
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        // Start out covering the current work area
        let area = query_work_area(&conn, root, &atoms, screen_size);

        let window = conn
            .generate_id()
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        let win_aux = CreateWindowAux::new()
            .background_pixel(0)
            .border_pixel(0)
            .colormap(colormap)
            .event_mask(EventMask::EXPOSURE | EventMask::STRUCTURE_NOTIFY);

        conn.create_window(
            depth,
            window,
            root,
            area.x as i16,
            area.y as i16,
            area.width as u16,
            area.height as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &win_aux,
        )
        .map_err(|e| PlatformError::Request(e.to_string()))?;

        // Create graphics context
        let gc = conn
            .generate_id()
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        // Create SHM buffer
        let shm_buffer = Self::create_shm_buffer(&conn, area.width, area.height)?;

        let overlay = Self {
            conn,
            window,
            root,
            gc,
            atoms,
            x: area.x,
            y: area.y,
            width: area.width,
            height: area.height,
            depth,
            screen_size,
            pixel_data: vec![0u8; (area.width * area.height * 4) as usize],
            shm_buffer,
            running: true,
        };

        overlay.set_title(title)?;
        overlay.setup_window_hints()?;
        overlay.tag_gamescope_overlay();
        overlay.clear_input_shape();

        overlay
            .conn
            .map_window(window)
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        overlay
            .conn
            .flush()
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        Ok(overlay)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current work area of the primary monitor
    pub fn work_area(&self) -> WorkArea {
        query_work_area(&self.conn, self.root, &self.atoms, self.screen_size)
    }

    /// Move/resize the window to cover `area` exactly
    pub fn set_geometry(&mut self, area: WorkArea) {
        let resized = area.width != self.width || area.height != self.height;
        if !resized && area.x == self.x && area.y == self.y {
            return;
        }

        self.x = area.x;
        self.y = area.y;
        self.width = area.width;
        self.height = area.height;

        if resized {
            let _ = self.recreate_shm_buffer();
        }

        let _ = self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(area.x)
                .y(area.y)
                .width(area.width)
                .height(area.height),
        );
        let _ = self.conn.flush();
    }

    /// Mutable access to the RGBA frame buffer
    pub fn pixel_buffer(&mut self) -> &mut [u8] {
        &mut self.pixel_data
    }

    /// Commit the current frame to the window
    pub fn commit(&mut self) {
        // Convert RGBA to the visual's BGRA order directly into the SHM buffer
        let shm_slice =
            unsafe { std::slice::from_raw_parts_mut(self.shm_buffer.ptr, self.shm_buffer.size) };

        for (i, chunk) in self.pixel_data.chunks(4).enumerate() {
            let offset = i * 4;
            if chunk.len() == 4 && offset + 3 < shm_slice.len() {
                shm_slice[offset] = chunk[2]; // B
                shm_slice[offset + 1] = chunk[1]; // G
                shm_slice[offset + 2] = chunk[0]; // R
                shm_slice[offset + 3] = chunk[3]; // A
            }
        }

        let _ = self.conn.shm_put_image(
            self.window,
            self.gc,
            self.width as u16,
            self.height as u16,
            0,
            0,
            self.width as u16,
            self.height as u16,
            0,
            0,
            self.depth,
            ImageFormat::Z_PIXMAP.into(),
            false,
            self.shm_buffer.seg_id,
            0,
        );
        let _ = self.conn.flush();
    }

    /// Process pending events (non-blocking).
    /// Returns false once the window was closed by the user or compositor.
    pub fn poll_events(&mut self) -> bool {
        while let Ok(Some(event)) = self.conn.poll_for_event() {
            match event {
                x11rb::protocol::Event::ClientMessage(e) => {
                    if e.format == 32
                        && e.type_ == self.atoms.WM_PROTOCOLS
                        && e.data.as_data32()[0] == self.atoms.WM_DELETE_WINDOW
                    {
                        self.running = false;
                        return false;
                    }
                }
                x11rb::protocol::Event::ConfigureNotify(e) if e.window == self.window => {
                    // The WM (or gamescope) may reposition/resize us; track it
                    // so the SHM buffer always matches the real window size.
                    self.x = e.x as i32;
                    self.y = e.y as i32;
                    let (w, h) = (e.width as u32, e.height as u32);
                    if w != self.width || h != self.height {
                        self.width = w;
                        self.height = h;
                        let _ = self.recreate_shm_buffer();
                    }
                }
                x11rb::protocol::Event::DestroyNotify(e) if e.window == self.window => {
                    self.running = false;
                    return false;
                }
                _ => {}
            }
        }
        self.running
    }

    // ─────────────────────────────────────────────────────────────────────
    // Setup helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Find a 32-bit ARGB visual for transparency
    fn find_argb_visual(screen: &Screen) -> Option<(Visualid, u8)> {
        for depth in &screen.allowed_depths {
            if depth.depth == 32 {
                for visual in &depth.visuals {
                    if visual.class == VisualClass::TRUE_COLOR {
                        return Some((visual.visual_id, depth.depth));
                    }
                }
            }
        }
        None
    }

    fn set_title(&self, title: &str) -> Result<(), PlatformError> {
        self.conn
            .change_property8(
                PropMode::REPLACE,
                self.window,
                AtomEnum::WM_NAME,
                AtomEnum::STRING,
                title.as_bytes(),
            )
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        self.conn
            .change_property8(
                PropMode::REPLACE,
                self.window,
                self.atoms._NET_WM_NAME,
                self.atoms.UTF8_STRING,
                title.as_bytes(),
            )
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        Ok(())
    }

    /// Set EWMH hints for overlay behavior and register for close requests
    fn setup_window_hints(&self) -> Result<(), PlatformError> {
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms.WM_PROTOCOLS,
                self.atoms.ATOM,
                &[self.atoms.WM_DELETE_WINDOW],
            )
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        // Window type: dock (stays on top, no decorations)
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms._NET_WM_WINDOW_TYPE,
                self.atoms.ATOM,
                &[self.atoms._NET_WM_WINDOW_TYPE_DOCK],
            )
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        // Window state: above, skip taskbar/pager
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms._NET_WM_STATE,
                self.atoms.ATOM,
                &[
                    self.atoms._NET_WM_STATE_ABOVE,
                    self.atoms._NET_WM_STATE_SKIP_TASKBAR,
                    self.atoms._NET_WM_STATE_SKIP_PAGER,
                ],
            )
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        Ok(())
    }

    /// Tag the window so gamescope composites it as an external overlay.
    /// Fire-and-forget: without gamescope nothing reads the property.
    fn tag_gamescope_overlay(&self) {
        let _ = self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms.GAMESCOPE_EXTERNAL_OVERLAY,
            AtomEnum::CARDINAL,
            &[1],
        );
        debug!("tagged window as a gamescope external overlay");
    }

    /// Empty input region: clicks pass through to the window underneath
    fn clear_input_shape(&self) {
        let _ = self.conn.shape_rectangles(
            shape::SO::SET,
            shape::SK::INPUT,
            ClipOrdering::UNSORTED,
            self.window,
            0,
            0,
            &[],
        );
        let _ = self.conn.flush();
    }

    // ─────────────────────────────────────────────────────────────────────
    // SHM buffers
    // ─────────────────────────────────────────────────────────────────────

    /// Create a shared memory buffer for efficient pixel transfer
    fn create_shm_buffer(
        conn: &RustConnection,
        width: u32,
        height: u32,
    ) -> Result<ShmBuffer, PlatformError> {
        let size = (width * height * 4) as usize;

        // Create anonymous shared memory
        let fd = memfd_create(c"overlaid-x11-buffer", MemfdFlags::CLOEXEC)
            .map_err(|e| PlatformError::Buffer(format!("memfd_create failed: {e}")))?;

        rustix::fs::ftruncate(&fd, size as u64)
            .map_err(|e| PlatformError::Buffer(format!("ftruncate failed: {e}")))?;

        // Memory map it
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                fd.as_fd(),
                0,
            )
            .map_err(|e| PlatformError::Buffer(format!("mmap failed: {e}")))?
        };

        // Attach to X server
        let seg_id = conn
            .generate_id()
            .map_err(|e| PlatformError::Buffer(e.to_string()))?;

        // x11rb shm_attach_fd takes ownership of the fd
        let file = File::from(fd);
        conn.shm_attach_fd(seg_id, file, false)
            .map_err(|e| PlatformError::Buffer(format!("shm_attach_fd failed: {e}")))?;

        Ok(ShmBuffer {
            seg_id,
            ptr: ptr as *mut u8,
            size,
        })
    }

    /// Recreate the SHM buffer after a resize
    fn recreate_shm_buffer(&mut self) -> Result<(), PlatformError> {
        // Detach old segment
        let _ = self.conn.shm_detach(self.shm_buffer.seg_id);
        unsafe {
            rustix::mm::munmap(self.shm_buffer.ptr as *mut _, self.shm_buffer.size).ok();
        }

        self.shm_buffer = Self::create_shm_buffer(&self.conn, self.width, self.height)?;
        self.pixel_data
            .resize((self.width * self.height * 4) as usize, 0);

        Ok(())
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        // Clean up SHM
        let _ = self.conn.shm_detach(self.shm_buffer.seg_id);
        unsafe {
            rustix::mm::munmap(self.shm_buffer.ptr as *mut _, self.shm_buffer.size).ok();
        }

        let _ = self.conn.destroy_window(self.window);
        let _ = self.conn.free_gc(self.gc);
        let _ = self.conn.flush();
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Work area query
// ─────────────────────────────────────────────────────────────────────────

/// The primary monitor's geometry intersected with the root window's
/// `_NET_WORKAREA` for the current desktop. Falls back to the bare monitor
/// rect, then to the whole screen.
fn query_work_area(
    conn: &RustConnection,
    root: Window,
    atoms: &AtomCollection,
    screen_size: (u32, u32),
) -> WorkArea {
    let screen = WorkArea {
        x: 0,
        y: 0,
        width: screen_size.0,
        height: screen_size.1,
    };
    let monitor = primary_monitor(conn, root).unwrap_or(screen);

    match net_workarea(conn, root, atoms) {
        Some(workarea) => monitor.intersect(workarea).unwrap_or(monitor),
        None => monitor,
    }
}

fn primary_monitor(conn: &RustConnection, root: Window) -> Option<WorkArea> {
    let monitors = conn.randr_get_monitors(root, true).ok()?.reply().ok()?;
    let monitor = monitors
        .monitors
        .iter()
        .find(|m| m.primary)
        .or_else(|| monitors.monitors.first())?;

    Some(WorkArea {
        x: monitor.x as i32,
        y: monitor.y as i32,
        width: monitor.width as u32,
        height: monitor.height as u32,
    })
}

/// `_NET_WORKAREA` entry (x, y, width, height) for the current desktop
fn net_workarea(conn: &RustConnection, root: Window, atoms: &AtomCollection) -> Option<WorkArea> {
    let desktop = conn
        .get_property(
            false,
            root,
            atoms._NET_CURRENT_DESKTOP,
            AtomEnum::CARDINAL,
            0,
            1,
        )
        .ok()?
        .reply()
        .ok()?
        .value32()?
        .next()
        .unwrap_or(0);

    let reply = conn
        .get_property(
            false,
            root,
            atoms._NET_WORKAREA,
            AtomEnum::CARDINAL,
            0,
            u32::MAX,
        )
        .ok()?
        .reply()
        .ok()?;
    let values: Vec<u32> = reply.value32()?.collect();

    let start = desktop as usize * 4;
    let chunk = values.get(start..start + 4)?;

    Some(WorkArea {
        x: chunk[0] as i32,
        y: chunk[1] as i32,
        width: chunk[2],
        height: chunk[3],
    })
}
