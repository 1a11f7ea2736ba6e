//! floatwin Core
//!
//! Platform-agnostic state for floating windows that embed an external URL.
//!
//! This crate holds the two pieces every front-end needs:
//! - [`WindowRegistry`]: the ordered set of open windows and the
//!   operations that mutate it
//! - [`InteractionController`]: the per-window drag/resize state machine
//!   that turns a pointer gesture into geometry updates

mod interaction;
mod registry;

pub use interaction::{
    GestureCommit, GestureError, GestureKind, InteractionController, InteractionState,
    ListenerGuard, Point, PointerListeners, WindowSurface,
};
pub use registry::WindowRegistry;

use serde::{Deserialize, Serialize};

/// Unique identifier for a floating window.
/// Assigned from a monotonic counter and never reused.
pub type WindowId = u64;

/// Smallest width a window can be resized to.
pub const MIN_WINDOW_WIDTH: i32 = 300;
/// Smallest height a window can be resized to.
pub const MIN_WINDOW_HEIGHT: i32 = 200;

/// One visible floating panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingWindow {
    /// Stable identifier for the window's lifetime.
    pub id: WindowId,
    /// Caller-supplied title shown in the header.
    pub title: String,
    /// URL embedded in the window body.
    pub url: String,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Distance from the top of the page in pixels.
    pub top: i32,
    /// Distance from the left of the page in pixels.
    pub left: i32,
    /// False once a close was requested; the entry is then pending removal.
    pub is_open: bool,
}

/// Geometry handed to new windows, plus the size floor enforced on resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDefaults {
    pub width: i32,
    pub height: i32,
    pub top: i32,
    pub left: i32,
    pub min_width: i32,
    pub min_height: i32,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self {
            width: 900,
            height: 600,
            top: 100,
            left: 100,
            min_width: MIN_WINDOW_WIDTH,
            min_height: MIN_WINDOW_HEIGHT,
        }
    }
}

impl WindowDefaults {
    /// Clamp a requested size to the floor.
    pub fn clamp_size(&self, width: i32, height: i32) -> (i32, i32) {
        (width.max(self.min_width), height.max(self.min_height))
    }
}

/// What the renderer currently shows for one window.
///
/// `top`/`left`/`width`/`height` mirror the canonical geometry until a
/// gesture starts; during a drag only the translation moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStyle {
    pub width: i32,
    pub height: i32,
    pub top: i32,
    pub left: i32,
    pub translate_x: i32,
    pub translate_y: i32,
}

impl ViewStyle {
    /// Style for a window with no transient offset applied.
    pub fn from_window(window: &FloatingWindow) -> Self {
        Self {
            width: window.width,
            height: window.height,
            top: window.top,
            left: window.left,
            translate_x: 0,
            translate_y: 0,
        }
    }

    /// Top edge as seen on screen, translation included.
    pub fn visual_top(&self) -> i32 {
        self.top.saturating_add(self.translate_y)
    }

    /// Left edge as seen on screen, translation included.
    pub fn visual_left(&self) -> i32 {
        self.left.saturating_add(self.translate_x)
    }
}
