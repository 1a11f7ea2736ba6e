//! The ordered collection of open floating windows.

use crate::{FloatingWindow, WindowDefaults, WindowId};

/// Single source of truth for every floating window currently on screen.
///
/// Windows keep their creation order. Operations that reference an id that
/// is not present are silent no-ops and report `false`/`None`.
#[derive(Debug, Clone, Default)]
pub struct WindowRegistry {
    windows: Vec<FloatingWindow>,
    next_id: WindowId,
    defaults: WindowDefaults,
    revision: u64,
}

impl WindowRegistry {
    /// Create an empty registry with the default geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that opens windows with `defaults`.
    pub fn with_defaults(defaults: WindowDefaults) -> Self {
        Self {
            defaults,
            ..Default::default()
        }
    }

    /// Geometry used for new windows.
    pub fn defaults(&self) -> WindowDefaults {
        self.defaults
    }

    /// Replace the geometry used for windows opened from now on.
    /// Existing windows keep their geometry.
    pub fn set_defaults(&mut self, defaults: WindowDefaults) {
        self.defaults = defaults;
    }

    /// Open a new window and append it to the collection.
    pub fn open_window(&mut self, title: impl Into<String>, url: impl Into<String>) -> WindowId {
        let id = self.next_id;
        self.next_id += 1;

        self.windows.push(FloatingWindow {
            id,
            title: title.into(),
            url: url.into(),
            width: self.defaults.width,
            height: self.defaults.height,
            top: self.defaults.top,
            left: self.defaults.left,
            is_open: true,
        });
        self.revision += 1;
        id
    }

    /// Mark a window as closing.
    ///
    /// Returns `true` when the window exists, in which case the caller must
    /// schedule [`remove_window`](Self::remove_window) once the close
    /// animation delay has elapsed.
    pub fn close_window(&mut self, id: WindowId) -> bool {
        match self.get_mut(id) {
            Some(window) => {
                window.is_open = false;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Remove a window from the collection entirely.
    pub fn remove_window(&mut self, id: WindowId) -> Option<FloatingWindow> {
        let pos = self.windows.iter().position(|w| w.id == id)?;
        self.revision += 1;
        Some(self.windows.remove(pos))
    }

    /// Overwrite a window's position.
    pub fn update_window_position(&mut self, id: WindowId, top: i32, left: i32) -> bool {
        match self.get_mut(id) {
            Some(window) => {
                window.top = top;
                window.left = left;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Overwrite a window's size, clamped to the minimum usable size.
    pub fn update_window_size(&mut self, id: WindowId, width: i32, height: i32) -> bool {
        let (width, height) = self.defaults.clamp_size(width, height);
        match self.get_mut(id) {
            Some(window) => {
                window.width = width;
                window.height = height;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// All windows in creation order, including ones pending removal.
    pub fn windows(&self) -> &[FloatingWindow] {
        &self.windows
    }

    /// Look up a window by id.
    pub fn get(&self, id: WindowId) -> Option<&FloatingWindow> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn get_mut(&mut self, id: WindowId) -> Option<&mut FloatingWindow> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    /// Number of entries, closing ones included.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Check if the registry holds no windows.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Number of entries not yet marked closing.
    pub fn open_count(&self) -> usize {
        self.windows.iter().filter(|w| w.is_open).count()
    }

    /// Bumped by every mutation that touched the collection.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
