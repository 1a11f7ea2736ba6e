//! Pointer-driven drag and resize for a single floating window.
//!
//! A gesture is pointer-down → pointer-move* → pointer-up. While it runs the
//! controller only touches the visual surface; the final geometry is handed
//! back as a [`GestureCommit`] for the caller to write into the registry.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::{FloatingWindow, ViewStyle, WindowDefaults, WindowId};

/// Errors that can occur when starting a gesture.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GestureError {
    #[error("Window {0} already has an active {1} gesture")]
    GestureActive(WindowId, GestureKind),

    #[error("Window {0} is closing")]
    WindowClosing(WindowId),
}

/// A pointer position in page coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset from `start` to this point, saturating at the `i32` range.
    pub fn delta_from(self, start: Point) -> (i32, i32) {
        (self.x.saturating_sub(start.x), self.y.saturating_sub(start.y))
    }
}

/// The two kinds of gesture a window supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize,
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureKind::Drag => f.write_str("drag"),
            GestureKind::Resize => f.write_str("resize"),
        }
    }
}

/// Current gesture state, with the baseline captured at pointer-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging {
        start: Point,
        start_translate: Point,
    },
    Resizing {
        start: Point,
        start_width: i32,
        start_height: i32,
    },
}

impl InteractionState {
    /// The running gesture, if any.
    pub fn gesture(&self) -> Option<GestureKind> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Dragging { .. } => Some(GestureKind::Drag),
            InteractionState::Resizing { .. } => Some(GestureKind::Resize),
        }
    }
}

/// Final geometry of a finished gesture, to be written back to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureCommit {
    Position { top: i32, left: i32 },
    Size { width: i32, height: i32 },
}

/// Sink for transient visual updates.
///
/// Implementations apply styles directly to whatever renders the window,
/// bypassing the normal state-update cycle.
pub trait WindowSurface {
    /// Apply a translation relative to the canonical top/left.
    fn set_translate(&mut self, x: i32, y: i32);
    /// Apply a rendered size.
    fn set_size(&mut self, width: i32, height: i32);
    /// Apply canonical geometry (size and top/left).
    fn set_geometry(&mut self, style: &ViewStyle);
}

/// Tracks which windows currently hold the global pointer listeners.
///
/// Pointer moves and releases are delivered only to windows in this set.
/// Membership is held through a [`ListenerGuard`], so it is released
/// whenever the guard is dropped.
#[derive(Debug, Clone, Default)]
pub struct PointerListeners {
    active: Arc<Mutex<BTreeSet<WindowId>>>,
}

impl PointerListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<WindowId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `window_id` for global pointer events until the guard drops.
    pub fn acquire(&self, window_id: WindowId) -> ListenerGuard {
        self.lock().insert(window_id);
        ListenerGuard {
            window_id,
            active: Arc::clone(&self.active),
        }
    }

    /// Whether `window_id` is currently listening.
    pub fn is_listening(&self, window_id: WindowId) -> bool {
        self.lock().contains(&window_id)
    }

    /// Windows currently listening, in id order.
    pub fn listening(&self) -> Vec<WindowId> {
        self.lock().iter().copied().collect()
    }

    /// Number of windows currently listening.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Scoped registration in [`PointerListeners`].
#[derive(Debug)]
pub struct ListenerGuard {
    window_id: WindowId,
    active: Arc<Mutex<BTreeSet<WindowId>>>,
}

impl ListenerGuard {
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.window_id);
    }
}

/// Drag/resize state machine for one window.
pub struct InteractionController {
    window_id: WindowId,
    min_width: i32,
    min_height: i32,
    closing: bool,
    style: ViewStyle,
    state: InteractionState,
    listeners: PointerListeners,
    listener: Option<ListenerGuard>,
    surface: Option<Box<dyn WindowSurface + Send>>,
}

impl fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionController")
            .field("window_id", &self.window_id)
            .field("closing", &self.closing)
            .field("style", &self.style)
            .field("state", &self.state)
            .field("listening", &self.listener.is_some())
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}

impl InteractionController {
    /// Attach a controller to `window` and apply its canonical geometry.
    pub fn new(window: &FloatingWindow, defaults: &WindowDefaults, listeners: PointerListeners) -> Self {
        let mut controller = Self {
            window_id: window.id,
            min_width: defaults.min_width,
            min_height: defaults.min_height,
            closing: false,
            style: ViewStyle::from_window(window),
            state: InteractionState::Idle,
            listeners,
            listener: None,
            surface: None,
        };
        controller.sync_from(window);
        controller
    }

    /// Attach a visual surface and bring it up to date.
    pub fn with_surface(mut self, surface: Box<dyn WindowSurface + Send>) -> Self {
        self.surface = Some(surface);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_geometry(&self.style);
            surface.set_translate(self.style.translate_x, self.style.translate_y);
        }
        self
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// What the surface currently shows.
    pub fn style(&self) -> ViewStyle {
        self.style
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, InteractionState::Idle)
    }

    /// Whether this controller currently holds the global pointer listeners.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Change the size floor for later resize gestures.
    pub fn set_min_size(&mut self, min_width: i32, min_height: i32) {
        self.min_width = min_width;
        self.min_height = min_height;
    }

    /// Reapply canonical geometry, discarding any transient translation.
    pub fn sync_from(&mut self, window: &FloatingWindow) {
        self.closing = !window.is_open;
        self.style = ViewStyle::from_window(window);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_geometry(&self.style);
            surface.set_translate(0, 0);
        }
    }

    /// Pointer-down on the header: start dragging.
    pub fn begin_drag(&mut self, pointer: Point) -> Result<(), GestureError> {
        self.check_can_begin()?;
        self.state = InteractionState::Dragging {
            start: pointer,
            start_translate: Point::new(self.style.translate_x, self.style.translate_y),
        };
        self.listener = Some(self.listeners.acquire(self.window_id));
        Ok(())
    }

    /// Pointer-down on the resize handle: start resizing.
    pub fn begin_resize(&mut self, pointer: Point) -> Result<(), GestureError> {
        self.check_can_begin()?;
        self.state = InteractionState::Resizing {
            start: pointer,
            start_width: self.style.width,
            start_height: self.style.height,
        };
        self.listener = Some(self.listeners.acquire(self.window_id));
        Ok(())
    }

    fn check_can_begin(&self) -> Result<(), GestureError> {
        if self.closing {
            return Err(GestureError::WindowClosing(self.window_id));
        }
        if let Some(kind) = self.state.gesture() {
            return Err(GestureError::GestureActive(self.window_id, kind));
        }
        Ok(())
    }

    /// Pointer moved while a gesture is active.
    ///
    /// Returns `false` when idle, in which case nothing changes.
    pub fn pointer_move(&mut self, pointer: Point) -> bool {
        match self.state {
            InteractionState::Idle => false,
            InteractionState::Dragging {
                start,
                start_translate,
            } => {
                let (dx, dy) = pointer.delta_from(start);
                self.style.translate_x = start_translate.x.saturating_add(dx);
                self.style.translate_y = start_translate.y.saturating_add(dy);
                if let Some(surface) = self.surface.as_mut() {
                    surface.set_translate(self.style.translate_x, self.style.translate_y);
                }
                true
            }
            InteractionState::Resizing {
                start,
                start_width,
                start_height,
            } => {
                let (dx, dy) = pointer.delta_from(start);
                self.style.width = start_width.saturating_add(dx).max(self.min_width);
                self.style.height = start_height.saturating_add(dy).max(self.min_height);
                if let Some(surface) = self.surface.as_mut() {
                    surface.set_size(self.style.width, self.style.height);
                }
                true
            }
        }
    }

    /// Pointer released: end the gesture and release the listeners.
    ///
    /// Returns the geometry to commit, or `None` if no gesture was running.
    pub fn pointer_up(&mut self) -> Option<GestureCommit> {
        let commit = match self.state {
            InteractionState::Idle => None,
            InteractionState::Dragging { .. } => Some(GestureCommit::Position {
                top: self.style.visual_top(),
                left: self.style.visual_left(),
            }),
            InteractionState::Resizing { .. } => Some(GestureCommit::Size {
                width: self.style.width,
                height: self.style.height,
            }),
        };
        self.end_gesture();
        commit
    }

    /// Abort any gesture without committing.
    pub fn cancel(&mut self) {
        self.end_gesture();
    }

    /// Cancel any gesture and refuse new ones; used when the window closes.
    pub fn close(&mut self) {
        self.closing = true;
        self.end_gesture();
    }

    fn end_gesture(&mut self) {
        self.state = InteractionState::Idle;
        self.listener = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WindowRegistry;

    #[derive(Default)]
    struct Recorded {
        translates: Vec<(i32, i32)>,
        sizes: Vec<(i32, i32)>,
        geometries: Vec<ViewStyle>,
    }

    struct RecordingSurface(Arc<Mutex<Recorded>>);

    impl WindowSurface for RecordingSurface {
        fn set_translate(&mut self, x: i32, y: i32) {
            self.0.lock().unwrap().translates.push((x, y));
        }

        fn set_size(&mut self, width: i32, height: i32) {
            self.0.lock().unwrap().sizes.push((width, height));
        }

        fn set_geometry(&mut self, style: &ViewStyle) {
            self.0.lock().unwrap().geometries.push(*style);
        }
    }

    fn setup() -> (WindowRegistry, WindowId, PointerListeners) {
        let mut registry = WindowRegistry::new();
        let id = registry.open_window("ZZZ Sheet", "https://sheet.example");
        (registry, id, PointerListeners::new())
    }

    fn controller_for(registry: &WindowRegistry, id: WindowId, listeners: &PointerListeners) -> InteractionController {
        InteractionController::new(registry.get(id).unwrap(), &registry.defaults(), listeners.clone())
    }

    #[test]
    fn test_starts_idle_with_canonical_style() {
        let (registry, id, listeners) = setup();
        let controller = controller_for(&registry, id, &listeners);

        assert_eq!(controller.state(), InteractionState::Idle);
        assert_eq!(controller.style(), ViewStyle::from_window(registry.get(id).unwrap()));
        assert!(!controller.is_listening());
    }

    #[test]
    fn test_drag_moves_translation_only() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(150, 110)).unwrap();
        assert!(controller.pointer_move(Point::new(190, 80)));

        let style = controller.style();
        assert_eq!((style.translate_x, style.translate_y), (40, -30));
        assert_eq!((style.top, style.left), (100, 100));
        assert_eq!((style.width, style.height), (900, 600));
    }

    #[test]
    fn test_drag_commit_moves_by_delta() {
        let (mut registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(150, 110)).unwrap();
        controller.pointer_move(Point::new(170, 140));
        controller.pointer_move(Point::new(200, 160));
        let commit = controller.pointer_up().unwrap();

        assert_eq!(commit, GestureCommit::Position { top: 150, left: 150 });

        if let GestureCommit::Position { top, left } = commit {
            registry.update_window_position(id, top, left);
        }
        controller.sync_from(registry.get(id).unwrap());
        assert_eq!(controller.style().translate_x, 0);
        assert_eq!(controller.style().visual_top(), 150);
    }

    #[test]
    fn test_second_drag_starts_from_current_translation() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(0, 0)).unwrap();
        controller.pointer_move(Point::new(10, 10));
        controller.pointer_up();

        controller.begin_drag(Point::new(500, 500)).unwrap();
        controller.pointer_move(Point::new(505, 495));
        let style = controller.style();
        assert_eq!((style.translate_x, style.translate_y), (15, 5));
    }

    #[test]
    fn test_resize_respects_floor() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_resize(Point::new(1000, 700)).unwrap();
        controller.pointer_move(Point::new(1100, 750));
        assert_eq!((controller.style().width, controller.style().height), (1000, 650));

        controller.pointer_move(Point::new(-5000, -5000));
        assert_eq!((controller.style().width, controller.style().height), (300, 200));

        assert_eq!(
            controller.pointer_up(),
            Some(GestureCommit::Size {
                width: 300,
                height: 200
            })
        );
    }

    #[test]
    fn test_extreme_pointer_values_saturate() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(i32::MIN, i32::MAX)).unwrap();
        controller.pointer_move(Point::new(i32::MAX, i32::MIN));
        let style = controller.style();
        assert_eq!((style.translate_x, style.translate_y), (i32::MAX, i32::MIN));
        assert_eq!((style.visual_left(), style.visual_top()), (i32::MAX, i32::MIN + 100));
        assert_eq!(
            controller.pointer_up(),
            Some(GestureCommit::Position {
                top: i32::MIN + 100,
                left: i32::MAX
            })
        );

        controller.begin_resize(Point::new(0, 0)).unwrap();
        controller.pointer_move(Point::new(i32::MAX, i32::MAX));
        assert_eq!((controller.style().width, controller.style().height), (i32::MAX, i32::MAX));

        controller.pointer_move(Point::new(i32::MIN, i32::MIN));
        assert_eq!((controller.style().width, controller.style().height), (300, 200));
    }

    #[test]
    fn test_listeners_scoped_to_gesture() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        assert!(listeners.is_empty());
        controller.begin_resize(Point::new(0, 0)).unwrap();
        assert!(listeners.is_listening(id));
        assert!(controller.is_listening());

        controller.pointer_up();
        assert!(!listeners.is_listening(id));
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_listeners_released_on_cancel_and_drop() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(0, 0)).unwrap();
        controller.cancel();
        assert!(listeners.is_empty());
        assert_eq!(controller.state(), InteractionState::Idle);

        controller.begin_drag(Point::new(0, 0)).unwrap();
        assert_eq!(listeners.len(), 1);
        drop(controller);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_pointer_events_ignored_when_idle() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        assert!(!controller.pointer_move(Point::new(50, 50)));
        assert_eq!(controller.pointer_up(), None);
        assert_eq!(controller.style(), ViewStyle::from_window(registry.get(id).unwrap()));
    }

    #[test]
    fn test_second_pointer_down_rejected() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(0, 0)).unwrap();
        assert_eq!(
            controller.begin_resize(Point::new(0, 0)),
            Err(GestureError::GestureActive(id, GestureKind::Drag))
        );
        assert_eq!(controller.state().gesture(), Some(GestureKind::Drag));
    }

    #[test]
    fn test_closing_window_refuses_gestures() {
        let (mut registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(0, 0)).unwrap();
        registry.close_window(id);
        controller.close();

        assert!(listeners.is_empty());
        assert_eq!(controller.begin_drag(Point::new(0, 0)), Err(GestureError::WindowClosing(id)));

        let mut late = controller_for(&registry, id, &listeners);
        assert_eq!(late.begin_resize(Point::new(0, 0)), Err(GestureError::WindowClosing(id)));
    }

    #[test]
    fn test_independent_windows_do_not_interfere() {
        let mut registry = WindowRegistry::new();
        let a = registry.open_window("A", "https://a.example");
        let b = registry.open_window("B", "https://b.example");
        let listeners = PointerListeners::new();
        let mut ca = controller_for(&registry, a, &listeners);
        let mut cb = controller_for(&registry, b, &listeners);

        ca.begin_drag(Point::new(0, 0)).unwrap();
        cb.begin_resize(Point::new(0, 0)).unwrap();
        assert_eq!(listeners.listening(), vec![a, b]);

        ca.pointer_move(Point::new(30, 30));
        cb.pointer_move(Point::new(30, 30));
        assert_eq!(ca.style().translate_x, 30);
        assert_eq!(ca.style().width, 900);
        assert_eq!(cb.style().translate_x, 0);
        assert_eq!(cb.style().width, 930);

        ca.pointer_up();
        assert_eq!(listeners.listening(), vec![b]);
    }

    #[test]
    fn test_surface_receives_transient_updates() {
        let (mut registry, id, listeners) = setup();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut controller = controller_for(&registry, id, &listeners)
            .with_surface(Box::new(RecordingSurface(Arc::clone(&recorded))));

        controller.begin_drag(Point::new(0, 0)).unwrap();
        controller.pointer_move(Point::new(5, 7));
        controller.pointer_up();

        controller.begin_resize(Point::new(0, 0)).unwrap();
        controller.pointer_move(Point::new(-10, 20));
        controller.pointer_up();

        registry.update_window_position(id, 107, 105);
        controller.sync_from(registry.get(id).unwrap());

        let recorded = recorded.lock().unwrap();
        assert!(recorded.translates.contains(&(5, 7)));
        assert_eq!(recorded.translates.last(), Some(&(0, 0)));
        assert_eq!(recorded.sizes, vec![(890, 620)]);
        assert_eq!(recorded.geometries.last().map(|g| g.top), Some(107));
    }

    #[test]
    fn test_sync_resets_translation() {
        let (registry, id, listeners) = setup();
        let mut controller = controller_for(&registry, id, &listeners);

        controller.begin_drag(Point::new(0, 0)).unwrap();
        controller.pointer_move(Point::new(80, 80));
        controller.pointer_up();
        assert_eq!(controller.style().translate_x, 80);

        controller.sync_from(registry.get(id).unwrap());
        assert_eq!(controller.style().translate_x, 0);
        assert_eq!(controller.style().translate_y, 0);
    }
}
