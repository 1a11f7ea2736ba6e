//! Daemon state: the window registry, one interaction controller per
//! window, and the channel that republishes the collection after changes.

use crate::config::Config;
use floatwin_core::{
    FloatingWindow, GestureCommit, GestureError, InteractionController, InteractionState,
    Point, PointerListeners, ViewStyle, WindowId, WindowRegistry, WindowSurface,
};
use floatwin_ipc::{BookmarkInfo, GestureStatus, IpcCommand, IpcResponse, PointerTarget, WindowInfo};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, trace, warn};

/// Errors surfaced to IPC clients.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown bookmark '{0}'")]
    UnknownBookmark(String),

    #[error(transparent)]
    Gesture(#[from] GestureError),

    #[error("Failed to reload config: {0}")]
    Reload(String),
}

/// Surface for a headless daemon: records nothing, traces what a
/// renderer would apply.
struct TracingSurface {
    window_id: WindowId,
}

impl WindowSurface for TracingSurface {
    fn set_translate(&mut self, x: i32, y: i32) {
        trace!("window {} translate({}px, {}px)", self.window_id, x, y);
    }

    fn set_size(&mut self, width: i32, height: i32) {
        trace!("window {} size {}x{}", self.window_id, width, height);
    }

    fn set_geometry(&mut self, style: &ViewStyle) {
        trace!(
            "window {} geometry {}x{} at top={} left={}",
            self.window_id,
            style.width,
            style.height,
            style.top,
            style.left
        );
    }
}

/// Everything the event loop owns.
pub struct AppState {
    registry: WindowRegistry,
    controllers: HashMap<WindowId, InteractionController>,
    listeners: PointerListeners,
    config: Config,
    publisher: watch::Sender<Vec<FloatingWindow>>,
    published_revision: u64,
    /// Windows marked closing whose removal timer has not been scheduled yet.
    pending_removals: Vec<WindowId>,
}

impl AppState {
    /// Create state from a validated config.
    pub fn new_with_config(config: Config) -> Self {
        let (publisher, _) = watch::channel(Vec::new());
        Self {
            registry: WindowRegistry::with_defaults(config.window_defaults()),
            controllers: HashMap::new(),
            listeners: PointerListeners::new(),
            config,
            publisher,
            published_revision: 0,
            pending_removals: Vec::new(),
        }
    }

    /// Observe the ordered window collection; updated after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<FloatingWindow>> {
        self.publisher.subscribe()
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    /// How long a closing window stays in the collection.
    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.config.behavior.close_delay_ms)
    }

    /// Windows that were just marked closing; the caller schedules their removal.
    pub fn take_pending_removals(&mut self) -> Vec<WindowId> {
        std::mem::take(&mut self.pending_removals)
    }

    /// Apply configuration; new defaults affect windows opened afterwards.
    ///
    /// The IPC address is bound once at startup and is kept as is.
    pub fn apply_config(&mut self, mut config: Config) {
        if config.ipc.addr != self.config.ipc.addr {
            warn!(
                "ipc.addr changed to {} but the daemon stays on {} until restart",
                config.ipc.addr, self.config.ipc.addr
            );
            config.ipc.addr = self.config.ipc.addr.clone();
        }
        let defaults = config.window_defaults();
        self.registry.set_defaults(defaults);
        for controller in self.controllers.values_mut() {
            controller.set_min_size(defaults.min_width, defaults.min_height);
        }
        self.config = config;
        info!(
            "Configuration applied: default {}x{}, close delay {}ms, {} bookmarks",
            defaults.width,
            defaults.height,
            self.config.behavior.close_delay_ms,
            self.config.bookmarks.len()
        );
    }

    /// Handle an IPC command and republish the collection if it changed.
    pub fn handle_command(&mut self, cmd: IpcCommand) -> IpcResponse {
        let response = match self.dispatch(cmd) {
            Ok(response) => response,
            Err(e) => {
                warn!("Command failed: {}", e);
                IpcResponse::error(e.to_string())
            }
        };
        self.publish();
        response
    }

    fn dispatch(&mut self, cmd: IpcCommand) -> Result<IpcResponse, CommandError> {
        match cmd {
            IpcCommand::OpenWindow { title, url } => {
                let id = self.open_window(title, url);
                Ok(IpcResponse::WindowOpened { id })
            }
            IpcCommand::OpenBookmark { name } => {
                let bookmark = self
                    .config
                    .bookmark(&name)
                    .cloned()
                    .ok_or(CommandError::UnknownBookmark(name))?;
                let id = self.open_window(bookmark.title, bookmark.url);
                Ok(IpcResponse::WindowOpened { id })
            }
            IpcCommand::CloseWindow { id } => {
                self.close_window(id);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::MoveWindow { id, top, left } => {
                if self.registry.update_window_position(id, top, left) {
                    self.resync(id);
                }
                Ok(IpcResponse::Ok)
            }
            IpcCommand::ResizeWindow { id, width, height } => {
                if self.registry.update_window_size(id, width, height) {
                    self.resync(id);
                }
                Ok(IpcResponse::Ok)
            }
            IpcCommand::PointerDown { id, target, x, y } => {
                self.pointer_down(id, target, Point::new(x, y))?;
                Ok(IpcResponse::Ok)
            }
            IpcCommand::PointerMove { x, y } => {
                self.pointer_move(Point::new(x, y));
                Ok(IpcResponse::Ok)
            }
            IpcCommand::PointerUp => {
                self.pointer_up();
                Ok(IpcResponse::Ok)
            }
            IpcCommand::QueryWindows => Ok(IpcResponse::WindowList {
                windows: self.window_infos(),
            }),
            IpcCommand::QueryBookmarks => Ok(IpcResponse::BookmarkList {
                bookmarks: self.config.bookmarks.iter().map(BookmarkInfo::from).collect(),
            }),
            IpcCommand::Reload => {
                let mut config =
                    Config::load().map_err(|e| CommandError::Reload(format!("{:#}", e)))?;
                for w in config.validate() {
                    warn!("Config: {} - {}", w.field, w.message);
                }
                self.apply_config(config);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::Stop => {
                info!("Stop requested");
                Ok(IpcResponse::Ok)
            }
        }
    }

    /// Open a window and attach its interaction controller.
    pub fn open_window(&mut self, title: String, url: String) -> WindowId {
        let id = self.registry.open_window(title, url);
        if let Some(window) = self.registry.get(id) {
            let controller = InteractionController::new(
                window,
                &self.registry.defaults(),
                self.listeners.clone(),
            )
            .with_surface(Box::new(TracingSurface { window_id: id }));
            info!("Opened window {} '{}' -> {}", id, window.title, window.url);
            self.controllers.insert(id, controller);
        }
        id
    }

    /// Mark a window closing and queue its removal. Unknown ids are ignored.
    pub fn close_window(&mut self, id: WindowId) {
        if !self.registry.close_window(id) {
            return;
        }
        if let Some(controller) = self.controllers.get_mut(&id) {
            controller.close();
        }
        self.pending_removals.push(id);
        info!("Closing window {}", id);
    }

    /// Drop a window once its close delay has elapsed. Unknown ids are ignored.
    pub fn remove_window(&mut self, id: WindowId) {
        if self.registry.remove_window(id).is_some() {
            self.controllers.remove(&id);
            info!("Removed window {}", id);
        }
        self.publish();
    }

    fn pointer_down(&mut self, id: WindowId, target: PointerTarget, pointer: Point) -> Result<(), GestureError> {
        // No view for this id: nothing to interact with.
        let Some(controller) = self.controllers.get_mut(&id) else {
            return Ok(());
        };
        match target {
            PointerTarget::Header => controller.begin_drag(pointer)?,
            PointerTarget::ResizeHandle => controller.begin_resize(pointer)?,
        }
        trace!("Window {} gesture started: {:?}", id, controller.state());
        Ok(())
    }

    fn pointer_move(&mut self, pointer: Point) {
        for id in self.listeners.listening() {
            if let Some(controller) = self.controllers.get_mut(&id) {
                controller.pointer_move(pointer);
            }
        }
    }

    fn pointer_up(&mut self) {
        for id in self.listeners.listening() {
            let commit = self
                .controllers
                .get_mut(&id)
                .and_then(|controller| controller.pointer_up());
            match commit {
                Some(GestureCommit::Position { top, left }) => {
                    self.registry.update_window_position(id, top, left);
                    info!("Window {} moved to top={} left={}", id, top, left);
                }
                Some(GestureCommit::Size { width, height }) => {
                    self.registry.update_window_size(id, width, height);
                    info!("Window {} resized to {}x{}", id, width, height);
                }
                None => {}
            }
            self.resync(id);
        }
    }

    /// Push canonical geometry to an idle controller.
    fn resync(&mut self, id: WindowId) {
        if let (Some(window), Some(controller)) = (self.registry.get(id), self.controllers.get_mut(&id)) {
            if !controller.is_active() {
                controller.sync_from(window);
            }
        }
    }

    fn window_infos(&self) -> Vec<WindowInfo> {
        self.registry
            .windows()
            .iter()
            .map(|window| {
                let (style, state) = match self.controllers.get(&window.id) {
                    Some(controller) => (controller.style(), controller.state()),
                    None => (ViewStyle::from_window(window), InteractionState::Idle),
                };
                WindowInfo {
                    id: window.id,
                    title: window.title.clone(),
                    url: window.url.clone(),
                    width: window.width,
                    height: window.height,
                    top: window.top,
                    left: window.left,
                    is_open: window.is_open,
                    translate_x: style.translate_x,
                    translate_y: style.translate_y,
                    visual_width: style.width,
                    visual_height: style.height,
                    gesture: gesture_status(state),
                }
            })
            .collect()
    }

    fn publish(&mut self) {
        let revision = self.registry.revision();
        if revision != self.published_revision {
            self.published_revision = revision;
            self.publisher.send_replace(self.registry.windows().to_vec());
        }
    }
}

fn gesture_status(state: InteractionState) -> GestureStatus {
    match state {
        InteractionState::Idle => GestureStatus::Idle,
        InteractionState::Dragging { .. } => GestureStatus::Dragging,
        InteractionState::Resizing { .. } => GestureStatus::Resizing,
    }
}
