//! floatwin IPC Protocol
//!
//! Shared types for daemon-CLI communication over a local TCP socket.
//! Every message is a single line of JSON terminated by `\n`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default address the daemon listens on.
pub const DEFAULT_IPC_ADDR: &str = "127.0.0.1:47821";

/// Largest accepted message, newline included.
pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;

/// Errors produced while framing or parsing IPC messages.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Message of {0} bytes exceeds the IPC size limit")]
    MessageTooLarge(usize),

    #[error("Empty message")]
    EmptyMessage,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which part of a window the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerTarget {
    /// The title bar; starts a drag.
    Header,
    /// The bottom-right grip; starts a resize.
    ResizeHandle,
}

/// Commands that can be sent from the CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Open a new floating window.
    OpenWindow { title: String, url: String },
    /// Open the configured bookmark with this name.
    OpenBookmark { name: String },
    /// Close a window; it is removed after the close delay.
    CloseWindow { id: u64 },
    /// Set a window's top/left.
    MoveWindow { id: u64, top: i32, left: i32 },
    /// Set a window's size (clamped to the minimum).
    ResizeWindow { id: u64, width: i32, height: i32 },

    /// Pointer pressed over a window.
    PointerDown {
        id: u64,
        target: PointerTarget,
        x: i32,
        y: i32,
    },
    /// Pointer moved anywhere on the page.
    PointerMove { x: i32, y: i32 },
    /// Pointer released anywhere on the page.
    PointerUp,

    /// List all windows in creation order.
    QueryWindows,
    /// List configured bookmarks.
    QueryBookmarks,

    /// Reload configuration from file.
    Reload,
    /// Stop the daemon.
    Stop,
}

/// Gesture currently running on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureStatus {
    Idle,
    Dragging,
    Resizing,
}

/// A window as reported to clients: canonical geometry plus what is on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub width: i32,
    pub height: i32,
    pub top: i32,
    pub left: i32,
    pub is_open: bool,
    /// Live drag offset not yet committed to `top`/`left`.
    pub translate_x: i32,
    pub translate_y: i32,
    /// Live size during a resize.
    pub visual_width: i32,
    pub visual_height: i32,
    pub gesture: GestureStatus,
}

/// A named menu entry that opens a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkInfo {
    pub name: String,
    pub title: String,
    pub url: String,
}

/// Responses from the daemon to the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully.
    Ok,
    /// Command failed with an error.
    Error {
        /// Error message describing what went wrong.
        message: String,
    },
    /// A window was opened.
    WindowOpened { id: u64 },
    /// All windows in creation order.
    WindowList { windows: Vec<WindowInfo> },
    /// Configured bookmarks.
    BookmarkList { bookmarks: Vec<BookmarkInfo> },
}

impl IpcResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Serialize a message as one newline-terminated line.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, IpcError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge(line.len()));
    }
    Ok(line)
}

/// Parse one line received from the peer.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, IpcError> {
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge(line.len()));
    }
    let line = line.trim();
    if line.is_empty() {
        return Err(IpcError::EmptyMessage);
    }
    Ok(serde_json::from_str(line)?)
}
