//! floatwin CLI
//!
//! Command-line interface for controlling the floatwin daemon.
//!
//! Commands are sent to the daemon as one line of JSON over a local TCP socket.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use floatwin_ipc::{decode_line, encode_line, IpcCommand, IpcResponse, PointerTarget, DEFAULT_IPC_ADDR};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// How long to wait for the daemon before giving up.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "floatwin-cli")]
#[command(author, version, about = "Control the floatwin window daemon")]
struct Cli {
    /// Daemon address
    #[arg(long, global = true, default_value = DEFAULT_IPC_ADDR)]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a floating window
    Open {
        /// Window title
        title: String,
        /// Page to embed
        url: String,
    },
    /// Open a configured bookmark by name
    Bookmark { name: String },
    /// Close a window
    Close { id: u64 },
    /// Move a window
    Move {
        id: u64,
        #[arg(allow_hyphen_values = true)]
        top: i32,
        #[arg(allow_hyphen_values = true)]
        left: i32,
    },
    /// Resize a window (clamped to the minimum size)
    Resize { id: u64, width: i32, height: i32 },
    /// Send raw pointer events
    Pointer {
        #[command(subcommand)]
        action: PointerAction,
    },
    /// List windows
    List,
    /// List configured bookmarks
    Bookmarks,
    /// Reload configuration
    Reload,
    /// Stop the daemon
    Stop,
}

#[derive(Subcommand)]
enum PointerAction {
    /// Press the pointer over a window
    Down {
        id: u64,
        #[arg(value_enum)]
        target: Target,
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
    },
    /// Move the pointer
    Move {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
    },
    /// Release the pointer
    Up,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    /// Title bar (drag)
    Header,
    /// Bottom-right grip (resize)
    Handle,
}

impl From<Target> for PointerTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Header => PointerTarget::Header,
            Target::Handle => PointerTarget::ResizeHandle,
        }
    }
}

impl From<Commands> for IpcCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Open { title, url } => IpcCommand::OpenWindow { title, url },
            Commands::Bookmark { name } => IpcCommand::OpenBookmark { name },
            Commands::Close { id } => IpcCommand::CloseWindow { id },
            Commands::Move { id, top, left } => IpcCommand::MoveWindow { id, top, left },
            Commands::Resize { id, width, height } => IpcCommand::ResizeWindow { id, width, height },
            Commands::Pointer { action } => match action {
                PointerAction::Down { id, target, x, y } => IpcCommand::PointerDown {
                    id,
                    target: target.into(),
                    x,
                    y,
                },
                PointerAction::Move { x, y } => IpcCommand::PointerMove { x, y },
                PointerAction::Up => IpcCommand::PointerUp,
            },
            Commands::List => IpcCommand::QueryWindows,
            Commands::Bookmarks => IpcCommand::QueryBookmarks,
            Commands::Reload => IpcCommand::Reload,
            Commands::Stop => IpcCommand::Stop,
        }
    }
}

/// Send one command and wait for the daemon's single-line reply.
async fn send_command(addr: &str, cmd: &IpcCommand) -> Result<IpcResponse> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to daemon at {} (is it running?)", addr))?;
    let (reader, mut writer) = stream.into_split();

    let line = encode_line(cmd)?;
    writer.write_all(line.as_bytes()).await?;

    let mut reply = String::new();
    let read = tokio::time::timeout(RESPONSE_TIMEOUT, BufReader::new(reader).read_line(&mut reply))
        .await
        .context("Timed out waiting for daemon response")??;
    if read == 0 {
        bail!("Daemon closed the connection without responding");
    }

    Ok(decode_line(&reply)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = IpcCommand::from(cli.command);

    let response = send_command(&cli.addr, &cmd).await?;
    match response {
        IpcResponse::Ok => println!("ok"),
        IpcResponse::WindowOpened { id } => println!("{}", id),
        IpcResponse::Error { message } => bail!("Daemon error: {}", message),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }

    Ok(())
}
