//! floatwin Daemon
//!
//! Main daemon process for floatwin.
//!
//! Responsibilities:
//! - Own the floating window registry and per-window interaction state
//! - Handle IPC commands from the CLI
//! - Remove closed windows once the close delay has elapsed
//! - Publish the window collection to rendering observers

mod config;
mod state;

use anyhow::{Context, Result};
use config::Config;
use floatwin_core::{FloatingWindow, WindowId};
use floatwin_ipc::{decode_line, encode_line, IpcCommand, IpcResponse, MAX_IPC_MESSAGE_SIZE};
use state::AppState;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Events that the daemon event loop processes.
enum DaemonEvent {
    /// An IPC command from a CLI client.
    IpcCommand {
        cmd: IpcCommand,
        responder: oneshot::Sender<IpcResponse>,
    },
    /// The close delay for a window has elapsed.
    RemoveWindow { id: WindowId },
    /// Shutdown signal.
    Shutdown,
}

/// IPC read timeout - clients must send within this period.
const IPC_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Fallback response when a response cannot be serialized.
const SERIALIZATION_ERROR_LINE: &str =
    "{\"status\":\"error\",\"message\":\"Internal serialization error\"}\n";

/// Post a `RemoveWindow` event once `delay` has elapsed.
///
/// The timer is not cancelled; removing an id that is already gone is a no-op.
fn schedule_removal(
    event_tx: mpsc::Sender<DaemonEvent>,
    id: WindowId,
    delay: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = event_tx.send(DaemonEvent::RemoveWindow { id }).await;
    })
}

/// Run the event loop until shutdown. All state mutation happens here.
async fn run_event_loop(
    mut state: AppState,
    event_tx: mpsc::Sender<DaemonEvent>,
    mut event_rx: mpsc::Receiver<DaemonEvent>,
) -> AppState {
    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::IpcCommand { cmd, responder } => {
                let response = state.handle_command(cmd);

                let delay = state.close_delay();
                for id in state.take_pending_removals() {
                    schedule_removal(event_tx.clone(), id, delay);
                }

                // Log if client disconnected before receiving response
                if responder.send(response).is_err() {
                    debug!("Client disconnected before receiving IPC response");
                }
            }
            DaemonEvent::RemoveWindow { id } => {
                state.remove_window(id);
            }
            DaemonEvent::Shutdown => {
                info!("Shutting down event loop");
                break;
            }
        }
    }
    state
}

/// Log each republished collection, standing in for a renderer.
fn spawn_render_observer(mut rx: watch::Receiver<Vec<FloatingWindow>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let windows = rx.borrow_and_update().clone();
            let closing = windows.iter().filter(|w| !w.is_open).count();
            debug!(
                "Window collection updated: {} window(s), {} closing",
                windows.len(),
                closing
            );
        }
    })
}

/// Run the IPC server, accepting connections and dispatching commands.
async fn run_ipc_server(listener: TcpListener, event_tx: mpsc::Sender<DaemonEvent>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept client connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        debug!("Client connected from {}", peer);

        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, event_tx).await {
                warn!("Client handler error: {}", e);
            }
        });
    }
}

fn response_line(response: &IpcResponse) -> String {
    match encode_line(response) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize IPC response: {}", e);
            SERIALIZATION_ERROR_LINE.to_string()
        }
    }
}

/// Handle a single client connection.
async fn handle_client(stream: TcpStream, event_tx: mpsc::Sender<DaemonEvent>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let limited_reader = reader.take(MAX_IPC_MESSAGE_SIZE as u64);
    let mut reader = BufReader::new(limited_reader);
    let mut line = String::new();

    // Read command (single line of JSON) with timeout and size bound
    let read_result = tokio::time::timeout(IPC_READ_TIMEOUT, reader.read_line(&mut line)).await;
    let bytes_read = match read_result {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            // Timeout: client did not send in time, silently close
            return Ok(());
        }
    };
    if bytes_read == 0 {
        return Ok(()); // Client disconnected
    }

    debug!("Received command: {}", line.trim());

    let cmd: IpcCommand = match decode_line(&line) {
        Ok(cmd) => cmd,
        Err(e) => {
            let response = IpcResponse::error(format!("Invalid command: {}", e));
            writer.write_all(response_line(&response).as_bytes()).await?;
            return Ok(());
        }
    };

    let is_stop = matches!(cmd, IpcCommand::Stop);

    let (resp_tx, resp_rx) = oneshot::channel();

    if event_tx
        .send(DaemonEvent::IpcCommand {
            cmd,
            responder: resp_tx,
        })
        .await
        .is_err()
    {
        let response = IpcResponse::error("Daemon is shutting down");
        writer.write_all(response_line(&response).as_bytes()).await?;
        return Ok(());
    }

    let response = match resp_rx.await {
        Ok(resp) => resp,
        Err(_) => IpcResponse::error("Failed to get response from daemon"),
    };

    writer.write_all(response_line(&response).as_bytes()).await?;

    // If this was a stop command, signal shutdown
    if is_stop {
        let _ = event_tx.send(DaemonEvent::Shutdown).await;
    }

    Ok(())
}

/// Build the log filter: `RUST_LOG` wins over the configured level.
fn log_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.behavior.log_level.to_lowercase()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });

    // Validate and clamp config values
    let config_warnings = config.validate();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(&config))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("floatwin daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: default window {}x{} at ({}, {}), close_delay={}ms, {} bookmarks",
        config.window.default_width,
        config.window.default_height,
        config.window.default_left,
        config.window.default_top,
        config.behavior.close_delay_ms,
        config.bookmarks.len()
    );

    let listener = TcpListener::bind(&config.ipc.addr)
        .await
        .with_context(|| format!("Failed to bind IPC listener on {} (is another daemon running?)", config.ipc.addr))?;
    let local_addr = listener.local_addr()?;

    let state = AppState::new_with_config(config);
    let _observer = spawn_render_observer(state.subscribe());

    let (event_tx, event_rx) = mpsc::channel::<DaemonEvent>(100);

    let ipc_tx = event_tx.clone();
    tokio::spawn(async move {
        run_ipc_server(listener, ipc_tx).await;
    });

    info!("IPC server listening on {}", local_addr);

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    info!("Ready. Use floatwin-cli to send commands.");

    let state = run_event_loop(state, event_tx, event_rx).await;

    info!(
        "floatwin daemon stopped with {} window(s) open",
        state.registry().open_count()
    );
    Ok(())
}
