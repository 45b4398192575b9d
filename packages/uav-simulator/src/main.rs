//! main.rs — UAV simulator entry point
//!
//! Dials the backend's duplex channel and runs two logical activities on a
//! single task:
//!   1. Physics ticker at 20 Hz: integrates state and emits a state update
//!   2. Inbound consumer: each command yields exactly one command response
//!
//! Running both through one `select!` loop serialises every UAVState
//! mutation and guarantees a command response is sent before the next state
//! update that reflects the command. Channel loss tears the session down;
//! the connect loop retries forever at a fixed 3-second cadence. UAV state
//! is created once at startup and survives reconnects, but each fresh
//! session restarts the clock (no catch-up integration of the gap).

mod uav;

use std::time::{Duration, Instant};

use clap::Parser;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use uav_types::{ChannelMessage, Vec3};

use uav::Uav;

/// Physics/telemetry cadence (20 Hz).
const TICK_INTERVAL: Duration = Duration::from_millis(50);
/// Fixed delay between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "uav-sim", about = "Hornet fleet UAV physics simulator")]
struct Args {
    /// UAV identity; overrides the UAV_ID environment variable
    #[arg(long)]
    uav_id: Option<String>,
    /// Channel endpoint; overrides the BACKEND_URL environment variable
    #[arg(long)]
    backend_url: Option<String>,
}

/// Fixed spawn positions for the twelve Hornet airframes; unknown ids start
/// at the origin.
fn initial_position(uav_id: &str) -> Vec3 {
    match uav_id {
        "HORNET-1" => Vec3::new(0.0, 0.0, 0.0),
        "HORNET-2" => Vec3::new(20.0, 20.0, 0.0),
        "HORNET-3" => Vec3::new(40.0, 0.0, 0.0),
        "HORNET-4" => Vec3::new(20.0, -20.0, 0.0),
        "HORNET-5" => Vec3::new(-20.0, -20.0, 0.0),
        "HORNET-6" => Vec3::new(-20.0, 20.0, 0.0),
        "HORNET-7" => Vec3::new(-100.0, 100.0, 0.0),
        "HORNET-8" => Vec3::new(-80.0, 120.0, 0.0),
        "HORNET-9" => Vec3::new(-60.0, 100.0, 0.0),
        "HORNET-10" => Vec3::new(-80.0, 80.0, 0.0),
        "HORNET-11" => Vec3::new(-120.0, 80.0, 0.0),
        "HORNET-12" => Vec3::new(-120.0, 120.0, 0.0),
        _ => Vec3::zero(),
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uav_simulator=info".into()),
        )
        .init();

    let args = Args::parse();
    let uav_id = args
        .uav_id
        .or_else(|| std::env::var("UAV_ID").ok())
        .unwrap_or_else(|| "UAV-1".to_string());
    let backend_url = args
        .backend_url
        .or_else(|| std::env::var("BACKEND_URL").ok())
        .unwrap_or_else(|| format!("ws://backend:3001/ws/simulator?id={uav_id}"));

    let spawn = initial_position(&uav_id);
    info!("🛩 UAV simulator starting for {uav_id} at ({}, {}, {})", spawn.x, spawn.y, spawn.z);

    let mut uav = Uav::new(uav_id, spawn);

    loop {
        info!("Connecting to backend at {backend_url}...");
        match connect_async(backend_url.as_str()).await {
            Ok((socket, _)) => {
                info!("Connected to backend");
                run_session(socket, &mut uav).await;
                warn!("Channel closed");
            }
            Err(e) => warn!("Connection error: {e}"),
        }
        info!("Retrying in {}s...", RECONNECT_DELAY.as_secs());
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

// ── Session loop ──────────────────────────────────────────────────────────────

/// One connected session: tick physics at 20 Hz and answer inbound commands
/// until the channel drops.
async fn run_session(socket: WsStream, uav: &mut Uav) {
    let (mut tx, mut rx) = socket.split();
    let mut ticker = interval(TICK_INTERVAL);
    let mut last_update = Instant::now();

    info!("Physics simulation started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_update).as_secs_f64();
                last_update = now;
                uav.update_physics(dt);
                if send(&mut tx, &uav.state_update()).await.is_err() {
                    break;
                }
            }
            inbound = rx.next() => match inbound {
                Some(Ok(Message::Text(raw))) => {
                    if let Some(response) = dispatch(uav, &raw) {
                        if send(&mut tx, &response).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}   // ping/pong handled by the transport
                Some(Err(e)) => {
                    warn!("Channel receive error: {e}");
                    break;
                }
            },
        }
    }
}

/// Parse one inbound frame. Commands yield exactly one response; any other
/// well-formed frame is dropped, malformed frames are logged and dropped.
fn dispatch(uav: &mut Uav, raw: &str) -> Option<ChannelMessage> {
    match serde_json::from_str::<ChannelMessage>(raw) {
        Ok(ChannelMessage::Command { command, params }) => {
            info!("Received command: {command}");
            Some(uav.handle_command(&command, &params))
        }
        Ok(_) => None,
        Err(e) => {
            debug!("Ignoring malformed message: {e}");
            None
        }
    }
}

async fn send(
    tx: &mut WsSink,
    msg: &ChannelMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let payload = match serde_json::to_string(msg) {
        Ok(p) => p,
        Err(e) => {
            warn!("Serialize failed: {e}");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload)).await
}
