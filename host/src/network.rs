//! Host-side transport adapter and the authoritative tick loop.
//!
//! Wraps the reliable ordered channel (a TCP stream with length-prefixed
//! bincode frames) behind an explicit event channel, so the simulation
//! only ever sees `SessionEvent`s. Exactly one peer connection is
//! tracked; a new inbound connection replaces the previous one.

use crate::game::{PlayerSlot, RewardSink, TetherGame};
use log::{debug, error, info, warn};
use shared::{decode, encode, InputSource, InputState, Message, Role};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// Frames larger than this are treated as a malformed stream.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Hard cap on the simulation delta, so a stalled host process cannot
/// feed the solver a destabilizing step.
const MAX_DELTA_TIME: f32 = 1.0 / 20.0;

/// Events surfaced by the transport to the session loop.
///
/// The generation counter ties connection lifecycle events to a
/// specific accepted connection: when a replaced connection's reader
/// finally hits EOF, its stale `Disconnected` must not mark the fresh
/// connection closed.
#[derive(Debug)]
pub enum SessionEvent {
    Connected { peer: SocketAddr, generation: u64 },
    Disconnected { generation: u64 },
    Data(Message),
    Error(String),
}

/// The host's half of the peer session: room identifier, the single
/// tracked connection, and the event channel feeding the tick loop.
pub struct HostSession {
    room_id: String,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    tasks: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
    current_generation: u64,
    is_open: bool,
}

impl HostSession {
    /// Opens the room: binds the listener and starts accepting.
    ///
    /// The room identifier (the bound address) is shared out-of-band
    /// with the joining peer. Idempotent in effect: the room stays open
    /// until the session is dropped.
    pub async fn bind(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let room_id = listener.local_addr()?.to_string();
        info!("Room open, identifier: {}", room_id);

        let (event_tx, events) = mpsc::unbounded_channel();
        let writer = Arc::new(Mutex::new(None));
        let tasks = Arc::new(std::sync::Mutex::new(Vec::new()));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            event_tx,
            Arc::clone(&writer),
            Arc::clone(&tasks),
        ));
        tasks.lock().expect("task list poisoned").push(accept_task);

        Ok(HostSession {
            room_id,
            writer,
            events,
            tasks,
            current_generation: 0,
            is_open: false,
        })
    }

    pub fn role(&self) -> Role {
        Role::Host
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Waits for the next transport event. `run` consumes these
    /// internally; tests and embedders can drive the session manually.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Sends a message to the connected peer.
    ///
    /// A send with no open connection is a warning and a no-op, never
    /// an error: the tick loop must keep running regardless.
    pub async fn send(&self, message: &Message) {
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode message: {}", e);
                return;
            }
        };

        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            warn!("No open connection to send to");
            return;
        };

        if let Err(e) = write_frame(writer, &payload).await {
            error!("Failed to send to peer: {}", e);
            *guard = None;
        }
    }

    /// Runs the authoritative loop: apply local + latest remote input,
    /// advance the solver, collect pickups, broadcast the snapshot.
    ///
    /// Network receipt only mutates the remote-input buffer; the tick
    /// always reads the latest value and never waits for a message.
    pub async fn run(
        &mut self,
        game: &mut TetherGame,
        input: &mut dyn InputSource,
        sink: &mut dyn RewardSink,
        tick_rate: u32,
    ) {
        let mut tick = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Remote player is neutral until the first input message lands.
        let mut remote_input = InputState::default();
        let mut last_tick = Instant::now();

        // The first tick fires immediately.
        tick.tick().await;

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(SessionEvent::Connected { peer, generation }) => {
                            info!("Peer {} joined the room", peer);
                            self.current_generation = generation;
                            self.is_open = true;
                        }
                        Some(SessionEvent::Disconnected { generation }) => {
                            if generation == self.current_generation {
                                info!("Peer disconnected");
                                self.is_open = false;
                                remote_input = InputState::default();
                            }
                        }
                        Some(SessionEvent::Data(Message::Input { input })) => {
                            remote_input = input;
                        }
                        Some(SessionEvent::Data(Message::Snapshot { .. })) => {
                            warn!("Host received a snapshot message, dropping it");
                        }
                        Some(SessionEvent::Error(message)) => {
                            error!("Transport error: {}", message);
                        }
                        None => {
                            info!("Transport channel closed, stopping session");
                            break;
                        }
                    }
                }

                _ = tick.tick() => {
                    let now = Instant::now();
                    let mut dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    if dt > MAX_DELTA_TIME {
                        debug!("Large delta time {:.3}s, capping", dt);
                        dt = MAX_DELTA_TIME;
                    }

                    let local_input = input.sample();
                    game.apply_input(PlayerSlot::One, &local_input);
                    game.apply_input(PlayerSlot::Two, &remote_input);
                    game.step(dt);
                    game.collect_pickups(sink);

                    let snapshot = game.snapshot();
                    self.send(&snapshot).await;
                }
            }
        }
    }
}

impl Drop for HostSession {
    fn drop(&mut self) {
        // Tear down all transport tasks so no callback can fire against
        // a simulation that no longer exists.
        for task in self.tasks.lock().expect("task list poisoned").drain(..) {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    tasks: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
) {
    let generation = AtomicU64::new(0);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY: {}", e);
                }
                let generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
                let (read_half, write_half) = stream.into_split();

                // Last connection wins: replace whatever we tracked.
                {
                    let mut guard = writer.lock().await;
                    if guard.is_some() {
                        info!("Replacing existing peer connection with {}", peer);
                    }
                    *guard = Some(write_half);
                }

                if event_tx
                    .send(SessionEvent::Connected { peer, generation })
                    .is_err()
                {
                    return;
                }

                let reader_task =
                    tokio::spawn(read_loop(read_half, event_tx.clone(), generation));
                tasks.lock().expect("task list poisoned").push(reader_task);
            }
            Err(e) => {
                let _ = event_tx.send(SessionEvent::Error(format!(
                    "Failed to accept connection: {}",
                    e
                )));
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    generation: u64,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(payload) => match decode(&payload) {
                Ok(message) => {
                    if event_tx.send(SessionEvent::Data(message)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // Malformed payloads are dropped, never fatal.
                    warn!("Dropping undecodable frame: {}", e);
                }
            },
            Err(e) => {
                debug!("Read loop ended: {}", e);
                let _ = event_tx.send(SessionEvent::Disconnected { generation });
                return;
            }
        }
    }
}

pub(crate) async fn write_frame(
    writer: &mut OwnedWriteHalf,
    payload: &[u8],
) -> std::io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await
}

pub(crate) async fn read_frame(reader: &mut OwnedReadHalf) -> std::io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
