//! Client-side transport adapter and render/input loop.
//!
//! Connects to the host's room, forwards the local input every tick
//! regardless of snapshot cadence, and feeds inbound snapshots to the
//! reconciler through an explicit event channel.

use crate::game::ClientView;
use log::{debug, error, info, warn};
use shared::{decode, encode, InputSource, Message, Role};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Events surfaced by the transport to the session loop.
#[derive(Debug)]
pub enum SessionEvent {
    Data(Message),
    Disconnected,
    Error(String),
}

/// The client's half of the peer session: the single connection to the
/// host plus the event channel feeding the render loop.
pub struct ClientSession {
    room_id: String,
    writer: Option<OwnedWriteHalf>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    reader_task: JoinHandle<()>,
    is_open: bool,
}

impl ClientSession {
    /// Joins the room identified by `room_id` (obtained out-of-band
    /// from the hosting player).
    pub async fn connect(room_id: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(room_id).await?;
        stream.set_nodelay(true)?;
        info!("Connected to room {}", room_id);

        let (read_half, write_half) = stream.into_split();
        let (event_tx, events) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(read_half, event_tx));

        Ok(ClientSession {
            room_id: room_id.to_string(),
            writer: Some(write_half),
            events,
            reader_task,
            is_open: true,
        })
    }

    pub fn role(&self) -> Role {
        Role::Client
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

    /// Sends a message to the host; a warning and a no-op when the
    /// connection is gone. There is no reconnection attempt.
    pub async fn send(&mut self, message: &Message) {
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode message: {}", e);
                return;
            }
        };

        let Some(writer) = self.writer.as_mut() else {
            warn!("No open connection to send to");
            return;
        };

        if let Err(e) = write_frame(writer, &payload).await {
            error!("Failed to send to host: {}", e);
            self.writer = None;
            self.is_open = false;
        }
    }

    /// Runs the render-side loop: every tick sample and forward local
    /// input, then ease the view toward the latest snapshot. Input
    /// transmission is decoupled from snapshot arrival; a stalled host
    /// just leaves the view free-running on stale state.
    pub async fn run(
        &mut self,
        view: &mut ClientView,
        input: &mut dyn InputSource,
        tick_rate: u32,
    ) {
        let mut tick = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshots_received: u64 = 0;

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(SessionEvent::Data(Message::Snapshot { p1, p2, rope })) => {
                            snapshots_received += 1;
                            view.apply_snapshot(p1, p2, rope);
                        }
                        Some(SessionEvent::Data(Message::Input { .. })) => {
                            warn!("Client received an input message, dropping it");
                        }
                        Some(SessionEvent::Disconnected) => {
                            info!("Host connection closed, rendering stale state");
                            self.is_open = false;
                            self.writer = None;
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
                    let local_input = input.sample();
                    self.send(&Message::Input { input: local_input }).await;

                    view.reconcile();

                    if snapshots_received > 0 && snapshots_received % 300 == 0 {
                        debug!(
                            "{} snapshots in, p1 at ({:.1}, {:.1})",
                            snapshots_received, view.player1.x, view.player1.y
                        );
                    }
                }
            }
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        // No callback may outlive the session it would mutate.
        self.reader_task.abort();
    }
}

async fn read_loop(mut reader: OwnedReadHalf, event_tx: mpsc::UnboundedSender<SessionEvent>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(payload) => match decode(&payload) {
                Ok(message) => {
                    if event_tx.send(SessionEvent::Data(message)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Dropping undecodable frame: {}", e);
                }
            },
            Err(e) => {
                debug!("Read loop ended: {}", e);
                let _ = event_tx.send(SessionEvent::Disconnected);
                return;
            }
        }
    }
}

async fn write_frame(writer: &mut OwnedWriteHalf, payload: &[u8]) -> std::io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await
}

async fn read_frame(reader: &mut OwnedReadHalf) -> std::io::Result<Vec<u8>> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{BodyPose, InputState, RopePoint};
    use tokio::net::TcpListener;

    async fn host_stub() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let room_id = listener.local_addr().unwrap().to_string();
        (listener, room_id)
    }

    #[tokio::test]
    async fn test_connect_to_missing_room_fails() {
        // Nothing listening on this port.
        let (listener, room_id) = host_stub().await;
        drop(listener);

        assert!(ClientSession::connect(&room_id).await.is_err());
    }

    #[tokio::test]
    async fn test_input_message_reaches_host() {
        let (listener, room_id) = host_stub().await;
        let mut session = ClientSession::connect(&room_id).await.unwrap();
        let (mut host_side, _) = listener.accept().await.unwrap();

        assert!(session.is_open());
        assert_eq!(session.role(), Role::Client);

        let message = Message::Input {
            input: InputState {
                left: true,
                right: false,
                up: true,
            },
        };
        session.send(&message).await;

        let mut len_bytes = [0u8; 4];
        host_side.read_exact(&mut len_bytes).await.unwrap();
        let mut payload = vec![0u8; u32::from_le_bytes(len_bytes) as usize];
        host_side.read_exact(&mut payload).await.unwrap();

        assert_eq!(decode(&payload).unwrap(), message);
    }

    #[tokio::test]
    async fn test_snapshot_reaches_event_channel() {
        let (listener, room_id) = host_stub().await;
        let mut session = ClientSession::connect(&room_id).await.unwrap();
        let (mut host_side, _) = listener.accept().await.unwrap();

        let snapshot = Message::Snapshot {
            p1: BodyPose {
                x: 100.0,
                y: 100.0,
                angle: 0.0,
            },
            p2: BodyPose {
                x: 200.0,
                y: 100.0,
                angle: 0.0,
            },
            rope: vec![RopePoint { x: 150.0, y: 110.0 }],
        };
        let payload = encode(&snapshot).unwrap();
        host_side
            .write_all(&(payload.len() as u32).to_le_bytes())
            .await
            .unwrap();
        host_side.write_all(&payload).await.unwrap();

        match session.events.recv().await.unwrap() {
            SessionEvent::Data(message) => assert_eq!(message, snapshot),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_host_surfaces_disconnect() {
        let (listener, room_id) = host_stub().await;
        let mut session = ClientSession::connect(&room_id).await.unwrap();
        let (host_side, _) = listener.accept().await.unwrap();
        drop(host_side);

        match session.events.recv().await.unwrap() {
            SessionEvent::Disconnected => {}
            other => panic!("Unexpected event: {:?}", other),
        }
    }
}
