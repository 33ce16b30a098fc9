//! Integration tests for the host/client session split.
//!
//! These tests validate cross-crate interactions and real loopback
//! transport behavior: input messages driving the authoritative
//! simulation, snapshots driving client-side convergence, and the
//! protocol's tolerance of malformed traffic.

use client::game::ClientView;
use client::network::{ClientSession, SessionEvent as ClientEvent};
use host::game::{CoinLedger, PlayerSlot, RewardSink, TetherGame};
use host::network::{HostSession, SessionEvent as HostEvent};
use shared::{decode, encode, BodyPose, InputState, Message, RopePoint, LERP_FACTOR};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

const DT: f32 = 1.0 / 60.0;

async fn open_pair() -> (HostSession, ClientSession) {
    let host_session = HostSession::bind("127.0.0.1:0").await.unwrap();
    let client_session = ClientSession::connect(host_session.room_id())
        .await
        .unwrap();
    (host_session, client_session)
}

async fn next_host_event(session: &mut HostSession) -> HostEvent {
    timeout(Duration::from_secs(2), session.next_event())
        .await
        .expect("timed out waiting for host event")
        .expect("host event channel closed")
}

async fn next_client_event(session: &mut ClientSession) -> ClientEvent {
    timeout(Duration::from_secs(2), session.next_event())
        .await
        .expect("timed out waiting for client event")
        .expect("client event channel closed")
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// The two message shapes survive a serialization round-trip.
    #[test]
    fn message_roundtrip() {
        let messages = vec![
            Message::Input {
                input: InputState {
                    left: true,
                    right: false,
                    up: false,
                },
            },
            Message::Snapshot {
                p1: BodyPose {
                    x: 100.0,
                    y: 100.0,
                    angle: 0.0,
                },
                p2: BodyPose {
                    x: 200.0,
                    y: 100.0,
                    angle: 0.1,
                },
                rope: vec![RopePoint { x: 150.0, y: 110.0 }],
            },
        ];

        for message in messages {
            let payload = encode(&message).unwrap();
            assert_eq!(decode(&payload).unwrap(), message);
        }
    }

    /// A malformed frame is dropped; the next valid message still
    /// arrives on the event channel.
    #[tokio::test]
    async fn malformed_frame_is_dropped() {
        let mut host_session = HostSession::bind("127.0.0.1:0").await.unwrap();
        let mut raw = TcpStream::connect(host_session.room_id()).await.unwrap();

        match next_host_event(&mut host_session).await {
            HostEvent::Connected { .. } => {}
            other => panic!("Unexpected event: {:?}", other),
        }

        // Garbage that frames correctly but does not decode.
        let garbage = [0xFFu8; 16];
        raw.write_all(&(garbage.len() as u32).to_le_bytes())
            .await
            .unwrap();
        raw.write_all(&garbage).await.unwrap();

        let valid = Message::Input {
            input: InputState {
                left: false,
                right: true,
                up: false,
            },
        };
        let payload = encode(&valid).unwrap();
        raw.write_all(&(payload.len() as u32).to_le_bytes())
            .await
            .unwrap();
        raw.write_all(&payload).await.unwrap();

        match next_host_event(&mut host_session).await {
            HostEvent::Data(message) => assert_eq!(message, valid),
            other => panic!("Unexpected event: {:?}", other),
        }
    }
}

/// CLIENT INPUT → HOST SIMULATION
mod input_path_tests {
    use super::*;

    /// An input message sent by the client produces the corresponding
    /// velocity on the host's player body on the next tick.
    #[tokio::test]
    async fn client_input_drives_host_player() {
        let (mut host_session, mut client_session) = open_pair().await;

        match next_host_event(&mut host_session).await {
            HostEvent::Connected { .. } => {}
            other => panic!("Unexpected event: {:?}", other),
        }

        client_session
            .send(&Message::Input {
                input: InputState {
                    left: true,
                    right: false,
                    up: false,
                },
            })
            .await;

        let remote_input = match next_host_event(&mut host_session).await {
            HostEvent::Data(Message::Input { input }) => input,
            other => panic!("Unexpected event: {:?}", other),
        };

        let mut game = TetherGame::new(None, None);
        game.apply_input(PlayerSlot::Two, &remote_input);
        game.step(DT);

        assert!(
            game.player_velocity(PlayerSlot::Two).x < 0.0,
            "left input must produce negative horizontal velocity"
        );
        assert!(
            game.player_velocity(PlayerSlot::One).x.abs() < 10.0,
            "the other player sees only tether forces, not the input"
        );
    }
}

/// HOST SNAPSHOT → CLIENT RECONSTRUCTION
mod snapshot_path_tests {
    use super::*;

    /// Snapshots streamed over the wire converge the client view onto
    /// the host's authoritative positions.
    #[tokio::test]
    async fn snapshot_stream_converges_client_view() {
        let (mut host_session, mut client_session) = open_pair().await;

        match next_host_event(&mut host_session).await {
            HostEvent::Connected { .. } => {}
            other => panic!("Unexpected event: {:?}", other),
        }

        let mut game = TetherGame::new(None, None);
        let mut ledger = CoinLedger::new();
        let mut view = ClientView::new();

        // A few host ticks, each snapshot relayed to the client.
        for _ in 0..5 {
            game.step(DT);
            game.collect_pickups(&mut ledger);
            host_session.send(&game.snapshot()).await;

            match next_client_event(&mut client_session).await {
                ClientEvent::Data(Message::Snapshot { p1, p2, rope }) => {
                    view.apply_snapshot(p1, p2, rope);
                }
                other => panic!("Unexpected event: {:?}", other),
            }
            view.reconcile();
        }

        // Free-run the reconciler; it must close in on the last target.
        let target = game.player_pose(PlayerSlot::One);
        for _ in 0..100 {
            view.reconcile();
        }

        let dx = (view.player1.x - target.x).abs();
        let dy = (view.player1.y - target.y).abs();
        assert!(dx < 0.1 && dy < 0.1, "view still ({}, {}) away", dx, dy);

        // The rope arrived verbatim, not smoothed.
        assert_eq!(view.rope_points().len(), shared::ROPE_SEGMENTS);
    }

    /// Rendering player one at the origin, a snapshot at (100, 100)
    /// moves it 20% of the way in one reconciliation tick.
    #[test]
    fn reference_smoothing_scenario() {
        let mut view = ClientView::with_smoothing(LERP_FACTOR);
        view.player1 = BodyPose {
            x: 0.0,
            y: 0.0,
            angle: 0.0,
        };

        view.apply_snapshot(
            BodyPose {
                x: 100.0,
                y: 100.0,
                angle: 0.0,
            },
            BodyPose {
                x: 200.0,
                y: 100.0,
                angle: 0.0,
            },
            vec![RopePoint { x: 150.0, y: 110.0 }],
        );
        view.reconcile();

        assert!((view.player1.x - 20.0).abs() < 1e-4);
        assert!((view.player1.y - 20.0).abs() < 1e-4);
        assert!(view.player1.angle.abs() < 1e-4);
    }
}

/// SESSION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// A second inbound connection replaces the first (last-wins).
    #[tokio::test]
    async fn replacement_connection_takes_over() {
        let mut host_session = HostSession::bind("127.0.0.1:0").await.unwrap();
        let first = ClientSession::connect(host_session.room_id()).await.unwrap();
        let mut second = ClientSession::connect(host_session.room_id())
            .await
            .unwrap();

        let mut latest_generation = 0;
        for _ in 0..2 {
            if let HostEvent::Connected { generation, .. } =
                next_host_event(&mut host_session).await
            {
                latest_generation = latest_generation.max(generation);
            }
        }
        assert_eq!(latest_generation, 2);
        drop(first);

        // Snapshots now reach the replacement peer.
        let game = TetherGame::new(None, None);
        host_session.send(&game.snapshot()).await;

        match next_client_event(&mut second).await {
            ClientEvent::Data(Message::Snapshot { .. }) => {}
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    /// A dead host leaves the client free-running, not crashing: sends
    /// become warned no-ops and the view keeps its last state.
    #[tokio::test]
    async fn client_survives_host_teardown() {
        let (host_session, mut client_session) = open_pair().await;
        drop(host_session);

        match next_client_event(&mut client_session).await {
            ClientEvent::Disconnected => {}
            other => panic!("Unexpected event: {:?}", other),
        }

        // Sending after disconnect must not panic.
        client_session
            .send(&Message::Input {
                input: InputState::default(),
            })
            .await;

        let mut view = ClientView::new();
        view.apply_snapshot(
            BodyPose {
                x: 100.0,
                y: 100.0,
                angle: 0.0,
            },
            BodyPose {
                x: 200.0,
                y: 100.0,
                angle: 0.0,
            },
            Vec::new(),
        );
        for _ in 0..50 {
            view.reconcile();
        }
        assert!((view.player1.x - 100.0).abs() < 0.1);
    }
}

/// PICKUP / ECONOMY TESTS
mod pickup_tests {
    use super::*;

    struct CountingSink {
        calls: u32,
        coins: u32,
    }

    impl RewardSink for CountingSink {
        fn add_coins(&mut self, amount: u32) {
            self.calls += 1;
            self.coins += amount;
        }
    }

    /// Running around on the floor, far below the coin row, must never
    /// fire the reward side effect or consume a coin.
    #[test]
    fn no_spurious_rewards_without_contact() {
        let mut game = TetherGame::new(None, None);
        let mut sink = CountingSink { calls: 0, coins: 0 };
        let initial_coins = game.live_coin_count();

        for tick in 0..600 {
            game.apply_input(
                PlayerSlot::Two,
                &InputState {
                    left: tick % 120 >= 60,
                    right: tick % 120 < 60,
                    up: false,
                },
            );
            game.step(DT);
            game.collect_pickups(&mut sink);
        }

        assert_eq!(sink.calls, 0);
        assert_eq!(sink.coins, 0);
        assert_eq!(game.live_coin_count(), initial_coins);
    }
}
