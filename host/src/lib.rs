//! # Host Peer Library
//!
//! The authoritative half of the two-player tethered platformer. The
//! host owns the only real physics simulation: both player bodies, the
//! chain of spring-linked segments forming the elastic tether, and the
//! coin pickups. Each tick it folds in its own input plus the latest
//! input forwarded by the client, advances the solver one step, and
//! streams a snapshot of every body position back over the wire.
//!
//! ## Module Organization
//!
//! - [`physics`]: rigid bodies, damped spring constraints, and the
//!   solver step. Bodies carry only authoritative numeric state; any
//!   visual proxy is owned by the rendering layer and looked up by
//!   handle.
//! - [`game`]: the tethered world itself. Player creation from trait
//!   config, tether construction, input application with the near-rest
//!   jump check, pickup collection and snapshot sampling.
//! - [`network`]: the transport adapter (one reliable ordered peer
//!   connection, last-wins) and the `tokio::select!` tick loop that
//!   drives the simulation.
//!
//! ## Authority Model
//!
//! The client never simulates; it renders an interpolated copy of what
//! the host sends. There is no reconciliation of divergent histories
//! because only one history exists. The price is that everything the
//! client sees is one smoothing window behind the host; the payoff is
//! that the two sides can never disagree.

pub mod game;
pub mod network;
pub mod physics;
