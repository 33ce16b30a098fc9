//! # Client Peer Library
//!
//! The render-side half of the two-player tethered platformer. The
//! client runs no physics at all: it forwards its local input to the
//! host every tick and rebuilds a smooth view of the world from the
//! host's snapshots.
//!
//! ## Module Organization
//!
//! - [`game`]: the state reconciler. Holds the last received snapshot
//!   as an interpolation target and eases the rendered player poses
//!   toward it with exponential smoothing; the rope polyline is snapped
//!   to the latest snapshot and re-threaded through the rendered player
//!   positions every tick.
//! - [`network`]: the transport adapter for the single connection to
//!   the host and the `tokio::select!` loop interleaving input
//!   forwarding, snapshot receipt and reconciliation.
//!
//! ## Smoothing Model
//!
//! Snapshots supersede each other; there is no buffering, timestamping
//! or reordering. Each render tick closes a fixed fraction of the gap
//! to the latest target, so the view converges exponentially and a
//! late-arriving stale snapshot shows up as a brief visible rewind,
//! an accepted limitation of the sequence-number-free protocol.

pub mod game;
pub mod network;
