//! Client-side state reconciliation.
//!
//! The client never simulates. It keeps the last received snapshot as
//! an interpolation target and eases the rendered player poses toward
//! it by a fixed fraction per render tick; the rope is snapped to the
//! latest snapshot without smoothing. Between snapshots the view
//! free-runs on whatever it last reconstructed.

use shared::{lerp, BodyPose, RopePoint, LERP_FACTOR, PLAYER1_SPAWN, PLAYER2_SPAWN};

/// The rendered reconstruction of the host's world.
///
/// `player1`/`player2` are where the players are drawn this tick; the
/// target is where the host last said they are. The two only meet
/// asymptotically.
pub struct ClientView {
    pub player1: BodyPose,
    pub player2: BodyPose,
    rope: Vec<RopePoint>,
    target: Option<(BodyPose, BodyPose)>,
    lerp_factor: f32,
}

impl ClientView {
    pub fn new() -> Self {
        Self::with_smoothing(LERP_FACTOR)
    }

    pub fn with_smoothing(lerp_factor: f32) -> Self {
        ClientView {
            player1: PLAYER1_SPAWN,
            player2: PLAYER2_SPAWN,
            rope: Vec::new(),
            target: None,
            lerp_factor,
        }
    }

    /// Stores a snapshot as the new interpolation target.
    ///
    /// Targets supersede each other, they are never queued; the rope is
    /// snapped immediately since only player bodies are smoothed.
    pub fn apply_snapshot(&mut self, p1: BodyPose, p2: BodyPose, rope: Vec<RopePoint>) {
        self.target = Some((p1, p2));
        self.rope = rope;
    }

    /// One render tick of exponential smoothing toward the target.
    ///
    /// Moves each rendered pose a fixed fraction of the remaining
    /// distance: it strictly shrinks the gap, never overshoots, and a
    /// repeated identical target just continues the same convergence.
    /// A no-op until the first snapshot arrives.
    pub fn reconcile(&mut self) {
        let Some((target1, target2)) = self.target else {
            return;
        };

        self.player1 = eased(&self.player1, &target1, self.lerp_factor);
        self.player2 = eased(&self.player2, &target2, self.lerp_factor);
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn rope_points(&self) -> &[RopePoint] {
        &self.rope
    }

    /// The rope polyline to draw this tick: player one's rendered
    /// position, each segment point in order, player two's rendered
    /// position. Recomputed every tick because the endpoints move
    /// continuously; empty until a snapshot has carried rope data.
    pub fn rope_polyline(&self) -> Vec<RopePoint> {
        if self.rope.is_empty() {
            return Vec::new();
        }

        let mut polyline = Vec::with_capacity(self.rope.len() + 2);
        polyline.push(RopePoint {
            x: self.player1.x,
            y: self.player1.y,
        });
        polyline.extend_from_slice(&self.rope);
        polyline.push(RopePoint {
            x: self.player2.x,
            y: self.player2.y,
        });
        polyline
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self::new()
    }
}

fn eased(from: &BodyPose, to: &BodyPose, factor: f32) -> BodyPose {
    BodyPose {
        x: lerp(from.x, to.x, factor),
        y: lerp(from.y, to.y, factor),
        angle: lerp(from.angle, to.angle, factor),
    }
}
