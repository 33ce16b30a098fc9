//! Authoritative game state: the two players, the tether chain and the
//! coin pickups. Advanced once per host tick from local + remote input.

use crate::physics::{Body, BodyHandle, BodyKind, Constraint, Vec2, World};
use log::info;
use shared::{
    derive_body_parameters, BodyPose, InputState, Message, RopePoint, COIN_COUNT, COIN_RADIUS,
    COIN_VALUE, GRAVITY, JUMP_REST_THRESHOLD, JUMP_SPEED, PLAYER1_SPAWN, PLAYER2_SPAWN,
    PLAYER_SIZE, PLAYER_SPEED, ROPE_DAMPING, ROPE_REST_LENGTH, ROPE_SEGMENTS,
    ROPE_SEGMENT_FRICTION_AIR, ROPE_SEGMENT_MASS, ROPE_SEGMENT_RADIUS, ROPE_STIFFNESS,
};

const COIN_SPAWN_Y: f32 = 200.0;

/// Identifies one of the two player bodies. Player one is driven by the
/// host's local input, player two by the forwarded client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSlot {
    One,
    Two,
}

/// Reward side effect fired on pickup. The real economy store lives
/// outside this system; the simulation only invokes it.
pub trait RewardSink {
    fn add_coins(&mut self, amount: u32);
}

/// Minimal in-process stand-in for the external economy store.
#[derive(Debug, Default)]
pub struct CoinLedger {
    total: u32,
}

impl CoinLedger {
    pub fn new() -> Self {
        CoinLedger::default()
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

impl RewardSink for CoinLedger {
    fn add_coins(&mut self, amount: u32) {
        self.total += amount;
        info!("Coin collected! +{} (total {})", amount, self.total);
    }
}

/// The host-side world: both player bodies, the ordered tether chain
/// and any coins still in play.
///
/// Bodies and constraints are created once here and live for the whole
/// session; the only dynamic removal is a coin vanishing on pickup.
pub struct TetherGame {
    world: World,
    player1: BodyHandle,
    player2: BodyHandle,
    rope: Vec<BodyHandle>,
    coins: Vec<BodyHandle>,
}

impl TetherGame {
    pub fn new(trait_p1: Option<&str>, trait_p2: Option<&str>) -> Self {
        let mut world = World::new(Vec2::new(0.0, GRAVITY));

        let spawn1 = Vec2::new(PLAYER1_SPAWN.x, PLAYER1_SPAWN.y);
        let spawn2 = Vec2::new(PLAYER2_SPAWN.x, PLAYER2_SPAWN.y);
        let player1 = spawn_player(&mut world, spawn1, trait_p1);
        let player2 = spawn_player(&mut world, spawn2, trait_p2);
        let rope = build_tether(&mut world, player1, player2);
        let coins = spawn_coins(&mut world);

        info!(
            "World ready: {} bodies, {} constraints, {} coins",
            world.body_count(),
            world.constraint_count(),
            coins.len()
        );

        TetherGame {
            world,
            player1,
            player2,
            rope,
            coins,
        }
    }

    fn player_handle(&self, slot: PlayerSlot) -> BodyHandle {
        match slot {
            PlayerSlot::One => self.player1,
            PlayerSlot::Two => self.player2,
        }
    }

    /// Applies one tick of input to one player.
    ///
    /// Held directions set horizontal velocity outright; with neither
    /// held the solver keeps whatever gravity and the tether produce.
    /// Right overrides left when both are held. A jump is a one-shot
    /// vertical velocity, granted only near vertical rest.
    pub fn apply_input(&mut self, slot: PlayerSlot, input: &InputState) {
        let handle = self.player_handle(slot);
        if let Some(body) = self.world.body_mut(handle) {
            if input.left {
                body.velocity.x = -PLAYER_SPEED;
            }
            if input.right {
                body.velocity.x = PLAYER_SPEED;
            }
            if input.up && body.velocity.y.abs() < JUMP_REST_THRESHOLD {
                body.velocity.y = JUMP_SPEED;
            }
        }
    }

    /// Advances the simulation one solver step.
    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }

    /// Removes contacted coins and fires the reward side effect.
    ///
    /// The coin body is removed before rewarding, so two contact pairs
    /// against the same coin in one tick pay out exactly once.
    pub fn collect_pickups(&mut self, sink: &mut dyn RewardSink) {
        for contact in self.world.sensor_contacts() {
            if !self.coins.contains(&contact.sensor) {
                continue;
            }
            if self.world.remove_body(contact.sensor).is_some() {
                self.coins.retain(|&coin| coin != contact.sensor);
                sink.add_coins(COIN_VALUE);
            }
        }
    }

    /// Samples the world into the snapshot message sent after each tick.
    pub fn snapshot(&self) -> Message {
        let rope = self
            .rope
            .iter()
            .filter_map(|&handle| self.world.body(handle))
            .map(|body| RopePoint {
                x: body.position.x,
                y: body.position.y,
            })
            .collect();

        Message::Snapshot {
            p1: self.player_pose(PlayerSlot::One),
            p2: self.player_pose(PlayerSlot::Two),
            rope,
        }
    }

    pub fn player_pose(&self, slot: PlayerSlot) -> BodyPose {
        let handle = self.player_handle(slot);
        self.world
            .body(handle)
            .map(|body| BodyPose {
                x: body.position.x,
                y: body.position.y,
                angle: body.angle,
            })
            .unwrap_or_default()
    }

    pub fn player_velocity(&self, slot: PlayerSlot) -> Vec2 {
        let handle = self.player_handle(slot);
        self.world
            .body(handle)
            .map(|body| body.velocity)
            .unwrap_or_default()
    }

    pub fn rope_segment_count(&self) -> usize {
        self.rope.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.world.constraint_count()
    }

    pub fn live_coin_count(&self) -> usize {
        self.coins.len()
    }
}

fn spawn_player(world: &mut World, position: Vec2, trait_id: Option<&str>) -> BodyHandle {
    let params = derive_body_parameters(trait_id);

    let mut body = Body::new(BodyKind::Player, position, PLAYER_SIZE / 2.0);
    body.mass = params.mass;
    body.friction_air = params.friction_air;
    // Players never tumble; keeps platforming controls predictable.
    body.fixed_rotation = true;

    world.add_body(body)
}

/// Builds the tether: small segment bodies evenly spaced on the line
/// between the two players, chained with damped springs. The chain is
/// ordered playerA → seg1 → … → segN → playerB, so the constraint count
/// is always segment count + 1.
fn build_tether(world: &mut World, player_a: BodyHandle, player_b: BodyHandle) -> Vec<BodyHandle> {
    let start = world.body(player_a).map(|b| b.position).unwrap_or_default();
    let end = world.body(player_b).map(|b| b.position).unwrap_or_default();

    let dx = (end.x - start.x) / (ROPE_SEGMENTS + 1) as f32;
    let dy = (end.y - start.y) / (ROPE_SEGMENTS + 1) as f32;

    let mut previous = player_a;
    let mut rope = Vec::with_capacity(ROPE_SEGMENTS);

    for i in 1..=ROPE_SEGMENTS {
        let position = Vec2::new(start.x + dx * i as f32, start.y + dy * i as f32);

        let mut segment = Body::new(BodyKind::RopeSegment, position, ROPE_SEGMENT_RADIUS);
        segment.mass = ROPE_SEGMENT_MASS;
        segment.friction_air = ROPE_SEGMENT_FRICTION_AIR;
        let segment = world.add_body(segment);
        rope.push(segment);

        world.add_constraint(Constraint {
            body_a: previous,
            body_b: segment,
            rest_length: ROPE_REST_LENGTH,
            stiffness: ROPE_STIFFNESS,
            damping: ROPE_DAMPING,
        });

        previous = segment;
    }

    // Close the chain into the second player.
    world.add_constraint(Constraint {
        body_a: previous,
        body_b: player_b,
        rest_length: ROPE_REST_LENGTH,
        stiffness: ROPE_STIFFNESS,
        damping: ROPE_DAMPING,
    });

    rope
}

fn spawn_coins(world: &mut World) -> Vec<BodyHandle> {
    let mut coins = Vec::with_capacity(COIN_COUNT);
    for i in 0..COIN_COUNT {
        let mut coin = Body::new(
            BodyKind::Coin,
            Vec2::new(300.0 + i as f32 * 50.0, COIN_SPAWN_Y),
            COIN_RADIUS,
        );
        coin.is_static = true;
        coin.is_sensor = true;
        coins.push(world.add_body(coin));
    }
    coins
}
