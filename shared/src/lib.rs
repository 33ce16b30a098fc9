use serde::{Deserialize, Serialize};

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const FLOOR_Y: f32 = 550.0;
pub const PLAYER_SIZE: f32 = 40.0;

pub const GRAVITY: f32 = 980.0;
pub const PLAYER_SPEED: f32 = 300.0;
pub const JUMP_SPEED: f32 = -400.0;
/// A jump is only granted while |vertical velocity| is below this, a
/// near-rest check standing in for a real ground sensor.
pub const JUMP_REST_THRESHOLD: f32 = 12.0;

pub const BASE_MASS: f32 = 5.0;
pub const BASE_FRICTION_AIR: f32 = 0.05;

pub const ROPE_SEGMENTS: usize = 12;
pub const ROPE_REST_LENGTH: f32 = 20.0;
pub const ROPE_STIFFNESS: f32 = 30.0;
pub const ROPE_DAMPING: f32 = 0.6;
pub const ROPE_SEGMENT_MASS: f32 = 0.1;
pub const ROPE_SEGMENT_RADIUS: f32 = 5.0;
pub const ROPE_SEGMENT_FRICTION_AIR: f32 = 0.05;

/// Fraction of the remaining distance the client closes per render tick.
pub const LERP_FACTOR: f32 = 0.2;

pub const COIN_VALUE: u32 = 10;
pub const COIN_RADIUS: f32 = 10.0;
pub const COIN_COUNT: usize = 5;

/// Which side of the session this peer plays.
///
/// Read once at session start: the host runs the authoritative simulation,
/// the client renders an interpolated reconstruction and forwards input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Client,
}

/// Keys held this tick. Sampled once per tick per side, never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
}

/// Position and rotation of one player body as carried on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct BodyPose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Player spawn poses, shared by the host world and the client view so
/// the first snapshot never yanks the rendered players across the
/// screen.
pub const PLAYER1_SPAWN: BodyPose = BodyPose {
    x: 200.0,
    y: 400.0,
    angle: 0.0,
};
pub const PLAYER2_SPAWN: BodyPose = BodyPose {
    x: 300.0,
    y: 400.0,
    angle: 0.0,
};

/// Position of one tether segment as carried on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct RopePoint {
    pub x: f32,
    pub y: f32,
}

/// The two message shapes of the wire protocol.
///
/// `Input` flows client → host every client tick; `Snapshot` flows
/// host → client every host tick. There are no sequence numbers or acks:
/// only the latest received value of either kind is meaningful, so a
/// stale message arriving late simply loses to whatever came after it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Message {
    Input {
        input: InputState,
    },
    Snapshot {
        p1: BodyPose,
        p2: BodyPose,
        rope: Vec<RopePoint>,
    },
}

/// Serializes a message for transmission.
pub fn encode(message: &Message) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(message)
}

/// Deserializes a received payload. Anything that does not decode as one
/// of the two message variants is rejected at this boundary.
pub fn decode(payload: &[u8]) -> Result<Message, bincode::Error> {
    bincode::deserialize(payload)
}

/// Source of the local player's input for one tick.
///
/// The actual input device (keyboard, gamepad, UI layer) lives outside
/// this system; binaries and tests plug in their own implementation.
pub trait InputSource {
    fn sample(&mut self) -> InputState;
}

/// Input source that never presses anything. Also what the host assumes
/// for the remote player until the first input message arrives.
#[derive(Debug, Default)]
pub struct NeutralInput;

impl InputSource for NeutralInput {
    fn sample(&mut self) -> InputState {
        InputState::default()
    }
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Physics tweaks a character trait applies on top of the base profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraitModifiers {
    /// 1.0 is normal, 2.0 is heavy.
    pub mass_multiplier: Option<f32>,
    /// Replaces the base air friction outright when present.
    pub friction_air: Option<f32>,
    /// Jump power multiplier; defined in the config but not consumed by
    /// body creation (jump strength is a simulation constant).
    pub jump_force: Option<f32>,
    /// Visual size only, ignored by the simulation.
    pub visual_scale: Option<f32>,
}

/// A selectable character trait.
#[derive(Debug, Clone, Copy)]
pub struct Trait {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub modifiers: TraitModifiers,
}

pub const TRAIT_DATABASE: &[Trait] = &[
    Trait {
        id: "balanced",
        name: "The Balanced One",
        description: "Just a regular square. No baggage.",
        modifiers: TraitModifiers {
            mass_multiplier: None,
            friction_air: None,
            jump_force: None,
            visual_scale: None,
        },
    },
    Trait {
        id: "gym_rat",
        name: "The Gym Rat",
        description: "Strong but heavy. Great anchor, bad at jumping high.",
        modifiers: TraitModifiers {
            mass_multiplier: Some(2.5),
            friction_air: None,
            jump_force: Some(0.8),
            visual_scale: Some(1.2),
        },
    },
    Trait {
        id: "anxious",
        name: "The Overthinker",
        description: "Moves erratically. High friction (stops instantly).",
        modifiers: TraitModifiers {
            mass_multiplier: Some(0.8),
            friction_air: Some(0.2),
            jump_force: None,
            visual_scale: None,
        },
    },
    Trait {
        id: "slippery",
        name: "The Smooth Talker",
        description: "Hard to pin down. Low friction.",
        modifiers: TraitModifiers {
            mass_multiplier: None,
            friction_air: Some(0.001),
            jump_force: None,
            visual_scale: None,
        },
    },
];

/// Effective body parameters after applying a trait to the base profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParameters {
    pub mass: f32,
    pub friction_air: f32,
}

impl Default for BodyParameters {
    fn default() -> Self {
        BodyParameters {
            mass: BASE_MASS,
            friction_air: BASE_FRICTION_AIR,
        }
    }
}

/// Derives mass and air friction from the base profile and a trait id.
///
/// Looked up once at body creation; traits are immutable after that.
/// Unknown or absent trait ids fall back to the base profile.
pub fn derive_body_parameters(trait_id: Option<&str>) -> BodyParameters {
    let mut params = BodyParameters::default();

    let Some(trait_id) = trait_id else {
        return params;
    };
    let Some(t) = TRAIT_DATABASE.iter().find(|t| t.id == trait_id) else {
        return params;
    };

    if let Some(multiplier) = t.modifiers.mass_multiplier {
        params.mass *= multiplier;
    }
    if let Some(friction_air) = t.modifiers.friction_air {
        params.friction_air = friction_air;
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_input_message_roundtrip() {
        let message = Message::Input {
            input: InputState {
                left: true,
                right: false,
                up: true,
            },
        };

        let serialized = encode(&message).unwrap();
        let deserialized = decode(&serialized).unwrap();

        match deserialized {
            Message::Input { input } => {
                assert!(input.left);
                assert!(!input.right);
                assert!(input.up);
            }
            _ => panic!("Wrong message type after deserialization"),
        }
    }

    #[test]
    fn test_snapshot_message_roundtrip() {
        let message = Message::Snapshot {
            p1: BodyPose {
                x: 100.0,
                y: 100.0,
                angle: 0.0,
            },
            p2: BodyPose {
                x: 200.0,
                y: 100.0,
                angle: 0.5,
            },
            rope: vec![RopePoint { x: 150.0, y: 110.0 }],
        };

        let serialized = encode(&message).unwrap();
        let deserialized = decode(&serialized).unwrap();

        match deserialized {
            Message::Snapshot { p1, p2, rope } => {
                assert_approx_eq!(p1.x, 100.0);
                assert_approx_eq!(p2.angle, 0.5);
                assert_eq!(rope.len(), 1);
                assert_approx_eq!(rope[0].x, 150.0);
                assert_approx_eq!(rope[0].y, 110.0);
            }
            _ => panic!("Wrong message type after deserialization"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[0xFF; 16]).is_err());
    }

    #[test]
    fn test_neutral_input_is_all_false() {
        let mut source = NeutralInput;
        let input = source.sample();
        assert!(!input.left);
        assert!(!input.right);
        assert!(!input.up);
    }

    #[test]
    fn test_lerp_fraction() {
        assert_approx_eq!(lerp(0.0, 100.0, 0.2), 20.0);
        assert_approx_eq!(lerp(50.0, 50.0, 0.2), 50.0);
        assert_approx_eq!(lerp(100.0, 0.0, 0.2), 80.0);
    }

    #[test]
    fn test_derive_body_parameters_base_profile() {
        let params = derive_body_parameters(None);
        assert_approx_eq!(params.mass, BASE_MASS);
        assert_approx_eq!(params.friction_air, BASE_FRICTION_AIR);

        let unknown = derive_body_parameters(Some("does_not_exist"));
        assert_eq!(unknown, params);
    }

    #[test]
    fn test_derive_body_parameters_gym_rat() {
        let params = derive_body_parameters(Some("gym_rat"));
        assert_approx_eq!(params.mass, BASE_MASS * 2.5);
        assert_approx_eq!(params.friction_air, BASE_FRICTION_AIR);
    }

    #[test]
    fn test_derive_body_parameters_friction_override() {
        let anxious = derive_body_parameters(Some("anxious"));
        assert_approx_eq!(anxious.mass, BASE_MASS * 0.8);
        assert_approx_eq!(anxious.friction_air, 0.2);

        let slippery = derive_body_parameters(Some("slippery"));
        assert_approx_eq!(slippery.mass, BASE_MASS);
        assert_approx_eq!(slippery.friction_air, 0.001);
    }

    #[test]
    fn test_trait_database_ids_unique() {
        for (i, a) in TRAIT_DATABASE.iter().enumerate() {
            for b in &TRAIT_DATABASE[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
