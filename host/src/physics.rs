//! Rigid bodies, damped spring constraints and the per-tick solver step.
//!
//! This is the single source of truth for all positions; only the host
//! runs it. The solver is deliberately small: gravity, per-step air
//! friction, spring-damper forces along each constraint, Euler
//! integration and world-bounds clamping.

use shared::{FLOOR_Y, WORLD_WIDTH};

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    ///Value along the x-axis. Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis. Positive direction is down.
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector, or zero if the vector is zero.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec2::default()
        } else {
            Vec2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    ///Returns the dot product of two vectors.
    pub fn dot(&self, other: &Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

/// What a body is in the game; drives collision and snapshot handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Player,
    RopeSegment,
    Coin,
}

/// A circular rigid body.
///
/// Carries only authoritative numeric state. Any visual representation
/// is owned elsewhere and looked up by handle, never embedded here.
#[derive(Debug, Clone)]
pub struct Body {
    pub kind: BodyKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub mass: f32,
    /// Fraction of velocity shed per step, Matter-style.
    pub friction_air: f32,
    pub radius: f32,
    pub is_static: bool,
    pub fixed_rotation: bool,
    /// Sensors report contacts but never block or get pushed.
    pub is_sensor: bool,
}

impl Body {
    pub fn new(kind: BodyKind, position: Vec2, radius: f32) -> Self {
        Body {
            kind,
            position,
            velocity: Vec2::default(),
            angle: 0.0,
            mass: 1.0,
            friction_air: 0.0,
            radius,
            is_static: false,
            fixed_rotation: false,
            is_sensor: false,
        }
    }

    fn inv_mass(&self) -> f32 {
        if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }
}

/// Stable identifier for a body in a `World`.
///
/// Slots are never reused within a session, so a handle to a removed
/// body simply resolves to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(usize);

/// Damped spring linking two bodies at their centers.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

/// A sensor body overlapping a solid body during the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorContact {
    pub sensor: BodyHandle,
    pub other: BodyHandle,
}

/// The rigid-body world: bodies, constraints and gravity.
pub struct World {
    bodies: Vec<Option<Body>>,
    constraints: Vec<Constraint>,
    pub gravity: Vec2,
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        World {
            bodies: Vec::new(),
            constraints: Vec::new(),
            gravity,
        }
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len());
        self.bodies.push(Some(body));
        handle
    }

    /// Removes a body, freeing its slot. Returns the body if it was
    /// still alive; a second removal of the same handle returns `None`.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        self.bodies.get_mut(handle.0).and_then(|slot| slot.take())
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.0).and_then(|slot| slot.as_ref())
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.0).and_then(|slot| slot.as_mut())
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().filter(|slot| slot.is_some()).count()
    }

    /// Advances the simulation one step.
    pub fn step(&mut self, dt: f32) {
        self.apply_gravity_and_friction(dt);
        self.apply_constraint_forces(dt);
        self.integrate(dt);
        self.enforce_bounds();
    }

    fn apply_gravity_and_friction(&mut self, dt: f32) {
        for body in self.bodies.iter_mut().flatten() {
            if body.is_static {
                continue;
            }
            body.velocity = body.velocity.add(&self.gravity.scale(dt));
            body.velocity = body.velocity.scale(1.0 - body.friction_air);
        }
    }

    fn apply_constraint_forces(&mut self, dt: f32) {
        for i in 0..self.constraints.len() {
            let constraint = self.constraints[i].clone();

            let (Some(a), Some(b)) = (
                self.body(constraint.body_a).cloned(),
                self.body(constraint.body_b).cloned(),
            ) else {
                continue;
            };

            let delta = b.position.sub(&a.position);
            let distance = delta.magnitude();
            if distance <= f32::EPSILON {
                continue;
            }

            let axis = delta.scale(1.0 / distance);
            let stretch = distance - constraint.rest_length;
            let closing_speed = b.velocity.sub(&a.velocity).dot(&axis);

            // Spring force plus damping along the constraint axis.
            let force = constraint.stiffness * stretch + constraint.damping * closing_speed;
            let impulse = axis.scale(force * dt);

            if let Some(body_a) = self.body_mut(constraint.body_a) {
                if !body_a.is_static {
                    let scaled = impulse.scale(body_a.inv_mass());
                    body_a.velocity = body_a.velocity.add(&scaled);
                }
            }
            if let Some(body_b) = self.body_mut(constraint.body_b) {
                if !body_b.is_static {
                    let scaled = impulse.scale(body_b.inv_mass());
                    body_b.velocity = body_b.velocity.sub(&scaled);
                }
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.iter_mut().flatten() {
            if body.is_static {
                continue;
            }
            body.position = body.position.add(&body.velocity.scale(dt));
        }
    }

    fn enforce_bounds(&mut self) {
        for body in self.bodies.iter_mut().flatten() {
            if body.is_static || body.is_sensor {
                continue;
            }

            let left = body.radius;
            let right = WORLD_WIDTH - body.radius;
            if body.position.x < left {
                body.position.x = left;
                body.velocity.x = 0.0;
            } else if body.position.x > right {
                body.position.x = right;
                body.velocity.x = 0.0;
            }

            if body.position.y + body.radius >= FLOOR_Y {
                body.position.y = FLOOR_Y - body.radius;
                body.velocity.y = 0.0;
            } else if body.position.y - body.radius <= 0.0 {
                body.position.y = body.radius;
                body.velocity.y = 0.0;
            }
        }
    }

    /// Reports every sensor body currently overlapping a solid body.
    ///
    /// A sensor overlapping both players yields two pairs in the same
    /// step; callers dedupe by removing the sensor on first contact.
    pub fn sensor_contacts(&self) -> Vec<SensorContact> {
        let mut contacts = Vec::new();

        for (i, slot_a) in self.bodies.iter().enumerate() {
            let Some(sensor) = slot_a.as_ref().filter(|b| b.is_sensor) else {
                continue;
            };
            for (j, slot_b) in self.bodies.iter().enumerate() {
                if i == j {
                    continue;
                }
                let Some(other) = slot_b.as_ref().filter(|b| !b.is_sensor) else {
                    continue;
                };

                let distance = other.position.sub(&sensor.position).magnitude();
                if distance < sensor.radius + other.radius {
                    contacts.push(SensorContact {
                        sensor: BodyHandle(i),
                        other: BodyHandle(j),
                    });
                }
            }
        }

        contacts
    }
}
