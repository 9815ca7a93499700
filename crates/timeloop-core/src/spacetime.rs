//! Value types shared by every timeline: 2D vectors, space-time positions and
//! space speeds.
//!
//! Two clocks appear throughout the crate:
//!
//! - [`SelfEpoch`]: an object's own tick counter. Starts at 0 when the object
//!   is created and only ever grows.
//! - [`MainEpoch`]: the shared world clock. Cyclic with period `total_ticks`.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Index into an object's own (linear, never repeating) timeline.
pub type SelfEpoch = u64;

/// Position on the shared, cyclic main timeline.
pub type MainEpoch = u64;

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// Plain 2D float vector. All arithmetic is unclamped `f64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Construct a vector from its components.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` radians (0 = +x).
    #[inline]
    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { x: cos, y: sin }
    }

    /// Rotate counter-clockwise about the origin by `angle` radians.
    #[inline]
    pub fn rotated(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// ---------------------------------------------------------------------------
// SpaceTimePosition / SpaceSpeed
// ---------------------------------------------------------------------------

/// Where an object is, and when on the main timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceTimePosition {
    /// Main-timeline epoch this record belongs to.
    pub main_epoch: MainEpoch,
    /// Position in the field, origin at the centre.
    pub position: Vec2,
    /// Heading in radians. Never normalized.
    pub rotation: f64,
}

impl SpaceTimePosition {
    /// Construct a space-time position.
    pub fn new(main_epoch: MainEpoch, position: Vec2, rotation: f64) -> Self {
        Self {
            main_epoch,
            position,
            rotation,
        }
    }
}

/// Linear and angular velocity, in units per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceSpeed {
    /// Translation per tick.
    pub velocity: Vec2,
    /// Rotation per tick, in radians.
    pub angular_velocity: f64,
}

impl SpaceSpeed {
    /// Construct a space speed.
    pub fn new(velocity: Vec2, angular_velocity: f64) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }
}

/// Place an entity-local polygon in the world: every vertex is rotated about
/// the local origin by `rotation`, then translated by `position`.
pub fn orient_polygon(shape: &[Vec2], position: Vec2, rotation: f64) -> Vec<Vec2> {
    shape
        .iter()
        .map(|&vertex| vertex.rotated(rotation) + position)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
