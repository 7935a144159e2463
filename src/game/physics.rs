//! Paddle and ball math

use std::ops::{Add, AddAssign, Mul};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MatchSize;

/// Arena width, shared by both match sizes
pub const ARENA_WIDTH: f32 = 40.0;

/// Paddle movement speed in units per second
pub const PADDLE_SPEED: f32 = 20.0;
/// Half the paddle length along its movement axis
pub const PADDLE_HALF_LEN: f32 = 3.0;
/// Ball speed at serve and after every point
pub const BALL_BASE_SPEED: f32 = 25.0;
/// Ball speed multiplier applied on each paddle hit
pub const SPEED_GROWTH: f32 = 1.05;
/// Distance from an arena edge within which collisions are evaluated
pub const SCORING_ZONE: f32 = 0.5;
/// How far past an edge the ball center must travel to count as an exit
pub const EXIT_MARGIN: f32 = 1.0;
/// Sideways velocity added by a moving paddle on contact
pub const PADDLE_NUDGE: f32 = 0.25;

/// 2D vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy; falls back to +x for a degenerate vector
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            return Vec2::new(1.0, 0.0);
        }
        Vec2::new(self.x / len, self.y / len)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Vec2) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }
}

/// Playing field extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn for_size(size: MatchSize) -> Self {
        Self {
            width: ARENA_WIDTH,
            height: size.arena_height(),
        }
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }
}

/// Which axis a paddle slides along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveAxis {
    X,
    Y,
}

/// Seat placement for a joining player
///
/// Seats 0 and 1 sit on the left/right walls and slide along Y; seats 2
/// and 3 sit on the top/bottom walls and slide along X.
pub fn seat_position(seat: usize, arena: &Arena) -> (Vec2, MoveAxis) {
    match seat {
        0 => (Vec2::new(-arena.half_width(), 0.0), MoveAxis::Y),
        1 => (Vec2::new(arena.half_width(), 0.0), MoveAxis::Y),
        2 => (Vec2::new(0.0, arena.half_height()), MoveAxis::X),
        _ => (Vec2::new(0.0, -arena.half_height()), MoveAxis::X),
    }
}

/// Reflect a velocity about a surface normal
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    let dot = velocity.dot(normal);
    Vec2::new(
        velocity.x - 2.0 * dot * normal.x,
        velocity.y - 2.0 * dot * normal.y,
    )
}

/// Random serve direction for a two-player match: within 45 degrees of
/// horizontal, toward either side
pub fn serve_direction_horizontal(rng: &mut impl Rng) -> Vec2 {
    let mut angle = rng.gen_range(-std::f32::consts::FRAC_PI_4..std::f32::consts::FRAC_PI_4);
    if rng.gen_bool(0.5) {
        angle += std::f32::consts::PI;
    }
    Vec2::new(angle.cos(), angle.sin())
}

/// Random serve direction for a four-player match: uniform over the circle
pub fn serve_direction_any(rng: &mut impl Rng) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    Vec2::new(angle.cos(), angle.sin())
}
