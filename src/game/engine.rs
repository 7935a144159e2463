//! Match state and authoritative simulation step

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::physics::{
    self, Arena, MoveAxis, Vec2, BALL_BASE_SPEED, EXIT_MARGIN, PADDLE_HALF_LEN, PADDLE_NUDGE,
    PADDLE_SPEED, SCORING_ZONE, SPEED_GROWTH,
};
use super::{MatchSize, PaddleDir, UserId};

/// Points needed to win a match
pub const WIN_SCORE: u32 = 5;
/// Minimum ticks between successive paddle reflections
pub const HIT_COOLDOWN_TICKS: u32 = 10;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for players
    Waiting,
    /// Match in progress
    Playing,
    /// Match ended
    Finished,
}

/// Returned when a join would exceed the match's seat count
#[derive(Debug, Clone, thiserror::Error)]
#[error("match already has {max} players")]
pub struct CapacityError {
    pub max: usize,
}

/// One player's state inside a match (authoritative)
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: UserId,
    pub position: Vec2,
    pub score: u32,
    pub input: PaddleDir,
    pub axis: MoveAxis,
}

impl Participant {
    fn new(user_id: UserId, seat: usize, arena: &Arena) -> Self {
        let (position, axis) = physics::seat_position(seat, arena);
        Self {
            user_id,
            position,
            score: 0,
            input: PaddleDir::None,
            axis,
        }
    }

    /// Normal pointing from the paddle's wall into the arena
    fn outward_normal(&self) -> Vec2 {
        match self.axis {
            MoveAxis::Y => Vec2::new(-self.position.x.signum(), 0.0),
            MoveAxis::X => Vec2::new(0.0, -self.position.y.signum()),
        }
    }
}

/// The ball
#[derive(Debug, Clone)]
pub struct Ball {
    pub position: Vec2,
    /// Unit direction of travel
    pub velocity: Vec2,
    pub speed: f32,
    /// Last participant to touch the ball this rally
    pub last_hit: Option<UserId>,
}

/// Match state (owned exclusively by one engine)
#[derive(Debug, Clone)]
pub struct MatchState {
    pub size: MatchSize,
    pub arena: Arena,
    pub phase: MatchPhase,
    pub tick: u64,
    pub players: Vec<Participant>,
    pub ball: Ball,
}

/// The authoritative match simulation
///
/// `update` is synchronous and never suspends; callers that share an
/// engine across tasks serialize access externally.
pub struct MatchEngine {
    state: MatchState,
    hit_cooldown: u32,
    rng: ChaCha8Rng,
}

impl MatchEngine {
    pub fn new(size: MatchSize, seed: u64) -> Self {
        let arena = Arena::for_size(size);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let velocity = Self::serve_direction(size, &mut rng);

        Self {
            state: MatchState {
                size,
                arena,
                phase: MatchPhase::Waiting,
                tick: 0,
                players: Vec::new(),
                ball: Ball {
                    position: Vec2::ZERO,
                    velocity,
                    speed: BALL_BASE_SPEED,
                    last_hit: None,
                },
            },
            hit_cooldown: 0,
            rng,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }

    /// Seat a new player at the next deterministic position
    pub fn add_player(&mut self, user_id: UserId) -> Result<(), CapacityError> {
        let max = self.state.size.player_count();
        if self.state.players.len() >= max {
            return Err(CapacityError { max });
        }

        let seat = self.state.players.len();
        self.state
            .players
            .push(Participant::new(user_id, seat, &self.state.arena));
        Ok(())
    }

    /// Overwrite a participant's input; unknown ids are ignored
    pub fn set_input(&mut self, user_id: UserId, input: PaddleDir) {
        if let Some(player) = self
            .state
            .players
            .iter_mut()
            .find(|p| p.user_id == user_id)
        {
            player.input = input;
        }
    }

    /// Begin play; only valid from the waiting phase
    pub fn start(&mut self) {
        if self.state.phase == MatchPhase::Waiting {
            self.state.phase = MatchPhase::Playing;
        }
    }

    /// Return a finished match to the waiting phase with scores cleared
    pub fn reset(&mut self) {
        if self.state.phase != MatchPhase::Finished {
            return;
        }
        self.state.phase = MatchPhase::Waiting;
        self.state.tick = 0;
        for player in &mut self.state.players {
            player.score = 0;
            player.input = PaddleDir::None;
        }
        self.reset_ball();
    }

    /// The match winner; defined only once the match has finished.
    ///
    /// Equal top scores resolve to the earliest-seated participant.
    pub fn winner(&self) -> Option<&Participant> {
        if self.state.phase != MatchPhase::Finished {
            return None;
        }
        self.state
            .players
            .iter()
            .reduce(|best, p| if p.score > best.score { p } else { best })
    }

    /// Advance the simulation by `dt` seconds; no-op unless playing
    pub fn update(&mut self, dt: f32) {
        if self.state.phase != MatchPhase::Playing {
            return;
        }

        self.state.tick += 1;
        if self.hit_cooldown > 0 {
            self.hit_cooldown -= 1;
        }

        self.move_paddles(dt);
        let ball_step = self.state.ball.velocity * (self.state.ball.speed * dt);
        self.state.ball.position += ball_step;
        self.bounce_walls();
        self.collide_paddles();
        self.score_exits();
    }

    /// Integrate paddle positions along their axis, clamped to the arena
    fn move_paddles(&mut self, dt: f32) {
        let arena = self.state.arena;
        for player in &mut self.state.players {
            let step = player.input.sign() * PADDLE_SPEED * dt;
            match player.axis {
                MoveAxis::Y => {
                    let limit = arena.half_height() - PADDLE_HALF_LEN;
                    player.position.y = (player.position.y + step).clamp(-limit, limit);
                }
                MoveAxis::X => {
                    let limit = arena.half_width() - PADDLE_HALF_LEN;
                    player.position.x = (player.position.x + step).clamp(-limit, limit);
                }
            }
        }
    }

    /// Two-player matches bounce the ball off the non-scoring walls
    fn bounce_walls(&mut self) {
        if self.state.size != MatchSize::Two {
            return;
        }
        let half_h = self.state.arena.half_height();
        let ball = &mut self.state.ball;
        if (ball.position.y >= half_h && ball.velocity.y > 0.0)
            || (ball.position.y <= -half_h && ball.velocity.y < 0.0)
        {
            ball.velocity.y = -ball.velocity.y;
        }
    }

    fn in_scoring_zone(&self) -> bool {
        let arena = &self.state.arena;
        let pos = self.state.ball.position;
        arena.half_width() - pos.x.abs() <= SCORING_ZONE
            || arena.half_height() - pos.y.abs() <= SCORING_ZONE
    }

    /// Test paddles for contact and reflect the ball on overlap
    fn collide_paddles(&mut self) {
        if self.hit_cooldown > 0 || !self.in_scoring_zone() {
            return;
        }

        let ball_pos = self.state.ball.position;
        let last_hit = self.state.ball.last_hit;

        let hit = self.state.players.iter().find(|p| {
            if last_hit == Some(p.user_id) {
                return false;
            }
            let (plane_dist, span_dist) = match p.axis {
                MoveAxis::Y => (
                    (ball_pos.x - p.position.x).abs(),
                    (ball_pos.y - p.position.y).abs(),
                ),
                MoveAxis::X => (
                    (ball_pos.y - p.position.y).abs(),
                    (ball_pos.x - p.position.x).abs(),
                ),
            };
            plane_dist <= SCORING_ZONE && span_dist <= PADDLE_HALF_LEN
        });

        let Some(paddle) = hit else {
            return;
        };

        let mut velocity = physics::reflect(self.state.ball.velocity, paddle.outward_normal());
        // A moving paddle drags the ball along its axis
        let nudge = paddle.input.sign() * PADDLE_NUDGE;
        match paddle.axis {
            MoveAxis::Y => velocity.y += nudge,
            MoveAxis::X => velocity.x += nudge,
        }

        let hitter = paddle.user_id;
        let ball = &mut self.state.ball;
        ball.velocity = velocity.normalized();
        ball.speed *= SPEED_GROWTH;
        ball.last_hit = Some(hitter);
        self.hit_cooldown = HIT_COOLDOWN_TICKS;
    }

    /// Credit the last hitter when the ball leaves the arena and re-serve
    fn score_exits(&mut self) {
        let arena = &self.state.arena;
        let pos = self.state.ball.position;
        let out = pos.x.abs() > arena.half_width() + EXIT_MARGIN
            || pos.y.abs() > arena.half_height() + EXIT_MARGIN;
        if !out {
            return;
        }

        // Whoever touched the ball last takes the point, own side or not
        if let Some(scorer) = self.state.ball.last_hit {
            if let Some(player) = self
                .state
                .players
                .iter_mut()
                .find(|p| p.user_id == scorer)
            {
                player.score += 1;
                if player.score >= WIN_SCORE {
                    self.state.phase = MatchPhase::Finished;
                }
            }
        }

        self.reset_ball();
    }

    fn reset_ball(&mut self) {
        let velocity = Self::serve_direction(self.state.size, &mut self.rng);
        self.state.ball = Ball {
            position: Vec2::ZERO,
            velocity,
            speed: BALL_BASE_SPEED,
            last_hit: None,
        };
        self.hit_cooldown = 0;
    }

    fn serve_direction(size: MatchSize, rng: &mut ChaCha8Rng) -> Vec2 {
        match size {
            MatchSize::Two => physics::serve_direction_horizontal(rng),
            MatchSize::Four => physics::serve_direction_any(rng),
        }
    }
}
