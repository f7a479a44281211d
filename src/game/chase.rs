//! Coin Chase : four-way movement inside a fixed arena, coins and falling
//! monsters spawned on repeating timers. Touching a monster reports the
//! score and resets the round in place - the spawn timers keep running
//! across resets, exactly like the prototype this recreates.

use super::{Rng, SceneState, Scheduler, CANVAS_HEIGHT, CANVAS_WIDTH, FRAME_DT};
use crate::engine::{KeyState, Point, Rect};

const PLAYER_SIZE: f32 = 80.0;
const PLAYER_SPEED: f32 = 5.0;
const PLAYER_START: Point = Point {
    x: 100.0,
    y: CANVAS_HEIGHT - 150.0,
};

const COIN_SIZE: f32 = 40.0;
const MONSTER_SIZE: f32 = 60.0;
const COIN_REWARD: u32 = 10;

// spawn cadence, in seconds of game clock
const COIN_INTERVAL: f32 = 3.0;
const MONSTER_INTERVAL: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpawnKind {
    Coin,
    Monster,
}

pub struct Monster {
    pub rect: Rect,
    /// downward fall speed, fixed at spawn time
    pub speed: f32,
}

#[derive(Debug, PartialEq)]
pub enum ChaseEvent {
    ScoreChanged(u32),
    RoundOver { score: u32 },
}

pub struct ChaseGame<R> {
    state: SceneState,
    player: Rect,
    velocity: Point,
    coins: Vec<Rect>,
    monsters: Vec<Monster>,
    score: u32,
    clock: f32,
    spawner: Scheduler<SpawnKind>,
    rng: R,
}

impl<R: Rng> ChaseGame<R> {
    pub fn new(rng: R) -> Self {
        let mut spawner = Scheduler::new();
        spawner.schedule(COIN_INTERVAL, SpawnKind::Coin);
        spawner.schedule(MONSTER_INTERVAL, SpawnKind::Monster);
        ChaseGame {
            state: SceneState::NotStarted,
            player: Rect::new(PLAYER_START.x, PLAYER_START.y, PLAYER_SIZE, PLAYER_SIZE),
            velocity: Point { x: 0.0, y: 0.0 },
            coins: Vec::new(),
            monsters: Vec::new(),
            score: 0,
            clock: 0.0,
            spawner,
            rng,
        }
    }

    pub fn start(&mut self) -> Vec<ChaseEvent> {
        if self.state != SceneState::NotStarted {
            return Vec::new();
        }
        self.state = SceneState::Active;
        // a couple of coins to chase right away
        self.spawn_coin();
        self.spawn_coin();
        vec![ChaseEvent::ScoreChanged(self.score)]
    }

    /// In-place reinitialization. The spawner and clock are deliberately
    /// left alone : timers were never canceled on reset in the prototype.
    pub fn restart(&mut self) -> Vec<ChaseEvent> {
        self.score = 0;
        self.coins.clear();
        self.monsters.clear();
        self.player.x = PLAYER_START.x;
        self.player.y = PLAYER_START.y;
        self.velocity = Point { x: 0.0, y: 0.0 };
        vec![ChaseEvent::ScoreChanged(self.score)]
    }

    pub fn update(&mut self, keystate: &KeyState) -> Vec<ChaseEvent> {
        if self.state != SceneState::Active {
            return Vec::new();
        }
        let mut events = Vec::new();

        self.clock += FRAME_DT;
        for (due, kind) in self.spawner.due(self.clock) {
            match kind {
                SpawnKind::Coin => {
                    self.spawn_coin();
                    self.spawner.schedule(due + COIN_INTERVAL, SpawnKind::Coin);
                }
                SpawnKind::Monster => {
                    self.spawn_monster();
                    self.spawner
                        .schedule(due + MONSTER_INTERVAL, SpawnKind::Monster);
                }
            }
        }

        self.update_player(keystate);

        if self.update_monsters() {
            events.push(ChaseEvent::RoundOver { score: self.score });
            events.extend(self.restart());
            return events;
        }

        if self.collect_coins() {
            events.push(ChaseEvent::ScoreChanged(self.score));
        }
        events
    }

    /// Velocity from whatever is pressed right now, one axis at a time.
    /// Left wins over right and up over down when both are held : the
    /// branches are checked in that order on purpose.
    fn update_player(&mut self, keystate: &KeyState) {
        if keystate.is_pressed("ArrowLeft") || keystate.is_pressed("KeyA") {
            self.velocity.x = -PLAYER_SPEED;
        } else if keystate.is_pressed("ArrowRight") || keystate.is_pressed("KeyD") {
            self.velocity.x = PLAYER_SPEED;
        } else {
            self.velocity.x = 0.0;
        }

        if keystate.is_pressed("ArrowUp") || keystate.is_pressed("KeyW") {
            self.velocity.y = -PLAYER_SPEED;
        } else if keystate.is_pressed("ArrowDown") || keystate.is_pressed("KeyS") {
            self.velocity.y = PLAYER_SPEED;
        } else {
            self.velocity.y = 0.0;
        }

        self.player.x += self.velocity.x;
        self.player.y += self.velocity.y;

        // hard clamp to the arena, no bounce
        self.player.x = self.player.x.clamp(0.0, CANVAS_WIDTH - self.player.width);
        self.player.y = self.player.y.clamp(0.0, CANVAS_HEIGHT - self.player.height);
    }

    /// Advance every monster; returns true if one reached the player.
    fn update_monsters(&mut self) -> bool {
        let mut hit = false;
        let player = self.player;
        self.monsters.retain_mut(|monster| {
            monster.rect.y += monster.speed;
            if player.intersects(&monster.rect) {
                hit = true;
            }
            monster.rect.y <= CANVAS_HEIGHT
        });
        hit
    }

    /// Remove every coin the player overlaps. Removal makes collection
    /// idempotent : a collected coin no longer exists to collect.
    fn collect_coins(&mut self) -> bool {
        let player = self.player;
        let before = self.coins.len();
        let score = &mut self.score;
        self.coins.retain(|coin| {
            if player.intersects(coin) {
                *score += COIN_REWARD;
                false
            } else {
                true
            }
        });
        self.coins.len() != before
    }

    fn spawn_coin(&mut self) {
        let x = self.rng.random() as f32 * (CANVAS_WIDTH - 50.0);
        let y = self.rng.random() as f32 * (CANVAS_HEIGHT - 50.0);
        self.coins.push(Rect::new(x, y, COIN_SIZE, COIN_SIZE));
    }

    /// Monsters start above the visible area and fall in.
    fn spawn_monster(&mut self) {
        let x = self.rng.random() as f32 * (CANVAS_WIDTH - MONSTER_SIZE);
        let speed = 2.0 + self.rng.random() as f32 * 2.0;
        self.monsters.push(Monster {
            rect: Rect::new(x, -MONSTER_SIZE, MONSTER_SIZE, MONSTER_SIZE),
            speed,
        });
    }

    pub fn player(&self) -> &Rect {
        &self.player
    }

    pub fn coins(&self) -> &[Rect] {
        &self.coins
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::StubRng;

    fn active_game() -> ChaseGame<StubRng> {
        let mut game = ChaseGame::new(StubRng::constant(0.5));
        game.start();
        game
    }

    #[test]
    fn idle_player_stays_put() {
        let mut game = active_game();
        game.coins.clear();
        let before = game.player;
        game.update(&KeyState::new());
        assert_eq!(game.player, before);
        assert_eq!(game.velocity.x, 0.0);
        assert_eq!(game.velocity.y, 0.0);
    }

    #[test]
    fn update_before_start_is_a_no_op() {
        let mut game = ChaseGame::new(StubRng::constant(0.5));
        let mut keystate = KeyState::new();
        keystate.set_key("ArrowRight", true);
        assert!(game.update(&keystate).is_empty());
        assert_eq!(game.player.x, PLAYER_START.x);
    }

    #[test]
    fn left_wins_when_both_horizontal_keys_are_held() {
        let mut game = active_game();
        game.coins.clear();
        let mut keystate = KeyState::new();
        keystate.set_key("ArrowLeft", true);
        keystate.set_key("ArrowRight", true);
        game.update(&keystate);
        assert_eq!(game.velocity.x, -PLAYER_SPEED);
    }

    #[test]
    fn player_is_clamped_to_the_arena() {
        let mut game = active_game();
        game.coins.clear();
        game.player.x = 1.0;
        game.player.y = 1.0;
        let mut keystate = KeyState::new();
        keystate.set_key("ArrowLeft", true);
        keystate.set_key("ArrowUp", true);
        game.update(&keystate);
        assert_eq!(game.player.x, 0.0);
        assert_eq!(game.player.y, 0.0);

        game.player.x = CANVAS_WIDTH - game.player.width - 1.0;
        game.player.y = CANVAS_HEIGHT - game.player.height - 1.0;
        let mut keystate = KeyState::new();
        keystate.set_key("KeyD", true);
        keystate.set_key("KeyS", true);
        game.update(&keystate);
        assert_eq!(game.player.x, CANVAS_WIDTH - game.player.width);
        assert_eq!(game.player.y, CANVAS_HEIGHT - game.player.height);
    }

    #[test]
    fn overlapping_coin_is_collected_exactly_once() {
        let mut game = active_game();
        game.coins.clear();
        game.coins
            .push(Rect::new(game.player.x, game.player.y, 40.0, 40.0));

        let events = game.update(&KeyState::new());
        assert_eq!(game.score, COIN_REWARD);
        assert!(game.coins.is_empty());
        assert!(events.contains(&ChaseEvent::ScoreChanged(COIN_REWARD)));

        // nothing left to collect, score must not move again
        let events = game.update(&KeyState::new());
        assert_eq!(game.score, COIN_REWARD);
        assert!(events.is_empty());
    }

    #[test]
    fn monster_contact_reports_score_and_resets_in_place() {
        let mut game = active_game();
        game.coins.clear();
        game.score = 30;
        game.player.x = 300.0;
        game.monsters.push(Monster {
            rect: Rect::new(300.0, game.player.y, MONSTER_SIZE, MONSTER_SIZE),
            speed: 0.0,
        });

        let events = game.update(&KeyState::new());
        assert!(events.contains(&ChaseEvent::RoundOver { score: 30 }));
        assert!(events.contains(&ChaseEvent::ScoreChanged(0)));
        assert_eq!(game.score, 0);
        assert!(game.monsters.is_empty());
        assert_eq!(game.player.x, PLAYER_START.x);
        assert_eq!(game.player.y, PLAYER_START.y);
        assert_eq!(game.state, SceneState::Active);
    }

    #[test]
    fn spawn_timers_keep_running_across_resets() {
        let mut game = active_game();
        game.coins.clear();
        // burn most of the monster interval, then reset the round
        let idle = KeyState::new();
        while game.clock < MONSTER_INTERVAL - 2.0 * FRAME_DT {
            game.update(&idle);
        }
        game.restart();
        assert!(game.monsters.is_empty());

        // the pending spawn still fires right on schedule
        for _ in 0..5 {
            game.update(&idle);
        }
        assert_eq!(game.monsters.len(), 1);
    }

    #[test]
    fn monsters_fall_and_despawn_below_the_arena() {
        let mut game = active_game();
        game.coins.clear();
        game.monsters.push(Monster {
            rect: Rect::new(700.0, CANVAS_HEIGHT - 5.0, MONSTER_SIZE, MONSTER_SIZE),
            speed: 10.0,
        });
        game.update(&KeyState::new());
        assert!(game.monsters.is_empty());
    }

    #[test]
    fn start_spawns_two_initial_coins() {
        let game = active_game();
        assert_eq!(game.coins.len(), 2);
    }
}
