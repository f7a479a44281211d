//! Cat Journey : side-scrolling platformer. The world is generated once
//! per run - platforms, coins and monsters batch-placed with vertical
//! jitter. Dialogue checkpoints pause play until the host reports a
//! choice, which buffs one stat for five seconds of game clock. Reaching
//! the final stretch with enough coins wins; running out the frame-counted
//! timer loses.

use super::{ItemChoice, Rng, SceneState, Scheduler, FRAME_DT};
use crate::engine::{KeyState, Point, Rect};

pub const COIN_QUOTA: u32 = 10;

const PLAYER_SIZE: f32 = 80.0;
const PLAYER_START_X: f32 = 100.0;
// y of the ground surface; a grounded player's bottom edge rests here
const GROUND_Y: f32 = 520.0;

const COIN_SIZE: f32 = 40.0;
const MONSTER_SIZE: f32 = 60.0;
const PLATFORM_WIDTH: f32 = 120.0;
const PLATFORM_HEIGHT: f32 = 20.0;

const PLATFORM_COUNT: usize = 8;
const COIN_COUNT: usize = 10;
const MONSTER_COUNT: usize = 7;

// landing tolerance below a platform's top surface
const LANDING_BAND: f32 = 14.0;

const WIN_X: f32 = 3600.0;
// seconds of game clock; advances FRAME_DT per update, not wall clock
const TIME_LIMIT: f32 = 120.0;

// world-x checkpoints where a dialogue opens, ascending
const DIALOGUE_THRESHOLDS: [f32; 3] = [900.0, 1800.0, 2700.0];

const BUFF_SECONDS: f32 = 5.0;
const SPEED_BUFF: f32 = 1.6;
const JUMP_BUFF: f32 = 1.3;
const GRAVITY_BUFF: f32 = 0.5;
const DASH_MULTIPLIER: f32 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub speed: f32,
    pub jump_power: f32,
    pub gravity: f32,
}

const BASE_STATS: Stats = Stats {
    speed: 5.0,
    jump_power: 18.0,
    gravity: 0.9,
};

/// Which stat a scheduled buff revert restores to baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuffRevert {
    Speed,
    JumpPower,
    Gravity,
}

pub struct Player {
    pub rect: Rect,
    pub velocity: Point,
    pub stats: Stats,
    pub grounded: bool,
    pub double_jump_available: bool,
    pub dash_enabled: bool,
    // previous-frame jump key state, so holding the key does not retrigger
    jump_held: bool,
}

impl Player {
    fn new() -> Self {
        Player {
            rect: Rect::new(
                PLAYER_START_X,
                GROUND_Y - PLAYER_SIZE,
                PLAYER_SIZE,
                PLAYER_SIZE,
            ),
            velocity: Point { x: 0.0, y: 0.0 },
            stats: BASE_STATS,
            grounded: true,
            double_jump_available: true,
            dash_enabled: true,
            jump_held: false,
        }
    }

    fn land(&mut self, surface_y: f32) {
        self.rect.y = surface_y - self.rect.height;
        self.velocity.y = 0.0;
        self.grounded = true;
        self.double_jump_available = true;
    }
}

pub struct Coin {
    pub rect: Rect,
    pub collected: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum JourneyEvent {
    CoinsChanged(u32),
    /// remaining whole seconds
    TimeChanged(u32),
    DialogueOpened,
    Restarted,
    Finished {
        won: bool,
    },
}

pub struct JourneyGame<R> {
    state: SceneState,
    player: Player,
    platforms: Vec<Rect>,
    coins: Vec<Coin>,
    monsters: Vec<Rect>,
    coins_collected: u32,
    clock: f32,
    reverts: Scheduler<BuffRevert>,
    // index of the next dialogue threshold; never rewinds except on restart
    next_dialogue: usize,
    last_time_display: u32,
    rng: R,
}

impl<R: Rng> JourneyGame<R> {
    pub fn new(mut rng: R) -> Self {
        let (platforms, coins, monsters) = generate_world(&mut rng);
        JourneyGame {
            state: SceneState::NotStarted,
            player: Player::new(),
            platforms,
            coins,
            monsters,
            coins_collected: 0,
            clock: 0.0,
            reverts: Scheduler::new(),
            next_dialogue: 0,
            last_time_display: TIME_LIMIT as u32,
            rng,
        }
    }

    pub fn start(&mut self) -> Vec<JourneyEvent> {
        if self.state != SceneState::NotStarted {
            return Vec::new();
        }
        self.state = SceneState::Active;
        vec![
            JourneyEvent::CoinsChanged(0),
            JourneyEvent::TimeChanged(TIME_LIMIT as u32),
        ]
    }

    /// Full restart, nothing survives : fresh world batch, baseline stats,
    /// zeroed clock and counters. Play resumes immediately.
    pub fn restart(&mut self) -> Vec<JourneyEvent> {
        let (platforms, coins, monsters) = generate_world(&mut self.rng);
        self.platforms = platforms;
        self.coins = coins;
        self.monsters = monsters;
        self.player = Player::new();
        self.coins_collected = 0;
        self.clock = 0.0;
        self.reverts.clear();
        self.next_dialogue = 0;
        self.last_time_display = TIME_LIMIT as u32;
        self.state = SceneState::Active;
        vec![
            JourneyEvent::Restarted,
            JourneyEvent::CoinsChanged(0),
            JourneyEvent::TimeChanged(TIME_LIMIT as u32),
        ]
    }

    /// Host reports the dialogue pick. Returns false (and does nothing)
    /// unless a dialogue is actually open.
    pub fn choose(&mut self, item: ItemChoice) -> bool {
        if self.state != SceneState::DialoguePaused {
            return false;
        }
        let stats = &mut self.player.stats;
        let revert = match item {
            ItemChoice::Potion => {
                stats.speed = BASE_STATS.speed * SPEED_BUFF;
                BuffRevert::Speed
            }
            ItemChoice::Feather => {
                stats.jump_power = BASE_STATS.jump_power * JUMP_BUFF;
                BuffRevert::JumpPower
            }
            ItemChoice::Balloon => {
                stats.gravity = BASE_STATS.gravity * GRAVITY_BUFF;
                BuffRevert::Gravity
            }
        };
        self.reverts.schedule(self.clock + BUFF_SECONDS, revert);
        self.state = SceneState::Active;
        true
    }

    pub fn update(&mut self, keystate: &KeyState) -> Vec<JourneyEvent> {
        if self.state != SceneState::Active {
            return Vec::new();
        }
        let mut events = Vec::new();

        self.clock += FRAME_DT;
        for (_, revert) in self.reverts.due(self.clock) {
            let stats = &mut self.player.stats;
            match revert {
                BuffRevert::Speed => stats.speed = BASE_STATS.speed,
                BuffRevert::JumpPower => stats.jump_power = BASE_STATS.jump_power,
                BuffRevert::Gravity => stats.gravity = BASE_STATS.gravity,
            }
        }

        self.update_player(keystate);

        if self.collect_coins() {
            events.push(JourneyEvent::CoinsChanged(self.coins_collected));
        }

        let player_rect = self.player.rect;
        if self.monsters.iter().any(|m| player_rect.intersects(m)) {
            events.extend(self.restart());
            return events;
        }

        // one threshold per update, even if the player crossed several
        if let Some(&threshold) = DIALOGUE_THRESHOLDS.get(self.next_dialogue) {
            if self.player.rect.x >= threshold {
                self.next_dialogue += 1;
                self.state = SceneState::DialoguePaused;
                events.push(JourneyEvent::DialogueOpened);
                return events;
            }
        }

        if self.player.rect.x >= WIN_X && self.coins_collected >= COIN_QUOTA {
            self.state = SceneState::Ended { won: true };
            events.push(JourneyEvent::Finished { won: true });
            return events;
        }

        let remaining = (TIME_LIMIT - self.clock).max(0.0).ceil() as u32;
        if remaining != self.last_time_display {
            self.last_time_display = remaining;
            events.push(JourneyEvent::TimeChanged(remaining));
        }
        if self.clock >= TIME_LIMIT {
            self.state = SceneState::Ended { won: false };
            events.push(JourneyEvent::Finished { won: false });
        }
        events
    }

    /// Movement integration : keyed horizontal velocity (left wins when
    /// both are held), jump on the key's rising edge, constant gravity,
    /// then landing resolution. No horizontal clamp - the world scrolls.
    fn update_player(&mut self, keystate: &KeyState) {
        let player = &mut self.player;

        let dashing = player.dash_enabled
            && (keystate.is_pressed("ShiftLeft") || keystate.is_pressed("ShiftRight"));
        let speed = player.stats.speed * if dashing { DASH_MULTIPLIER } else { 1.0 };
        if keystate.is_pressed("ArrowLeft") || keystate.is_pressed("KeyA") {
            player.velocity.x = -speed;
        } else if keystate.is_pressed("ArrowRight") || keystate.is_pressed("KeyD") {
            player.velocity.x = speed;
        } else {
            player.velocity.x = 0.0;
        }

        let jump_pressed = keystate.is_pressed("Space")
            || keystate.is_pressed("ArrowUp")
            || keystate.is_pressed("KeyW");
        if jump_pressed && !player.jump_held {
            if player.grounded {
                player.velocity.y = -player.stats.jump_power;
                player.grounded = false;
            } else if player.double_jump_available {
                player.velocity.y = -player.stats.jump_power;
                player.double_jump_available = false;
            }
        }
        player.jump_held = jump_pressed;

        player.velocity.y += player.stats.gravity;
        player.rect.x += player.velocity.x;
        player.rect.y += player.velocity.y;

        player.grounded = false;
        if player.rect.bottom() >= GROUND_Y && player.velocity.y >= 0.0 {
            player.land(GROUND_Y);
        } else if player.velocity.y > 0.0 {
            // landing only : horizontal overlap, falling, and the feet
            // inside a thin band at the platform top. No snapping from
            // below or the side.
            let falling_bottom = player.rect.bottom();
            let landing = self.platforms.iter().find(|platform| {
                player.rect.x < platform.right()
                    && player.rect.right() > platform.x
                    && falling_bottom >= platform.y
                    && falling_bottom <= platform.y + LANDING_BAND
            });
            if let Some(platform) = landing {
                let surface = platform.y;
                player.land(surface);
            }
        }
    }

    /// Flip the collected flag and count each coin exactly once.
    fn collect_coins(&mut self) -> bool {
        let player = self.player.rect;
        let mut collected_any = false;
        for coin in self.coins.iter_mut() {
            if !coin.collected && player.intersects(&coin.rect) {
                coin.collected = true;
                self.coins_collected += 1;
                collected_any = true;
            }
        }
        collected_any
    }

    pub fn camera_x(&self) -> f32 {
        self.player.rect.x - SCREEN_ANCHOR_X
    }

    pub fn player_rect(&self) -> &Rect {
        &self.player.rect
    }

    pub fn platforms(&self) -> &[Rect] {
        &self.platforms
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn monsters(&self) -> &[Rect] {
        &self.monsters
    }
}

// where the player is pinned on screen; the camera offset follows from it
pub const SCREEN_ANCHOR_X: f32 = 200.0;

/// Fixed-count batch generation : even horizontal spacing, random vertical
/// jitter. Monsters patrol nothing - they sit on the ground in the
/// player's path.
fn generate_world(rng: &mut impl Rng) -> (Vec<Rect>, Vec<Coin>, Vec<Rect>) {
    let platforms = (0..PLATFORM_COUNT)
        .map(|i| {
            let x = 350.0 + i as f32 * 420.0;
            let y = 340.0 + rng.random() as f32 * 110.0;
            Rect::new(x, y, PLATFORM_WIDTH, PLATFORM_HEIGHT)
        })
        .collect();
    let coins = (0..COIN_COUNT)
        .map(|i| {
            let x = 300.0 + i as f32 * 320.0;
            let y = 220.0 + rng.random() as f32 * 200.0;
            Coin {
                rect: Rect::new(x, y, COIN_SIZE, COIN_SIZE),
                collected: false,
            }
        })
        .collect();
    let monsters = (0..MONSTER_COUNT)
        .map(|i| {
            let x = 550.0 + i as f32 * 430.0;
            Rect::new(x, GROUND_Y - MONSTER_SIZE, MONSTER_SIZE, MONSTER_SIZE)
        })
        .collect();
    (platforms, coins, monsters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::StubRng;
    use approx::assert_relative_eq;

    /// Started game with a clear path : no coins, monsters or platforms
    /// in the way unless a test puts them there.
    fn cleared_game() -> JourneyGame<StubRng> {
        let mut game = JourneyGame::new(StubRng::constant(0.5));
        game.start();
        game.coins.clear();
        game.monsters.clear();
        game.platforms.clear();
        game
    }

    fn jump_keys() -> KeyState {
        let mut keystate = KeyState::new();
        keystate.set_key("Space", true);
        keystate
    }

    #[test]
    fn idle_player_stays_put_on_the_ground() {
        let mut game = cleared_game();
        game.update(&KeyState::new());
        assert_eq!(game.player.rect.x, PLAYER_START_X);
        assert_eq!(game.player.velocity.x, 0.0);
        assert_relative_eq!(game.player.rect.bottom(), GROUND_Y);
        assert!(game.player.grounded);
    }

    #[test]
    fn update_does_nothing_until_started() {
        let mut game = JourneyGame::new(StubRng::constant(0.5));
        let mut keystate = KeyState::new();
        keystate.set_key("ArrowRight", true);
        assert!(game.update(&keystate).is_empty());
        assert_eq!(game.player.rect.x, PLAYER_START_X);
    }

    #[test]
    fn dash_multiplies_run_speed_while_shift_is_held() {
        let mut game = cleared_game();
        let mut keystate = KeyState::new();
        keystate.set_key("ArrowRight", true);
        keystate.set_key("ShiftLeft", true);
        game.update(&keystate);
        assert_relative_eq!(game.player.velocity.x, BASE_STATS.speed * DASH_MULTIPLIER);
    }

    #[test]
    fn double_jump_is_available_exactly_once_per_landing() {
        let mut game = cleared_game();
        let idle = KeyState::new();

        // first jump from the ground keeps the double-jump charge
        game.update(&jump_keys());
        assert!(!game.player.grounded);
        assert!(game.player.velocity.y < 0.0);
        assert!(game.player.double_jump_available);

        // release, then jump again mid-air : consumes the charge
        game.update(&idle);
        game.update(&jump_keys());
        assert!(!game.player.double_jump_available);
        assert_relative_eq!(
            game.player.velocity.y,
            -BASE_STATS.jump_power + BASE_STATS.gravity
        );

        // a third press while airborne is rejected : gravity only
        game.update(&idle);
        let dy_before = game.player.velocity.y;
        game.update(&jump_keys());
        assert_relative_eq!(game.player.velocity.y, dy_before + BASE_STATS.gravity);

        // landing restores exactly one charge
        for _ in 0..600 {
            game.update(&idle);
            if game.player.grounded {
                break;
            }
        }
        assert!(game.player.grounded);
        assert!(game.player.double_jump_available);
    }

    #[test]
    fn holding_the_jump_key_does_not_retrigger() {
        let mut game = cleared_game();
        let keystate = jump_keys();
        game.update(&keystate);
        let dy_first = game.player.velocity.y;
        game.update(&keystate);
        // still held : only gravity applies, the charge is untouched
        assert_relative_eq!(game.player.velocity.y, dy_first + BASE_STATS.gravity);
        assert!(game.player.double_jump_available);
    }

    #[test]
    fn falling_player_lands_on_a_platform_top() {
        let mut game = cleared_game();
        let platform = Rect::new(300.0, 400.0, PLATFORM_WIDTH, PLATFORM_HEIGHT);
        game.platforms.push(platform);
        game.player.rect.x = 320.0;
        game.player.rect.y = 400.0 - PLAYER_SIZE - 2.0;
        game.player.velocity.y = 4.0;
        game.player.grounded = false;

        game.update(&KeyState::new());
        assert_relative_eq!(game.player.rect.bottom(), platform.y);
        assert!(game.player.grounded);
        assert_eq!(game.player.velocity.y, 0.0);
    }

    #[test]
    fn rising_player_passes_through_a_platform() {
        let mut game = cleared_game();
        game.platforms
            .push(Rect::new(300.0, 400.0, PLATFORM_WIDTH, PLATFORM_HEIGHT));
        game.player.rect.x = 320.0;
        game.player.rect.y = 430.0;
        game.player.velocity.y = -10.0;
        game.player.grounded = false;

        game.update(&KeyState::new());
        assert!(!game.player.grounded);
        assert!(game.player.velocity.y < 0.0);
    }

    #[test]
    fn coin_collection_is_idempotent() {
        let mut game = cleared_game();
        game.coins.push(Coin {
            rect: Rect::new(game.player.rect.x, game.player.rect.y, COIN_SIZE, COIN_SIZE),
            collected: false,
        });

        let events = game.update(&KeyState::new());
        assert!(events.contains(&JourneyEvent::CoinsChanged(1)));
        assert_eq!(game.coins_collected, 1);
        assert!(game.coins[0].collected);

        // still overlapping, already collected : counter must not move
        let events = game.update(&KeyState::new());
        assert_eq!(game.coins_collected, 1);
        assert!(!events.contains(&JourneyEvent::CoinsChanged(1)));
    }

    #[test]
    fn dialogue_thresholds_fire_once_each_in_ascending_order() {
        let mut game = cleared_game();
        // warped past the first two checkpoints in a single frame
        game.player.rect.x = 2000.0;

        let events = game.update(&KeyState::new());
        assert!(events.contains(&JourneyEvent::DialogueOpened));
        assert_eq!(game.state, SceneState::DialoguePaused);
        assert_eq!(game.next_dialogue, 1);

        // paused : updates are inert until the host chooses
        assert!(game.update(&KeyState::new()).is_empty());
        assert_eq!(game.next_dialogue, 1);

        assert!(game.choose(ItemChoice::Potion));
        assert_eq!(game.state, SceneState::Active);

        // the second missed checkpoint fires on the next update
        let events = game.update(&KeyState::new());
        assert!(events.contains(&JourneyEvent::DialogueOpened));
        assert_eq!(game.next_dialogue, 2);
    }

    #[test]
    fn choose_is_rejected_without_an_open_dialogue() {
        let mut game = cleared_game();
        assert!(!game.choose(ItemChoice::Feather));
        assert_eq!(game.player.stats, BASE_STATS);
    }

    #[test]
    fn chosen_buff_reverts_after_five_seconds_of_game_clock() {
        let mut game = cleared_game();
        game.state = SceneState::DialoguePaused;
        assert!(game.choose(ItemChoice::Potion));
        assert_relative_eq!(game.player.stats.speed, BASE_STATS.speed * SPEED_BUFF);

        let idle = KeyState::new();
        // just under five seconds : buff still on
        for _ in 0..295 {
            game.update(&idle);
        }
        assert_relative_eq!(game.player.stats.speed, BASE_STATS.speed * SPEED_BUFF);
        // past five seconds : reverted to baseline
        for _ in 0..10 {
            game.update(&idle);
        }
        assert_relative_eq!(game.player.stats.speed, BASE_STATS.speed);
    }

    #[test]
    fn monster_contact_restarts_from_scratch() {
        let mut game = cleared_game();
        game.coins_collected = 3;
        game.clock = 50.0;
        game.next_dialogue = 2;
        game.player.rect.x = 2000.0;
        game.monsters.push(Rect::new(
            2000.0,
            game.player.rect.y,
            MONSTER_SIZE,
            MONSTER_SIZE,
        ));

        let events = game.update(&KeyState::new());
        assert!(events.contains(&JourneyEvent::Restarted));
        assert_eq!(game.coins_collected, 0);
        assert_eq!(game.clock, 0.0);
        assert_eq!(game.next_dialogue, 0);
        assert_eq!(game.player.rect.x, PLAYER_START_X);
        assert_eq!(game.state, SceneState::Active);
        // the fresh batch is back
        assert_eq!(game.monsters.len(), MONSTER_COUNT);
        assert_eq!(game.coins.len(), COIN_COUNT);
        assert_eq!(game.platforms.len(), PLATFORM_COUNT);
    }

    #[test]
    fn reaching_the_time_limit_ends_in_a_loss() {
        let mut game = cleared_game();
        game.next_dialogue = DIALOGUE_THRESHOLDS.len();
        game.clock = TIME_LIMIT - FRAME_DT;

        let events = game.update(&KeyState::new());
        assert!(events.contains(&JourneyEvent::Finished { won: false }));
        assert_eq!(game.state, SceneState::Ended { won: false });

        // ended : nothing mutates any more
        assert!(game.update(&KeyState::new()).is_empty());
    }

    #[test]
    fn winning_needs_both_distance_and_coin_quota() {
        let mut game = cleared_game();
        game.next_dialogue = DIALOGUE_THRESHOLDS.len();
        game.player.rect.x = WIN_X;
        game.coins_collected = COIN_QUOTA - 1;

        // distance alone is not enough
        let events = game.update(&KeyState::new());
        assert!(!events.contains(&JourneyEvent::Finished { won: true }));
        assert_eq!(game.state, SceneState::Active);

        game.coins_collected = COIN_QUOTA;
        let events = game.update(&KeyState::new());
        assert!(events.contains(&JourneyEvent::Finished { won: true }));
        assert_eq!(game.state, SceneState::Ended { won: true });
    }

    #[test]
    fn countdown_text_ticks_whole_seconds() {
        let mut game = cleared_game();
        game.next_dialogue = DIALOGUE_THRESHOLDS.len();
        let idle = KeyState::new();
        let mut seen = Vec::new();
        for _ in 0..130 {
            for event in game.update(&idle) {
                if let JourneyEvent::TimeChanged(t) = event {
                    seen.push(t);
                }
            }
        }
        // a bit over two seconds of updates : 119 then 118
        assert_eq!(seen, vec![TIME_LIMIT as u32 - 1, TIME_LIMIT as u32 - 2]);
    }
}
