use crate::browser;
use crate::engine::{self, Game, KeyState, Rect, Renderer};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::join;
use std::cell::RefCell;
use std::collections::VecDeque;
use web_sys::HtmlImageElement;

pub mod chase;
pub mod journey;

use chase::{ChaseEvent, ChaseGame};
use journey::{JourneyEvent, JourneyGame};

pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 600.0;

// fixed logical step, in seconds - the frame loop delivers updates at this
// cadence, and the game clock advances by exactly this much per update
pub const FRAME_DT: f32 = 1.0 / 60.0;

const CANVAS_RECT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: CANVAS_WIDTH,
    height: CANVAS_HEIGHT,
};

// HUD element ids owned by the host page
mod hud {
    pub const SCORE: &str = "score";
    pub const COINS: &str = "coins";
    pub const TIME: &str = "time";
    pub const STATUS: &str = "status";
    pub const DIALOGUE: &str = "dialogue";
}

/// Phase of a game session. Exactly one per running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    NotStarted,
    Active,
    DialoguePaused,
    Ended { won: bool },
}

/// Source of uniform randoms in [0,1). The cores are generic over this so
/// tests can drive spawning deterministically.
pub trait Rng {
    fn random(&mut self) -> f64;
}

/// Math.random() from the browser.
pub struct BrowserRng;

impl Rng for BrowserRng {
    fn random(&mut self) -> f64 {
        js_sys::Math::random()
    }
}

/// Deferred actions keyed by the game clock, drained once per update.
/// Replaces host setTimeout/setInterval callbacks so spawn cadences and
/// buff reverts advance deterministically with the game.
pub struct Scheduler<A> {
    queue: Vec<(f32, A)>,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Scheduler { queue: Vec::new() }
    }

    pub fn schedule(&mut self, due: f32, action: A) {
        self.queue.push((due, action));
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Remove and return every action due at or before `now`, earliest
    /// first. Repeating events reschedule themselves from the returned
    /// due time, so cadence does not drift with the drain instant.
    pub fn due(&mut self, now: f32) -> Vec<(f32, A)> {
        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.queue.len() {
            if self.queue[i].0 <= now {
                fired.push(self.queue.remove(i));
            } else {
                i += 1;
            }
        }
        fired.sort_by(|a, b| a.0.total_cmp(&b.0));
        fired
    }
}

/// Dialogue choices the host can report back while a journey game is
/// paused. Each temporarily overrides one player stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChoice {
    /// Swiftness potion : faster run speed
    Potion,
    /// Feather charm : higher jumps
    Feather,
    /// Balloon : weaker gravity
    Balloon,
}

impl ItemChoice {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "potion" => Some(ItemChoice::Potion),
            "feather" => Some(ItemChoice::Feather),
            "balloon" => Some(ItemChoice::Balloon),
            _ => None,
        }
    }
}

/// Lifecycle signals from the host page (button clicks, dialogue picks).
/// They are queued and drained by the next update, so a callback landing
/// after the scene has ended cannot mutate anything outside the state
/// guard in the cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Start,
    Choose(ItemChoice),
    Restart,
}

thread_local! {
    static HOST_COMMANDS: RefCell<VecDeque<HostCommand>> = RefCell::new(VecDeque::new());
}

pub fn push_host_command(command: HostCommand) {
    HOST_COMMANDS.with(|queue| queue.borrow_mut().push_back(command));
}

fn drain_host_commands() -> Vec<HostCommand> {
    HOST_COMMANDS.with(|queue| queue.borrow_mut().drain(..).collect())
}

/// The four shared images, loaded before the first frame.
struct Assets {
    cat: HtmlImageElement,
    monster: HtmlImageElement,
    coin: HtmlImageElement,
    background: HtmlImageElement,
}

impl Assets {
    async fn load() -> Result<Self> {
        // independent resources load simultaneously; total time is the
        // slowest resource, not the sum
        let (cat, monster, coin, background) = join!(
            engine::load_image("assets/image1.png"),
            engine::load_image("assets/image2.png"),
            engine::load_image("assets/image3.png"),
            engine::load_image("assets/bg.png"),
        );
        Ok(Assets {
            cat: cat?,
            monster: monster?,
            coin: coin?,
            background: background?,
        })
    }
}

// ==================== Variant 1 : Coin Chase ====================

pub enum CoinChase {
    /// Waiting for assets; transitions to Loaded exactly once
    Loading,
    Loaded(ChaseScreen),
}

pub struct ChaseScreen {
    game: ChaseGame<BrowserRng>,
    assets: Assets,
}

impl CoinChase {
    pub fn new() -> Self {
        CoinChase::Loading
    }
}

#[async_trait(?Send)]
impl Game for CoinChase {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            CoinChase::Loading => {
                let assets = Assets::load().await?;
                log!("CoinChase : assets loaded");
                Ok(Box::new(CoinChase::Loaded(ChaseScreen {
                    game: ChaseGame::new(BrowserRng),
                    assets,
                })))
            }
            CoinChase::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState) {
        if let CoinChase::Loaded(screen) = self {
            for command in drain_host_commands() {
                let events = match command {
                    HostCommand::Start => screen.game.start(),
                    HostCommand::Restart => screen.game.restart(),
                    HostCommand::Choose(_) => {
                        log!("CoinChase : no dialogue here, ignoring choice");
                        Vec::new()
                    }
                };
                handle_chase_events(events);
            }
            handle_chase_events(screen.game.update(keystate));
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let CoinChase::Loaded(screen) = self {
            renderer.clear(&CANVAS_RECT);
            // Draw order matters : background -> foreground
            renderer.draw_image(&screen.assets.background, &CANVAS_RECT);
            renderer.draw_image(&screen.assets.cat, screen.game.player());
            for coin in screen.game.coins() {
                renderer.draw_image(&screen.assets.coin, coin);
            }
            for monster in screen.game.monsters() {
                renderer.draw_image(&screen.assets.monster, &monster.rect);
            }
        }
    }
}

fn handle_chase_events(events: Vec<ChaseEvent>) {
    for event in events {
        match event {
            ChaseEvent::ScoreChanged(score) => {
                let _ = browser::set_text(hud::SCORE, &format!("Score: {}", score));
            }
            ChaseEvent::RoundOver { score } => {
                let _ = browser::alert(&format!("Game Over! Score: {}", score));
            }
        }
    }
}

// ==================== Variant 2 : Cat Journey ====================

pub enum CatJourney {
    Loading,
    Loaded(JourneyScreen),
}

pub struct JourneyScreen {
    game: JourneyGame<BrowserRng>,
    assets: Assets,
}

impl CatJourney {
    pub fn new() -> Self {
        CatJourney::Loading
    }
}

#[async_trait(?Send)]
impl Game for CatJourney {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            CatJourney::Loading => {
                let assets = Assets::load().await?;
                log!("CatJourney : assets loaded");
                Ok(Box::new(CatJourney::Loaded(JourneyScreen {
                    game: JourneyGame::new(BrowserRng),
                    assets,
                })))
            }
            CatJourney::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState) {
        if let CatJourney::Loaded(screen) = self {
            for command in drain_host_commands() {
                match command {
                    HostCommand::Start => screen.game.start().into_iter().for_each(handle_journey_event),
                    HostCommand::Restart => screen.game.restart().into_iter().for_each(handle_journey_event),
                    HostCommand::Choose(item) => {
                        if screen.game.choose(item) {
                            let _ = browser::hide_element(hud::DIALOGUE);
                        } else {
                            log!("CatJourney : no dialogue open, ignoring {:?}", item);
                        }
                    }
                }
            }
            screen
                .game
                .update(keystate)
                .into_iter()
                .for_each(handle_journey_event);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let CatJourney::Loaded(screen) = self {
            let game = &screen.game;
            renderer.clear(&CANVAS_RECT);

            // background scrolls at half the camera rate, tiled twice to
            // cover the seam
            let camera_x = game.camera_x();
            let shift = (camera_x * 0.5).rem_euclid(CANVAS_WIDTH);
            renderer.draw_image(
                &screen.assets.background,
                &Rect::new(-shift, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
            );
            renderer.draw_image(
                &screen.assets.background,
                &Rect::new(-shift + CANVAS_WIDTH, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
            );

            for platform in game.platforms() {
                renderer.fill_rect(&to_screen(platform, camera_x), "#6b4f2f");
            }
            for coin in game.coins() {
                if !coin.collected {
                    renderer.draw_image(&screen.assets.coin, &to_screen(&coin.rect, camera_x));
                }
            }
            for monster in game.monsters() {
                renderer.draw_image(&screen.assets.monster, &to_screen(monster, camera_x));
            }
            // player pinned to the screen anchor, the world moves past it
            renderer.draw_image(&screen.assets.cat, &to_screen(game.player_rect(), camera_x));
        }
    }
}

fn to_screen(rect: &Rect, camera_x: f32) -> Rect {
    Rect::new(rect.x - camera_x, rect.y, rect.width, rect.height)
}

fn handle_journey_event(event: JourneyEvent) {
    match event {
        JourneyEvent::CoinsChanged(count) => {
            let _ = browser::set_text(
                hud::COINS,
                &format!("Coins: {} / {}", count, journey::COIN_QUOTA),
            );
        }
        JourneyEvent::TimeChanged(seconds) => {
            let _ = browser::set_text(hud::TIME, &format!("Time: {}", seconds));
        }
        JourneyEvent::DialogueOpened => {
            let _ = browser::show_element(hud::DIALOGUE);
        }
        JourneyEvent::Restarted => {
            log!("CatJourney : restarting from scratch");
            let _ = browser::hide_element(hud::DIALOGUE);
            let _ = browser::set_text(hud::STATUS, "");
        }
        JourneyEvent::Finished { won } => {
            let message = if won {
                "You made it home!"
            } else {
                "Out of time..."
            };
            log!("CatJourney : finished, won = {}", won);
            let _ = browser::set_text(hud::STATUS, message);
        }
    }
}
