use std::time::Duration;

use rand::Rng;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;

use gridstep::config::{WorldBounds, WorldConfig};
use gridstep::game::behavior::{Behavior, Launcher, MoveOnInput, TrackTarget};
use gridstep::game::constants::input::MOVE_SPEED;
use gridstep::game::entity::{EntityId, EntityKind, SpriteHandle};
use gridstep::game::game_loop::{Simulation, TimeScheduler};
use gridstep::game::input_buffer::{Direction, InputBufferError, InputSender, Intent};
use gridstep::game::performance::{FrameCounter, StepMonitor};
use gridstep::game::render::{FrameView, Renderer};
use gridstep::game::spawn::{SpawnError, SpawnRequest};
use gridstep::game::world::World;
use gridstep::util::vec2::Vec2;

const BALL_COUNT: usize = 150;
const BALL_SIZE: f32 = 16.0;
const BALL_MAX_SPEED: f32 = 3.0;
const OBSTACLE_COUNT: usize = 12;
const OBSTACLE_SIZE: f32 = 48.0;
const PLAYER_SIZE: f32 = 32.0;
const VIEWPORT: Vec2 = Vec2::new(640.0, 480.0);
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Gridstep demo v{}", env!("CARGO_PKG_VERSION"));

    let config = WorldConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: dt={:.4}s, cell={}, cap={} steps, frame cap={} Hz",
        config.step_seconds, config.cell_size, config.max_steps_per_advance, config.max_frame_rate
    );

    let demo_seconds: u64 = std::env::var("SIM_DEMO_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    let mut world = World::new(config.clone())?;
    let scene = populate(&mut world)?;
    info!(
        "Scene ready: {} entities, player {}, camera {}",
        world.store().len(),
        scene.player,
        scene.camera
    );

    let mut scheduler = TimeScheduler::from_config(&config)?;
    let mut monitor = StepMonitor::from_config(&config);
    let mut frames = FrameCounter::default();
    let mut renderer = LogRenderer::default();
    let mut script = ScriptedInput::new(Duration::from_secs(demo_seconds));
    let input = world.input_sender();

    let mut ticker = interval(config.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let start = Instant::now();
    let mut last_frame = start;
    let mut last_report = start;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Ctrl+C handler failed: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
        }

        let now = Instant::now();
        let elapsed = now - last_frame;
        last_frame = now;

        script.pump(now - start, &input);

        let advance = scheduler.advance(
            elapsed,
            &mut TimedWorld {
                world: &mut world,
                monitor: &mut monitor,
            },
        );
        monitor.record_advance(&advance);
        if advance.steps == 0 {
            trace!("Frame without a step, alpha {:.2}", advance.alpha);
        }

        let frame = world.frame(advance.alpha).with_camera(scene.camera);
        renderer.render(&frame);
        if let Some(fps) = frames.frame(now.into_std()) {
            debug!("{:.1} fps", fps);
        }

        if now - last_report >= REPORT_INTERVAL {
            last_report = now;
            let counts = world.store().counts();
            let grid = world.grid().stats();
            info!(
                "Tick {} | {} actors, {} projectiles, {} obstacles | {} cells ({} busy, max {}) | {:.0} fps | Perf: {}",
                world.tick(),
                counts.actors,
                counts.projectiles,
                counts.obstacles,
                grid.allocated_cells,
                grid.non_empty_cells,
                grid.max_per_cell,
                frames.fps(),
                monitor.status_message()
            );
        }

        if world.quit_requested() {
            break;
        }
    }

    info!(
        "Demo stopped after {} steps, {} frames, {:?} of simulated time dropped",
        scheduler.total_steps(),
        frames.total_frames(),
        scheduler.dropped_total()
    );
    Ok(())
}

struct Scene {
    player: EntityId,
    camera: EntityId,
}

/// Bouncing balls, a few static blocks, a steerable player and a camera
/// following it
fn populate(world: &mut World) -> anyhow::Result<Scene> {
    let bounds = world.config().bounds;
    let mut rng = rand::thread_rng();

    let center = bounds.min + bounds.size() * 0.5;
    let player = world.spawn_with(
        SpawnRequest::new(
            EntityKind::MovableActor,
            center - Vec2::splat(PLAYER_SIZE * 0.5),
            Vec2::splat(PLAYER_SIZE),
            Vec2::ZERO,
        )
        .sprite(SpriteHandle(0)),
        [
            Behavior::MoveOnInput(MoveOnInput::new(MOVE_SPEED)),
            Behavior::SpawnProjectileOnTrigger(Launcher::default()),
        ],
    )?;

    let camera = world.spawn_with(
        SpawnRequest::new(EntityKind::CameraProxy, bounds.min, VIEWPORT, Vec2::ZERO),
        [Behavior::TrackTarget(TrackTarget::new(player))],
    )?;

    for _ in 0..OBSTACLE_COUNT {
        let extent = Vec2::splat(OBSTACLE_SIZE);
        let request = SpawnRequest::new(
            EntityKind::StaticObstacle,
            random_position(&mut rng, &bounds, extent),
            extent,
            Vec2::ZERO,
        )
        .sprite(SpriteHandle(1));
        skip_if_crowded(world.spawn(request))?;
    }

    for _ in 0..BALL_COUNT {
        let extent = Vec2::splat(BALL_SIZE);
        let velocity = Vec2::new(
            rng.gen_range(-BALL_MAX_SPEED..=BALL_MAX_SPEED),
            rng.gen_range(-BALL_MAX_SPEED..=BALL_MAX_SPEED),
        );
        let request = SpawnRequest::new(
            EntityKind::MovableActor,
            random_position(&mut rng, &bounds, extent),
            extent,
            velocity,
        )
        .sprite(SpriteHandle(2));
        skip_if_crowded(world.spawn(request))?;
    }

    Ok(Scene { player, camera })
}

fn random_position(rng: &mut impl Rng, bounds: &WorldBounds, extent: Vec2) -> Vec2 {
    bounds.random_position(rng, extent).unwrap_or(bounds.min)
}

/// A full world only costs us one decoration; anything else is fatal
fn skip_if_crowded(result: Result<EntityId, SpawnError>) -> anyhow::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e @ SpawnError::PlacementExhausted { .. }) => {
            warn!("Skipping spawn: {}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Times each step for the monitor
struct TimedWorld<'a> {
    world: &'a mut World,
    monitor: &'a mut StepMonitor,
}

impl Simulation for TimedWorld<'_> {
    fn step(&mut self) {
        self.monitor.step_start();
        self.world.step();
        self.monitor.step_end(self.world.store().len());
    }
}

/// Stand-in for a display: walks the visible entities and logs occasionally
#[derive(Default)]
struct LogRenderer {
    frames: u64,
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        let mut visible = 0;
        for item in frame.items() {
            trace!("{:?} {} at {:?}", item.kind, item.id, frame.to_screen(item.position));
            visible += 1;
        }
        if self.frames % 120 == 0 {
            debug!("Frame {}: {} visible, alpha {:.2}", self.frames, visible, frame.alpha());
        }
    }
}

/// Replays a fixed loop of player intents in place of a keyboard and mouse
struct ScriptedInput {
    timeline: Vec<(Duration, Intent)>,
    period: Duration,
    cursor: usize,
    cycle_start: Duration,
    quit_at: Duration,
    quit_sent: bool,
}

impl ScriptedInput {
    fn new(quit_at: Duration) -> Self {
        let ms = Duration::from_millis;
        let steer = |direction, engaged| Intent::Move { direction, engaged };
        Self {
            timeline: vec![
                (ms(0), steer(Direction::Right, true)),
                (ms(500), Intent::Pointer { position: Vec2::new(1200.0, 200.0) }),
                (ms(600), Intent::Fire { engaged: true }),
                (ms(1500), steer(Direction::Right, false)),
                (ms(1500), steer(Direction::Down, true)),
                (ms(2000), Intent::Fire { engaged: false }),
                (ms(3000), steer(Direction::Down, false)),
                (ms(3000), steer(Direction::Left, true)),
                (ms(4500), steer(Direction::Left, false)),
                (ms(4500), steer(Direction::Up, true)),
                (ms(5000), Intent::Pointer { position: Vec2::new(100.0, 1200.0) }),
                (ms(5200), Intent::Fire { engaged: true }),
                (ms(5800), Intent::Fire { engaged: false }),
                (ms(6000), steer(Direction::Up, false)),
            ],
            period: ms(6500),
            cursor: 0,
            cycle_start: Duration::ZERO,
            quit_at,
            quit_sent: false,
        }
    }

    /// Send every intent due by `now`
    fn pump(&mut self, now: Duration, input: &InputSender) {
        if now >= self.quit_at && !self.quit_sent {
            self.quit_sent = send(input, now, Intent::Quit);
            return;
        }

        loop {
            if self.cursor == self.timeline.len() {
                if now < self.cycle_start + self.period {
                    return;
                }
                self.cycle_start += self.period;
                self.cursor = 0;
            }
            let (offset, intent) = self.timeline[self.cursor];
            if now < self.cycle_start + offset {
                return;
            }
            if !send(input, now, intent) {
                return;
            }
            self.cursor += 1;
        }
    }
}

fn send(input: &InputSender, now: Duration, intent: Intent) -> bool {
    match input.try_send(now, intent) {
        Ok(()) => true,
        Err(InputBufferError::Full) => {
            debug!("Input buffer full, retrying next frame");
            false
        }
        Err(e) => {
            warn!("Dropping intent {:?}: {}", intent, e);
            false
        }
    }
}
