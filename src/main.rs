/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::InputIntent;
use sim::event::GameEvent;
use sim::level;
use sim::step;
use sim::world::WorldState;
use ui::gamepad::GamepadState;
use ui::input::{InputState, IntentTracker};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config);

    let world = level::load_rooms(&config)
        .and_then(|rooms| WorldState::new(rooms, &config));
    let mut world = match world {
        Ok(w) => w,
        Err(e) => {
            error!("cannot start: {e}");
            eprintln!("Cannot start: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        error!("terminal init failed: {e}");
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    if sound.is_none() {
        warn!("no audio output; sound disabled");
    }

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game error: {e}");
        eprintln!("Game error: {e}");
    }

    info!(delivered = world.delivered, ticks = world.tick, "session ended");
    println!();
    println!("Thanks for playing Mail Run!");
    println!("Letters delivered: {}", world.delivered);
}

/// Log to `log_file`; the terminal belongs to the renderer.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad connected");
    }

    let mut tracker = IntentTracker::new();
    let mut pending: Vec<InputIntent> = Vec::with_capacity(8);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() || gp.quit_pressed() {
            break;
        }

        // Edges between ticks queue up in order; the next step applies them all.
        pending.extend(tracker.edges(|k| kb.intent_held(k) || gp.intent_held(k)));

        if last_tick.elapsed() >= tick_rate {
            let events = step::step(world, &pending);
            pending.clear();
            log_events(&events);
            if let Some(sfx) = sound {
                sfx.play_events(&events);
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::RoomSolved { room } => info!(room = %room, "room solved"),
            GameEvent::GameComplete => info!("all rooms complete"),
            other => debug!(?other, "event"),
        }
    }
}
