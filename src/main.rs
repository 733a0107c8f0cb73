mod api;
mod collisions;
mod components;
mod constants;
mod entities;
mod error;
mod events;
mod file_watcher;
mod flow_graph;
mod game_runtime;
mod grid;
mod input;
mod interpreter;
mod inventory;
mod persistence;
mod player;
mod render;
mod sequence;
mod store;

use bevy::prelude::*;
use components::{BoardConfig, HeadlessMode};
use std::path::PathBuf;

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    side_length: Option<usize>,
    default_background: Option<String>,
    level_path: Option<String>,
    api_port: Option<u16>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("EMOJIBOARD_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "board.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[Emojiboard] Loaded startup config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Emojiboard] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");
    let watch = args.iter().any(|a| a == "--watch");

    let startup_config = load_startup_config();

    let mut board = BoardConfig::default();
    if let Some(side) = startup_config.side_length {
        match grid::checked_cell_count(side) {
            Ok(_) => board.side_length = side,
            Err(e) => eprintln!("[Emojiboard] Ignoring side_length from board.json: {e}"),
        }
    }
    if let Some(bg) = startup_config.default_background {
        board.default_background = bg;
    }
    // Env vars override board.json values
    let level_path = env_override("EMOJIBOARD_LEVEL_PATH")
        .or(startup_config.level_path)
        .map(PathBuf::from)
        .unwrap_or_else(|| persistence::LevelPath::default().0);
    let api_port = match env_override("EMOJIBOARD_API_PORT").map(|v| v.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(e)) => {
            eprintln!("[Emojiboard] Ignoring EMOJIBOARD_API_PORT: {e}");
            startup_config.api_port.unwrap_or(constants::DEFAULT_API_PORT)
        }
        None => startup_config.api_port.unwrap_or(constants::DEFAULT_API_PORT),
    };

    let mut app = App::new();
    app.insert_resource(HeadlessMode(headless))
        .insert_resource(board);

    if headless {
        // Headless mode: no window, no rendering, just ECS + API
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::state::app::StatesPlugin);
        println!("[Emojiboard] Starting in HEADLESS mode");
    } else {
        let window_title = startup_config
            .window_title
            .unwrap_or_else(|| "Emojiboard".to_string());
        let window_width = startup_config.window_width.unwrap_or(720.0);
        let window_height = startup_config.window_height.unwrap_or(720.0);

        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: window_title,
                resolution: (window_width, window_height).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        app.add_systems(Startup, spawn_camera)
            .add_plugins(render::RenderPlugin);
        println!("[Emojiboard] Starting in WINDOWED mode");
    }

    app.add_plugins(input::InputPlugin)
        .add_plugins(events::GameEventsPlugin)
        .add_plugins(game_runtime::RuntimeStatePlugin)
        .add_plugins(player::PlayerPlugin)
        .add_plugins(persistence::LevelPlugin {
            path: level_path.clone(),
        })
        .add_plugins(interpreter::InterpreterPlugin);

    if watch {
        app.add_plugins(file_watcher::FileWatcherPlugin);
        println!("[Emojiboard] Watching {} for changes", level_path.display());
    }

    app.add_plugins(api::ApiPlugin {
        port: api_port,
        level_path,
    });

    app.run();
}
