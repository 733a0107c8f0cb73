mod command_runtime;
mod commands;
mod helpers;
mod router;
mod routes_core;
mod routes_misc;
mod routes_sequences;
mod security;
mod state;
pub mod types;

use axum::{
    extract::{Path as UrlPath, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::collisions::CollisionRule;
use crate::components::BoardConfig;
use crate::error::BoardError;
use crate::events::{GameEvent, GameEventBus};
use crate::flow_graph::{EdgeProps, FlowEdge, FlowNode};
use crate::game_runtime::{apply_action, RuntimeAction};
use crate::grid::EditableMap;
use crate::input::VirtualInput;
use crate::interpreter::{board_side, start_event, RunId, RunSummary};
use crate::inventory::Effector;
use crate::persistence::{parse_level, write_level_file, LevelFile, LevelWorld};
use crate::player::{perform_move, Direction, MoveReport, PlayWorld, Rules};
use crate::sequence::Sequence;
use command_runtime::*;
pub use commands::*;
use helpers::*;
use router::build_router;
use routes_core::*;
use routes_misc::*;
use routes_sequences::*;
use security::*;
use state::*;
use types::*;

pub struct ApiPlugin {
    pub port: u16,
    pub level_path: PathBuf,
}

impl Plugin for ApiPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = crossbeam_channel::unbounded::<ApiCommand>();
        let side_length = app
            .world()
            .get_resource::<BoardConfig>()
            .map(|c| c.side_length)
            .unwrap_or(crate::constants::DEFAULT_SIDE_LENGTH);

        app.insert_resource(ApiChannels { receiver: rx })
            .add_systems(Update, process_api_commands);

        let state = AppState {
            sender: tx,
            level_path: self.level_path.clone(),
            side_length,
        };
        let security = ApiSecurity::from_env();
        let port = self.port;
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("[Emojiboard API] Failed to start runtime: {e}");
                    return;
                }
            };
            rt.block_on(async {
                let app = build_router(state, security);

                let listener = match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
                    Ok(l) => l,
                    Err(e) => {
                        eprintln!("[Emojiboard API] Failed to bind to port {port}: {e}");
                        return;
                    }
                };

                println!("[Emojiboard API] Listening on http://127.0.0.1:{port}");

                if let Err(e) = axum::serve(listener, app).await {
                    eprintln!("[Emojiboard API] Server stopped: {e}");
                }
            });
        });
    }
}
