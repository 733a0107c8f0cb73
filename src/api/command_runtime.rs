
use super::*;
use bevy::ecs::system::SystemParam;

/// Commands handled per frame; the rest wait for the next one.
const MAX_COMMANDS_PER_FRAME: usize = 64;

#[derive(SystemParam)]
pub(super) struct ApiRuntimeCtx<'w> {
    channels: Res<'w, ApiChannels>,
    config: Res<'w, BoardConfig>,
    level: LevelWorld<'w>,
    event_bus: ResMut<'w, GameEventBus>,
    input: Res<'w, VirtualInput>,
}

pub(super) fn process_api_commands(ctx: ApiRuntimeCtx) {
    let ApiRuntimeCtx {
        channels,
        config,
        mut level,
        mut event_bus,
        input,
    } = ctx;
    let side = board_side(&config, &level.map);

    for cmd in channels.receiver.try_iter().take(MAX_COMMANDS_PER_FRAME) {
        match cmd {
            ApiCommand::GetMap(tx) => {
                let _ = tx.send(level.map.clone());
            }
            ApiCommand::EditMap(edit, tx) => {
                let result = match &edit {
                    MapEdit::Paint { index, background } => level.map.paint(*index, background),
                    MapEdit::Erase { index } => level.map.erase(*index),
                    MapEdit::Spawn { index, emoji } => level.map.spawn(*index, emoji),
                    MapEdit::Destroy { index } => level.map.destroy(*index),
                    MapEdit::Tint { index, color } => level
                        .map
                        .cell(*index)
                        .and_then(|cell| level.map.set_color(cell, color))
                        .inspect(|_| {
                            level.palette.add_color(color);
                        }),
                };
                if let Err(e) = &result {
                    warn!("[Emojiboard API] Map edit {:?} rejected: {}", edit, e);
                }
                let _ = tx.send(result.map_err(|e| e.to_string()));
            }
            ApiCommand::GetPalette(tx) => {
                let _ = tx.send(level.palette.0.iter().cloned().collect());
            }
            ApiCommand::EditPalette(req, tx) => {
                if req.remove {
                    level.palette.remove_color(&req.color);
                } else {
                    level.palette.add_color(&req.color);
                }
                let _ = tx.send(level.palette.0.iter().cloned().collect());
            }
            ApiCommand::GetStatics(tx) => {
                let _ = tx.send(level.statics.0.iter().cloned().collect());
            }
            ApiCommand::ToggleStatic(req, tx) => {
                level.statics.toggle(&req.emoji, req.add);
                let _ = tx.send(level.statics.0.iter().cloned().collect());
            }
            ApiCommand::GetCollisions(tx) => {
                let _ = tx.send(level.collisions.rules());
            }
            ApiCommand::SetCollision(req, tx) => {
                let result = if req.a.is_empty() || req.b.is_empty() {
                    Err("collision needs two entity ids".to_string())
                } else {
                    level.collisions.set(&req.a, &req.b, req.kind);
                    Ok(())
                };
                let _ = tx.send(result);
            }
            ApiCommand::RemoveCollision(req, tx) => {
                let _ = tx.send(level.collisions.remove(&req.a, &req.b).is_some());
            }
            ApiCommand::GetEvents(tx) => {
                let _ = tx.send(level.events.entries().clone());
            }
            ApiCommand::AddEvent(sequence, tx) => {
                // reject what would fail at play time
                let result = match sequence.compile(side) {
                    Ok(_) => Ok(level.events.add(*sequence)),
                    Err(e) => Err(e.to_string()),
                };
                let _ = tx.send(result);
            }
            ApiCommand::UpdateEvent(key, sequence, tx) => {
                let result = if level.events.get(&key).is_none() {
                    Err(format!("no event '{key}'"))
                } else {
                    match sequence.compile(side) {
                        Ok(_) => {
                            level.events.update(&key, *sequence);
                            Ok(())
                        }
                        Err(e) => Err(e.to_string()),
                    }
                };
                let _ = tx.send(result);
            }
            ApiCommand::PlaySequence(req, tx) => {
                let result = match (req.event, req.sequence) {
                    (Some(key), _) => start_event(
                        &mut level.runner,
                        &level.events,
                        &mut event_bus,
                        &key,
                        side,
                    ),
                    (None, Some(req)) => req.into_sequence().and_then(|sequence| {
                        level.runner.start(&sequence, side).inspect(|run| {
                            event_bus.emit(
                                "sequence_started",
                                serde_json::json!({ "run": run, "name": sequence.name }),
                                None,
                            );
                        })
                    }),
                    (None, None) => Err(BoardError::config("give an event key or a sequence")),
                };
                let _ = tx.send(result.map_err(|e| e.to_string()));
            }
            ApiCommand::CancelSequence(id, tx) => {
                let cancelled = level.runner.cancel(id);
                if cancelled {
                    event_bus.emit("sequence_cancelled", serde_json::json!({ "run": id }), None);
                }
                let _ = tx.send(cancelled);
            }
            ApiCommand::ListSequences(tx) => {
                let _ = tx.send(level.runner.summaries());
            }
            ApiCommand::GetFlowEdges(tx) => {
                let _ = tx.send(level.flow.derive_edges().map_err(|e| e.to_string()));
            }
            ApiCommand::AddFlowNode(node, tx) => {
                let _ = tx.send(level.flow.add_node(*node).map_err(|e| e.to_string()));
            }
            ApiCommand::RemoveFlowNode(id, tx) => {
                let _ = tx.send(level.flow.remove_node(&id).is_some());
            }
            ApiCommand::ConnectFlow(edge, tx) => {
                let _ = tx.send(level.flow.connect(edge).map_err(|e| e.to_string()));
            }
            ApiCommand::DisconnectFlow(id, tx) => {
                let _ = tx.send(level.flow.disconnect(&id).is_some());
            }
            ApiCommand::GetPlayer(tx) => {
                let mut held: Vec<String> = input.active.iter().cloned().collect();
                held.sort();
                let _ = tx.send(PlayerView {
                    state: level.player.clone(),
                    entity: level.player.as_entity(),
                    held,
                });
            }
            ApiCommand::MovePlayer(direction, tx) => {
                let result = if level.runtime.is_playing() {
                    move_player(&mut level, &mut event_bus, direction, side)
                } else {
                    Err(format!(
                        "player moves only while playing (phase is {:?})",
                        level.runtime.phase
                    ))
                };
                let _ = tx.send(result);
            }
            ApiCommand::UseItem(slot, tx) => {
                let result = if level.runtime.is_playing() {
                    level
                        .player
                        .inventory
                        .use_item_at(slot)
                        .ok_or_else(|| format!("slot {slot} is empty"))
                } else {
                    Err(format!(
                        "items are used only while playing (phase is {:?})",
                        level.runtime.phase
                    ))
                };
                if let Ok(item) = &result {
                    event_bus.emit(
                        "item_used",
                        serde_json::json!({ "slot": slot, "emoji": item.emoji }),
                        None,
                    );
                }
                let _ = tx.send(result);
            }
            ApiCommand::DropItem(slot, tx) => {
                let _ = tx.send(level.player.inventory.remove_item_at(slot));
            }
            ApiCommand::GetRuntime(tx) => {
                let _ = tx.send(level.runtime.snapshot());
            }
            ApiCommand::Runtime(action, tx) => {
                let LevelWorld {
                    runtime,
                    map,
                    player,
                    health,
                    runner,
                    ..
                } = &mut level;
                apply_action(
                    action,
                    runtime,
                    map,
                    player,
                    health,
                    runner,
                    &mut event_bus,
                );
                println!("[Emojiboard API] Runtime {:?} -> {:?}", action, runtime.phase);
                let _ = tx.send(runtime.snapshot());
            }
            ApiCommand::GetLevel(tx) => {
                let _ = tx.send(level.capture());
            }
            ApiCommand::LoadLevel(file, tx) => {
                level.apply(*file);
                event_bus.emit("level_loaded", serde_json::json!({ "source": "api" }), None);
                let _ = tx.send(());
            }
            ApiCommand::GetBus(since, tx) => {
                let events = event_bus.since(since.unwrap_or(0)).cloned().collect();
                let _ = tx.send(events);
            }
        }
    }
}

fn move_player(
    level: &mut LevelWorld,
    bus: &mut GameEventBus,
    direction: Direction,
    side: usize,
) -> Result<MoveReport, String> {
    let LevelWorld {
        map,
        player,
        health,
        runner,
        collisions,
        interactables,
        conditions,
        controllables,
        flow,
        statics,
        events,
        ..
    } = level;
    let rules = Rules {
        collisions,
        interactables,
        conditions,
        flow,
        statics,
    };
    let world = PlayWorld {
        map,
        player,
        health,
        controllables,
    };
    perform_move(direction, world, &rules, events, runner, bus, side)
        .map_err(|e| e.to_string())
}
