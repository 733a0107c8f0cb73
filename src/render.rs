use bevy::color::Srgba;
use bevy::prelude::*;

use crate::components::*;
use crate::grid::{CellId, EditableMap};
use crate::player::PlayerState;

/// Draws the board in windowed mode: a tile per cell, an emoji glyph per
/// item and the player on top.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(BoardLayout::default()).add_systems(
            Update,
            (rebuild_board, sync_cells, sync_player_glyph).chain(),
        );
    }
}

/// Side length the spawned tiles were built for.
#[derive(Resource, Default)]
struct BoardLayout {
    side: usize,
}

/// Parse `#rrggbb` style colours, falling back to grey.
pub fn board_color(hex: &str) -> Color {
    Srgba::hex(hex)
        .map(Color::from)
        .unwrap_or(Color::srgb(0.9, 0.9, 0.9))
}

/// World position of a cell centre with the board centred on the origin.
pub fn cell_translation(cell: CellId, side: usize, cell_size: f32) -> Vec2 {
    let half = (side as f32 - 1.0) / 2.0;
    Vec2::new(
        (cell.col as f32 - half) * cell_size,
        (half - cell.row as f32) * cell_size,
    )
}

fn rebuild_board(
    mut commands: Commands,
    mut layout: ResMut<BoardLayout>,
    headless: Res<HeadlessMode>,
    config: Res<BoardConfig>,
    map: Res<EditableMap>,
    tiles: Query<Entity, Or<(With<CellTile>, With<ItemGlyph>, With<PlayerGlyph>)>>,
) {
    if headless.0 || layout.side == map.side_length {
        return;
    }
    for entity in &tiles {
        commands.entity(entity).despawn();
    }
    layout.side = map.side_length;

    let side = map.side_length;
    let size = config.cell_size;
    for index in 0..side * side {
        let cell = CellId::new(index / side, index % side);
        let pos = cell_translation(cell, side, size);
        commands.spawn((
            CellTile { index },
            Sprite::from_color(board_color(map.background_at(cell)), Vec2::splat(size - 2.0)),
            Transform::from_xyz(pos.x, pos.y, 0.0),
        ));
        commands.spawn((
            ItemGlyph { index },
            Text2d::new(String::new()),
            TextFont {
                font_size: size * 0.7,
                ..default()
            },
            Transform::from_xyz(pos.x, pos.y, 1.0),
        ));
    }
    commands.spawn((
        PlayerGlyph,
        Text2d::new(String::new()),
        TextFont {
            font_size: size * 0.8,
            ..default()
        },
        TextColor(Color::BLACK),
        Transform::from_xyz(0.0, 0.0, 2.0),
    ));
}

fn sync_cells(
    map: Res<EditableMap>,
    layout: Res<BoardLayout>,
    mut tiles: Query<(&CellTile, &mut Sprite)>,
    mut glyphs: Query<(&ItemGlyph, &mut Text2d, &mut TextColor)>,
) {
    if !(map.is_changed() || layout.is_changed()) || layout.side == 0 {
        return;
    }
    let side = layout.side;
    for (tile, mut sprite) in &mut tiles {
        let cell = CellId::new(tile.index / side, tile.index % side);
        sprite.color = board_color(map.background_at(cell));
    }
    for (glyph, mut text, mut color) in &mut glyphs {
        let cell = CellId::new(glyph.index / side, glyph.index % side);
        text.0 = map.item_at(cell).unwrap_or_default().to_string();
        color.0 = map
            .colors
            .get(&cell)
            .map(|c| board_color(c))
            .unwrap_or(Color::BLACK);
    }
}

fn sync_player_glyph(
    player: Res<PlayerState>,
    config: Res<BoardConfig>,
    layout: Res<BoardLayout>,
    mut glyph: Query<(&mut Text2d, &mut Transform), With<PlayerGlyph>>,
) {
    if !player.is_changed() && !layout.is_changed() {
        return;
    }
    let pos = cell_translation(player.cell, layout.side, config.cell_size);
    for (mut text, mut transform) in &mut glyph {
        text.0 = player.emoji.clone();
        transform.translation.x = pos.x;
        transform.translation.y = pos.y;
    }
}
