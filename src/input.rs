use bevy::prelude::*;
use std::collections::HashSet;

/// Abstraction layer between raw input and the play loop.
/// Both the keyboard (windowed) and the API (headless) write to this.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<String>,
    pub just_pressed: HashSet<String>,
    pub just_released: HashSet<String>,
}

impl VirtualInput {
    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    /// Register a press for this frame, as the API does.
    pub fn press(&mut self, action: impl Into<String>) {
        let action = action.into();
        self.active.insert(action.clone());
        self.just_pressed.insert(action);
    }

    pub fn release(&mut self, action: &str) {
        if self.active.remove(action) {
            self.just_released.insert(action.to_string());
        }
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default())
            .add_systems(
                PreUpdate,
                keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
            )
            .add_systems(Last, clear_virtual_input);
    }
}

const BINDINGS: [(&str, [KeyCode; 2]); 4] = [
    ("up", [KeyCode::KeyW, KeyCode::ArrowUp]),
    ("down", [KeyCode::KeyS, KeyCode::ArrowDown]),
    ("left", [KeyCode::KeyA, KeyCode::ArrowLeft]),
    ("right", [KeyCode::KeyD, KeyCode::ArrowRight]),
];

/// Translate keyboard input to VirtualInput action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    // presses queued by the API survive until the end of the frame
    vinput.active.clear();
    for (action, keys) in BINDINGS {
        if keyboard.any_pressed(keys) {
            vinput.active.insert(action.into());
        }
        if keyboard.any_just_pressed(keys) {
            vinput.just_pressed.insert(action.into());
        }
        if keyboard.any_just_released(keys) {
            vinput.just_released.insert(action.into());
        }
    }
}

fn clear_virtual_input(mut vinput: ResMut<VirtualInput>) {
    vinput.just_pressed.clear();
    vinput.just_released.clear();
}
