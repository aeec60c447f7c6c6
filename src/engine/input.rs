use std::collections::HashSet;

use winit::event::{ElementState, ModifiersState, VirtualKeyCode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        Modifiers {
            shift: state.shift(),
            ctrl: state.ctrl(),
            alt: state.alt(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    KeyPressed(VirtualKeyCode),
    KeyReleased(VirtualKeyCode),
    Char(char),
    MousePressed { x: f32, y: f32, modifiers: Modifiers },
    MouseReleased,
    MouseDragged { x: f32, y: f32 },
    Resized { width: u32, height: u32 },
}

#[derive(Hash, Eq, PartialEq, Debug)]
pub enum Action {
    ShutDown,
}

impl Action {
    pub fn from_key_code(keycode: VirtualKeyCode) -> Option<Self> {
        match keycode {
            VirtualKeyCode::Escape => Some(Action::ShutDown),

            _ => None,
        }
    }
}

impl InputEvent {
    pub fn from_event_state(state: ElementState, keycode: VirtualKeyCode) -> Self {
        match state {
            ElementState::Pressed => InputEvent::KeyPressed(keycode),
            ElementState::Released => InputEvent::KeyReleased(keycode),
        }
    }

    pub fn from_mouse_button(state: ElementState, cursor: (f64, f64), modifiers: Modifiers) -> Self {
        match state {
            ElementState::Pressed => InputEvent::MousePressed {
                x: cursor.0 as f32,
                y: cursor.1 as f32,
                modifiers,
            },
            ElementState::Released => InputEvent::MouseReleased,
        }
    }

    pub fn from_cursor_moved(x: f64, y: f64) -> Self {
        InputEvent::MouseDragged {
            x: x as f32,
            y: y as f32,
        }
    }
}

/// Characters flip their entry on every press; nothing is ever reset.
#[derive(Default, Debug)]
pub struct KeyToggles {
    active: HashSet<char>,
}

impl KeyToggles {
    pub fn new() -> Self {
        KeyToggles {
            active: HashSet::new(),
        }
    }

    /// Returns the new state of `key`.
    pub fn toggle(&mut self, key: char) -> bool {
        if self.active.remove(&key) {
            false
        } else {
            self.active.insert(key);
            true
        }
    }

    pub fn is_on(&self, key: char) -> bool {
        self.active.contains(&key)
    }
}

pub struct InputManager {
    actions: HashSet<Action>,
    pub toggles: KeyToggles,
    button_held: bool,
}

impl InputManager {
    pub fn new() -> Self {
        InputManager {
            actions: HashSet::new(),
            toggles: KeyToggles::new(),
            button_held: false,
        }
    }

    pub fn is_action_active(&self, action: &Action) -> bool {
        self.actions.contains(action)
    }

    pub fn is_button_held(&self) -> bool {
        self.button_held
    }

    /// Tracks held keys, the mouse button and character toggles.
    pub fn on_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyReleased(keycode) => {
                if let Some(action) = Action::from_key_code(*keycode) {
                    self.actions.remove(&action);
                }
            }

            InputEvent::KeyPressed(keycode) => {
                if let Some(action) = Action::from_key_code(*keycode) {
                    self.actions.insert(action);
                }
            }

            InputEvent::Char(key) => {
                let on = self.toggles.toggle(*key);
                log::debug!("Toggle '{key}' is now {}", if on { "on" } else { "off" });
            }

            InputEvent::MousePressed { .. } => self.button_held = true,
            InputEvent::MouseReleased => self.button_held = false,

            InputEvent::MouseDragged { .. } | InputEvent::Resized { .. } => {}
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
