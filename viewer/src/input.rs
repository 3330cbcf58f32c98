use winit::event::{ElementState, VirtualKeyCode};

use gl_wrapper::renderer::FillMode;

use crate::render_state::RenderState;

pub const EXIT_KEY: VirtualKeyCode = VirtualKeyCode::Escape;
pub const TOGGLE_KEY: VirtualKeyCode = VirtualKeyCode::F;

/// Physical state of the keys the viewer reacts to.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct KeyState {
    pub exit: bool,
    pub toggle: bool,
}

impl KeyState {
    /// Keys other than the exit and toggle keys are ignored.
    pub fn update(&mut self, key: VirtualKeyCode, state: ElementState) {
        let pressed = state == ElementState::Pressed;

        match key {
            EXIT_KEY => self.exit = pressed,
            TOGGLE_KEY => self.toggle = pressed,
            _ => (),
        }
    }
}

/// Latch set once an exit was asked for.
#[derive(Debug, Default)]
pub struct ExitSignal(bool);

impl ExitSignal {
    pub fn set(&mut self) {
        self.0 = true;
    }

    pub fn is_set(&self) -> bool {
        self.0
    }
}

/// Evaluated once per frame from the current key state. The fill mode follows
/// the toggle key level, not its presses.
pub fn handle_input(keys: &KeyState, render_state: &mut RenderState, exit: &mut ExitSignal) {
    if keys.exit {
        exit.set();
    }

    render_state.fill_mode = if keys.toggle {
        FillMode::Line
    } else {
        FillMode::Fill
    };
}
