use log::debug;

use gl_wrapper::geometry::Geometry;
use gl_wrapper::program::Program;
use gl_wrapper::renderer::GlRenderer;

use crate::input::{handle_input, ExitSignal, KeyState};
use crate::render_state::RenderState;

/// The per-frame part of the window/context.
pub trait FrameTarget {
    fn should_close(&self) -> bool;
    fn request_close(&mut self);
    fn swap_buffers(&mut self);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Exiting,
    Terminated,
}

pub struct FrameLoop {
    state: LoopState,
    renderer: GlRenderer,
    program: Option<Program>,
    geometries: Vec<Geometry>,
    render_state: RenderState,
    exit: ExitSignal,
    flush: bool,
    frames: u64,
}

impl FrameLoop {
    /// Activates `program` for every following draw.
    pub fn new(
        mut renderer: GlRenderer,
        program: Program,
        geometries: Vec<Geometry>,
        render_state: RenderState,
    ) -> Self {
        renderer.use_program(&program);

        Self {
            state: LoopState::Running,
            renderer,
            program: Some(program),
            geometries,
            render_state,
            exit: ExitSignal::default(),
            flush: false,
            frames: 0,
        }
    }

    /// Flush the GL command stream after every presented frame.
    pub fn with_flush(mut self, flush: bool) -> Self {
        self.flush = flush;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[cfg(test)]
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub fn render_state_mut(&mut self) -> &mut RenderState {
        &mut self.render_state
    }

    /// Runs one loop iteration. Close requests are only looked at here, before
    /// anything is drawn, so a started frame is always presented.
    pub fn iterate<T: FrameTarget>(&mut self, target: &mut T, keys: &KeyState) -> LoopState {
        if self.state == LoopState::Running {
            if target.should_close() || self.exit.is_set() {
                self.state = LoopState::Exiting;
            } else {
                self.frame(target, keys);
            }
        }

        if self.state == LoopState::Exiting {
            self.release();
            self.state = LoopState::Terminated;
        }

        self.state
    }

    fn frame<T: FrameTarget>(&mut self, target: &mut T, keys: &KeyState) {
        handle_input(keys, &mut self.render_state, &mut self.exit);
        if self.exit.is_set() {
            target.request_close();
        }

        self.renderer.polygon_mode(self.render_state.fill_mode);
        if let Some((width, height)) = self.render_state.take_viewport_change() {
            debug!("Viewport set to {width}x{height}");
            self.renderer.resize(width, height);
        }

        self.renderer.clear(self.render_state.clear_color);

        if let Some(program) = &self.program {
            for geometry in &self.geometries {
                self.renderer.draw(geometry, program);
            }
        }

        target.swap_buffers();

        if self.flush {
            self.renderer.flush();
        }

        self.frames += 1;
    }

    fn release(&mut self) {
        let geometries = self.geometries.len();
        self.geometries.clear();
        self.program = None;
        self.renderer.reset();

        debug!("Released program and {geometries} geometry objects");
    }
}
