use std::rc::Rc;

use crate::backend::GlBackend;
use crate::geometry::Geometry;
use crate::program::Program;

/// Polygon rasterization mode.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FillMode {
    #[default]
    Fill,
    Line,
}

pub struct GlRenderer {
    gl: Rc<dyn GlBackend>,
    current_program: u32,
    fill_mode: Option<FillMode>,
}

impl GlRenderer {
    pub fn new(gl: Rc<dyn GlBackend>) -> Self {
        Self {
            gl,
            current_program: 0,
            fill_mode: None,
        }
    }

    pub fn use_program(&mut self, program: &Program) {
        let p_id = program.id();
        if self.current_program != p_id {
            self.gl.use_program(p_id);
            self.current_program = p_id;
        }
    }

    pub fn draw(&mut self, geometry: &Geometry, program: &Program) {
        self.use_program(program);

        self.gl.bind_vertex_array(geometry.vao());
        match geometry.indices() {
            Some(count) => self.gl.draw_elements(count as i32),
            None => self.gl.draw_arrays(0, geometry.vertices() as i32),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    pub fn clear(&self, color: [f32; 4]) {
        self.gl.clear_color(color);
        self.gl.clear();
    }

    pub fn polygon_mode(&mut self, mode: FillMode) {
        if self.fill_mode != Some(mode) {
            self.gl.polygon_mode(mode);
            self.fill_mode = Some(mode);
        }
    }

    pub fn flush(&self) {
        self.gl.flush();
    }

    /// Forgets the cached program, e.g. after the program was dropped.
    pub fn reset(&mut self) {
        self.current_program = 0;
    }
}
