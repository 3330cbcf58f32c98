//! Headless [`GlBackend`] that keeps GL object state in memory and records
//! every call, so the wrappers can be exercised without a display or GPU.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CStr;

use crate::backend::{BufferTarget, GlBackend};
use crate::geometry::AttributeDescriptor;
use crate::program::ShaderStage;
use crate::renderer::FillMode;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader { id: u32, stage: ShaderStage },
    ShaderSource(u32),
    CompileShader { id: u32, stage: ShaderStage },
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    UseProgram(u32),
    DeleteProgram(u32),
    GenVertexArray(u32),
    BindVertexArray(u32),
    DeleteVertexArray(u32),
    GenBuffer(u32),
    BindBuffer { target: BufferTarget, buffer: u32 },
    BufferData { target: BufferTarget, len: usize },
    DeleteBuffer(u32),
    VertexAttribPointer(AttributeDescriptor),
    EnableVertexAttribArray(u32),
    DrawArrays { first: i32, count: i32 },
    DrawElements { count: i32 },
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    ClearColor([f32; 4]),
    Clear,
    PolygonMode(FillMode),
    Flush,
    /// Inserted by callers through [`RecordingGl::mark`].
    Marker(&'static str),
}

/// One draw call as the GPU would have seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub vao: u32,
    pub program: u32,
    pub indexed: bool,
    pub fill_mode: FillMode,
    /// Vertex numbers fed to the vertex stage, in submission order.
    pub invocations: Vec<u32>,
}

#[derive(Default)]
struct VertexArray {
    array_buffer: Option<u32>,
    element_buffer: Option<u32>,
}

struct Shader {
    stage: ShaderStage,
    source: String,
    log: Option<String>,
}

#[derive(Default)]
struct State {
    next_name: u32,
    calls: Vec<GlCall>,
    draws: Vec<Draw>,
    shaders: HashMap<u32, Shader>,
    programs: HashMap<u32, Option<String>>,
    vertex_arrays: HashMap<u32, VertexArray>,
    buffers: HashMap<u32, Vec<u8>>,
    bound_vao: u32,
    bound_array: u32,
    current_program: u32,
    fill_mode: FillMode,
    rejected_stages: Vec<(ShaderStage, String)>,
    rejected_link: Option<String>,
}

impl State {
    fn name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }
}

#[derive(Default)]
pub struct RecordingGl {
    state: RefCell<State>,
}

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later compile of `stage` fails with `log`.
    pub fn reject_stage(&self, stage: ShaderStage, log: &str) {
        self.state
            .borrow_mut()
            .rejected_stages
            .push((stage, log.to_string()));
    }

    /// Every later link fails with `log`.
    pub fn reject_link(&self, log: &str) {
        self.state.borrow_mut().rejected_link = Some(log.to_string());
    }

    pub fn mark(&self, label: &'static str) {
        self.state.borrow_mut().calls.push(GlCall::Marker(label));
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn draws(&self) -> Vec<Draw> {
        self.state.borrow().draws.clone()
    }

    pub fn is_live(&self, program: u32) -> bool {
        self.state.borrow().programs.contains_key(&program)
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    /// Floats held by the vertex buffer the vertex array sources attributes from.
    pub fn array_data(&self, vao: u32) -> Option<Vec<f32>> {
        let state = self.state.borrow();
        let buffer = state.vertex_arrays.get(&vao)?.array_buffer?;

        Some(
            state
                .buffers
                .get(&buffer)?
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Indices held by the element buffer attached to the vertex array.
    pub fn element_data(&self, vao: u32) -> Option<Vec<u32>> {
        let state = self.state.borrow();
        let buffer = state.vertex_arrays.get(&vao)?.element_buffer?;

        Some(read_indices(state.buffers.get(&buffer)?))
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn read_indices(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl GlBackend for RecordingGl {
    fn create_shader(&self, stage: ShaderStage) -> u32 {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.shaders.insert(
            id,
            Shader {
                stage,
                source: String::new(),
                log: None,
            },
        );
        state.calls.push(GlCall::CreateShader { id, stage });
        id
    }

    fn shader_source(&self, shader: u32, source: &CStr) {
        let mut state = self.state.borrow_mut();
        if let Some(s) = state.shaders.get_mut(&shader) {
            s.source = source.to_string_lossy().into_owned();
        }
        state.calls.push(GlCall::ShaderSource(shader));
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        let State {
            shaders,
            rejected_stages,
            calls,
            ..
        } = &mut *state;

        if let Some(s) = shaders.get_mut(&shader) {
            s.log = if let Some((_, log)) = rejected_stages.iter().find(|(st, _)| *st == s.stage)
            {
                Some(log.clone())
            } else if s.source.trim().is_empty() {
                Some("empty shader source".to_string())
            } else {
                None
            };

            calls.push(GlCall::CompileShader {
                id: shader,
                stage: s.stage,
            });
        }
    }

    fn get_shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map_or(false, |s| s.log.is_none())
    }

    fn get_shader_info_log(&self, shader: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .and_then(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader);
        state.calls.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.programs.insert(id, None);
        state.calls.push(GlCall::CreateProgram(id));
        id
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(GlCall::AttachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        let log = state.rejected_link.clone();
        if let Some(p) = state.programs.get_mut(&program) {
            *p = log;
        }
        state.calls.push(GlCall::LinkProgram(program));
    }

    fn get_program_link_status(&self, program: u32) -> bool {
        matches!(self.state.borrow().programs.get(&program), Some(None))
    }

    fn get_program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .cloned()
            .flatten()
            .unwrap_or_default()
    }

    fn use_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.current_program = program;
        state.calls.push(GlCall::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.current_program == program {
            state.current_program = 0;
        }
        state.calls.push(GlCall::DeleteProgram(program));
    }

    fn gen_vertex_array(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.vertex_arrays.insert(id, VertexArray::default());
        state.calls.push(GlCall::GenVertexArray(id));
        id
    }

    fn bind_vertex_array(&self, vao: u32) {
        let mut state = self.state.borrow_mut();
        state.bound_vao = vao;
        state.calls.push(GlCall::BindVertexArray(vao));
    }

    fn delete_vertex_array(&self, vao: u32) {
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&vao);
        if state.bound_vao == vao {
            state.bound_vao = 0;
        }
        state.calls.push(GlCall::DeleteVertexArray(vao));
    }

    fn gen_buffer(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        let id = state.name();
        state.buffers.insert(id, Vec::new());
        state.calls.push(GlCall::GenBuffer(id));
        id
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: u32) {
        let mut state = self.state.borrow_mut();
        match target {
            BufferTarget::Array => state.bound_array = buffer,
            BufferTarget::ElementArray => {
                let vao = state.bound_vao;
                if let Some(va) = state.vertex_arrays.get_mut(&vao) {
                    va.element_buffer = (buffer != 0).then_some(buffer);
                }
            }
        }
        state.calls.push(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let buffer = match target {
            BufferTarget::Array => Some(state.bound_array),
            BufferTarget::ElementArray => state
                .vertex_arrays
                .get(&state.bound_vao)
                .and_then(|va| va.element_buffer),
        };

        if let Some(b) = buffer {
            if let Some(contents) = state.buffers.get_mut(&b) {
                *contents = data.to_vec();
            }
        }
        state.calls.push(GlCall::BufferData {
            target,
            len: data.len(),
        });
    }

    fn delete_buffer(&self, buffer: u32) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        if state.bound_array == buffer {
            state.bound_array = 0;
        }
        state.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn vertex_attrib_pointer(&self, attribute: &AttributeDescriptor) {
        let mut state = self.state.borrow_mut();
        let (vao, array) = (state.bound_vao, state.bound_array);
        if let Some(va) = state.vertex_arrays.get_mut(&vao) {
            va.array_buffer = Some(array);
        }
        state.calls.push(GlCall::VertexAttribPointer(*attribute));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn draw_arrays(&self, first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        let draw = Draw {
            vao: state.bound_vao,
            program: state.current_program,
            indexed: false,
            fill_mode: state.fill_mode,
            invocations: (first..first + count).map(|i| i as u32).collect(),
        };
        state.draws.push(draw);
        state.calls.push(GlCall::DrawArrays { first, count });
    }

    fn draw_elements(&self, count: i32) {
        let mut state = self.state.borrow_mut();
        let indices = state
            .vertex_arrays
            .get(&state.bound_vao)
            .and_then(|va| va.element_buffer)
            .and_then(|b| state.buffers.get(&b))
            .map(|bytes| read_indices(bytes))
            .unwrap_or_default();

        let draw = Draw {
            vao: state.bound_vao,
            program: state.current_program,
            indexed: true,
            fill_mode: state.fill_mode,
            invocations: indices.into_iter().take(count as usize).collect(),
        };
        state.draws.push(draw);
        state.calls.push(GlCall::DrawElements { count });
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear_color(&self, color: [f32; 4]) {
        self.record(GlCall::ClearColor(color));
    }

    fn clear(&self) {
        self.record(GlCall::Clear);
    }

    fn polygon_mode(&self, mode: FillMode) {
        let mut state = self.state.borrow_mut();
        state.fill_mode = mode;
        state.calls.push(GlCall::PolygonMode(mode));
    }

    fn flush(&self) {
        self.record(GlCall::Flush);
    }
}
