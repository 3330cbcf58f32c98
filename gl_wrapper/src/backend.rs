use std::ffi::{c_char, c_void, CStr};

use thiserror::Error;

use crate::geometry::AttributeDescriptor;
use crate::program::ShaderStage;
use crate::renderer::FillMode;

/// The subset of OpenGL used by the wrappers, one method per entry point.
///
/// Object names are the raw `u32` handles GL hands out. Implementations are
/// expected to be used from the thread owning the current context only.
pub trait GlBackend {
    fn create_shader(&self, stage: ShaderStage) -> u32;
    fn shader_source(&self, shader: u32, source: &CStr);
    fn compile_shader(&self, shader: u32);
    fn get_shader_compile_status(&self, shader: u32) -> bool;
    fn get_shader_info_log(&self, shader: u32) -> String;
    fn delete_shader(&self, shader: u32);

    fn create_program(&self) -> u32;
    fn attach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn get_program_link_status(&self, program: u32) -> bool;
    fn get_program_info_log(&self, program: u32) -> String;
    fn use_program(&self, program: u32);
    fn delete_program(&self, program: u32);

    fn gen_vertex_array(&self) -> u32;
    fn bind_vertex_array(&self, vao: u32);
    fn delete_vertex_array(&self, vao: u32);

    fn gen_buffer(&self) -> u32;
    fn bind_buffer(&self, target: BufferTarget, buffer: u32);
    /// Uploads `data` into the buffer bound to `target` with a static usage hint.
    fn buffer_data(&self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&self, buffer: u32);

    fn vertex_attrib_pointer(&self, attribute: &AttributeDescriptor);
    fn enable_vertex_attrib_array(&self, index: u32);

    fn draw_arrays(&self, first: i32, count: i32);
    /// Indexed triangle draw reading `u32` indices from the bound element buffer.
    fn draw_elements(&self, count: i32);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, color: [f32; 4]);
    /// Clears color, depth and stencil.
    fn clear(&self);
    fn polygon_mode(&self, mode: FillMode);
    fn flush(&self);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    fn gl_enum(self) -> u32 {
        match self {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("OpenGL entry point {0} could not be loaded")]
    Missing(&'static str),
}

/// Driver strings reported by the current context.
#[derive(Debug, Clone, Default)]
pub struct GlInfo {
    pub version: String,
    pub glsl_version: String,
    pub renderer: String,
    pub vendor: String,
}

/// Backend forwarding to the global `gl` function pointers.
pub struct NativeGl {
    _private: (),
}

impl NativeGl {
    /// Loads GL function pointers through `loader` and checks that every entry
    /// point the backend uses resolved.
    ///
    /// # Safety
    ///
    /// A GL context must be current on the calling thread, and stay current
    /// for as long as the returned backend is used.
    pub unsafe fn load<F>(loader: F) -> Result<Self, LoadError>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);

        let required: [(&'static str, bool); 14] = [
            ("glCreateShader", gl::CreateShader::is_loaded()),
            ("glCompileShader", gl::CompileShader::is_loaded()),
            ("glCreateProgram", gl::CreateProgram::is_loaded()),
            ("glLinkProgram", gl::LinkProgram::is_loaded()),
            ("glUseProgram", gl::UseProgram::is_loaded()),
            ("glGenVertexArrays", gl::GenVertexArrays::is_loaded()),
            ("glBindVertexArray", gl::BindVertexArray::is_loaded()),
            ("glGenBuffers", gl::GenBuffers::is_loaded()),
            ("glBufferData", gl::BufferData::is_loaded()),
            ("glVertexAttribPointer", gl::VertexAttribPointer::is_loaded()),
            ("glDrawArrays", gl::DrawArrays::is_loaded()),
            ("glDrawElements", gl::DrawElements::is_loaded()),
            ("glPolygonMode", gl::PolygonMode::is_loaded()),
            ("glClear", gl::Clear::is_loaded()),
        ];

        if let Some((name, _)) = required.iter().find(|(_, loaded)| !loaded) {
            return Err(LoadError::Missing(*name));
        }

        Ok(Self { _private: () })
    }

    pub fn info(&self) -> GlInfo {
        GlInfo {
            version: get_string(gl::VERSION),
            glsl_version: get_string(gl::SHADING_LANGUAGE_VERSION),
            renderer: get_string(gl::RENDERER),
            vendor: get_string(gl::VENDOR),
        }
    }
}

fn get_string(name: u32) -> String {
    unsafe {
        let ptr = gl::GetString(name);
        if ptr.is_null() {
            return String::new();
        }

        CStr::from_ptr(ptr as *const c_char)
            .to_string_lossy()
            .into_owned()
    }
}

/// Cuts a fixed size info log buffer at the first NUL.
fn log_from_buf(buf: &[u8]) -> String {
    let data = buf.split(|a| *a == 0).next().unwrap_or(buf);

    String::from_utf8_lossy(data).trim_end().to_string()
}

const INFO_LOG_LEN: usize = 1024;

impl GlBackend for NativeGl {
    fn create_shader(&self, stage: ShaderStage) -> u32 {
        unsafe { gl::CreateShader(stage.gl_enum()) }
    }

    fn shader_source(&self, shader: u32, source: &CStr) {
        unsafe {
            gl::ShaderSource(
                shader,
                1,
                (&source.as_ptr()) as *const *const c_char,
                std::ptr::null(),
            );
        }
    }

    fn compile_shader(&self, shader: u32) {
        unsafe { gl::CompileShader(shader) }
    }

    fn get_shader_compile_status(&self, shader: u32) -> bool {
        let mut success: i32 = 0;
        unsafe {
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, (&mut success) as *mut i32);
        }
        success == gl::TRUE as i32
    }

    fn get_shader_info_log(&self, shader: u32) -> String {
        let mut buf = [0_u8; INFO_LOG_LEN];
        unsafe {
            gl::GetShaderInfoLog(
                shader,
                INFO_LOG_LEN as i32,
                std::ptr::null_mut(),
                buf.as_mut_ptr() as *mut c_char,
            );
        }
        log_from_buf(&buf)
    }

    fn delete_shader(&self, shader: u32) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&self) -> u32 {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn link_program(&self, program: u32) {
        unsafe { gl::LinkProgram(program) }
    }

    fn get_program_link_status(&self, program: u32) -> bool {
        let mut success: i32 = 0;
        unsafe {
            gl::GetProgramiv(program, gl::LINK_STATUS, (&mut success) as *mut i32);
        }
        success == gl::TRUE as i32
    }

    fn get_program_info_log(&self, program: u32) -> String {
        let mut buf = [0_u8; INFO_LOG_LEN];
        unsafe {
            gl::GetProgramInfoLog(
                program,
                INFO_LOG_LEN as i32,
                std::ptr::null_mut(),
                buf.as_mut_ptr() as *mut c_char,
            );
        }
        log_from_buf(&buf)
    }

    fn use_program(&self, program: u32) {
        unsafe { gl::UseProgram(program) }
    }

    fn delete_program(&self, program: u32) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn gen_vertex_array(&self) -> u32 {
        let mut vao = 0;
        unsafe { gl::GenVertexArrays(1, (&mut vao) as *mut u32) };
        vao
    }

    fn bind_vertex_array(&self, vao: u32) {
        unsafe { gl::BindVertexArray(vao) }
    }

    fn delete_vertex_array(&self, vao: u32) {
        unsafe { gl::DeleteVertexArrays(1, (&vao) as *const u32) }
    }

    fn gen_buffer(&self) -> u32 {
        let mut buffer = 0;
        unsafe { gl::GenBuffers(1, (&mut buffer) as *mut u32) };
        buffer
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: u32) {
        unsafe { gl::BindBuffer(target.gl_enum(), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        unsafe {
            gl::BufferData(
                target.gl_enum(),
                data.len() as isize,
                data.as_ptr() as *const c_void,
                gl::STATIC_DRAW,
            );
        }
    }

    fn delete_buffer(&self, buffer: u32) {
        unsafe { gl::DeleteBuffers(1, (&buffer) as *const u32) }
    }

    fn vertex_attrib_pointer(&self, attribute: &AttributeDescriptor) {
        unsafe {
            gl::VertexAttribPointer(
                attribute.index,
                attribute.components as i32,
                gl::FLOAT,
                if attribute.normalized {
                    gl::TRUE
                } else {
                    gl::FALSE
                },
                attribute.stride as i32,
                attribute.offset as *const c_void,
            );
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { gl::EnableVertexAttribArray(index) }
    }

    fn draw_arrays(&self, first: i32, count: i32) {
        unsafe { gl::DrawArrays(gl::TRIANGLES, first, count) }
    }

    fn draw_elements(&self, count: i32) {
        unsafe { gl::DrawElements(gl::TRIANGLES, count, gl::UNSIGNED_INT, std::ptr::null()) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { gl::Viewport(x, y, width, height) }
    }

    fn clear_color(&self, color: [f32; 4]) {
        unsafe { gl::ClearColor(color[0], color[1], color[2], color[3]) }
    }

    fn clear(&self) {
        unsafe { gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT) }
    }

    fn polygon_mode(&self, mode: FillMode) {
        let mode = match mode {
            FillMode::Fill => gl::FILL,
            FillMode::Line => gl::LINE,
        };
        unsafe { gl::PolygonMode(gl::FRONT_AND_BACK, mode) }
    }

    fn flush(&self) {
        unsafe { gl::Flush() }
    }
}
