use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::backend::GlBackend;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Shader text tagged with the stage it is meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    stage: ShaderStage,
    text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }

    pub fn vertex(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Vertex, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Fragment, text)
    }

    /// Reads the whole file as shader text. A missing or unreadable file is an
    /// error, never an empty source.
    pub fn from_file(stage: ShaderStage, path: impl AsRef<Path>) -> Result<Self, PBError> {
        let path = path.as_ref();

        let text = std::fs::read_to_string(path).map_err(|source| PBError::SourceRead {
            stage,
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self { stage, text })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

pub struct ProgramBuilder {
    vert: CString,
    frag: CString,
}

impl ProgramBuilder {
    pub fn new(vert: &ShaderSource, frag: &ShaderSource) -> Result<Self, PBError> {
        let vert = Self::checked_source(vert, ShaderStage::Vertex)?;
        let frag = Self::checked_source(frag, ShaderStage::Fragment)?;

        Ok(Self { vert, frag })
    }

    fn checked_source(src: &ShaderSource, expected: ShaderStage) -> Result<CString, PBError> {
        if src.stage != expected {
            return Err(PBError::StageMismatch {
                expected,
                found: src.stage,
            });
        }

        CString::new(src.text.as_str()).map_err(|_| PBError::InvalidSource(expected))
    }

    /// Compiles both stages and links them. Nothing is linked unless both
    /// stages compiled; intermediate shader objects never outlive this call.
    pub fn build(self, gl: &Rc<dyn GlBackend>) -> Result<Program, PBError> {
        let vert = compile(gl.as_ref(), ShaderStage::Vertex, &self.vert)?;

        let frag = match compile(gl.as_ref(), ShaderStage::Fragment, &self.frag) {
            Ok(frag) => frag,
            Err(e) => {
                gl.delete_shader(vert);
                return Err(e);
            }
        };

        let program = gl.create_program();
        gl.attach_shader(program, vert);
        gl.attach_shader(program, frag);
        gl.link_program(program);

        // the program keeps its own copy of the linked code
        gl.delete_shader(vert);
        gl.delete_shader(frag);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);

            return Err(PBError::Linking(log));
        }

        debug!("Linked shader program {program}");

        Ok(Program {
            id: program,
            gl: Rc::clone(gl),
        })
    }
}

fn compile(gl: &dyn GlBackend, stage: ShaderStage, src: &CString) -> Result<u32, PBError> {
    let shader = gl.create_shader(stage);

    gl.shader_source(shader, src.as_c_str());
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);

        return Err(PBError::Compilation { stage, log });
    }

    Ok(shader)
}

#[derive(Debug, Error)]
pub enum PBError {
    #[error("could not read {stage} shader from {path:?}: {source}")]
    SourceRead {
        stage: ShaderStage,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} shader source contains a NUL byte")]
    InvalidSource(ShaderStage),
    #[error("expected {expected} shader source, got {found}")]
    StageMismatch {
        expected: ShaderStage,
        found: ShaderStage,
    },
    #[error("{stage} shader failed to compile: {log}")]
    Compilation { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {0}")]
    Linking(String),
}

pub struct Program {
    id: u32,
    gl: Rc<dyn GlBackend>,
}

impl Program {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.gl.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{GlCall, RecordingGl};

    const VERT: &str = "#version 330 core\nvoid main() {}\n";
    const FRAG: &str = "#version 330 core\nout vec4 c;\nvoid main() { c = vec4(1.0); }\n";

    fn sources() -> (ShaderSource, ShaderSource) {
        (ShaderSource::vertex(VERT), ShaderSource::fragment(FRAG))
    }

    #[test]
    fn builds_program_and_releases_shaders() {
        let rec = Rc::new(RecordingGl::new());
        let gl: Rc<dyn GlBackend> = rec.clone();
        let (v, f) = sources();

        let program = ProgramBuilder::new(&v, &f).unwrap().build(&gl).unwrap();

        assert!(rec.is_live(program.id()));
        assert_eq!(rec.live_shaders(), 0);

        let id = program.id();
        drop(program);
        assert!(!rec.is_live(id));
    }

    #[test]
    fn vertex_failure_skips_fragment_and_link() {
        let rec = Rc::new(RecordingGl::new());
        rec.reject_stage(ShaderStage::Vertex, "0:1: syntax error");
        let gl: Rc<dyn GlBackend> = rec.clone();
        let (v, f) = sources();

        let err = ProgramBuilder::new(&v, &f).unwrap().build(&gl).err().unwrap();

        match err {
            PBError::Compilation { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert_eq!(log, "0:1: syntax error");
            }
            e => panic!("unexpected error {e}"),
        }

        let calls = rec.calls();
        assert!(!calls.iter().any(|c| matches!(c, GlCall::CreateProgram(_))));
        assert!(!calls.iter().any(|c| matches!(c, GlCall::LinkProgram(_))));
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, GlCall::CompileShader { .. }))
                .count(),
            1
        );
        assert_eq!(rec.live_shaders(), 0);
    }

    #[test]
    fn fragment_failure_reports_stage_without_link() {
        let rec = Rc::new(RecordingGl::new());
        rec.reject_stage(ShaderStage::Fragment, "undeclared identifier");
        let gl: Rc<dyn GlBackend> = rec.clone();
        let (v, f) = sources();

        let err = ProgramBuilder::new(&v, &f).unwrap().build(&gl).err().unwrap();

        assert!(matches!(
            err,
            PBError::Compilation {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert!(!rec
            .calls()
            .iter()
            .any(|c| matches!(c, GlCall::LinkProgram(_))));
        assert_eq!(rec.live_shaders(), 0);
    }

    #[test]
    fn empty_source_does_not_compile() {
        let rec = Rc::new(RecordingGl::new());
        let gl: Rc<dyn GlBackend> = rec.clone();

        let err = ProgramBuilder::new(&ShaderSource::vertex(""), &ShaderSource::fragment(FRAG))
            .unwrap()
            .build(&gl)
            .err()
            .unwrap();

        assert!(matches!(
            err,
            PBError::Compilation {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn link_failure_is_distinct() {
        let rec = Rc::new(RecordingGl::new());
        rec.reject_link("varying mismatch");
        let gl: Rc<dyn GlBackend> = rec.clone();
        let (v, f) = sources();

        let err = ProgramBuilder::new(&v, &f).unwrap().build(&gl).err().unwrap();

        assert!(matches!(err, PBError::Linking(ref log) if log == "varying mismatch"));
        assert_eq!(rec.live_programs(), 0);
        assert_eq!(rec.live_shaders(), 0);
    }

    #[test]
    fn swapped_stages_are_rejected() {
        let (v, f) = sources();

        assert!(matches!(
            ProgramBuilder::new(&f, &v),
            Err(PBError::StageMismatch {
                expected: ShaderStage::Vertex,
                found: ShaderStage::Fragment,
            })
        ));
    }

    #[test]
    fn nul_in_source_is_rejected() {
        let v = ShaderSource::vertex("void main() {}\0");
        let f = ShaderSource::fragment(FRAG);

        assert!(matches!(
            ProgramBuilder::new(&v, &f),
            Err(PBError::InvalidSource(ShaderStage::Vertex))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ShaderSource::from_file(ShaderStage::Fragment, "does/not/exist.glsl").unwrap_err();

        assert!(matches!(
            err,
            PBError::SourceRead {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }
}
