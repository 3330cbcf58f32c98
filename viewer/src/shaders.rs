use std::path::Path;

use gl_wrapper::program::{PBError, ShaderSource, ShaderStage};

pub const POSITION_VERT: &str = include_str!("gl_shaders/position.vert.glsl");
pub const SOLID_FRAG: &str = include_str!("gl_shaders/solid.frag.glsl");

/// Built-in source for `stage`, or the contents of `path` when given.
pub fn load(stage: ShaderStage, path: Option<&Path>) -> Result<ShaderSource, PBError> {
    match path {
        Some(path) => ShaderSource::from_file(stage, path),
        None => Ok(ShaderSource::new(
            stage,
            match stage {
                ShaderStage::Vertex => POSITION_VERT,
                ShaderStage::Fragment => SOLID_FRAG,
            },
        )),
    }
}
