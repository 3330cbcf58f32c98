use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::scene::Scene;

#[derive(Debug, Parser)]
pub struct Args {
    /// Primitives to draw
    #[arg(long, value_enum, default_value_t = SceneArg::Triangle)]
    pub scene: SceneArg,
    /// Initial window width
    #[arg(long, default_value_t = 800)]
    pub width: u32,
    /// Initial window height
    #[arg(long, default_value_t = 800)]
    pub height: u32,
    /// Read the vertex shader from a file instead of the built-in one
    #[arg(long)]
    pub vertex_shader: Option<PathBuf>,
    /// Read the fragment shader from a file instead of the built-in one
    #[arg(long)]
    pub fragment_shader: Option<PathBuf>,
    /// Present frames without waiting for vertical sync
    #[arg(long)]
    pub no_vsync: bool,
    /// Flush the GL command stream after every frame
    #[arg(long)]
    pub flush: bool,
    /// Log resource creation and viewport changes
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SceneArg {
    Triangle,
    Rectangles,
}

impl From<SceneArg> for Scene {
    fn from(s: SceneArg) -> Self {
        match s {
            SceneArg::Triangle => Self::Triangle,
            SceneArg::Rectangles => Self::Rectangles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_arguments() {
        let args = Args::try_parse_from(["primitive-viewer"]).unwrap();

        assert!(matches!(args.scene, SceneArg::Triangle));
        assert_eq!((args.width, args.height), (800, 800));
        assert!(args.vertex_shader.is_none());
        assert!(args.fragment_shader.is_none());
        assert!(!args.no_vsync);
    }

    #[test]
    fn parses_scene_and_shader_paths() {
        let args = Args::try_parse_from([
            "primitive-viewer",
            "--scene",
            "rectangles",
            "--fragment-shader",
            "fragment_core.glsl",
        ])
        .unwrap();

        assert_eq!(Scene::from(args.scene), Scene::Rectangles);
        assert_eq!(args.fragment_shader, Some(PathBuf::from("fragment_core.glsl")));
    }

    #[test]
    fn rejects_unknown_scene() {
        assert!(Args::try_parse_from(["primitive-viewer", "--scene", "cube"]).is_err());
    }
}
