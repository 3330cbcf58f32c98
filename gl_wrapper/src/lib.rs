pub mod backend;
pub mod geometry;
pub mod program;
#[cfg(any(test, feature = "recording"))]
pub mod recording;
pub mod renderer;
