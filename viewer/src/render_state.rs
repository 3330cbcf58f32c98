use gl_wrapper::renderer::FillMode;

/// Receives framebuffer size changes reported by the window.
pub trait ResizeHandler {
    fn framebuffer_resized(&mut self, width: u32, height: u32);
}

/// Mutable state read by the frame loop on every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub fill_mode: FillMode,
    pub clear_color: [f32; 4],
    viewport: (u32, u32),
    viewport_dirty: bool,
}

impl RenderState {
    pub fn new(clear_color: [f32; 4], width: u32, height: u32) -> Self {
        Self {
            fill_mode: FillMode::Fill,
            clear_color,
            viewport: (width, height),
            viewport_dirty: true,
        }
    }

    #[cfg(test)]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Returns the viewport once after every change, `None` otherwise.
    pub fn take_viewport_change(&mut self) -> Option<(u32, u32)> {
        if std::mem::take(&mut self.viewport_dirty) {
            Some(self.viewport)
        } else {
            None
        }
    }
}

impl ResizeHandler for RenderState {
    fn framebuffer_resized(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.viewport_dirty = true;
    }
}
