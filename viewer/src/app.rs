use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};

use glutin_winit::DisplayBuilder;

use raw_window_handle::HasRawWindowHandle;

use std::ffi::CString;
use std::num::NonZeroU32;
use std::rc::Rc;

use log::{info, warn};

use thiserror::Error;

use winit::dpi::{PhysicalSize, Size};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use gl_wrapper::backend::{GlBackend, LoadError, NativeGl};
use gl_wrapper::geometry::GBError;
use gl_wrapper::program::{PBError, ProgramBuilder, ShaderStage};
use gl_wrapper::renderer::GlRenderer;

use crate::args::Args;
use crate::frame_loop::{FrameLoop, FrameTarget, LoopState};
use crate::input::KeyState;
use crate::render_state::{RenderState, ResizeHandler};
use crate::scene::{Scene, CLEAR_COLOR};
use crate::shaders;

/// Requested OpenGL core profile version.
pub const GL_VERSION: (u8, u8) = (3, 3);
pub const WINDOW_TITLE: &str = "OpenGL";

pub struct App {
    event_loop: EventLoop<()>,
    target: GlTarget,
    frame_loop: FrameLoop,
}

impl App {
    pub fn new(args: &Args) -> Result<Self, AppError> {
        let event_loop = EventLoop::new();
        let window_builder = WindowBuilder::new()
            .with_inner_size(Size::Physical(PhysicalSize::new(args.width, args.height)))
            .with_resizable(true)
            .with_title(WINDOW_TITLE);
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));
        let template = ConfigTemplateBuilder::new()
            .with_depth_size(24)
            .with_stencil_size(8);

        let (window, gl_config) = display_builder
            .build(&event_loop, template, |mut configs| configs.next().unwrap())
            .map_err(|e| AppError::WindowCreate(e.to_string()))?;

        let window =
            window.ok_or_else(|| AppError::WindowCreate("no window was created".to_string()))?;

        let handle = Some(window.raw_window_handle());
        let gl_display = gl_config.display();

        let context_attr = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(GL_VERSION.0, GL_VERSION.1))))
            .build(handle);

        let gl_window = GlWindow::new(window, &gl_config)?;

        let gl_context = unsafe { gl_display.create_context(&gl_config, &context_attr)? }
            .make_current(&gl_window.surface)?;

        let swap_interval = if args.no_vsync {
            SwapInterval::DontWait
        } else {
            SwapInterval::Wait(NonZeroU32::MIN)
        };
        if let Err(e) = gl_window
            .surface
            .set_swap_interval(&gl_context, swap_interval)
        {
            warn!("Could not set swap interval: {e}");
        }

        let native = unsafe {
            NativeGl::load(|s| match CString::new(s) {
                Ok(name) => gl_display.get_proc_address(name.as_c_str()).cast(),
                Err(_) => std::ptr::null(),
            })?
        };

        let gl_info = native.info();
        info!("OpenGL Version: {}", gl_info.version);
        info!("GLSL Version: {}", gl_info.glsl_version);
        info!("Renderer: {}", gl_info.renderer);
        info!("Vendor: {}", gl_info.vendor);

        let gl: Rc<dyn GlBackend> = Rc::new(native);

        let mut frame_loop = build_frame_loop(&gl, args)?;

        // the window manager may not honour the requested size
        let size = gl_window.window.inner_size();
        frame_loop
            .render_state_mut()
            .framebuffer_resized(size.width, size.height);

        let target = GlTarget {
            context: gl_context,
            window: gl_window,
            close_requested: false,
        };

        Ok(Self {
            event_loop,
            target,
            frame_loop,
        })
    }

    pub fn run(self) -> ! {
        let Self {
            event_loop,
            target,
            mut frame_loop,
        } = self;

        let mut target = Some(target);
        let mut keys = KeyState::default();

        event_loop.run(move |event, _window_target, control_flow| {
            control_flow.set_poll();

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::Resized(size) => {
                        if let Some(target) = &target {
                            target.resize(size);
                        }
                        frame_loop
                            .render_state_mut()
                            .framebuffer_resized(size.width, size.height);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        if let Some(key) = input.virtual_keycode {
                            keys.update(key, input.state);
                        }
                    }
                    WindowEvent::CloseRequested => {
                        if let Some(target) = &mut target {
                            target.request_close();
                        }
                    }
                    _ => (),
                },
                Event::MainEventsCleared => {
                    let Some(current) = target.as_mut() else {
                        return;
                    };

                    if frame_loop.iterate(current, &keys) == LoopState::Terminated {
                        // surface, window and context go away here
                        target = None;
                        info!("Window closed after {} frames", frame_loop.frames());
                        control_flow.set_exit();
                    }
                }
                _ => (),
            }
        })
    }
}

/// Compiles the program and uploads the scene on the current context.
pub fn build_frame_loop(gl: &Rc<dyn GlBackend>, args: &Args) -> Result<FrameLoop, AppError> {
    let vert = shaders::load(ShaderStage::Vertex, args.vertex_shader.as_deref())?;
    let frag = shaders::load(ShaderStage::Fragment, args.fragment_shader.as_deref())?;

    let program = ProgramBuilder::new(&vert, &frag)?.build(gl)?;

    let scene: Scene = args.scene.into();
    let geometries = scene.build(gl)?;
    info!("Drawing {:?} with {} geometry objects", scene, geometries.len());

    Ok(FrameLoop::new(
        GlRenderer::new(Rc::clone(gl)),
        program,
        geometries,
        RenderState::new(CLEAR_COLOR, args.width, args.height),
    )
    .with_flush(args.flush))
}

// XXX the context must be dropped before the window and its surface.
struct GlTarget {
    context: PossiblyCurrentContext,
    window: GlWindow,
    close_requested: bool,
}

impl GlTarget {
    fn resize(&self, size: PhysicalSize<u32>) {
        if let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        {
            self.window.surface.resize(&self.context, width, height);
        }
    }
}

impl FrameTarget for GlTarget {
    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }

    fn swap_buffers(&mut self) {
        if let Err(e) = self.window.surface.swap_buffers(&self.context) {
            warn!("Failed to present frame: {e}");
        }
    }
}

pub struct GlWindow {
    // XXX the surface must be dropped before the window.
    pub surface: Surface<WindowSurface>,
    pub window: Window,
}

impl GlWindow {
    pub fn new(window: Window, config: &Config) -> Result<Self, AppError> {
        let (width, height): (u32, u32) = window.inner_size().into();
        let raw_window_handle = window.raw_window_handle();

        let (width, height) = match (NonZeroU32::new(width), NonZeroU32::new(height)) {
            (Some(w), Some(h)) => (w, h),
            _ => return Err(AppError::WindowCreate("window has zero size".to_string())),
        };

        let attrs =
            SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_window_handle, width, height);

        let surface = unsafe { config.display().create_window_surface(config, &attrs)? };

        Ok(Self { window, surface })
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Could not initialise OpenGL context: {0}")]
    ContextInit(#[from] glutin::error::Error),
    #[error("Could not create window: {0}")]
    WindowCreate(String),
    #[error("Could not load OpenGL functions: {0}")]
    ExtensionLoad(#[from] LoadError),
    #[error(transparent)]
    Program(#[from] PBError),
    #[error(transparent)]
    Geometry(#[from] GBError),
}
