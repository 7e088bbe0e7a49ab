use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mandelbrot::navigator::SEAHORSE_VALLEY;
use mandelbrot::shared::glam::Vec2;
use mandelbrot::shared::ViewportTransform;
use mandelbrot::{
    Action, CpuCompute, EngineConfig, EngineError, FrameParams, GpuCompute, Navigator,
    PixelSurface, RenderEngine,
};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

#[derive(Parser)]
#[command(name = "mandelbrot")]
#[command(about = "Real-time Mandelbrot explorer")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SPIR-V module built from the shader crate
    #[arg(short, long)]
    shader: Option<PathBuf>,

    #[arg(short, long)]
    fullscreen: bool,

    /// Zoom in and out on its own
    #[arg(short, long)]
    autopilot: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Renders one frame on the CPU and saves it as a PNG
    Snapshot {
        out: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut params = config.frame_params();
    if args.autopilot {
        let scale = params.transform().scale();
        params.set_transform(ViewportTransform::from_center_scale(SEAHORSE_VALLEY, scale));
    }

    match &args.cmd {
        Some(Cmd::Snapshot { out, width, height }) => {
            snapshot(&config, params, out, *width, *height)
        }
        None => run(&args, &config, params),
    }
}

fn snapshot(
    config: &EngineConfig,
    params: FrameParams,
    out: &Path,
    width: u32,
    height: u32,
) -> Result<()> {
    let compute: CpuCompute = CpuCompute::new(config.cpu.threads)?;
    let mut engine = RenderEngine::with_params(width as f32, height as f32, params);
    engine.bind(PixelSurface::new(), compute)?;
    engine.on_frame_tick()?;

    let surface = engine
        .surface()
        .context("engine lost its surface after rendering")?;
    let extent = engine.extent();
    let bytes = surface.pixels().iter().flatten().copied().collect::<Vec<u8>>();
    let image = image::RgbaImage::from_raw(extent.width, extent.height, bytes)
        .context("frame does not match its extent")?;
    image
        .save(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    log::info!("saved {extent} snapshot to {} ({})", out.display(), engine.params());
    Ok(())
}

#[cfg(feature = "spirv")]
fn embedded_shader() -> Result<wgpu::ShaderModuleDescriptor<'static>> {
    Ok(mandelbrot::backend::embedded_shader())
}

#[cfg(not(feature = "spirv"))]
fn embedded_shader() -> Result<wgpu::ShaderModuleDescriptor<'static>> {
    anyhow::bail!("this build has no embedded shader, pass --shader <module.spv>")
}

fn action_for(key: VirtualKeyCode) -> Option<Action> {
    Some(match key {
        VirtualKeyCode::W => Action::PanUp,
        VirtualKeyCode::S => Action::PanDown,
        VirtualKeyCode::A => Action::PanLeft,
        VirtualKeyCode::D => Action::PanRight,
        VirtualKeyCode::Space => Action::Zoom,
        VirtualKeyCode::Plus | VirtualKeyCode::Equals | VirtualKeyCode::NumpadAdd => {
            Action::MoreIterations
        }
        VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => Action::FewerIterations,
        VirtualKeyCode::X => Action::RaiseThreshold,
        VirtualKeyCode::Z => Action::LowerThreshold,
        _ => return None,
    })
}

fn run(args: &Args, config: &EngineConfig, params: FrameParams) -> Result<()> {
    let event_loop = EventLoop::new();

    let mut builder = WindowBuilder::new().with_title("Mandelbrot");
    if args.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = builder.build(&event_loop)?;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    // SAFETY: the window outlives the surface, both move into the event loop.
    let surface = unsafe { instance.create_surface(&window) }?;

    let bytes;
    let shader = match &args.shader {
        Some(path) => {
            bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            mandelbrot::backend::spirv_shader(&bytes)?
        }
        None => embedded_shader()?,
    };
    let (compute, surface) = GpuCompute::new(&instance, surface, shader, &config.gpu_options())?;

    let size = window.inner_size().to_logical::<f32>(window.scale_factor());
    let mut engine = RenderEngine::with_params(size.width, size.height, params);
    engine.set_scale_factor(window.scale_factor() as f32)?;
    engine.bind(surface, compute)?;

    let navigator = Rc::new(RefCell::new(if args.autopilot {
        Navigator::autopilot()
    } else {
        Navigator::new()
    }));
    let hook_navigator = Rc::clone(&navigator);
    engine.set_frame_hook(move |engine| {
        if hook_navigator.borrow_mut().step(engine.params_mut()) {
            log::trace!("{}", engine.params());
        }
    });

    let mut cursor = Vec2::ZERO;

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == window.id() => match event {
            WindowEvent::Resized(size) => {
                let size = size.to_logical::<f32>(window.scale_factor());
                if let Err(error) = engine.resize(size.width, size.height) {
                    log::warn!("{error}");
                }
            }
            WindowEvent::ScaleFactorChanged {
                scale_factor,
                new_inner_size,
            } => {
                let size = new_inner_size.to_logical::<f32>(*scale_factor);
                let result = engine
                    .set_scale_factor(*scale_factor as f32)
                    .and_then(|()| engine.resize(size.width, size.height));
                if let Err(error) = result {
                    log::warn!("{error}");
                }
            }
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(VirtualKeyCode::Escape),
                        ..
                    },
                ..
            } => *control_flow = ControlFlow::Exit,
            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => cursor = Vec2::new(*x as f32, *y as f32),
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => match (state, key) {
                (ElementState::Pressed, VirtualKeyCode::R) => {
                    navigator.borrow_mut().toggle_zoom_direction()
                }
                (ElementState::Pressed, VirtualKeyCode::P) => {
                    let paused = !engine.is_paused();
                    if let Err(error) = engine.set_paused(paused) {
                        log::warn!("{error}");
                    }
                }
                (ElementState::Pressed, VirtualKeyCode::H) => {
                    log::info!("{:?}: {}", engine.state(), engine.params())
                }
                (ElementState::Pressed, key) => {
                    if let Some(action) = action_for(*key) {
                        navigator.borrow_mut().press(action);
                    }
                }
                (ElementState::Released, key) => {
                    if let Some(action) = action_for(*key) {
                        navigator.borrow_mut().release(action);
                    }
                }
            },
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => {
                let factor = match button {
                    MouseButton::Left => 0.5,
                    MouseButton::Right => 2.0,
                    _ => return,
                };
                let pivot = engine.complex_at(cursor);
                engine.params_mut().zoom(factor, pivot);
            }
            _ => {}
        },
        Event::RedrawRequested(window_id) if window_id == window.id() => {
            match engine.on_frame_tick() {
                Ok(_) => {}
                Err(EngineError::Resource(error)) => log::warn!("dropped frame: {error}"),
                Err(error) => {
                    log::error!("{error}");
                    *control_flow = ControlFlow::Exit;
                }
            }
        }
        Event::MainEventsCleared => {
            window.request_redraw();
        }
        Event::LoopDestroyed => engine.dispose(),
        _ => {}
    });
}
