use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use mandelbrot::backend::{Frame, PresentTarget};
use mandelbrot::shared::glam::Vec2;
use mandelbrot::shared::{Complex, ViewportTransform};
use mandelbrot::{
    CpuCompute, EngineError, EngineState, Extent, FrameOutcome, PixelSurface, RenderEngine,
    ResourceError,
};

type Engine = RenderEngine<CpuCompute>;

fn bound(width: f32, height: f32) -> Engine {
    let mut engine = Engine::new(width, height);
    engine
        .bind(PixelSurface::new(), CpuCompute::new(Some(2)).unwrap())
        .unwrap();
    engine
}

fn writes(engine: &Engine) -> u64 {
    engine.surface().map_or(0, PixelSurface::writes)
}

fn is_invalid_state<T: std::fmt::Debug>(result: Result<T, EngineError>) -> bool {
    matches!(result, Err(EngineError::InvalidState { .. }))
}

#[test]
fn lifecycle() {
    let mut engine = Engine::new(4.0, 4.0);
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(is_invalid_state(engine.on_frame_tick()));

    engine
        .bind(PixelSurface::new(), CpuCompute::new(Some(1)).unwrap())
        .unwrap();
    assert_eq!(engine.state(), EngineState::Ready);

    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(writes(&engine), 1);
    assert_eq!(engine.frame_count(), 1);

    engine.dispose();
    assert_eq!(engine.state(), EngineState::Disposed);
    engine.dispose();
    assert_eq!(engine.state(), EngineState::Disposed);
    assert!(engine.surface().is_none());
}

#[test]
fn operations_after_dispose_are_rejected() {
    let mut engine = bound(4.0, 4.0);
    engine.dispose();

    assert!(is_invalid_state(engine.on_frame_tick()));
    assert!(is_invalid_state(engine.set_paused(true)));
    assert!(is_invalid_state(engine.resize(8.0, 8.0)));
    assert!(is_invalid_state(engine.set_scale_factor(2.0)));
    assert!(is_invalid_state(
        engine.bind(PixelSurface::new(), CpuCompute::new(Some(1)).unwrap())
    ));
}

#[test]
fn binding_twice_is_rejected() {
    let mut engine = bound(4.0, 4.0);
    let err = engine
        .bind(PixelSurface::new(), CpuCompute::new(Some(1)).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidState {
            state: EngineState::Ready,
            ..
        }
    ));
}

#[test]
fn paused_ticks_leave_the_surface_alone() {
    let mut engine = bound(4.0, 4.0);
    engine.on_frame_tick().unwrap();

    engine.set_paused(true).unwrap();
    engine.set_paused(true).unwrap();
    assert_eq!(engine.state(), EngineState::Paused);

    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Skipped);
    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Skipped);
    assert_eq!(writes(&engine), 1);

    engine.set_paused(false).unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(writes(&engine), 2);
}

#[test]
fn paused_before_the_first_frame() {
    let mut engine = bound(4.0, 4.0);
    engine.set_paused(true).unwrap();
    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Skipped);
    assert_eq!(writes(&engine), 0);
    engine.set_paused(false).unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
}

#[test]
fn renders_the_expected_escape_counts() {
    let mut engine = bound(4.0, 4.0);
    let params = engine.params_mut();
    params.set_iterations(50);
    params.set_threshold(4.0);
    params.set_transform(ViewportTransform::from_center_scale(Complex::ZERO, 2.0));

    let uniforms = engine.uniforms();
    let origin = uniforms.pixel_to_complex(2, 1);
    assert_abs_diff_eq!(origin.re, 0.0);
    assert_abs_diff_eq!(origin.im, 0.0);
    let corner = uniforms.pixel_to_complex(0, 3);
    assert_abs_diff_eq!(corner.re, -2.0);
    assert_abs_diff_eq!(corner.im, -2.0);

    engine.on_frame_tick().unwrap();
    let surface = engine.surface().unwrap();
    assert_eq!(surface.extent(), Some(Extent::new(4, 4)));
    assert_eq!(surface.count(2, 1), Some(50));
    assert!(surface.count(0, 3).unwrap() < 2);
    assert_eq!(surface.pixel(2, 1).map(|p| [p[0], p[1], p[2]]), Some([0, 0, 0]));
    assert_ne!(surface.pixel(0, 3), surface.pixel(2, 1));
}

#[test]
fn complex_at_follows_the_transform() {
    let mut engine = bound(4.0, 4.0);
    engine
        .params_mut()
        .set_transform(ViewportTransform::from_center_scale(Complex::new(1.0, -1.0), 2.0));

    let center = engine.complex_at(Vec2::new(2.0, 2.0));
    assert_abs_diff_eq!(center.re, 1.0);
    assert_abs_diff_eq!(center.im, -1.0);
    let corner = engine.complex_at(Vec2::ZERO);
    assert_abs_diff_eq!(corner.re, -1.0);
    assert_abs_diff_eq!(corner.im, 1.0);
}

#[test]
fn hook_runs_before_every_dispatch() {
    let mut engine = bound(4.0, 4.0);
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    engine.set_frame_hook(move |engine| {
        seen.set(seen.get() + 1);
        engine.params_mut().set_iterations(7);
    });

    engine.on_frame_tick().unwrap();
    engine.on_frame_tick().unwrap();
    assert_eq!(calls.get(), 2);

    let surface = engine.surface().unwrap();
    assert!(surface.counts().iter().all(|&count| count <= 7));
    assert!(surface.counts().contains(&7));
}

#[test]
fn hook_is_skipped_while_paused() {
    let mut engine = bound(4.0, 4.0);
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    engine.set_frame_hook(move |_| seen.set(seen.get() + 1));

    engine.set_paused(true).unwrap();
    engine.on_frame_tick().unwrap();
    assert_eq!(calls.get(), 0);
}

#[test]
fn hook_can_clear_itself() {
    let mut engine = bound(4.0, 4.0);
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    engine.set_frame_hook(move |engine| {
        seen.set(seen.get() + 1);
        engine.clear_frame_hook();
    });

    engine.on_frame_tick().unwrap();
    engine.on_frame_tick().unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(writes(&engine), 2);
}

#[test]
fn hook_can_replace_itself() {
    let mut engine = bound(4.0, 4.0);
    let log = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&log);
    engine.set_frame_hook(move |engine| {
        first.borrow_mut().push("first");
        let second = Rc::clone(&first);
        engine.set_frame_hook(move |_| second.borrow_mut().push("second"));
    });

    for _ in 0..3 {
        engine.on_frame_tick().unwrap();
    }
    assert_eq!(*log.borrow(), ["first", "second", "second"]);
}

#[test]
fn dispose_from_the_hook_skips_the_frame() {
    let mut engine = bound(4.0, 4.0);
    engine.set_frame_hook(|engine| engine.dispose());

    assert!(is_invalid_state(engine.on_frame_tick()));
    assert_eq!(engine.state(), EngineState::Disposed);
    assert_eq!(engine.frame_count(), 0);
}

#[test]
fn nested_ticks_are_rejected() {
    let mut engine = bound(4.0, 4.0);
    let nested = Rc::new(Cell::new(None));
    let result = Rc::clone(&nested);
    engine.set_frame_hook(move |engine| {
        result.set(Some(is_invalid_state(engine.on_frame_tick())));
    });

    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(nested.get(), Some(true));
    assert_eq!(engine.frame_count(), 1);
}

#[test]
fn pause_from_the_hook_applies_to_the_next_tick() {
    let mut engine = bound(4.0, 4.0);
    engine.set_frame_hook(|engine| engine.set_paused(true).unwrap());

    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Skipped);
    assert_eq!(writes(&engine), 1);
}

#[test]
fn resize_is_applied_on_the_next_tick() {
    let mut engine = bound(4.0, 4.0);
    engine.on_frame_tick().unwrap();

    engine.resize(6.0, 3.0).unwrap();
    assert_eq!((engine.width(), engine.height()), (6.0, 3.0));
    assert_eq!(engine.extent(), Extent::new(4, 4));

    engine.on_frame_tick().unwrap();
    assert_eq!(engine.extent(), Extent::new(6, 3));
    assert_eq!(engine.uniforms().width, 6);
    let surface = engine.surface().unwrap();
    assert_eq!(surface.extent(), Some(Extent::new(6, 3)));
    assert_eq!(surface.counts().len(), 18);
}

#[test]
fn zero_sized_resize_is_clamped() {
    let mut engine = bound(4.0, 4.0);
    engine.resize(0.0, 0.0).unwrap();
    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(engine.extent(), Extent::new(1, 1));
    assert_eq!(engine.surface().unwrap().counts().len(), 1);
}

#[test]
fn scale_factor_multiplies_the_extent() {
    let mut engine = bound(4.0, 3.0);
    engine.set_scale_factor(2.0).unwrap();
    assert_eq!(engine.scale_factor(), 2.0);
    engine.on_frame_tick().unwrap();
    assert_eq!(engine.extent(), Extent::new(8, 6));
    assert_eq!((engine.width(), engine.height()), (4.0, 3.0));
}

#[test]
fn oversized_resize_keeps_the_previous_dimensions() {
    let mut engine = Engine::new(8.0, 8.0);
    engine
        .bind(
            PixelSurface::new(),
            CpuCompute::new(Some(1)).unwrap().with_max_pixels(100),
        )
        .unwrap();
    engine.on_frame_tick().unwrap();

    let err = engine.resize(20.0, 20.0).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Resource(ResourceError::Unsupported { .. })
    ));
    assert_eq!((engine.width(), engine.height()), (8.0, 8.0));
    assert_eq!(engine.state(), EngineState::Running);

    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(engine.extent(), Extent::new(8, 8));
    assert_eq!(writes(&engine), 2);
}

#[test]
fn failed_bind_leaves_the_engine_idle() {
    let mut engine = Engine::new(8.0, 8.0);
    let err = engine
        .bind(
            PixelSurface::new(),
            CpuCompute::new(Some(1)).unwrap().with_max_pixels(10),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Resource(_)));
    assert_eq!(engine.state(), EngineState::Idle);

    engine.resize(2.0, 2.0).unwrap();
    engine
        .bind(
            PixelSurface::new(),
            CpuCompute::new(Some(1)).unwrap().with_max_pixels(10),
        )
        .unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
}

/// Presents like `PixelSurface` but refuses new sizes while `refuse` is set.
struct RefusingSurface {
    inner: PixelSurface,
    refuse: Rc<Cell<bool>>,
}

impl PresentTarget for RefusingSurface {
    fn configure(&mut self, extent: Extent) -> Result<(), ResourceError> {
        if self.refuse.get() {
            return Err(ResourceError::Allocation(format!("cannot present at {extent}")));
        }
        self.inner.configure(extent)
    }

    fn present(&mut self, frame: Frame<'_>) -> Result<(), ResourceError> {
        self.inner.present(frame)
    }
}

#[test]
fn failed_reallocation_keeps_the_last_good_dimensions() {
    let refuse = Rc::new(Cell::new(false));
    let mut engine: RenderEngine<CpuCompute<RefusingSurface>> = RenderEngine::new(4.0, 4.0);
    engine
        .bind(
            RefusingSurface {
                inner: PixelSurface::new(),
                refuse: Rc::clone(&refuse),
            },
            CpuCompute::new(Some(1)).unwrap(),
        )
        .unwrap();
    engine.on_frame_tick().unwrap();

    refuse.set(true);
    engine.resize(6.0, 3.0).unwrap();
    let err = engine.on_frame_tick().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Resource(ResourceError::Allocation(_))
    ));
    assert_eq!(engine.extent(), Extent::new(4, 4));
    assert_eq!((engine.width(), engine.height()), (4.0, 4.0));
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.frame_count(), 1);

    assert_eq!(engine.on_frame_tick().unwrap(), FrameOutcome::Presented);
    assert_eq!(engine.surface().unwrap().inner.writes(), 2);
    assert_eq!(engine.surface().unwrap().inner.extent(), Some(Extent::new(4, 4)));

    refuse.set(false);
    engine.resize(6.0, 3.0).unwrap();
    engine.on_frame_tick().unwrap();
    assert_eq!(engine.extent(), Extent::new(6, 3));
}
