use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use std::path::PathBuf;
use std::sync::Arc;
use vasex_core::TrialConfig;
use vasex_experiment::{PointerKind, Session, SessionEvent};
use vasex_render::{FontArc, SYSTEM_FONTS, SkiaRenderer, TextMetrics, load_first_font, load_stimulus};
use vasex_timing::{HighPrecisionTimer, Timer};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::{RunArgs, write_output};

pub struct App {
    args: RunArgs,
    session: Session<HighPrecisionTimer, TextMetrics>,
    font: FontArc,

    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    frame_timer: HighPrecisionTimer,
    scale_factor: f64,
    cursor: PhysicalPosition<f64>,

    results_written: bool,
    should_exit: bool,
}

impl App {
    pub fn new(args: RunArgs, trials: Vec<TrialConfig>) -> Result<Self> {
        let mut candidates = vec![args.font.clone()];
        candidates.extend(SYSTEM_FONTS.iter().map(PathBuf::from));
        let (font, font_path) = load_first_font(&candidates)
            .context("scale titles and labels need a font; pass one with --font")?;
        if font_path != args.font {
            warn!(
                "Font {} unavailable, using {}",
                args.font.display(),
                font_path.display()
            );
        }
        info!("Using font {}", font_path.display());
        let metrics = TextMetrics::from(Some(font.clone()));
        let session = Session::new(trials, HighPrecisionTimer::new(), metrics)
            .context("invalid trial configuration")?;

        Ok(Self {
            args,
            session,
            font,
            window: None,
            pixels: None,
            renderer: None,
            frame_timer: HighPrecisionTimer::new(),
            scale_factor: 1.0,
            cursor: PhysicalPosition::new(0.0, 0.0),
            results_written: false,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        info!(
            "Platform: {} {}; {} trial(s), results to {}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            self.session.progress().1,
            self.args.output.display()
        );

        event_loop.run_app(&mut self)?;

        if !self.results_written {
            self.write_results()?;
        }
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("No monitor available"))?;

        let mut attributes = Window::default_attributes().with_title("vasex");
        attributes = if self.args.windowed {
            attributes.with_inner_size(LogicalSize::new(1280.0, 900.0))
        } else {
            attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor.clone()))))
                .with_resizable(false)
        };

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        self.scale_factor = window.scale_factor();

        info!(
            "Display: {}×{} px, scale factor {:.2}, refresh {}",
            size.width,
            size.height,
            self.scale_factor,
            monitor
                .refresh_rate_millihertz()
                .map(|mhz| format!("{:.1} Hz", mhz as f64 / 1000.0))
                .unwrap_or_else(|| "unknown".into())
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.renderer = Some(SkiaRenderer::new(
            size.width,
            size.height,
            self.scale_factor as f32,
            Some(self.font.clone()),
        )?);

        window.set_cursor_visible(true);
        self.window = Some(window);

        let events = self.session.start()?;
        self.handle_session_events(events, event_loop)?;
        self.request_redraw();
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };
        let view = self.session.current().map(|w| w.view());

        let stats = renderer.render_frame(view.as_ref(), pixels.frame_mut(), &mut self.frame_timer)?;
        let t = self.frame_timer.now();
        pixels.render()?;
        self.session.mark_presented();
        debug!(
            "frame: draw {:.3}ms, copy {:.3}ms, present {:.3}ms",
            stats.draw.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            self.frame_timer.elapsed(t).as_secs_f64() * 1e3,
        );
        Ok(())
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn to_frame(&self, position: PhysicalPosition<f64>) -> Option<(f32, f32)> {
        let layout = self.session.current()?.layout();
        Some(self.renderer.as_ref()?.to_frame(layout, position.x, position.y))
    }

    fn pointer(
        &mut self,
        kind: PointerKind,
        position: PhysicalPosition<f64>,
        event_loop: &ActiveEventLoop,
    ) -> Result<()> {
        if let Some((x, y)) = self.to_frame(position) {
            self.session.dispatch(kind, x, y);
        }
        self.after_input(event_loop)
    }

    fn after_input(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let events = self.session.update()?;
        self.handle_session_events(events, event_loop)?;
        if self.session.current_mut().is_some_and(|w| w.take_dirty()) {
            self.request_redraw();
        }
        Ok(())
    }

    fn handle_session_events(
        &mut self,
        events: Vec<SessionEvent>,
        event_loop: &ActiveEventLoop,
    ) -> Result<()> {
        for event in events {
            match event {
                SessionEvent::TrialStarted { .. } => self.load_current_stimulus(),
                SessionEvent::TrialFinished { index, record } => {
                    debug!("Trial {} recorded: {:?}", index, record);
                }
                SessionEvent::SessionComplete => {
                    self.write_results()?;
                    self.cleanup_and_exit(event_loop);
                }
            }
        }
        Ok(())
    }

    fn stimulus_path(&self) -> Option<PathBuf> {
        let stimulus = self.session.current()?.config().stimulus.as_deref()?;
        if stimulus.contains("://") || stimulus.starts_with("//") {
            warn!("Remote stimulus {} is not supported; showing an empty box", stimulus);
            return None;
        }
        Some(self.args.stimuli_root.join(stimulus))
    }

    fn load_current_stimulus(&mut self) {
        let pixmap = self.stimulus_path().and_then(|path| match load_stimulus(&path) {
            Ok(pm) => {
                debug!("Loaded stimulus {} ({}×{})", path.display(), pm.width(), pm.height());
                Some(pm)
            }
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        });
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_stimulus(pixmap);
        }
    }

    fn write_results(&mut self) -> Result<()> {
        let json = serde_json::to_string_pretty(self.session.results())?;
        write_output(&self.args.output, &json, self.args.overwrite)?;
        info!(
            "Wrote {} result(s) to {}",
            self.session.results().len(),
            self.args.output.display()
        );
        self.results_written = true;
        Ok(())
    }

    fn handle_key(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) -> Result<()> {
        if let PhysicalKey::Code(code) = key {
            match code {
                KeyCode::Escape => self.cleanup_and_exit(event_loop),
                KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => {
                    if self.session.click_confirm() {
                        self.after_input(event_loop)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_touch(&mut self, touch: Touch, event_loop: &ActiveEventLoop) -> Result<()> {
        let kind = match touch.phase {
            TouchPhase::Started => PointerKind::Down,
            TouchPhase::Moved => PointerKind::Move,
            TouchPhase::Ended => PointerKind::Up,
            TouchPhase::Cancelled => PointerKind::Cancel,
        };
        self.pointer(kind, touch.location, event_loop)
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(size.width, size.height)?;
            pixels.resize_buffer(size.width, size.height)?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(size.width, size.height, self.scale_factor as f32)?;
        }
        info!("Display resized to {}×{}", size.width, size.height);
        self.request_redraw();
        Ok(())
    }

    fn window_event_inner(&mut self, event_loop: &ActiveEventLoop, event: WindowEvent) -> Result<()> {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => self.render()?,
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(event.physical_key, event_loop)?;
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                self.pointer(PointerKind::Move, position, event_loop)?;
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let kind = match state {
                    ElementState::Pressed => PointerKind::Down,
                    ElementState::Released => PointerKind::Up,
                };
                self.pointer(kind, self.cursor, event_loop)?;
            }
            WindowEvent::Touch(touch) => self.handle_touch(touch, event_loop)?,
            WindowEvent::CursorLeft { .. } => {
                self.pointer(PointerKind::Leave, self.cursor, event_loop)?;
            }
            WindowEvent::Focused(false) => {
                self.pointer(PointerKind::Cancel, self.cursor, event_loop)?;
            }
            WindowEvent::Resized(size) => self.handle_resize(size)?,
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn log_frame_timings(&self) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let stages = renderer
            .timing_summary()
            .into_iter()
            .chain([("frame", self.frame_timer.frame_stats())]);
        for (stage, stats) in stages {
            debug!(
                "{:>5}: {} frames, avg {:.3}ms, jitter {:.3}ms, min {:.3}ms, max {:.3}ms",
                stage,
                stats.samples,
                stats.average_frame_time_ns / 1e6,
                stats.jitter_ns / 1e6,
                stats.min_frame_time_ns / 1e6,
                stats.max_frame_time_ns / 1e6,
            );
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        let (done, total) = self.session.progress();
        info!("Exiting after {}/{} trial(s)", done, total);
        self.log_frame_timings();
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!("Failed to create window and surface: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.window_event_inner(event_loop, event) {
            error!("{:#}", e);
            self.cleanup_and_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
