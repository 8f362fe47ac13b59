use crate::config::DisplayConfig;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use pixels::{Pixels, SurfaceTexture};
use prf_core::{FrameView, Marker};
use prf_experiment::{KeySnapshot, KeySource, Surface};
use prf_render::FrameCompositor;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

/// Pumps allowed for the window to appear before giving up.
const STARTUP_PUMPS: usize = 500;

/// Fullscreen window driven by non-blocking event pumping.
///
/// The scheduler owns the loop; this only drains pending window events when
/// keys are polled or a frame is presented.
pub struct WinitDisplay {
    event_loop: EventLoop<()>,
    state: DisplayState,
}

struct DisplayState {
    screen: usize,
    font: Option<PathBuf>,
    text_size: f32,
    abort_key: String,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    compositor: Option<FrameCompositor>,
    held: KeySnapshot,
    /// Keys that went down since the last poll, so short taps are not lost.
    tapped: KeySnapshot,
    error: Option<anyhow::Error>,
    closed: bool,
}

impl WinitDisplay {
    pub fn open(config: &DisplayConfig, abort_key: &str) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let mut display = Self {
            event_loop,
            state: DisplayState {
                screen: config.screen,
                font: config.font.clone(),
                text_size: config.text_size,
                abort_key: abort_key.to_string(),
                window: None,
                pixels: None,
                compositor: None,
                held: KeySnapshot::new(),
                tapped: KeySnapshot::new(),
                error: None,
                closed: false,
            },
        };
        for _ in 0..STARTUP_PUMPS {
            display.pump(Some(Duration::from_millis(10)))?;
            if display.state.window.is_some() {
                return Ok(display);
            }
        }
        bail!("window did not appear")
    }

    /// Hand out the surface and key-source halves sharing this display.
    pub fn split(self) -> (WinitSurface, WinitKeys) {
        let shared = Rc::new(RefCell::new(self));
        (WinitSurface(shared.clone()), WinitKeys(shared))
    }

    fn pump(&mut self, timeout: Option<Duration>) -> Result<()> {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            warn!("Event loop exited with code {}", code);
            let abort = self.state.abort_key.clone();
            self.state.held.insert(abort);
        }
        match self.state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn compositor(&mut self) -> Result<&mut FrameCompositor> {
        self.state.compositor.as_mut().context("display is closed")
    }

    fn poll_keys(&mut self) -> Result<KeySnapshot> {
        self.pump(Some(Duration::ZERO))?;
        let mut snapshot = self.state.held.clone();
        snapshot.append(&mut self.state.tapped);
        Ok(snapshot)
    }

    fn present(&mut self) -> Result<()> {
        let state = &mut self.state;
        let (Some(pixels), Some(compositor)) = (state.pixels.as_mut(), state.compositor.as_ref())
        else {
            bail!("display is closed");
        };
        compositor.copy_to(pixels.frame_mut())?;
        pixels.render().context("failed to present frame")?;
        self.pump(Some(Duration::ZERO))
    }

    fn close(&mut self) {
        if self.state.closed {
            return;
        }
        self.state.closed = true;
        self.state.pixels = None;
        self.state.compositor = None;
        if let Some(window) = self.state.window.take() {
            window.set_cursor_visible(true);
        }
        if let Err(e) = self.pump(Some(Duration::ZERO)) {
            warn!("Event pump failed while closing the display: {:#}", e);
        }
        info!("Display closed");
    }
}

impl DisplayState {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = match event_loop.available_monitors().nth(self.screen) {
            Some(monitor) => monitor,
            None => {
                warn!(
                    "Screen {} not available, using the primary monitor",
                    self.screen
                );
                event_loop
                    .primary_monitor()
                    .or_else(|| event_loop.available_monitors().next())
                    .context("No monitor available")?
            }
        };
        if let Some(rate) = monitor.refresh_rate_millihertz() {
            info!("Refresh rate: {:.1} Hz", rate as f64 / 1000.0);
        }

        let attributes = Window::default_attributes()
            .with_title("prf-present")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            "Display: {}x{} physical, scale factor {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let texture = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(size.width, size.height, texture)?;
        let mut compositor = FrameCompositor::new(size.width, size.height)?;
        compositor.set_text_size(self.text_size);
        if let Some(font) = &self.font {
            compositor.load_font(font)?;
        }

        window.set_cursor_visible(false);
        self.pixels = Some(pixels);
        self.compositor = Some(compositor);
        self.window = Some(window);
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                warn!("Failed to resize surface: {}", e);
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                warn!("Failed to resize buffer: {}", e);
            }
        }
        if let Some(compositor) = &mut self.compositor {
            if let Err(e) = compositor.resize(size.width, size.height) {
                warn!("Failed to resize canvas: {:#}", e);
            }
        }
        info!("Display resized to {}x{}", size.width, size.height);
    }
}

impl ApplicationHandler for DisplayState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && !self.closed {
            if let Err(e) = self.create_window(event_loop) {
                self.error = Some(e.context("failed to create window"));
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Window close requested");
                self.held.insert(self.abort_key.clone());
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(name) = key_name(event.physical_key) else {
                    return;
                };
                if event.state.is_pressed() {
                    self.held.insert(name.clone());
                    self.tapped.insert(name);
                } else {
                    self.held.remove(&name);
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            _ => {}
        }
    }
}

/// Layout-independent key name as used in configs: `"0"`-`"9"`, `"a"`-`"z"`,
/// `"escape"`, `"space"`, `"return"`.
pub fn key_name(key: PhysicalKey) -> Option<String> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let name = match code {
        KeyCode::Escape => "escape",
        KeyCode::Space => "space",
        KeyCode::Enter | KeyCode::NumpadEnter => "return",
        KeyCode::Digit0 | KeyCode::Numpad0 => "0",
        KeyCode::Digit1 | KeyCode::Numpad1 => "1",
        KeyCode::Digit2 | KeyCode::Numpad2 => "2",
        KeyCode::Digit3 | KeyCode::Numpad3 => "3",
        KeyCode::Digit4 | KeyCode::Numpad4 => "4",
        KeyCode::Digit5 | KeyCode::Numpad5 => "5",
        KeyCode::Digit6 | KeyCode::Numpad6 => "6",
        KeyCode::Digit7 | KeyCode::Numpad7 => "7",
        KeyCode::Digit8 | KeyCode::Numpad8 => "8",
        KeyCode::Digit9 | KeyCode::Numpad9 => "9",
        other => {
            let debug = format!("{:?}", other);
            return debug
                .strip_prefix("Key")
                .filter(|letter| letter.len() == 1)
                .map(str::to_ascii_lowercase);
        }
    };
    Some(name.to_string())
}

/// Drawing half of a [`WinitDisplay`].
pub struct WinitSurface(Rc<RefCell<WinitDisplay>>);

/// Keyboard half of a [`WinitDisplay`].
pub struct WinitKeys(Rc<RefCell<WinitDisplay>>);

impl Surface for WinitSurface {
    fn size(&self) -> (u32, u32) {
        self.0
            .borrow()
            .state
            .compositor
            .as_ref()
            .map_or((0, 0), FrameCompositor::size)
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        let mut display = self.0.borrow_mut();
        let compositor = display.compositor()?;
        compositor.clear();
        if !compositor.draw_text(text) {
            info!("{}", text.replace('\n', " "));
        }
        Ok(())
    }

    fn draw_frame(&mut self, frame: FrameView<'_>) -> Result<()> {
        let mut display = self.0.borrow_mut();
        let compositor = display.compositor()?;
        compositor.clear();
        compositor.blit_indexed(frame);
        Ok(())
    }

    fn draw_marker(&mut self, marker: &Marker) -> Result<()> {
        self.0.borrow_mut().compositor()?.draw_marker(marker);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.0.borrow_mut().present()
    }

    fn close(&mut self) -> Result<()> {
        self.0.borrow_mut().close();
        Ok(())
    }
}

impl KeySource for WinitKeys {
    fn pressed_keys(&mut self) -> Result<KeySnapshot> {
        self.0.borrow_mut().poll_keys()
    }
}
