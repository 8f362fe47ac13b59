use anyhow::Result;
use prf_core::{FrameView, Marker};
use std::cell::RefCell;
use std::rc::Rc;

/// Display the scheduler draws into.
///
/// Drawing calls compose the back buffer; `present` shows it.
pub trait Surface {
    /// Size in physical pixels.
    fn size(&self) -> (u32, u32);
    /// Replace the screen content with a text screen.
    fn show_message(&mut self, text: &str) -> Result<()>;
    fn draw_frame(&mut self, frame: FrameView<'_>) -> Result<()>;
    fn draw_marker(&mut self, marker: &Marker) -> Result<()>;
    fn present(&mut self) -> Result<()>;
    /// Release the display. Calling it again must succeed without effect.
    fn close(&mut self) -> Result<()>;
}

/// Counters shared between a [`HeadlessSurface`] and whoever inspects it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SurfaceCounters {
    pub frames_drawn: usize,
    pub markers_drawn: usize,
    pub presents: usize,
    pub close_calls: usize,
    pub closed: bool,
    pub messages: Vec<String>,
    pub last_marker: Option<Marker>,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceProbe(Rc<RefCell<SurfaceCounters>>);

impl SurfaceProbe {
    pub fn snapshot(&self) -> SurfaceCounters {
        self.0.borrow().clone()
    }
}

/// Surface without a display, for dry runs and tests.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    counters: SurfaceProbe,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            counters: SurfaceProbe::default(),
        }
    }

    pub fn probe(&self) -> SurfaceProbe {
        self.counters.clone()
    }
}

impl Surface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        log::info!("{}", text.replace('\n', " "));
        self.counters.0.borrow_mut().messages.push(text.to_string());
        Ok(())
    }

    fn draw_frame(&mut self, _frame: FrameView<'_>) -> Result<()> {
        self.counters.0.borrow_mut().frames_drawn += 1;
        Ok(())
    }

    fn draw_marker(&mut self, marker: &Marker) -> Result<()> {
        let mut c = self.counters.0.borrow_mut();
        c.markers_drawn += 1;
        c.last_marker = Some(marker.clone());
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.counters.0.borrow_mut().presents += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut c = self.counters.0.borrow_mut();
        c.close_calls += 1;
        c.closed = true;
        Ok(())
    }
}
