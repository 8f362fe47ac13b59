use crate::text::render_text_pixmap;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::{anyhow, bail, Context, Result};
use bytemuck::cast_slice_mut;
use log::info;
use prf_core::{Color, FrameView, Marker};
use std::path::Path;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};

/// Mid-gray screen background.
pub const BACKGROUND: [u8; 4] = [128, 128, 128, 255];
const TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Offscreen RGBA canvas the size of the window.
///
/// Stimulus frames are blitted at native size in the center; markers and text
/// are drawn on top.
pub struct FrameCompositor {
    width: u32,
    height: u32,
    canvas: Pixmap,
    packed_lut: Vec<u32>,
    font: Option<FontVec>,
    text_size: f32,
}

impl FrameCompositor {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .with_context(|| format!("invalid canvas size {}x{}", width, height))?;
        let mut compositor = Self {
            width,
            height,
            canvas,
            packed_lut: Vec::with_capacity(256),
            font: None,
            text_size: 32.0,
        };
        compositor.clear();
        Ok(compositor)
    }

    pub fn load_font(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow!("{} is not a usable font", path.display()))?;
        info!("Loaded font {}", path.display());
        self.font = Some(font);
        Ok(())
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn set_text_size(&mut self, px: f32) {
        self.text_size = px;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = Pixmap::new(width, height)
            .with_context(|| format!("invalid canvas size {}x{}", width, height))?;
        self.width = width;
        self.height = height;
        self.clear();
        Ok(())
    }

    pub fn clear(&mut self) {
        let [r, g, b, a] = BACKGROUND;
        self.canvas.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
    }

    /// Copy `frame` into the center of the canvas, cropping whatever does not fit.
    pub fn blit_indexed(&mut self, frame: FrameView<'_>) {
        let FrameView {
            width: fw,
            height: fh,
            pixels,
            lut,
        } = frame;

        self.packed_lut.clear();
        self.packed_lut.extend(
            (0..lut.len().min(256)).map(|i| u32::from_ne_bytes(lut.rgba8(i as u8))),
        );

        let cw = self.width as usize;
        let (dx, sx, w) = center_span(cw, fw);
        let (dy, sy, h) = center_span(self.height as usize, fh);
        if w == 0 || h == 0 {
            return;
        }

        let dst: &mut [u32] = cast_slice_mut(self.canvas.data_mut());
        for row in 0..h {
            let src = &pixels[(sy + row) * fw + sx..][..w];
            let out = &mut dst[(dy + row) * cw + dx..][..w];
            for (o, &index) in out.iter_mut().zip(src) {
                *o = self.packed_lut[index as usize];
            }
        }
    }

    pub fn draw_marker(&mut self, marker: &Marker) {
        let (cx, cy) = self.center();
        match marker {
            Marker::Dot { radius, color } => self.fill_circle(cx, cy, *radius, color),
            Marker::Cross { size, color } => {
                self.fill_cross(cx, cy, *size, (size / 10.0).max(2.0), color)
            }
            Marker::AbcTarget {
                outer_radius,
                inner_radius,
                line_width,
                oval_color,
                cross_color,
            } => {
                self.fill_circle(cx, cy, *outer_radius, oval_color);
                self.fill_cross(cx, cy, outer_radius * 2.0, *line_width, cross_color);
                self.fill_circle(cx, cy, *inner_radius, oval_color);
            }
        }
    }

    /// Draw centered, possibly multi-line text. Returns `false` when no font is loaded.
    pub fn draw_text(&mut self, text: &str) -> bool {
        let (cx, cy) = self.center();
        let Some(font) = &self.font else {
            return false;
        };
        let sf = font.as_scaled(PxScale::from(self.text_size));
        let line_height = sf.height() + sf.line_gap();
        let lines: Vec<&str> = text.lines().collect();

        let mut top = cy - line_height * lines.len() as f32 / 2.0;
        for line in lines {
            if let Some(pm) = render_text_pixmap(line, self.text_size, font, TEXT_COLOR) {
                let x = (cx - pm.width() as f32 / 2.0).round() as i32;
                let y = (top + (line_height - pm.height() as f32) / 2.0).round() as i32;
                self.canvas.draw_pixmap(
                    x,
                    y,
                    pm.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
            top += line_height;
        }
        true
    }

    /// Premultiplied RGBA8 bytes; opaque everywhere, so also straight RGBA.
    pub fn data(&self) -> &[u8] {
        self.canvas.data()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.canvas.pixel(x, y)?;
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    pub fn copy_to(&self, frame_buffer: &mut [u8]) -> Result<()> {
        let data = self.canvas.data();
        if frame_buffer.len() != data.len() {
            bail!(
                "frame buffer holds {} bytes, canvas has {}",
                frame_buffer.len(),
                data.len()
            );
        }
        frame_buffer.copy_from_slice(data);
        Ok(())
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: &Color) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.canvas.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn fill_cross(&mut self, cx: f32, cy: f32, size: f32, thickness: f32, color: &Color) {
        let paint = paint(color);
        let bars = [
            Rect::from_xywh(cx - size / 2.0, cy - thickness / 2.0, size, thickness),
            Rect::from_xywh(cx - thickness / 2.0, cy - size / 2.0, thickness, size),
        ];
        for bar in bars.into_iter().flatten() {
            self.canvas
                .fill_rect(bar, &paint, Transform::identity(), None);
        }
    }
}

fn paint(color: &Color) -> Paint<'static> {
    let [r, g, b] = color.channels();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = true;
    paint
}

/// `(dst_start, src_start, len)` of a `frame`-long run centered in `canvas`.
fn center_span(canvas: usize, frame: usize) -> (usize, usize, usize) {
    if frame <= canvas {
        ((canvas - frame) / 2, 0, frame)
    } else {
        (0, (frame - canvas) / 2, canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prf_core::Lut;

    const GRAY: [u8; 4] = BACKGROUND;

    fn named(name: &str) -> Color {
        Color::named(name).unwrap()
    }

    #[test]
    fn blit_centers_frame_through_lut() {
        let mut c = FrameCompositor::new(6, 4).unwrap();
        let lut = Lut::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]).unwrap();
        let pixels = [0u8, 1, 1, 0];
        c.blit_indexed(FrameView {
            width: 2,
            height: 2,
            pixels: &pixels,
            lut: &lut,
        });

        assert_eq!(c.pixel(2, 1), Some([0, 0, 0, 255]));
        assert_eq!(c.pixel(3, 1), Some([255, 0, 0, 255]));
        assert_eq!(c.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(c.pixel(0, 0), Some(GRAY));
        assert_eq!(c.pixel(5, 3), Some(GRAY));
    }

    #[test]
    fn oversized_frame_is_cropped_around_center() {
        let mut c = FrameCompositor::new(2, 2).unwrap();
        let lut = Lut::new((0..16).map(|i| [i as f32 / 15.0; 3]).collect()).unwrap();
        let pixels: Vec<u8> = (0..16).collect();
        c.blit_indexed(FrameView {
            width: 4,
            height: 4,
            pixels: &pixels,
            lut: &lut,
        });
        assert_eq!(c.pixel(0, 0), Some([85, 85, 85, 255]));
        assert_eq!(c.pixel(1, 1), Some([170, 170, 170, 255]));
    }

    #[test]
    fn dot_fills_center() {
        let mut c = FrameCompositor::new(20, 20).unwrap();
        c.draw_marker(&Marker::Dot {
            radius: 4.0,
            color: named("magenta"),
        });
        assert_eq!(c.pixel(10, 10), Some([255, 0, 255, 255]));
        assert_eq!(c.pixel(1, 1), Some(GRAY));
    }

    #[test]
    fn cross_covers_both_bars() {
        let mut c = FrameCompositor::new(40, 40).unwrap();
        c.draw_marker(&Marker::Cross {
            size: 30.0,
            color: named("white"),
        });
        let white = Some([255, 255, 255, 255]);
        assert_eq!(c.pixel(20, 20), white);
        assert_eq!(c.pixel(8, 20), white);
        assert_eq!(c.pixel(20, 32), white);
        assert_eq!(c.pixel(8, 8), Some(GRAY));
    }

    #[test]
    fn abc_target_layers_disc_cross_disc() {
        let mut c = FrameCompositor::new(20, 20).unwrap();
        c.draw_marker(&Marker::AbcTarget {
            outer_radius: 8.0,
            inner_radius: 3.0,
            line_width: 2.0,
            oval_color: named("black"),
            cross_color: named("white"),
        });
        assert_eq!(c.pixel(10, 10), Some([0, 0, 0, 255]));
        assert_eq!(c.pixel(15, 10), Some([255, 255, 255, 255]));
        assert_eq!(c.pixel(14, 14), Some([0, 0, 0, 255]));
        assert_eq!(c.pixel(0, 0), Some(GRAY));
    }

    #[test]
    fn text_needs_a_font() {
        let mut c = FrameCompositor::new(8, 8).unwrap();
        assert!(!c.has_font());
        assert!(!c.draw_text("Waiting for scanner..."));
        assert!(c.load_font(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn copy_checks_buffer_size() {
        let c = FrameCompositor::new(3, 2).unwrap();
        let mut short = vec![0u8; 8];
        assert!(c.copy_to(&mut short).is_err());
        let mut fb = vec![0u8; 3 * 2 * 4];
        c.copy_to(&mut fb).unwrap();
        assert_eq!(&fb[..4], &GRAY);
    }

    #[test]
    fn resize_resets_to_background() {
        let mut c = FrameCompositor::new(4, 4).unwrap();
        c.draw_marker(&Marker::Dot {
            radius: 2.0,
            color: named("red"),
        });
        c.resize(8, 6).unwrap();
        assert_eq!(c.size(), (8, 6));
        assert_eq!(c.data().len(), 8 * 6 * 4);
        assert_eq!(c.pixel(4, 3), Some(GRAY));
        assert!(c.resize(0, 6).is_err());
    }
}
