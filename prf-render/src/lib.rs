mod compositor;
mod text;

pub use compositor::{BACKGROUND, FrameCompositor};
pub use text::render_text_pixmap;
