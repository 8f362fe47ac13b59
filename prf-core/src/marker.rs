use crate::color::Color;

/// Fixation target geometry handed to a surface for drawing.
///
/// Sizes are in pixels, centered on the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Dot {
        radius: f32,
        color: Color,
    },
    Cross {
        size: f32,
        color: Color,
    },
    /// Two concentric discs overlaid with a cross.
    AbcTarget {
        outer_radius: f32,
        inner_radius: f32,
        line_width: f32,
        oval_color: Color,
        cross_color: Color,
    },
}

impl Marker {
    /// Half-extent of the marker's bounding square.
    pub fn extent(&self) -> f32 {
        match self {
            Marker::Dot { radius, .. } => *radius,
            Marker::Cross { size, .. } => size / 2.0,
            Marker::AbcTarget {
                outer_radius,
                line_width,
                ..
            } => outer_radius.max(line_width / 2.0),
        }
    }
}
