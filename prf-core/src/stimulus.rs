use log::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StimulusError {
    #[error("image table holds {actual} values, expected {frames}x{height}x{width}")]
    ShapeMismatch {
        frames: usize,
        height: usize,
        width: usize,
        actual: usize,
    },
    #[error("frame sequence entry {position} references image {index}, table has {frames}")]
    SequenceOutOfRange {
        position: usize,
        index: usize,
        frames: usize,
    },
    #[error("image {image} uses palette index {value}, LUT has {palette_size} entries")]
    PixelOutOfPalette {
        image: usize,
        value: u8,
        palette_size: usize,
    },
    #[error("color lookup table is empty")]
    EmptyPalette,
    #[error("frame duration must be a positive number of seconds, got {0}")]
    InvalidFrameDuration(f64),
    #[error("failed to read stimulus {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed stimulus {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Anything that can produce the stimulus for one run.
pub trait StimulusSource {
    fn load(&self) -> Result<Stimulus, StimulusError>;
}

/// Stack of palette-indexed images, stored frame-major.
#[derive(Debug, Clone)]
pub struct IndexedImageTable {
    frames: usize,
    height: usize,
    width: usize,
    data: Vec<u8>,
}

impl IndexedImageTable {
    pub fn new(
        frames: usize,
        height: usize,
        width: usize,
        data: Vec<u8>,
    ) -> Result<Self, StimulusError> {
        if frames * height * width != data.len() {
            return Err(StimulusError::ShapeMismatch {
                frames,
                height,
                width,
                actual: data.len(),
            });
        }
        Ok(Self {
            frames,
            height,
            width,
            data,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn image(&self, index: usize) -> &[u8] {
        let len = self.height * self.width;
        &self.data[index * len..(index + 1) * len]
    }
}

/// Palette of normalized RGB entries in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    entries: Vec<[f32; 3]>,
}

impl Lut {
    pub fn new(entries: Vec<[f32; 3]>) -> Result<Self, StimulusError> {
        if entries.is_empty() {
            return Err(StimulusError::EmptyPalette);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[[f32; 3]] {
        &self.entries
    }

    pub fn rgba8(&self, index: u8) -> [u8; 4] {
        let [r, g, b] = self.entries[index as usize];
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(r), q(g), q(b), 255]
    }
}

/// Scale a 0-255 palette down to `[0, 1]`; anything already in range is left alone.
pub fn normalize_lut(mut entries: Vec<[f32; 3]>) -> Vec<[f32; 3]> {
    let max = entries
        .iter()
        .flat_map(|e| e.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    if max > 1.0 {
        if max <= 255.0 {
            info!("Normalizing LUT from 0-255 to 0-1");
            for entry in &mut entries {
                for c in entry.iter_mut() {
                    *c /= 255.0;
                }
            }
        } else {
            warn!("LUT maximum unusually high: {}", max);
        }
    }
    entries
}

/// One presented frame: pixel indices plus the palette to resolve them.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub pixels: &'a [u8],
    pub lut: &'a Lut,
}

/// Everything a run presents, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Stimulus {
    images: IndexedImageTable,
    sequence: Vec<usize>,
    lut: Lut,
    frame_duration: f64,
}

impl Stimulus {
    pub fn new(
        images: IndexedImageTable,
        sequence: Vec<usize>,
        lut: Lut,
        frame_duration: f64,
    ) -> Result<Self, StimulusError> {
        if !frame_duration.is_finite() || frame_duration <= 0.0 {
            return Err(StimulusError::InvalidFrameDuration(frame_duration));
        }
        if let Some((position, &index)) = sequence
            .iter()
            .enumerate()
            .find(|&(_, &i)| i >= images.frame_count())
        {
            return Err(StimulusError::SequenceOutOfRange {
                position,
                index,
                frames: images.frame_count(),
            });
        }
        for image in 0..images.frame_count() {
            if let Some(&value) = images
                .image(image)
                .iter()
                .find(|&&v| v as usize >= lut.len())
            {
                return Err(StimulusError::PixelOutOfPalette {
                    image,
                    value,
                    palette_size: lut.len(),
                });
            }
        }
        Ok(Self {
            images,
            sequence,
            lut,
            frame_duration,
        })
    }

    /// Number of frames to present.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn frame_duration(&self) -> f64 {
        self.frame_duration
    }

    pub fn lut(&self) -> &Lut {
        &self.lut
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.images.dimensions()
    }

    /// Total nominal duration in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 * self.frame_duration
    }

    pub fn frame(&self, index: usize) -> FrameView<'_> {
        let (height, width) = self.images.dimensions();
        FrameView {
            width,
            height,
            pixels: self.images.image(self.sequence[index]),
            lut: &self.lut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_lut(n: usize) -> Lut {
        Lut::new((0..n).map(|i| [i as f32 / n as f32; 3]).collect()).unwrap()
    }

    #[test]
    fn frame_resolves_through_sequence() {
        let images = IndexedImageTable::new(2, 1, 2, vec![0, 0, 1, 1]).unwrap();
        let stim = Stimulus::new(images, vec![1, 0, 1], gray_lut(2), 0.5).unwrap();
        assert_eq!(stim.len(), 3);
        assert_eq!(stim.frame(0).pixels, &[1, 1]);
        assert_eq!(stim.frame(1).pixels, &[0, 0]);
        assert!((stim.duration() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_shape_mismatch() {
        let err = IndexedImageTable::new(2, 2, 2, vec![0; 7]).unwrap_err();
        assert!(matches!(err, StimulusError::ShapeMismatch { actual: 7, .. }));
    }

    #[test]
    fn rejects_pixel_outside_palette() {
        let images = IndexedImageTable::new(1, 1, 2, vec![0, 3]).unwrap();
        let err = Stimulus::new(images, vec![0], gray_lut(3), 0.1).unwrap_err();
        assert!(matches!(
            err,
            StimulusError::PixelOutOfPalette {
                value: 3,
                palette_size: 3,
                ..
            }
        ));
    }

    #[test]
    fn rejects_sequence_outside_table() {
        let images = IndexedImageTable::new(1, 1, 1, vec![0]).unwrap();
        let err = Stimulus::new(images, vec![0, 1], gray_lut(1), 0.1).unwrap_err();
        assert!(matches!(
            err,
            StimulusError::SequenceOutOfRange { position: 1, .. }
        ));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let images = IndexedImageTable::new(1, 1, 1, vec![0]).unwrap();
        assert!(Stimulus::new(images.clone(), vec![0], gray_lut(1), 0.0).is_err());
        assert!(Stimulus::new(images, vec![0], gray_lut(1), f64::NAN).is_err());
    }

    #[test]
    fn normalizes_byte_palette_only() {
        let scaled = normalize_lut(vec![[255.0, 0.0, 127.5]]);
        assert_eq!(scaled[0], [1.0, 0.0, 0.5]);
        let unit = normalize_lut(vec![[1.0, 0.5, 0.0]]);
        assert_eq!(unit[0], [1.0, 0.5, 0.0]);
        let odd = normalize_lut(vec![[1000.0, 0.0, 0.0]]);
        assert_eq!(odd[0][0], 1000.0);
    }

    #[test]
    fn lut_quantizes_to_bytes() {
        let lut = Lut::new(vec![[0.0, 0.5, 1.0]]).unwrap();
        assert_eq!(lut.rgba8(0), [0, 128, 255, 255]);
    }
}
