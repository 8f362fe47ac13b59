use log::{debug, info};
use prf_core::{normalize_lut, IndexedImageTable, Lut, Stimulus, StimulusError, StimulusSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk stimulus layout: a stack of palette-indexed images, the order to
/// present them in, the palette and the frame timing.
#[derive(Debug, Deserialize)]
struct StimulusFile {
    images: Vec<Vec<Vec<u8>>>,
    seq: Vec<usize>,
    cmap: Vec<[f32; 3]>,
    /// Seconds per frame; takes precedence over `temp_freq`.
    frame_duration: Option<f64>,
    /// Frames per second.
    temp_freq: Option<f64>,
    /// `seq` counts images from 1, as MATLAB exports do.
    #[serde(default)]
    one_based_seq: bool,
}

/// Loads a stimulus from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonStimulusLoader {
    path: PathBuf,
}

impl JsonStimulusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn malformed(&self, reason: impl Into<String>) -> StimulusError {
        StimulusError::Malformed {
            path: self.path.display().to_string(),
            reason: reason.into(),
        }
    }

    fn flatten_images(
        &self,
        images: Vec<Vec<Vec<u8>>>,
    ) -> Result<IndexedImageTable, StimulusError> {
        let frames = images.len();
        let height = images.first().map_or(0, Vec::len);
        let width = images
            .first()
            .and_then(|img| img.first())
            .map_or(0, Vec::len);
        if frames == 0 || height == 0 || width == 0 {
            return Err(self.malformed("image stack is empty"));
        }

        let mut data = Vec::with_capacity(frames * height * width);
        for (i, image) in images.into_iter().enumerate() {
            if image.len() != height || image.iter().any(|row| row.len() != width) {
                return Err(self.malformed(format!(
                    "image {} is not {}x{}",
                    i, height, width
                )));
            }
            data.extend(image.into_iter().flatten());
        }
        IndexedImageTable::new(frames, height, width, data)
    }
}

impl StimulusSource for JsonStimulusLoader {
    fn load(&self) -> Result<Stimulus, StimulusError> {
        info!("Loading stimulus from: {}", self.path.display());
        let text = std::fs::read_to_string(&self.path).map_err(|source| StimulusError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let file: StimulusFile =
            serde_json::from_str(&text).map_err(|e| self.malformed(e.to_string()))?;

        let frame_duration = match (file.frame_duration, file.temp_freq) {
            (Some(d), _) => d,
            (None, Some(freq)) if freq > 0.0 => 1.0 / freq,
            (None, Some(freq)) => {
                return Err(self.malformed(format!("temp_freq must be positive, got {}", freq)));
            }
            (None, None) => return Err(self.malformed("needs frame_duration or temp_freq")),
        };

        let seq = if file.one_based_seq {
            file.seq
                .iter()
                .map(|&i| i.checked_sub(1))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| self.malformed("one-based seq contains 0"))?
        } else {
            file.seq
        };

        let images = self.flatten_images(file.images)?;
        info!("# image frames in file: {}", images.frame_count());
        info!("# frames to present: {}", seq.len());
        debug!("LUT entries: {}", file.cmap.len());

        let lut = Lut::new(normalize_lut(file.cmap))?;
        let stimulus = Stimulus::new(images, seq, lut, frame_duration)?;
        info!("Frame duration: {:.4} seconds", stimulus.frame_duration());
        Ok(stimulus)
    }
}

/// Generated drifting bar of flickering checkerboard, swept across the field
/// in four directions on a mid-gray background.
#[derive(Debug, Clone)]
pub struct BarSweepStimulus {
    /// Edge length of the square stimulus in pixels.
    pub size: usize,
    /// Bar positions per sweep.
    pub steps: usize,
    pub bar_width: usize,
    pub check_size: usize,
    /// Frames shown at each bar position; the checkerboard flips every frame.
    pub frames_per_step: usize,
    pub frame_duration: f64,
}

impl Default for BarSweepStimulus {
    fn default() -> Self {
        Self {
            size: 512,
            steps: 20,
            bar_width: 64,
            check_size: 32,
            frames_per_step: 8,
            frame_duration: 0.125,
        }
    }
}

const GRAY: u8 = 0;
const BLACK: u8 = 1;
const WHITE: u8 = 2;
const DIRECTIONS: usize = 4;

impl BarSweepStimulus {
    fn bar_start(&self, step: usize) -> usize {
        let travel = self.size.saturating_sub(self.bar_width);
        if self.steps > 1 {
            step * travel / (self.steps - 1)
        } else {
            travel / 2
        }
    }

    fn render(&self, direction: usize, step: usize, phase: usize, out: &mut Vec<u8>) {
        let n = self.size;
        let start = self.bar_start(step);
        let end = start + self.bar_width.min(n);
        for y in 0..n {
            for x in 0..n {
                let along = match direction {
                    0 => x,
                    1 => y,
                    2 => n - 1 - x,
                    _ => n - 1 - y,
                };
                let index = if (start..end).contains(&along) {
                    if (x / self.check_size + y / self.check_size + phase) % 2 == 0 {
                        BLACK
                    } else {
                        WHITE
                    }
                } else {
                    GRAY
                };
                out.push(index);
            }
        }
    }
}

impl StimulusSource for BarSweepStimulus {
    fn load(&self) -> Result<Stimulus, StimulusError> {
        if self.size == 0 || self.steps == 0 || self.frames_per_step == 0 || self.check_size == 0 {
            return Err(StimulusError::Malformed {
                path: "<bar sweep>".to_string(),
                reason: "size, steps, frames_per_step and check_size must be positive".to_string(),
            });
        }

        let images = DIRECTIONS * self.steps * 2;
        let mut data = Vec::with_capacity(images * self.size * self.size);
        for direction in 0..DIRECTIONS {
            for step in 0..self.steps {
                for phase in 0..2 {
                    self.render(direction, step, phase, &mut data);
                }
            }
        }
        let table = IndexedImageTable::new(images, self.size, self.size, data)?;

        let sequence = (0..DIRECTIONS * self.steps)
            .flat_map(|position| {
                (0..self.frames_per_step).map(move |frame| position * 2 + frame % 2)
            })
            .collect();
        let lut = Lut::new(vec![[0.5; 3], [0.0; 3], [1.0; 3]])?;
        Stimulus::new(table, sequence, lut, self.frame_duration)
    }
}

/// Pick the stimulus source for this run.
pub fn stimulus_source(path: Option<&Path>) -> Box<dyn StimulusSource> {
    match path {
        Some(path) => Box::new(JsonStimulusLoader::new(path)),
        None => Box::new(BarSweepStimulus::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_json(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_byte_palette_with_temp_freq() {
        let file = write_json(
            r#"{
                "images": [[[0, 1], [1, 0]], [[1, 1], [0, 0]]],
                "seq": [1, 0, 1],
                "cmap": [[0, 0, 0], [255, 255, 255]],
                "temp_freq": 4
            }"#,
        );
        let stim = JsonStimulusLoader::new(file.path()).load().unwrap();
        assert_eq!(stim.len(), 3);
        assert_eq!(stim.dimensions(), (2, 2));
        assert_eq!(stim.frame_duration(), 0.25);
        assert_eq!(stim.frame(0).pixels, &[1, 1, 0, 0]);
        assert_eq!(stim.lut().entries()[1], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn explicit_duration_and_one_based_seq() {
        let file = write_json(
            r#"{
                "images": [[[0]], [[1]]],
                "seq": [2, 1],
                "cmap": [[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
                "frame_duration": 0.1,
                "temp_freq": 4,
                "one_based_seq": true
            }"#,
        );
        let stim = JsonStimulusLoader::new(file.path()).load().unwrap();
        assert_eq!(stim.sequence(), &[1, 0]);
        assert_eq!(stim.frame_duration(), 0.1);
        assert_eq!(stim.lut().entries()[1], [0.5, 0.5, 0.5]);
    }

    #[test]
    fn rejects_bad_files() {
        let missing_timing = write_json(r#"{"images": [[[0]]], "seq": [0], "cmap": [[0,0,0]]}"#);
        assert!(matches!(
            JsonStimulusLoader::new(missing_timing.path()).load(),
            Err(StimulusError::Malformed { .. })
        ));

        let ragged = write_json(
            r#"{"images": [[[0, 0]], [[0]]], "seq": [0], "cmap": [[0,0,0]], "temp_freq": 1}"#,
        );
        assert!(matches!(
            JsonStimulusLoader::new(ragged.path()).load(),
            Err(StimulusError::Malformed { .. })
        ));

        let out_of_range =
            write_json(r#"{"images": [[[0]]], "seq": [3], "cmap": [[0,0,0]], "temp_freq": 1}"#);
        assert!(matches!(
            JsonStimulusLoader::new(out_of_range.path()).load(),
            Err(StimulusError::SequenceOutOfRange { index: 3, .. })
        ));

        assert!(matches!(
            JsonStimulusLoader::new("/nonexistent/stimulus.json").load(),
            Err(StimulusError::Io { .. })
        ));
    }

    #[test]
    fn bar_sweep_covers_four_directions() {
        let bars = BarSweepStimulus {
            size: 16,
            steps: 3,
            bar_width: 4,
            check_size: 2,
            frames_per_step: 2,
            frame_duration: 0.5,
        };
        let stim = bars.load().unwrap();
        assert_eq!(stim.len(), 4 * 3 * 2);
        assert_eq!(stim.dimensions(), (16, 16));
        assert_eq!(stim.duration(), 12.0);

        // First frame: bar on the left edge, flickering phase 0.
        let first = stim.frame(0).pixels;
        assert_eq!(first[0], BLACK);
        assert_eq!(first[2], WHITE);
        assert_eq!(first[4], GRAY);
        // Next frame shows the same position in the opposite phase.
        assert_eq!(stim.frame(1).pixels[0], WHITE);
        // Last position of the first sweep hugs the right edge.
        assert_eq!(stim.frame(4).pixels[12], BLACK);
        assert_eq!(stim.frame(4).pixels[14], WHITE);
        assert_eq!(stim.frame(4).pixels[0], GRAY);
    }

    #[test]
    fn bar_sweep_rejects_degenerate_geometry() {
        let bars = BarSweepStimulus {
            steps: 0,
            ..BarSweepStimulus::default()
        };
        assert!(bars.load().is_err());
    }
}
