use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTimingStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
    pub samples: usize,
}

/// Bounded history of intervals between consecutive frame onsets.
#[derive(Debug, Clone)]
pub struct FrameIntervals {
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    last_onset: Option<f64>,
}

impl FrameIntervals {
    pub fn new(max_samples: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            last_onset: None,
        }
    }

    /// Record an onset in clock seconds; the first onset only sets the reference.
    pub fn record_onset(&mut self, t: f64) {
        if let Some(prev) = self.last_onset {
            self.record_frame(Duration::from_secs_f64((t - prev).max(0.0)));
        }
        self.last_onset = Some(t);
    }

    pub fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(d);
    }

    pub fn len(&self) -> usize {
        self.frame_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_times.is_empty()
    }

    pub fn stats(&self) -> FrameTimingStats {
        if self.frame_times.is_empty() {
            return FrameTimingStats::default();
        }
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        FrameTimingStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
            samples: times.len(),
        }
    }
}

impl Default for FrameIntervals {
    fn default() -> Self {
        Self::new(1000)
    }
}
