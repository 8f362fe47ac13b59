use prf_core::{ButtonPress, ColorSwitch};
use serde::{Deserialize, Serialize};

/// Latency bounds (seconds, inclusive) for a press to count as a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionWindow {
    pub min_rt: f64,
    pub max_rt: f64,
}

impl Default for ReactionWindow {
    fn default() -> Self {
        Self {
            min_rt: 0.3,
            max_rt: 3.0,
        }
    }
}

impl ReactionWindow {
    pub fn contains(&self, latency: f64) -> bool {
        self.min_rt <= latency && latency <= self.max_rt
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionTimeResult {
    pub hits: usize,
    pub switches: usize,
    /// NaN when there were no hits.
    pub mean_rt: f64,
    pub reaction_times: Vec<f64>,
}

impl ReactionTimeResult {
    /// Percentage of switches detected; 0 when nothing switched.
    pub fn hit_ratio(&self) -> f64 {
        if self.switches > 0 {
            self.hits as f64 / self.switches as f64 * 100.0
        } else {
            0.0
        }
    }

    /// The two summary lines appended to the run log.
    ///
    /// A run without hits reports its mean as `nan`.
    pub fn summary(&self, window: &ReactionWindow) -> [String; 2] {
        let mean = if self.mean_rt.is_nan() {
            "nan".to_string()
        } else {
            format!("{:.3}", self.mean_rt)
        };
        [
            format!(
                "[RESULT] {}/{} ({:.1}%) color switches were followed by a button press \
                 in {}\u{2013}{}s.",
                self.hits,
                self.switches,
                self.hit_ratio(),
                window.min_rt,
                window.max_rt
            ),
            format!("[RESULT] Mean reaction time: {} s", mean),
        ]
    }
}

/// Score fixation switches against button presses.
///
/// Each switch independently takes the earliest press whose latency falls inside
/// `window`. Presses are not consumed, so one press can score several switches.
pub fn analyze_reaction_times(
    switches: &[ColorSwitch],
    buttons: &[ButtonPress],
    window: ReactionWindow,
) -> ReactionTimeResult {
    let mut press_times: Vec<f64> = buttons.iter().map(|b| b.time).collect();
    press_times.sort_by(f64::total_cmp);

    let reaction_times: Vec<f64> = switches
        .iter()
        .filter_map(|switch| {
            press_times
                .iter()
                .map(|&t| t - switch.time)
                .find(|&dt| window.contains(dt))
        })
        .collect();

    let mean_rt = if reaction_times.is_empty() {
        f64::NAN
    } else {
        reaction_times.iter().sum::<f64>() / reaction_times.len() as f64
    };

    ReactionTimeResult {
        hits: reaction_times.len(),
        switches: switches.len(),
        mean_rt,
        reaction_times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prf_core::Color;

    fn switch(time: f64) -> ColorSwitch {
        ColorSwitch {
            time,
            color: Color::named("green").unwrap(),
        }
    }

    fn press(time: f64) -> ButtonPress {
        ButtonPress {
            time,
            key: "1".to_string(),
        }
    }

    #[test]
    fn too_fast_press_is_a_miss() {
        let r = analyze_reaction_times(
            &[switch(1.0), switch(5.0)],
            &[press(1.5), press(5.1)],
            ReactionWindow::default(),
        );
        assert_eq!(r.hits, 1);
        assert_eq!(r.switches, 2);
        assert!((r.mean_rt - 0.5).abs() < 1e-12);
        assert_eq!(r.reaction_times.len(), 1);
        assert!((r.hit_ratio() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn one_press_can_score_two_switches() {
        let r = analyze_reaction_times(
            &[switch(1.0), switch(1.5)],
            &[press(2.0)],
            ReactionWindow::default(),
        );
        assert_eq!(r.hits, 2);
        assert!((r.reaction_times[0] - 1.0).abs() < 1e-12);
        assert!((r.reaction_times[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn earliest_qualifying_press_is_used_regardless_of_input_order() {
        let r = analyze_reaction_times(
            &[switch(0.0)],
            &[press(2.0), press(0.1), press(0.8)],
            ReactionWindow::default(),
        );
        assert_eq!(r.reaction_times, vec![0.8]);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = ReactionWindow {
            min_rt: 0.5,
            max_rt: 1.0,
        };
        let r = analyze_reaction_times(
            &[switch(0.0), switch(10.0)],
            &[press(0.5), press(11.0)],
            window,
        );
        assert_eq!(r.hits, 2);
    }

    #[test]
    fn presses_before_switch_never_count() {
        let r = analyze_reaction_times(&[switch(5.0)], &[press(4.0)], ReactionWindow::default());
        assert_eq!(r.hits, 0);
    }

    #[test]
    fn no_hits_yields_nan_mean() {
        let r = analyze_reaction_times(&[], &[press(1.0)], ReactionWindow::default());
        assert_eq!(r.switches, 0);
        assert!(r.mean_rt.is_nan());
        assert_eq!(r.hit_ratio(), 0.0);

        let [hits, mean] = r.summary(&ReactionWindow::default());
        assert!(hits.starts_with("[RESULT] 0/0 (0.0%)"));
        assert_eq!(mean, "[RESULT] Mean reaction time: nan s");
    }

    #[test]
    fn summary_lines() {
        let r = analyze_reaction_times(
            &[switch(1.0), switch(5.0)],
            &[press(1.5)],
            ReactionWindow::default(),
        );
        let [hits, mean] = r.summary(&ReactionWindow::default());
        assert_eq!(
            hits,
            "[RESULT] 1/2 (50.0%) color switches were followed by a button press in 0.3\u{2013}3s."
        );
        assert_eq!(mean, "[RESULT] Mean reaction time: 0.500 s");
    }
}
