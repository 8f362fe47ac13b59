use prf_core::{ButtonPress, ColorSwitch, EventKind, FrameOnset, ScannerTrigger};

/// One row of the persisted run log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// `None` for result rows, which carry no timestamp.
    pub time: Option<f64>,
    pub kind: EventKind,
    pub value: String,
}

/// Time-ordered record of a run, followed by result annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunEventLog {
    entries: Vec<LogEntry>,
    results: Vec<LogEntry>,
}

impl RunEventLog {
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn results(&self) -> &[LogEntry] {
        &self.results
    }

    /// Timed entries followed by result rows.
    pub fn rows(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().chain(self.results.iter())
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn push_result(&mut self, text: impl Into<String>) {
        self.results.push(LogEntry {
            time: None,
            kind: EventKind::Result,
            value: text.into(),
        });
    }
}

/// Accumulates the scheduler-owned event streams of one run.
///
/// Fixation switches are owned by the fixation and only joined in at merge time.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    frame_onsets: Vec<FrameOnset>,
    buttons: Vec<ButtonPress>,
    triggers: Vec<ScannerTrigger>,
    trigger_label: String,
}

impl EventRecorder {
    /// `trigger_key` labels scanner-trigger rows as `button <key>`.
    pub fn new(trigger_key: &str) -> Self {
        Self {
            trigger_label: format!("button {}", trigger_key),
            ..Default::default()
        }
    }

    pub fn frame_onset(&mut self, time: f64, frame_index: usize) {
        self.frame_onsets.push(FrameOnset { time, frame_index });
    }

    pub fn button_press(&mut self, time: f64, key: impl Into<String>) {
        self.buttons.push(ButtonPress {
            time,
            key: key.into(),
        });
    }

    pub fn scanner_trigger(&mut self, time: f64) {
        self.triggers.push(ScannerTrigger { time });
    }

    pub fn buttons(&self) -> &[ButtonPress] {
        &self.buttons
    }

    /// Concatenate onsets, switches, presses and triggers, then stable-sort by time.
    ///
    /// Events sharing a timestamp keep that concatenation order.
    pub fn merge(&self, switches: &[ColorSwitch]) -> RunEventLog {
        let onsets = self.frame_onsets.iter().map(|e| LogEntry {
            time: Some(e.time),
            kind: EventKind::FrameOnset,
            value: e.frame_index.to_string(),
        });
        let switches = switches.iter().map(|e| LogEntry {
            time: Some(e.time),
            kind: EventKind::ColorSwitch,
            value: e.color.to_string(),
        });
        let buttons = self.buttons.iter().map(|e| LogEntry {
            time: Some(e.time),
            kind: EventKind::ButtonPress,
            value: e.key.clone(),
        });
        let triggers = self.triggers.iter().map(|e| LogEntry {
            time: Some(e.time),
            kind: EventKind::ScannerTrigger,
            value: self.trigger_label.clone(),
        });

        let mut entries: Vec<LogEntry> = onsets
            .chain(switches)
            .chain(buttons)
            .chain(triggers)
            .collect();
        entries.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));

        RunEventLog {
            entries,
            results: Vec::new(),
        }
    }
}

fn sort_key(entry: &LogEntry) -> f64 {
    entry.time.unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prf_core::Color;

    fn recorder_with_ties() -> (EventRecorder, Vec<ColorSwitch>) {
        let mut rec = EventRecorder::new("6");
        rec.scanner_trigger(1.0);
        rec.button_press(1.0, "2");
        rec.frame_onset(1.0, 10);
        rec.frame_onset(0.5, 5);
        let switches = vec![ColorSwitch {
            time: 1.0,
            color: Color::named("green").unwrap(),
        }];
        (rec, switches)
    }

    #[test]
    fn ties_follow_source_order() {
        let (rec, switches) = recorder_with_ties();
        let log = rec.merge(&switches);
        let kinds: Vec<EventKind> = log.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                EventKind::FrameOnset,
                EventKind::FrameOnset,
                EventKind::ColorSwitch,
                EventKind::ButtonPress,
                EventKind::ScannerTrigger,
            ]
        );
        assert_eq!(log.entries()[0].value, "5");
        assert_eq!(log.entries()[2].value, "green");
        assert_eq!(log.entries()[4].value, "button 6");
    }

    #[test]
    fn merge_is_repeatable_and_sorted() {
        let (rec, switches) = recorder_with_ties();
        let first = rec.merge(&switches);
        let second = rec.merge(&switches);
        assert_eq!(first, second);

        let mut resorted = first.entries().to_vec();
        resorted.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));
        assert_eq!(resorted, first.entries());
        assert!(
            first
                .entries()
                .windows(2)
                .all(|w| w[0].time <= w[1].time)
        );
    }

    #[test]
    fn results_trail_timed_rows() {
        let (rec, switches) = recorder_with_ties();
        let mut log = rec.merge(&switches);
        log.push_result("done");
        let last = log.rows().last().unwrap();
        assert_eq!(last.kind, EventKind::Result);
        assert_eq!(last.time, None);
        assert_eq!(log.count(EventKind::FrameOnset), 2);
    }
}
