use crate::config::PresenterConfig;
use anyhow::Result;
use std::collections::{BTreeSet, VecDeque};

/// Names of the keys held down at one instant.
pub type KeySnapshot = BTreeSet<String>;

/// Non-blocking source of key state.
pub trait KeySource {
    /// Keys currently held; must return immediately.
    fn pressed_keys(&mut self) -> Result<KeySnapshot>;
}

impl<K: KeySource + ?Sized> KeySource for Box<K> {
    fn pressed_keys(&mut self) -> Result<KeySnapshot> {
        (**self).pressed_keys()
    }
}

/// Replays a fixed list of snapshots, one per poll, then reports nothing held.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    script: VecDeque<KeySnapshot>,
    polls: usize,
}

impl ScriptedKeys {
    pub fn new<I, S, K>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            script: snapshots
                .into_iter()
                .map(|s| s.into_iter().map(Into::into).collect())
                .collect(),
            polls: 0,
        }
    }

    /// Append `count` polls with nothing held.
    pub fn idle(mut self, count: usize) -> Self {
        self.script
            .extend(std::iter::repeat_with(KeySnapshot::new).take(count));
        self
    }

    /// Append one poll holding `keys`.
    pub fn hold<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.script
            .push_back(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl KeySource for ScriptedKeys {
    fn pressed_keys(&mut self) -> Result<KeySnapshot> {
        self.polls += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSignal {
    Trigger,
    Abort,
    Idle,
}

/// What one presentation tick saw on the keyboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSample {
    pub abort: bool,
    /// Level-triggered: true on every tick the trigger key is down.
    pub trigger: bool,
    /// Response keys that went down since the previous tick.
    pub presses: Vec<String>,
}

/// Turns key snapshots into abort/trigger levels and response-key press edges.
#[derive(Debug, Clone)]
pub struct InputGate {
    trigger_key: String,
    abort_key: String,
    response_keys: BTreeSet<String>,
    previous: BTreeSet<String>,
}

impl InputGate {
    pub fn new(
        trigger_key: impl Into<String>,
        abort_key: impl Into<String>,
        response_keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            trigger_key: trigger_key.into(),
            abort_key: abort_key.into(),
            response_keys: response_keys.into_iter().map(Into::into).collect(),
            previous: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &PresenterConfig) -> Self {
        Self::new(
            config.trigger_key.clone(),
            config.abort_key.clone(),
            config.response_keys.iter().cloned(),
        )
    }

    /// Pre-trigger check; abort wins when both keys are down.
    pub fn wait_signal(&self, keys: &KeySnapshot) -> WaitSignal {
        if keys.contains(&self.abort_key) {
            WaitSignal::Abort
        } else if keys.contains(&self.trigger_key) {
            WaitSignal::Trigger
        } else {
            WaitSignal::Idle
        }
    }

    pub fn sample(&mut self, keys: &KeySnapshot) -> InputSample {
        let held: BTreeSet<String> = keys
            .iter()
            .filter(|k| self.response_keys.contains(*k))
            .cloned()
            .collect();
        let presses = held.difference(&self.previous).cloned().collect();
        self.previous = held;
        InputSample {
            abort: keys.contains(&self.abort_key),
            trigger: keys.contains(&self.trigger_key),
            presses,
        }
    }

    /// Forget held response keys, so the next sample reports every held key as new.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(keys: &[&str]) -> KeySnapshot {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn held_key_yields_single_edge() {
        let mut gate = InputGate::new("6", "escape", ["a"]);
        let ticks = [snap(&["a"]), snap(&["a"]), snap(&[]), snap(&["a"])];
        let presses: Vec<Vec<String>> = ticks.iter().map(|t| gate.sample(t).presses).collect();
        assert_eq!(presses[0], vec!["a".to_string()]);
        assert!(presses[1].is_empty());
        assert!(presses[2].is_empty());
        assert_eq!(presses[3], vec!["a".to_string()]);
    }

    #[test]
    fn non_response_keys_are_ignored() {
        let mut gate = InputGate::new("6", "escape", ["1", "2"]);
        let sample = gate.sample(&snap(&["1", "x", "6"]));
        assert_eq!(sample.presses, vec!["1".to_string()]);
        assert!(sample.trigger);
        assert!(!sample.abort);
    }

    #[test]
    fn trigger_is_level_triggered() {
        let mut gate = InputGate::new("6", "escape", ["1"]);
        assert!(gate.sample(&snap(&["6"])).trigger);
        assert!(gate.sample(&snap(&["6"])).trigger);
        assert!(!gate.sample(&snap(&[])).trigger);
    }

    #[test]
    fn chord_reports_each_new_key() {
        let mut gate = InputGate::new("6", "escape", ["1", "2"]);
        gate.sample(&snap(&["1"]));
        let sample = gate.sample(&snap(&["1", "2"]));
        assert_eq!(sample.presses, vec!["2".to_string()]);
    }

    #[test]
    fn abort_wins_while_waiting() {
        let gate = InputGate::new("6", "escape", ["1"]);
        assert_eq!(gate.wait_signal(&snap(&["6", "escape"])), WaitSignal::Abort);
        assert_eq!(gate.wait_signal(&snap(&["6"])), WaitSignal::Trigger);
        assert_eq!(gate.wait_signal(&snap(&["1"])), WaitSignal::Idle);
    }

    #[test]
    fn scripted_keys_run_dry() {
        let mut keys = ScriptedKeys::new([["6"]]).idle(1).hold(["escape"]);
        assert!(keys.pressed_keys().unwrap().contains("6"));
        assert!(keys.pressed_keys().unwrap().is_empty());
        assert!(keys.pressed_keys().unwrap().contains("escape"));
        assert!(keys.pressed_keys().unwrap().is_empty());
        assert_eq!(keys.polls(), 4);
    }
}
