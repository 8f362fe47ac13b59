use crate::config::{AbcGeometry, FixationConfig, FixationKind};
use crate::surface::Surface;
use anyhow::Result;
use log::{debug, info};
use prf_core::{Color, ColorSwitch, Marker};
use rand::Rng;

/// A fixation target the scheduler updates once per presented frame.
pub trait Fixation {
    /// Advance the target's state to run time `now`; `None` is a no-op.
    fn update(&mut self, now: Option<f64>);
    fn marker(&self) -> Marker;
    /// Every accepted color switch, oldest first.
    fn switch_log(&self) -> &[ColorSwitch];

    fn draw(&self, surface: &mut dyn Surface) -> Result<()> {
        surface.draw_marker(&self.marker())
    }
}

impl<F: Fixation + ?Sized> Fixation for Box<F> {
    fn update(&mut self, now: Option<f64>) {
        (**self).update(now)
    }
    fn marker(&self) -> Marker {
        (**self).marker()
    }
    fn switch_log(&self) -> &[ColorSwitch] {
        (**self).switch_log()
    }
    fn draw(&self, surface: &mut dyn Surface) -> Result<()> {
        (**self).draw(surface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixationShape {
    /// Disc with the given diameter.
    Dot(f32),
    /// Plus sign with the given extent.
    Cross(f32),
}

/// Fixation that toggles between two colors at random moments.
///
/// Each `update` is one Bernoulli draw with `color_switch_prob`, taken only once
/// `min_switch_interval` seconds have passed since the previous switch.
#[derive(Debug)]
pub struct ColorSwitchFixation<R: Rng> {
    shape: FixationShape,
    colors: [Color; 2],
    current: usize,
    color_switch_prob: f64,
    min_switch_interval: f64,
    last_switch_time: Option<f64>,
    switch_log: Vec<ColorSwitch>,
    rng: R,
}

impl<R: Rng> ColorSwitchFixation<R> {
    pub fn new(
        shape: FixationShape,
        colors: [Color; 2],
        color_switch_prob: f64,
        min_switch_interval: f64,
        rng: R,
    ) -> Self {
        Self {
            shape,
            colors,
            current: 0,
            color_switch_prob,
            min_switch_interval,
            last_switch_time: None,
            switch_log: Vec::new(),
            rng,
        }
    }

    pub fn current_color(&self) -> &Color {
        &self.colors[self.current]
    }

    fn eligible(&self, now: f64) -> bool {
        match self.last_switch_time {
            None => true,
            Some(last) => now - last >= self.min_switch_interval,
        }
    }
}

impl<R: Rng> Fixation for ColorSwitchFixation<R> {
    fn update(&mut self, now: Option<f64>) {
        let Some(now) = now else {
            return;
        };
        if !self.eligible(now) {
            return;
        }
        if self.rng.random::<f64>() < self.color_switch_prob {
            self.current = 1 - self.current;
            self.last_switch_time = Some(now);
            let color = self.colors[self.current].clone();
            debug!("Fixation color switched to {} at {:.3}s", color, now);
            self.switch_log.push(ColorSwitch { time: now, color });
        }
    }

    fn marker(&self) -> Marker {
        let color = self.current_color().clone();
        match self.shape {
            FixationShape::Dot(diameter) => Marker::Dot {
                radius: diameter / 2.0,
                color,
            },
            FixationShape::Cross(size) => Marker::Cross { size, color },
        }
    }

    fn switch_log(&self) -> &[ColorSwitch] {
        &self.switch_log
    }
}

/// Static target of two concentric discs and a cross, sized in degrees of visual angle.
///
/// Thaler et al. (2013), Vision Research 76, 31-42.
#[derive(Debug, Clone)]
pub struct AbcTargetFixation {
    pixels_per_degree: f64,
    geometry: AbcGeometry,
}

impl AbcTargetFixation {
    pub fn new(screen_width_px: u32, geometry: AbcGeometry) -> Self {
        let half_angle = (geometry.screen_width_cm / geometry.viewing_distance_cm / 2.0).atan();
        let pixels_per_degree = std::f64::consts::PI * screen_width_px as f64 / half_angle / 360.0;
        info!("ABC fixation target: {:.2} px/deg", pixels_per_degree);
        Self {
            pixels_per_degree,
            geometry,
        }
    }

    pub fn pixels_per_degree(&self) -> f64 {
        self.pixels_per_degree
    }
}

impl Fixation for AbcTargetFixation {
    fn update(&mut self, _now: Option<f64>) {}

    fn marker(&self) -> Marker {
        let ppd = self.pixels_per_degree;
        Marker::AbcTarget {
            outer_radius: (self.geometry.outer_diameter_deg / 2.0 * ppd) as f32,
            inner_radius: (self.geometry.inner_diameter_deg / 2.0 * ppd) as f32,
            line_width: (self.geometry.inner_diameter_deg * ppd) as f32,
            oval_color: self.geometry.oval_color.clone(),
            cross_color: self.geometry.cross_color.clone(),
        }
    }

    fn switch_log(&self) -> &[ColorSwitch] {
        &[]
    }
}

/// Build the fixation described by `config` for a screen `screen_width_px` wide.
pub fn build_fixation<R: Rng + 'static>(
    config: &FixationConfig,
    screen_width_px: u32,
    rng: R,
) -> Box<dyn Fixation> {
    let size = config.size_px();
    let switching = |shape| {
        Box::new(ColorSwitchFixation::new(
            shape,
            config.colors.clone(),
            config.color_switch_prob,
            config.min_switch_interval,
            rng,
        )) as Box<dyn Fixation>
    };
    match config.kind {
        FixationKind::Dot => switching(FixationShape::Dot(size)),
        FixationKind::Cross => switching(FixationShape::Cross(size)),
        FixationKind::AbcTarget => {
            Box::new(AbcTargetFixation::new(screen_width_px, config.abc.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn colors() -> [Color; 2] {
        ["magenta", "green"].map(|n| Color::named(n).unwrap())
    }

    fn fixation(prob: f64, interval: f64, seed: u64) -> ColorSwitchFixation<StdRng> {
        ColorSwitchFixation::new(
            FixationShape::Dot(8.0),
            colors(),
            prob,
            interval,
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn unset_time_is_ignored() {
        let mut f = fixation(1.0, 0.0, 1);
        f.update(None);
        assert!(f.switch_log().is_empty());
    }

    #[test]
    fn certain_switch_respects_interval() {
        let mut f = fixation(1.0, 2.0, 1);
        for k in 0..100 {
            f.update(Some(k as f64 * 0.1));
        }
        let times: Vec<f64> = f.switch_log().iter().map(|s| s.time).collect();
        assert_eq!(times.len(), 5);
        assert_eq!(times[0], 0.0);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= 2.0 - 1e-9);
        }
    }

    #[test]
    fn colors_alternate_starting_from_second() {
        let mut f = fixation(1.0, 0.0, 3);
        f.update(Some(0.0));
        f.update(Some(0.5));
        f.update(Some(1.0));
        let names: Vec<&str> = f.switch_log().iter().map(|s| s.color.name()).collect();
        assert_eq!(names, ["green", "magenta", "green"]);
        assert_eq!(f.current_color().name(), "green");
    }

    #[test]
    fn zero_probability_never_switches() {
        let mut f = fixation(0.0, 0.0, 9);
        for k in 0..1000 {
            f.update(Some(k as f64));
        }
        assert!(f.switch_log().is_empty());
    }

    #[test]
    fn random_switches_never_closer_than_interval() {
        let mut f = fixation(0.2, 0.75, 42);
        for k in 0..5000 {
            f.update(Some(k as f64 / 60.0));
        }
        assert!(!f.switch_log().is_empty());
        for pair in f.switch_log().windows(2) {
            assert!(pair[1].time > pair[0].time);
            assert!(pair[1].time - pair[0].time >= 0.75);
        }
    }

    #[test]
    fn marker_follows_shape_and_color() {
        let mut f = ColorSwitchFixation::new(
            FixationShape::Cross(30.0),
            colors(),
            1.0,
            0.0,
            StdRng::seed_from_u64(0),
        );
        f.update(Some(0.0));
        assert_eq!(
            f.marker(),
            Marker::Cross {
                size: 30.0,
                color: Color::named("green").unwrap()
            }
        );
    }

    #[test]
    fn abc_target_is_static() {
        let mut f = AbcTargetFixation::new(1920, AbcGeometry::default());
        f.update(Some(10.0));
        assert!(f.switch_log().is_empty());
        match f.marker() {
            Marker::AbcTarget {
                outer_radius,
                inner_radius,
                ..
            } => assert!(outer_radius > inner_radius && inner_radius > 0.0),
            other => panic!("unexpected marker {:?}", other),
        }
    }

    #[test]
    fn builder_picks_kind() {
        let mut cfg = FixationConfig::default();
        cfg.kind = FixationKind::Cross;
        let f = build_fixation(&cfg, 800, StdRng::seed_from_u64(0));
        assert!(matches!(f.marker(), Marker::Cross { size, .. } if size == 30.0));
    }
}
