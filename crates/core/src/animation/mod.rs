//! Idle/animating state machine that keeps re-shaping the base line set.
//!
//! Each step sends the lead curve (the first of the line set) towards a new
//! random shape and colour with a notifying transition, and every other
//! curve towards its own target silently. The lead's completion token is
//! what schedules the next step, and only while still animating. Stopping
//! never cancels transitions already running; they coast to their end.

use std::time::Duration;

use crate::{
    CompletionToken, CurvePath, PathTarget, Pattern, RandomSource, RenderSurface, Result, Rgb,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Animating,
}

/// Everything a step needs to touch, borrowed for the duration of one call.
pub struct StepContext<'a> {
    pub surface: &'a mut RenderSurface,
    pub rng: &'a mut RandomSource,
    pub pattern: Option<&'a Pattern>,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct AnimationDriver {
    state: AnimationState,
    lead: Option<CompletionToken>,
    steps: u64,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.state == AnimationState::Animating
    }

    /// Number of steps issued since creation.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Idle to animating, issuing the first step. Returns `false` and
    /// schedules nothing when already animating.
    pub fn start(&mut self, ctx: StepContext<'_>) -> Result<bool> {
        if self.is_animating() {
            return Ok(false);
        }
        self.state = AnimationState::Animating;
        tracing::debug!("animation started");
        self.step(ctx)?;
        Ok(true)
    }

    /// Animating to idle. In-flight transitions keep running.
    pub fn stop(&mut self) -> bool {
        if !self.is_animating() {
            return false;
        }
        self.state = AnimationState::Idle;
        self.lead = None;
        tracing::debug!(steps = self.steps, "animation stopped");
        true
    }

    pub fn toggle(&mut self, ctx: StepContext<'_>) -> Result<AnimationState> {
        if self.is_animating() {
            self.stop();
        } else {
            self.start(ctx)?;
        }
        Ok(self.state)
    }

    /// Feeds completions reported by the surface. Issues the next step when
    /// the lead transition finished and the driver is still animating.
    pub fn on_completed(
        &mut self,
        completed: &[CompletionToken],
        ctx: StepContext<'_>,
    ) -> Result<bool> {
        let Some(lead) = self.lead else {
            return Ok(false);
        };
        if !self.is_animating() || !completed.contains(&lead) {
            return Ok(false);
        }
        self.step(ctx)?;
        Ok(true)
    }

    fn step(&mut self, ctx: StepContext<'_>) -> Result<()> {
        self.lead = None;
        let Some(pattern) = ctx.pattern else {
            return Ok(());
        };
        let curve_points = pattern.spec().curve_points;

        for (index, curve) in pattern.curves().iter().enumerate() {
            let target = PathTarget {
                data: CurvePath::random(ctx.rng, curve_points),
                stroke: Rgb::random(ctx.rng),
            };
            let is_lead = index == 0;
            let token = ctx.surface.animate(*curve, target, ctx.duration, is_lead)?;
            if is_lead {
                self.lead = token;
            }
        }

        self.steps += 1;
        tracing::debug!(
            step = self.steps,
            curves = pattern.curves().len(),
            duration_ms = ctx.duration.as_millis() as u64,
            "animation step issued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PatternAssembler, PatternSpec, Viewport};

    const STEP: Duration = Duration::from_millis(100);

    struct Rig {
        surface: RenderSurface,
        rng: RandomSource,
        assembler: PatternAssembler,
        driver: AnimationDriver,
    }

    impl Rig {
        fn new(line_count: u32) -> Self {
            let mut surface = RenderSurface::new(Viewport::default());
            let mut rng = RandomSource::seeded(17);
            let mut assembler = PatternAssembler::new(0.02);
            assembler
                .rebuild(
                    &mut surface,
                    &mut rng,
                    PatternSpec {
                        line_count,
                        curve_points: 3,
                        radial_repetitions: 4,
                        do_fill: false,
                    },
                )
                .unwrap();
            Self {
                surface,
                rng,
                assembler,
                driver: AnimationDriver::new(),
            }
        }

        fn start(&mut self) -> bool {
            let ctx = StepContext {
                surface: &mut self.surface,
                rng: &mut self.rng,
                pattern: self.assembler.current(),
                duration: STEP,
            };
            self.driver.start(ctx).unwrap()
        }

        fn toggle(&mut self) -> AnimationState {
            let ctx = StepContext {
                surface: &mut self.surface,
                rng: &mut self.rng,
                pattern: self.assembler.current(),
                duration: STEP,
            };
            self.driver.toggle(ctx).unwrap()
        }

        fn advance(&mut self, delta: Duration) -> bool {
            let completed = self.surface.advance(delta);
            let ctx = StepContext {
                surface: &mut self.surface,
                rng: &mut self.rng,
                pattern: self.assembler.current(),
                duration: STEP,
            };
            self.driver.on_completed(&completed, ctx).unwrap()
        }
    }

    #[test]
    fn start_animates_every_curve_with_one_lead() {
        let mut rig = Rig::new(3);
        assert!(rig.start());
        assert!(rig.driver.is_animating());
        assert_eq!(rig.surface.active_transitions(), 3);
        assert_eq!(rig.surface.pending_notifications(), 1);
        let lead = rig.assembler.current().unwrap().curves()[0];
        assert!(rig.surface.is_transitioning(lead));
    }

    #[test]
    fn start_is_idempotent() {
        let mut rig = Rig::new(2);
        assert!(rig.start());
        assert!(!rig.start());
        assert_eq!(rig.driver.steps(), 1);
        assert_eq!(rig.surface.pending_notifications(), 1);
    }

    #[test]
    fn lead_completion_schedules_the_next_step() {
        let mut rig = Rig::new(2);
        rig.start();
        assert!(!rig.advance(STEP / 2));
        assert!(rig.advance(STEP / 2));
        assert_eq!(rig.driver.steps(), 2);
        assert_eq!(rig.surface.active_transitions(), 2);
        for _ in 0..5 {
            assert!(rig.advance(STEP));
        }
        assert_eq!(rig.driver.steps(), 7);
    }

    #[test]
    fn stop_lets_the_current_step_coast() {
        let mut rig = Rig::new(2);
        rig.start();
        rig.advance(STEP / 4);
        assert!(rig.driver.stop());
        assert!(!rig.driver.stop());
        assert_eq!(rig.surface.active_transitions(), 2);

        assert!(!rig.advance(STEP));
        assert_eq!(rig.surface.active_transitions(), 0);
        assert_eq!(rig.driver.steps(), 1);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut rig = Rig::new(1);
        assert_eq!(rig.toggle(), AnimationState::Animating);
        assert_eq!(rig.toggle(), AnimationState::Idle);
        assert_eq!(rig.driver.state(), AnimationState::Idle);
    }

    #[test]
    fn empty_line_set_animates_nothing() {
        let mut rig = Rig::new(0);
        assert!(rig.start());
        assert_eq!(rig.surface.active_transitions(), 0);
        assert!(!rig.advance(STEP));
    }
}
