use std::{path::Path, time::Duration};

use crate::{
    animation::StepContext, export, AnimationDriver, AnimationState, AppConfig, ParameterModel,
    ParameterUpdate, Parameters, Pattern, PatternAssembler, RandomSource, RenderConfig,
    RenderSurface, Result,
};

/// Owned state of one mandala: parameters, random source, surface, the
/// pattern on it and the animation driver.
#[derive(Debug)]
pub struct MandalaState {
    params: ParameterModel,
    rng: RandomSource,
    surface: RenderSurface,
    assembler: PatternAssembler,
    driver: AnimationDriver,
    render: RenderConfig,
}

impl MandalaState {
    /// Creates an empty state; call [`MandalaState::regenerate`] to draw.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => RandomSource::seeded(seed),
            None => RandomSource::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &AppConfig, rng: RandomSource) -> Result<Self> {
        Ok(Self {
            params: ParameterModel::new(config.parameters.clone())?,
            rng,
            surface: RenderSurface::new(config.render.viewport()),
            assembler: PatternAssembler::new(config.render.stroke_width),
            driver: AnimationDriver::new(),
            render: config.render.clone(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn parameters(&self) -> &Parameters {
        self.params.parameters()
    }

    /// Merges a partial update. Takes effect on the next regeneration,
    /// except the animation time which applies from the next step.
    pub fn set_parameters(&mut self, update: &ParameterUpdate) -> Result<()> {
        self.params.set_parameters(update)
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.assembler.current()
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    /// Stops any animation, samples new counts and rebuilds the pattern.
    /// Every handle from the previous pattern is stale afterwards.
    pub fn regenerate(&mut self) -> Result<&Pattern> {
        self.driver.stop();
        let spec = self.params.sample(&mut self.rng)?;
        tracing::info!(
            lines = spec.line_count,
            points = spec.curve_points,
            repetitions = spec.radial_repetitions,
            fill = spec.do_fill,
            "regenerating mandala"
        );
        let pattern = self.assembler.rebuild(&mut self.surface, &mut self.rng, spec)?;
        if let Some(extent) = self.surface.bounds() {
            tracing::debug!(
                x0 = extent.x0,
                y0 = extent.y0,
                x1 = extent.x1,
                y1 = extent.y1,
                "pattern extent"
            );
        }
        Ok(pattern)
    }

    pub fn animation_state(&self) -> AnimationState {
        self.driver.state()
    }

    pub fn is_animating(&self) -> bool {
        self.driver.is_animating()
    }

    pub fn animation_steps(&self) -> u64 {
        self.driver.steps()
    }

    /// Returns `false` when already animating.
    pub fn start_animation(&mut self) -> Result<bool> {
        let (driver, ctx) = self.driver_and_context();
        let started = driver.start(ctx)?;
        if started {
            tracing::info!("animation started");
        }
        Ok(started)
    }

    /// Returns `false` when already idle.
    pub fn stop_animation(&mut self) -> bool {
        let stopped = self.driver.stop();
        if stopped {
            tracing::info!("animation stopped");
        }
        stopped
    }

    pub fn toggle_animation(&mut self) -> Result<AnimationState> {
        let (driver, ctx) = self.driver_and_context();
        let state = driver.toggle(ctx)?;
        tracing::info!(?state, "animation toggled");
        Ok(state)
    }

    /// Moves surface time forward, applying running transitions and issuing
    /// the next animation step if the lead transition completed.
    pub fn advance(&mut self, delta: Duration) -> Result<bool> {
        let completed = self.surface.advance(delta);
        if !completed.is_empty() {
            tracing::debug!(
                completed = completed.len(),
                now_ms = self.surface.now().as_millis() as u64,
                "transitions completed"
            );
        }
        let (driver, ctx) = self.driver_and_context();
        driver.on_completed(&completed, ctx)
    }

    pub fn to_svg(&self) -> String {
        self.surface.to_svg()
    }

    /// Writes the current frame as a PNG of the configured size.
    pub fn export_png(&self, path: impl AsRef<Path>) -> Result<()> {
        export::save_png(
            &self.to_svg(),
            self.render.width,
            self.render.height,
            self.render.background,
            path,
        )
    }

    fn driver_and_context(&mut self) -> (&mut AnimationDriver, StepContext<'_>) {
        let ctx = StepContext {
            surface: &mut self.surface,
            rng: &mut self.rng,
            pattern: self.assembler.current(),
            duration: self.params.parameters().animation_time(),
        };
        (&mut self.driver, ctx)
    }
}
