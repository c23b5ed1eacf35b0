//! Core library for the mandala generator.
//!
//! A mandala is a set of random open Bezier curves (the line set) drawn
//! together with its horizontal mirror image at evenly spaced rotations.
//! Each module owns one piece of that pipeline: seeded sampling, colours,
//! curve geometry, the node arena the drawing lives on, pattern assembly
//! and the animation loop. [`MandalaState`] ties them together.

pub mod animation;
pub mod colour;
pub mod config;
pub mod curve;
pub mod error;
pub mod export;
pub mod mandala;
pub mod params;
pub mod pattern;
pub mod random;
pub mod surface;

pub use animation::{AnimationDriver, AnimationState, StepContext};
pub use colour::{contrasting_colour, Fill, Hsb, Rgb};
pub use config::{AppConfig, RenderConfig};
pub use curve::{Curve, CurvePath, Point, Segment};
pub use error::{MandalaError, Result};
pub use export::{rasterize_svg, save_png};
pub use mandala::MandalaState;
pub use params::{CountRange, ParameterModel, ParameterUpdate, Parameters};
pub use pattern::{instance_angle, Instance, Pattern, PatternAssembler, PatternSpec};
pub use random::{zero_pad, RandomSource};
pub use surface::{
    CompletionToken, NodeId, NodeKind, PathAttrs, PathTarget, RenderSurface, Transform,
    TransformOp, Viewport,
};
