use serde::{Deserialize, Serialize};

use crate::{
    Curve, MandalaError, NodeId, PathAttrs, RandomSource, RenderSurface, Result, Transform,
};

/// Concrete counts a pattern is built from, sampled from the parameter
/// bounds on every regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub line_count: u32,
    pub curve_points: u32,
    pub radial_repetitions: u32,
    pub do_fill: bool,
}

/// One rotated placement of the base line set or its mirror image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub node: NodeId,
    pub angle_degrees: f64,
    pub mirrored: bool,
}

/// Surface handles owned by a built pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    spec: PatternSpec,
    curves: Vec<NodeId>,
    base: NodeId,
    mirror_ref: NodeId,
    mirror: NodeId,
    instances: Vec<Instance>,
}

impl Pattern {
    pub fn spec(&self) -> &PatternSpec {
        &self.spec
    }

    /// Path nodes of the base line set, in generation order.
    pub fn curves(&self) -> &[NodeId] {
        &self.curves
    }

    pub fn base_group(&self) -> NodeId {
        self.base
    }

    pub fn mirror_group(&self) -> NodeId {
        self.mirror
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Every node handle this pattern created.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.curves
            .iter()
            .copied()
            .chain([self.base, self.mirror_ref, self.mirror])
            .chain(self.instances.iter().map(|instance| instance.node))
    }

    /// Releases every node the pattern owns.
    pub fn release(self, surface: &mut RenderSurface) -> Result<()> {
        for node in self.nodes() {
            surface.release(node)?;
        }
        Ok(())
    }
}

/// Rotation of instance `index` out of `2 * repetitions` evenly spaced slots.
pub fn instance_angle(index: u32, repetitions: u32) -> f64 {
    index as f64 * 180.0 / repetitions as f64
}

/// Builds radially symmetric patterns on a [`RenderSurface`] and owns the
/// pattern currently shown.
#[derive(Debug)]
pub struct PatternAssembler {
    stroke_width: f64,
    current: Option<Pattern>,
}

impl PatternAssembler {
    pub fn new(stroke_width: f64) -> Self {
        Self {
            stroke_width,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Pattern> {
        self.current.as_ref()
    }

    /// Replaces whatever is on the surface with a freshly generated pattern.
    ///
    /// Fails before touching the surface when `2 * radial_repetitions` does
    /// not fit in a `u32`. The previous pattern's handles are released, the
    /// surface is cleared,
    /// then the base line set is generated into the definitions together
    /// with its horizontal mirror. Finally `2 * radial_repetitions`
    /// instances are placed at `i * 180 / radial_repetitions` degrees,
    /// odd indices using the mirror.
    pub fn rebuild(
        &mut self,
        surface: &mut RenderSurface,
        rng: &mut RandomSource,
        spec: PatternSpec,
    ) -> Result<&Pattern> {
        let slots = spec
            .radial_repetitions
            .checked_mul(2)
            .ok_or_else(|| MandalaError::CountLimit {
                name: "radial repetitions".to_string(),
                max: spec.radial_repetitions,
                limit: u32::MAX / 2,
            })?;

        // The surface is wiped even when a handle fails to release, so a
        // forgotten pattern never leaves nodes behind.
        let released = match self.current.take() {
            Some(previous) => previous.release(surface),
            None => Ok(()),
        };
        surface.clear();
        released?;

        let mut curves = Vec::with_capacity(spec.line_count as usize);
        for _ in 0..spec.line_count {
            let curve = Curve::random(rng, spec.curve_points, spec.do_fill);
            curves.push(surface.path(PathAttrs {
                data: curve.path,
                stroke: curve.stroke,
                stroke_width: self.stroke_width,
                fill: curve.fill,
            }));
        }
        let base = surface.group(&curves)?;
        surface.to_defs(base)?;

        let mirror_ref = surface.use_of(base, Transform::scale(-1.0, 1.0))?;
        let mirror = surface.group(&[mirror_ref])?;
        surface.to_defs(mirror)?;

        let mut instances = Vec::with_capacity(slots as usize);
        for index in 0..slots {
            let angle_degrees = instance_angle(index, spec.radial_repetitions);
            let mirrored = index % 2 == 1;
            let source = if mirrored { mirror } else { base };
            let node = surface.use_of(source, Transform::rotate(angle_degrees))?;
            surface.append(node)?;
            instances.push(Instance {
                node,
                angle_degrees,
                mirrored,
            });
        }

        tracing::debug!(
            lines = spec.line_count,
            points = spec.curve_points,
            repetitions = spec.radial_repetitions,
            instances = instances.len(),
            "pattern rebuilt"
        );

        Ok(&*self.current.insert(Pattern {
            spec,
            curves,
            base,
            mirror_ref,
            mirror,
            instances,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fill, NodeKind, Viewport};

    fn spec(line_count: u32, radial_repetitions: u32, do_fill: bool) -> PatternSpec {
        PatternSpec {
            line_count,
            curve_points: 3,
            radial_repetitions,
            do_fill,
        }
    }

    fn build(spec: PatternSpec) -> (RenderSurface, PatternAssembler) {
        let mut surface = RenderSurface::new(Viewport::default());
        let mut rng = RandomSource::seeded(21);
        let mut assembler = PatternAssembler::new(0.02);
        assembler.rebuild(&mut surface, &mut rng, spec).unwrap();
        (surface, assembler)
    }

    #[test]
    fn places_two_instances_per_repetition_evenly_spaced() {
        for repetitions in 1..=9 {
            let (surface, assembler) = build(spec(2, repetitions, false));
            let pattern = assembler.current().unwrap();
            let instances = pattern.instances();
            assert_eq!(instances.len(), 2 * repetitions as usize);
            assert_eq!(surface.root().len(), instances.len());

            let step = 360.0 / instances.len() as f64;
            for (i, instance) in instances.iter().enumerate() {
                assert!((instance.angle_degrees - i as f64 * step).abs() < 1e-9);
                assert_eq!(instance.mirrored, i % 2 == 1);
            }
        }
    }

    #[test]
    fn instances_reference_base_or_mirror() {
        let (surface, assembler) = build(spec(3, 4, false));
        let pattern = assembler.current().unwrap();
        for instance in pattern.instances() {
            let NodeKind::Use { target, transform } = surface.node(instance.node).unwrap() else {
                panic!("instance should be a use node");
            };
            let expected = if instance.mirrored {
                pattern.mirror_group()
            } else {
                pattern.base_group()
            };
            assert_eq!(*target, expected);
            assert_eq!(*transform, Transform::rotate(instance.angle_degrees));
        }
        assert_eq!(surface.defs(), &[pattern.base_group(), pattern.mirror_group()]);
    }

    #[test]
    fn mirror_flips_horizontally() {
        let (surface, assembler) = build(spec(1, 2, false));
        let pattern = assembler.current().unwrap();
        let NodeKind::Group { children } = surface.node(pattern.mirror_group()).unwrap() else {
            panic!("mirror should be a group");
        };
        let NodeKind::Use { target, transform } = surface.node(children[0]).unwrap() else {
            panic!("mirror child should be a use node");
        };
        assert_eq!(*target, pattern.base_group());
        assert_eq!(*transform, Transform::scale(-1.0, 1.0));
    }

    #[test]
    fn zero_counts_are_valid_and_empty() {
        let (surface, assembler) = build(spec(2, 0, false));
        assert!(assembler.current().unwrap().instances().is_empty());
        assert!(surface.root().is_empty());

        let (surface, assembler) = build(spec(0, 3, false));
        let pattern = assembler.current().unwrap();
        assert!(pattern.curves().is_empty());
        assert_eq!(pattern.instances().len(), 6);
        assert!(!surface.to_svg().contains("<path"));
    }

    #[test]
    fn fill_uses_contrasting_colour() {
        let (surface, assembler) = build(spec(4, 1, true));
        for curve in assembler.current().unwrap().curves() {
            let attrs = surface.path_attrs(*curve).unwrap();
            assert_eq!(attrs.fill, Fill::Solid(attrs.stroke.contrasting()));
        }
    }

    #[test]
    fn rebuild_releases_the_previous_pattern() {
        let (mut surface, mut assembler) = build(spec(2, 3, false));
        let old: Vec<NodeId> = assembler.current().unwrap().nodes().collect();
        let mut rng = RandomSource::seeded(99);
        assembler.rebuild(&mut surface, &mut rng, spec(1, 2, false)).unwrap();

        assert!(old.iter().all(|node| !surface.contains(*node)));
        let pattern = assembler.current().unwrap();
        assert_eq!(surface.live_nodes(), pattern.nodes().count());
    }

    #[test]
    fn oversized_repetitions_fail_without_touching_the_surface() {
        let (mut surface, mut assembler) = build(spec(2, 3, false));
        let live = surface.live_nodes();
        let mut rng = RandomSource::seeded(5);
        let err = assembler
            .rebuild(&mut surface, &mut rng, spec(1, u32::MAX / 2 + 1, false))
            .unwrap_err();
        assert!(matches!(err, MandalaError::CountLimit { .. }));
        assert!(assembler.current().is_some());
        assert_eq!(surface.live_nodes(), live);
    }

    #[test]
    fn failed_release_still_clears_the_surface() {
        let (mut surface, mut assembler) = build(spec(2, 3, false));
        let first = assembler.current().unwrap().instances()[0].node;
        surface.release(first).unwrap();

        let mut rng = RandomSource::seeded(6);
        let err = assembler
            .rebuild(&mut surface, &mut rng, spec(1, 2, false))
            .unwrap_err();
        assert!(matches!(err, MandalaError::StaleNode(_)));
        assert!(assembler.current().is_none());
        assert_eq!(surface.live_nodes(), 0);
        assert!(surface.root().is_empty() && surface.defs().is_empty());

        assembler.rebuild(&mut surface, &mut rng, spec(1, 2, false)).unwrap();
        assert_eq!(
            surface.live_nodes(),
            assembler.current().unwrap().nodes().count()
        );
    }
}
