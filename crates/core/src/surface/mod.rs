//! Arena-backed vector surface.
//!
//! Nodes live in generational slots. Clearing the surface or releasing a
//! node bumps the slot generation, so handles from before a rebuild are
//! rejected instead of silently pointing at new geometry.

use std::{
    collections::BTreeMap,
    fmt::{self, Write as _},
    time::Duration,
};

use kurbo::{Affine, Rect};
use serde::{Deserialize, Serialize};

use crate::{CurvePath, Fill, MandalaError, Result, Rgb};

/// Generational handle to a surface node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn dom_id(self) -> String {
        format!("node-{}-{}", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

/// Returned by [`RenderSurface::advance`] when a notifying transition ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    /// Rotation about the origin, in degrees.
    Rotate(f64),
    Scale(f64, f64),
}

/// Ordered transform list with SVG semantics: the last operation is applied
/// to a point first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transform {
    ops: Vec<TransformOp>,
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn rotate(degrees: f64) -> Self {
        Self::identity().then_rotate(degrees)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::identity().then_scale(sx, sy)
    }

    pub fn then_rotate(mut self, degrees: f64) -> Self {
        self.ops.push(TransformOp::Rotate(degrees));
        self
    }

    pub fn then_scale(mut self, sx: f64, sy: f64) -> Self {
        self.ops.push(TransformOp::Scale(sx, sy));
        self
    }

    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// The whole list as one affine map.
    pub fn to_affine(&self) -> Affine {
        self.ops.iter().fold(Affine::IDENTITY, |acc, op| {
            acc * match *op {
                TransformOp::Rotate(degrees) => Affine::rotate(degrees.to_radians()),
                TransformOp::Scale(sx, sy) => Affine::scale_non_uniform(sx, sy),
            }
        })
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match op {
                TransformOp::Rotate(degrees) => write!(f, "rotate({degrees})")?,
                TransformOp::Scale(sx, sy) => write!(f, "scale({sx},{sy})")?,
            }
        }
        Ok(())
    }
}

/// Paint and geometry of a path node.
#[derive(Debug, Clone, PartialEq)]
pub struct PathAttrs {
    pub data: CurvePath,
    pub stroke: Rgb,
    pub stroke_width: f64,
    pub fill: Fill,
}

/// Animatable subset of [`PathAttrs`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathTarget {
    pub data: CurvePath,
    pub stroke: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Path(PathAttrs),
    Group { children: Vec<NodeId> },
    Use { target: NodeId, transform: Transform },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Detached,
    Root,
    Defs,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<(NodeKind, Placement)>,
}

#[derive(Debug, Clone)]
struct Transition {
    from: PathTarget,
    to: PathTarget,
    started: Duration,
    duration: Duration,
    token: Option<CompletionToken>,
}

/// Pixel size the `-1..1` view box is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderSurface {
    viewport: Viewport,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Vec<NodeId>,
    defs: Vec<NodeId>,
    transitions: BTreeMap<NodeId, Transition>,
    now: Duration,
    next_token: u64,
}

impl RenderSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Surface clock, advanced only by [`RenderSurface::advance`].
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Releases every node. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.root.clear();
        self.defs.clear();
        self.transitions.clear();
    }

    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    pub fn path(&mut self, attrs: PathAttrs) -> NodeId {
        self.insert(NodeKind::Path(attrs))
    }

    pub fn group(&mut self, children: &[NodeId]) -> Result<NodeId> {
        for child in children {
            self.slot(*child)?;
        }
        Ok(self.insert(NodeKind::Group {
            children: children.to_vec(),
        }))
    }

    /// Creates a reference to `target` drawn with its own transform.
    pub fn use_of(&mut self, target: NodeId, transform: Transform) -> Result<NodeId> {
        self.slot(target)?;
        Ok(self.insert(NodeKind::Use { target, transform }))
    }

    /// Appends a node to the rendered root.
    pub fn append(&mut self, id: NodeId) -> Result<()> {
        self.place(id, Placement::Root)
    }

    /// Moves a node into the definitions; it is only drawn through a `use`.
    pub fn to_defs(&mut self, id: NodeId) -> Result<()> {
        self.place(id, Placement::Defs)
    }

    /// Releases a single node. Children of a group are not released.
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        self.slot(id)?;
        let slot = &mut self.slots[id.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.root.retain(|node| *node != id);
        self.defs.retain(|node| *node != id);
        self.transitions.remove(&id);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeKind> {
        self.slot(id).map(|(kind, _)| kind)
    }

    pub fn path_attrs(&self, id: NodeId) -> Result<&PathAttrs> {
        match self.node(id)? {
            NodeKind::Path(attrs) => Ok(attrs),
            _ => Err(MandalaError::NotAPath(id.to_string())),
        }
    }

    pub fn root(&self) -> &[NodeId] {
        &self.root
    }

    pub fn defs(&self) -> &[NodeId] {
        &self.defs
    }

    /// Starts a transition of a path's geometry and stroke towards `target`.
    ///
    /// A transition already running on the node is replaced and its token
    /// never fires. With `notify` set, the returned token is reported by
    /// [`RenderSurface::advance`] once the transition ends.
    pub fn animate(
        &mut self,
        id: NodeId,
        target: PathTarget,
        duration: Duration,
        notify: bool,
    ) -> Result<Option<CompletionToken>> {
        let attrs = self.path_attrs(id)?;
        let from = PathTarget {
            data: attrs.data.clone(),
            stroke: attrs.stroke,
        };
        let token = notify.then(|| {
            self.next_token += 1;
            CompletionToken(self.next_token)
        });
        self.transitions.insert(
            id,
            Transition {
                from,
                to: target,
                started: self.now,
                duration,
                token,
            },
        );
        Ok(token)
    }

    pub fn is_transitioning(&self, id: NodeId) -> bool {
        self.transitions.contains_key(&id)
    }

    pub fn active_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Transitions that will report a completion token.
    pub fn pending_notifications(&self) -> usize {
        self.transitions
            .values()
            .filter(|transition| transition.token.is_some())
            .count()
    }

    /// Moves the clock forward by `delta`, applies all running transitions
    /// and returns the tokens of those that finished, in node order.
    pub fn advance(&mut self, delta: Duration) -> Vec<CompletionToken> {
        self.now += delta;
        let now = self.now;
        let mut finished = Vec::new();
        let mut completed = Vec::new();

        for (id, transition) in &self.transitions {
            let elapsed = now.saturating_sub(transition.started);
            let t = if transition.duration.is_zero() {
                1.0
            } else {
                (elapsed.as_secs_f64() / transition.duration.as_secs_f64()).min(1.0)
            };

            if let Some(Some((NodeKind::Path(attrs), _))) =
                self.slots.get_mut(id.index as usize).map(|slot| slot.node.as_mut())
            {
                attrs.data = transition.from.data.lerp(&transition.to.data, t);
                attrs.stroke = transition.from.stroke.lerp(transition.to.stroke, t);
            }

            if t >= 1.0 {
                finished.push(*id);
                completed.extend(transition.token);
            }
        }

        for id in finished {
            self.transitions.remove(&id);
        }
        completed
    }

    /// Bounding box of every rendered control point, in view-box units.
    /// `None` when nothing is drawn.
    pub fn bounds(&self) -> Option<Rect> {
        let mut bounds = None;
        for id in &self.root {
            self.extend_bounds(*id, Affine::IDENTITY, &mut bounds);
        }
        bounds
    }

    fn extend_bounds(&self, id: NodeId, affine: Affine, bounds: &mut Option<Rect>) {
        let Ok(kind) = self.node(id) else {
            return;
        };
        match kind {
            NodeKind::Path(attrs) => {
                for point in attrs.data.points() {
                    let placed = affine * point;
                    *bounds = Some(match *bounds {
                        Some(rect) => rect.union_pt(placed),
                        None => Rect::from_points(placed, placed),
                    });
                }
            }
            NodeKind::Group { children } => {
                for child in children {
                    self.extend_bounds(*child, affine, bounds);
                }
            }
            NodeKind::Use { target, transform } => {
                self.extend_bounds(*target, affine * transform.to_affine(), bounds);
            }
        }
    }

    /// Serialises the tree as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{}" height="{}" viewBox="-1 -1 2 2">"#,
            self.viewport.width, self.viewport.height
        );
        if !self.defs.is_empty() {
            svg.push_str("<defs>\n");
            for id in &self.defs {
                self.write_node(&mut svg, *id, true);
            }
            svg.push_str("</defs>\n");
        }
        for id in &self.root {
            self.write_node(&mut svg, *id, false);
        }
        svg.push_str("</svg>\n");
        svg
    }

    fn write_node(&self, out: &mut String, id: NodeId, with_id: bool) {
        let Ok(kind) = self.node(id) else {
            return;
        };
        let id_attr = if with_id {
            format!(r#" id="{}""#, id.dom_id())
        } else {
            String::new()
        };
        match kind {
            NodeKind::Path(attrs) => {
                let _ = writeln!(
                    out,
                    r#"<path{id_attr} d="{}" stroke="{}" stroke-width="{}" fill="{}"/>"#,
                    attrs.data, attrs.stroke, attrs.stroke_width, attrs.fill
                );
            }
            NodeKind::Group { children } => {
                let _ = writeln!(out, "<g{id_attr}>");
                for child in children {
                    self.write_node(out, *child, false);
                }
                out.push_str("</g>\n");
            }
            NodeKind::Use { target, transform } => {
                let _ = writeln!(
                    out,
                    r##"<use{id_attr} xlink:href="#{}" transform="{}"/>"##,
                    target.dom_id(),
                    transform
                );
            }
        }
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let node = Some((kind, Placement::Detached));
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = node;
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node,
        });
        NodeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    fn place(&mut self, id: NodeId, placement: Placement) -> Result<()> {
        self.slot(id)?;
        self.root.retain(|node| *node != id);
        self.defs.retain(|node| *node != id);
        match placement {
            Placement::Root => self.root.push(id),
            Placement::Defs => self.defs.push(id),
            Placement::Detached => {}
        }
        if let Some((_, current)) = self.slots[id.index as usize].node.as_mut() {
            *current = placement;
        }
        Ok(())
    }

    fn slot(&self, id: NodeId) -> Result<(&NodeKind, Placement)> {
        match self.slots.get(id.index as usize) {
            Some(Slot {
                generation,
                node: Some((kind, placement)),
            }) if *generation == id.generation => Ok((kind, *placement)),
            _ => Err(MandalaError::StaleNode(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, RandomSource, Segment};

    fn sample_path(rng: &mut RandomSource) -> PathAttrs {
        PathAttrs {
            data: CurvePath::random(rng, 3),
            stroke: Rgb::new(255, 0, 0),
            stroke_width: 0.02,
            fill: Fill::None,
        }
    }

    #[test]
    fn clear_invalidates_handles_and_reuses_slots() {
        let mut rng = RandomSource::seeded(1);
        let mut surface = RenderSurface::new(Viewport::default());
        let path = surface.path(sample_path(&mut rng));
        let group = surface.group(&[path]).unwrap();
        surface.append(group).unwrap();
        assert_eq!(surface.live_nodes(), 2);

        surface.clear();
        assert_eq!(surface.live_nodes(), 0);
        assert!(surface.root().is_empty());
        assert!(matches!(surface.node(path), Err(MandalaError::StaleNode(_))));

        let fresh = surface.path(sample_path(&mut rng));
        assert_ne!(fresh, path);
        assert!(surface.contains(fresh));
        assert!(!surface.contains(path));
    }

    #[test]
    fn release_detaches_from_root_and_defs() {
        let mut rng = RandomSource::seeded(1);
        let mut surface = RenderSurface::new(Viewport::default());
        let path = surface.path(sample_path(&mut rng));
        let group = surface.group(&[path]).unwrap();
        surface.to_defs(group).unwrap();
        let reference = surface.use_of(group, Transform::rotate(90.0)).unwrap();
        surface.append(reference).unwrap();

        surface.release(reference).unwrap();
        assert!(surface.root().is_empty());
        surface.release(group).unwrap();
        assert!(surface.defs().is_empty());
        assert!(surface.release(group).is_err());
    }

    #[test]
    fn transform_applies_rightmost_first() {
        let mirrored = Transform::scale(-1.0, 1.0).then_rotate(90.0);
        let p = mirrored.to_affine() * Point::new(1.0, 0.0);
        assert!((p.x - 0.0).abs() < 1e-12 && (p.y - 1.0).abs() < 1e-12);
        let rotated_then_flipped = Transform::rotate(90.0).then_scale(-1.0, 1.0);
        let q = rotated_then_flipped.to_affine() * Point::new(1.0, 0.0);
        assert!((q.x - 0.0).abs() < 1e-12 && (q.y + 1.0).abs() < 1e-12);
        assert_eq!(mirrored.to_string(), "scale(-1,1) rotate(90)");
    }

    #[test]
    fn bounds_follow_use_transforms_and_skip_defs() {
        let mut surface = RenderSurface::new(Viewport::default());
        assert!(surface.bounds().is_none());

        let data = CurvePath::new(
            Point::new(0.5, 0.0),
            vec![Segment::Cubic {
                c1: Point::new(0.5, 0.25),
                c2: Point::new(0.5, 0.5),
                end: Point::new(1.0, 0.5),
            }],
        );
        let path = surface.path(PathAttrs {
            data,
            stroke: Rgb::new(0, 0, 0),
            stroke_width: 0.02,
            fill: Fill::None,
        });
        let group = surface.group(&[path]).unwrap();
        surface.to_defs(group).unwrap();
        assert!(surface.bounds().is_none());

        let flipped = surface.use_of(group, Transform::scale(-1.0, 1.0)).unwrap();
        surface.append(flipped).unwrap();
        let rect = surface.bounds().unwrap();
        assert!((rect.x0 + 1.0).abs() < 1e-12 && (rect.x1 + 0.5).abs() < 1e-12);
        assert!(rect.y0.abs() < 1e-12 && (rect.y1 - 0.5).abs() < 1e-12);

        let turned = surface.use_of(group, Transform::rotate(180.0)).unwrap();
        surface.append(turned).unwrap();
        let rect = surface.bounds().unwrap();
        assert!((rect.x0 + 1.0).abs() < 1e-12 && (rect.x1 + 0.5).abs() < 1e-12);
        assert!((rect.y0 + 0.5).abs() < 1e-12 && (rect.y1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn transitions_interpolate_and_report_completion() {
        let mut rng = RandomSource::seeded(4);
        let mut surface = RenderSurface::new(Viewport::default());
        let path = surface.path(sample_path(&mut rng));
        let target = PathTarget {
            data: CurvePath::random(&mut rng, 3),
            stroke: Rgb::new(0, 0, 255),
        };

        let token = surface
            .animate(path, target.clone(), Duration::from_millis(100), true)
            .unwrap()
            .expect("notifying transition returns a token");

        assert!(surface.advance(Duration::from_millis(50)).is_empty());
        assert_eq!(surface.path_attrs(path).unwrap().stroke, Rgb::new(128, 0, 128));

        assert_eq!(surface.advance(Duration::from_millis(50)), vec![token]);
        let attrs = surface.path_attrs(path).unwrap();
        assert_eq!(attrs.data, target.data);
        assert_eq!(attrs.stroke, target.stroke);
        assert!(!surface.is_transitioning(path));
        assert!(surface.advance(Duration::from_millis(50)).is_empty());
    }

    #[test]
    fn silent_transition_and_replacement() {
        let mut rng = RandomSource::seeded(4);
        let mut surface = RenderSurface::new(Viewport::default());
        let path = surface.path(sample_path(&mut rng));
        let target = |rng: &mut RandomSource| PathTarget {
            data: CurvePath::random(rng, 3),
            stroke: Rgb::new(0, 0, 0),
        };

        let first = surface
            .animate(path, target(&mut rng), Duration::from_millis(10), true)
            .unwrap();
        assert!(first.is_some());
        let second = surface
            .animate(path, target(&mut rng), Duration::from_millis(10), false)
            .unwrap();
        assert!(second.is_none());
        assert_eq!(surface.active_transitions(), 1);
        assert_eq!(surface.pending_notifications(), 0);
        assert!(surface.advance(Duration::from_millis(20)).is_empty());
    }

    #[test]
    fn animating_a_group_is_rejected() {
        let mut rng = RandomSource::seeded(4);
        let mut surface = RenderSurface::new(Viewport::default());
        let group = surface.group(&[]).unwrap();
        let target = PathTarget {
            data: CurvePath::random(&mut rng, 2),
            stroke: Rgb::new(0, 0, 0),
        };
        assert!(matches!(
            surface.animate(group, target, Duration::ZERO, true),
            Err(MandalaError::NotAPath(_))
        ));
    }

    #[test]
    fn svg_contains_defs_and_references() {
        let mut rng = RandomSource::seeded(6);
        let mut surface = RenderSurface::new(Viewport {
            width: 320,
            height: 200,
        });
        let path = surface.path(sample_path(&mut rng));
        let group = surface.group(&[path]).unwrap();
        surface.to_defs(group).unwrap();
        let reference = surface.use_of(group, Transform::rotate(45.0)).unwrap();
        surface.append(reference).unwrap();

        let svg = surface.to_svg();
        assert!(svg.contains(r#"width="320" height="200" viewBox="-1 -1 2 2""#));
        assert!(svg.contains(&format!(r#"<g id="{}">"#, group.dom_id())));
        assert!(svg.contains(&format!(r##"xlink:href="#{}""##, group.dom_id())));
        assert!(svg.contains(r#"transform="rotate(45)""#));
        assert!(svg.contains(r#"fill="none""#));
        assert_eq!(svg.matches("<path").count(), 1);
    }
}
