//! Minimap projection.
//!
//! The minimap shows every visible node scaled into a fixed-size box, plus the
//! part of the world currently shown by the canvas. The viewport rectangle is
//! clipped to the box; it can be partly or entirely outside the graph.

use crate::config::MinimapConfig;
use crate::model::NodeId;
use crate::viewport::{visible_world_rect, Position, Rect, Viewport};

/// Maps world space onto the minimap box and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapProjection {
    /// World bounds being shown.
    pub world: Rect,
    pub scale: f32,
    /// Minimap position of the world bounds' top-left corner.
    pub offset: Position,
}

impl MinimapProjection {
    /// Fit `world` into the minimap box, centred, keeping the aspect ratio.
    pub fn new(world: Rect, config: &MinimapConfig) -> Self {
        let avail_w = (config.width - 2.0 * config.padding).max(1.0);
        let avail_h = (config.height - 2.0 * config.padding).max(1.0);
        let world_w = world.width.max(1.0);
        let world_h = world.height.max(1.0);
        let scale = (avail_w / world_w).min(avail_h / world_h);

        let offset = Position::new(
            (config.width - world_w * scale) / 2.0,
            (config.height - world_h * scale) / 2.0,
        );
        Self { world, scale, offset }
    }

    pub fn to_minimap(&self, world: Position) -> Position {
        (world - self.world.origin()) * self.scale + self.offset
    }

    pub fn to_world(&self, minimap: Position) -> Position {
        (minimap - self.offset) * (1.0 / self.scale) + self.world.origin()
    }

    pub fn rect_to_minimap(&self, world: &Rect) -> Rect {
        let origin = self.to_minimap(world.origin());
        Rect::new(origin.x, origin.y, world.width * self.scale, world.height * self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimapNode {
    pub id: NodeId,
    pub rect: Rect,
}

/// What the minimap draws, in minimap-local pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MinimapView {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<MinimapNode>,
    /// `None` when the visible area lies completely outside the box.
    pub viewport: Option<Rect>,
    pub projection: Option<MinimapProjection>,
}

/// Project node bounds and the current viewport into the minimap.
///
/// `nodes` are world-space bounds in paint order.
pub fn project_minimap<I>(
    nodes: I,
    viewport: &Viewport,
    canvas_rect: &Rect,
    config: &MinimapConfig,
) -> MinimapView
where
    I: IntoIterator<Item = (NodeId, Rect)>,
{
    let nodes: Vec<(NodeId, Rect)> = nodes.into_iter().collect();
    let Some(world) = Rect::bounding(nodes.iter().map(|(_, r)| *r)) else {
        return MinimapView {
            width: config.width,
            height: config.height,
            ..Default::default()
        };
    };

    let projection = MinimapProjection::new(world, config);
    let bounds = Rect::new(0.0, 0.0, config.width, config.height);
    let visible = visible_world_rect(viewport, canvas_rect);

    MinimapView {
        width: config.width,
        height: config.height,
        nodes: nodes
            .into_iter()
            .map(|(id, rect)| MinimapNode {
                id,
                rect: projection.rect_to_minimap(&rect),
            })
            .collect(),
        viewport: projection.rect_to_minimap(&visible).clip_to(&bounds),
        projection: Some(projection),
    }
}

/// Viewport with the same zoom, panned so `world` sits in the canvas centre.
pub fn center_on(world: Position, viewport: &Viewport, canvas_rect: &Rect) -> Viewport {
    Viewport {
        x: canvas_rect.width / 2.0 - world.x * viewport.zoom,
        y: canvas_rect.height / 2.0 - world.y * viewport.zoom,
        zoom: viewport.zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::screen_to_canvas;

    fn config() -> MinimapConfig {
        MinimapConfig {
            width: 200.0,
            height: 100.0,
            padding: 0.0,
        }
    }

    #[test]
    fn test_projection_keeps_aspect_and_centres() {
        // 400x100 world into 200x100: scale 0.5, vertically centred
        let p = MinimapProjection::new(Rect::new(0.0, 0.0, 400.0, 100.0), &config());
        assert_eq!(p.scale, 0.5);
        assert_eq!(p.to_minimap(Position::new(0.0, 0.0)), Position::new(0.0, 25.0));
        assert_eq!(p.to_minimap(Position::new(400.0, 100.0)), Position::new(200.0, 75.0));
        assert_eq!(p.to_world(Position::new(100.0, 50.0)), Position::new(200.0, 50.0));
    }

    #[test]
    fn test_empty_graph() {
        let view = project_minimap(
            Vec::new(),
            &Viewport::default(),
            &Rect::new(0.0, 0.0, 800.0, 600.0),
            &config(),
        );
        assert!(view.nodes.is_empty());
        assert!(view.viewport.is_none());
        assert!(view.projection.is_none());
    }

    #[test]
    fn test_viewport_rect_is_clipped() {
        let nodes = vec![
            (NodeId::from("a"), Rect::new(0.0, 0.0, 100.0, 50.0)),
            (NodeId::from("b"), Rect::new(300.0, 50.0, 100.0, 50.0)),
        ];
        // Visible world is 0..800 x 0..600, far larger than the graph
        let view = project_minimap(
            nodes,
            &Viewport::default(),
            &Rect::new(0.0, 0.0, 800.0, 600.0),
            &config(),
        );
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.nodes[1].rect, Rect::new(150.0, 50.0, 50.0, 25.0));
        let vp = view.viewport.unwrap();
        assert_eq!(vp, Rect::new(0.0, 25.0, 200.0, 75.0));
    }

    #[test]
    fn test_viewport_outside_graph_is_none() {
        let nodes = vec![(NodeId::from("a"), Rect::new(0.0, 0.0, 100.0, 50.0))];
        let far_away = Viewport::new(-100_000.0, -100_000.0, 1.0);
        let view = project_minimap(nodes, &far_away, &Rect::new(0.0, 0.0, 800.0, 600.0), &config());
        assert!(view.viewport.is_none());
    }

    #[test]
    fn test_center_on() {
        let canvas = Rect::new(0.0, 0.0, 800.0, 600.0);
        let vp = center_on(Position::new(1000.0, 500.0), &Viewport::new(0.0, 0.0, 2.0), &canvas);
        assert_eq!(vp.zoom, 2.0);
        assert_eq!(
            screen_to_canvas(Position::new(400.0, 300.0), &vp, &canvas),
            Position::new(1000.0, 500.0)
        );
    }
}
