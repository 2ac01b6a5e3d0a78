use crate::layout_hierarchical::Positions;
use crate::settings::ViewSettings;
use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        node_id: String,
    },
}

/// Widest zoom range the camera accepts.
pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 4.0;

/// Camera (zoom and pan) plus the single-node drag gesture.
///
/// Graph space is canvas-local: at scale 1 and zero pan a graph point is
/// drawn at the same offset from the canvas corner. Zoom pivots on the
/// canvas centre, pan is stored in graph units.
#[derive(Debug, Clone)]
pub struct InteractionController {
    scale: f32,
    pan: Vec2,
    canvas: Rect,
    drag: DragState,
    min_zoom: f32,
    max_zoom: f32,
    hit_radius: f32,
}

impl InteractionController {
    /// Configured zoom bounds are narrowed to [`MIN_ZOOM`, `MAX_ZOOM`];
    /// non-finite or inverted bounds fall back to that full range.
    pub fn new(min_zoom: f32, max_zoom: f32, hit_radius: f32) -> Self {
        let (min_zoom, max_zoom) = zoom_bounds(min_zoom, max_zoom);
        Self {
            scale: 1.0_f32.clamp(min_zoom, max_zoom),
            pan: Vec2::ZERO,
            canvas: Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0)),
            drag: DragState::Idle,
            min_zoom,
            max_zoom,
            hit_radius,
        }
    }

    pub fn from_settings(view: &ViewSettings) -> Self {
        Self::new(view.min_zoom, view.max_zoom, view.node_radius)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn dragged_node(&self) -> Option<&str> {
        match &self.drag {
            DragState::Dragging { node_id } => Some(node_id),
            DragState::Idle => None,
        }
    }

    pub fn set_hit_radius(&mut self, radius: f32) {
        self.hit_radius = radius;
    }

    pub fn set_canvas(&mut self, canvas: Rect) {
        self.canvas = canvas;
    }

    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    /// Centre of the canvas in graph space at rest (scale 1, no pan).
    pub fn canvas_center(&self) -> Pos2 {
        (self.canvas.size() / 2.0).to_pos2()
    }

    // ---------------------------------------------------------------
    // Camera
    // ---------------------------------------------------------------

    pub fn zoom_by(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.scale = (self.scale * factor).clamp(self.min_zoom, self.max_zoom);
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.pan += screen_delta / self.scale;
    }

    /// Two-finger gesture or wheel: zoom and pan together. Never changes
    /// the drag state.
    pub fn pinch(&mut self, zoom_factor: f32, screen_delta: Vec2) {
        self.zoom_by(zoom_factor);
        self.pan_by(screen_delta);
    }

    pub fn reset_view(&mut self) {
        self.scale = 1.0_f32.clamp(self.min_zoom, self.max_zoom);
        self.pan = Vec2::ZERO;
    }

    pub fn graph_to_screen(&self, point: Pos2) -> Pos2 {
        let center = self.canvas_center();
        let local = center + (point + self.pan - center) * self.scale;
        self.canvas.min + local.to_vec2()
    }

    pub fn screen_to_graph(&self, point: Pos2) -> Pos2 {
        let center = self.canvas_center();
        let local = point - self.canvas.min.to_vec2();
        center + (local - center) / self.scale - self.pan
    }

    // ---------------------------------------------------------------
    // Drag
    // ---------------------------------------------------------------

    /// Closest node whose centre lies within the hit radius of `screen`.
    pub fn hit_test<'a>(
        &self,
        screen: Pos2,
        positions: &'a Positions,
    ) -> Option<&'a str> {
        let point = self.screen_to_graph(screen);
        positions
            .iter()
            .map(|(id, pos)| (id, pos.distance(point)))
            .filter(|(_, distance)| *distance <= self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(id, _)| id.as_str())
    }

    /// Starts dragging the node under the pointer, if any.
    pub fn pointer_down(&mut self, screen: Pos2, positions: &Positions) -> bool {
        if let Some(node_id) = self.hit_test(screen, positions) {
            debug!(node_id, "drag started");
            self.drag = DragState::Dragging {
                node_id: node_id.to_string(),
            };
            true
        } else {
            false
        }
    }

    /// Moves the dragged node by `screen_delta / scale`.
    pub fn pointer_move(&mut self, screen_delta: Vec2, positions: &mut Positions) {
        let DragState::Dragging { node_id } = &self.drag else {
            return;
        };
        match positions.get_mut(node_id) {
            Some(position) => *position += screen_delta / self.scale,
            None => self.drag = DragState::Idle,
        }
    }

    pub fn pointer_up(&mut self) {
        if let DragState::Dragging { node_id } = &self.drag {
            debug!(node_id = %node_id, "drag finished");
        }
        self.drag = DragState::Idle;
    }
}

fn zoom_bounds(min_zoom: f32, max_zoom: f32) -> (f32, f32) {
    if !min_zoom.is_finite() || !max_zoom.is_finite() || min_zoom > max_zoom {
        return (MIN_ZOOM, MAX_ZOOM);
    }
    (
        min_zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        max_zoom.clamp(MIN_ZOOM, MAX_ZOOM),
    )
}
