use crate::interaction::InteractionController;
use crate::layout_hierarchical::Positions;
use concept_map::{GraphDocument, SyncSnapshot};
use eframe::egui::{
    self, Color32, FontId, Galley, Pos2, Shape, Stroke, pos2, vec2,
    epaint::{CircleShape, QuadraticBezierShape, TextShape},
};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_NODE_COLOR: Color32 = Color32::from_rgb(0x64, 0x74, 0x8B);

const TITLE_FONT: f32 = 28.0;
const NODE_FONT: f32 = 28.0;
const EDGE_FONT: f32 = 23.0;
const EDGE_WIDTH: f32 = 3.0;
const HIGHLIGHTED_EDGE_WIDTH: f32 = 5.0;
const EDGE_LABEL_LIFT: f32 = 30.0;
const SHADOW_OFFSET: f32 = 4.0;
const RING_GAP: f32 = 12.0;
const RING_WIDTH: f32 = 4.0;
const INNER_CIRCLE: f32 = 0.85;
const LABEL_WIDTH: f32 = 1.6;
const LINE_HEIGHT: f32 = 1.2;

const TEXT_PRIMARY: Color32 = Color32::from_rgb(0x1F, 0x29, 0x37);
const TEXT_SECONDARY: Color32 = Color32::from_rgb(0x6B, 0x72, 0x80);
const EDGE_COLOR: Color32 = Color32::from_rgb(0x6B, 0x72, 0x80);
const HIGHLIGHTED_EDGE_COLOR: Color32 =
    Color32::from_rgb(0x3B, 0x82, 0xF6);
const RING_COLOR: Color32 = Color32::from_rgb(0xFF, 0xD7, 0x00);

static CATEGORY_COLORS: Lazy<HashMap<&'static str, Color32>> =
    Lazy::new(|| {
        let blue = Color32::from_rgb(0x3B, 0x82, 0xF6);
        let green = Color32::from_rgb(0x10, 0xB9, 0x81);
        let violet = Color32::from_rgb(0x8B, 0x5C, 0xF6);
        HashMap::from([
            ("Core", blue),
            ("Main", blue),
            ("Taxonomy", blue),
            ("Action", green),
            ("Biology", green),
            ("Leaf", green),
            ("Outcome", Color32::from_rgb(0xF5, 0x9E, 0x0B)),
            ("Application", Color32::from_rgb(0xEC, 0x48, 0x99)),
            ("Biological Feature", violet),
            ("Secondary", violet),
            ("Social Structure", Color32::from_rgb(0x14, 0xB8, 0xA6)),
            ("History", Color32::from_rgb(0x63, 0x66, 0xF1)),
            ("Nutrition", Color32::from_rgb(0x84, 0xCC, 0x16)),
            ("Behavior", Color32::from_rgb(0x06, 0xB6, 0xD4)),
            ("Health", Color32::from_rgb(0xF4, 0x3F, 0x5E)),
            ("Ecology", Color32::from_rgb(0x22, 0xC5, 0x5E)),
            ("Genetics", Color32::from_rgb(0xA8, 0x55, 0xF7)),
            ("Agriculture", Color32::from_rgb(0xF9, 0x73, 0x16)),
        ])
    });

pub fn category_color(category: &str) -> Color32 {
    CATEGORY_COLORS
        .get(category)
        .copied()
        .unwrap_or(DEFAULT_NODE_COLOR)
}

/// Control point of the quadratic edge curve, pulled toward the source.
pub fn edge_control_point(from: Pos2, to: Pos2) -> Pos2 {
    pos2((from.x + to.x) / 2.0, from.y + (to.y - from.y) * 0.3)
}

/// Dragging wins over highlighting.
pub fn node_radius(
    base: f32,
    highlighted: bool,
    dragged: bool,
    drag_scale: f32,
    highlight_growth: f32,
) -> f32 {
    if dragged {
        base * drag_scale
    } else if highlighted {
        base * highlight_growth
    } else {
        base
    }
}

/// Greedy word wrap. A single word wider than `max_width` gets its own line.
pub fn wrap_label(
    text: &str,
    max_width: f32,
    measure: impl Fn(&str) -> f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// -------------------------------------------------------------------
// Scene
// -------------------------------------------------------------------

/// Everything one frame of the concept map needs. Read-only.
pub struct Scene<'a> {
    pub document: &'a GraphDocument,
    pub positions: &'a Positions,
    pub sync: &'a SyncSnapshot,
    pub camera: &'a InteractionController,
    pub node_radius: f32,
    pub highlight_growth: f32,
    /// Eased growth of the dragged node, 1.0 when nothing is dragged.
    pub drag_scale: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub nodes: usize,
    pub edges: usize,
}

pub fn paint(
    ctx: &egui::Context,
    painter: &egui::Painter,
    scene: &Scene,
) -> SceneStats {
    let mut shapes = Vec::new();
    let stats = build_shapes(ctx, scene, &mut shapes);
    painter.extend(shapes);
    stats
}

pub fn build_shapes(
    ctx: &egui::Context,
    scene: &Scene,
    out: &mut Vec<Shape>,
) -> SceneStats {
    let canvas = scene.camera.canvas();

    if scene.document.nodes.is_empty() {
        centered_text(
            ctx,
            out,
            canvas.center(),
            "No data found",
            TITLE_FONT,
            TEXT_SECONDARY,
        );
        return SceneStats::default();
    }

    centered_text(
        ctx,
        out,
        canvas.center_top() + vec2(0.0, 30.0),
        &scene.document.main_concept,
        TITLE_FONT,
        TEXT_PRIMARY,
    );

    let edges = add_edges(ctx, scene, out);
    let nodes = add_nodes(ctx, scene, out);
    SceneStats { nodes, edges }
}

fn add_edges(
    ctx: &egui::Context,
    scene: &Scene,
    out: &mut Vec<Shape>,
) -> usize {
    let camera = scene.camera;
    let scale = camera.scale();
    let mut drawn = 0;

    for edge in &scene.document.edges {
        if !scene.sync.is_edge_drawable(edge) {
            continue;
        }
        let (Some(&from), Some(&to)) = (
            scene.positions.get(&edge.from),
            scene.positions.get(&edge.to),
        ) else {
            continue;
        };

        let highlighted = scene.sync.is_edge_highlighted(&edge.id);
        let stroke = if highlighted {
            Stroke::new(HIGHLIGHTED_EDGE_WIDTH * scale, HIGHLIGHTED_EDGE_COLOR)
        } else {
            Stroke::new(EDGE_WIDTH * scale, EDGE_COLOR.gamma_multiply(0.6))
        };
        let points = [
            camera.graph_to_screen(from),
            camera.graph_to_screen(edge_control_point(from, to)),
            camera.graph_to_screen(to),
        ];
        out.push(
            QuadraticBezierShape::from_points_stroke(
                points,
                false,
                Color32::TRANSPARENT,
                stroke,
            )
            .into(),
        );

        if !edge.label.is_empty() {
            let mid = pos2(
                (from.x + to.x) / 2.0,
                (from.y + to.y) / 2.0 - EDGE_LABEL_LIFT,
            );
            centered_text(
                ctx,
                out,
                camera.graph_to_screen(mid),
                &edge.label,
                EDGE_FONT * scale,
                TEXT_SECONDARY,
            );
        }
        drawn += 1;
    }
    drawn
}

fn add_nodes(
    ctx: &egui::Context,
    scene: &Scene,
    out: &mut Vec<Shape>,
) -> usize {
    let camera = scene.camera;
    let scale = camera.scale();
    let dragged_id = camera.dragged_node();
    let mut drawn = 0;

    for node in &scene.document.nodes {
        if !scene.sync.is_visible(&node.id) {
            continue;
        }
        let Some(&position) = scene.positions.get(&node.id) else {
            continue;
        };

        let highlighted = scene.sync.is_node_highlighted(&node.id);
        let dragged = dragged_id == Some(node.id.as_str());
        let base = category_color(&node.category);
        let fill = if dragged {
            base.gamma_multiply(0.9)
        } else if highlighted {
            base
        } else {
            base.gamma_multiply(0.8)
        };
        let radius = node_radius(
            scene.node_radius,
            highlighted,
            dragged,
            scene.drag_scale,
            scene.highlight_growth,
        ) * scale;
        let center = camera.graph_to_screen(position);

        out.push(
            CircleShape::filled(
                center + vec2(SHADOW_OFFSET, SHADOW_OFFSET) * scale,
                radius,
                Color32::BLACK.gamma_multiply(0.15),
            )
            .into(),
        );
        out.push(CircleShape::filled(center, radius, fill).into());
        if highlighted {
            out.push(
                CircleShape::stroke(
                    center,
                    radius + RING_GAP * scale,
                    Stroke::new(
                        RING_WIDTH * scale,
                        RING_COLOR.gamma_multiply(0.5),
                    ),
                )
                .into(),
            );
        }
        out.push(
            CircleShape::filled(
                center,
                radius * INNER_CIRCLE,
                Color32::WHITE.gamma_multiply(0.25),
            )
            .into(),
        );

        add_label(ctx, out, center, &node.label, radius * LABEL_WIDTH, scale);
        drawn += 1;
    }
    drawn
}

/// Wrapped label, vertically centred on the node.
fn add_label(
    ctx: &egui::Context,
    out: &mut Vec<Shape>,
    center: Pos2,
    text: &str,
    max_width: f32,
    scale: f32,
) {
    let size = NODE_FONT * scale;
    let lines = wrap_label(text, max_width, |line| {
        galley(ctx, line, size, TEXT_PRIMARY).size().x
    });
    let line_height = size * LINE_HEIGHT;
    let total = lines.len() as f32 * line_height;
    let first = center.y - total / 2.0 + line_height / 2.0;
    for (i, line) in lines.iter().enumerate() {
        centered_text(
            ctx,
            out,
            pos2(center.x, first + i as f32 * line_height),
            line,
            size,
            TEXT_PRIMARY,
        );
    }
}

fn galley(
    ctx: &egui::Context,
    text: &str,
    size: f32,
    color: Color32,
) -> Arc<Galley> {
    ctx.fonts_mut(|f| {
        f.layout_no_wrap(
            text.to_string(),
            FontId::proportional(size.max(1.0)),
            color,
        )
    })
}

fn centered_text(
    ctx: &egui::Context,
    out: &mut Vec<Shape>,
    center: Pos2,
    text: &str,
    size: f32,
    color: Color32,
) {
    let galley = galley(ctx, text, size, color);
    let top_left = center - galley.size() / 2.0;
    out.push(TextShape::new(top_left, galley, color).into());
}
