use crate::settings::LayoutSpacing;
use concept_map::GraphDocument;
use eframe::egui::{Pos2, pos2};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// Node id to canvas-local graph position.
pub type Positions = HashMap<String, Pos2>;

/// Level-by-level layout: roots on top, each BFS level one row lower,
/// every row centred on `center.x`.
///
/// Roots are the nodes without incoming edges, or the first node when
/// every node has one (cycles). Nodes no root can reach sit on the top
/// row after the reachable ones. Edges naming unknown nodes are ignored
/// and duplicate node ids keep their first occurrence.
pub fn compute_positions(
    document: &GraphDocument,
    center: Pos2,
    spacing: &LayoutSpacing,
) -> Positions {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in &document.nodes {
        index
            .entry(node.id.as_str())
            .or_insert_with(|| graph.add_node(node.id.as_str()));
    }
    for edge in &document.edges {
        if let (Some(&from), Some(&to)) =
            (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        {
            graph.add_edge(from, to, ());
        }
    }

    let Some(first) = graph.node_indices().next() else {
        return Positions::new();
    };

    let mut roots: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&n| {
            graph
                .neighbors_directed(n, Direction::Incoming)
                .next()
                .is_none()
        })
        .collect();
    if roots.is_empty() {
        roots.push(first);
    }

    let levels = bfs_levels(&graph, &roots);

    let mut rows: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for (node, level) in levels {
        rows.entry(level).or_default().push(node);
    }

    let mut positions = Positions::with_capacity(graph.node_count());
    for (level, row) in &rows {
        let y = spacing.start_y + *level as f32 * spacing.level_height;
        let width = (row.len() - 1) as f32 * spacing.horizontal_spacing;
        let start_x = center.x - width / 2.0;
        for (i, &node) in row.iter().enumerate() {
            let x = if row.len() == 1 {
                center.x
            } else {
                start_x + i as f32 * spacing.horizontal_spacing
            };
            positions.insert(graph[node].to_string(), pos2(x, y));
        }
    }

    debug!(
        nodes = positions.len(),
        rows = rows.len(),
        roots = roots.len(),
        "computed hierarchical layout"
    );
    positions
}

/// Levels in discovery order; unreachable nodes follow at level 0.
fn bfs_levels(
    graph: &DiGraph<&str, ()>,
    roots: &[NodeIndex],
) -> Vec<(NodeIndex, usize)> {
    let mut seen = vec![false; graph.node_count()];
    let mut order = Vec::with_capacity(graph.node_count());
    let mut queue = VecDeque::new();

    for &root in roots {
        seen[root.index()] = true;
        queue.push_back((root, 0));
    }

    while let Some((node, level)) = queue.pop_front() {
        order.push((node, level));
        // petgraph walks outgoing edges newest first; restore list order.
        let mut children: Vec<_> = graph.edges(node).collect();
        children.sort_by_key(|edge| edge.id());
        for edge in children {
            let child = edge.target();
            if !seen[child.index()] {
                seen[child.index()] = true;
                queue.push_back((child, level + 1));
            }
        }
    }

    for node in graph.node_indices() {
        if !seen[node.index()] {
            order.push((node, 0));
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Pos2 = pos2(500.0, 400.0);

    fn document(nodes: &[&str], edges: &[(&str, &str)]) -> GraphDocument {
        let nodes: Vec<String> = nodes
            .iter()
            .map(|id| {
                format!(
                    r#"{{"id": "{id}", "label": "{id}", "category": "Core"}}"#
                )
            })
            .collect();
        let edges: Vec<String> = edges
            .iter()
            .map(|(from, to)| {
                format!(r#"{{"from": "{from}", "to": "{to}", "label": ""}}"#)
            })
            .collect();
        let json = format!(
            r#"{{"visualization_type": "Concept Map", "main_concept": "T", "nodes": [{}], "edges": [{}]}}"#,
            nodes.join(","),
            edges.join(",")
        );
        GraphDocument::try_decode(&json).expect("test document")
    }

    fn layout(doc: &GraphDocument) -> Positions {
        compute_positions(doc, CENTER, &LayoutSpacing::default())
    }

    #[test]
    fn test_tree_rows_are_centred() {
        let positions =
            layout(&document(&["A", "B", "C"], &[("A", "B"), ("A", "C")]));

        assert_eq!(positions["A"], pos2(500.0, 180.0));
        assert_eq!(positions["B"], pos2(325.0, 560.0));
        assert_eq!(positions["C"], pos2(675.0, 560.0));
    }

    #[test]
    fn test_children_follow_edge_list_order() {
        let positions = layout(&document(
            &["A", "B", "C", "D"],
            &[("A", "D"), ("A", "B"), ("A", "C")],
        ));
        assert!(positions["D"].x < positions["B"].x);
        assert!(positions["B"].x < positions["C"].x);
        assert_eq!(positions["B"].x, CENTER.x, "middle of three");
    }

    #[test]
    fn test_cycle_falls_back_to_first_node() {
        let positions = layout(&document(
            &["A", "B", "C"],
            &[("A", "B"), ("B", "C"), ("C", "A")],
        ));
        assert_eq!(positions["A"], pos2(500.0, 180.0));
        assert_eq!(positions["B"], pos2(500.0, 560.0));
        assert_eq!(positions["C"], pos2(500.0, 940.0));
    }

    #[test]
    fn test_unreachable_nodes_join_top_row() {
        let positions = layout(&document(
            &["A", "B", "C"],
            &[("B", "C"), ("C", "B")],
        ));
        let top: Vec<f32> =
            ["A", "B", "C"].iter().map(|id| positions[*id].y).collect();
        assert_eq!(top, vec![180.0, 180.0, 180.0]);
        assert!(positions["A"].x < positions["B"].x);
        assert!(positions["B"].x < positions["C"].x);
    }

    #[test]
    fn test_dangling_edges_and_duplicates_ignored() {
        let positions = layout(&document(
            &["A", "B", "A"],
            &[("A", "B"), ("A", "Z"), ("Y", "B")],
        ));
        assert_eq!(positions.len(), 2);
        assert_eq!(positions["A"].y, 180.0);
        assert_eq!(positions["B"].y, 560.0);
    }

    #[test]
    fn test_empty_document_has_no_positions() {
        assert!(layout(&document(&[], &[])).is_empty());
    }

    #[test]
    fn test_layout_is_deterministic() {
        let doc = document(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "E"), ("E", "A")],
        );
        assert_eq!(layout(&doc), layout(&doc));
    }
}
