use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::constants::*;
use crate::error::BoardError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Container,
    Condition,
    Event,
    Spawner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XyPosition {
    pub x: f32,
    pub y: f32,
}

impl XyPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

/// Label plus an optional key into the condition or event store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "component")]
    pub kind: NodeKind,
    pub position: XyPosition,
    #[serde(default)]
    pub data: NodeData,
    pub width: f32,
    pub height: f32,
    #[serde(flatten)]
    pub style: NodeStyle,
    /// Event/condition nodes that receive edges get a target handle only.
    #[serde(default)]
    pub receiver: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandleSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandleSide>,
}

impl FlowNode {
    /// Node with the default footprint and colours of its kind.
    pub fn new(id: impl Into<String>, kind: NodeKind, position: XyPosition) -> Self {
        let (width, height, bg, border) = match kind {
            NodeKind::Container => (CONTAINER_W, CONTAINER_H, CONTAINER_BG, CONTAINER_BORDER),
            NodeKind::Condition => (CONDITION_W, CONDITION_H, CONDITION_BG, CONDITION_BORDER),
            NodeKind::Event => (EVENT_W, EVENT_H, EVENT_BG, EVENT_BORDER),
            NodeKind::Spawner => (SPAWNER_W, SPAWNER_H, SPAWNER_BG, SPAWNER_BORDER),
        };
        Self {
            id: id.into(),
            kind,
            position,
            data: NodeData::default(),
            width,
            height,
            style: NodeStyle {
                bg_color: Some(bg.to_string()),
                border_color: Some(border.to_string()),
                ..Default::default()
            },
            receiver: false,
            source_position: None,
            target_position: None,
        }
    }

    #[cfg(test)]
    pub fn with_reference(mut self, label: impl Into<String>, reference: impl Into<String>) -> Self {
        self.data = NodeData {
            label: label.into(),
            reference: Some(reference.into()),
        };
        self
    }

    #[cfg(test)]
    pub fn receiving(mut self) -> Self {
        self.receiver = true;
        self
    }

    /// Side of the outgoing handle, if the node has one.
    pub fn source_handle(&self) -> Option<HandleSide> {
        let has = match self.kind {
            NodeKind::Spawner => false,
            NodeKind::Container => true,
            NodeKind::Event | NodeKind::Condition => !self.receiver,
        };
        has.then(|| self.source_position.unwrap_or(HandleSide::Right))
    }

    /// Side of the incoming handle, if the node has one.
    pub fn target_handle(&self) -> Option<HandleSide> {
        let has = match self.kind {
            NodeKind::Spawner => false,
            NodeKind::Container => true,
            NodeKind::Event | NodeKind::Condition => self.receiver,
        };
        has.then(|| self.target_position.unwrap_or(HandleSide::Left))
    }

    /// Point on the node border where a handle on `side` sits.
    pub fn anchor(&self, side: HandleSide) -> XyPosition {
        let XyPosition { x, y } = self.position;
        match side {
            HandleSide::Left => XyPosition::new(x, y + self.height / 2.0),
            HandleSide::Right => XyPosition::new(x + self.width, y + self.height / 2.0),
            HandleSide::Top => XyPosition::new(x + self.width / 2.0, y),
            HandleSide::Bottom => XyPosition::new(x + self.width / 2.0, y + self.height),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_color: Option<String>,
    #[serde(default)]
    pub animate: bool,
    #[serde(default)]
    pub arrow: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub style: EdgeStyle,
}

impl FlowEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            style: EdgeStyle::default(),
        }
    }
}

/// Edge with resolved anchor coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedEdge {
    #[serde(flatten)]
    pub edge: FlowEdge,
    pub source_x: f32,
    pub source_y: f32,
    pub source_position: HandleSide,
    pub target_x: f32,
    pub target_y: f32,
    pub target_position: HandleSide,
}

/// Derived edge plus where its label goes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeProps {
    #[serde(flatten)]
    pub derived: DerivedEdge,
    pub center_x: f32,
    pub center_y: f32,
}

impl From<DerivedEdge> for EdgeProps {
    fn from(derived: DerivedEdge) -> Self {
        let center_x = (derived.source_x + derived.target_x) / 2.0;
        let center_y = (derived.source_y + derived.target_y) / 2.0;
        Self {
            derived,
            center_x,
            center_y,
        }
    }
}

/// Resolve an edge against the node lookup.
pub fn derive_edge(
    edge: &FlowEdge,
    nodes: &HashMap<String, FlowNode>,
) -> Result<DerivedEdge, BoardError> {
    let missing = |node: &str| BoardError::Reference {
        edge: edge.id.clone(),
        node: node.to_string(),
    };
    let source = nodes.get(&edge.source).ok_or_else(|| missing(&edge.source))?;
    let target = nodes.get(&edge.target).ok_or_else(|| missing(&edge.target))?;

    let source_side = source.source_handle().ok_or_else(|| {
        BoardError::config(format!(
            "edge '{}': node '{}' has no source handle",
            edge.id, source.id
        ))
    })?;
    let target_side = target.target_handle().ok_or_else(|| {
        BoardError::config(format!(
            "edge '{}': node '{}' has no target handle",
            edge.id, target.id
        ))
    })?;

    let from = source.anchor(source_side);
    let to = target.anchor(target_side);
    Ok(DerivedEdge {
        edge: edge.clone(),
        source_x: from.x,
        source_y: from.y,
        source_position: source_side,
        target_x: to.x,
        target_y: to.y,
        target_position: target_side,
    })
}

#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    pub nodes: HashMap<String, FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    /// Insert or replace a node. A replacement must keep a handle for every
    /// edge already attached to it, otherwise the old node stays.
    pub fn add_node(&mut self, node: FlowNode) -> Result<(), BoardError> {
        let id = node.id.clone();
        let previous = self.nodes.insert(id.clone(), node);
        if previous.is_none() {
            return Ok(());
        }
        let broken = self
            .edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .find_map(|e| derive_edge(e, &self.nodes).err());
        match (broken, previous) {
            (Some(e), Some(previous)) => {
                self.nodes.insert(id, previous);
                Err(e)
            }
            _ => Ok(()),
        }
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<FlowNode> {
        let node = self.nodes.remove(id)?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Some(node)
    }

    /// Add an edge after checking its endpoints, handles and acyclicity.
    pub fn connect(&mut self, edge: FlowEdge) -> Result<(), BoardError> {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(BoardError::config(format!("edge '{}' already exists", edge.id)));
        }
        derive_edge(&edge, &self.nodes)?;
        self.edges.push(edge);
        if let Err(e) = self.validate_acyclic() {
            self.edges.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Option<FlowEdge> {
        let pos = self.edges.iter().position(|e| e.id == edge_id)?;
        Some(self.edges.remove(pos))
    }

    pub fn derive_edges(&self) -> Result<Vec<EdgeProps>, BoardError> {
        self.edges
            .iter()
            .map(|e| derive_edge(e, &self.nodes).map(EdgeProps::from))
            .collect()
    }

    /// Kahn's algorithm; fails naming a node left on a cycle.
    pub fn validate_acyclic(&self) -> Result<(), BoardError> {
        let mut indegree: BTreeMap<&str, usize> =
            self.nodes.keys().map(|k| (k.as_str(), 0)).collect();
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            if let Some(d) = indegree.get_mut(edge.target.as_str()) {
                *d += 1;
            }
            outgoing
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(k, _)| *k)
            .collect();
        let mut visited = 0usize;
        while let Some(node) = ready.pop_front() {
            visited += 1;
            for next in outgoing.get(node).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }

        if visited == indegree.len() {
            return Ok(());
        }
        let stuck = indegree
            .iter()
            .find(|(_, d)| **d > 0)
            .map(|(k, _)| k.to_string())
            .unwrap_or_default();
        Err(BoardError::Cycle(stuck))
    }

    /// Event store keys reached downstream from nodes referencing `condition_key`.
    /// Breadth-first from the condition nodes (by id), so nearer events come
    /// first. Each key appears once.
    pub fn events_triggered_by(&self, condition_key: &str) -> Vec<String> {
        let mut starts: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| {
                n.kind == NodeKind::Condition && n.data.reference.as_deref() == Some(condition_key)
            })
            .map(|n| n.id.as_str())
            .collect();
        starts.sort_unstable();
        let mut queue: VecDeque<&str> = starts.into_iter().collect();
        let mut seen: Vec<&str> = queue.iter().copied().collect();
        let mut events = Vec::new();
        while let Some(id) = queue.pop_front() {
            for edge in self.edges.iter().filter(|e| e.source == id) {
                let next = edge.target.as_str();
                if seen.contains(&next) {
                    continue;
                }
                seen.push(next);
                let Some(node) = self.nodes.get(next) else {
                    continue;
                };
                if node.kind == NodeKind::Event {
                    if let Some(reference) = &node.data.reference {
                        if !events.contains(reference) {
                            events.push(reference.clone());
                        }
                    }
                }
                queue.push_back(next);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> FlowGraph {
        let mut g = FlowGraph::default();
        g.add_node(
            FlowNode::new("cond", NodeKind::Condition, XyPosition::new(0.0, 0.0))
                .with_reference("frog meets lily", "c1"),
        )
        .unwrap();
        g.add_node(
            FlowNode::new("ev", NodeKind::Event, XyPosition::new(400.0, 100.0))
                .receiving()
                .with_reference("open gate", "e1"),
        )
        .unwrap();
        g.add_node(FlowNode::new("box", NodeKind::Container, XyPosition::new(0.0, 300.0)))
            .unwrap();
        g.add_node(FlowNode::new("spawn", NodeKind::Spawner, XyPosition::new(0.0, 0.0)))
            .unwrap();
        g
    }

    #[test]
    fn handles_follow_node_kind() {
        let g = graph();
        assert_eq!(g.nodes["cond"].source_handle(), Some(HandleSide::Right));
        assert_eq!(g.nodes["cond"].target_handle(), None);
        assert_eq!(g.nodes["ev"].source_handle(), None);
        assert_eq!(g.nodes["ev"].target_handle(), Some(HandleSide::Left));
        assert!(g.nodes["box"].source_handle().is_some());
        assert!(g.nodes["box"].target_handle().is_some());
        assert_eq!(g.nodes["spawn"].source_handle(), None);
        assert_eq!(g.nodes["spawn"].target_handle(), None);
    }

    #[test]
    fn derived_edge_uses_node_geometry() {
        let mut g = graph();
        let mut edge = FlowEdge::new("e", "cond", "ev");
        edge.label = Some("then".into());
        g.connect(edge).unwrap();
        let props = g.derive_edges().unwrap();
        assert_eq!(props.len(), 1);
        let p = &props[0];
        // condition is 240x90 at the origin, event is 180x90 at (400, 100)
        assert_eq!((p.derived.source_x, p.derived.source_y), (240.0, 45.0));
        assert_eq!((p.derived.target_x, p.derived.target_y), (400.0, 145.0));
        assert_eq!((p.center_x, p.center_y), (320.0, 95.0));
    }

    #[test]
    fn custom_handle_sides_are_respected() {
        let mut node = FlowNode::new("n", NodeKind::Container, XyPosition::new(10.0, 20.0));
        node.width = 100.0;
        node.height = 50.0;
        node.source_position = Some(HandleSide::Bottom);
        node.target_position = Some(HandleSide::Top);
        assert_eq!(node.anchor(node.source_handle().unwrap()), XyPosition::new(60.0, 70.0));
        assert_eq!(node.anchor(node.target_handle().unwrap()), XyPosition::new(60.0, 20.0));
    }

    #[test]
    fn missing_target_is_a_reference_error() {
        let g = graph();
        let edge = FlowEdge::new("dangling", "cond", "ghost");
        assert_eq!(
            derive_edge(&edge, &g.nodes),
            Err(BoardError::Reference {
                edge: "dangling".into(),
                node: "ghost".into()
            })
        );
    }

    #[test]
    fn spawner_cannot_be_connected() {
        let mut g = graph();
        let err = g.connect(FlowEdge::new("x", "spawn", "ev")).unwrap_err();
        assert!(matches!(err, BoardError::Configuration(_)));
        assert!(g.edges.is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = FlowGraph::default();
        for id in ["a", "b", "c"] {
            g.add_node(FlowNode::new(id, NodeKind::Container, XyPosition::default())).unwrap();
        }
        g.connect(FlowEdge::new("ab", "a", "b")).unwrap();
        g.connect(FlowEdge::new("bc", "b", "c")).unwrap();
        assert!(matches!(
            g.connect(FlowEdge::new("ca", "c", "a")),
            Err(BoardError::Cycle(_))
        ));
        assert_eq!(g.edges.len(), 2);
        assert!(g.validate_acyclic().is_ok());
    }

    #[test]
    fn removing_node_drops_its_edges() {
        let mut g = graph();
        g.connect(FlowEdge::new("e", "cond", "ev")).unwrap();
        g.remove_node("ev");
        assert!(g.edges.is_empty());
        assert!(g.derive_edges().unwrap().is_empty());
    }

    #[test]
    fn condition_triggers_downstream_events() {
        let mut g = graph();
        g.add_node(
            FlowNode::new("relay", NodeKind::Container, XyPosition::new(200.0, 0.0)),
        )
        .unwrap();
        g.add_node(
            FlowNode::new("ev2", NodeKind::Event, XyPosition::new(600.0, 0.0))
                .receiving()
                .with_reference("ring bell", "e2"),
        )
        .unwrap();
        g.connect(FlowEdge::new("1", "cond", "ev")).unwrap();
        g.connect(FlowEdge::new("2", "box", "ev2")).unwrap();
        assert_eq!(g.events_triggered_by("c1"), vec!["e1".to_string()]);

        g.connect(FlowEdge::new("3", "cond", "relay")).unwrap();
        g.connect(FlowEdge::new("4", "relay", "ev2")).unwrap();
        assert_eq!(
            g.events_triggered_by("c1"),
            vec!["e1".to_string(), "e2".to_string()]
        );
        assert!(g.events_triggered_by("unknown").is_empty());
    }

    #[test]
    fn events_keep_breadth_first_order() {
        let mut g = FlowGraph::default();
        g.add_node(
            FlowNode::new("cond", NodeKind::Condition, XyPosition::default())
                .with_reference("bump", "c1"),
        )
        .unwrap();
        g.add_node(FlowNode::new("relay", NodeKind::Container, XyPosition::default()))
            .unwrap();
        for (id, key) in [("near", "9"), ("far", "10")] {
            g.add_node(
                FlowNode::new(id, NodeKind::Event, XyPosition::default())
                    .receiving()
                    .with_reference(id, key),
            )
            .unwrap();
        }
        g.connect(FlowEdge::new("1", "cond", "near")).unwrap();
        g.connect(FlowEdge::new("2", "cond", "relay")).unwrap();
        g.connect(FlowEdge::new("3", "relay", "far")).unwrap();
        assert_eq!(
            g.events_triggered_by("c1"),
            vec!["9".to_string(), "10".to_string()]
        );
    }

    #[test]
    fn replacing_a_node_cannot_orphan_its_edges() {
        let mut g = graph();
        g.connect(FlowEdge::new("e", "cond", "ev")).unwrap();

        // an event that sends instead of receives has no target handle
        let sender = FlowNode::new("ev", NodeKind::Event, XyPosition::new(50.0, 50.0));
        assert!(matches!(g.add_node(sender), Err(BoardError::Configuration(_))));
        assert!(g.nodes["ev"].receiver);
        assert!(g.derive_edges().is_ok());

        let moved = FlowNode::new("ev", NodeKind::Event, XyPosition::new(50.0, 50.0))
            .receiving()
            .with_reference("open gate", "e1");
        g.add_node(moved).unwrap();
        assert_eq!(g.nodes["ev"].position, XyPosition::new(50.0, 50.0));

        let json = serde_json::to_string(&g).unwrap();
        let back: FlowGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.derive_edges().unwrap().len(), 1);
    }

    #[test]
    fn node_json_uses_component_field() {
        let node = FlowNode::new("n1", NodeKind::Event, XyPosition::new(1.0, 2.0));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["component"], "event");
        assert_eq!(json["bgColor"], EVENT_BG);
        let back: FlowNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
