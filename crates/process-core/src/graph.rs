//! Stage graph: the topology the state machine runs over.

use std::collections::{BTreeMap, BTreeSet};

use contracts::StageKind;

use crate::topology::{parse_topology, ParseWarning, ParsedTopology};
use crate::SimError;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct StageNode {
    pub id: NodeId,
    pub kind: StageKind,
    /// Predecessor ids; informational.
    pub previous: BTreeSet<NodeId>,
    /// Successor id -> transition weight. Weights are positive and need not
    /// sum to 1.
    pub next: BTreeMap<NodeId, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageGraph {
    nodes: Vec<StageNode>,
    first_by_kind: BTreeMap<StageKind, NodeId>,
}

impl StageGraph {
    /// Build a validated graph from a parsed description. Fails fast on an
    /// unassigned node, an edge touching a nonexistent node, or a
    /// non-positive weight.
    pub fn from_parsed(parsed: &ParsedTopology) -> Result<Self, SimError> {
        let mut nodes = Vec::with_capacity(parsed.node_count);
        for id in 0..parsed.node_count {
            let kind = parsed.kinds.get(id).copied().flatten().ok_or_else(|| {
                SimError::MalformedTopology(format!("node {id} has no stage kind assigned"))
            })?;
            nodes.push(StageNode {
                id,
                kind,
                previous: BTreeSet::new(),
                next: BTreeMap::new(),
            });
        }

        for &(from, to, weight) in &parsed.edges {
            if from >= parsed.node_count || to >= parsed.node_count {
                return Err(SimError::MalformedTopology(format!(
                    "edge {from} -> {to} references a nonexistent node (count {})",
                    parsed.node_count
                )));
            }
            if !(weight > 0.0) {
                return Err(SimError::MalformedTopology(format!(
                    "edge {from} -> {to} has non-positive weight {weight}"
                )));
            }
            nodes[from].next.insert(to, weight);
            nodes[to].previous.insert(from);
        }

        let mut first_by_kind = BTreeMap::new();
        for &(kind, node) in &parsed.kind_order {
            first_by_kind.entry(kind).or_insert(node);
        }

        Ok(Self {
            nodes,
            first_by_kind,
        })
    }

    /// Parse and build in one step, surfacing non-fatal parse warnings.
    pub fn from_text(input: &str) -> Result<(Self, Vec<ParseWarning>), SimError> {
        let parsed = parse_topology(input)?;
        let graph = Self::from_parsed(&parsed)?;
        Ok((graph, parsed.warnings))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&StageNode, SimError> {
        self.nodes
            .get(id)
            .ok_or_else(|| SimError::MalformedTopology(format!("node {id} does not exist")))
    }

    pub fn kind_of(&self, id: NodeId) -> Result<StageKind, SimError> {
        self.node(id).map(|node| node.kind)
    }

    pub fn outgoing(&self, id: NodeId) -> Result<&BTreeMap<NodeId, f64>, SimError> {
        self.node(id).map(|node| &node.next)
    }

    /// First-declared node carrying this kind; kinds are not unique.
    pub fn node_for(&self, kind: StageKind) -> Option<NodeId> {
        self.first_by_kind.get(&kind).copied()
    }

    /// As `node_for`, but a missing kind is a topology/logic mismatch.
    pub fn require(&self, kind: StageKind) -> Result<NodeId, SimError> {
        self.node_for(kind).ok_or_else(|| {
            SimError::MalformedTopology(format!("no node carries stage kind {kind}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::STANDARD_TOPOLOGY;

    fn standard() -> StageGraph {
        let (graph, warnings) = StageGraph::from_text(STANDARD_TOPOLOGY).expect("build");
        assert!(warnings.is_empty());
        graph
    }

    #[test]
    fn standard_graph_wires_all_stages() {
        let graph = standard();
        assert_eq!(graph.len(), 8);
        for kind in [
            StageKind::Idle,
            StageKind::Application,
            StageKind::Decision,
            StageKind::PostDecision,
            StageKind::ReceivingBenefits,
            StageKind::Investigation,
            StageKind::PostInvestigation,
            StageKind::Recourse,
        ] {
            assert!(graph.node_for(kind).is_some(), "missing {kind}");
        }
        assert_eq!(graph.node_for(StageKind::Complaint), None);
    }

    #[test]
    fn edges_record_both_directions() {
        let graph = standard();
        let receiving = graph.require(StageKind::ReceivingBenefits).expect("node");
        let investigation = graph.require(StageKind::Investigation).expect("node");
        assert!(graph
            .outgoing(receiving)
            .expect("edges")
            .contains_key(&investigation));
        assert!(graph
            .node(investigation)
            .expect("node")
            .previous
            .contains(&receiving));
    }

    #[test]
    fn unassigned_node_fails_build() {
        let err = StageGraph::from_text("2\n0 Idle\n0 1 1.0\n").unwrap_err();
        assert!(matches!(err, SimError::MalformedTopology(_)));
    }

    #[test]
    fn edge_to_missing_node_fails_build() {
        let err = StageGraph::from_text("1\n0 Idle\n0 3 1.0\n").unwrap_err();
        assert!(matches!(err, SimError::MalformedTopology(_)));
    }

    #[test]
    fn non_positive_weight_fails_build() {
        let err = StageGraph::from_text("2\n0 Idle\n1 Decision\n0 1 0.0\n").unwrap_err();
        assert!(matches!(err, SimError::MalformedTopology(_)));
    }

    #[test]
    fn duplicate_kind_resolves_to_first_declared() {
        let input = "3\n0 Idle\n1 Recourse\n2 Recourse\n0 1 1.0\n1 2 1.0\n2 0 1.0\n";
        let (graph, warnings) = StageGraph::from_text(input).expect("build");
        assert!(warnings.is_empty());
        assert_eq!(graph.node_for(StageKind::Recourse), Some(1));
    }
}
