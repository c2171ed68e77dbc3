//! Line-oriented topology description parser.
//!
//! First line: node count. Every following line is either an edge
//! (`from to probability`) or a stage-kind assignment (`id kind`).
//! Malformed lines are reported as warnings and parsing continues, so a bad
//! file surfaces all of its problems at once; only an unusable header is
//! fatal. Unassigned kind slots stay `None` and are checked at graph build.

use std::fmt;

use contracts::StageKind;

use crate::SimError;

/// The standard process topology: one node per implemented stage kind.
pub const STANDARD_TOPOLOGY: &str = "\
8
0 Idle
1 Application
2 Decision
3 PostDecision
4 ReceivingBenefits
5 Investigation
6 PostInvestigation
7 Recourse
0 0 0.9
0 1 0.1
1 2 1.0
2 3 1.0
3 4 0.5
3 0 0.5
4 4 0.8
4 5 0.1
4 0 0.1
5 6 1.0
6 4 0.6
6 0 0.2
6 7 0.2
7 4 0.5
7 0 0.5
";

/// A non-fatal problem in a topology description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTopology {
    pub node_count: usize,
    pub edges: Vec<(usize, usize, f64)>,
    /// Stage kind per node id; `None` until assigned.
    pub kinds: Vec<Option<StageKind>>,
    /// Kind assignments in declaration order, for first-declared lookup.
    pub kind_order: Vec<(StageKind, usize)>,
    pub warnings: Vec<ParseWarning>,
}

pub fn parse_topology(input: &str) -> Result<ParsedTopology, SimError> {
    let mut lines = input.lines().enumerate();

    let node_count = match lines.next() {
        Some((_, header)) => header
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| {
                SimError::MalformedTopology(format!(
                    "header must be a positive node count, got {header:?}"
                ))
            })?,
        None => {
            return Err(SimError::MalformedTopology(
                "empty topology description".to_string(),
            ))
        }
    };

    let mut parsed = ParsedTopology {
        node_count,
        edges: Vec::new(),
        kinds: vec![None; node_count],
        kind_order: Vec::new(),
        warnings: Vec::new(),
    };

    for (index, raw) in lines {
        let line_no = index + 1;
        let tokens = raw.split_whitespace().collect::<Vec<_>>();
        match tokens.as_slice() {
            [] => {}
            [id, kind_token] => parse_assignment(&mut parsed, line_no, id, kind_token),
            [from, to, weight] => parse_edge(&mut parsed, line_no, from, to, weight),
            other => parsed.warnings.push(ParseWarning {
                line: line_no,
                reason: format!("expected 2 or 3 tokens, got {}", other.len()),
            }),
        }
    }

    Ok(parsed)
}

fn parse_assignment(parsed: &mut ParsedTopology, line_no: usize, id: &str, kind_token: &str) {
    let Ok(node) = id.parse::<usize>() else {
        parsed.warnings.push(ParseWarning {
            line: line_no,
            reason: format!("invalid node id {id:?}"),
        });
        return;
    };
    let Some(kind) = StageKind::parse_token(kind_token) else {
        parsed.warnings.push(ParseWarning {
            line: line_no,
            reason: format!("unknown stage kind {kind_token:?}"),
        });
        return;
    };
    if node >= parsed.node_count {
        parsed.warnings.push(ParseWarning {
            line: line_no,
            reason: format!("node {node} outside declared count {}", parsed.node_count),
        });
        return;
    }
    if parsed.kinds[node].is_some() {
        parsed.warnings.push(ParseWarning {
            line: line_no,
            reason: format!("node {node} already has a stage kind; keeping the first"),
        });
        return;
    }
    parsed.kinds[node] = Some(kind);
    parsed.kind_order.push((kind, node));
}

fn parse_edge(parsed: &mut ParsedTopology, line_no: usize, from: &str, to: &str, weight: &str) {
    let (Ok(from), Ok(to)) = (from.parse::<usize>(), to.parse::<usize>()) else {
        parsed.warnings.push(ParseWarning {
            line: line_no,
            reason: format!("invalid edge endpoints {from:?} -> {to:?}"),
        });
        return;
    };
    let Ok(weight) = weight.parse::<f64>() else {
        parsed.warnings.push(ParseWarning {
            line: line_no,
            reason: format!("invalid edge weight {weight:?}"),
        });
        return;
    };
    parsed.edges.push((from, to, weight));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_topology_parses_clean() {
        let parsed = parse_topology(STANDARD_TOPOLOGY).expect("parse");
        assert_eq!(parsed.node_count, 8);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.edges.len(), 15);
        assert!(parsed.kinds.iter().all(Option::is_some));
        assert_eq!(parsed.kind_order.first(), Some(&(StageKind::Idle, 0)));
    }

    #[test]
    fn bad_header_is_fatal() {
        assert!(matches!(
            parse_topology("zero\n0 Idle\n"),
            Err(SimError::MalformedTopology(_))
        ));
        assert!(matches!(
            parse_topology("0\n"),
            Err(SimError::MalformedTopology(_))
        ));
        assert!(matches!(
            parse_topology(""),
            Err(SimError::MalformedTopology(_))
        ));
    }

    #[test]
    fn malformed_lines_warn_but_do_not_abort() {
        let input = "2\n0 Idle\n1 Application 0.5 extra\n1 Appeal\n0 1\n0 1 1.0\n";
        let parsed = parse_topology(input).expect("parse");
        // Four-token line, unknown kind, and the bare `0 1` line (parsed as an
        // assignment with a numeric kind token) all warn.
        assert_eq!(parsed.warnings.len(), 3);
        assert_eq!(parsed.edges.len(), 1);
        assert_eq!(parsed.kinds[1], None);
    }

    #[test]
    fn out_of_range_and_duplicate_assignments_warn() {
        let input = "2\n0 Idle\n0 Decision\n5 Recourse\n1 Application\n";
        let parsed = parse_topology(input).expect("parse");
        assert_eq!(parsed.warnings.len(), 2);
        assert_eq!(parsed.kinds[0], Some(StageKind::Idle));
        assert_eq!(parsed.kinds[1], Some(StageKind::Application));
    }
}
