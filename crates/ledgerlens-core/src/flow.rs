//! Flow graph builder for the Sankey money-flow diagram.
//!
//! The API has already laid the graph out; this module checks link
//! integrity, recomputes source/target counts from the links and derives
//! canvas size and per-depth colors.

use std::collections::VecDeque;

use ledgerlens_config::SankeyConfig;
use ledgerlens_utils::format_compact;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::color::Palette;
use crate::error::{CoreError, CoreResult};
use crate::statement::{amount_from_wire, null_as_default};
use crate::view::Normalized;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub name: String,
    /// Layout column, when the payload carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    #[serde(deserialize_with = "amount_from_wire")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct FlowData {
    #[serde(default, deserialize_with = "null_as_default")]
    nodes: Vec<FlowNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    links: Vec<FlowLink>,
}

/// Body of the flow endpoint.
///
/// Nodes and links come either nested under `sankeyData` or at the top level.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPayload {
    #[serde(default)]
    pub max_chain_length: usize,
    #[serde(default)]
    pub total_sources: usize,
    #[serde(default)]
    pub total_targets: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default)]
    sankey_data: Option<FlowData>,
    #[serde(default, deserialize_with = "null_as_default")]
    nodes: Vec<FlowNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    links: Vec<FlowLink>,
}

impl FlowPayload {
    pub fn parse(body: &str) -> CoreResult<Self> {
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(body)?)
    }

    fn into_parts(self) -> (Vec<FlowNode>, Vec<FlowLink>) {
        match self.sankey_data {
            Some(data) => (data.nodes, data.links),
            None => (self.nodes, self.links),
        }
    }
}

/// Validated flow graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    /// Longest source-to-target chain, counted in nodes
    pub max_chain_length: usize,
    /// Nodes without incoming links
    pub total_sources: usize,
    /// Nodes without outgoing links
    pub total_targets: usize,
    pub currency: String,
    /// Layout column of every node
    #[serde(skip)]
    depths: Vec<usize>,
}

/// Longest distance from any source for every node, or `None` on a cycle
fn longest_paths(node_count: usize, links: &[FlowLink]) -> Option<Vec<usize>> {
    let mut indegree = vec![0usize; node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for link in links {
        indegree[link.target] += 1;
        outgoing[link.source].push(link.target);
    }

    let mut depth = vec![0usize; node_count];
    let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| indegree[i] == 0).collect();
    let mut visited = 0;

    while let Some(node) = queue.pop_front() {
        visited += 1;
        for &next in &outgoing[node] {
            depth[next] = depth[next].max(depth[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if visited == node_count {
        Some(depth)
    } else {
        None
    }
}

impl FlowGraph {
    /// Build from a parsed payload.
    ///
    /// An empty link list is no data. Any link pointing outside the node
    /// list is an error.
    pub fn from_payload(payload: FlowPayload) -> CoreResult<Normalized<FlowGraph>> {
        let reported = (payload.max_chain_length, payload.total_sources, payload.total_targets);
        let currency = payload.currency.clone();
        let (nodes, links) = payload.into_parts();

        for (i, link) in links.iter().enumerate() {
            for index in [link.source, link.target] {
                if index >= nodes.len() {
                    return Err(CoreError::InvalidFlowGraph {
                        link: i,
                        index,
                        nodes: nodes.len(),
                    });
                }
            }
        }

        if links.is_empty() {
            return Ok(Normalized::NoData);
        }

        let mut has_incoming = vec![false; nodes.len()];
        let mut has_outgoing = vec![false; nodes.len()];
        for link in &links {
            has_incoming[link.target] = true;
            has_outgoing[link.source] = true;
        }
        let total_sources = has_incoming.iter().filter(|v| !**v).count();
        let total_targets = has_outgoing.iter().filter(|v| !**v).count();

        let computed = longest_paths(nodes.len(), &links);
        let max_chain_length = match computed {
            Some(ref depth) => depth.iter().max().map(|d| d + 1).unwrap_or(0),
            None => {
                debug!(
                    target: "ledgerlens::flow",
                    "flow graph has a cycle, keeping reported chain length {}",
                    reported.0
                );
                reported.0.max(1)
            }
        };

        if (max_chain_length, total_sources, total_targets) != reported {
            debug!(
                target: "ledgerlens::flow",
                "flow metadata differs from payload: computed ({}, {}, {}), reported {:?}",
                max_chain_length,
                total_sources,
                total_targets,
                reported
            );
        }

        let depths = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                node.depth
                    .or_else(|| computed.as_ref().map(|d| d[i]))
                    .unwrap_or(0)
            })
            .collect();

        Ok(Normalized::Data(FlowGraph {
            nodes,
            links,
            max_chain_length,
            total_sources,
            total_targets,
            currency,
            depths,
        }))
    }

    pub fn parse(body: &str) -> CoreResult<Normalized<FlowGraph>> {
        Self::from_payload(FlowPayload::parse(body)?)
    }

    /// Layout column of node `index`
    pub fn node_depth(&self, index: usize) -> usize {
        self.depths.get(index).copied().unwrap_or(0)
    }

    /// Canvas large enough for the deepest chain and the widest side
    pub fn canvas_size(&self, config: &SankeyConfig) -> CanvasSize {
        let widest = self.total_sources.max(self.total_targets) as u32;
        let width = self.max_chain_length as u32 * config.unit_width
            + widest * config.per_node_padding;
        let height = (self.total_sources as u32 * config.unit_height)
            .max(self.total_targets as u32 * config.unit_height)
            .max(config.min_height);
        CanvasSize { width, height }
    }

    /// Render-ready diagram: sized canvas, node colors by depth and link
    /// colors by their source node
    pub fn diagram(&self, config: &SankeyConfig, palette: &Palette) -> FlowDiagram {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let depth = self.node_depth(i);
                DiagramNode {
                    name: node.name.clone(),
                    depth,
                    color: palette.depth_color(depth).to_string(),
                }
            })
            .collect();
        let links = self
            .links
            .iter()
            .map(|link| DiagramLink {
                source: link.source,
                target: link.target,
                value: link.value,
                label: format!("{} {}", format_compact(link.value, 1), self.currency)
                    .trim_end()
                    .to_string(),
                color: palette.depth_color(self.node_depth(link.source)).to_string(),
            })
            .collect();

        FlowDiagram {
            canvas: self.canvas_size(config),
            currency: self.currency.clone(),
            nodes,
            links,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramNode {
    pub name: String,
    pub depth: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDiagram {
    pub canvas: CanvasSize,
    pub currency: String,
    pub nodes: Vec<DiagramNode>,
    pub links: Vec<DiagramLink>,
}
