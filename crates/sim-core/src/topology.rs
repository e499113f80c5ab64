//! Topology Construction
//!
//! Undirected graphs whose nodes each hold at most one agent: disjoint
//! small-world sub-networks (one per tier) or a toroidal Moore-neighborhood
//! lattice. Node and edge sets are fixed after construction; the simulation
//! only ever flips slot occupancy at placement time.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::rngs::SmallRng;
use rand::Rng;
use tracing::debug;

use crate::agent::{AgentId, Tier};
use crate::error::SetupError;

/// Parameters for one tier's Watts-Strogatz sub-network.
#[derive(Debug, Clone, Copy)]
pub struct SmallWorldSpec {
    pub tier: Tier,
    pub nodes: usize,
    pub mean_degree: usize,
    pub rewiring_prob: f64,
}

/// One node's payload: which sub-network it belongs to and who sits on it.
#[derive(Debug, Clone)]
struct Slot {
    tier: Option<Tier>,
    occupant: Option<AgentId>,
}

/// A fixed undirected graph with one agent slot per node.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<Slot, ()>,
}

impl Topology {
    /// Build one Watts-Strogatz graph per spec and merge them into a single
    /// disjoint-union graph. No cross-tier edges are ever created: ring
    /// construction and rewiring both stay inside the tier's node range.
    pub fn small_world(specs: &[SmallWorldSpec], rng: &mut SmallRng) -> Result<Self, SetupError> {
        let mut graph = UnGraph::new_undirected();

        for spec in specs {
            if spec.nodes == 0 {
                // An empty sub-population is legal; there is nothing to build.
                continue;
            }
            if spec.mean_degree >= spec.nodes {
                return Err(SetupError::DegreeExceedsPopulation {
                    tier: spec.tier,
                    degree: spec.mean_degree,
                    population: spec.nodes,
                });
            }

            let nodes: Vec<NodeIndex> = (0..spec.nodes)
                .map(|_| {
                    graph.add_node(Slot {
                        tier: Some(spec.tier),
                        occupant: None,
                    })
                })
                .collect();

            // Ring lattice: each node connects to its k/2 forward neighbors.
            let half_k = spec.mean_degree / 2;
            let mut ring_edges: Vec<(usize, usize)> = Vec::new();
            for i in 0..spec.nodes {
                for j in 1..=half_k {
                    let neighbor = (i + j) % spec.nodes;
                    if i != neighbor && !graph.contains_edge(nodes[i], nodes[neighbor]) {
                        graph.add_edge(nodes[i], nodes[neighbor], ());
                        ring_edges.push((i, neighbor));
                    }
                }
            }

            // Rewire each ring edge with probability p, keeping the source
            // endpoint and drawing a fresh target within the same tier.
            for (source, target) in ring_edges {
                if rng.gen::<f64>() >= spec.rewiring_prob {
                    continue;
                }
                let mut attempts = 0;
                while attempts < spec.nodes {
                    let candidate = rng.gen_range(0..spec.nodes);
                    if candidate != source && !graph.contains_edge(nodes[source], nodes[candidate])
                    {
                        if let Some(edge) = graph.find_edge(nodes[source], nodes[target]) {
                            graph.remove_edge(edge);
                            graph.add_edge(nodes[source], nodes[candidate], ());
                        }
                        break;
                    }
                    attempts += 1;
                }
            }

            debug!(
                "built {} sub-network: {} nodes, mean degree {}, rewiring {}",
                spec.tier, spec.nodes, spec.mean_degree, spec.rewiring_prob
            );
        }

        Ok(Self { graph })
    }

    /// Toroidal lattice with Moore neighborhoods: every cell sees the eight
    /// surrounding cells, wrapped at the boundary, so neighbor counts are
    /// uniform. On degenerate grids wrap-around duplicates collapse (a 2x2
    /// torus gives each cell 3 distinct neighbors).
    pub fn torus(width: usize, height: usize) -> Self {
        let mut graph = UnGraph::new_undirected();

        let nodes: Vec<NodeIndex> = (0..width * height)
            .map(|_| {
                graph.add_node(Slot {
                    tier: None,
                    occupant: None,
                })
            })
            .collect();

        let index = |x: usize, y: usize| y * width + x;
        for y in 0..height {
            for x in 0..width {
                for dy in [-1i64, 0, 1] {
                    for dx in [-1i64, 0, 1] {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = (x as i64 + dx).rem_euclid(width as i64) as usize;
                        let ny = (y as i64 + dy).rem_euclid(height as i64) as usize;
                        let (a, b) = (nodes[index(x, y)], nodes[index(nx, ny)]);
                        if a != b && !graph.contains_edge(a, b) {
                            graph.add_edge(a, b, ());
                        }
                    }
                }
            }
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes belonging to a tier's sub-network, in index order.
    pub fn tier_nodes(&self, tier: Tier) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph[n].tier == Some(tier))
            .collect()
    }

    /// All nodes without an occupant, in index order.
    pub fn vacant_nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph[n].occupant.is_none())
            .collect()
    }

    pub fn is_vacant(&self, node: NodeIndex) -> bool {
        self.graph[node].occupant.is_none()
    }

    pub fn occupant(&self, node: NodeIndex) -> Option<AgentId> {
        self.graph[node].occupant
    }

    pub fn tier_of(&self, node: NodeIndex) -> Option<Tier> {
        self.graph[node].tier
    }

    pub(crate) fn set_occupant(&mut self, node: NodeIndex, id: AgentId) {
        debug_assert!(self.graph[node].occupant.is_none());
        self.graph[node].occupant = Some(id);
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.neighbors(node).count()
    }

    /// Agents sitting on the adjacent nodes; vacant neighbors are skipped.
    pub fn neighbor_occupants(&self, node: NodeIndex) -> Vec<AgentId> {
        self.graph
            .neighbors(node)
            .filter_map(|n| self.graph[n].occupant)
            .collect()
    }

    /// Normalized sorted edge list, for structural comparisons.
    pub fn edge_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                if a <= b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn three_tier_specs() -> [SmallWorldSpec; 3] {
        [
            SmallWorldSpec {
                tier: Tier::High,
                nodes: 30,
                mean_degree: 4,
                rewiring_prob: 0.1,
            },
            SmallWorldSpec {
                tier: Tier::Medium,
                nodes: 30,
                mean_degree: 6,
                rewiring_prob: 0.3,
            },
            SmallWorldSpec {
                tier: Tier::Low,
                nodes: 30,
                mean_degree: 8,
                rewiring_prob: 0.5,
            },
        ]
    }

    #[test]
    fn test_small_world_disjoint_union() {
        let mut rng = SmallRng::seed_from_u64(1);
        let topology = Topology::small_world(&three_tier_specs(), &mut rng).unwrap();

        assert_eq!(topology.node_count(), 90);
        // Rewiring moves edges but never changes their number:
        // 30*2 + 30*3 + 30*4 ring edges.
        assert_eq!(topology.edge_count(), 270);

        // Every edge stays inside one tier's sub-network.
        for (a, b) in topology.edge_pairs() {
            let tier_a = topology.tier_of(NodeIndex::new(a));
            let tier_b = topology.tier_of(NodeIndex::new(b));
            assert!(tier_a.is_some());
            assert_eq!(tier_a, tier_b);
        }

        assert_eq!(topology.tier_nodes(Tier::High).len(), 30);
        assert_eq!(topology.tier_nodes(Tier::Medium).len(), 30);
        assert_eq!(topology.tier_nodes(Tier::Low).len(), 30);
    }

    #[test]
    fn test_small_world_rejects_oversized_degree() {
        let mut rng = SmallRng::seed_from_u64(1);
        let specs = [SmallWorldSpec {
            tier: Tier::High,
            nodes: 5,
            mean_degree: 6,
            rewiring_prob: 0.1,
        }];
        let err = Topology::small_world(&specs, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SetupError::DegreeExceedsPopulation {
                tier: Tier::High,
                degree: 6,
                population: 5,
            }
        );
    }

    #[test]
    fn test_small_world_empty_tier_is_skipped() {
        let mut rng = SmallRng::seed_from_u64(1);
        let specs = [
            SmallWorldSpec {
                tier: Tier::High,
                nodes: 10,
                mean_degree: 4,
                rewiring_prob: 0.1,
            },
            SmallWorldSpec {
                tier: Tier::Medium,
                nodes: 0,
                mean_degree: 6,
                rewiring_prob: 0.3,
            },
        ];
        let topology = Topology::small_world(&specs, &mut rng).unwrap();
        assert_eq!(topology.node_count(), 10);
        assert!(topology.tier_nodes(Tier::Medium).is_empty());
    }

    #[test]
    fn test_small_world_deterministic_per_seed() {
        let mut rng_a = SmallRng::seed_from_u64(99);
        let mut rng_b = SmallRng::seed_from_u64(99);
        let a = Topology::small_world(&three_tier_specs(), &mut rng_a).unwrap();
        let b = Topology::small_world(&three_tier_specs(), &mut rng_b).unwrap();
        assert_eq!(a.edge_pairs(), b.edge_pairs());
    }

    #[test]
    fn test_torus_uniform_moore_degree() {
        let topology = Topology::torus(4, 4);
        assert_eq!(topology.node_count(), 16);
        assert_eq!(topology.edge_count(), 64);
        for node in 0..16 {
            assert_eq!(topology.degree(NodeIndex::new(node)), 8);
        }
    }

    #[test]
    fn test_small_torus_collapses_duplicates() {
        let topology = Topology::torus(2, 2);
        assert_eq!(topology.node_count(), 4);
        // Each cell sees the other three exactly once.
        assert_eq!(topology.edge_count(), 6);
        for node in 0..4 {
            assert_eq!(topology.degree(NodeIndex::new(node)), 3);
        }
    }

    #[test]
    fn test_single_cell_torus_has_no_neighbors() {
        let topology = Topology::torus(1, 1);
        assert_eq!(topology.node_count(), 1);
        assert_eq!(topology.edge_count(), 0);
    }

    #[test]
    fn test_occupancy() {
        let mut topology = Topology::torus(2, 2);
        let node = NodeIndex::new(0);
        assert!(topology.is_vacant(node));

        topology.set_occupant(node, AgentId(7));
        assert!(!topology.is_vacant(node));
        assert_eq!(topology.occupant(node), Some(AgentId(7)));
        assert_eq!(topology.vacant_nodes().len(), 3);

        // Neighbors only report occupied slots.
        let neighbor = NodeIndex::new(1);
        assert_eq!(topology.neighbor_occupants(neighbor), vec![AgentId(7)]);
    }
}
