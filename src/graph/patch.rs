//! Node arena and signal routing.

/*
Signal Routing
==============

Nodes are wired producer → consumer. A node may feed any number of
destinations (fan-out) and any number of nodes may feed one input (fan-in,
summed):

    player ──┬──→ wet ──→ feedbackDelay ──┐
             │                            ├──→ mix ──→ Output
             └──→ dry ────────────────────┘

The graph is kept acyclic. Feedback loops live INSIDE a node (the delay's
feedback path is per-sample, which a block graph could not express without
a block of latency). `connect` rejects any edge that would close a cycle.

Rendering walks the nodes in topological order, so every producer has
finished its block before a consumer reads it:

    for node in topo_order:
        input  = Σ outputs of upstream nodes
        output = node.process(input)
    Output = Σ outputs of nodes connected to Output

Finished nodes (one-shot sources, ended triggers) are removed after the
block that finished them, together with their edges.
*/

use petgraph::{
    algo::{has_path_connecting, toposort},
    stable_graph::{NodeIndex, StableDiGraph},
    visit::EdgeRef,
    Direction,
};
use tracing::debug;

use super::{
    node::{NodeHandle, NodeId, RenderCtx, SignalNode, Sink},
    GraphError,
};
use crate::{dsp::amplify::accumulate, MAX_BLOCK_SIZE};

struct Entry {
    node: Box<dyn SignalNode>,
    generation: u64,
    output: Vec<f32>,
    to_output: bool,
}

pub struct SignalGraph {
    graph: StableDiGraph<Entry, ()>,
    next_generation: u64,
    order: Vec<NodeIndex>,
    order_dirty: bool,
    scratch: Vec<f32>,
}

impl SignalGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            next_generation: 0,
            order: Vec::new(),
            order_dirty: false,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn add<N: SignalNode>(&mut self, node: N) -> NodeHandle<N> {
        let generation = self.next_generation;
        self.next_generation += 1;

        let index = self.graph.add_node(Entry {
            node: Box::new(node),
            generation,
            output: vec![0.0; MAX_BLOCK_SIZE],
            to_output: false,
        });
        self.order_dirty = true;

        NodeHandle::new(NodeId { index, generation })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.resolve(id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn resolve(&self, id: NodeId) -> Result<NodeIndex, GraphError> {
        match self.graph.node_weight(id.index) {
            Some(entry) if entry.generation == id.generation => Ok(id.index),
            _ => Err(GraphError::UnknownNode(id)),
        }
    }

    /// Route `from`'s output into `to`. Connecting twice is a no-op.
    pub fn connect(&mut self, from: NodeId, to: impl Into<Sink>) -> Result<(), GraphError> {
        let source = self.resolve(from)?;

        match to.into() {
            Sink::Output => {
                if let Some(entry) = self.graph.node_weight_mut(source) {
                    entry.to_output = true;
                }
            }
            Sink::Node(dest_id) => {
                let dest = self.resolve(dest_id)?;
                if source == dest || has_path_connecting(&self.graph, dest, source, None) {
                    return Err(GraphError::Cycle {
                        from,
                        to: dest_id,
                    });
                }
                if self.graph.find_edge(source, dest).is_none() {
                    self.graph.add_edge(source, dest, ());
                    self.order_dirty = true;
                }
            }
        }
        Ok(())
    }

    /// Detach every destination of `from`.
    pub fn disconnect(&mut self, from: NodeId) -> Result<(), GraphError> {
        let source = self.resolve(from)?;
        let edges: Vec<_> = self
            .graph
            .edges_directed(source, Direction::Outgoing)
            .map(|edge| edge.id())
            .collect();
        for edge in edges {
            self.graph.remove_edge(edge);
        }
        if let Some(entry) = self.graph.node_weight_mut(source) {
            entry.to_output = false;
        }
        self.order_dirty = true;
        Ok(())
    }

    /// Detach one destination of `from`.
    pub fn disconnect_from(&mut self, from: NodeId, to: impl Into<Sink>) -> Result<(), GraphError> {
        let source = self.resolve(from)?;
        match to.into() {
            Sink::Output => {
                if let Some(entry) = self.graph.node_weight_mut(source) {
                    entry.to_output = false;
                }
            }
            Sink::Node(dest_id) => {
                let dest = self.resolve(dest_id)?;
                if let Some(edge) = self.graph.find_edge(source, dest) {
                    self.graph.remove_edge(edge);
                    self.order_dirty = true;
                }
            }
        }
        Ok(())
    }

    pub fn is_connected(&self, from: NodeId, to: impl Into<Sink>) -> bool {
        let Ok(source) = self.resolve(from) else {
            return false;
        };
        match to.into() {
            Sink::Output => self
                .graph
                .node_weight(source)
                .is_some_and(|entry| entry.to_output),
            Sink::Node(dest_id) => self
                .resolve(dest_id)
                .is_ok_and(|dest| self.graph.find_edge(source, dest).is_some()),
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), GraphError> {
        let index = self.resolve(id)?;
        self.graph.remove_node(index);
        self.order_dirty = true;
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&dyn SignalNode, GraphError> {
        let index = self.resolve(id)?;
        self.graph
            .node_weight(index)
            .map(|entry| entry.node.as_ref())
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut dyn SignalNode, GraphError> {
        let index = self.resolve(id)?;
        self.graph
            .node_weight_mut(index)
            .map(|entry| entry.node.as_mut())
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn get<N: SignalNode>(&self, handle: NodeHandle<N>) -> Result<&N, GraphError> {
        let id = handle.id();
        self.node(id)?
            .as_any()
            .downcast_ref::<N>()
            .ok_or(GraphError::TypeMismatch(id))
    }

    pub fn get_mut<N: SignalNode>(&mut self, handle: NodeHandle<N>) -> Result<&mut N, GraphError> {
        let id = handle.id();
        self.node_mut(id)?
            .as_any_mut()
            .downcast_mut::<N>()
            .ok_or(GraphError::TypeMismatch(id))
    }

    fn refresh_order(&mut self) {
        if !self.order_dirty {
            return;
        }
        // connect() keeps the graph acyclic
        self.order = toposort(&self.graph, None).unwrap_or_default();
        self.order_dirty = false;
    }

    /// Render one block of at most `MAX_BLOCK_SIZE` frames into `out`.
    pub fn render(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let frames = out.len().min(MAX_BLOCK_SIZE);
        let out = &mut out[..frames];
        out.fill(0.0);
        self.refresh_order();

        let mut input = std::mem::take(&mut self.scratch);
        for i in 0..self.order.len() {
            let index = self.order[i];

            let block = &mut input[..frames];
            block.fill(0.0);
            for upstream in self.graph.neighbors_directed(index, Direction::Incoming) {
                accumulate(block, &self.graph[upstream].output[..frames]);
            }

            let entry = &mut self.graph[index];
            entry.node.process(block, &mut entry.output[..frames], ctx);
            if entry.to_output {
                accumulate(out, &entry.output[..frames]);
            }
        }
        self.scratch = input;
    }

    /// Remove every node reporting `finished()`. Returns how many went.
    pub fn prune_finished(&mut self) -> usize {
        let finished: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&index| self.graph[index].node.finished())
            .collect();

        for &index in &finished {
            self.graph.remove_node(index);
        }
        if !finished.is_empty() {
            self.order_dirty = true;
            debug!(count = finished.len(), "pruned finished nodes");
        }
        finished.len()
    }
}

impl Default for SignalGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::impl_as_any;

    /// Emits a constant, adding its input.
    struct Constant(f32);

    impl SignalNode for Constant {
        fn process(&mut self, input: &[f32], output: &mut [f32], _ctx: &RenderCtx) {
            for (o, &i) in output.iter_mut().zip(input) {
                *o = i + self.0;
            }
        }

        impl_as_any!();
    }

    /// Finishes after its first block.
    struct OneBlock {
        done: bool,
    }

    impl SignalNode for OneBlock {
        fn process(&mut self, _input: &[f32], output: &mut [f32], _ctx: &RenderCtx) {
            output.fill(if self.done { 0.0 } else { 1.0 });
            self.done = true;
        }

        fn finished(&self) -> bool {
            self.done
        }

        impl_as_any!();
    }

    fn ctx() -> RenderCtx {
        RenderCtx::new(48_000.0, 0.0)
    }

    #[test]
    fn unconnected_graph_is_silent() {
        let mut graph = SignalGraph::new();
        graph.add(Constant(1.0));
        let mut out = [1.0; 16];
        graph.render(&mut out, &ctx());
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn chain_passes_signal_downstream() {
        let mut graph = SignalGraph::new();
        let a = graph.add(Constant(0.25));
        let b = graph.add(Constant(0.5));
        graph.connect(a.id(), b).unwrap();
        graph.connect(b.id(), Sink::Output).unwrap();

        let mut out = [0.0; 8];
        graph.render(&mut out, &ctx());
        assert!(out.iter().all(|&s| s == 0.75));
    }

    #[test]
    fn fan_out_and_fan_in_sum() {
        let mut graph = SignalGraph::new();
        let source = graph.add(Constant(1.0));
        let left = graph.add(Constant(0.0));
        let right = graph.add(Constant(0.0));
        let mix = graph.add(Constant(0.0));
        graph.connect(source.id(), left).unwrap();
        graph.connect(source.id(), right).unwrap();
        graph.connect(left.id(), mix).unwrap();
        graph.connect(right.id(), mix).unwrap();
        graph.connect(mix.id(), Sink::Output).unwrap();

        let mut out = [0.0; 4];
        graph.render(&mut out, &ctx());
        assert_eq!(out, [2.0; 4]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = SignalGraph::new();
        let a = graph.add(Constant(0.0));
        let b = graph.add(Constant(0.0));
        graph.connect(a.id(), b).unwrap();

        assert!(matches!(
            graph.connect(b.id(), a),
            Err(GraphError::Cycle { .. })
        ));
        assert!(matches!(
            graph.connect(a.id(), a),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn disconnect_detaches_all_destinations() {
        let mut graph = SignalGraph::new();
        let a = graph.add(Constant(1.0));
        let b = graph.add(Constant(0.0));
        graph.connect(a.id(), b).unwrap();
        graph.connect(a.id(), Sink::Output).unwrap();
        graph.disconnect(a.id()).unwrap();

        assert!(!graph.is_connected(a.id(), b));
        assert!(!graph.is_connected(a.id(), Sink::Output));
    }

    #[test]
    fn typed_access_checks_type() {
        let mut graph = SignalGraph::new();
        let handle = graph.add(Constant(0.5));
        assert_eq!(graph.get(handle).unwrap().0, 0.5);

        let wrong: NodeHandle<OneBlock> = NodeHandle::new(handle.id());
        assert!(matches!(graph.get_mut(wrong), Err(GraphError::TypeMismatch(_))));
    }

    #[test]
    fn finished_nodes_are_pruned_and_handles_go_stale() {
        let mut graph = SignalGraph::new();
        let once = graph.add(OneBlock { done: false });
        graph.connect(once.id(), Sink::Output).unwrap();

        let mut out = [0.0; 4];
        graph.render(&mut out, &ctx());
        assert_eq!(out, [1.0; 4]);
        assert_eq!(graph.prune_finished(), 1);

        // the freed slot is reused, the old handle must not resolve to it
        let other = graph.add(Constant(0.0));
        assert!(graph.contains(other.id()));
        assert!(matches!(graph.get(once), Err(GraphError::UnknownNode(_))));
    }
}
