use std::any::Any;
use std::marker::PhantomData;

use petgraph::stable_graph::NodeIndex;

/// Context passed to signal nodes during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Logical time of the first sample in the block, in seconds
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, time: f64) -> Self {
        Self { sample_rate, time }
    }

    /// Logical time of sample `index` in the block.
    #[inline]
    pub fn time_at(&self, index: usize) -> f64 {
        self.time + index as f64 / self.sample_rate as f64
    }

    /// Logical time just past a block of `frames` samples.
    #[inline]
    pub fn block_end(&self, frames: usize) -> f64 {
        self.time_at(frames)
    }
}

/// Core trait for nodes living in a [`SignalGraph`](super::patch::SignalGraph)
///
/// A node owns its internal DSP state exclusively. The graph sums every
/// upstream node into `input` and hands the node an `output` block of the
/// same length to fill.
pub trait SignalNode: Send + 'static {
    fn process(&mut self, input: &[f32], output: &mut [f32], ctx: &RenderCtx);

    /// True once the node will never produce sound again.
    ///
    /// Finished nodes are removed from the graph after the block that
    /// finished them. Persistent nodes keep the default.
    fn finished(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Identifies one node in a graph.
///
/// The generation guards against a handle outliving its node: once a
/// finished node is pruned, its slot may be reused, but the old id no longer
/// resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: NodeIndex,
    pub(crate) generation: u64,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}", self.index.index(), self.generation)
    }
}

/// Typed handle to a node of type `N`.
pub struct NodeHandle<N> {
    id: NodeId,
    _node: PhantomData<fn() -> N>,
}

impl<N> NodeHandle<N> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            _node: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// This node as a connection destination.
    pub fn input(&self) -> Sink {
        Sink::Node(self.id)
    }
}

impl<N> Clone for NodeHandle<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for NodeHandle<N> {}

impl<N> PartialEq for NodeHandle<N> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<N> std::fmt::Debug for NodeHandle<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodeHandle").field(&self.id).finish()
    }
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Summed into another node's input.
    Node(NodeId),
    /// Summed into the hardware output.
    Output,
}

impl<N> From<NodeHandle<N>> for Sink {
    fn from(handle: NodeHandle<N>) -> Self {
        handle.input()
    }
}

impl From<NodeId> for Sink {
    fn from(id: NodeId) -> Self {
        Sink::Node(id)
    }
}

/// Implements the `as_any` plumbing of [`SignalNode`].
macro_rules! impl_as_any {
    () => {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

pub(crate) use impl_as_any;
