//! Audio graph - owns nodes and message queues

use core::marker::PhantomData;

use dasp_graph::{Buffer, Input, NodeData, Processor};
use hashbrown::HashMap;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::node::{AudioNode, NodeId, ProcessContext};

/// Per-node message queue capacity.
const QUEUE_SIZE: usize = 64;

/// A handle for sending messages to a node in the audio graph.
///
/// Handles are returned when a node is added and provide two capabilities:
/// 1. **Connections** - pass [`Handle::id`] to the graph's connect calls
/// 2. **Messages** - send parameter updates via [`Handle::send`]
///
/// Messages are buffered in a lock-free ring buffer and processed at the start
/// of the node's next block. If the buffer is full, [`Handle::send`] returns
/// `Err(msg)` with the message that couldn't be sent.
pub struct Handle<M: Send + 'static> {
    pub(crate) id: NodeId,
    pub(crate) sender: Producer<M>,
    pub(crate) _marker: PhantomData<M>,
}

impl<M: Send + 'static> Handle<M> {
    /// Send a message to the node.
    pub fn send(&mut self, msg: M) -> Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

// Type-erased wrapper so we can store heterogeneous nodes
trait ErasedNode: Send {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Input], outputs: &mut [Buffer]);
}

struct NodeWrapper<N: AudioNode> {
    node: N,
    receiver: Consumer<N::Message>,
}

impl<N: AudioNode> ErasedNode for NodeWrapper<N> {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Input], outputs: &mut [Buffer]) {
        // Split borrow to avoid conflict between receiver and node
        let receiver = &mut self.receiver;
        let node = &mut self.node;

        let messages = core::iter::from_fn(|| receiver.pop().ok());
        node.process(ctx, messages, inputs, outputs);
    }
}

// Adapter for dasp_graph
struct DaspAdapter {
    node: Box<dyn ErasedNode>,
    ctx: ProcessContext,
}

impl dasp_graph::Node for DaspAdapter {
    fn process(&mut self, inputs: &[Input], outputs: &mut [Buffer]) {
        self.node.process_erased(&self.ctx, inputs, outputs);
    }
}

// Stable indices: voices are removed while the rest of the graph keeps playing.
type InnerGraph = StableGraph<NodeData<DaspAdapter>, ()>;

/// An audio processing graph at a fixed sample rate
pub(crate) struct AudioGraph {
    graph: InnerGraph,
    processor: Processor<InnerGraph>,
    ctx: ProcessContext,

    node_indices: HashMap<NodeId, NodeIndex>,
    next_node_id: u32,

    terminal: Option<NodeIndex>,
}

impl AudioGraph {
    /// Create a new graph with the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            graph: InnerGraph::with_capacity(64, 64),
            processor: Processor::with_capacity(64),
            ctx: ProcessContext {
                sample_rate,
                buffer_size: Buffer::LEN,
                frame: 0,
            },
            node_indices: HashMap::new(),
            next_node_id: 0,
            terminal: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.ctx.sample_rate
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.ctx.frame
    }

    /// Graph time in seconds (start of the next block to be rendered).
    pub fn current_time(&self) -> f64 {
        self.ctx.block_start()
    }

    /// Number of live nodes, including the destination and sink
    pub fn node_count(&self) -> usize {
        self.node_indices.len()
    }

    /// Add a node, returns a handle for sending messages
    pub fn add<N: AudioNode>(&mut self, node: N) -> Handle<N::Message> {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let (producer, consumer) = RingBuffer::new(QUEUE_SIZE);

        let num_outputs = node.num_outputs();
        let wrapper = NodeWrapper { node, receiver: consumer };
        let adapter = DaspAdapter {
            node: Box::new(wrapper),
            ctx: self.ctx,
        };

        let node_data = match num_outputs {
            2 => NodeData::new2(adapter),
            // 0 outputs = sink, but dasp_graph still needs a buffer for inputs
            _ => NodeData::new1(adapter),
        };

        let idx = self.graph.add_node(node_data);
        self.node_indices.insert(id, idx);

        Handle {
            id,
            sender: producer,
            _marker: PhantomData,
        }
    }

    /// Connect output of `from` to input of `to`.
    ///
    /// Connections to nodes that were already removed are ignored.
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        if let (Some(&from_idx), Some(&to_idx)) = (self.node_indices.get(&from), self.node_indices.get(&to)) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Remove a node and all of its edges. Returns false if it was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.node_indices.remove(&id) {
            Some(idx) => {
                if self.terminal == Some(idx) {
                    self.terminal = None;
                }
                self.graph.remove_node(idx).is_some()
            }
            None => false,
        }
    }

    /// Set which node to process to (typically a sink)
    pub fn set_terminal(&mut self, id: NodeId) {
        self.terminal = self.node_indices.get(&id).copied();
    }

    /// Process one block of audio through the graph and advance the clock
    pub fn process(&mut self) {
        let ctx = self.ctx;
        for &idx in self.node_indices.values() {
            self.graph[idx].node.ctx = ctx;
        }

        if let Some(terminal) = self.terminal {
            self.processor.process(&mut self.graph, terminal);
        }

        self.ctx.frame += self.ctx.buffer_size as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ones;

    impl AudioNode for Ones {
        type Message = ();

        fn process(&mut self, _ctx: &ProcessContext, _m: impl Iterator<Item = ()>, _i: &[Input], outputs: &mut [Buffer]) {
            outputs[0].iter_mut().for_each(|s| *s = 1.0);
        }
    }

    #[test]
    fn process_advances_clock_by_one_block() {
        let mut graph = AudioGraph::new(48_000);
        let ones = graph.add(Ones);
        graph.set_terminal(ones.id());

        graph.process();
        graph.process();

        assert_eq!(graph.frame(), 128);
        assert_eq!(graph.current_time(), 128.0 / 48_000.0);
    }

    #[test]
    fn removed_nodes_are_forgotten() {
        let mut graph = AudioGraph::new(48_000);
        let a = graph.add(Ones);
        let b = graph.add(Ones);
        graph.connect(a.id(), b.id());

        assert_eq!(graph.node_count(), 2);
        assert!(graph.remove(a.id()));
        assert!(!graph.remove(a.id()));

        // Connecting a dead node is a no-op rather than a panic
        graph.connect(a.id(), b.id());
        assert_eq!(graph.node_count(), 1);
    }
}
