//! The shared output graph.
//!
//! An [`AudioEndpoint`] owns one [`AudioGraph`] with a permanent
//! [`Destination`] mixer wired into a terminal sink. Sounds are added as
//! [`SignalGraphInstance`]s: a batch of nodes with an expiry time. The renderer
//! removes every expired instance at the first block boundary at or after its
//! deadline, so nobody ever has to tear a sound down by hand.
//!
//! Two flavours exist:
//!
//! - **Device**: renders into a [`CpalSink`] on a dedicated thread, paced
//!   against what the device has consumed. Only the process-wide engine opens
//!   one, so a process never has more than one.
//! - **Offline** ([`AudioEndpoint::offline`]): renders into a [`CaptureSink`]
//!   only when [`AudioEndpoint::render`] is called.
//!
//! ```
//! use blip::{AudioEndpoint, EngineConfig, Gain};
//!
//! let endpoint = AudioEndpoint::offline(&EngineConfig::default());
//! let instance = endpoint.schedule(0.01, |builder| {
//!     let gain = builder.add(Gain::new(0.5));
//!     builder.connect_to_destination(gain.id());
//! });
//!
//! assert!(endpoint.is_alive(&instance));
//! endpoint.render(480).unwrap();
//! assert!(!endpoint.is_alive(&instance));
//! ```
//!
//! [`CpalSink`]: crate::nodes::CpalSink

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dasp_graph::Buffer;
use rtrb::{Consumer, RingBuffer};

use crate::config::EngineConfig;
use crate::error::AudioError;
use crate::graph::{AudioGraph, Handle};
use crate::node::{AudioNode, NodeId};
use crate::nodes::{CaptureSink, Destination};

#[cfg(feature = "cpal_sink")]
use crate::device::CpalDevice;
#[cfg(feature = "cpal_sink")]
use crate::nodes::{StreamCommand, StreamControl};

/// Capture ring capacity for offline endpoints; drained after every block.
const CAPTURE_CAPACITY: usize = Buffer::LEN * 4;

/// Decides whether an offline endpoint may unlock, standing in for the
/// platform's audio policy.
type UnlockGate = Box<dyn Fn() -> Result<(), AudioError> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointState {
    /// No endpoint has been built yet
    Uninitialized,
    /// Output is locked; the clock is frozen
    Suspended,
    /// Output is flowing and the clock advances
    Running,
}

impl EndpointState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => EndpointState::Suspended,
            2 => EndpointState::Running,
            _ => EndpointState::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            EndpointState::Uninitialized => 0,
            EndpointState::Suspended => 1,
            EndpointState::Running => 2,
        }
    }
}

struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: EndpointState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    #[inline]
    fn load(&self) -> EndpointState {
        EndpointState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    fn store(&self, state: EndpointState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// One triggered sound: the nodes it added and when they go away.
///
/// Instances are never reused. Holding one does not keep the nodes alive; it
/// is a receipt for inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalGraphInstance {
    id: u64,
    created_at: f64,
    expires_at: f64,
    nodes: Vec<NodeId>,
}

impl SignalGraphInstance {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Endpoint time the instance was scheduled at, in seconds
    #[inline]
    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// Endpoint time after which the instance is disposed, in seconds
    #[inline]
    pub fn expires_at(&self) -> f64 {
        self.expires_at
    }

    #[inline]
    pub fn lifetime(&self) -> f64 {
        self.expires_at - self.created_at
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// Adds the nodes of one instance to the graph.
///
/// Every node added through the builder belongs to the instance being built
/// and is removed with it.
pub struct GraphBuilder<'a> {
    graph: &'a mut AudioGraph,
    destination: NodeId,
    nodes: Vec<NodeId>,
}

impl<'a> GraphBuilder<'a> {
    /// Endpoint time in seconds at which the next rendered block starts
    #[inline]
    pub fn now(&self) -> f64 {
        self.graph.current_time()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    pub fn add<N: AudioNode>(&mut self, node: N) -> Handle<N::Message> {
        let handle = self.graph.add(node);
        self.nodes.push(handle.id());
        handle
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        self.graph.connect(from, to);
    }

    /// Route a node into the endpoint's output mix.
    pub fn connect_to_destination(&mut self, from: NodeId) {
        self.graph.connect(from, self.destination);
    }
}

struct Renderer {
    graph: AudioGraph,
    destination: NodeId,
    instances: Vec<SignalGraphInstance>,
    capture: Option<Consumer<f32>>,
    next_instance: u64,
}

impl Renderer {
    fn new<S: AudioNode>(sample_rate: u32, sink: S, capture: Option<Consumer<f32>>) -> Self {
        let mut graph = AudioGraph::new(sample_rate);
        let destination = graph.add(Destination::new()).id();
        let sink = graph.add(sink).id();
        graph.connect(destination, sink);
        graph.set_terminal(sink);

        Self {
            graph,
            destination,
            instances: Vec::new(),
            capture,
            next_instance: 0,
        }
    }

    fn render_block(&mut self) {
        self.graph.process();
        self.dispose_expired();
    }

    fn dispose_expired(&mut self) {
        let now = self.graph.current_time();
        let graph = &mut self.graph;
        self.instances.retain(|instance| {
            if instance.expires_at > now {
                return true;
            }
            for &node in &instance.nodes {
                graph.remove(node);
            }
            tracing::trace!(
                instance = instance.id,
                nodes = instance.nodes.len(),
                at = now,
                "disposed expired sound"
            );
            false
        });
    }
}

fn lock(renderer: &Mutex<Renderer>) -> MutexGuard<'_, Renderer> {
    // A panic mid-block leaves the graph usable; keep playing
    renderer.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Output {
    Offline(Option<UnlockGate>),
    #[cfg(feature = "cpal_sink")]
    Device(live::DeviceOutput),
}

/// The output graph every sound is scheduled on.
pub struct AudioEndpoint {
    renderer: Arc<Mutex<Renderer>>,
    state: StateCell,
    sample_rate: u32,
    output: Output,
}

impl AudioEndpoint {
    /// An endpoint that renders into memory on demand.
    ///
    /// It starts `Suspended` when `config.start_suspended` is set, like a
    /// locked device would. Resuming it always succeeds.
    pub fn offline(config: &EngineConfig) -> Self {
        Self::offline_gated(config, None)
    }

    /// An offline endpoint whose resumes go through `gate`, like a platform
    /// that only unlocks audio after a user gesture.
    #[cfg(test)]
    pub(crate) fn offline_with_unlock<G>(config: &EngineConfig, gate: G) -> Self
    where
        G: Fn() -> Result<(), AudioError> + Send + Sync + 'static,
    {
        Self::offline_gated(config, Some(Box::new(gate)))
    }

    fn offline_gated(config: &EngineConfig, gate: Option<UnlockGate>) -> Self {
        let sample_rate = config.sample_rate;
        let (producer, capture) = RingBuffer::new(CAPTURE_CAPACITY);
        let renderer = Renderer::new(sample_rate, CaptureSink::new(producer), Some(capture));

        let state = if config.start_suspended {
            EndpointState::Suspended
        } else {
            EndpointState::Running
        };

        Self {
            renderer: Arc::new(Mutex::new(renderer)),
            state: StateCell::new(state),
            sample_rate,
            output: Output::Offline(gate),
        }
    }

    /// Open an endpoint on `device`, rendering on a background thread.
    ///
    /// The stream is built paused. Unless `config.start_suspended` is set, it
    /// is resumed right away; a refused resume leaves it `Suspended` rather
    /// than failing construction.
    #[cfg(feature = "cpal_sink")]
    pub(crate) fn open(device: &CpalDevice, config: &EngineConfig) -> Result<Self, AudioError> {
        let sample_rate = device.sample_rate();
        let (sink, control) = device.create_sink()?;
        let control = Arc::new(control);

        let renderer = Arc::new(Mutex::new(Renderer::new(sample_rate, sink, None)));
        let state = StateCell::new(EndpointState::Suspended);

        let lead_frames = lead_frames(config, sample_rate, control.capacity_frames());
        let output = live::DeviceOutput::start(renderer.clone(), control, lead_frames)?;

        tracing::debug!(
            device = device.name(),
            sample_rate,
            channels = device.channels(),
            lead_frames,
            "audio device opened"
        );

        let endpoint = Self {
            renderer,
            state,
            sample_rate,
            output: Output::Device(output),
        };

        if !config.start_suspended {
            if let Err(error) = endpoint.resume() {
                tracing::warn!(%error, "audio device opened suspended");
            }
        }
        Ok(endpoint)
    }

    /// Open an endpoint on the system's default output device.
    #[cfg(feature = "cpal_sink")]
    pub(crate) fn open_default(config: &EngineConfig) -> Result<Self, AudioError> {
        let device = CpalDevice::default_output()?;
        Self::open(&device, config)
    }

    /// A device endpoint is `Running` only while its stream is actually
    /// playing, so a refused unlock keeps reporting `Suspended`.
    #[inline]
    pub fn state(&self) -> EndpointState {
        match &self.output {
            Output::Offline(_) => self.state.load(),
            #[cfg(feature = "cpal_sink")]
            Output::Device(device) if device.is_playing() => EndpointState::Running,
            #[cfg(feature = "cpal_sink")]
            Output::Device(_) => EndpointState::Suspended,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.output, Output::Offline(_))
    }

    /// Unlock output. The clock starts advancing from where it stopped.
    ///
    /// A refused unlock leaves the endpoint `Suspended`; asking again later
    /// is fine.
    pub fn resume(&self) -> Result<(), AudioError> {
        match &self.output {
            Output::Offline(None) => {}
            Output::Offline(Some(gate)) => gate()?,
            #[cfg(feature = "cpal_sink")]
            Output::Device(device) => device.request(StreamCommand::Play)?,
        }
        self.state.store(EndpointState::Running);
        tracing::debug!("audio endpoint resumed");
        Ok(())
    }

    /// Lock output and freeze the clock. Scheduled sounds wait.
    pub fn suspend(&self) -> Result<(), AudioError> {
        match &self.output {
            Output::Offline(_) => {}
            #[cfg(feature = "cpal_sink")]
            Output::Device(device) => device.request(StreamCommand::Pause)?,
        }
        self.state.store(EndpointState::Suspended);
        tracing::debug!("audio endpoint suspended");
        Ok(())
    }

    /// Endpoint time in seconds: frames rendered so far over the sample rate.
    pub fn current_time(&self) -> f64 {
        lock(&self.renderer).graph.current_time()
    }

    /// Add a batch of nodes that lives for `lifetime` seconds from now.
    ///
    /// `build` runs with the graph locked, so everything it schedules relative
    /// to [`GraphBuilder::now`] lines up with the first block that hears it.
    pub fn schedule<F>(&self, lifetime: f64, build: F) -> SignalGraphInstance
    where
        F: FnOnce(&mut GraphBuilder<'_>),
    {
        let mut guard = lock(&self.renderer);
        let renderer = &mut *guard;
        let created_at = renderer.graph.current_time();

        let mut builder = GraphBuilder {
            graph: &mut renderer.graph,
            destination: renderer.destination,
            nodes: Vec::new(),
        };
        build(&mut builder);
        let nodes = builder.nodes;

        let instance = SignalGraphInstance {
            id: renderer.next_instance,
            created_at,
            expires_at: created_at + lifetime.max(0.0),
            nodes,
        };
        renderer.next_instance += 1;
        renderer.instances.push(instance.clone());

        tracing::trace!(
            instance = instance.id,
            nodes = instance.nodes.len(),
            created_at,
            expires_at = instance.expires_at,
            "scheduled sound"
        );
        instance
    }

    /// Instances scheduled and not yet disposed
    pub fn active_instances(&self) -> usize {
        lock(&self.renderer).instances.len()
    }

    /// Live nodes, including the destination and the sink
    pub fn node_count(&self) -> usize {
        lock(&self.renderer).graph.node_count()
    }

    pub fn is_alive(&self, instance: &SignalGraphInstance) -> bool {
        lock(&self.renderer)
            .instances
            .iter()
            .any(|active| active.id == instance.id)
    }

    /// Render at least `frames` mono frames of an offline endpoint.
    ///
    /// Whole blocks are rendered, so the result is `frames` rounded up to a
    /// multiple of the block size. A suspended endpoint renders nothing and
    /// its clock does not move.
    pub fn render(&self, frames: usize) -> Result<Vec<f32>, AudioError> {
        if !self.is_offline() {
            return Err(AudioError::NotOffline);
        }
        if self.state() != EndpointState::Running {
            return Ok(Vec::new());
        }

        let mut renderer = lock(&self.renderer);
        let blocks = frames.div_ceil(Buffer::LEN);
        let mut out = Vec::with_capacity(blocks * Buffer::LEN);

        for _ in 0..blocks {
            renderer.render_block();
            if let Some(capture) = renderer.capture.as_mut() {
                while let Ok(sample) = capture.pop() {
                    out.push(sample);
                }
            }
        }
        Ok(out)
    }
}

/// Frames the render thread stays ahead of the device, kept one block short
/// of the ring so no rendered block is ever skipped.
#[cfg(feature = "cpal_sink")]
fn lead_frames(config: &EngineConfig, sample_rate: u32, capacity_frames: usize) -> u64 {
    let wanted = (config.render_lead.as_secs_f64() * sample_rate as f64).ceil() as u64;
    let limit = capacity_frames.saturating_sub(Buffer::LEN) as u64;
    if wanted > limit {
        tracing::warn!(wanted, limit, "render lead exceeds the device ring, clamped");
    }
    wanted.min(limit)
}

#[cfg(feature = "cpal_sink")]
mod live {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread::JoinHandle;
    use std::time::Duration;

    use super::{lock, Renderer, StreamCommand, StreamControl};
    use crate::error::AudioError;

    /// The render thread and the stream it feeds.
    pub(super) struct DeviceOutput {
        control: Arc<StreamControl>,
        shutdown: Arc<AtomicBool>,
        render_thread: Option<JoinHandle<()>>,
    }

    impl DeviceOutput {
        pub(super) fn start(
            renderer: Arc<Mutex<Renderer>>,
            control: Arc<StreamControl>,
            lead_frames: u64,
        ) -> Result<Self, AudioError> {
            let shutdown = Arc::new(AtomicBool::new(false));

            let thread_control = control.clone();
            let thread_shutdown = shutdown.clone();
            let render_thread = std::thread::Builder::new()
                .name("blip-render".into())
                .spawn(move || render_loop(&renderer, &thread_control, &thread_shutdown, lead_frames))
                .map_err(|e| AudioError::EndpointUnavailable(format!("cannot spawn render thread: {e}")))?;

            Ok(Self {
                control,
                shutdown,
                render_thread: Some(render_thread),
            })
        }

        pub(super) fn request(&self, command: StreamCommand) -> Result<(), AudioError> {
            self.control.request(command)
        }

        #[inline]
        pub(super) fn is_playing(&self) -> bool {
            self.control.is_playing()
        }
    }

    impl Drop for DeviceOutput {
        fn drop(&mut self) {
            self.shutdown.store(true, Ordering::Release);
            if let Some(thread) = self.render_thread.take() {
                if thread.join().is_err() {
                    tracing::warn!("render thread panicked");
                }
            }
        }
    }

    /// Keep the graph `lead_frames` ahead of the device while output is playing.
    fn render_loop(
        renderer: &Mutex<Renderer>,
        control: &StreamControl,
        shutdown: &AtomicBool,
        lead_frames: u64,
    ) {
        while !shutdown.load(Ordering::Acquire) {
            if control.is_playing() {
                let target = control.frames_consumed() + lead_frames;
                let mut renderer = lock(renderer);
                while renderer.graph.frame() < target {
                    renderer.render_block();
                }
                drop(renderer);

                if control.check_underrun() {
                    tracing::trace!("audio output underrun");
                }
            }
            std::thread::sleep(Duration::from_micros(500));
        }
        tracing::trace!("render thread exiting");
    }
}
