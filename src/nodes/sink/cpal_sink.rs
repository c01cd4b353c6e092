//! CPAL audio output sink

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, SupportedStreamConfig};
use dasp_graph::{Buffer, Input};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AudioError;
use crate::node::{AudioNode, ProcessContext};

/// How long a play/pause request waits for the stream thread to answer
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Requests for the thread that owns the CPAL stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamCommand {
    /// Start (or unlock) output
    Play,
    /// Pause output; the endpoint clock stops with it
    Pause,
}

struct Request {
    command: StreamCommand,
    reply: mpsc::Sender<Result<(), String>>,
}

/// A sink that outputs audio to a CPAL device
///
/// The CPAL stream runs on its own thread; this node feeds samples
/// into a ring buffer that the stream consumes.
pub struct CpalSink {
    buffer: Producer<f32>,
    channels: usize,
}

/// The control side of a [`CpalSink`], kept by whoever paces rendering.
pub struct StreamControl {
    requests: mpsc::Sender<Request>,
    /// Tracks how many samples CPAL has consumed
    samples_consumed: Arc<AtomicUsize>,
    /// Set by the stream thread once a play actually took effect
    playing: Arc<AtomicBool>,
    /// Tracks underrun state for diagnostics
    had_underrun: Arc<AtomicBool>,
    channels: usize,
    capacity_frames: usize,
}

impl StreamControl {
    /// Ask the stream thread to play or pause and wait for the outcome.
    ///
    /// A refused play comes back as [`AudioError::ResumeFailed`] and leaves
    /// [`is_playing`](Self::is_playing) false, so the caller can try again.
    pub fn request(&self, command: StreamCommand) -> Result<(), AudioError> {
        let (reply, answer) = mpsc::channel();
        self.requests
            .send(Request { command, reply })
            .map_err(|_| AudioError::ResumeFailed("audio stream thread has exited".into()))?;

        let outcome = answer
            .recv_timeout(REQUEST_TIMEOUT)
            .map_err(|_| AudioError::ResumeFailed("audio stream thread did not answer".into()))?;
        outcome.map_err(|why| match command {
            StreamCommand::Play => AudioError::ResumeFailed(why),
            StreamCommand::Pause => AudioError::EndpointUnavailable(why),
        })
    }

    /// Whether the device is actually pulling samples
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Frames the device has pulled so far
    #[inline]
    pub fn frames_consumed(&self) -> u64 {
        (self.samples_consumed.load(Ordering::Relaxed) / self.channels) as u64
    }

    /// Frames the ring between the render thread and the device can hold
    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Check and clear the underrun flag
    pub fn check_underrun(&self) -> bool {
        self.had_underrun.swap(false, Ordering::Relaxed)
    }
}

impl CpalSink {
    /// Open a stream on the given device and config.
    ///
    /// Blocks until the stream thread reports whether the stream could be
    /// built. The stream starts paused; request [`StreamCommand::Play`] to
    /// unlock it.
    pub fn open(device: &cpal::Device, config: &SupportedStreamConfig) -> Result<(Self, StreamControl), AudioError> {
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config = config.config();
        let sample_rate = stream_config.sample_rate.0;

        // Ring buffer sized for ~100ms of audio to handle scheduling jitter
        let buffer_samples = ((sample_rate as f32 * 0.1) as usize) * channels;
        let buffer_size = buffer_samples.next_power_of_two().max(8192);
        let (producer, consumer) = RingBuffer::<f32>::new(buffer_size);

        let feed = Feed {
            consumer,
            samples_consumed: Arc::new(AtomicUsize::new(0)),
            had_underrun: Arc::new(AtomicBool::new(false)),
        };
        let samples_consumed = feed.samples_consumed.clone();
        let had_underrun = feed.had_underrun.clone();
        let playing = Arc::new(AtomicBool::new(false));

        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();

        // Streams may be !Send, so the stream is built, driven and dropped on
        // one dedicated thread
        let device = device.clone();
        let playing_flag = playing.clone();
        std::thread::Builder::new()
            .name("blip-stream".into())
            .spawn(move || {
                let stream = match build_stream(&device, sample_format, &stream_config, feed) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(AudioError::EndpointUnavailable(err.to_string())));
                        return;
                    }
                };
                // Some hosts start streams immediately on creation
                let _ = stream.pause();
                let _ = ready_tx.send(Ok(()));

                // Runs until the control side is dropped
                for Request { command, reply } in request_rx {
                    let result = match command {
                        StreamCommand::Play => stream.play().map_err(|e| e.to_string()),
                        StreamCommand::Pause => stream.pause().map_err(|e| e.to_string()),
                    };
                    match &result {
                        Ok(()) => {
                            playing_flag.store(command == StreamCommand::Play, Ordering::Release);
                            tracing::debug!(?command, "audio stream state changed");
                        }
                        Err(error) => tracing::warn!(?command, %error, "audio stream refused state change"),
                    }
                    let _ = reply.send(result);
                }
                tracing::trace!("audio stream thread exiting");
            })
            .map_err(|e| AudioError::EndpointUnavailable(format!("cannot spawn stream thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::EndpointUnavailable("audio stream thread died during setup".into()))??;

        let sink = Self {
            buffer: producer,
            channels,
        };
        let control = StreamControl {
            requests: request_tx,
            samples_consumed,
            playing,
            had_underrun,
            channels,
            capacity_frames: buffer_size / channels.max(1),
        };
        Ok((sink, control))
    }
}

/// The device side of the ring, moved into the stream callback
struct Feed {
    consumer: Consumer<f32>,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
}

impl Feed {
    /// Fill `data` from the ring, padding with silence on underrun
    fn fill<T: Copy>(&mut self, data: &mut [T], convert: fn(f32) -> T) {
        let mut underrun = false;
        for sample in data.iter_mut() {
            let value = self.consumer.pop().unwrap_or_else(|_| {
                underrun = true;
                0.0
            });
            *sample = convert(value);
        }
        if underrun {
            self.had_underrun.store(true, Ordering::Relaxed);
        }
        self.samples_consumed.fetch_add(data.len(), Ordering::Relaxed);
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    feed: Feed,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    // f32 samples go out unclamped; integer formats saturate at full scale
    match sample_format {
        SampleFormat::F32 => output_stream::<f32>(device, stream_config, feed, |s| s),
        SampleFormat::I16 => output_stream::<i16>(device, stream_config, feed, |s| {
            (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        }),
        SampleFormat::U16 => output_stream::<u16>(device, stream_config, feed, |s| {
            ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16
        }),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

fn output_stream<T: SizedSample + Send + 'static>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut feed: Feed,
    convert: fn(f32) -> T,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| feed.fill(data, convert),
        |err: cpal::StreamError| tracing::error!(%err, "CPAL stream error"),
        None,
    )
}

impl AudioNode for CpalSink {
    type Message = (); // No control messages

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        let Some(block) = inputs.first().and_then(|input| input.buffers().first()) else {
            return;
        };

        // The mix is mono; every device channel gets the same sample
        let samples_needed = block.len() * self.channels;
        if self.buffer.slots() < samples_needed {
            tracing::trace!(samples_needed, "device ring full, block skipped");
            return;
        }

        for &sample in block.iter() {
            for _ in 0..self.channels {
                let _ = self.buffer.push(sample);
            }
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { 1 }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
