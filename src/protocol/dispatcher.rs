use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::core::{Error, FrameRange, ProtocolError, Result};
use crate::link::SerialLink;
use crate::rpc::{request_object, RpcClient};
use crate::util::hex_bytes;
use super::frame::Frame;
use super::registry::ActionRegistry;

/// Pause after a failed serial read before the next attempt
const IO_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Where the dispatcher is within the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Blocked on the serial link waiting for an identifier byte
    AwaitIdentifier,
    /// Looking up the action for the received identifier
    ResolveAction {
        /// Received identifier
        id: u8,
    },
    /// Waiting for the remote method to return
    InvokeRpc {
        /// Received identifier
        id: u8,
    },
    /// Checking the reply carries data
    ValidateReply {
        /// Received identifier
        id: u8,
    },
    /// Running the action's codec over the reply
    EncodeFrames {
        /// Received identifier
        id: u8,
    },
    /// Writing frames to the serial link
    EmitFrames {
        /// Received identifier
        id: u8,
        /// Frames written so far
        written: usize,
    },
}

/// Result of one successful dispatch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The read timed out before an identifier arrived
    Idle,
    /// An identifier was served
    Completed {
        /// Received identifier
        id: u8,
        /// Frames produced by the codec
        frames_encoded: usize,
        /// Frames actually written to the link
        frames_written: usize,
    },
}

/// Counters over the dispatcher's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Cycles that received an identifier
    pub cycles: u64,
    /// Cycles that reached the end of frame emission
    pub completed: u64,
    /// Cycles aborted by an error
    pub aborted: u64,
    /// Total frames written
    pub frames_written: u64,
}

/// Serves identifier bytes from the serial link one at a time.
///
/// Each cycle reads exactly one identifier, makes at most one RPC call and
/// only then writes frames, in ascending wire identifier order. `read_byte`,
/// `invoke` and `write_bytes` are the only calls that block.
pub struct Dispatcher<L, R> {
    /// Serial link to the remote peer
    link: L,
    /// RPC collaborator
    rpc: R,
    /// Immutable action table
    registry: Arc<ActionRegistry>,
    /// Current state
    state: DispatchState,
    /// Lifetime counters
    stats: DispatchStats,
}

impl<L: SerialLink, R: RpcClient> Dispatcher<L, R> {
    /// Creates a new dispatcher
    pub fn new(link: L, rpc: R, registry: Arc<ActionRegistry>) -> Self {
        Dispatcher {
            link,
            rpc,
            registry,
            state: DispatchState::AwaitIdentifier,
            stats: DispatchStats::default(),
        }
    }

    /// Current state of the cycle in flight
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Lifetime counters
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Runs cycles until `shutdown` is set.
    ///
    /// Errors only abort the cycle they happen in; they are logged and the
    /// dispatcher goes back to reading. Shutdown is checked between cycles.
    pub fn run(&mut self, shutdown: &AtomicBool) -> DispatchStats {
        info!(actions = self.registry.len(), "dispatcher started");

        while !shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.run_cycle() {
                log_abort(&e);
                if matches!(e, Error::Io(_)) {
                    thread::sleep(IO_ERROR_PAUSE);
                }
            }
        }

        info!(stats = ?self.stats, "dispatcher stopped");
        self.stats.clone()
    }

    /// Runs a single dispatch cycle
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.state = DispatchState::AwaitIdentifier;
        let result = self.cycle();
        self.state = DispatchState::AwaitIdentifier;

        match &result {
            Ok(CycleOutcome::Completed { frames_written, .. }) => {
                self.stats.completed += 1;
                self.stats.frames_written += *frames_written as u64;
            }
            Ok(CycleOutcome::Idle) => {}
            Err(_) => self.stats.aborted += 1,
        }
        result
    }

    fn cycle(&mut self) -> Result<CycleOutcome> {
        let id = match self.link.read_byte()? {
            Some(id) => id,
            None => return Ok(CycleOutcome::Idle),
        };
        self.stats.cycles += 1;
        info!("received id: {:#04X}", id);

        self.state = DispatchState::ResolveAction { id };
        let registry = Arc::clone(&self.registry);
        let entry = registry
            .resolve(id)
            .ok_or(ProtocolError::UnknownAction(id))?;
        info!(
            endpoint = %entry.endpoint,
            codec = entry.codec.name(),
            start_id = format_args!("{:#X}", entry.frame_range.start_id),
            end_id = format_args!("{:#X}", entry.frame_range.end_id),
            "resolved action"
        );

        self.state = DispatchState::InvokeRpc { id };
        let reply = self.rpc.invoke(&entry.endpoint, &request_object())?;

        self.state = DispatchState::ValidateReply { id };
        if !reply.has_data() {
            return Err(ProtocolError::MissingData.into());
        }

        self.state = DispatchState::EncodeFrames { id };
        let frames = entry.codec.encode(&reply)?;
        info!(count = frames.len(), "frames:");
        for frame in &frames {
            info!("\t{}", hex_bytes(frame.as_bytes()));
        }

        self.state = DispatchState::EmitFrames { id, written: 0 };
        let frames_written = self.emit_frames(id, entry.frame_range, &frames)?;

        Ok(CycleOutcome::Completed {
            id,
            frames_encoded: frames.len(),
            frames_written,
        })
    }

    /// Writes frames in order until the range is exhausted or an empty frame
    /// is reached. Returns the number of frames written.
    fn emit_frames(&mut self, id: u8, range: FrameRange, frames: &[Frame]) -> Result<usize> {
        let mut written = 0;

        for (position, frame) in frames.iter().enumerate() {
            let Some(wire_id) = range.wire_id(position) else {
                debug!(remaining = frames.len() - position, "answer range exhausted");
                break;
            };
            if frame.is_empty() {
                debug!(wire_id = format_args!("{:#X}", wire_id), "end of transmission");
                break;
            }

            self.link.write_bytes(frame.as_bytes())?;
            written += 1;
            self.state = DispatchState::EmitFrames { id, written };
            debug!(wire_id = format_args!("{:#X}", wire_id), frame = ?frame, "frame written");
        }

        Ok(written)
    }
}

fn log_abort(err: &Error) {
    match err {
        Error::Protocol(ProtocolError::UnknownAction(id)) => {
            warn!("invalid id: {:#04X}", id)
        }
        Error::Protocol(ProtocolError::MissingData) => warn!("data is empty"),
        Error::Rpc(msg) => warn!(error = %msg, "rpc call failed"),
        Error::Io(e) => error!(error = %e, "serial link failure"),
        other => warn!(error = %other, "cycle aborted"),
    }
}
