//! Protocol implementation module
//!
//! This module holds the dispatch-and-framing engine: the identifier to action
//! table, the named reply codecs, and the per-request state machine that ties
//! them to the serial link and the RPC collaborator.

pub mod codec;
pub mod dispatcher;
pub mod frame;
pub mod registry;

pub use self::codec::{CodecRegistry, FrameCodec, RequestCodec, REQUEST_CODEC};
pub use self::dispatcher::{CycleOutcome, DispatchState, DispatchStats, Dispatcher};
pub use self::frame::{Frame, MAX_FRAME_LEN};
pub use self::registry::{ActionEntry, ActionRegistry};
