use bytes::Bytes;
use std::fmt;

use crate::util::hex_bytes;

/// Maximum payload length of a single frame
pub const MAX_FRAME_LEN: usize = 8;

/// One outgoing chunk of an encoded reply.
///
/// Frames carry no address of their own: the Nth frame of a sequence goes out
/// under wire identifier `start_id + N` of the action's frame range.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Frame(Bytes);

impl Frame {
    /// Wraps `bytes` as a frame, or returns `None` if it is longer than
    /// [`MAX_FRAME_LEN`]
    pub fn new(bytes: impl Into<Bytes>) -> Option<Self> {
        let bytes = bytes.into();
        (bytes.len() <= MAX_FRAME_LEN).then_some(Frame(bytes))
    }

    /// Splits `data` into consecutive frames of at most [`MAX_FRAME_LEN`] bytes.
    ///
    /// The last frame may be shorter; empty input yields no frames.
    pub fn chunk(data: impl Into<Bytes>) -> Vec<Frame> {
        let mut data = data.into();
        let mut frames = Vec::with_capacity(data.len().div_ceil(MAX_FRAME_LEN));
        while !data.is_empty() {
            let take = data.len().min(MAX_FRAME_LEN);
            frames.push(Frame(data.split_to(take)));
        }
        frames
    }

    /// Frame payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// An empty frame marks the end of a transmission
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[{}]", hex_bytes(&self.0))
    }
}
