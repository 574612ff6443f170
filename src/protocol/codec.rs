use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::core::Result;
use crate::rpc::ReplyPayload;
use super::frame::Frame;

/// Name of the codec registered by default
pub const REQUEST_CODEC: &str = "request";

/// Turns an RPC reply into the ordered frames sent back over the serial link.
///
/// Codecs are pure: the same payload always yields the same frames. The only
/// failure is a reply whose fields do not have the expected shape.
pub trait FrameCodec: Send + Sync {
    /// Name the codec is registered and configured under
    fn name(&self) -> &str;

    /// Encodes `payload` into frames of at most [`super::MAX_FRAME_LEN`] bytes
    fn encode(&self, payload: &ReplyPayload) -> Result<Vec<Frame>>;
}

/// Splits the reply's `data` byte array into consecutive 8-byte frames
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCodec;

impl RequestCodec {
    /// Creates a new request codec
    pub fn new() -> Self {
        RequestCodec
    }
}

impl FrameCodec for RequestCodec {
    fn name(&self) -> &str {
        REQUEST_CODEC
    }

    fn encode(&self, payload: &ReplyPayload) -> Result<Vec<Frame>> {
        let data = payload.data_bytes()?;
        Ok(Frame::chunk(data))
    }
}

/// Named codecs, looked up by the `method` of each configured action.
///
/// Built once before the action registry and passed to it by reference.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Arc<dyn FrameCodec>>,
}

impl CodecRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        CodecRegistry::default()
    }

    /// Registry holding the built-in codecs
    pub fn with_defaults() -> Self {
        let mut registry = CodecRegistry::new();
        registry.register(RequestCodec::new());
        registry
    }

    /// Registers `codec` under its own name, replacing any codec of that name
    pub fn register(&mut self, codec: impl FrameCodec + 'static) -> &mut Self {
        let name = codec.name().to_string();
        if self.codecs.insert(name.clone(), Arc::new(codec)).is_some() {
            warn!(codec = %name, "replacing previously registered codec");
        }
        self
    }

    /// Looks up a codec by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn FrameCodec>> {
        self.codecs.get(name).cloned()
    }

    /// Registered codec names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Error, ProtocolError};
    use proptest::prelude::*;
    use serde_json::json;

    fn payload(data: &[u8]) -> ReplyPayload {
        ReplyPayload::new(json!({ "data": data }))
    }

    #[test]
    fn test_request_codec_partial_tail() {
        let data: Vec<u8> = (1..=10).collect();
        let frames = RequestCodec.encode(&payload(&data)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(frames[1].as_bytes(), &[9, 10]);
    }

    #[test]
    fn test_request_codec_empty() {
        assert!(RequestCodec.encode(&payload(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_request_codec_malformed_data() {
        let err = RequestCodec
            .encode(&ReplyPayload::new(json!({ "data": { "x": 1 } })))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::MalformedReply(_))
        ));
    }

    struct ReversedCodec;

    impl FrameCodec for ReversedCodec {
        fn name(&self) -> &str {
            "reversed"
        }

        fn encode(&self, payload: &ReplyPayload) -> Result<Vec<Frame>> {
            let mut data = payload.data_bytes()?.to_vec();
            data.reverse();
            Ok(Frame::chunk(data))
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = CodecRegistry::with_defaults();
        registry.register(ReversedCodec);

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["request", "reversed"]);
        assert!(registry.get("missing").is_none());

        let codec = registry.get("reversed").unwrap();
        let frames = codec.encode(&payload(&[1, 2, 3])).unwrap();
        assert_eq!(frames[0].as_bytes(), &[3, 2, 1]);
    }

    #[test]
    fn test_registry_replaces_by_name() {
        let mut registry = CodecRegistry::new();
        registry.register(RequestCodec).register(RequestCodec);
        assert_eq!(registry.names().count(), 1);
    }

    proptest! {
        #[test]
        fn prop_request_codec_chunks(data in proptest::collection::vec(any::<u8>(), 0..200)) {
            let frames = RequestCodec.encode(&payload(&data)).unwrap();

            prop_assert_eq!(frames.len(), data.len().div_ceil(8));
            prop_assert!(frames.iter().all(|f| !f.is_empty() && f.len() <= 8));

            let joined: Vec<u8> = frames.iter().flat_map(|f| f.as_bytes().to_vec()).collect();
            prop_assert_eq!(joined, data);
        }
    }
}
