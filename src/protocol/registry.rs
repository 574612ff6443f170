use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::{ActionConfig, ConfigError, Endpoint, FrameRange, Result};
use crate::util::{parse_hex, parse_hex_byte};
use super::codec::{CodecRegistry, FrameCodec};

/// One configured action: what to call for an identifier byte and how to
/// frame the answer.
#[derive(Clone)]
pub struct ActionEntry {
    /// Identifier byte selecting this action
    pub id: u8,
    /// Remote method to invoke
    pub endpoint: Endpoint,
    /// Codec turning the reply into frames
    pub codec: Arc<dyn FrameCodec>,
    /// Wire identifiers the answer frames are sent under
    pub frame_range: FrameRange,
}

impl fmt::Debug for ActionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionEntry")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("codec", &self.codec.name())
            .field("frame_range", &self.frame_range)
            .finish()
    }
}

/// Identifier byte to action table.
///
/// Built once at startup and never mutated afterwards.
pub struct ActionRegistry {
    entries: Box<[Option<ActionEntry>; 256]>,
    len: usize,
}

impl ActionRegistry {
    /// Builds the registry from the `actions` section of the configuration.
    ///
    /// Fails on the first malformed identifier or frame range, on a method
    /// name with no registered codec, and on two identifier strings naming
    /// the same byte.
    pub fn build(
        actions: &BTreeMap<String, ActionConfig>,
        codecs: &CodecRegistry,
    ) -> Result<Self> {
        let mut entries: Box<[Option<ActionEntry>; 256]> = Box::new(std::array::from_fn(|_| None));
        let mut len = 0;

        for (key, action) in actions {
            let id = parse_hex_byte(key)
                .ok_or_else(|| ConfigError::MalformedId { id: key.clone() })?;

            let start_id = parse_range_field(key, "start_id", &action.answer.start_id)?;
            let end_id = parse_range_field(key, "end_id", &action.answer.end_id)?;
            let frame_range = FrameRange::new(start_id, end_id);
            if start_id > end_id {
                warn!(
                    id = %key,
                    start_id = format_args!("{:#X}", start_id),
                    end_id = format_args!("{:#X}", end_id),
                    "answer range is empty, this action will never emit frames"
                );
            }

            let codec = codecs.get(&action.method).ok_or_else(|| ConfigError::UnknownCodec {
                id: key.clone(),
                method: action.method.clone(),
            })?;

            let slot = &mut entries[id as usize];
            if slot.is_some() {
                return Err(ConfigError::DuplicateId { id: key.clone() }.into());
            }

            info!("{}.{}: {}", action.who, action.method, key);
            *slot = Some(ActionEntry {
                id,
                endpoint: Endpoint::for_service(&action.who, &action.method),
                codec,
                frame_range,
            });
            len += 1;
        }

        Ok(ActionRegistry { entries, len })
    }

    /// Looks up the action registered for `id`
    pub fn resolve(&self, id: u8) -> Option<&ActionEntry> {
        self.entries[id as usize].as_ref()
    }

    /// Number of registered actions
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registered actions in ascending identifier order
    pub fn iter(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter().flatten()
    }
}

fn parse_range_field(id: &str, field: &'static str, value: &str) -> Result<u32> {
    parse_hex(value).ok_or_else(|| {
        ConfigError::MalformedRange {
            id: id.to_string(),
            field,
            value: value.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, Error};

    fn build(document: &str) -> Result<ActionRegistry> {
        let config = Config::from_json(document).unwrap();
        ActionRegistry::build(&config.actions, &CodecRegistry::with_defaults())
    }

    fn action(who: &str, method: &str, start: &str, end: &str) -> String {
        format!(
            r#"{{ "who": "{who}", "method": "{method}", "answer": {{ "start_id": "{start}", "end_id": "{end}" }} }}"#
        )
    }

    #[test]
    fn test_build_and_resolve() {
        let document = format!(
            r#"{{ "actions": {{ "0X01": {}, "0x2a": {}, "ff": {} }} }}"#,
            action("battery", "request", "0x100", "0x10F"),
            action("motor", "request", "0x30", "0x3F"),
            action("lights", "request", "0X200", "0X200"),
        );
        let registry = build(&document).unwrap();

        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());

        let entry = registry.resolve(0x01).unwrap();
        assert_eq!(entry.id, 0x01);
        assert_eq!(entry.endpoint, Endpoint::for_service("battery", "request"));
        assert_eq!(entry.codec.name(), "request");
        assert_eq!(entry.frame_range, FrameRange::new(0x100, 0x10F));

        assert_eq!(registry.resolve(0x2a).unwrap().frame_range, FrameRange::new(0x30, 0x3F));
        assert_eq!(registry.resolve(0xff).unwrap().endpoint.path, "/zfkd/dbus/lights");

        for id in (0..=255u8).filter(|id| ![0x01, 0x2a, 0xff].contains(id)) {
            assert!(registry.resolve(id).is_none(), "unexpected entry for {:#04X}", id);
        }

        let ids: Vec<u8> = registry.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0x01, 0x2a, 0xff]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = build(r#"{ "actions": {} }"#).unwrap();
        assert!(registry.is_empty());
        assert!(registry.resolve(0).is_none());
    }

    #[test]
    fn test_malformed_id() {
        for key in ["0x100", "zz", "", "0x"] {
            let document = format!(
                r#"{{ "actions": {{ "{key}": {} }} }}"#,
                action("battery", "request", "0x10", "0x11")
            );
            let err = build(&document).err().unwrap();
            assert!(
                matches!(&err, Error::Config(ConfigError::MalformedId { id }) if id == key),
                "{key:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_malformed_range() {
        let document = format!(
            r#"{{ "actions": {{ "0x01": {} }} }}"#,
            action("battery", "request", "0x10", "end")
        );
        let err = build(&document).err().unwrap();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MalformedRange { field: "end_id", .. })
        ));
    }

    #[test]
    fn test_unknown_codec_is_fatal() {
        let document = format!(
            r#"{{ "actions": {{ "0x01": {} }} }}"#,
            action("battery", "status", "0x10", "0x11")
        );
        let err = build(&document).err().unwrap();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnknownCodec { ref method, .. }) if method == "status"
        ));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let document = format!(
            r#"{{ "actions": {{ "0x1": {}, "0X01": {} }} }}"#,
            action("battery", "request", "0x10", "0x11"),
            action("motor", "request", "0x20", "0x21"),
        );
        let err = build(&document).err().unwrap();
        assert!(matches!(err, Error::Config(ConfigError::DuplicateId { .. })));
    }

    #[test]
    fn test_inverted_range_is_accepted() {
        let document = format!(
            r#"{{ "actions": {{ "0x01": {} }} }}"#,
            action("battery", "request", "0x20", "0x10")
        );
        let registry = build(&document).unwrap();
        assert_eq!(registry.resolve(1).unwrap().frame_range.capacity(), 0);
    }
}
