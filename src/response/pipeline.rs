use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use super::state::{map_state, StateKind};
use super::transform::{TransformRegistry, TransformSpec};
use crate::core::{Command, Error, Result, State};
use crate::protocol::DatagramCodec;

/// Decode, transform and state-map stages applied to reply datagrams
#[derive(Debug, Clone)]
pub struct ResponsePipeline {
    registry: Arc<TransformRegistry>,
}

impl ResponsePipeline {
    /// Creates a pipeline using the given transformation providers
    pub fn new(registry: Arc<TransformRegistry>) -> Self {
        ResponsePipeline { registry }
    }

    /// Transformation providers used by the transform stage
    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    /// Decodes a datagram; undecodable input yields empty text
    pub fn decode(&self, datagram: &[u8], charset: &str) -> String {
        let decoded = DatagramCodec::for_charset(charset)
            .and_then(|mut codec| codec.decode(&mut BytesMut::from(datagram)));

        match decoded {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => {
                warn!("Exception while attempting an unsupported encoding scheme: {}", e);
                String::new()
            }
        }
    }

    /// Applies the item's transformation; no transformation passes text through
    pub fn transform(&self, spec: Option<&TransformSpec>, text: &str) -> String {
        match spec {
            Some(spec) => self.registry.apply(spec, text),
            None => text.to_string(),
        }
    }

    /// Maps transformed text onto the first accepted kind that parses it
    pub fn map(
        &self,
        item: &str,
        command: &Command,
        kinds: &[StateKind],
        text: &str,
    ) -> Result<State> {
        map_state(kinds, text).ok_or_else(|| Error::state_mapping(item, command.as_text(), text))
    }

    /// Runs all three stages over a reply datagram
    pub fn interpret(
        &self,
        item: &str,
        command: &Command,
        datagram: &[u8],
        charset: &str,
        spec: Option<&TransformSpec>,
        kinds: &[StateKind],
    ) -> Result<State> {
        let text = self.decode(datagram, charset);
        let transformed = self.transform(spec, &text);
        let state = self.map(item, command, kinds, &transformed)?;
        debug!("Reply for item {} mapped to {}", item, state);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::transform::RegexTransformation;

    fn pipeline() -> ResponsePipeline {
        ResponsePipeline::new(Arc::new(TransformRegistry::new()))
    }

    #[test]
    fn test_decode_failure_yields_empty_text() {
        let pipeline = pipeline();
        assert_eq!(pipeline.decode(&[0x4f, 0x4e], "ASCII"), "ON");
        assert_eq!(pipeline.decode(&[0xff], "ASCII"), "");
        assert_eq!(pipeline.decode(b"ON", "KOI8-R"), "");
        assert_eq!(pipeline.decode(&[], "ASCII"), "");
    }

    #[test]
    fn test_pass_through_is_identity() {
        let pipeline = pipeline();
        let text = "STATUS 1; lvl=75\r\n";
        assert_eq!(pipeline.transform(None, text), text);
        assert_eq!(
            pipeline.transform(Some(&TransformSpec::new("REGEX", "(\\d+)")), text),
            text
        );
    }

    #[test]
    fn test_interpret_with_regex() {
        let pipeline = pipeline();
        pipeline.registry().register("REGEX", Arc::new(RegexTransformation));

        let spec = TransformSpec::new("REGEX", r"lvl=(\d+)");
        let state = pipeline
            .interpret(
                "Dimmer",
                &Command::Increase,
                b"STATUS 1; lvl=75\r\n",
                "ASCII",
                Some(&spec),
                &[StateKind::OnOff, StateKind::Percent],
            )
            .unwrap();
        assert_eq!(state, State::Percent(75));
    }

    #[test]
    fn test_interpret_reports_mapping_failure() {
        let err = pipeline()
            .interpret("Light1", &Command::On, b"garbage", "ASCII", None, &[StateKind::OnOff])
            .unwrap_err();

        match err {
            Error::StateMapping { item, command, text } => {
                assert_eq!(item, "Light1");
                assert_eq!(command, "ON");
                assert_eq!(text, "garbage");
            }
            other => panic!("Unexpected error {:?}", other),
        }
    }
}
