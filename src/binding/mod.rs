//! Event bus binding
//!
//! [`UdpBinding`] takes item commands from the event bus, resolves them to
//! frames or text, sends them over a [`UdpChannel`] and turns replies into
//! state updates. Faults are logged and contained per command: the caller
//! only learns whether it still owes the item an update.

mod provider;
mod publisher;

pub use self::provider::{BindingProvider, ItemBindings, ANY_COMMAND};
pub use self::publisher::{ChannelPublisher, EventPublisher, StateUpdate};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::command::{CommandResolver, RuleTable};
use crate::core::{Command, ConfigHandle, GatewayConfig, State};
use crate::network::{Datagram, UdpChannel};
use crate::protocol::DatagramCodec;
use crate::response::{ResponsePipeline, TransformRegistry};

/// Where a handled command ended up
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// No rule and no protocol command, or the payload could not be encoded
    Unresolved,
    /// The write failed
    SendFailed,
    /// Written without waiting for a reply
    Sent,
    /// No reply before the deadline
    TimedOut,
    /// A reply arrived but replies do not update state
    ReplyIgnored,
    /// The reply was published as the item's state
    StatePublished(State),
    /// A reply arrived but no accepted kind could parse it
    StateMappingFailed,
}

impl CommandOutcome {
    /// Whether the platform should still refresh the item itself
    pub fn owes_update(&self) -> bool {
        !matches!(
            self,
            CommandOutcome::StatePublished(_) | CommandOutcome::StateMappingFailed
        )
    }
}

/// Gateway between the event bus and UDP devices
pub struct UdpBinding {
    config: ConfigHandle,
    resolver: CommandResolver,
    pipeline: ResponsePipeline,
    provider: Arc<dyn BindingProvider>,
    publisher: Arc<dyn EventPublisher>,
}

impl UdpBinding {
    /// Creates a binding with default configuration
    pub fn new(
        rules: RuleTable,
        registry: Arc<TransformRegistry>,
        provider: Arc<dyn BindingProvider>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        UdpBinding {
            config: ConfigHandle::default(),
            resolver: CommandResolver::new(rules),
            pipeline: ResponsePipeline::new(registry),
            provider,
            publisher,
        }
    }

    /// Handle to the live configuration
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    /// Applies a configuration update event
    pub fn updated(&self, options: &HashMap<String, String>) -> Arc<GatewayConfig> {
        let config = self.config.apply(options);
        debug!("Configuration updated: {:?}", config);
        config
    }

    /// Handles a command; returns whether the item still owes a state update
    pub async fn handle(&self, item: &str, command: &Command, channel: &UdpChannel) -> bool {
        self.dispatch(item, command, channel).await.owes_update()
    }

    /// Handles a command and reports where it ended up
    pub async fn dispatch(
        &self,
        item: &str,
        command: &Command,
        channel: &UdpChannel,
    ) -> CommandOutcome {
        let config = self.config.snapshot();
        let text = command.as_text();

        let payload = self.resolver.resolve(item, command, &config, || {
            self.provider
                .protocol_command(item, command)
                .map(|spec| self.pipeline.transform(Some(&spec), &text))
        });
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Can not resolve command {} for item {}: {}", text, item, e);
                return CommandOutcome::Unresolved;
            }
        };

        let kind = payload.kind();
        let datagram = match DatagramCodec::for_charset(&config.charset)
            .and_then(|mut codec| codec.to_datagram(payload))
        {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!("Exception while attempting an unsupported encoding scheme: {}", e);
                return CommandOutcome::Unresolved;
            }
        };
        debug!(
            "Sending {} byte {} for command {} on item {} to {}",
            datagram.len(),
            kind,
            text,
            item,
            channel.remote_addr()
        );

        let reply = match channel.send(datagram, config.blocking, config.timeout).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return CommandOutcome::Sent,
            Err(e) if e.is_timeout() => {
                warn!("No reply for command {} on item {}: {}", text, item, e);
                return CommandOutcome::TimedOut;
            }
            Err(e) => {
                error!("An exception occurred while writing a buffer to a channel: {}", e);
                return CommandOutcome::SendFailed;
            }
        };

        let response = self.pipeline.decode(&reply, &config.charset);
        info!(
            "Received {:?} from the remote end {}",
            response,
            channel.remote_addr()
        );

        if !config.update_with_response {
            return CommandOutcome::ReplyIgnored;
        }

        let spec = self.provider.protocol_command(item, command);
        let transformed = self.pipeline.transform(spec.as_ref(), &response);
        let kinds = self.provider.accepted_kinds(item, command);

        match self.pipeline.map(item, command, &kinds, &transformed) {
            Ok(state) => {
                self.publisher.post_update(item, state.clone());
                CommandOutcome::StatePublished(state)
            }
            Err(e) => {
                warn!("{}", e);
                CommandOutcome::StateMappingFailed
            }
        }
    }

    /// Interprets a datagram the device sent on its own
    pub fn parse_buffer(&self, item: &str, command: &Command, datagram: &[u8]) -> Option<State> {
        let config = self.config.snapshot();
        let spec = self.provider.protocol_command(item, command);
        let kinds = self.provider.accepted_kinds(item, command);

        match self
            .pipeline
            .interpret(item, command, datagram, &config.charset, spec.as_ref(), &kinds)
        {
            Ok(state) => {
                self.publisher.post_update(item, state.clone());
                Some(state)
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Feeds unsolicited datagrams for one item until the channel closes
    pub async fn serve_inbound(
        &self,
        item: &str,
        command: &Command,
        mut inbound: mpsc::Receiver<Datagram>,
    ) {
        while let Some(datagram) = inbound.recv().await {
            debug!("Unsolicited datagram from {} for item {}", datagram.peer, item);
            self.parse_buffer(item, command, &datagram.data);
        }
        debug!("Inbound queue for item {} closed", item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandRule, RuleEncoding};
    use crate::protocol::{crc16, FrameSpec, FRAME_LEN};
    use crate::response::{RegexTransformation, StateKind};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        binding: UdpBinding,
        bindings: Arc<ItemBindings>,
        updates: UnboundedReceiver<StateUpdate>,
        channel: UdpChannel,
        inbound: mpsc::Receiver<Datagram>,
        device: UdpSocket,
    }

    async fn fixture(rules: RuleTable) -> Fixture {
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let local: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (channel, inbound) = UdpChannel::open(local, device.local_addr().unwrap())
            .await
            .unwrap();

        let registry = Arc::new(TransformRegistry::new());
        registry.register("REGEX", Arc::new(RegexTransformation));
        let bindings = Arc::new(ItemBindings::new());
        let (publisher, updates) = ChannelPublisher::new();

        let binding = UdpBinding::new(rules, registry, bindings.clone(), Arc::new(publisher));
        Fixture {
            binding,
            bindings,
            updates,
            channel,
            inbound,
            device,
        }
    }

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Answers the next datagram with `reply` and returns what was received
    fn respond(device: UdpSocket, reply: &'static [u8]) -> tokio::task::JoinHandle<Vec<u8>> {
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (n, from) = device.recv_from(&mut buf).await.unwrap();
            device.send_to(reply, from).await.unwrap();
            buf[..n].to_vec()
        })
    }

    #[tokio::test]
    async fn test_light1_on_sends_reference_frame() {
        let rules = RuleTable::new().with(
            CommandRule::new(
                "Light1",
                "ON",
                RuleEncoding::Frame(FrameSpec::new(1, 2, 0x0031, [21, 100, 0, 0])),
            )
            .unwrap(),
        );
        let mut fx = fixture(rules).await;

        assert!(fx.binding.handle("Light1", &Command::On, &fx.channel).await);

        let mut buf = [0u8; 64];
        let (n, _) = fx.device.recv_from(&mut buf).await.unwrap();
        assert_eq!(n, FRAME_LEN);
        let crc = crc16(&buf[16..29]);
        assert_eq!(crc, 0xaf13);
        assert_eq!(&buf[29..31], &crc.to_be_bytes());
        assert!(fx.updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blocking_reply_publishes_state() {
        let fx = fixture(RuleTable::new()).await;
        let Fixture {
            binding,
            bindings,
            mut updates,
            channel,
            device,
            ..
        } = fx;
        binding.updated(&options(&[("retryinterval", "true"), ("buffersize", "2000")]));
        bindings.bind("Temp", ANY_COMMAND, r"REGEX(T=(\d+))").unwrap();
        bindings.accept("Temp", [StateKind::OnOff, StateKind::Decimal]);

        let device = respond(device, b"T=21\r\n");
        let command = Command::Text("READ".into());
        let outcome = binding.dispatch("Temp", &command, &channel).await;

        assert_eq!(outcome, CommandOutcome::StatePublished(State::Decimal(21.0)));
        assert!(!outcome.owes_update());
        assert_eq!(device.await.unwrap(), b"READ\r\n");
        assert_eq!(
            updates.try_recv().unwrap(),
            StateUpdate {
                item: "Temp".into(),
                state: State::Decimal(21.0)
            }
        );
    }

    #[tokio::test]
    async fn test_blocking_timeout_publishes_nothing() {
        let mut fx = fixture(RuleTable::new()).await;
        fx.binding
            .updated(&options(&[("retryinterval", "true"), ("buffersize", "100")]));
        fx.bindings.bind("Temp", ANY_COMMAND, "REGEX(.*)").unwrap();

        let outcome = fx.binding.dispatch("Temp", &Command::On, &fx.channel).await;

        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert!(outcome.owes_update());
        assert!(fx.updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reply_ignored_without_update_with_response() {
        let fx = fixture(RuleTable::new()).await;
        fx.binding.updated(&options(&[
            ("retryinterval", "true"),
            ("updatewithresponse", "false"),
        ]));
        fx.bindings.bind("Temp", ANY_COMMAND, "REGEX(.*)").unwrap();
        fx.bindings.accept("Temp", [StateKind::String]);

        let _device = respond(fx.device, b"OK");
        let outcome = fx.binding.dispatch("Temp", &Command::On, &fx.channel).await;
        assert_eq!(outcome, CommandOutcome::ReplyIgnored);
        assert!(outcome.owes_update());
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_not_published() {
        let fx = fixture(RuleTable::new()).await;
        let Fixture {
            binding,
            bindings,
            mut updates,
            channel,
            device,
            ..
        } = fx;
        binding.updated(&options(&[("retryinterval", "true")]));
        bindings.bind("Light1", ANY_COMMAND, "NONE(x)").unwrap();
        bindings.accept("Light1", [StateKind::OnOff]);

        let _device = respond(device, b"garbage");
        let outcome = binding.dispatch("Light1", &Command::On, &channel).await;

        assert_eq!(outcome, CommandOutcome::StateMappingFailed);
        assert!(!outcome.owes_update());
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_item_without_protocol_command_sends_nothing() {
        let fx = fixture(RuleTable::new()).await;
        let outcome = fx.binding.dispatch("Unknown", &Command::On, &fx.channel).await;
        assert_eq!(outcome, CommandOutcome::Unresolved);

        let mut buf = [0u8; 16];
        let received =
            tokio::time::timeout(Duration::from_millis(100), fx.device.recv_from(&mut buf)).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_charset_sends_nothing() {
        let fx = fixture(RuleTable::new()).await;
        fx.binding.updated(&options(&[("charset", "EBCDIC")]));
        fx.bindings.bind("Amp", ANY_COMMAND, "REGEX(.*)").unwrap();

        let outcome = fx.binding.dispatch("Amp", &Command::On, &fx.channel).await;
        assert_eq!(outcome, CommandOutcome::Unresolved);
    }

    #[tokio::test]
    async fn test_unsolicited_datagram_updates_item() {
        let fx = fixture(RuleTable::new()).await;
        let Fixture {
            binding,
            bindings,
            mut updates,
            channel,
            inbound,
            device,
        } = fx;
        bindings.accept("Door", [StateKind::OpenClosed]);

        device
            .send_to(b"OPEN", channel.local_addr().unwrap())
            .await
            .unwrap();

        let status = Command::Text("STATUS".into());
        let serve = binding.serve_inbound("Door", &status, inbound);
        let update = tokio::time::timeout(Duration::from_secs(2), async {
            tokio::select! {
                _ = serve => None,
                update = updates.recv() => update,
            }
        })
        .await
        .unwrap();

        assert_eq!(
            update,
            Some(StateUpdate {
                item: "Door".into(),
                state: State::Open
            })
        );
    }

    #[tokio::test]
    async fn test_reference_dimmer_over_the_wire() {
        let fx = fixture(RuleTable::reference().unwrap()).await;

        for _ in 0..5 {
            assert!(fx.binding.handle("DimmerTest", &Command::Increase, &fx.channel).await);
        }

        let mut levels = Vec::new();
        let mut buf = [0u8; 64];
        for _ in 0..5 {
            let (n, _) = fx.device.recv_from(&mut buf).await.unwrap();
            let spec = FrameSpec::decode(&buf[..n]).unwrap();
            levels.push(spec.payload[1]);
        }
        assert_eq!(levels, vec![25, 50, 75, 100, 100]);
    }
}
