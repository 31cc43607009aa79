use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::Level;
use udp_gateway::binding::{ChannelPublisher, ItemBindings, ANY_COMMAND};
use udp_gateway::command::RuleTable;
use udp_gateway::network::UdpChannel;
use udp_gateway::response::{StateKind, TransformRegistry};
use udp_gateway::{Command, UdpBinding};

#[tokio::main]
async fn main() -> udp_gateway::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    // Simulated device answering every datagram with its level
    let device = UdpSocket::bind("127.0.0.1:0").await?;
    let device_addr = device.local_addr()?;
    tokio::spawn(async move {
        let mut buf = [0u8; 256];
        while let Ok((n, from)) = device.recv_from(&mut buf).await {
            println!("device <- {:02x?}", &buf[..n]);
            let _ = device.send_to(b"LEVEL=75\r\n", from).await;
        }
    });

    let bindings = Arc::new(ItemBindings::new());
    bindings.bind("Amplifier", ANY_COMMAND, r"REGEX(LEVEL=(\d+))")?;
    bindings.accept("Amplifier", [StateKind::Percent, StateKind::String]);

    let (publisher, mut updates) = ChannelPublisher::new();
    let binding = UdpBinding::new(
        RuleTable::reference()?,
        Arc::new(TransformRegistry::with_builtin(".")),
        bindings,
        Arc::new(publisher),
    );

    let options: HashMap<String, String> = [
        ("retryinterval", "true"),
        ("buffersize", "500"),
        ("preamble", ">"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    binding.updated(&options);

    let local: SocketAddr = "127.0.0.1:0".parse().map_err(|e| {
        udp_gateway::Error::config(format!("Invalid local address: {}", e))
    })?;
    let (channel, _inbound) = UdpChannel::open(local, device_addr).await?;

    for (item, command) in [
        ("UDPswitch", Command::On),
        ("DimmerTest", Command::Increase),
        ("AudioSwitch", Command::Decimal(3.0)),
        ("Amplifier", Command::Text("GETLEVEL".into())),
    ] {
        let outcome = binding.dispatch(item, &command, &channel).await;
        println!("{} {} -> {:?}", item, command, outcome);
    }

    while let Ok(update) = updates.try_recv() {
        println!("update: {} = {}", update.item, update.state);
    }

    Ok(())
}
