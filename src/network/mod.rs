//! Network transport module
//!
//! This module owns the UDP sockets, writes outgoing datagrams and waits for
//! replies when a send is blocking.
//!
//! The protocol carries no sequence numbers. A reply is simply the next
//! datagram that arrives on the channel, so blocking sends on one channel run
//! one at a time.

mod channel;

pub use self::channel::{Datagram, UdpChannel};
