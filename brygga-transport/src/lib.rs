//! ## brygga-transport
//! Delivery of serialized protocol messages to and from the scope client.
//!
//! The inbound callback may fire on an arbitrary thread; consumers must only
//! enqueue work from it (the engine marshals every message through its event
//! loop). The shipped implementation is a single-client, newline-delimited
//! TCP server with a cooperative terminate flag.

pub mod tcp;

pub use tcp::TcpTransport;

/// Invoked once per inbound message, on the transport's own thread.
pub type MessageCallback = Box<dyn Fn(String) + Send>;

/// External channel carrying serialized protocol messages.
pub trait Transport: Send + Sync {
    /// Starts delivering inbound messages to `on_message`.
    ///
    /// Returns whether the transport came up.
    fn start(&self, on_message: MessageCallback) -> bool;

    /// Sends one serialized message to the connected client.
    ///
    /// Returns whether the message was handed to the client connection.
    fn send(&self, message: &str) -> bool;

    /// Stops the transport and releases the connection. Idempotent.
    fn stop(&self);
}
