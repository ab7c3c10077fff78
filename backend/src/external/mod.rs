//! External API integrations

pub mod push;

pub use push::{PushError, PushGatewayClient, PushTransport};
