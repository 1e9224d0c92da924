// Courier Infrastructure - HTTP Adapter
// Implements: CallbackSender (one POST per delivery attempt)

mod sender;

pub use sender::{ClientConfig, HttpCallbackSender};
