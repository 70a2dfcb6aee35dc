pub mod webhook_server;

pub use webhook_server::{WebhookServer, WebhookServerTrait};
