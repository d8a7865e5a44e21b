pub mod dispatcher;
pub mod format;
pub mod registry;
pub mod sender;

pub use dispatcher::Dispatcher;
pub use registry::{RecipientId, RecipientRegistry};
pub use sender::{LogSender, MessageSender, TelegramSender};
