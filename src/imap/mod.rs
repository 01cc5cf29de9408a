mod client;
mod codec;
mod connection;
mod connector;
mod error;
mod internal_date;
mod mailbox;
mod tag_generator;

pub use client::Client;
pub use client::Session;
pub use connector::ImapConnector;
pub use error::ImapError;
pub use mailbox::Creation;
