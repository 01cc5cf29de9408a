mod criteria;
#[cfg(test)]
mod fake;
mod mailbox;
mod syncer;

pub use criteria::SearchCriteria;
pub use mailbox::{Connector, DestinationMailbox, RemoteMail, SourceMailbox};
pub use syncer::Syncer;
