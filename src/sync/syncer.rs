use log::{debug, info, warn};

use crate::{
    config::Pairing,
    error::SyncError,
    imap::Creation,
    progress::{ProgressStore, SyncProgress},
    repository::{SequenceSet, Uid, UidValidity},
    sync::{Connector, DestinationMailbox, SearchCriteria, SourceMailbox},
};

/// Outcome of one successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub uid_validity: UidValidity,
    /// Previously recorded uids were discarded, either because there were none
    /// or because the source mailbox was recreated.
    pub reset: bool,
    pub transferred: usize,
    pub last_uid: Option<Uid>,
}

/// Runs passes for one pairing.
pub struct Syncer<'a> {
    pairing: &'a Pairing,
    store: &'a ProgressStore,
}

impl<'a> Syncer<'a> {
    pub fn new(pairing: &'a Pairing, store: &'a ProgressStore) -> Self {
        Self { pairing, store }
    }

    /// Mirrors all mails that are new since the last pass. Progress is
    /// checkpointed after every chunk, so an aborted pass resumes with the
    /// first unfinished chunk.
    pub async fn sync<C: Connector>(&self, connector: &C) -> Result<SyncReport, SyncError> {
        let key = self.pairing.name();
        let stored = self.store.load(key);

        let mut source = connector
            .open_source(self.pairing.source(), self.pairing.mailbox())
            .await?;

        let uid_validity = source.uid_validity();
        let reset = stored.uid_validity() != Some(uid_validity);
        let last_uid = if reset {
            match stored.uid_validity() {
                Some(previous) => warn!(
                    "uid validity of {} changed from {previous} to {uid_validity}, mirroring everything again",
                    self.pairing.mailbox()
                ),
                None => info!("no progress recorded for {key}, mirroring everything"),
            }
            None
        } else {
            stored.last_uid()
        };

        let candidates = self.select_candidates(&mut source, last_uid).await?;
        if candidates.is_empty() {
            info!("{key}: nothing new since {}", display_uid(last_uid));
            self.checkpoint(last_uid, uid_validity)?;
            logout_source(&mut source).await;
            return Ok(SyncReport {
                uid_validity,
                reset,
                transferred: 0,
                last_uid,
            });
        }

        info!("{key}: mirroring {} mails", candidates.len());
        let mut destination = match connector
            .open_destination(self.pairing.destination())
            .await
        {
            Ok(destination) => destination,
            Err(error) => {
                logout_source(&mut source).await;
                return Err(error);
            }
        };
        let transferred = self
            .transfer(&mut source, &mut destination, &candidates, uid_validity)
            .await?;
        let last_uid = candidates.last().copied();
        self.checkpoint(last_uid, uid_validity)?;
        logout_source(&mut source).await;
        logout_destination(&mut destination).await;

        info!(
            "{key}: mirrored {transferred} mails up to uid {}",
            display_uid(last_uid)
        );
        Ok(SyncReport {
            uid_validity,
            reset,
            transferred,
            last_uid,
        })
    }

    /// Uids above `last_uid` that match the date filter, ascending. The search
    /// result is only a hint, both criteria are checked again here.
    async fn select_candidates(
        &self,
        source: &mut impl SourceMailbox,
        last_uid: Option<Uid>,
    ) -> Result<Vec<Uid>, SyncError> {
        let criteria = SearchCriteria::new(last_uid, self.pairing.since());
        let mut candidates: Vec<Uid> = source
            .search(&criteria)
            .await?
            .into_iter()
            .filter(|uid| last_uid.is_none_or(|last_uid| *uid > last_uid))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        debug!("{} candidates for {criteria}", candidates.len());

        let Some(since) = self.pairing.since() else {
            return Ok(candidates);
        };
        let mut received_since = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(self.pairing.chunk_size().get()) {
            let dates = source.fetch_internal_dates(&sequence_set(chunk)).await?;
            received_since.extend(
                chunk
                    .iter()
                    .filter(|uid| dates.get(*uid).is_some_and(|date| date.date() >= since)),
            );
        }
        debug!(
            "{} of {} candidates were received since {since}",
            received_since.len(),
            candidates.len()
        );

        Ok(received_since)
    }

    async fn transfer(
        &self,
        source: &mut impl SourceMailbox,
        destination: &mut impl DestinationMailbox,
        candidates: &[Uid],
        uid_validity: UidValidity,
    ) -> Result<usize, SyncError> {
        let container = self.pairing.container();
        let mut transferred = 0;
        let mut selected = false;

        for chunk in candidates.chunks(self.pairing.chunk_size().get()) {
            let mut mails = source.fetch(&sequence_set(chunk)).await?;

            if destination.ensure_container(container).await? == Creation::Created {
                info!("created {container}");
            }
            if !selected {
                destination.select_container(container).await?;
                selected = true;
            }

            for uid in chunk {
                let Some(mail) = mails.remove(uid) else {
                    warn!("mail {uid} vanished before it could be fetched, skipping it");
                    continue;
                };
                destination.append(container, &mail).await?;
                debug!("appended mail {uid} to {container}");
                transferred += 1;
            }

            let last_uid = chunk.last().copied();
            self.checkpoint(last_uid, uid_validity)?;
            info!(
                "{}: checkpoint at uid {}",
                self.pairing.name(),
                display_uid(last_uid)
            );
        }

        Ok(transferred)
    }

    fn checkpoint(&self, last_uid: Option<Uid>, uid_validity: UidValidity) -> Result<(), SyncError> {
        self.store.save(
            self.pairing.name(),
            &SyncProgress::new(last_uid, uid_validity),
        )?;

        Ok(())
    }
}

fn sequence_set(chunk: &[Uid]) -> SequenceSet {
    SequenceSet::try_from(chunk).expect("chunks should never be empty")
}

fn display_uid(uid: Option<Uid>) -> String {
    uid.map_or_else(|| "0".to_string(), |uid| uid.to_string())
}

async fn logout_source(source: &mut impl SourceMailbox) {
    if let Err(error) = source.logout().await {
        debug!("ignoring failed logout from source: {error}");
    }
}

async fn logout_destination(destination: &mut impl DestinationMailbox) {
    if let Err(error) = destination.logout().await {
        debug!("ignoring failed logout from destination: {error}");
    }
}
