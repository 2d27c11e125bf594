//! Upserts fetched partners into a [`ContactRepository`] keyed by external id.
//!
//! Records are independent: a mapping or store failure is counted and logged,
//! and the loop moves on. There is no enclosing transaction.

use crate::api::models::RawRecord;
use crate::contact::{ContactAttributes, SyncSummary};
use crate::error::StoreError;
use crate::mapper;
use crate::storage::ContactRepository;
use chrono::{DateTime, Utc};
use log::{debug, warn};

enum Upserted {
    Created,
    Updated,
}

pub struct Reconciler<'s, R: ContactRepository + ?Sized> {
    store: &'s mut R,
    clock: Box<dyn Fn() -> DateTime<Utc> + 's>,
}

impl<'s, R: ContactRepository + ?Sized> Reconciler<'s, R> {
    pub fn new(store: &'s mut R) -> Self {
        Self::with_clock(store, Utc::now)
    }

    pub fn with_clock(store: &'s mut R, clock: impl Fn() -> DateTime<Utc> + 's) -> Self {
        Self { store, clock: Box::new(clock) }
    }

    pub fn sync(&mut self, records: &[RawRecord]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for raw in records {
            let attrs = match mapper::map(raw) {
                Ok(attrs) => attrs,
                Err(err) => {
                    warn!("event=contact_map module=reconcile status=error error={err}");
                    summary.failed += 1;
                    continue;
                }
            };
            let external_id = attrs.external_id.clone();
            match self.upsert(attrs) {
                Ok(Upserted::Created) => summary.created += 1,
                Ok(Upserted::Updated) => summary.updated += 1,
                Err(err) => {
                    warn!(
                        "event=contact_upsert module=reconcile status=error external_id={external_id} error={err}"
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    fn upsert(&mut self, attrs: ContactAttributes) -> Result<Upserted, StoreError> {
        let now = (self.clock)();
        match self.store.find_by_external_id(&attrs.external_id)? {
            None => {
                let contact = self.store.create(attrs, now)?;
                debug!("event=contact_create module=reconcile status=ok external_id={} id={}", contact.external_id, contact.id);
                Ok(Upserted::Created)
            }
            Some(mut contact) => {
                contact.apply(attrs, now);
                self.store.update(&contact)?;
                debug!("event=contact_update module=reconcile status=ok external_id={} id={}", contact.external_id, contact.id);
                Ok(Upserted::Updated)
            }
        }
    }
}
