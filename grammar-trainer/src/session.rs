//! A learner's live practice session.
//!
//! Answers update the local powers straight away so the next pick already sees them, and are
//! queued for the store. The queue is flushed as one batch; a failed flush puts the batch back at
//! the front so the order in which answers reach the store never changes.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use strongbox::BlobStore;

use crate::picker::MasteryView;
use crate::power::{Powers, slot_index};
use crate::progress::{AnswerItem, ProgressError, apply_answers};

/// How long answers may sit in the queue before a flush is due.
pub const FLUSH_INTERVAL_SECS: i64 = 30;

/// Where flushed batches go.
pub trait AnswerSink {
    type Error: std::error::Error;

    /// Deliver a batch. The whole batch is either accepted or rejected.
    fn submit(&mut self, answers: &[AnswerItem]) -> Result<(), Self::Error>;
}

/// Writes batches straight into a [`BlobStore`].
pub struct StoreSink<S> {
    store: S,
    key: String,
}

impl<S: BlobStore> StoreSink<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: BlobStore> AnswerSink for StoreSink<S> {
    type Error = ProgressError;

    fn submit(&mut self, answers: &[AnswerItem]) -> Result<(), Self::Error> {
        apply_answers(&mut self.store, &self.key, answers, Utc::now()).map(|_| ())
    }
}

#[derive(Debug)]
pub struct ProgressSession {
    powers: Powers,
    pending: VecDeque<AnswerItem>,
    last_flush: DateTime<Utc>,
}

impl ProgressSession {
    pub fn new(powers: Powers, now: DateTime<Utc>) -> Self {
        Self {
            powers,
            pending: VecDeque::new(),
            last_flush: now,
        }
    }

    pub fn powers(&self) -> &Powers {
        &self.powers
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &AnswerItem> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply an answer locally and queue it. Answers for unknown rules change nothing and are not
    /// queued.
    pub fn record_answer(&mut self, rule_id: &str, correct: bool) {
        if slot_index(rule_id).is_none() {
            log::debug!("Not queueing answer for unknown rule {rule_id:?}");
            return;
        }
        self.powers.record_answer(rule_id, correct);
        self.pending.push_back(AnswerItem::new(rule_id, correct));
    }

    /// Whether answers are waiting and the last flush is at least [`FLUSH_INTERVAL_SECS`] old.
    pub fn flush_due(&self, now: DateTime<Utc>) -> bool {
        !self.pending.is_empty()
            && now.signed_duration_since(self.last_flush) >= TimeDelta::seconds(FLUSH_INTERVAL_SECS)
    }

    /// Hand every queued answer to `sink` as one batch, returning how many were sent.
    ///
    /// On failure the batch goes back in front of anything queued since, and the error is
    /// returned.
    pub fn flush<K: AnswerSink + ?Sized>(
        &mut self,
        sink: &mut K,
        now: DateTime<Utc>,
    ) -> Result<usize, K::Error> {
        if self.pending.is_empty() {
            self.last_flush = now;
            return Ok(0);
        }

        let batch: Vec<AnswerItem> = self.pending.drain(..).collect();
        match sink.submit(&batch) {
            Ok(()) => {
                self.last_flush = now;
                Ok(batch.len())
            }
            Err(e) => {
                log::warn!("Flushing {} answers failed, re-queueing: {e}", batch.len());
                for item in batch.into_iter().rev() {
                    self.pending.push_front(item);
                }
                Err(e)
            }
        }
    }

    /// Drop queued answers without sending them, e.g. when the learner logs out.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

impl MasteryView for ProgressSession {
    fn rule_power(&self, rule_id: &str) -> f64 {
        self.powers.rule_power(rule_id)
    }

    fn section_power(&self, section_id: &str) -> f64 {
        self.powers.section_power_for_id(section_id)
    }
}
