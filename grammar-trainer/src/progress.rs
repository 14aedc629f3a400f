//! Applying answer batches to a learner's stored record.

use chrono::{DateTime, Utc};
use strongbox::{BlobStore, StoreError};

use crate::power::Powers;
use crate::record::{RecordError, decode_record, encode_record};

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Progress store failed")]
    Store(#[from] StoreError),

    #[error("Stored progress record is unreadable")]
    Record(#[from] RecordError),
}

/// One answered question, as submitted by a client.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub rule_id: String,
    pub correct: bool,
}

impl AnswerItem {
    pub fn new(rule_id: impl Into<String>, correct: bool) -> Self {
        Self {
            rule_id: rule_id.into(),
            correct,
        }
    }
}

/// Request body of a batch submission: `{"answers": [{"ruleId": "01-01", "correct": true}]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnswerBatch {
    pub answers: Vec<AnswerItem>,
}

/// The learner's powers, or `None` if nothing was ever stored for `key`.
pub fn load_powers<S: BlobStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<Powers>, ProgressError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    Ok(Some(decode_record(&bytes)?.powers))
}

/// Apply `answers` in submission order to the stored record (or to an empty one) and write it back.
///
/// Returns the updated powers.
pub fn apply_answers<S: BlobStore + ?Sized>(
    store: &mut S,
    key: &str,
    answers: &[AnswerItem],
    now: DateTime<Utc>,
) -> Result<Powers, ProgressError> {
    let mut powers = load_powers(store, key)?.unwrap_or_default();
    powers.record_answers(answers.iter().map(|a| (a.rule_id.as_str(), a.correct)));
    store.put(key, &encode_record(&powers, now))?;
    log::debug!("Applied {} answers for learner {key}", answers.len());
    Ok(powers)
}

/// Delete everything stored for `key`.
pub fn forget_learner<S: BlobStore + ?Sized>(store: &mut S, key: &str) -> Result<(), ProgressError> {
    store.delete(key)?;
    log::info!("Deleted progress of learner {key}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode_header;
    use strongbox::MemoryStore;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_unknown_learner() {
        let store = MemoryStore::new();
        assert!(load_powers(&store, "nobody").unwrap().is_none());
    }

    #[test]
    fn test_apply_then_load() {
        let mut store = MemoryStore::new();
        let answers = vec![
            AnswerItem::new("01-01", true),
            AnswerItem::new("01-01", false),
            AnswerItem::new("not-a-rule", true),
        ];
        let powers = apply_answers(&mut store, "abc", &answers, at(100)).unwrap();

        let mut expected = Powers::empty();
        expected.record_answer("01-01", true);
        expected.record_answer("01-01", false);
        assert_eq!(powers, expected);
        assert_eq!(load_powers(&store, "abc").unwrap(), Some(expected));

        let bytes = store.get("abc").unwrap().unwrap();
        assert_eq!(decode_header(&bytes).unwrap().last_active_at, 100);
    }

    #[test]
    fn test_batches_accumulate() {
        let mut store = MemoryStore::new();
        apply_answers(&mut store, "abc", &[AnswerItem::new("02-02", true)], at(1)).unwrap();
        let powers =
            apply_answers(&mut store, "abc", &[AnswerItem::new("02-02", true)], at(2)).unwrap();
        assert_eq!(powers.raw_for_rule("02-02"), 4095 - (4095 >> 4) + 4095);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let mut store = MemoryStore::new();
        store.put("abc", &[1, 2, 3]).unwrap();
        let err = apply_answers(&mut store, "abc", &[], at(0)).unwrap_err();
        assert!(matches!(err, ProgressError::Record(_)));
    }

    #[test]
    fn test_forget() {
        let mut store = MemoryStore::new();
        apply_answers(&mut store, "abc", &[AnswerItem::new("01-01", true)], at(0)).unwrap();
        forget_learner(&mut store, "abc").unwrap();
        assert!(store.is_empty());
        forget_learner(&mut store, "abc").unwrap();
    }

    #[test]
    fn test_batch_json_shape() {
        let batch: AnswerBatch =
            serde_json::from_str(r#"{"answers": [{"ruleId": "03-04", "correct": false}]}"#)
                .unwrap();
        assert_eq!(batch.answers, vec![AnswerItem::new("03-04", false)]);
    }
}
