use anyhow::{Context, Result, anyhow};
use grammar_trainer::record::{BLOB_SIZE, RECORD_VERSION, decode_record};
use grammar_trainer::{Tier, display_power, rule_id_for_slot};
use strongbox::{BlobStore, SqliteStore};

/// Dump the raw progress record stored for `learner`.
pub fn inspect_learner(store: &SqliteStore, learner: &str) -> Result<()> {
    let bytes = store
        .get(learner)?
        .ok_or_else(|| anyhow!("No progress recorded for {learner}"))?;

    println!("Progress record inspector");
    println!("========================");
    println!("Learner: {learner}");
    if let Some(updated_at) = store.updated_at(learner)? {
        let saved = chrono::DateTime::from_timestamp(updated_at, 0)
            .map_or_else(|| updated_at.to_string(), |t| t.to_rfc3339());
        println!("Saved: {saved}");
    }
    println!("Size: {} bytes (expected {BLOB_SIZE})", bytes.len());
    println!();

    let record =
        decode_record(&bytes).with_context(|| format!("{learner} has no valid progress record"))?;
    let header = record.header;

    println!("Header:");
    println!("-------");
    let version_note = if header.version == RECORD_VERSION {
        ""
    } else {
        " (unknown version)"
    };
    println!("  Version: {}{version_note}", header.version);
    let format_time = |time: Option<chrono::DateTime<chrono::Utc>>, raw: u32| {
        time.map_or_else(|| raw.to_string(), |t| t.to_rfc3339())
    };
    println!(
        "  Created: {}",
        format_time(header.created_at(), header.created_at)
    );
    println!(
        "  Last active: {}",
        format_time(header.last_active_at(), header.last_active_at)
    );
    println!("  Rule slots: {}", header.rule_slots);
    println!();

    let powers = &record.powers;
    println!("Rules:");
    println!("------");
    println!(
        "  Attempted: {}, mastered: {}, global power: {:.1}%",
        powers.attempted_count(),
        powers.mastered_count(),
        powers.global_power() * 100.0
    );
    for (slot, raw) in powers.as_slice().iter().enumerate() {
        if *raw == 0 {
            continue;
        }
        let rule_id = rule_id_for_slot(slot).unwrap_or_else(|| format!("slot {slot}"));
        let power = display_power(*raw);
        let tier = Tier::for_power(power, true).map_or("", |t| t.label());
        println!(
            "  {rule_id}  raw {raw:>5}  {:>5.1}%  {tier}",
            power * 100.0
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grammar_trainer::{Powers, record::encode_record_now};

    #[test]
    fn test_inspect_stored_record() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let powers = Powers::empty().with_answer("07-03", true);
        store.put("learner", &encode_record_now(&powers)).unwrap();
        inspect_learner(&store, "learner").unwrap();
    }

    #[test]
    fn test_inspect_rejects_short_record() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.put("short", &[1, 2, 3]).unwrap();
        assert!(inspect_learner(&store, "short").is_err());
        assert!(inspect_learner(&store, "missing").is_err());
    }
}
