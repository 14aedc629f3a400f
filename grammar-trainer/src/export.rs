//! Human-readable export of everything stored for one learner.

use chrono::{DateTime, Utc};
use grammar_utils::Catalog;
use serde::Serialize;

use crate::power::slot_index;
use crate::record::ProgressRecord;
use crate::tier::Tier;

pub const EXPORT_FORMAT: &str = "french-grammar-trainer-export-v1";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerExport {
    pub exported_at: DateTime<Utc>,
    pub user_id: String,
    pub format: &'static str,
    /// Enough to rebuild the stored record byte for byte.
    pub blob: ExportedBlob,
    pub decoded: DecodedProgress,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedBlob {
    pub version: u8,
    pub created_at: u32,
    pub last_active_at: u32,
    pub rule_slots: u16,
    pub powers: Vec<u16>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedProgress {
    pub global_tier: Option<&'static str>,
    pub sections: Vec<DecodedSection>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DecodedSection {
    pub id: String,
    pub title: String,
    pub tier: &'static str,
    pub rules: Vec<DecodedRule>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DecodedRule {
    pub id: String,
    pub title: String,
    pub tier: &'static str,
    /// Raw stored value, same as `blob.powers[slot]`.
    pub power: u16,
}

fn tier_label(power: f64, attempted: bool) -> Option<&'static str> {
    Tier::for_power(power, attempted).map(Tier::label)
}

/// Only attempted rules, and sections with at least one of them, are decoded.
pub fn build_export(
    user_id: &str,
    record: &ProgressRecord,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> LearnerExport {
    let powers = &record.powers;
    let global = powers.global_power();

    let sections = catalog
        .sections()
        .iter()
        .filter_map(|section| {
            let rules: Vec<DecodedRule> = section
                .rules
                .iter()
                .filter_map(|rule| {
                    let raw = slot_index(&rule.id).and_then(|slot| powers.raw(slot))?;
                    (raw != 0).then(|| DecodedRule {
                        id: rule.id.clone(),
                        title: rule.title.clone(),
                        tier: tier_label(powers.rule_power(&rule.id), true)
                            .unwrap_or(Tier::Beginner.label()),
                        power: raw,
                    })
                })
                .collect();
            if rules.is_empty() {
                return None;
            }
            let section_power = powers.section_power_for_id(&section.id);
            Some(DecodedSection {
                id: section.id.clone(),
                title: section.title.clone(),
                tier: tier_label(section_power, section_power > 0.0)
                    .unwrap_or(Tier::Beginner.label()),
                rules,
            })
        })
        .collect();

    LearnerExport {
        exported_at: now,
        user_id: user_id.to_string(),
        format: EXPORT_FORMAT,
        blob: ExportedBlob {
            version: record.header.version,
            created_at: record.header.created_at,
            last_active_at: record.header.last_active_at,
            rule_slots: record.header.rule_slots,
            powers: powers.as_slice().to_vec(),
        },
        decoded: DecodedProgress {
            global_tier: tier_label(global, global > 0.0),
            sections,
        },
    }
}

/// File name offered for an export made at `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("grammaire-francaise-export-{}.json", now.format("%Y-%m-%d"))
}
