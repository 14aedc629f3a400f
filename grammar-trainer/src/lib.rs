//! Mastery tracking and adaptive question selection for the grammar curriculum.
//!
//! Every rule of the curriculum owns one 16-bit "power" slot that is nudged towards full mastery
//! on a correct answer and towards zero on a wrong one. The picker turns those powers into
//! sampling weights and assembles practice sets that mix weak rules, their neighbours, a bit of
//! encouragement and a few questions from elsewhere in the curriculum.

pub mod export;
pub mod picker;
pub mod power;
pub mod progress;
pub mod record;
pub mod score;
pub mod session;
pub mod simulation;
pub mod tier;
pub mod weight;

pub use picker::{MasteryView, pick_learn_questions, pick_section_quiz};
pub use power::{Powers, display_power, rule_id_for_slot, slot_index};
pub use progress::{AnswerBatch, AnswerItem, ProgressError};
pub use record::{ProgressRecord, RecordError, RecordHeader, decode_record, encode_record};
pub use score::{QuizScore, Verdict};
pub use session::{AnswerSink, ProgressSession, StoreSink};
pub use simulation::{LearnerSimulation, RoundReport};
pub use tier::Tier;
pub use weight::rule_weight;
