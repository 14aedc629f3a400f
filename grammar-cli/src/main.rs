mod config;
mod inspect;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use grammar_trainer::export::{build_export, export_file_name};
use grammar_trainer::progress::{apply_answers, forget_learner, load_powers};
use grammar_trainer::{
    AnswerBatch, AnswerItem, LearnerSimulation, Powers, Tier, decode_record,
    pick_learn_questions, pick_section_quiz,
};
use grammar_utils::autograde::grade_input;
use grammar_utils::text_cleanup::split_phrase;
use grammar_utils::validation::validate_catalog;
use grammar_utils::{Catalog, Question, Section};
use rand::Rng;
use strongbox::{BlobStore, SqliteStore};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "French grammar trainer", long_about = None)]
struct Cli {
    /// Directory of section files (overrides GRAMMAR_CONTENT_DIR)
    #[arg(long, global = true)]
    content_dir: Option<PathBuf>,

    /// Directory of the progress database (overrides GRAMMAR_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick an adaptive learn set for a learner
    Learn {
        learner: String,
        /// Quiz a single section instead of the adaptive mix
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Print the questions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record answers, given as RULE:ok or RULE:ko (e.g. 01-03:ok)
    Answer {
        learner: String,
        answers: Vec<String>,
        /// JSON file holding {"answers": [{"ruleId": ..., "correct": ...}]}
        #[arg(long)]
        batch: Option<PathBuf>,
    },
    /// Grade a response to one question
    Grade {
        question_id: String,
        /// Typed answer, or the 1-based choice number for a multiple-choice question
        response: String,
        /// Also record the result for this learner
        #[arg(long)]
        learner: Option<String>,
    },
    /// Show a learner's mastery per section
    Stats { learner: String },
    /// Dump a learner's raw progress record
    Inspect { learner: String },
    /// List every learner with stored progress
    Learners,
    /// Check the content for authoring mistakes
    Validate,
    /// Print the JSON schema of a section file
    Schema,
    /// Simulate a learner working through learn sets
    Simulate {
        #[arg(short, long, default_value_t = 10)]
        rounds: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = LearnerSimulation::DEFAULT_INITIAL_SKILL)]
        initial_skill: f64,
        #[arg(long, default_value_t = LearnerSimulation::DEFAULT_LEARNING_RATE)]
        learning_rate: f64,
        /// Start from this learner's stored progress (the store is left untouched)
        #[arg(long)]
        learner: Option<String>,
        /// Print one JSON report per line
        #[arg(long)]
        json: bool,
    },
    /// Export a learner's stored progress as JSON
    Export {
        learner: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete everything stored for a learner
    Forget { learner: String },
}

fn parse_answer(raw: &str) -> Result<AnswerItem> {
    let (rule_id, outcome) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected RULE:ok or RULE:ko, got {raw:?}"))?;
    let correct = match outcome.to_ascii_lowercase().as_str() {
        "ok" | "1" | "true" => true,
        "ko" | "0" | "false" => false,
        other => bail!("Unknown outcome {other:?} in {raw:?}"),
    };
    Ok(AnswerItem::new(rule_id.trim(), correct))
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    Catalog::load_dir(&config.content_dir).with_context(|| {
        format!(
            "Failed to load content from {}",
            config.content_dir.display()
        )
    })
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = config.database_path();
    SqliteStore::open(&path).with_context(|| format!("Failed to open {}", path.display()))
}

fn print_question(number: usize, question: &Question) {
    println!("{number:>2}. [{}] {}", question.id(), question.prompt());
    match question {
        Question::Mcq(mcq) => {
            for (i, choice) in mcq.choices.iter().enumerate() {
                println!("      {}) {}", i + 1, choice.text);
            }
        }
        Question::Input(input) => {
            let (before, after) = split_phrase(&input.phrase);
            println!("      {before}[ ... ]{after}");
        }
    }
}

fn learn(
    config: &Config,
    learner: &str,
    section: Option<&str>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let store = open_store(config)?;
    let powers = load_powers(&store, learner)?.unwrap_or_default();

    let seed = seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    log::info!("Picking questions with seed {seed}");
    let mut rng = weighted_sampler::seeded_rng(seed);

    let questions = match section {
        Some(section_id) => {
            let section = catalog
                .section(section_id)
                .ok_or_else(|| anyhow!("No section {section_id:?}"))?;
            pick_section_quiz(section, &mut rng)
        }
        None => pick_learn_questions(&catalog, &powers, &mut rng),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&questions)?);
        return Ok(());
    }
    if questions.is_empty() {
        println!("No questions available in {}", config.content_dir.display());
    }
    for (i, question) in questions.iter().enumerate() {
        print_question(i + 1, question);
    }
    Ok(())
}

fn answer(config: &Config, learner: &str, raw: &[String], batch: Option<&PathBuf>) -> Result<()> {
    let mut answers = Vec::new();
    if let Some(path) = batch {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let batch: AnswerBatch = serde_json::from_str(&content)
            .with_context(|| format!("Invalid answer batch in {}", path.display()))?;
        answers.extend(batch.answers);
    }
    for item in raw {
        answers.push(parse_answer(item)?);
    }
    if answers.is_empty() {
        bail!("No answers given");
    }

    let mut store = open_store(config)?;
    let powers = apply_answers(&mut store, learner, &answers, chrono::Utc::now())?;
    println!(
        "Recorded {} answers, global power now {:.1}%",
        answers.len(),
        powers.global_power() * 100.0
    );
    Ok(())
}

fn grade(config: &Config, question_id: &str, response: &str, learner: Option<&str>) -> Result<()> {
    let catalog = load_catalog(config)?;
    let (_, question) = catalog
        .find_question(question_id)
        .ok_or_else(|| anyhow!("No question {question_id:?}"))?;

    let correct = match question {
        Question::Input(input) => {
            let grade = grade_input(response, input);
            println!("Grade: {}", grade.kind);
            if let Some(matched) = &grade.matched_answer {
                println!("Closest: {matched}");
            }
            if let Some(explanation) = &grade.wrong_explanation {
                println!("Why not: {explanation}");
            }
            if !grade.is_correct {
                println!("Answer: {}", input.answer);
            }
            println!("{}", input.explanation);
            grade.is_correct
        }
        Question::Mcq(mcq) => {
            let index: usize = response
                .trim()
                .parse()
                .with_context(|| format!("Expected a choice number, got {response:?}"))?;
            let chosen = index
                .checked_sub(1)
                .and_then(|i| mcq.choices.get(i))
                .ok_or_else(|| anyhow!("Choice {index} does not exist"))?;
            println!("{}", chosen.explanation);
            question.is_correct_choice(index - 1)
        }
    };
    println!("{}", if correct { "Correct" } else { "Incorrect" });

    if let Some(learner) = learner {
        let mut store = open_store(config)?;
        let item = AnswerItem::new(question.rule_id(), correct);
        apply_answers(&mut store, learner, &[item], chrono::Utc::now())?;
    }
    Ok(())
}

fn tier_label(power: f64) -> &'static str {
    Tier::for_power(power, power > 0.0).map_or("-", |t| t.label())
}

fn stats(config: &Config, learner: &str) -> Result<()> {
    let store = open_store(config)?;
    let Some(powers) = load_powers(&store, learner)? else {
        println!("No progress recorded for {learner}");
        return Ok(());
    };

    let global = powers.global_power();
    println!("Learner: {learner}");
    println!(
        "Global: {:.1}% {} ({} rules attempted, {} mastered)",
        global * 100.0,
        tier_label(global),
        powers.attempted_count(),
        powers.mastered_count()
    );
    println!();

    // Titles are a nicety, stats work without content
    let sections: Vec<Section> = match Catalog::load_dir(&config.content_dir) {
        Ok(catalog) => catalog.sections().to_vec(),
        Err(e) => {
            log::warn!("Showing sections without titles: {e}");
            Vec::new()
        }
    };
    print_sections(&powers, &sections);
    Ok(())
}

fn print_sections(powers: &Powers, sections: &[Section]) {
    for number in 1..=grammar_utils::SECTION_COUNT {
        let power = powers.section_power(number);
        if power == 0.0 {
            continue;
        }
        let title = sections
            .iter()
            .find(|s| s.number().map(usize::from) == Some(number))
            .map_or("", |s| s.title.as_str());
        println!(
            "  {number:02} {title:<40} {:>5.1}% {}",
            power * 100.0,
            tier_label(power)
        );
    }
}

fn validate(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    let report = validate_catalog(&catalog);
    for issue in &report.issues {
        println!("{issue}");
    }
    println!(
        "{} sections, {} questions: {} errors, {} warnings",
        catalog.sections().len(),
        catalog.question_count(),
        report.errors(),
        report.warnings()
    );
    if !report.is_clean() {
        bail!("Content has {} errors", report.errors());
    }
    Ok(())
}

struct SimulationOptions {
    rounds: usize,
    seed: u64,
    initial_skill: f64,
    learning_rate: f64,
    learner: Option<String>,
    json: bool,
}

fn simulate(config: &Config, options: &SimulationOptions) -> Result<Powers> {
    let catalog = load_catalog(config)?;
    let starting_powers = match &options.learner {
        Some(learner) => {
            let store = open_store(config)?;
            load_powers(&store, learner)?
                .ok_or_else(|| anyhow!("No progress recorded for {learner}"))?
        }
        None => Powers::empty(),
    };

    let mut simulation = LearnerSimulation::new(&catalog, options.seed)
        .with_initial_skill(options.initial_skill)
        .with_learning_rate(options.learning_rate)
        .with_powers(starting_powers);
    for report in simulation.by_ref().take(options.rounds) {
        if options.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!(
                "Round {:>3}: {:>2}/{:<2} {:<16} global {:>5.1}%  attempted {:>3}  mastered {:>3}",
                report.round,
                report.correct,
                report.asked,
                report.verdict.to_string(),
                report.global_power * 100.0,
                report.attempted_rules,
                report.mastered_rules
            );
        }
    }

    let powers = simulation.into_powers();
    if !options.json {
        println!(
            "Final: {} rules attempted, {} mastered",
            powers.attempted_count(),
            powers.mastered_count()
        );
    }
    Ok(powers)
}

fn learners(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let keys = store.keys()?;
    if keys.is_empty() {
        println!("No learners in {}", config.database_path().display());
    }
    for key in keys {
        let saved = store
            .updated_at(&key)?
            .and_then(|t| chrono::DateTime::from_timestamp(t, 0))
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
        println!("{key}  last saved {saved}");
    }
    Ok(())
}

fn export(config: &Config, learner: &str, output: Option<&PathBuf>) -> Result<()> {
    let store = open_store(config)?;
    let bytes = store
        .get(learner)?
        .ok_or_else(|| anyhow!("No progress recorded for {learner}"))?;
    let record = decode_record(&bytes)?;
    let catalog = load_catalog(config)?;

    let now = chrono::Utc::now();
    let json = serde_json::to_string_pretty(&build_export(learner, &record, &catalog, now))?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            log::info!("Suggested file name: {}", export_file_name(now));
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env().with_overrides(cli.content_dir, cli.data_dir);
    log::debug!("{config:?}");

    match cli.command {
        Command::Learn {
            learner,
            section,
            seed,
            json,
        } => learn(&config, &learner, section.as_deref(), seed, json),
        Command::Answer {
            learner,
            answers,
            batch,
        } => answer(&config, &learner, &answers, batch.as_ref()),
        Command::Grade {
            question_id,
            response,
            learner,
        } => grade(&config, &question_id, &response, learner.as_deref()),
        Command::Stats { learner } => stats(&config, &learner),
        Command::Inspect { learner } => {
            let store = open_store(&config)?;
            inspect::inspect_learner(&store, &learner)
        }
        Command::Learners => learners(&config),
        Command::Validate => validate(&config),
        Command::Schema => {
            let schema = schemars::schema_for!(Section);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Simulate {
            rounds,
            seed,
            initial_skill,
            learning_rate,
            learner,
            json,
        } => {
            let options = SimulationOptions {
                rounds,
                seed,
                initial_skill,
                learning_rate,
                learner,
                json,
            };
            simulate(&config, &options).map(|_| ())
        }
        Command::Export { learner, output } => export(&config, &learner, output.as_ref()),
        Command::Forget { learner } => {
            let mut store = open_store(&config)?;
            forget_learner(&mut store, &learner)?;
            println!("Deleted progress of {learner}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("01-03:ok").unwrap(), AnswerItem::new("01-03", true));
        assert_eq!(parse_answer("12-20:KO").unwrap(), AnswerItem::new("12-20", false));
        assert!(parse_answer("01-03").is_err());
        assert!(parse_answer("01-03:maybe").is_err());
    }

    #[test]
    fn test_sample_content_is_clean() {
        let config = Config {
            content_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../content")),
            data_dir: PathBuf::from("unused"),
        };
        let catalog = load_catalog(&config).unwrap();
        assert_eq!(catalog.sections().len(), 2);
        validate(&config).unwrap();
    }

    #[test]
    fn test_answer_then_forget() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            content_dir: dir.path().join("content"),
            data_dir: dir.path().join("data"),
        };
        answer(
            &config,
            "learner-1",
            &["01-01:ok".to_string(), "01-02:ko".to_string()],
            None,
        )
        .unwrap();

        let store = open_store(&config).unwrap();
        let powers = load_powers(&store, "learner-1").unwrap().unwrap();
        assert_eq!(powers.attempted_count(), 2);

        assert_eq!(store.keys().unwrap(), vec!["learner-1".to_string()]);
        assert!(config.database_path().exists());

        let mut store = store;
        forget_learner(&mut store, "learner-1").unwrap();
        assert!(load_powers(&store, "learner-1").unwrap().is_none());
    }

    fn sample_config(dir: &std::path::Path) -> Config {
        Config {
            content_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../content")),
            data_dir: dir.join("data"),
        }
    }

    #[test]
    fn test_simulation_starts_from_stored_progress() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample_config(dir.path());
        answer(&config, "learner-2", &["02-05:ok".to_string()], None).unwrap();

        let options = SimulationOptions {
            rounds: 3,
            seed: 4,
            initial_skill: 0.5,
            learning_rate: 0.1,
            learner: Some("learner-2".to_string()),
            json: true,
        };
        let powers = simulate(&config, &options).unwrap();
        // 02-05 is not in the sample content, so only the stored answer can have set it
        assert!(powers.is_rule_attempted("02-05"));
        assert!(powers.attempted_count() > 1);

        // The stored record is left as it was
        let stored = load_powers(&open_store(&config).unwrap(), "learner-2")
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempted_count(), 1);

        let unknown = SimulationOptions {
            learner: Some("nobody".to_string()),
            ..options
        };
        assert!(simulate(&config, &unknown).is_err());
    }
}
