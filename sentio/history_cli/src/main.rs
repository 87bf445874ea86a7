use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use sentio_emotion_history::{
    Clock, FixedClock, HistoryConfig, HistoryError, HistoryService, Observation, ScreeningScores,
    SystemClock,
};
use serde_json::{json, Value};
use shared_logging::{JsonLogger, LogLevel, LogRecord};

#[derive(Parser, Debug)]
#[command(name = "sentio", version, about = "Emotion history replay and summaries")]
struct Cli {
    /// Optional JSON-lines log for this invocation.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replays observations and prints the user's windowed summary.
    Summarize(SummarizeArgs),
    /// Replays observations and prints the user's recorded events.
    History {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Scores PHQ-9 and GAD-7 answers and prints the derived label.
    ClassifyForm {
        /// Nine comma-separated answers, each 0-3.
        #[arg(long)]
        phq9: String,
        /// Seven comma-separated answers, each 0-3.
        #[arg(long)]
        gad7: String,
    },
}

#[derive(Parser, Debug)]
struct SummarizeArgs {
    /// Observation log, one JSON object per line.
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    user: String,
    /// End of the window (`YYYY-MM-DDTHH:MM:SS`, or a date meaning its last second).
    #[arg(long)]
    now: Option<String>,
    #[arg(long)]
    window_days: Option<u32>,
    #[arg(long)]
    top_k: Option<usize>,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let logger = cli.log_file.as_deref().map(JsonLogger::new).transpose()?;
    let output = match cli.command {
        Commands::Summarize(args) => summarize(&args, logger.as_ref())?,
        Commands::History {
            input,
            user,
            config,
        } => {
            let service = build_service(config.as_deref(), None, None, Arc::new(SystemClock))?;
            replay(&service, &input, logger.as_ref())?;
            let events = service.history(&user)?;
            json!({ "user_id": user, "history": events })
        }
        Commands::ClassifyForm { phq9, gad7 } => {
            let scores =
                ScreeningScores::from_answers(&parse_answers(&phq9)?, &parse_answers(&gad7)?)?;
            json!({
                "detected_emotion": scores.classify(),
                "phq9_score": scores.phq9,
                "gad7_score": scores.gad7,
            })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn summarize(args: &SummarizeArgs, logger: Option<&JsonLogger>) -> Result<Value> {
    let clock: Arc<dyn Clock> = match args.now.as_deref() {
        Some(raw) => Arc::new(FixedClock::new(parse_instant(raw)?)),
        None => Arc::new(SystemClock),
    };
    let service = build_service(args.config.as_deref(), args.window_days, args.top_k, clock)?;
    let replayed = replay(&service, &args.input, logger)?;
    match service.summarize(&args.user) {
        Ok(outcome) => {
            log(
                logger,
                LogLevel::Info,
                "summary produced",
                json!({ "user_id": args.user, "replayed": replayed, "analyzed": outcome.total_analyzed() }),
            )?;
            let mut value = serde_json::to_value(&outcome)?;
            if let Value::Object(map) = &mut value {
                map.insert("user_id".into(), Value::String(args.user.clone()));
            }
            Ok(value)
        }
        Err(err @ HistoryError::NoHistory { .. }) => {
            log(
                logger,
                LogLevel::Warn,
                "no history",
                json!({ "user_id": args.user, "replayed": replayed }),
            )?;
            bail!(err)
        }
        Err(err) => Err(err.into()),
    }
}

fn build_service(
    config: Option<&Path>,
    window_days: Option<u32>,
    top_k: Option<usize>,
    clock: Arc<dyn Clock>,
) -> Result<HistoryService> {
    let mut settings = match config {
        Some(path) => HistoryConfig::load(path)?,
        None => HistoryConfig::default(),
    };
    if let Some(days) = window_days {
        settings.window_days = days;
    }
    if let Some(k) = top_k {
        settings.top_k = k;
    }
    HistoryService::from_config(&settings, clock)
}

fn replay(service: &HistoryService, input: &Path, logger: Option<&JsonLogger>) -> Result<usize> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut count = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let observation: Observation = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed observation", input.display(), index + 1))?;
        service
            .ingest(&observation)
            .with_context(|| format!("{}:{}: rejected observation", input.display(), index + 1))?;
        count += 1;
    }
    log(
        logger,
        LogLevel::Debug,
        "replay complete",
        json!({ "input": input, "observations": count }),
    )?;
    Ok(count)
}

fn parse_instant(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(instant) = raw.parse::<NaiveDateTime>() {
        return Ok(instant);
    }
    let date = raw
        .parse::<NaiveDate>()
        .with_context(|| format!("invalid --now value {raw:?}"))?;
    date.and_hms_opt(23, 59, 59)
        .with_context(|| format!("invalid --now value {raw:?}"))
}

fn parse_answers(raw: &str) -> Result<Vec<u8>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u8>()
                .with_context(|| format!("invalid answer {part:?}"))
        })
        .collect()
}

fn log(logger: Option<&JsonLogger>, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
    if let Some(logger) = logger {
        logger.log(&LogRecord::new("sentio", level, message).with_metadata(metadata))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_log(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("observations.jsonl");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn parses_instants_and_dates() {
        let instant = parse_instant("2025-06-10T18:00:00").unwrap();
        assert_eq!(instant.to_string(), "2025-06-10 18:00:00");
        let end_of_day = parse_instant("2025-06-10").unwrap();
        assert_eq!(end_of_day.to_string(), "2025-06-10 23:59:59");
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn parses_answer_lists() {
        assert_eq!(parse_answers("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_answers("1,x").is_err());
    }

    #[test]
    fn summarize_replays_observations() {
        let dir = tempdir().unwrap();
        let input = write_log(
            dir.path(),
            &[
                r#"{"user_id":"u1","label":"happy","source":"form","timestamp":"2025-06-09T09:00:00","scores":{"phq9":2,"gad7":1}}"#,
                "",
                r#"{"user_id":"u1","label":"sad","source":"form","timestamp":"2025-06-09T10:00:00"}"#,
                r#"{"user_id":"u1","label":"ANGRY","source":"voice","timestamp":"2025-06-10T18:00:00"}"#,
                r#"{"user_id":"u2","label":"calm","source":"camera","timestamp":"2025-06-10T08:00:00"}"#,
            ],
        );
        let args = SummarizeArgs {
            input,
            user: "u1".into(),
            now: Some("2025-06-10".into()),
            window_days: None,
            top_k: None,
            config: None,
        };
        let log_path = dir.path().join("cli.jsonl");
        let logger = JsonLogger::new(&log_path).unwrap();
        let value = summarize(&args, Some(&logger)).unwrap();
        assert_eq!(value["status"], "summary");
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["daily"]["2025-06-09"], "happy");
        assert_eq!(value["daily"]["2025-06-10"], "angry");
        assert_eq!(value["totalAnalyzed"], 3);
        let logged = std::fs::read_to_string(log_path).unwrap();
        assert!(logged.contains("summary produced"));
    }

    #[test]
    fn unknown_user_fails() {
        let dir = tempdir().unwrap();
        let input = write_log(
            dir.path(),
            &[r#"{"user_id":"u1","label":"happy","source":"camera"}"#],
        );
        let args = SummarizeArgs {
            input,
            user: "ghost".into(),
            now: None,
            window_days: Some(7),
            top_k: None,
            config: None,
        };
        let err = summarize(&args, None).unwrap_err();
        assert!(err.to_string().contains("no emotion history"));
    }

    #[test]
    fn rejected_lines_report_their_position() {
        let dir = tempdir().unwrap();
        let input = write_log(
            dir.path(),
            &[
                r#"{"user_id":"u1","label":"happy","source":"camera"}"#,
                r#"{"user_id":"u1","label":"giddy","source":"camera"}"#,
            ],
        );
        let service = HistoryService::new();
        let err = replay(&service, &input, None).unwrap_err();
        assert!(format!("{err:#}").contains(":2: rejected observation"));
    }
}
