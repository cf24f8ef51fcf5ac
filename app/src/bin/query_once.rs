use std::io;

use querydeck_adapters::pipeline_from_config;
use querydeck_core::config::{AppConfig, FileConfigStore, LOG_FILTER_ENV};
use querydeck_core::history::EntryStatus;
use querydeck_core::query_pipeline::ConsoleState;
use querydeck_core::table::{display_cell, TableData};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseOutcome {
    Config,
    HelpRequested,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OnceArgs {
    base_url: Option<String>,
    prompt: Option<String>,
    demo: bool,
    timeout_ms: Option<u64>,
    raw: bool,
}

impl OnceArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if self.demo {
            config.demo_mode = true;
        }
        if self.timeout_ms.is_some() {
            config.request_timeout_ms = self.timeout_ms;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;
    let prompt = args
        .prompt
        .clone()
        .ok_or_else(|| io_other("missing `--prompt`; see --help"))?;

    let mut config = FileConfigStore::load_default()?.into_config();
    config.apply_env_overrides();
    args.apply(&mut config);
    init_stderr_logging(&config);

    let pipeline = pipeline_from_config(&config)?;
    let mut state = ConsoleState::new(1);
    let outcome = pipeline.run(&mut state, &prompt).await;
    let entry = state
        .history
        .get(outcome.id)
        .ok_or_else(|| io_other("submission result was not recorded"))?;

    if outcome.status == EntryStatus::Error {
        return Err(io_other(&entry.result).into());
    }

    match (&state.table, args.raw) {
        (Some(table), false) => print!("{}", render_table(table)),
        _ => println!("{}", entry.result),
    }
    Ok(())
}

fn init_stderr_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
    if installed.is_err() {
        eprintln!("logging already initialized");
    }
}

fn render_table(table: &TableData) -> String {
    let cells = table
        .rows
        .iter()
        .map(|row| row.iter().map(display_cell).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let mut widths = table
        .columns
        .iter()
        .map(|column| column.chars().count())
        .collect::<Vec<_>>();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut output = format_line(&table.columns);
    output.push('\n');
    output.push_str(
        &widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    output.push('\n');
    for row in &cells {
        output.push_str(&format_line(row));
        output.push('\n');
    }
    output
}

fn parse_args() -> io::Result<OnceArgs> {
    let mut args = OnceArgs::default();
    let outcome = parse_args_from(std::env::args().skip(1), &mut args)?;
    if outcome == ParseOutcome::HelpRequested {
        print_help();
        std::process::exit(0);
    }
    Ok(args)
}

fn parse_args_from(
    args: impl IntoIterator<Item = String>,
    parsed: &mut OnceArgs,
) -> io::Result<ParseOutcome> {
    let mut args = args.into_iter();

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::HelpRequested),
            "--base-url" => parsed.base_url = Some(next_value(&mut args, "--base-url")?),
            "-p" | "--prompt" => parsed.prompt = Some(next_value(&mut args, "--prompt")?),
            "--demo" => parsed.demo = true,
            "--raw" => parsed.raw = true,
            "--timeout-ms" => {
                parsed.timeout_ms = Some(
                    next_value(&mut args, "--timeout-ms")?
                        .parse::<u64>()
                        .map_err(|error| io_other(format!("invalid --timeout-ms value: {error}")))?,
                );
            }
            _ => {
                return Err(io_other(format!("unknown argument `{flag}`")));
            }
        }
    }

    Ok(ParseOutcome::Config)
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<String> {
    args.next()
        .ok_or_else(|| io_other(format!("missing value for `{flag}`")))
}

fn print_help() {
    println!(
        "querydeck single query runner\n\n\
Usage:\n  cargo run -p querydeck-app --bin query-once -- --prompt <text> [OPTIONS]\n\n\
Options:\n  -p, --prompt <text>     Natural language query to submit\n  --base-url <url>        Query service origin (default from config.toml)\n  --demo                  Use the built-in demo service instead of HTTP\n  --timeout-ms <ms>       Per-request timeout\n  --raw                   Print the JSON result even when it is tabular\n\n\
Environment:\n  QUERYDECK_BASE_URL overrides the configured origin.\n  QUERYDECK_LOG sets the log filter (logs go to stderr).\n"
    );
}

fn io_other(error: impl std::fmt::Display) -> io::Error {
    io::Error::other(error.to_string())
}

#[cfg(test)]
mod tests {
    use querydeck_core::config::AppConfig;
    use querydeck_core::table::TableData;
    use serde_json::json;

    use super::{next_value, parse_args_from, render_table, OnceArgs, ParseOutcome};

    #[test]
    fn parse_args_from_applies_overrides() {
        let mut args = OnceArgs::default();
        let outcome = parse_args_from(
            vec![
                "--base-url".to_string(),
                "http://query.local:4000".to_string(),
                "--prompt".to_string(),
                "count users".to_string(),
                "--timeout-ms".to_string(),
                "2500".to_string(),
                "--raw".to_string(),
            ],
            &mut args,
        )
        .expect("parse should succeed");

        assert_eq!(outcome, ParseOutcome::Config);
        assert_eq!(args.base_url.as_deref(), Some("http://query.local:4000"));
        assert_eq!(args.prompt.as_deref(), Some("count users"));
        assert_eq!(args.timeout_ms, Some(2500));
        assert!(args.raw);
        assert!(!args.demo);

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.base_url, "http://query.local:4000");
        assert_eq!(config.request_timeout_ms, Some(2500));
    }

    #[test]
    fn parse_args_from_detects_help() {
        let mut args = OnceArgs::default();
        let outcome = parse_args_from(vec!["--help".to_string()], &mut args).expect("help parse");
        assert_eq!(outcome, ParseOutcome::HelpRequested);
    }

    #[test]
    fn parse_args_from_fails_for_unknown_flag_or_bad_number() {
        let mut args = OnceArgs::default();
        assert!(parse_args_from(vec!["--wat".to_string()], &mut args).is_err());
        assert!(parse_args_from(
            vec!["--timeout-ms".to_string(), "soon".to_string()],
            &mut args
        )
        .is_err());
    }

    #[test]
    fn next_value_reports_missing_argument() {
        let mut iter = Vec::<String>::new().into_iter();
        let error = next_value(&mut iter, "--prompt").expect_err("missing value should fail");
        assert!(error.to_string().contains("--prompt"));
    }

    #[test]
    fn render_table_aligns_columns() {
        let table = TableData::from_records(&json!([
            {"id": 1, "name": "John Doe"},
            {"id": 2, "name": null}
        ]))
        .expect("table");

        assert_eq!(
            render_table(&table),
            "id | name\n---+---------\n1  | John Doe\n2  | NULL\n"
        );
    }
}
