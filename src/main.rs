use accprof::acc::AccEvent;
use accprof::cli::{Cli, Command, OutputFormat};
use accprof::config::ProfConfig;
use accprof::dispatch;
use accprof::logging;
use accprof::ompt::OmptCallbackKind;
use accprof::proflib::ProfLib;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct EventRow {
    event: AccEvent,
    supported: bool,
    callbacks: Vec<OmptCallbackKind>,
}

#[derive(Debug, Serialize)]
struct CallbackRow {
    callback: OmptCallbackKind,
    value: i32,
    events: Vec<AccEvent>,
}

#[derive(Debug, Serialize)]
struct ProflibRow {
    path: String,
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConfigReport {
    config: ProfConfig,
    proflibs: Vec<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn event_rows() -> Vec<EventRow> {
    AccEvent::ALL
        .into_iter()
        .map(|event| {
            let callbacks = dispatch::required_callbacks(event);
            EventRow {
                event,
                supported: callbacks.is_some(),
                callbacks: callbacks.map(<[_]>::to_vec).unwrap_or_default(),
            }
        })
        .collect()
}

fn print_events(format: OutputFormat) -> Result<()> {
    let rows = event_rows();
    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            for row in &rows {
                let callbacks = if !row.supported {
                    "(not supported)".to_string()
                } else if row.callbacks.is_empty() {
                    "(raised from tool finalize)".to_string()
                } else {
                    row.callbacks
                        .iter()
                        .map(|kind| kind.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!("{:<32} {}", row.event.name(), callbacks);
            }
        }
    }
    Ok(())
}

fn print_callbacks(format: OutputFormat) -> Result<()> {
    let rows: Vec<CallbackRow> = OmptCallbackKind::ALL
        .into_iter()
        .map(|kind| CallbackRow {
            callback: kind,
            value: kind.raw(),
            events: dispatch::events_requiring(kind).collect(),
        })
        .collect();
    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            for row in &rows {
                let events: Vec<_> = row.events.iter().map(|e| e.name()).collect();
                println!(
                    "{:<40} {:>3}  {}",
                    row.callback.name(),
                    row.value,
                    events.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn check_proflibs(config: &ProfConfig, paths: Vec<String>, format: OutputFormat) -> Result<()> {
    let paths = if paths.is_empty() {
        config.proflibs()
    } else {
        paths
    };
    let rows: Vec<ProflibRow> = paths
        .into_iter()
        .map(|path| {
            let result = ProfLib::open(&path).and_then(|lib| lib.register_library().map(|_| ()));
            ProflibRow {
                ok: result.is_ok(),
                error: result.err().map(|err| err.to_string()),
                path,
            }
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("no profiling libraries listed in {}", config.proflib_var);
            }
            for row in &rows {
                match &row.error {
                    None => println!("ok      {}", row.path),
                    Some(error) => println!("FAILED  {error}"),
                }
            }
        }
    }

    let failed = rows.iter().filter(|row| !row.ok).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} profiling libraries failed", rows.len());
    }
    Ok(())
}

fn print_config(config: &ProfConfig, format: OutputFormat) -> Result<()> {
    let report = ConfigReport {
        config: config.clone(),
        proflibs: config.proflibs(),
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("proflib_var:       {}", report.config.proflib_var);
            println!("separators:        {:?}", report.config.separators);
            println!("log_var:           {}", report.config.log_var);
            println!("default_log_level: {}", report.config.default_log_level);
            println!("proflibs:          {}", report.proflibs.len());
            for path in &report.proflibs {
                println!("  {path}");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = ProfConfig::default();
    config.validate().context("invalid configuration")?;

    logging::init_with(&config, args.debug);

    match args.command {
        Command::Events { format } => print_events(format),
        Command::Callbacks { format } => print_callbacks(format),
        Command::Proflib { paths, format } => check_proflibs(&config, paths, format),
        Command::Config { format } => print_config(&config, format),
    }
}
