use std::process::ExitCode;

use clap::Parser;
use quotevault::{
    Archive,
    ArchiveConfig,
    DataDir,
    Error,
    Item,
    ItemId,
    Result,
    TesseractOcr,
    ValidationError,
    search::{self, SearchParams},
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("QUOTEVAULT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "stopping: archive state is unsafe");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let mut config = ArchiveConfig::from_env()?;
    if let Command::Search(args) = &cli.command
        && let Some(scorer) = args.scorer
    {
        config.scorer = scorer;
    }

    let ocr = TesseractOcr::from_config(&config);
    let (archive, report) = Archive::open(&data_dir, config, Box::new(ocr))?;
    for id in &report.failed {
        tracing::warn!(id, "item could not be indexed, will retry next start");
    }

    match cli.command {
        Command::Ingest(args) => cmd_ingest(&archive, &args)?,
        Command::Get(args) => {
            let id: ItemId = args.id.parse()?;
            let item = archive.get_by_id(id.get())?;
            if let Some(path) = &args.output {
                std::fs::write(path, &item.bytes)?;
                tracing::info!(path = %path.display(), "wrote item");
            }
            print_item(&item, args.json)?;
        }
        Command::Random(args) => {
            let item = archive.get_random()?;
            print_item(&item, args.json)?;
        }
        Command::Quote(args) => {
            let requested = match args.id.as_deref() {
                Some(raw) => match raw.parse::<ItemId>() {
                    Ok(id) => Some(id.get()),
                    Err(_) => {
                        tracing::warn!(raw, "not an item id, picking random");
                        None
                    }
                },
                None => None,
            };
            let lookup = archive.lookup_or_random(requested)?;
            if lookup.fell_back
                && let Some(id) = lookup.requested
            {
                eprintln!("Item #{id} does not exist, here is a random one.");
            }
            print_item(&lookup.item, args.json)?;
        }
        Command::Search(args) => {
            let config = archive.config();
            let params = SearchParams {
                query: args.query.clone(),
                limit: args.count.unwrap_or(config.result_limit),
                min_score: args.min_score.unwrap_or(config.min_score),
            };
            let hits = archive.search(&params)?;
            if args.json {
                search::format_json(&hits, &args.query)?;
            } else {
                search::format_human(&hits, &args.query);
            }
        }
        Command::List(args) => {
            let ids = archive.valid_ids()?;
            if args.json {
                println!("{}", serde_json::to_string(&*ids)?);
            } else if ids.is_empty() {
                println!("The archive is empty.");
            } else {
                let line: Vec<String> = ids.iter().map(u64::to_string).collect();
                println!("{}", line.join(", "));
            }
        }
        Command::Status(args) => {
            let status = archive.status()?;
            if args.json {
                let out = serde_json::json!({
                    "data_dir": data_dir.root(),
                    "items": status.items,
                    "indexed": status.indexed,
                    "current_max": status.current_max,
                    "scorer": archive.config().scorer.to_string(),
                });
                println!("{out}");
            } else {
                println!("Data directory: {}", data_dir.root().display());
                println!("Items: {}", status.items);
                println!("Indexed: {}", status.indexed);
                println!("Last id: {}", status.current_max);
                println!("Scorer: {}", archive.config().scorer);
            }
        }
        Command::Recover => {
            let report = archive.recover()?;
            println!(
                "Items: {}, OCR-eligible: {}, already indexed: {}, backfilled: {}",
                report.items,
                report.eligible,
                report.already_indexed,
                report.backfilled
            );
            if !report.failed.is_empty() {
                let ids: Vec<String> =
                    report.failed.iter().map(|id| format!("#{id}")).collect();
                println!("Failed: {}", ids.join(", "));
            }
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_ingest(archive: &Archive, args: &cli::IngestArgs) -> Result<()> {
    let extension = match &args.ext {
        Some(ext) => ext.trim_start_matches('.').to_string(),
        None => args
            .file
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string)
            .ok_or(Error::Validation(ValidationError::MissingExtension))?,
    };

    let bytes = std::fs::read(&args.file)?;
    let id = archive.ingest(&bytes, &extension)?;
    println!("Added item {id}");
    Ok(())
}

fn print_item(item: &Item, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "id": item.id.get(),
            "extension": item.extension,
            "size": item.bytes.len(),
            "text": item.text,
        });
        println!("{}", serde_json::to_string(&out)?);
        return Ok(());
    }

    println!("{} ({}, {} bytes)", item.id, item.extension, item.bytes.len());
    if let Some(text) = item.text.as_deref().filter(|t| !t.trim().is_empty()) {
        println!();
        println!("{}", text.trim_end());
    }
    Ok(())
}
