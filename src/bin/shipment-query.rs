use clap::{Parser, Subcommand};
use shipment_query::config::ServiceConfig;
use shipment_query::event::QUERY_ACTION;
use shipment_query::transport::{NdjsonEventSource, NdjsonResponseSink, ResponseSink};
use shipment_query::{Collection, Dispatcher, Event, EventResponse};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Parser, Debug)]
#[command(name = "shipment-query", version, about = "Shipment aggregate query handler", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, defaults and env are used.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Aggregate ID this instance answers for")]
    aggregate_id: Option<i8>,
    #[arg(long, help = "Collection name")]
    collection: Option<String>,
    #[arg(long, help = "NDJSON file of documents loaded into the collection at startup")]
    seed: Option<PathBuf>,
    #[arg(long, help = "Directory for log files")]
    log_dir: Option<PathBuf>,
    #[arg(long, help = "error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[arg(long, help = "log4rs YAML file used instead of the built-in log files")]
    log_config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Handle NDJSON events and write NDJSON responses in input order")]
    Serve {
        #[arg(long, help = "Events file; defaults to stdin")]
        input: Option<PathBuf>,
        #[arg(long, help = "Responses file; defaults to stdout")]
        output: Option<PathBuf>,
    },
    #[command(about = "Run one filter through the handler and print the response")]
    Query {
        #[arg(help = "Filter JSON (e.g., {\"sku\": \"test-sku\"})")]
        filter: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut cfg = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(id) = cli.aggregate_id {
        cfg.aggregate_id = id;
    }
    if let Some(name) = cli.collection {
        cfg.collection = name;
    }
    if let Some(seed) = cli.seed {
        cfg.seed_file = Some(seed);
    }
    if let Some(dir) = cli.log_dir {
        cfg.log_dir = Some(dir);
    }
    if let Some(level) = cli.log_level {
        cfg.log_level = Some(level);
    }
    if let Some(file) = cli.log_config {
        cfg.log_config = Some(file);
    }
    if let Err(e) = shipment_query::init(&cfg) {
        eprintln!("logging not initialized: {e}");
    }

    let collection = Arc::new(Collection::new(cfg.collection.clone()));
    if let Some(seed) = &cfg.seed_file {
        collection.load_ndjson(BufReader::new(File::open(seed)?))?;
    }
    if collection.is_empty() {
        log::warn!("collection {} is empty; every query will match nothing", collection.name());
    }
    let dispatcher = Arc::new(Dispatcher::new(cfg.aggregate_id, Arc::clone(&collection)));

    match cli.command {
        Commands::Serve { input, output } => {
            log::info!(
                "serving aggregate {} from collection {} ({} documents)",
                cfg.aggregate_id,
                collection.name(),
                collection.len()
            );
            serve(&dispatcher, cfg.workers, input, output).await?;
            dispatcher.metrics().log_snapshot();
        }
        Commands::Query { filter } => {
            let event = Event::new(QUERY_ACTION, cfg.aggregate_id, filter.into_bytes());
            let response = shipment_query::handler::query(collection.as_ref(), &event);
            let mut v = serde_json::to_value(&response)?;
            if response.is_success() {
                v["result"] = serde_json::from_slice(&response.result)?;
            }
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
    }
    Ok(())
}

async fn serve(
    dispatcher: &Arc<Dispatcher<Arc<Collection>>>,
    workers: usize,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let reader: Box<dyn BufRead> = match input {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let writer: Box<dyn Write> = match output {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout()),
    };
    let mut sink: Box<dyn ResponseSink> = Box::new(NdjsonResponseSink::new(writer));
    let mut window: Vec<JoinHandle<Option<EventResponse>>> = Vec::with_capacity(workers);
    for item in NdjsonEventSource::new(reader) {
        match item {
            Ok(event) => {
                let d = Arc::clone(dispatcher);
                window.push(tokio::task::spawn_blocking(move || d.dispatch(&event)));
                if window.len() >= workers {
                    drain(&mut window, sink.as_mut()).await?;
                }
            }
            // Uncorrelatable: there is no identity to answer to.
            Err(e) => log::error!("{e}"),
        }
    }
    drain(&mut window, sink.as_mut()).await?;
    sink.finish()?;
    Ok(())
}

async fn drain(
    window: &mut Vec<JoinHandle<Option<EventResponse>>>,
    sink: &mut dyn ResponseSink,
) -> Result<(), Box<dyn Error>> {
    for handle in window.drain(..) {
        if let Some(response) = handle.await? {
            sink.publish(&response)?;
        }
    }
    Ok(())
}
