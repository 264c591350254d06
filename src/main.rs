use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use caption_quiz::captions::VideoReference;
use caption_quiz::config::Config;
use caption_quiz::metadata::PageMetadataService;
use caption_quiz::pipeline::Services;
use caption_quiz::quiz::{JsonFileSink, QuizOrchestrator};
use caption_quiz::retrieval::{AnswerEngine, LexicalIndex, VideoIndexer};

fn cli() -> Command {
    let command = Command::new("Caption Quiz")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Caption acquisition, aligned segmentation and multi-source quiz synthesis")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to caption-quiz.toml or environment)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("quiz")
                .about("Generate a fixed-size quiz from several videos")
                .arg(
                    Arg::new("references")
                        .value_name("REF")
                        .help("Video URLs or IDs, one per source")
                        .num_args(1..)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("transcript")
                .about("Print the aligned segments of one video as JSON")
                .arg(Arg::new("reference").value_name("REF").required(true)),
        )
        .subcommand(
            Command::new("index")
                .about("Index one video for question answering")
                .arg(Arg::new("reference").value_name("REF").required(true))
                .arg(
                    Arg::new("owner")
                        .short('o')
                        .long("owner")
                        .value_name("OWNER")
                        .help("Owner part of the store name")
                        .default_value("default"),
                ),
        )
        .subcommand(
            Command::new("ask")
                .about("Answer a question from an indexed video")
                .arg(Arg::new("store").value_name("STORE").required(true))
                .arg(Arg::new("question").value_name("QUESTION").required(true)),
        );

    #[cfg(feature = "api")]
    let command = command.subcommand(
        Command::new("serve").about("Run the HTTP API").arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .default_value("8080"),
        ),
    );

    command
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| anyhow::anyhow!("missing argument: {}", name))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let loaded = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path)),
        None => Config::load(),
    };

    let level = match (&loaded, verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.output.log_level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("caption_quiz={},warn", level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.validate()?;
    info!("🚀 Caption Quiz starting...");
    info!("{}", config.summary());

    let services = Services::from_config(&config)?;

    match matches.subcommand() {
        Some(("quiz", args)) => {
            let references: Vec<VideoReference> = args
                .get_many::<String>("references")
                .map(|values| values.map(|v| VideoReference::from(v.as_str())).collect())
                .unwrap_or_default();

            let sink = Arc::new(JsonFileSink::from_config(&config.output));
            let orchestrator = QuizOrchestrator::new(services.quiz.clone(), sink, config.quiz.clone());

            let start_time = std::time::Instant::now();
            let outcome = orchestrator.run(references).await?;
            let failed = outcome.slots.iter().filter(|slot| slot.failure.is_some()).count();

            info!("🎉 Quiz completed in {:.2}s", start_time.elapsed().as_secs_f64());
            info!("✅ Sources contributing: {}", outcome.slots.len() - failed);
            info!("❌ Sources failed: {}", failed);
            info!("💾 Results saved to: {}", outcome.result.saved_to);
            println!("{}", serde_json::to_string_pretty(&outcome.result)?);
        }
        Some(("transcript", args)) => {
            let reference = VideoReference::from(required(args, "reference")?.as_str());
            let aligned = services.transcripts.run(&reference).await?;
            println!("{}", serde_json::to_string_pretty(&aligned.segments)?);
        }
        Some(("index", args)) => {
            let reference = VideoReference::from(required(args, "reference")?.as_str());
            let index = Arc::new(LexicalIndex::new(config.retrieval.store_dir.clone()));
            let metadata = Arc::new(PageMetadataService::new(services.fetcher.clone()));
            let indexer = VideoIndexer::new(services.transcripts.clone(), metadata, index);

            let report = indexer.ingest(&reference, required(args, "owner")?).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("ask", args)) => {
            let index = Arc::new(LexicalIndex::new(config.retrieval.store_dir.clone()));
            let engine = AnswerEngine::new(services.completion.clone(), index, &config.retrieval);

            let report = engine
                .answer(required(args, "store")?, required(args, "question")?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        #[cfg(feature = "api")]
        Some(("serve", args)) => {
            let port: u16 = required(args, "port")?.parse()?;
            let sink = Arc::new(JsonFileSink::from_config(&config.output));
            let orchestrator = Arc::new(QuizOrchestrator::new(services.quiz.clone(), sink, config.quiz.clone()));
            caption_quiz::api::ApiServer::new(orchestrator, port).start().await?;
        }
        _ => unreachable!("a subcommand is required"),
    }

    Ok(())
}
