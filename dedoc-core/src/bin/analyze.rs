use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use snafu::ResultExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dedoc_core::{
    error::{DedocError, InputDecodeSnafu, InputReadSnafu, InvalidConfigSnafu, OutputWriteSnafu},
    inference::ModelSource,
    layout::page::Document,
    parse::{Analysis, Pipeline, PipelineConfigBuilder},
};

#[derive(Parser)]
#[command(name = "analyze")]
#[command(about = "Split tables and label lines of a parsed document")]
struct Args {
    #[arg(help = "Input document JSON path")]
    input: PathBuf,

    #[arg(short, long, help = "Output JSON path, stdout if not set")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Threads of the page pool, one per core if not set")]
    threads: Option<usize>,

    #[arg(long, help = "Paragraph model artifact to use instead of the cached one")]
    paragraph_model: Option<PathBuf>,

    #[arg(long, help = "Line type model artifact to use instead of the cached one")]
    line_type_model: Option<PathBuf>,

    #[arg(long, help = "Skip the paragraph classifier")]
    no_paragraphs: bool,

    #[arg(long, help = "Skip the line type classifier")]
    no_line_types: bool,
}

fn read_document(path: &Path) -> Result<Document, DedocError> {
    let display = path.display().to_string();
    let file = File::open(path).context(InputReadSnafu { path: &display })?;
    serde_json::from_reader(BufReader::new(file)).context(InputDecodeSnafu { path: display })
}

fn write_json(output: Option<&Path>, analysis: &Analysis) -> Result<(), DedocError> {
    match output {
        Some(path) => {
            let display = path.display().to_string();
            let file = File::create(path).context(OutputWriteSnafu { path: &display })?;
            write_to(BufWriter::new(file), analysis).context(OutputWriteSnafu { path: display })
        }
        None => write_to(std::io::stdout().lock(), analysis).context(OutputWriteSnafu { path: "<stdout>" }),
    }
}

fn write_to(mut writer: impl Write, analysis: &Analysis) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, analysis)?;
    writer.flush()
}

fn main() -> Result<(), DedocError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Input document: {}", args.input.display());

    let mut config = PipelineConfigBuilder::default();
    config
        .threads(args.threads)
        .classify_paragraphs(!args.no_paragraphs)
        .classify_line_types(!args.no_line_types);
    if let Some(path) = args.paragraph_model {
        config.paragraph_model(ModelSource::new(path));
    }
    if let Some(path) = args.line_type_model {
        config.line_type_model(ModelSource::new(path));
    }
    let config = config.build().map_err(|e| {
        InvalidConfigSnafu {
            message: e.to_string(),
        }
        .build()
    })?;

    let pipeline = Pipeline::new(config)?;
    let analysis = pipeline.run(read_document(&args.input)?)?;
    for warning in &analysis.warnings {
        warn!("{}", warning);
    }

    write_json(args.output.as_deref(), &analysis)?;
    info!("Analysis completed with {} warnings", analysis.warnings.len());
    Ok(())
}
