use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cryosim_uploader::app::{ResolveResult, Uploader};
use cryosim_uploader::config::ManifestLoader;
use cryosim_uploader::domain::NodeGuid;
use cryosim_uploader::error::UploaderError;
use cryosim_uploader::osf::OsfHttpClient;
use cryosim_uploader::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "cryosim-up")]
#[command(about = "Upload simulated cryo-EM particle stacks and metadata to OSF.io")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build the molecule/dataset hierarchy and upload artifacts")]
    Upload(UploadArgs),
    #[command(about = "Look up the node guid of an existing molecule label")]
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct UploadArgs {
    #[arg(long)]
    manifest: Option<String>,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args)]
struct ResolveArgs {
    label: String,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args)]
struct SessionArgs {
    #[arg(long)]
    token: Option<String>,

    #[arg(long, default_value = "24htr")]
    data_node: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<UploaderError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &UploaderError) -> u8 {
    match error {
        UploaderError::MissingConfig
        | UploaderError::ConfigRead(_)
        | UploaderError::ConfigParse(_)
        | UploaderError::InvalidManifest(_)
        | UploaderError::InvalidNodeGuid(_)
        | UploaderError::MissingToken
        | UploaderError::MissingArtifact(_) => 2,
        UploaderError::AuthenticationHttp(_)
        | UploaderError::AuthenticationStatus { .. }
        | UploaderError::OsfHttp(_)
        | UploaderError::OsfStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Upload(args) => run_upload(args, output_mode),
        Commands::Resolve(args) => run_resolve(args, output_mode),
    }
}

fn connect(session: &SessionArgs) -> miette::Result<Uploader<OsfHttpClient>> {
    let token = match &session.token {
        Some(token) => token.clone(),
        None => std::env::var("OSF_TOKEN")
            .map_err(|_| UploaderError::MissingToken)
            .into_diagnostic()?,
    };
    let data_node = session
        .data_node
        .parse::<NodeGuid>()
        .into_diagnostic()?;
    let api = OsfHttpClient::connect(&token).into_diagnostic()?;
    Ok(Uploader::new(api, data_node))
}

fn run_upload(args: UploadArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let record = ManifestLoader::resolve(args.manifest.as_deref()).into_diagnostic()?;
    let uploader = connect(&args.session)?;

    let report = match output_mode {
        OutputMode::NonInteractive => {
            let report = uploader.upload_dataset(&record, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_report(&report).into_diagnostic()?;
            report
        }
        OutputMode::Interactive => {
            let report = uploader.upload_dataset(&record, &TextOutput).into_diagnostic()?;
            println!("dataset node: {}", report.dataset_node);
            if report.all_succeeded {
                println!("all uploads succeeded");
            } else {
                println!("some uploads failed");
            }
            report
        }
    };

    if report.all_succeeded {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn run_resolve(args: ResolveArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let uploader = connect(&args.session)?;
    let node = uploader.find_molecule(&args.label).into_diagnostic()?;

    let found = node.is_some();
    match output_mode {
        OutputMode::NonInteractive => {
            let result = ResolveResult {
                label: args.label,
                node: node.map(|guid| guid.to_string()),
            };
            JsonOutput::print_resolve(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => match node {
            Some(guid) => println!("{guid}"),
            None => println!("no molecule node named {}", args.label),
        },
    }

    if found {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}
