use clap::Parser;
use filedrop_config::AppConfig;
use filedrop_core::{NoopObserver, PublishRequest, PublishWorkflow, WorkflowOutcome};
use filedrop_queue::{AmqpSettings, RabbitPublisher};
use filedrop_storage::{S3FileStore, S3Settings};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "filedrop")]
#[command(about = "Upload a file to object storage and publish its descriptor", long_about = None)]
struct Cli {
    /// Location of the file that is to be uploaded and published
    file_name: PathBuf,

    /// Suppress console output
    #[arg(long)]
    silent: bool,

    /// Preview the head of the input file before uploading
    #[arg(long)]
    show: bool,

    /// 'file_type' value in the published message
    #[arg(short = 'T', long = "file_type")]
    file_type: String,

    /// Company name such as 'generic', 'reload', 'tml'
    #[arg(short = 'C', long = "company_name", default_value = "generic")]
    company_name: String,

    /// 'data_type' value in the published message
    #[arg(short = 'D', long = "data_type", default_value = "")]
    data_type: String,

    /// Bucket for the upload, defaults to the configured bucket
    #[arg(short = 'B', long = "bucket_name")]
    bucket_name: Option<String>,

    /// 'load_id' value in the published message
    #[arg(short = 'L', long = "load_id", default_value_t = 1)]
    load_id: i64,

    /// 'file_sub_type' value in the published message
    #[arg(long = "file_sub_type", default_value = "")]
    file_sub_type: String,

    /// 'original_file_name' value in the published message
    #[arg(long = "original_file_name", default_value = "")]
    original_file_name: String,

    /// Destination folder inside the bucket, defaults from configuration
    #[arg(short = 'F', long = "folder_name")]
    folder_name: Option<String>,

    /// Destination queue, defaults to the first configured queue
    #[arg(short = 'Q', long = "queue")]
    queue: Option<String>,

    /// Path to the configuration file
    #[arg(short = 'c', long, default_value = "config/filedrop.yaml")]
    config: PathBuf,

    /// Additional --key=value pairs merged into the message
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    additional_args: Vec<String>,
}

/// Parse trailing `--key=value` arguments. Anything else is reported back
/// so the caller can warn about it instead of failing the run.
fn parse_extras(args: &[String]) -> (BTreeMap<String, String>, Vec<String>) {
    let mut extras = BTreeMap::new();
    let mut rejected = Vec::new();

    for arg in args {
        let parsed = arg
            .strip_prefix("--")
            .and_then(|rest| rest.split_once('='))
            .filter(|(key, _)| !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_'));

        match parsed {
            Some((key, value)) => {
                extras.insert(key.to_string(), value.to_string());
            }
            None => rejected.push(arg.clone()),
        }
    }

    (extras, rejected)
}

/// Process exit code contract: file not found is 1, upload failure is 2,
/// everything else is 0. A publish failure does not change the exit code;
/// the file is already in storage and the miss is reported instead.
fn exit_code_for(outcome: &WorkflowOutcome) -> i32 {
    match outcome {
        WorkflowOutcome::Completed { .. } => 0,
        WorkflowOutcome::StoredNotQueued { .. } => 0,
        WorkflowOutcome::UploadFailed { .. } => 2,
        WorkflowOutcome::Invalid { .. } => 1,
    }
}

fn log_level(level: &str) -> Level {
    match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn preview(path: &std::path::Path) -> std::io::Result<String> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().take(10).collect::<Vec<_>>().join("\n"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config);

    let level = if cli.silent {
        Level::ERROR
    } else {
        log_level(&config.logging.level)
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let say = |line: &str| {
        if !cli.silent {
            println!("{}", line);
        }
    };

    // Fail fast before any network call
    if !cli.file_name.exists() {
        eprintln!("✗ invalid file path: {}", cli.file_name.display());
        std::process::exit(1);
    }

    if cli.show {
        match preview(&cli.file_name) {
            Ok(head) => say(&format!("{}\n", head)),
            Err(e) => say(&format!("could not preview {}: {}", cli.file_name.display(), e)),
        }
    }

    let (extras, rejected) = parse_extras(&cli.additional_args);
    for arg in rejected {
        warn!(argument = %arg, "invalid additional argument ignored");
    }

    let bucket_name = cli
        .bucket_name
        .unwrap_or_else(|| config.storage.bucket_name.clone());
    let folder_name = cli
        .folder_name
        .unwrap_or_else(|| config.target.folder_name.clone());
    let queue_name = cli.queue.unwrap_or_else(|| {
        config
            .queue_names()
            .first()
            .map(|entry| entry.underlying_value().to_string())
            .unwrap_or_default()
    });

    let store = S3FileStore::new(S3Settings {
        bucket_name,
        endpoint_url: config.storage.endpoint_url.clone(),
        region: config.storage.region.clone(),
        access_key_id: config.storage.access_key_id.clone(),
        secret_access_key: config.storage.secret_access_key.clone(),
        folder_name,
    });

    let publisher = RabbitPublisher::new(
        AmqpSettings {
            username: config.queue.username.clone(),
            password: config.queue.password.clone(),
            host: config.queue.host.clone(),
            port: config.queue.port,
            virtual_host: config.queue.virtual_host.clone(),
        },
        config.target.db_name.clone(),
        queue_name,
    );

    let request = PublishRequest {
        local_path: cli.file_name.clone(),
        company_name: cli.company_name,
        file_type: cli.file_type,
        data_type: cli.data_type,
        load_id: cli.load_id,
        file_sub_type: cli.file_sub_type,
        original_file_name: cli.original_file_name,
        extras,
    };

    let mut workflow = PublishWorkflow::new(store, publisher);
    let outcome = workflow.run(&request, &mut NoopObserver).await;

    match &outcome {
        WorkflowOutcome::Completed { message } => {
            say(&format!("✓ file uploaded to bucket: {}", message.bucket_name));
            say("✓ descriptor published to queue\n");
            if !cli.silent {
                println!("{}", serde_json::to_string_pretty(message)?);
            }
        }
        WorkflowOutcome::StoredNotQueued { message, error } => {
            say(&format!("✓ file uploaded to bucket: {}", message.bucket_name));
            eprintln!("✗ publish failed, file is in storage but not queued: {}", error);
        }
        WorkflowOutcome::UploadFailed { error } => {
            eprintln!("✗ upload failed: {}", error);
            if outcome.needs_configuration() {
                eprintln!("  storage connection is not configured, fix the configuration file");
            }
        }
        WorkflowOutcome::Invalid { error } => {
            eprintln!("✗ {}", error);
        }
    }

    let code = exit_code_for(&outcome);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
