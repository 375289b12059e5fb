//! cors-watcher CLI

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cors_watcher::config::{self, CliOverrides};
use cors_watcher::error::WatcherError;
use cors_watcher::http::HttpClient;
use cors_watcher::input;
use cors_watcher::models::WatchConfig;
use cors_watcher::report::ConsoleSink;
use cors_watcher::scanner::{build_batches, Dispatcher, GeneratorOptions};

/// cors-watcher - probe endpoints with crafted Origin headers
#[derive(Parser)]
#[command(name = "cors-watcher", version, about, long_about = None)]
struct Cli {
    /// URL to check its CORS policy. It must start with http:// or https://
    #[arg(short, long)]
    url: Option<String>,

    /// Request method (GET, POST, PUT, DELETE, PATCH) [default: GET]
    #[arg(short, long)]
    method: Option<String>,

    /// Request headers in the format "key:value, key:value, ..."
    #[arg(short = 'H', long)]
    headers: Option<String>,

    /// Request data
    #[arg(short, long)]
    data: Option<String>,

    /// File containing the list of origins, one per line
    #[arg(long)]
    origins_file: Option<PathBuf>,

    /// Use only the origins from the origins file
    #[arg(long)]
    only_origins: bool,

    /// File containing one JSON request per line:
    /// {"url": "https://a.com", "method": "POST", "headers": {"k": "v"}, "data": "x"}
    #[arg(long)]
    requests_file: Option<PathBuf>,

    /// Save the results in a readable format
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save the results in JSON format
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Save the results in CSV format
    #[arg(long)]
    output_csv: Option<PathBuf>,

    /// Save the results in YAML format
    #[arg(long)]
    output_yaml: Option<PathBuf>,

    /// Request timeout in seconds [default: 10]
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Delay between requests in seconds [default: 0]
    #[arg(long)]
    delay: Option<f64>,

    /// Proxy URL (http:// or socks5://)
    #[arg(short, long)]
    proxy: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            data: self.data.clone(),
            origins_file: self.origins_file.clone(),
            only_origins: self.only_origins,
            requests_file: self.requests_file.clone(),
            output: self.output.clone(),
            output_json: self.output_json.clone(),
            output_csv: self.output_csv.clone(),
            output_yaml: self.output_yaml.clone(),
            timeout: self.timeout,
            delay: self.delay,
            proxy: self.proxy.clone(),
        }
    }
}

fn print_banner() {
    let banner = r#"
█▀▀ █▀█ █▀█ █▀▀  █░█░█ ▄▀█ ▀█▀ █▀▀ █░█ █▀▀ █▀█
█▄▄ █▄█ █▀▄ ▄▄█  ▀▄▀▄▀ █▀█ ░█░ █▄▄ █▀█ ██▄ █▀▄
"#;
    println!("{}", banner.cyan());
}

fn print_info(text: &str) {
    println!("{} {}", "[+]".green().bold(), text.bold());
}

fn print_warning(text: &str) {
    println!("{} {}", "[!]".yellow().bold(), text.bold());
}

fn print_general_options(config: &WatchConfig) {
    print_info(&format!("Timeout: {}", config.timeout_secs));
    print_info(&format!("Delay: {:.1}", config.delay_secs));
    if let Some(ref proxy) = config.proxy {
        print_info(&format!("Proxy: {proxy}"));
    }
}

fn print_error(err: &WatcherError) {
    match err {
        WatcherError::InvalidOptions(errors) => {
            for option_error in errors {
                eprintln!(
                    "{} {} {}",
                    "[x]".red().bold(),
                    option_error.option.cyan().bold(),
                    option_error.message
                );
            }
        }
        other => eprintln!("{} {}", "[x]".red().bold(), other),
    }
}

fn build_config(cli: &Cli) -> cors_watcher::error::Result<WatchConfig> {
    let mut watch_config = match cli.config {
        Some(ref path) => config::load_config(path)?,
        None => WatchConfig::default(),
    };

    config::merge_cli_args(&mut watch_config, cli.overrides());
    config::normalize_outputs(&mut watch_config);
    config::validate(&watch_config)?;
    input::load_files(&mut watch_config)?;

    Ok(watch_config)
}

async fn run(watch_config: WatchConfig) -> cors_watcher::error::Result<()> {
    let client = Arc::new(HttpClient::from_config(&watch_config)?);

    let options = GeneratorOptions {
        only_file_origins: watch_config.only_file_origins,
        file_origins: watch_config.file_origins.clone(),
        special_characters: watch_config.special_characters.clone(),
    };
    let batches = build_batches(&input::base_requests(&watch_config), &options);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut interrupted = false;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl+c: {}", e);
                return;
            }
            if interrupted {
                print_warning("Second interrupt, leaving now");
                std::process::exit(130);
            }
            interrupted = true;
            println!();
            print_warning("Signal: interrupt");
            print_warning("Waiting for in-flight requests, then leaving (ctrl+c again to force) ...");
            let _ = shutdown_tx.send(true);
        }
    });

    let delay = Duration::try_from_secs_f64(watch_config.delay_secs)
        .map_err(|e| WatcherError::ConfigError(format!("Invalid delay: {e}")))?;

    let sink = ConsoleSink::stdout(watch_config.output.clone());
    let dispatcher = Dispatcher::new(client.clone(), Box::new(sink))
        .with_delay(delay)
        .with_shutdown(shutdown_rx);

    dispatcher.run(batches).await?;
    print_info(&format!("Requests sent: {}", client.request_count()));
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "cors_watcher=debug"
    } else {
        "cors_watcher=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    print_banner();

    let watch_config = match build_config(&cli) {
        Ok(watch_config) => watch_config,
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        }
    };

    print_general_options(&watch_config);

    if let Err(e) = run(watch_config).await {
        print_error(&e);
        std::process::exit(1);
    }
}
