use std::io;
use anyhow::Result;
use log::*;
use structopt::StructOpt;

use gphotos_archive::{cancel_on_interrupt, config, prompt, session, CancelToken, Cancelled, Config, Drive, FlowOptions, Session};

const LOGGING_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Move Google Photos matching a Drive query to the trash
#[derive(Debug, StructOpt)]
#[structopt(name = "gphotos-archive")]
struct Opt {
    /// Selection query, e.g. "modifiedTime < '2017-01-15T16:45:50'"
    query: String,
    /// Paste the verification code instead of running a local webserver
    #[structopt(long, alias = "noauth_local_webserver")]
    noauth_local_webserver: bool,
    /// Host the local webserver listens on for the authorization redirect
    #[structopt(long, alias = "auth_host_name", default_value = "localhost")]
    auth_host_name: String,
    /// Ports to try for the local webserver, in order [default: 8080 8090]
    #[structopt(long, alias = "auth_host_port", number_of_values = 1)]
    auth_host_port: Vec<u16>,
    /// Log level, overridden by RUST_LOG
    #[structopt(long, alias = "logging_level", default_value = "ERROR", possible_values = &LOGGING_LEVELS, case_insensitive = true)]
    logging_level: String,
    /// List matching photos without trashing anything
    #[structopt(long)]
    dry_run: bool,
}

impl Opt {
    fn into_config(self) -> Result<Config> {
        let ports = if self.auth_host_port.is_empty() {
            config::DEFAULT_AUTH_PORTS.to_vec()
        } else {
            self.auth_host_port
        };
        Ok(Config {
            app_dir: config::default_app_dir()?,
            flow: FlowOptions {
                local_webserver: !self.noauth_local_webserver,
                host: self.auth_host_name,
                ports,
            },
            query: self.query,
            dry_run: self.dry_run,
        })
    }
}

fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARNING" => LevelFilter::Warn,
        _ => LevelFilter::Error,
    }
}

fn init_logging(level: &str) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(level_filter(level)),
    };
    builder.init();
}

fn main() {
    let opt = Opt::from_args();
    init_logging(&opt.logging_level);
    let code = match run(opt) {
        Ok(()) => 0,
        // Interrupt is the user's choice, not a failure. Finish the line we were on.
        Err(e) if e.chain().any(|c| c.is::<Cancelled>()) => {
            println!();
            0
        },
        Err(e) => {
            eprintln!("Error: {:?}", e);
            1
        },
    };
    std::process::exit(code);
}

fn run(opt: Opt) -> Result<()> {
    let cancel = CancelToken::new();
    cancel_on_interrupt(cancel.clone())?;
    let config = opt.into_config()?;
    debug!("{:?}", config);

    let http = session::http_client()?;
    let credentials = gphotos_archive::acquire(&config, &http, &cancel)?;
    let mut drive = Drive::new(Session::new(http, credentials, config.token_path()));

    let stdout = io::stdout();
    let outcome = gphotos_archive::run(
        &mut drive,
        &config.query,
        config.dry_run,
        &mut stdout.lock(),
        &cancel,
        || prompt::confirm(&cancel),
    )?;
    info!("{:?}", outcome);
    Ok(())
}
