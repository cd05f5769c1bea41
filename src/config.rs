//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;
use secrecy::SecretString;

use crate::output::DEFAULT_CHUNK_SIZE;
use crate::pipeline::RunOptions;
use crate::salesforce::Credentials;

/// Downloads Salesforce DatasetExport payloads, reassembles their parts, and
/// re-chunks them into bounded-size CSV files.
#[derive(Parser, Debug)]
#[command(name = "sfexport", version)]
pub struct Cli {
    /// Salesforce username.
    #[arg(long, env = "SFEXPORT_USERNAME")]
    pub username: String,

    /// Account password.
    #[arg(long, env = "SFEXPORT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// API security token issued by Salesforce.
    #[arg(long, env = "SFEXPORT_SECURITY_TOKEN", hide_env_values = true)]
    pub security_token: String,

    /// Salesforce login URL.
    #[arg(long, default_value = "https://login.salesforce.com")]
    pub login_url: String,

    /// Directory the chunked CSV files are written to.
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Maximum data rows per output file.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u64,

    /// Skip revealing the output folder when the run completes.
    #[arg(long)]
    pub no_open: bool,
}

impl Cli {
    /// Resolves the parsed arguments into run options.
    pub fn into_options(self) -> RunOptions {
        RunOptions {
            login_url: self.login_url,
            credentials: Credentials {
                username: self.username,
                password: SecretString::from(self.password),
                security_token: SecretString::from(self.security_token),
            },
            output_dir: self.output_dir,
            chunk_size: self.chunk_size,
            open_folder: !self.no_open,
        }
    }
}
