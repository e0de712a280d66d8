//! CLI entry point for the sensu-puppet-handler.
//!
//! Runs as a Sensu pipe handler: reads one JSON event from stdin, logs to
//! stderr, and exits non-zero on any error.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use sensu_puppet_core::{Event, HandlerConfig};
use sensu_puppet_handler::handle_event;

#[derive(Parser)]
#[command(name = "sensu-puppet-handler")]
#[command(about = "Deregister Sensu entities without an associated Puppet node")]
#[command(version)]
struct Cli {
    /// The PuppetDB API endpoint (URL). If an API path is not specified,
    /// /pdb/query/v4/nodes/ will be used.
    #[arg(short, long, env = "PUPPET_ENDPOINT")]
    endpoint: Option<String>,

    /// Path to the SSL certificate PEM file signed by your site's Puppet CA.
    #[arg(long, env = "PUPPET_CERT")]
    cert: Option<String>,

    /// Path to the private key PEM file for that certificate.
    #[arg(long, env = "PUPPET_KEY")]
    key: Option<String>,

    /// Path to the site's Puppet CA certificate PEM file.
    #[arg(long, env = "PUPPET_CA_CERT")]
    ca_cert: Option<String>,

    /// Skip TLS verification for Puppet and sensu-backend.
    #[arg(long, env = "PUPPET_INSECURE_SKIP_TLS_VERIFY")]
    insecure_skip_tls_verify: bool,

    /// Node name to use for the entity when querying PuppetDB.
    #[arg(long, env = "PUPPET_NODE_NAME")]
    node_name: Option<String>,

    /// The Sensu API URL [default: http://localhost:8080].
    #[arg(short = 'u', long, env = "SENSU_API_URL")]
    sensu_api_url: Option<String>,

    /// The Sensu API key.
    #[arg(short = 'a', long, env = "SENSU_API_KEY", hide_env_values = true)]
    sensu_api_key: Option<String>,

    /// The Sensu Go CA certificate.
    #[arg(short = 'c', long, env = "SENSU_CA_CERT")]
    sensu_ca_cert: Option<String>,

    /// Config file prefix (default: sensu-puppet-handler).
    #[arg(long, default_value = "sensu-puppet-handler")]
    config_file: String,
}

impl Cli {
    /// Layer flags and environment over the config file.
    fn into_config(self) -> anyhow::Result<HandlerConfig> {
        let mut config = HandlerConfig::load(&self.config_file)?;

        let strings = [
            (self.endpoint, &mut config.endpoint),
            (self.cert, &mut config.cert),
            (self.key, &mut config.key),
            (self.ca_cert, &mut config.ca_cert),
            (self.sensu_api_url, &mut config.sensu_api_url),
            (self.sensu_api_key, &mut config.sensu_api_key),
        ];
        for (flag, field) in strings {
            if let Some(value) = flag {
                *field = value;
            }
        }

        if self.node_name.is_some() {
            config.node_name = self.node_name;
        }
        if self.sensu_ca_cert.is_some() {
            config.sensu_ca_cert = self.sensu_ca_cert;
        }
        config.insecure_skip_tls_verify |= self.insecure_skip_tls_verify;

        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = cli.into_config()?;

    let input = std::io::read_to_string(std::io::stdin()).context("failed to read event")?;
    let event: Event = serde_json::from_str(&input).context("failed to parse event")?;

    let outcome = handle_event(config, &event).await?;
    tracing::info!(
        event_id = ?event.id,
        outcome = ?outcome,
        "Event handled"
    );

    Ok(())
}
