//! dnsrelay - a small DNS forwarding resolver
//!
//! Relays UDP queries to one upstream resolver and answers clients with the
//! upstream's records, or with a synthesized A record when it has none.

use dnsrelay::config::load_config;
use dnsrelay::dns::{resolve_upstream, run_dns_server, FallbackPolicy, RelaySettings};
use dnsrelay::error::RelayError;
use dnsrelay::logging;

use std::env;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let args: Vec<String> = env::args().collect();

    // Parse command line arguments
    let mut config_path: Option<&str> = None;
    let mut cli_listen: Option<String> = None;
    let mut cli_resolver: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                config_path = Some(require_value(&args, i));
            }
            "--listen" => {
                i += 1;
                cli_listen = Some(require_value(&args, i).to_string());
            }
            "--resolver" => {
                i += 1;
                cli_resolver = Some(require_value(&args, i).to_string());
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Load config from file
    let mut config = load_config(config_path)?;

    // CLI arguments override config file
    if let Some(addr) = cli_listen {
        config.listen = addr;
    }
    if let Some(upstream) = cli_resolver {
        config.upstream = upstream;
    }

    let _log_guard = logging::init_logging(&config.logging)?;

    tracing::debug!(config = ?config, "Configuration loaded");

    let listen_addr = config.listen_addr()?;
    let upstream = resolve_upstream(&config.upstream).await?;

    println!("DNS relay listening on {}", listen_addr);
    println!("DNS upstream: {} ({})", config.upstream, upstream);

    let settings = RelaySettings {
        upstream,
        timeout: config.upstream_timeout(),
        fallback: FallbackPolicy {
            address: config.fallback_address,
        },
        enable_logging: config.logging.log_queries,
    };

    if let Err(e) = run_dns_server(listen_addr, settings, config.verify_upstream_source).await {
        error!(error = %e, "DNS server error");
        return Err(e);
    }

    Ok(())
}

/// Value of the option at `args[i]`, or usage and exit if it is missing.
fn require_value(args: &[String], i: usize) -> &str {
    match args.get(i) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Missing value for {}", args[i - 1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [options]", program);
    eprintln!();
    eprintln!("DNS forwarding resolver. Relays UDP queries to an upstream resolver");
    eprintln!("and answers with a fallback A record when the upstream has none.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --resolver <host:port>  Upstream DNS server (default: 8.8.8.8:53)");
    eprintln!("  --listen <addr>         Address to listen on (default: 127.0.0.1:2053)");
    eprintln!("  -c, --config <path>     Load config from YAML file (default: dnsrelay.yaml)");
    eprintln!("  -h, --help              Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --resolver 1.1.1.1:53", program);
    eprintln!("  {} --listen 0.0.0.0:5353 --resolver [2001:4860:4860::8888]:53", program);
    eprintln!("  {} --config dnsrelay.yaml", program);
    eprintln!();
    eprintln!("Client usage:");
    eprintln!("  dig @127.0.0.1 -p 2053 example.com");
}
