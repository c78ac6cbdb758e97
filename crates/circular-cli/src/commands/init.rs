//! `circular init`: write a default node configuration.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Path to the Core Lightning RPC socket.
    #[arg(long, default_value = ".lightning/bitcoin/lightning-rpc")]
    pub rpc_path: PathBuf,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join("circular.toml");

    if config_path.exists() {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    std::fs::create_dir_all(&args.dir)?;
    std::fs::write(&config_path, default_config(&args.rpc_path))?;
    println!("Initialized Circular node at {}", config_path.display());
    println!("Edit circular.toml to customize your configuration.");
    println!("Run 'circular-node --config {}' to start the node.", config_path.display());

    std::fs::create_dir_all(args.dir.join("data"))?;
    Ok(())
}

fn default_config(rpc_path: &std::path::Path) -> String {
    format!(
        r#"# Circular Node Configuration

[lightning]
rpc_path = "{}"

[refresh]
graph_interval_secs = 600
peer_interval_secs = 30
stats_interval_secs = 600

[storage]
data_dir = "./data"
graph_file = "graph.json"

[rebalance]
max_hops_ceiling = 10
hop_step = 1
final_cltv_delta = 9
payment_timeout_secs = 60
attempt_deadline_secs = 300
default_max_ppm = 1000
default_initial_max_hops = 3

[aging]
average_msat = 10000000
variance_msat = 5000000

[api]
listen_addr = "127.0.0.1"
port = 9101

[logging]
level = "info"
format = "text"
"#,
        rpc_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid_toml() {
        let text = default_config(std::path::Path::new("/tmp/lightning-rpc"));
        let value: toml::Table = toml::from_str(&text).unwrap();
        assert_eq!(value["api"]["port"].as_integer(), Some(9101));
        assert_eq!(
            value["lightning"]["rpc_path"].as_str(),
            Some("/tmp/lightning-rpc")
        );
    }
}
