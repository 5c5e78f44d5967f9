//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    stream: StreamInfo,
    resolve: ResolveInfo,
    pacing: PacingInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    consumers: Vec<ConsumerInfo>,
}

#[derive(Serialize)]
struct StreamInfo {
    name: String,
    stream_type: String,
    channel_count: usize,
    device_channels: usize,
    rate_hz: f64,
    source_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channel_labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

#[derive(Serialize)]
struct ResolveInfo {
    property: String,
    value: String,
    timeout_secs: f64,
}

#[derive(Serialize)]
struct PacingInfo {
    interval_ms: f64,
    failure_threshold: u32,
    pull_timeout_ms: u64,
}

#[derive(Serialize)]
struct ConsumerInfo {
    name: String,
    kind: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &contracts::RelayConfig, args: &InfoArgs) -> ConfigInfo {
    let descriptor = config.descriptor();

    let channel_labels = if args.channels {
        descriptor.resolved_labels()
    } else {
        Vec::new()
    };

    let consumers = if args.consumers {
        config
            .consumers
            .iter()
            .map(|c| ConsumerInfo {
                name: c.name.clone(),
                kind: format!("{:?}", c.kind),
                queue_capacity: c.queue_capacity,
                params: c.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        stream: StreamInfo {
            name: config.stream.name.clone(),
            stream_type: config.stream.stream_type.clone(),
            channel_count: config.stream.channel_count,
            device_channels: config.device_channels(),
            rate_hz: config.stream.rate_hz,
            source_id: descriptor.source_id.clone(),
            channel_labels,
            unit: config.stream.unit.clone(),
        },
        resolve: ResolveInfo {
            property: config.resolve.property.clone(),
            value: config.resolve_value(),
            timeout_secs: config.resolve.timeout_secs,
        },
        pacing: PacingInfo {
            interval_ms: descriptor.sample_interval().as_secs_f64() * 1000.0,
            failure_threshold: config.pacing.failure_threshold,
            pull_timeout_ms: config.pacing.pull_timeout_ms,
        },
        consumers,
    }
}

fn print_config_info(config: &contracts::RelayConfig, args: &InfoArgs) {
    let descriptor = config.descriptor();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Stream Relay Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Stream info
    println!("📡 Stream");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ Name: {} ({})",
        config.stream.name, config.stream.stream_type
    );
    println!("   ├─ Source ID: {}", descriptor.source_id);
    println!(
        "   ├─ Channels: {} ({} device)",
        config.stream.channel_count,
        config.device_channels()
    );
    if let Some(ref unit) = config.stream.unit {
        println!("   ├─ Unit: {}", unit);
    }
    if config.stream.rate_hz > 0.0 {
        println!("   └─ Rate: {} Hz", config.stream.rate_hz);
    } else {
        println!("   └─ Rate: irregular (paced at the 100 Hz default)");
    }

    if args.channels {
        let labels = descriptor.resolved_labels();
        println!("\n🏷  Channels ({})", labels.len());
        for (i, label) in labels.iter().enumerate() {
            let prefix = if i == labels.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!("   {} {}", prefix, label);
        }
    }

    // Resolve query
    println!("\n🔎 Resolve");
    println!(
        "   ├─ Query: {} = \"{}\"",
        config.resolve.property,
        config.resolve_value()
    );
    println!("   └─ Timeout: {}s", config.resolve.timeout_secs);

    // Pacing policy
    println!("\n⏱  Pacing");
    println!(
        "   ├─ Interval: {:.3} ms",
        descriptor.sample_interval().as_secs_f64() * 1000.0
    );
    println!(
        "   ├─ Failure threshold: {}",
        config.pacing.failure_threshold
    );
    println!("   └─ Pull timeout: {} ms", config.pacing.pull_timeout_ms);

    // Consumers
    if !config.consumers.is_empty() {
        println!("\n📤 Consumers ({})", config.consumers.len());
        for (i, consumer) in config.consumers.iter().enumerate() {
            let is_last = i == config.consumers.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, consumer.name, consumer.kind, consumer.queue_capacity
            );

            if args.consumers && !consumer.params.is_empty() {
                let child_prefix = if is_last { "   " } else { "│  " };
                for (key, value) in &consumer.params {
                    println!("   {}     {} = {}", child_prefix, key, value);
                }
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_build_config_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(
            &path,
            r#"
[stream]
name = "SimpleStream"
stream_type = "EEG"
channel_count = 4
rate_hz = 100.0
channel_labels = ["C3", "C4"]
device_channels = 2

[[consumers]]
name = "console"
kind = "console"
"#,
        )
        .unwrap();

        let config = config_loader::ConfigLoader::load_from_path(&path).unwrap();
        let args = InfoArgs {
            config: PathBuf::from(&path),
            json: true,
            channels: true,
            consumers: true,
        };

        let info = build_config_info(&config, &args);
        assert_eq!(info.stream.channel_count, 4);
        assert_eq!(info.stream.device_channels, 2);
        assert_eq!(
            info.stream.channel_labels,
            vec!["C3", "C4", "Chan-3", "Chan-4"]
        );
        assert_eq!(info.resolve.value, "EEG");
        assert!((info.pacing.interval_ms - 10.0).abs() < 1e-9);
        assert_eq!(info.consumers.len(), 1);
    }
}
