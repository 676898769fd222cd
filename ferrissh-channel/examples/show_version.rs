//! Connect over SSH or telnet and run one command.
//!
//! Shows the raw channel contract: open, write, pattern read, timing read,
//! liveness check and close. Traffic is copied to a session log printed at
//! the end.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example show_version -- --host 192.168.1.1 --user admin --password secret
//! cargo run --example show_version -- --telnet --host 192.168.1.1 --user admin --password secret
//! ```
//!
//! Set `RUST_LOG=ferrissh_channel=debug` to see every read and write.

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferrissh_channel::channel::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use ferrissh_channel::{
    AnyChannel, Channel, ChannelConfig, ChannelOptions, ExpectFlags, SessionLog, SshConfig,
    TelnetConfig,
};

/// Session log kept in memory and printed on exit.
#[derive(Default)]
struct MemoryLog {
    contents: Mutex<String>,
}

impl SessionLog for MemoryLog {
    fn write(&self, data: &str) {
        if let Ok(mut contents) = self.contents.lock() {
            contents.push_str(data);
        }
    }

    fn fin(&self) -> bool {
        false
    }

    fn record_writes(&self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = if args.telnet {
        let password = args.password.clone().unwrap_or_default();
        ChannelConfig::Telnet(
            TelnetConfig::new(&args.host, &args.user, password)
                .port(args.port.unwrap_or(23))
                .timeout(Duration::from_secs(args.timeout)),
        )
    } else {
        let mut ssh = SshConfig::new(&args.host, &args.user)
            .port(args.port.unwrap_or(22))
            .conn_timeout(Duration::from_secs(args.timeout));
        if let Some(password) = &args.password {
            ssh = ssh.password(password);
        }
        if let Some(key) = &args.key {
            ssh = ssh.key_file(key, None);
        }
        ChannelConfig::Ssh(ssh)
    };

    let session_log = Arc::new(MemoryLog::default());
    let options = ChannelOptions::new(&args.device_type).session_log(session_log.clone());
    let mut channel = AnyChannel::new(config, options);

    println!("Connecting to {} over {}...", args.host, channel.protocol());
    channel.establish_connection(DEFAULT_WIDTH, DEFAULT_HEIGHT).await?;

    // Whatever the device printed after login, up to its prompt.
    channel.write_channel("\n").await?;
    let banner = channel
        .read_channel_expect(r"[>#$]\s*$", Duration::from_secs(10), ExpectFlags::NONE)
        .await?;
    println!("Prompt: {}", banner.trim());

    channel.write_channel(&format!("{}\n", args.command)).await?;
    let output = channel
        .read_channel_timing(1.0, Duration::from_secs(120))
        .await?;
    println!("{}", "-".repeat(50));
    println!("{}", output);
    println!("{}", "-".repeat(50));

    println!("Alive: {}", channel.is_alive().await);
    channel.close().await;

    if let Ok(contents) = session_log.contents.lock() {
        println!("Session log captured {} bytes", contents.len());
    }
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: Option<u16>,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    telnet: bool,
    device_type: String,
    command: String,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Args {
            host: "localhost".to_string(),
            port: None,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            telnet: false,
            device_type: "cisco_ios".to_string(),
            command: "show version".to_string(),
            timeout: 10,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => parsed.port = value.and_then(|v| v.parse().ok()),
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--device-type" | "-d" => parsed.device_type = value.unwrap_or(parsed.device_type),
                "--command" | "-c" => parsed.command = value.unwrap_or(parsed.command),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(10)
                }
                "--telnet" => {
                    parsed.telnet = true;
                    i += 1;
                    continue;
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }
}
