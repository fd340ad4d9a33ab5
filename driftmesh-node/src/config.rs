//! File-backed node configuration, layered over `driftmesh_engine::Config`
//! and adding server-only concerns (log level, CLA binding) on top.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use driftmesh_bundle::{Eid, Scheme};
use serde::{Deserialize, Serialize};
use tracing::Level;

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_discovery_period_s() -> u32 {
    driftmesh_bundle::CONTACT_PERIOD_SECONDS
}

fn default_retransmit_period_s() -> u32 {
    300
}

fn default_store_capacity() -> usize {
    driftmesh_bundle::MAX_BUNDLES
}

fn default_lifetime_s() -> u8 {
    60
}

fn default_queue_capacity() -> usize {
    64
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:9876".parse().unwrap()
}

fn default_broadcast_addr() -> SocketAddr {
    "255.255.255.255:9876".parse().unwrap()
}

fn default_echo_service_num() -> u32 {
    7
}

/// The node's own endpoint identity. Exactly one of `ipn`/`dtn` is
/// populated, matching `scheme`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum EndpointConfig {
    Ipn { node: u32, service: u32 },
    Dtn { id: String },
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig::Ipn { node: 1, service: 0 }
    }
}

impl EndpointConfig {
    pub fn to_eid(&self) -> Eid {
        match self {
            EndpointConfig::Ipn { node, service } => Eid::Ipn { node: *node, service: *service },
            EndpointConfig::Dtn { id } => Eid::Dtn(id.clone()),
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            EndpointConfig::Ipn { .. } => Scheme::Ipn,
            EndpointConfig::Dtn { .. } => Scheme::Dtn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub node: EndpointConfig,

    /// Whether this node has a wall clock available; nodes without one
    /// use a bundle-age counter only.
    pub has_clock: bool,

    #[serde(default = "default_discovery_period_s")]
    pub discovery_period_s: u32,

    #[serde(default = "default_retransmit_period_s")]
    pub retransmit_period_s: u32,

    #[serde(default = "default_store_capacity")]
    pub store_capacity: usize,

    #[serde(default = "default_lifetime_s")]
    pub default_lifetime_s: u8,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: SocketAddr,

    /// Service number the bundled echo application registers on.
    #[serde(default = "default_echo_service_num")]
    pub echo_service_num: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            node: EndpointConfig::default(),
            has_clock: false,
            discovery_period_s: default_discovery_period_s(),
            retransmit_period_s: default_retransmit_period_s(),
            store_capacity: default_store_capacity(),
            default_lifetime_s: default_lifetime_s(),
            queue_capacity: default_queue_capacity(),
            bind_addr: default_bind_addr(),
            broadcast_addr: default_broadcast_addr(),
            echo_service_num: default_echo_service_num(),
        }
    }
}

impl NodeConfig {
    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }

    pub fn engine_config(&self) -> driftmesh_engine::Config {
        let mut config = driftmesh_engine::Config::new(self.node.to_eid());
        config.has_clock = self.has_clock;
        config.discovery_period_s = self.discovery_period_s;
        config.retransmit_period_s = self.retransmit_period_s;
        config.store_capacity = self.store_capacity;
        config.default_lifetime_s = self.default_lifetime_s;
        config.queue_capacity = self.queue_capacity;
        config
    }
}

fn options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.optflag("h", "help", "print this help menu")
        .optflag("v", "version", "print the version information")
        .optopt("c", "config", "use a custom configuration file", "FILE");
    opts
}

pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("net", "driftmesh", env!("CARGO_PKG_NAME")).map_or_else(
        || std::path::Path::new("/etc").join(env!("CARGO_PKG_NAME")),
        |dirs| dirs.config_local_dir().to_path_buf(),
    )
}

/// Parses the command line and loads configuration: explicit `--config`
/// flag, then `DRIFTMESH_NODE_CONFIG_FILE`, then the platform config
/// directory, all overridable by `DRIFTMESH_NODE_*` environment
/// variables. Returns `None` if `--help`/`--version` was requested (the
/// caller should exit with success in that case).
pub fn init() -> Option<(NodeConfig, String)> {
    let opts = options();
    let args: Vec<String> = std::env::args().collect();
    let flags = opts.parse(&args[1..]).expect("failed to parse command line args");

    if flags.opt_present("h") {
        let brief = format!(
            "{} {} - {}\n\nUsage: {} [options]",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION"),
            args[0]
        );
        print!("{}", opts.usage(&brief));
        return None;
    }
    if flags.opt_present("v") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return None;
    }

    let mut builder = ::config::Config::builder();
    let config_source;
    if let Some(source) = flags.opt_str("config") {
        config_source = format!("using configuration file '{source}' specified on command line");
        builder = builder.add_source(::config::File::with_name(&source));
    } else if let Ok(source) = std::env::var("DRIFTMESH_NODE_CONFIG_FILE") {
        config_source =
            format!("using configuration file '{source}' specified by DRIFTMESH_NODE_CONFIG_FILE");
        builder = builder.add_source(::config::File::with_name(&source));
    } else {
        let path = config_dir().join(format!("{}.toml", env!("CARGO_PKG_NAME")));
        config_source = format!("using configuration file '{}' (if present)", path.display());
        builder = builder.add_source(::config::File::from(path).required(false));
    }
    builder = builder.add_source(::config::Environment::with_prefix("DRIFTMESH_NODE"));

    let node_config: NodeConfig = builder
        .build()
        .expect("failed to read configuration")
        .try_deserialize()
        .expect("failed to parse configuration");

    Some((node_config, config_source))
}
