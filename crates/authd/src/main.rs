use clap::Parser;
use std::collections::HashSet;
use std::env;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process;
use tokio::net::{TcpListener, UdpSocket};
use tracing_subscriber::EnvFilter;

use dns_store::loader;
use dns_store::store::SharedStore;

mod mgmt;
mod query;
mod shutdown;

use mgmt::{listen_mgmt_task, ManagementContext};
use query::listen_udp_task;
use shutdown::{watch_for_signals, ShutdownFlag};

/// Read the mappings document and build the initial store.  Any
/// failure here is fatal: better to not start than to start
/// authoritative over nothing.
async fn load_initial_store(args: &Args) -> Option<SharedStore> {
    let text = match tokio::fs::read_to_string(&args.mappings_file).await {
        Ok(text) => text,
        Err(error) => {
            tracing::error!(path = %args.mappings_file.display(), ?error, "could not read mappings file");
            return None;
        }
    };

    let batch = match loader::parse_document(&text) {
        Ok(batch) => batch,
        Err(error) => {
            tracing::error!(path = %args.mappings_file.display(), %error, "could not load mappings");
            return None;
        }
    };

    let store = SharedStore::new();
    let result = store.write().replace_all(batch);
    match result {
        Ok(()) => Some(store),
        Err(error) => {
            tracing::error!(%error, "could not populate store");
            None
        }
    }
}

fn begin_logging() {
    let log_format = if let Ok(var) = env::var("RUST_LOG_FORMAT") {
        let mut set = HashSet::new();
        for s in var.split(',') {
            set.insert(s.to_string());
        }
        set
    } else {
        HashSet::new()
    };

    let logger = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(!log_format.contains("no-ansi"));

    if log_format.contains("json") {
        if log_format.contains("no-time") {
            logger.json().without_time().init();
        } else {
            logger.json().init();
        }
    } else if log_format.contains("pretty") {
        if log_format.contains("no-time") {
            logger.pretty().without_time().init();
        } else {
            logger.pretty().init();
        }
    } else if log_format.contains("compact") {
        if log_format.contains("no-time") {
            logger.compact().without_time().init();
        } else {
            logger.compact().init();
        }
    } else if log_format.contains("no-time") {
        logger.without_time().init();
    } else {
        logger.init();
    }
}

// the doc comments for this struct turn into the CLI help text
#[derive(Debug, Parser)]
/// An authoritative DNS server for statically-configured zones.
///
/// authd answers UDP queries for A, AAAA, CNAME, MX, NS, TXT, and SRV
/// records from an in-memory store loaded from a JSON mappings
/// document, with exact, subdomain, and wildcard matching.
///
/// A TCP management interface allows records to be added, deleted,
/// listed, and reloaded from the document without restarting the
/// server.
///
/// It is not a recursive resolver: names it does not know get
/// NXDOMAIN, and CNAME targets are not chased.
#[derive(Clone)]
struct Args {
    /// Interface to listen on
    #[clap(short, long, value_parser, default_value_t = Ipv4Addr::UNSPECIFIED)]
    interface: Ipv4Addr,

    /// Port to answer DNS queries on
    #[clap(short = 'p', long, value_parser, default_value_t = 2053)]
    dns_port: u16,

    /// Port for the management interface
    #[clap(short = 'm', long, value_parser, default_value_t = 8053)]
    mgmt_port: u16,

    /// Path to the JSON mappings document
    #[clap(short = 'f', long, value_parser, default_value = "dns_mappings.json")]
    mappings_file: PathBuf,

    /// TTL for every answer, in seconds
    #[clap(short = 't', long, value_parser, default_value_t = 3600)]
    default_ttl: u32,

    /// Shared secret for the management interface
    #[clap(long, value_parser, env = "AUTHD_AUTH_TOKEN", default_value = "123456")]
    auth_token: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    begin_logging();

    tracing::info!(path = %args.mappings_file.display(), "loading mappings");
    let store = match load_initial_store(&args).await {
        Some(store) => store,
        None => process::exit(1),
    };

    tracing::info!(interface = %args.interface, port = %args.dns_port, "binding DNS UDP socket");
    let udp = match UdpSocket::bind((args.interface, args.dns_port)).await {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(?error, "could not bind DNS UDP socket");
            process::exit(1);
        }
    };

    tracing::info!(interface = %args.interface, port = %args.mgmt_port, "binding management TCP socket");
    let tcp = match TcpListener::bind((args.interface, args.mgmt_port)).await {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(?error, "could not bind management TCP socket");
            process::exit(1);
        }
    };

    let shutdown = ShutdownFlag::new();
    tokio::spawn(watch_for_signals(shutdown.clone()));

    let ctx = ManagementContext {
        store: store.clone(),
        auth_token: args.auth_token.clone(),
        mappings_file: args.mappings_file.clone(),
    };

    let udp_task = tokio::spawn(listen_udp_task(
        udp,
        store.clone(),
        shutdown.clone(),
        args.default_ttl,
    ));
    let mgmt_task = tokio::spawn(listen_mgmt_task(tcp, ctx, shutdown.clone()));

    tracing::info!(records = %store.read().len(), "authd running");

    // both loops drain their in-flight request before returning
    let _ = udp_task.await;
    let _ = mgmt_task.await;

    tracing::info!("shutdown complete");
}
