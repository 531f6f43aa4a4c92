//! The TCP management server: ADD, DELETE, LIST, and RELOAD against
//! the live record store.
//!
//! The protocol is a single line-oriented exchange per connection:
//! the client sends `<auth-token> <COMMAND> [args...]`, the server
//! replies with lines starting `SUCCESS:` or `ERROR:`, and the
//! connection closes.  Connections are handled one at a time: the
//! control plane is low-volume by design.

use std::io;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use dns_store::loader;
use dns_store::store::{RecordKey, RecordScope, SharedStore};
use dns_wire::protocol::types::{DomainName, RecordData, RecordType};

use crate::shutdown::{ShutdownFlag, SHUTDOWN_POLL_INTERVAL};

/// What the management handlers need: the store, the shared secret,
/// and the document to reload from.
#[derive(Debug, Clone)]
pub struct ManagementContext {
    pub store: SharedStore,
    pub auth_token: String,
    pub mappings_file: PathBuf,
}

/// Accept-and-respond loop.  Per-connection errors are logged and
/// never terminate the loop; the loop only ends when the shutdown
/// flag is set.
pub async fn listen_mgmt_task(
    listener: TcpListener,
    ctx: ManagementContext,
    shutdown: ShutdownFlag,
) {
    while !shutdown.is_set() {
        let (stream, peer) = match timeout(SHUTDOWN_POLL_INTERVAL, listener.accept()).await {
            Err(_elapsed) => continue,
            Ok(Err(error)) => {
                tracing::warn!(?error, "management accept error");
                continue;
            }
            Ok(Ok(accepted)) => accepted,
        };

        tracing::info!(?peer, "management connection");

        if let Err(error) = handle_connection(stream, &ctx).await {
            tracing::warn!(?peer, ?error, "management connection error");
        }
    }

    tracing::info!("management loop stopped");
}

async fn handle_connection(mut stream: TcpStream, ctx: &ManagementContext) -> io::Result<()> {
    let mut buf = [0u8; 1024];
    let size = stream.read(&mut buf).await?;
    let line = String::from_utf8_lossy(&buf[..size]);

    let response = handle_command(ctx, &line).await;
    stream.write_all(response.as_bytes()).await?;

    Ok(())
}

/// Authenticate and dispatch one command line.  The line is split
/// into whitespace fields exactly once; handlers index into the
/// fields rather than re-tokenising.
pub async fn handle_command(ctx: &ManagementContext, line: &str) -> String {
    let fields: Vec<&str> = line.split_whitespace().collect();

    match fields.first() {
        Some(token) if *token == ctx.auth_token => (),
        _ => {
            tracing::warn!("management authentication failure");
            return "ERROR: Authentication failed\n".to_string();
        }
    }

    let Some(command) = fields.get(1) else {
        return "ERROR: No command specified\n".to_string();
    };

    match command.to_ascii_uppercase().as_str() {
        "ADD" => handle_add(ctx, &fields[2..]),
        "DELETE" => handle_delete(ctx, &fields[2..]),
        "LIST" => handle_list(ctx),
        "RELOAD" => handle_reload(ctx).await,
        _ => "ERROR: Unknown command\n".to_string(),
    }
}

/// Parse the `<domain> <type> <scope>` triple shared by ADD and
/// DELETE.  Domain and scope casing is normalised away.
fn parse_key(args: &[&str]) -> Result<RecordKey, String> {
    let Some(name) = DomainName::from_dotted_string(args[0]) else {
        return Err(format!("ERROR: Invalid domain name '{}'\n", args[0]));
    };
    let Some(rtype) = RecordType::from_mnemonic(args[1]) else {
        return Err(format!("ERROR: Unsupported record type '{}'\n", args[1]));
    };
    let Some(scope) = RecordScope::from_token(args[2]) else {
        return Err(format!("ERROR: Invalid scope '{}'\n", args[2]));
    };

    Ok(RecordKey::new(scope, name, rtype))
}

fn handle_add(ctx: &ManagementContext, args: &[&str]) -> String {
    if args.len() < 4 {
        return "ERROR: Missing parameters. Usage: ADD domain type scope value\n".to_string();
    }

    let key = match parse_key(args) {
        Ok(key) => key,
        Err(response) => return response,
    };

    // everything after the scope is the value, eg a TXT payload with
    // spaces in it
    let value = args[3..].join(" ");
    let data = match RecordData::parse(key.rtype, &value) {
        Ok(data) => data,
        Err(error) => return format!("ERROR: {error}\n"),
    };

    let result = ctx.store.write().put(key.clone(), vec![data]);
    match result {
        Ok(()) => {
            tracing::info!(name = %key.name, rtype = %key.rtype, scope = %key.scope, "record added");
            "SUCCESS: Record added\n".to_string()
        }
        Err(error) => format!("ERROR: {error}\n"),
    }
}

fn handle_delete(ctx: &ManagementContext, args: &[&str]) -> String {
    if args.len() < 3 {
        return "ERROR: Missing parameters. Usage: DELETE domain type scope\n".to_string();
    }

    let key = match parse_key(args) {
        Ok(key) => key,
        Err(response) => return response,
    };

    let result = ctx.store.write().remove(&key);
    match result {
        Ok(()) => {
            tracing::info!(name = %key.name, rtype = %key.rtype, scope = %key.scope, "record deleted");
            "SUCCESS: Record deleted\n".to_string()
        }
        Err(_) => "ERROR: Record not found\n".to_string(),
    }
}

fn handle_list(ctx: &ManagementContext) -> String {
    let entries = ctx.store.read().snapshot();

    let mut out = format!("SUCCESS: {} records\n", entries.len());
    for (key, record) in entries {
        let values: Vec<String> = record.values.iter().map(ToString::to_string).collect();
        out.push_str(&format!(
            "{} {} {} {}\n",
            key.name,
            key.rtype,
            key.scope,
            values.join(", ")
        ));
    }

    out
}

/// Re-run the loader against the configured document and swap the
/// result in.  The parse happens outside the lock, so concurrent
/// readers see either the old contents or the new, never a mix.  On
/// failure the store is left empty; the operator corrects the
/// document and reloads again.
async fn handle_reload(ctx: &ManagementContext) -> String {
    let batch = match tokio::fs::read_to_string(&ctx.mappings_file).await {
        Ok(text) => loader::parse_document(&text).map_err(|e| e.to_string()),
        Err(error) => Err(error.to_string()),
    };

    match batch {
        Ok(batch) => {
            let count = batch.len();
            let result = ctx.store.write().replace_all(batch);
            match result {
                Ok(()) => {
                    tracing::info!(records = %count, "configuration reloaded");
                    "SUCCESS: Configuration reloaded\n".to_string()
                }
                Err(error) => {
                    ctx.store.write().clear();
                    tracing::error!(%error, "reload failed, store emptied");
                    format!("ERROR: Failed to reload configuration: {error}\n")
                }
            }
        }
        Err(error) => {
            ctx.store.write().clear();
            tracing::error!(%error, "reload failed, store emptied");
            format!("ERROR: Failed to reload configuration: {error}\n")
        }
    }
}
