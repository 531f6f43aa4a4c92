//! The UDP query server: receive a datagram, decode it, resolve it
//! against the store, and send the response back to the peer.

use tokio::net::UdpSocket;
use tokio::time::timeout;

use dns_store::resolve::resolve;
use dns_store::store::SharedStore;
use dns_wire::protocol::serialise::{encode_error_response, encode_response, MAX_RESPONSE_LEN};
use dns_wire::protocol::types::{Header, Opcode, Query, Rcode};

use crate::shutdown::{ShutdownFlag, SHUTDOWN_POLL_INTERVAL};

/// Receive-and-respond loop.  Errors during a single request are
/// logged and never terminate the loop; the loop only ends when the
/// shutdown flag is set.
pub async fn listen_udp_task(
    socket: UdpSocket,
    store: SharedStore,
    shutdown: ShutdownFlag,
    default_ttl: u32,
) {
    let mut buf = [0u8; MAX_RESPONSE_LEN];

    while !shutdown.is_set() {
        let (size, peer) = match timeout(SHUTDOWN_POLL_INTERVAL, socket.recv_from(&mut buf)).await {
            Err(_elapsed) => continue,
            Ok(Err(error)) => {
                tracing::warn!(?error, "UDP recv error");
                continue;
            }
            Ok(Ok(received)) => received,
        };

        tracing::debug!(?peer, %size, "UDP request");

        if let Some(response) = handle_datagram(&store, &buf[..size], default_ttl) {
            if let Err(error) = socket.send_to(&response, peer).await {
                tracing::warn!(?peer, ?error, "UDP send error");
            }
        }
    }

    tracing::info!("UDP query loop stopped");
}

/// Decode, resolve, and encode one datagram.  `None` means the
/// datagram was too mangled to even answer with a format error.
///
/// The read lock is held across the whole resolve-and-encode window,
/// so the response is serialised from values that cannot be swapped
/// out underneath it.
pub fn handle_datagram(store: &SharedStore, datagram: &[u8], default_ttl: u32) -> Option<Vec<u8>> {
    let query = match Query::parse(datagram) {
        Ok(query) => query,
        Err(error) => {
            tracing::info!(%error, "malformed query");
            return error
                .id()
                .map(|id| encode_error_response(Header::format_error(id), &[]));
        }
    };

    let question = &datagram[12..12 + query.question_len];

    if query.header.is_response {
        tracing::info!(id = %query.header.id, "response-flagged packet");
        return Some(encode_error_response(
            Header::format_error(query.header.id),
            &[],
        ));
    }

    if query.header.opcode != Opcode::Standard {
        tracing::info!(opcode = ?query.header.opcode, "unsupported opcode");
        return Some(encode_error_response(
            query.header.response(Rcode::NotImplemented),
            question,
        ));
    }

    if query.qclass.is_unknown() {
        tracing::info!(name = %query.name, qclass = %u16::from(query.qclass), "refusing non-IN class");
        return Some(encode_error_response(
            query.header.response(Rcode::Refused),
            question,
        ));
    }

    if query.qtype.is_unknown() {
        tracing::info!(name = %query.name, qtype = %query.qtype, "unsupported query type");
        return Some(encode_error_response(
            query.header.response(Rcode::NotImplemented),
            question,
        ));
    }

    let store = store.read();
    match resolve(&store, &query.name, query.qtype) {
        Some(record) => {
            let response = encode_response(
                query.header.response(Rcode::NoError),
                question,
                &record.values,
                default_ttl,
            );
            if response.truncated {
                tracing::warn!(name = %query.name, qtype = %query.qtype, "response truncated");
            }
            tracing::info!(name = %query.name, qtype = %query.qtype, answers = %response.answer_count, "resolved");
            Some(response.octets)
        }
        None => {
            tracing::info!(name = %query.name, qtype = %query.qtype, "no match");
            Some(encode_error_response(
                query.header.response(Rcode::NameError),
                question,
            ))
        }
    }
}
