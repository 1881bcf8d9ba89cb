/*!
 * Client Sessions
 * One request/response loop per accepted connection
 */

use super::dispatch::handle_request;
use crate::memory::MemoryManager;
use crate::protocol::{read_frame, write_frame};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Per-session limits
#[derive(Debug, Clone, Copy)]
pub(super) struct SessionLimits {
    pub idle_timeout: Duration,
    pub max_frame_len: usize,
}

/// Serve one connection until the peer closes, errs, or idles out
///
/// Nothing outlives the session; the socket is closed on return.
pub(super) async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    memory: MemoryManager,
    limits: SessionLimits,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "Could not disable Nagle");
    }
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut served: u64 = 0;

    loop {
        let payload = match tokio::time::timeout(
            limits.idle_timeout,
            read_frame(&mut reader, limits.max_frame_len),
        )
        .await
        {
            Err(_) => {
                info!(%peer, served, "Closing idle session");
                break;
            }
            Ok(Ok(None)) => {
                debug!(%peer, served, "Peer closed session");
                break;
            }
            Ok(Ok(Some(payload))) => payload,
            Ok(Err(e)) => {
                warn!(%peer, error = %e, "Session read failed");
                break;
            }
        };

        let response = handle_request(&memory, &payload);
        if let Err(e) = write_frame(&mut writer, &response.encode(), limits.max_frame_len).await {
            warn!(%peer, error = %e, "Session write failed");
            break;
        }
        served += 1;
    }
}
