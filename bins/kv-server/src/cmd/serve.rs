use std::sync::Arc;

use rand::distributions::{Alphanumeric, Distribution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use kvbench_api::{Layout, MemoryKv, WireError};

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

/// Counters of one serving session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub replied: u64,
    pub malformed: u64,
    pub io_errors: u64,
}

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("kv-server starting");

    let config = ServerConfig::resolve(&args)?;
    let layout = Layout::new(config.value_size);
    let kv = Arc::new(MemoryKv::new(config.value_size));

    // --- Preload ---
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    preload(&kv, config.preload, config.key_space, &mut rng);
    tracing::info!(keys = kv.len(), requested = config.preload, "preloaded store");

    // --- Bind ---
    let addr = format!("{}:{}", config.host, config.port);
    let socket = UdpSocket::bind(addr.as_str())
        .await
        .map_err(|e| ServerError::Bind { addr: addr.clone(), source: e })?;
    tracing::info!(
        addr = %addr,
        value_size = config.value_size,
        frame_len = layout.frame_len(),
        "server ready"
    );

    let token = CancellationToken::new();
    let handle = tokio::spawn(serve_socket(socket, kv, layout, token.clone()));

    // --- Wait for Ctrl+C ---
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down...");
    token.cancel();

    let stats = handle.await?;
    tracing::info!(
        replied = stats.replied,
        malformed = stats.malformed,
        io_errors = stats.io_errors,
        "shutdown complete"
    );
    Ok(())
}

/// Writes `count` random key/value pairs, keys drawn from `0..key_space`.
pub fn preload<R: Rng + ?Sized>(kv: &MemoryKv, count: usize, key_space: u32, rng: &mut R) {
    if key_space == 0 {
        return;
    }
    let mut value = vec![0u8; kv.value_size()];
    for _ in 0..count {
        let key = rng.gen_range(0..key_space);
        for b in value.iter_mut() {
            *b = Alphanumeric.sample(rng);
        }
        kv.put(key, &value);
    }
}

/// Decodes one request, applies it to the store and encodes the reply into
/// `out`.
pub fn handle_datagram(kv: &MemoryKv, layout: Layout, request: &[u8], out: &mut Vec<u8>) -> Result<(), WireError> {
    let request = layout.decode(request)?;
    let reply = kv.apply(&request);
    layout.encode(&reply, out)
}

/// Answers requests on `socket` until `token` is cancelled.
pub async fn serve_socket(
    socket: UdpSocket,
    kv: Arc<MemoryKv>,
    layout: Layout,
    token: CancellationToken,
) -> ServeStats {
    let mut stats = ServeStats::default();
    // one spare byte so oversized datagrams fail the length check
    let mut buf = vec![0u8; layout.frame_len() + 1];
    let mut out = Vec::with_capacity(layout.frame_len());

    loop {
        let (n, peer) = tokio::select! {
            _ = token.cancelled() => break,
            res = socket.recv_from(&mut buf) => match res {
                Ok(r) => r,
                Err(e) => {
                    stats.io_errors += 1;
                    tracing::warn!(error = %e, "recv error");
                    continue;
                }
            },
        };

        if let Err(e) = handle_datagram(&kv, layout, &buf[..n], &mut out) {
            stats.malformed += 1;
            tracing::debug!(peer = %peer, error = %e, len = n, "dropping malformed request");
            continue;
        }

        match socket.send_to(&out, peer).await {
            Ok(_) => stats.replied += 1,
            Err(e) => {
                stats.io_errors += 1;
                tracing::warn!(peer = %peer, error = %e, "send error");
            }
        }
    }
    stats
}
