/*
 *  fetch.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Fetch orchestrator: one HTTP GET per wake cycle, streamed straight
 *  into the band pipeline
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::time::Duration;

use log::{debug, error, warn};
use reqwest::{Client, StatusCode, header};

use crate::band::{BandAssembler, BandBuffer, TransferOutcome};
use crate::config::Geometry;
use crate::display::DisplaySink;

/// Seam between the HTTP response body and the reassembler, so tests can
/// script arbitrary arrival patterns.
pub(crate) trait ChunkSource {
    /// Next slice of body bytes; `Ok(None)` means the connection closed.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ChunkError>;
}

#[derive(Debug)]
pub(crate) enum ChunkError {
    /// No data within the configured read bound
    TimedOut,
    /// Connection dropped or errored mid-body
    Transport(String),
}

/// HTTP client for the image endpoint, built once with the node's
/// timeouts and reused across wake cycles.
pub struct FetchClient {
    client: Client,
    read_timeout: Duration,
}

impl FetchClient {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/octet-stream"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .http1_only()
            .no_proxy() // the frame talks straight to its LAN server
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()
            .unwrap(); // acceptable at client initialization

        FetchClient { client, read_timeout }
    }

    /// One fetch attempt, one outcome. A non-OK status is an immediate
    /// error with zero bytes read; otherwise the body is drained through
    /// the band pipeline. The connection is released exactly once on
    /// every path - each branch either drops the response or hands it to
    /// the single streamed-drain scope below.
    pub async fn fetch_image(
        &self,
        url: &str,
        geom: Geometry,
        buf: &mut BandBuffer,
        sink: &mut dyn DisplaySink,
    ) -> TransferOutcome {
        debug!("GET {}", url);

        // the read bound covers the wait for headers too: generation on
        // the server side may be slow, but silence past it is a timeout
        let sent = tokio::time::timeout(self.read_timeout, self.client.get(url).send()).await;
        let resp = match sent {
            Err(_) => {
                warn!("image server sent no response within the read timeout");
                return TransferOutcome::Timeout;
            }
            Ok(Err(e)) if e.is_timeout() => {
                warn!("image request timed out: {}", e);
                return TransferOutcome::Timeout;
            }
            Ok(Err(e)) => {
                warn!("image request failed: {}", e);
                return TransferOutcome::HttpError(0);
            }
            Ok(Ok(resp)) => resp,
        };

        let status = resp.status();
        if status != StatusCode::OK {
            warn!("image server returned {}", status);
            return TransferOutcome::HttpError(status.as_u16());
        }

        let mut source = HttpChunkSource { resp, read_timeout: self.read_timeout };
        drain_stream(&mut source, buf, sink, geom).await
    }
}

struct HttpChunkSource {
    resp: reqwest::Response,
    read_timeout: Duration,
}

impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ChunkError> {
        match tokio::time::timeout(self.read_timeout, self.resp.chunk()).await {
            Err(_) => Err(ChunkError::TimedOut),
            Ok(Err(e)) if e.is_timeout() => Err(ChunkError::TimedOut),
            Ok(Err(e)) => Err(ChunkError::Transport(e.to_string())),
            Ok(Ok(chunk)) => Ok(chunk.map(|b| b.to_vec())),
        }
    }
}

/// Drain a chunk source through the band pipeline until it closes, then
/// let band accounting decide the outcome. A transport drop mid-body is
/// the same as a close: whatever arrived is what gets accounted.
pub(crate) async fn drain_stream<S: ChunkSource>(
    source: &mut S,
    buf: &mut BandBuffer,
    sink: &mut dyn DisplaySink,
    geom: Geometry,
) -> TransferOutcome {
    let mut asm = BandAssembler::new(buf, geom);
    loop {
        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = asm.feed(&chunk, sink) {
                    // panel is already partially overwritten; account the
                    // cycle as a failed transfer and let the retry rule run
                    error!("display sink rejected band: {}", e);
                    return TransferOutcome::Truncated(asm.bands_pushed());
                }
            }
            Ok(None) => break,
            Err(ChunkError::TimedOut) => {
                warn!("image stream stalled past the read timeout");
                return TransferOutcome::Timeout;
            }
            Err(ChunkError::Transport(e)) => {
                warn!("image stream dropped mid-transfer: {}", e);
                break;
            }
        }
    }
    asm.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayError;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // 2 bands of 4 bytes each
    const GEOM: Geometry = Geometry { width: 4, height: 4, band_height: 2 };

    struct CountingSink {
        pushes: usize,
    }

    impl DisplaySink for CountingSink {
        fn push_band(&mut self, band: &[u8], _dest_row: u32, rows: u32) -> Result<(), DisplayError> {
            assert_eq!(band.len(), rows as usize * 2);
            self.pushes += 1;
            Ok(())
        }
        fn clear_panel(&mut self) -> Result<(), DisplayError> { Ok(()) }
        fn overlay(&mut self, _text: &str) -> Result<(), DisplayError> { Ok(()) }
        fn present(&mut self) -> Result<(), DisplayError> { Ok(()) }
    }

    /// Scripted source; counts its own release so the one-release-per-fetch
    /// discipline is checkable on every outcome branch.
    struct ScriptedSource {
        script: VecDeque<Result<Option<Vec<u8>>, ChunkError>>,
        releases: Arc<AtomicUsize>,
    }

    impl ChunkSource for ScriptedSource {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ChunkError> {
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn run_script(
        script: Vec<Result<Option<Vec<u8>>, ChunkError>>,
    ) -> (TransferOutcome, usize, usize) {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut sink = CountingSink { pushes: 0 };
        let mut buf = BandBuffer::new(GEOM.band_bytes());
        let outcome = {
            let mut source = ScriptedSource {
                script: script.into_iter().collect(),
                releases: releases.clone(),
            };
            drain_stream(&mut source, &mut buf, &mut sink, GEOM).await
        };
        (outcome, sink.pushes, releases.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_irregular_chunks_complete_the_image() {
        let (outcome, pushes, releases) = run_script(vec![
            Ok(Some(vec![0; 3])),
            Ok(Some(vec![0; 1])),
            Ok(Some(vec![0; 4])),
            Ok(None),
        ])
        .await;
        assert_eq!(outcome, TransferOutcome::Success(2));
        assert_eq!(pushes, 2);
        assert_eq!(releases, 1);
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let (outcome, pushes, releases) = run_script(vec![
            Ok(Some(vec![0; 4])),
            Err(ChunkError::TimedOut),
        ])
        .await;
        assert_eq!(outcome, TransferOutcome::Timeout);
        assert_eq!(pushes, 1);
        assert_eq!(releases, 1);
    }

    #[tokio::test]
    async fn test_transport_drop_counts_as_truncation() {
        let (outcome, pushes, releases) = run_script(vec![
            Ok(Some(vec![0; 5])),
            Err(ChunkError::Transport("connection reset".into())),
        ])
        .await;
        assert_eq!(outcome, TransferOutcome::Truncated(1));
        assert_eq!(pushes, 1);
        assert_eq!(releases, 1);
    }

    #[tokio::test]
    async fn test_oversized_body_is_flagged() {
        let (outcome, pushes, releases) = run_script(vec![
            Ok(Some(vec![0; 8])),
            Ok(Some(vec![0; 2])),
            Ok(None),
        ])
        .await;
        assert_eq!(outcome, TransferOutcome::Oversized(2));
        assert_eq!(pushes, 2);
        assert_eq!(releases, 1);
    }
}
