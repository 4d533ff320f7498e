use alloc::{string::String, vec::Vec};

use embassy_net::{
    Stack,
    dns::DnsSocket,
    tcp::client::{TcpClient, TcpClientState},
};
use embassy_time::{Duration, WithTimeout};
use embedded_io_async::Read;
use log::{info, warn};
use rawpager_core::{
    refresh::{FetchError, MAX_REDIRECTS, resolve_redirect},
    text_store::{MAX_DOCUMENT_BYTES, decode_body, trim_partial_char},
};
use reqwless::{
    client::{HttpClient, TlsConfig, TlsVerify},
    request::{Method, RequestBuilder},
};

/// One full TLS record plus framing overhead.
const TLS_READ_BUF_BYTES: usize = 16_640;
const TLS_WRITE_BUF_BYTES: usize = 4_096;
const RESPONSE_HEAD_BYTES: usize = 4_096;
const BODY_CHUNK_BYTES: usize = 512;
const FETCH_TIMEOUT_SECS: u64 = 15;
pub(super) const TCP_BUF_BYTES: usize = 2_048;

const USER_AGENT: &str = concat!("rawpager/", env!("CARGO_PKG_VERSION"), " (esp32-cyd)");
const REQUEST_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", USER_AGENT),
    ("Accept", "text/plain, */*"),
];

pub(super) type FetchTcpState = TcpClientState<1, TCP_BUF_BYTES, TCP_BUF_BYTES>;

/// Scratch memory for one HTTPS exchange, kept out of the task stack.
pub(super) struct FetchBuffers {
    tls_read: [u8; TLS_READ_BUF_BYTES],
    tls_write: [u8; TLS_WRITE_BUF_BYTES],
    response_head: [u8; RESPONSE_HEAD_BYTES],
}

impl FetchBuffers {
    pub(super) const fn new() -> Self {
        Self {
            tls_read: [0; TLS_READ_BUF_BYTES],
            tls_write: [0; TLS_WRITE_BUF_BYTES],
            response_head: [0; RESPONSE_HEAD_BYTES],
        }
    }
}

/// GETs `url` and returns its body as text.
///
/// Every failure is logged here and collapsed into [`FetchError`].
pub(super) async fn fetch_text(
    stack: Stack<'_>,
    tcp_state: &FetchTcpState,
    buffers: &mut FetchBuffers,
    tls_seed: u64,
    url: &str,
) -> Result<String, FetchError> {
    match fetch_following_redirects(stack, tcp_state, buffers, tls_seed, url)
        .with_timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!("fetch timed out after {}s url={}", FETCH_TIMEOUT_SECS, url);
            Err(FetchError)
        }
    }
}

async fn fetch_following_redirects(
    stack: Stack<'_>,
    tcp_state: &FetchTcpState,
    buffers: &mut FetchBuffers,
    tls_seed: u64,
    url: &str,
) -> Result<String, FetchError> {
    let tcp = TcpClient::new(stack, tcp_state);
    let dns = DnsSocket::new(stack);
    let tls = TlsConfig::new(
        tls_seed,
        &mut buffers.tls_read,
        &mut buffers.tls_write,
        TlsVerify::None,
    );
    let mut client = HttpClient::new_with_tls(&tcp, &dns, tls);
    let mut current = String::from(url);

    for hop in 0..=MAX_REDIRECTS {
        let location = {
            let mut request = match client.request(Method::GET, &current).await {
                Ok(request) => request.headers(REQUEST_HEADERS),
                Err(err) => {
                    warn!("fetch connect failed url={} err={:?}", current, err);
                    return Err(FetchError);
                }
            };
            let response = match request.send(&mut buffers.response_head).await {
                Ok(response) => response,
                Err(err) => {
                    warn!("fetch request failed url={} err={:?}", current, err);
                    return Err(FetchError);
                }
            };

            let status = &response.status;
            if status.is_redirection() {
                let target = response
                    .headers()
                    .find(|(name, _)| name.eq_ignore_ascii_case("location"))
                    .and_then(|(_, value)| core::str::from_utf8(value).ok())
                    .and_then(|location| resolve_redirect(&current, location));
                match target {
                    Some(target) => target,
                    None => {
                        warn!("fetch redirect without usable location status={:?}", status);
                        return Err(FetchError);
                    }
                }
            } else if !status.is_successful() {
                warn!("fetch rejected url={} status={:?}", current, status);
                return Err(FetchError);
            } else {
                let mut reader = response.body().reader();
                let mut body = Vec::new();
                let mut chunk = [0u8; BODY_CHUNK_BYTES];
                let mut capped = false;
                loop {
                    let read = match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(read) => read,
                        Err(err) => {
                            warn!(
                                "fetch body read failed url={} after_bytes={} err={:?}",
                                current,
                                body.len(),
                                err
                            );
                            return Err(FetchError);
                        }
                    };
                    let room = MAX_DOCUMENT_BYTES - body.len();
                    body.extend_from_slice(&chunk[..read.min(room)]);
                    if body.len() == MAX_DOCUMENT_BYTES {
                        capped = true;
                        break;
                    }
                }
                if capped {
                    trim_partial_char(&mut body);
                }

                info!(
                    "fetch ok url={} bytes={} capped={} redirects={}",
                    current,
                    body.len(),
                    capped,
                    hop
                );
                return Ok(decode_body(body));
            }
        };

        info!("fetch redirect hop={} location={}", hop + 1, location);
        current = location;
    }

    warn!("fetch gave up after {} redirects url={}", MAX_REDIRECTS, url);
    Err(FetchError)
}
