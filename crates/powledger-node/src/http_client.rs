use crate::constants::PEER_CONNECT_TIMEOUT;
use async_trait::async_trait;
use powledger_core::{ChainResponse, PeerClient, PeerError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches peer chains over HTTP: `GET http://<peer>/chain`.
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    http: Client,
    timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(PEER_CONNECT_TIMEOUT.min(timeout))
            .build()?;
        Ok(Self { http, timeout })
    }

    fn classify(&self, peer: &str, err: reqwest::Error) -> PeerError {
        if err.is_timeout() {
            PeerError::Timeout {
                peer: peer.to_string(),
                timeout: self.timeout,
            }
        } else if err.is_decode() || err.is_body() {
            PeerError::Malformed {
                peer: peer.to_string(),
                reason: err.to_string(),
            }
        } else {
            PeerError::Unreachable {
                peer: peer.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

pub fn chain_url(peer: &str) -> String {
    format!("http://{peer}/chain")
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, PeerError> {
        let url = chain_url(peer);
        debug!(%url, "fetching peer chain");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(peer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<ChainResponse>()
            .await
            .map_err(|e| self.classify(peer, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_chain_url() {
        assert_eq!(chain_url("127.0.0.1:5001"), "http://127.0.0.1:5001/chain");
    }

    #[tokio::test]
    async fn unreachable_peer_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = HttpPeerClient::new(Duration::from_secs(2)).unwrap();
        let err = client.fetch_chain(&addr).await.unwrap_err();
        assert!(
            matches!(err, PeerError::Unreachable { .. } | PeerError::Timeout { .. }),
            "{err}"
        );
        assert_eq!(err.peer(), addr);
    }
}
