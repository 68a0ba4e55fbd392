// crates/trustchain-daemon/src/peers.rs
//
// PeerRegistry: the known peer URLs, their last-seen liveness, and the
// shared HTTP client used to fetch their chains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use trustchain_core::{Block, ChainSource, TrustchainError};

/// What the node knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerState {
    /// Normalized base URL.
    pub url: String,
    /// Whether the last fetch succeeded. Unknown peers start as false.
    pub alive: bool,
}

/// Known peers, kept in the order they were added.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    self_url: Option<String>,
    peers: Arc<RwLock<Vec<PeerState>>>,
    client: reqwest::Client,
}

impl PeerRegistry {
    pub fn new(self_url: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            self_url: self_url.as_deref().map(normalize_peer_url),
            peers: Arc::new(RwLock::new(Vec::new())),
            client,
        }
    }

    /// Add a peer. Returns `false` if it was already known or is this node.
    pub async fn add_peer(&self, url: &str) -> bool {
        let url = normalize_peer_url(url);
        if self.self_url.as_deref() == Some(url.as_str()) {
            return false;
        }
        let mut peers = self.peers.write().await;
        if peers.iter().any(|p| p.url == url) {
            return false;
        }
        tracing::info!(peer = %url, "Peer added");
        peers.push(PeerState { url, alive: false });
        true
    }

    pub async fn peers(&self) -> Vec<PeerState> {
        self.peers.read().await.clone()
    }

    /// Record the result of the last exchange with a peer.
    pub async fn mark_peer(&self, url: &str, alive: bool) {
        let mut peers = self.peers.write().await;
        if let Some(peer) = peers.iter_mut().find(|p| p.url == url) {
            if peer.alive != alive {
                tracing::debug!(peer = %url, alive, "Peer liveness changed");
            }
            peer.alive = alive;
        }
    }

    /// One HTTP chain source per known peer, in registry order.
    pub async fn chain_sources(&self) -> Vec<Arc<dyn ChainSource>> {
        self.peers
            .read()
            .await
            .iter()
            .map(|p| {
                Arc::new(HttpChainSource::new(p.url.clone(), self.client.clone())) as Arc<dyn ChainSource>
            })
            .collect()
    }
}

/// Trim whitespace and trailing slashes, defaulting the scheme to http.
pub fn normalize_peer_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// Fetches a peer's chain with `GET <base>/blocks`.
#[derive(Debug, Clone)]
pub struct HttpChainSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpChainSource {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self { base_url, client }
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch_blocks(&self) -> Result<Vec<Block>, TrustchainError> {
        let url = format!("{}/blocks", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrustchainError::Network(format!("GET {} failed: {}", url, e)))?;

        if !resp.status().is_success() {
            return Err(TrustchainError::Network(format!(
                "GET {} returned {}",
                url,
                resp.status()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| TrustchainError::Network(format!("reading {} failed: {}", url, e)))?;
        Block::decode_chain(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_peer_url() {
        assert_eq!(normalize_peer_url("10.0.0.2:8080"), "http://10.0.0.2:8080");
        assert_eq!(normalize_peer_url(" http://a:1/ "), "http://a:1");
        assert_eq!(normalize_peer_url("https://b"), "https://b");
    }

    #[tokio::test]
    async fn test_add_peer_deduplicates() {
        let registry = PeerRegistry::new(None, 1);
        assert!(registry.add_peer("10.0.0.2:8080").await);
        assert!(!registry.add_peer("http://10.0.0.2:8080/").await);
        assert!(registry.add_peer("10.0.0.3:8080").await);

        let urls: Vec<String> = registry.peers().await.into_iter().map(|p| p.url).collect();
        assert_eq!(urls, vec!["http://10.0.0.2:8080", "http://10.0.0.3:8080"]);
    }

    #[tokio::test]
    async fn test_self_url_is_never_a_peer() {
        let registry = PeerRegistry::new(Some("10.0.0.1:8080".to_string()), 1);
        assert!(!registry.add_peer("http://10.0.0.1:8080").await);
        assert!(registry.peers().await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_peer_and_sources() {
        let registry = PeerRegistry::new(None, 1);
        registry.add_peer("a:1").await;
        registry.add_peer("b:2").await;
        registry.mark_peer("http://b:2", true).await;
        registry.mark_peer("http://unknown:3", true).await;

        let peers = registry.peers().await;
        assert!(!peers[0].alive);
        assert!(peers[1].alive);
        assert_eq!(peers.len(), 2);

        let names: Vec<String> = registry
            .chain_sources()
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["http://a:1", "http://b:2"]);
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_a_network_error() {
        let source = HttpChainSource::new("http://127.0.0.1:1".to_string(), reqwest::Client::new());
        assert!(matches!(
            source.fetch_blocks().await,
            Err(TrustchainError::Network(_))
        ));
    }
}
