//! Link popularity scoring.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use linkpost_shared::Result;

/// Share counts for a link across social networks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkScores {
    pub facebook_shares: u64,
    pub linkedin_shares: u64,
    pub pinterest_pins: u64,
}

impl LinkScores {
    /// Sum across all networks.
    pub fn total(&self) -> u64 {
        self.facebook_shares + self.linkedin_shares + self.pinterest_pins
    }
}

/// Scores a resolved link.
///
/// The boolean in the result is `true` when the scores are simulated rather
/// than retrieved from the networks.
#[async_trait]
pub trait LinkScorer: Send + Sync {
    async fn score(&self, url: &Url) -> Result<(LinkScores, bool)>;
}

/// Produces stable fake scores derived from the URL, for tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedLinkScorer;

#[async_trait]
impl LinkScorer for SimulatedLinkScorer {
    async fn score(&self, url: &Url) -> Result<(LinkScores, bool)> {
        let digest = Sha256::digest(url.as_str().as_bytes());
        let scores = LinkScores {
            facebook_shares: u64::from(u16::from_be_bytes([digest[0], digest[1]])),
            linkedin_shares: u64::from(digest[2]),
            pinterest_pins: u64::from(digest[3] % 64),
        };
        Ok((scores, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_scores_are_stable() {
        let url = Url::parse("https://www.rust-lang.org/").unwrap();
        let (a, simulated) = SimulatedLinkScorer.score(&url).await.unwrap();
        let (b, _) = SimulatedLinkScorer.score(&url).await.unwrap();
        assert!(simulated);
        assert_eq!(a, b);
        assert_eq!(a.total(), a.facebook_shares + a.linkedin_shares + a.pinterest_pins);
    }

    #[tokio::test]
    async fn simulated_scores_vary_by_url() {
        let a = Url::parse("https://a.example.com/").unwrap();
        let b = Url::parse("https://b.example.com/").unwrap();
        let (sa, _) = SimulatedLinkScorer.score(&a).await.unwrap();
        let (sb, _) = SimulatedLinkScorer.score(&b).await.unwrap();
        assert_ne!(sa, sb);
    }
}
