//! Link traversal, hostname simplification, and link scoring.
//!
//! This crate provides:
//! - [`resolver`]: retain/discard decisions and final-URL resolution over HTTP
//! - [`host`]: hostname helpers used for slugs and link brands
//! - [`score`]: the optional link scoring capability

pub mod host;
pub mod resolver;
pub mod score;

pub use host::{simplified_hostname, simplified_hostname_without_tld};
pub use resolver::{
    DiscardReason, HttpLinkResolver, LinkOptions, LinkResolver, Traversal, TraversedLink,
    strip_tracking_params,
};
pub use score::{LinkScorer, LinkScores, SimulatedLinkScorer};
