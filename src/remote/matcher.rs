// src/remote/matcher.rs
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::core::face::FaceEmbedding;
use crate::utils::config::{NodeConfig, RemoteConfig};

use super::client::RemoteStore;
use super::error::RemoteError;
use super::types::MatchCandidate;

/// Thin wrapper that pins the organization scope and similarity threshold for
/// every lookup. The remote side does the filtering; candidates come back
/// ordered by similarity and are returned untouched.
pub struct RemoteMatcher {
    remote: Arc<dyn RemoteStore>,
    organization_id: Uuid,
    threshold: f32,
}

impl RemoteMatcher {
    pub fn new(remote: Arc<dyn RemoteStore>, node: &NodeConfig, config: &RemoteConfig) -> Self {
        Self {
            remote,
            organization_id: node.organization_id,
            threshold: config.similarity_threshold,
        }
    }

    pub async fn find_candidates(
        &self,
        embedding: &FaceEmbedding,
    ) -> Result<Vec<MatchCandidate>, RemoteError> {
        let candidates = self
            .remote
            .match_embedding(embedding, self.organization_id, self.threshold)
            .await?;
        debug!(
            "Matcher received {} candidate(s) above threshold {}",
            candidates.len(),
            self.threshold
        );
        Ok(candidates)
    }

    pub fn best_of(candidates: &[MatchCandidate]) -> Option<&MatchCandidate> {
        candidates.first()
    }
}
