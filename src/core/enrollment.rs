// src/core/enrollment.rs
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::core::face::EmbeddingExtractor;
use crate::remote::client::RemoteStore;
use crate::remote::types::NewFaceEmbedding;
use crate::sync::queue::PendingQueue;
use crate::sync::types::PendingEmbeddingUpdate;
use crate::utils::config::NodeConfig;
use crate::utils::error::Result;

pub struct EnrollmentRequest {
    pub user_id: Uuid,
    pub image: Vec<u8>,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentOutcome {
    Stored { quality: f32 },
    Queued { quality: f32 },
}

/// Captures a reference descriptor for a user. Unlike attendance marking,
/// face problems here are hard errors: the operator is standing at the
/// device and needs to know the capture was unusable.
pub struct EnrollmentService {
    extractor: Arc<EmbeddingExtractor>,
    remote: Arc<dyn RemoteStore>,
    queue: Arc<PendingQueue>,
    organization_id: Uuid,
}

impl EnrollmentService {
    pub fn new(
        extractor: Arc<EmbeddingExtractor>,
        remote: Arc<dyn RemoteStore>,
        queue: Arc<PendingQueue>,
        node: &NodeConfig,
    ) -> Self {
        Self {
            extractor,
            remote,
            queue,
            organization_id: node.organization_id,
        }
    }

    pub async fn enroll(&self, request: EnrollmentRequest) -> Result<EnrollmentOutcome> {
        let face = self.extractor.extract(&request.image).await?;

        let embedding = NewFaceEmbedding {
            user_id: request.user_id,
            organization_id: self.organization_id,
            descriptor: face.embedding.clone(),
            quality: face.quality,
            captured_at: face.captured_at,
            is_primary: request.is_primary,
        };

        match self.remote.upsert_face_embedding(&embedding).await {
            Ok(()) => {
                info!(
                    "Stored embedding for user {} (quality {:.1})",
                    request.user_id, face.quality
                );
                Ok(EnrollmentOutcome::Stored {
                    quality: face.quality,
                })
            }
            Err(err) if err.is_retriable() => {
                warn!(
                    "Upsert failed for user {}, holding embedding locally: {}",
                    request.user_id, err
                );
                let update = PendingEmbeddingUpdate {
                    user_id: request.user_id,
                    organization_id: self.organization_id,
                    descriptor: face.embedding,
                    quality: face.quality,
                    captured_at: face.captured_at,
                    is_primary: request.is_primary,
                };
                self.queue.put_embedding_update(&update)?;
                Ok(EnrollmentOutcome::Queued {
                    quality: face.quality,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
