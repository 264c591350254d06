use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{IndexedSegment, SimilarityIndex};
use crate::captions::VideoReference;
use crate::error::Result;
use crate::metadata::{MetadataOutcome, MetadataService, VideoMetadata};
use crate::pipeline::TranscriptPipeline;

/// Store naming convention for per-user video stores
pub fn store_name(owner: &str, video_id: &str) -> String {
    format!("yt_{}_{}", owner, video_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub store_name: String,
    pub video_id: String,
    pub language: String,
    pub segment_count: usize,
    pub metadata: VideoMetadata,
    pub indexed_at: chrono::DateTime<chrono::Utc>,
}

/// Acquires, aligns and indexes one video
pub struct VideoIndexer {
    transcripts: Arc<TranscriptPipeline>,
    metadata: Arc<dyn MetadataService>,
    index: Arc<dyn SimilarityIndex>,
}

impl VideoIndexer {
    pub fn new(
        transcripts: Arc<TranscriptPipeline>,
        metadata: Arc<dyn MetadataService>,
        index: Arc<dyn SimilarityIndex>,
    ) -> Self {
        Self {
            transcripts,
            metadata,
            index,
        }
    }

    pub async fn ingest(&self, reference: &VideoReference, owner: &str) -> Result<IngestReport> {
        let video_id = reference.video_id()?;
        let (aligned, metadata) = futures::join!(self.transcripts.run(reference), self.metadata.info(&video_id));
        let aligned = aligned?;
        let language = aligned.document.language_code().to_string();

        let metadata = match metadata {
            MetadataOutcome::Available(metadata) => metadata,
            MetadataOutcome::NotAvailable => VideoMetadata::empty(),
            MetadataOutcome::TransientError(reason) => {
                warn!("⚠️ Metadata for {} unavailable right now: {}", video_id, reason);
                VideoMetadata::empty()
            }
        };

        let items: Vec<IndexedSegment> = aligned
            .segments
            .into_iter()
            .map(|segment| IndexedSegment {
                segment,
                video_title: metadata.title.clone(),
                thumbnail: metadata.thumbnail.clone(),
                language: language.clone(),
            })
            .collect();
        let segment_count = items.len();

        let store = store_name(owner, &video_id);
        self.index.build(items, &store).await?;
        info!("✅ Indexed {} ({} segments) into {}", video_id, segment_count, store);

        Ok(IngestReport {
            store_name: store,
            video_id,
            language,
            segment_count,
            metadata,
            indexed_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{
        CaptionCascade, CaptionEntry, CaptionError, CaptionSource, CaptionTrack, FetchFailure, FetchRequest,
        HttpFetch, Route,
    };
    use crate::config::SegmentationConfig;
    use crate::error::QuizError;
    use crate::retrieval::LexicalIndex;
    use crate::segmentation::SegmentAligner;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct HindiSource;

    #[async_trait]
    impl CaptionSource for HindiSource {
        async fn list(&self, _video_id: &str, _route: Route) -> std::result::Result<Vec<CaptionTrack>, CaptionError> {
            Ok(vec![CaptionTrack {
                language_code: "hi".into(),
                name: "Hindi".into(),
                base_url: "https://example.test/hi".into(),
                is_generated: true,
            }])
        }

        async fn fetch(
            &self,
            _video_id: &str,
            _track: &CaptionTrack,
            _route: Route,
        ) -> std::result::Result<Vec<CaptionEntry>, CaptionError> {
            Ok((0..6)
                .map(|i| CaptionEntry::new(format!("गुरुत्वाकर्षण भाग {}", i), i as f64 * 4.0, 4.0))
                .collect())
        }
    }

    struct OfflineFetch;

    #[async_trait]
    impl HttpFetch for OfflineFetch {
        async fn fetch(&self, request: &FetchRequest, _route: Route) -> std::result::Result<String, FetchFailure> {
            Err(FetchFailure::Status {
                status: 404,
                reason: "Not Found".into(),
                url: request.url.clone(),
            })
        }

        fn has_proxy(&self) -> bool {
            false
        }
    }

    struct FixedMetadata(MetadataOutcome);

    #[async_trait]
    impl MetadataService for FixedMetadata {
        async fn info(&self, _video_id: &str) -> MetadataOutcome {
            self.0.clone()
        }
    }

    fn indexer(metadata: MetadataOutcome, index: Arc<LexicalIndex>) -> VideoIndexer {
        let cascade = CaptionCascade::new(Arc::new(HindiSource), Arc::new(OfflineFetch), vec!["hi".into()]);
        let transcripts = Arc::new(TranscriptPipeline::new(
            cascade,
            SegmentAligner::new(&SegmentationConfig::default()),
        ));
        VideoIndexer::new(transcripts, Arc::new(FixedMetadata(metadata)), index)
    }

    #[test]
    fn test_store_name() {
        assert_eq!(store_name("42", "k4oWqYT6tjk"), "yt_42_k4oWqYT6tjk");
    }

    #[tokio::test]
    async fn test_ingest_builds_store_with_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let index = Arc::new(LexicalIndex::new(temp_dir.path()));
        let metadata = VideoMetadata {
            title: "Gravity".into(),
            thumbnail: "https://i.ytimg.com/vi/k4oWqYT6tjk/hqdefault.jpg".into(),
            ..VideoMetadata::empty()
        };
        let indexer = indexer(MetadataOutcome::Available(metadata), index.clone());

        let report = indexer
            .ingest(&VideoReference::from("https://youtu.be/k4oWqYT6tjk"), "42")
            .await
            .unwrap();

        assert_eq!(report.store_name, "yt_42_k4oWqYT6tjk");
        assert_eq!(report.language, "hi");
        assert!(report.segment_count >= 1);
        assert_eq!(report.metadata.title, "Gravity");
        assert!(temp_dir.path().join("yt_42_k4oWqYT6tjk.json").exists());

        let results = index.query("yt_42_k4oWqYT6tjk", "गुरुत्वाकर्षण", 5, 25).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].video_title, "Gravity");
        assert_eq!(results[0].language, "hi");
    }

    #[tokio::test]
    async fn test_ingest_tolerates_missing_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let index = Arc::new(LexicalIndex::new(temp_dir.path()));
        let indexer = indexer(MetadataOutcome::TransientError("timeout".into()), index);

        let report = indexer.ingest(&VideoReference::from("k4oWqYT6tjk"), "7").await.unwrap();
        assert_eq!(report.metadata, VideoMetadata::empty());
    }

    #[tokio::test]
    async fn test_ingest_rejects_invalid_reference() {
        let temp_dir = TempDir::new().unwrap();
        let indexer = indexer(MetadataOutcome::NotAvailable, Arc::new(LexicalIndex::new(temp_dir.path())));

        let result = indexer.ingest(&VideoReference::from("not a video"), "7").await;
        assert!(matches!(result, Err(QuizError::InvalidReference(_))));
    }
}
