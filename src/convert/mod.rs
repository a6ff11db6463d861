use anyhow::Context;

use crate::acquire::AudioAcquirer;
use crate::config::{AcquisitionMode, Config};
use crate::error::{ConvertError, Result};
use crate::lifecycle::Workspace;
use crate::media::{extract_video_id, VideoMetadata};
use crate::resolver::MetadataResolver;
use crate::transcode::{TranscodeJob, Transcoder};
use crate::utils::sanitize_filename;
use crate::ytdlp::YtDlp;

/// Finished conversion ready to be delivered.
pub struct ConversionOutput {
    pub data: Vec<u8>,
    pub filename: String,
    pub metadata: VideoMetadata,
}

/// Main conversion pipeline.
///
/// Stages run strictly in order: validate, resolve metadata, duration
/// gate, acquire audio, transcode. Each request owns all of its state
/// except the shared workspace directory and the engine's one-time
/// availability probe.
pub struct ConversionPipeline {
    config: Config,
    resolver: MetadataResolver,
    acquirer: AudioAcquirer,
    transcoder: Transcoder,
    workspace: Workspace,
}

impl ConversionPipeline {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let ytdlp = YtDlp::new();
        let resolver = MetadataResolver::from_config(&config.resolver, ytdlp.clone());
        let acquirer = AudioAcquirer::new(ytdlp, config.acquisition.clone());
        let transcoder = Transcoder::new(config.transcode.clone());
        Self::with_components(config, resolver, acquirer, transcoder)
    }

    /// Assemble from pre-built collaborators (tests inject fakes here).
    pub fn with_components(
        config: Config,
        resolver: MetadataResolver,
        acquirer: AudioAcquirer,
        transcoder: Transcoder,
    ) -> anyhow::Result<Self> {
        let workspace = Workspace::new().context("Failed to create working directory")?;

        Ok(Self {
            config,
            resolver,
            acquirer,
            transcoder,
            workspace,
        })
    }

    /// Validate the URL, resolve metadata, and enforce the duration cap.
    ///
    /// Invalid URLs are rejected here before any network or subprocess
    /// work happens.
    pub async fn video_info(&self, url: &str) -> Result<VideoMetadata> {
        let id = extract_video_id(url)
            .ok_or_else(|| ConvertError::InvalidUrl(url.to_string()))?;

        let metadata = self.resolver.resolve(&id).await?;
        self.check_duration(&metadata)?;

        Ok(metadata)
    }

    /// Run the full conversion. Progress is observable through the
    /// supplied job's watch channel.
    pub async fn convert(&self, url: &str, job: &TranscodeJob) -> Result<ConversionOutput> {
        let metadata = self.video_info(url).await?;

        tracing::info!(video_id = %metadata.id, title = %metadata.title, "starting conversion");

        let data = match self.config.acquisition.mode {
            AcquisitionMode::Streaming => {
                let source = self.acquirer.acquire_stream(&metadata.id).await?;
                self.transcoder
                    .transcode(
                        &source,
                        &metadata.id,
                        metadata.duration_secs,
                        &self.workspace,
                        job,
                    )
                    .await?
            }
            AcquisitionMode::Batch => {
                let mut artifact = self
                    .acquirer
                    .acquire_batch(&metadata.id, &self.workspace)
                    .await?;
                let bytes = fs_err::read(artifact.path())?;
                artifact.cleanup();
                bytes
            }
        };

        Ok(ConversionOutput {
            filename: build_filename(&metadata),
            data,
            metadata,
        })
    }

    fn check_duration(&self, metadata: &VideoMetadata) -> Result<()> {
        let limit_secs = self.config.limits.max_duration_secs;
        if metadata.duration_secs > limit_secs {
            return Err(ConvertError::DurationExceeded {
                duration_secs: metadata.duration_secs,
                limit_secs,
            });
        }
        Ok(())
    }
}

fn build_filename(metadata: &VideoMetadata) -> String {
    let stem = sanitize_filename(&metadata.title);
    if stem.is_empty() {
        format!("{}.mp3", metadata.id)
    } else {
        format!("{stem}.mp3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{default_thumbnail, VideoId};
    use crate::resolver::headers::RequestProfile;
    use crate::resolver::MetadataStrategy;
    use async_trait::async_trait;

    struct FixedMetadata {
        duration_secs: u64,
    }

    #[async_trait]
    impl MetadataStrategy for FixedMetadata {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn resolve(&self, id: &VideoId, _profile: &RequestProfile) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                title: "Test Video".to_string(),
                duration_secs: self.duration_secs,
                thumbnail: default_thumbnail(id),
                id: id.clone(),
                author: "Tester".to_string(),
            })
        }
    }

    fn pipeline_with_duration(duration_secs: u64) -> ConversionPipeline {
        let config = Config::default();
        let resolver = MetadataResolver::with_strategies(
            vec![Box::new(FixedMetadata { duration_secs })],
            0,
            0,
        );
        let acquirer = AudioAcquirer::new(YtDlp::new(), config.acquisition.clone());
        let transcoder = Transcoder::new(config.transcode.clone());
        ConversionPipeline::with_components(config, resolver, acquirer, transcoder).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_resolution() {
        let pipeline = pipeline_with_duration(213);
        let err = pipeline
            .video_info("https://example.com/notyoutube")
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_duration_gate_boundary() {
        // Exactly at the cap passes
        let pipeline = pipeline_with_duration(600);
        let meta = pipeline
            .video_info("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(meta.duration_secs, 600);

        // One second over is rejected
        let pipeline = pipeline_with_duration(601);
        let err = pipeline
            .video_info("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::DurationExceeded { .. }));
    }

    #[tokio::test]
    async fn test_unknown_duration_passes_gate() {
        // Degraded metadata reports 0 = unknown; the cap only rejects
        // media known to be too long
        let pipeline = pipeline_with_duration(0);
        assert!(pipeline
            .video_info("https://youtu.be/dQw4w9WgXcQ")
            .await
            .is_ok());
    }

    #[test]
    fn test_filename_from_title() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let metadata = VideoMetadata {
            title: "Never Gonna Give You Up (Official)".to_string(),
            duration_secs: 213,
            thumbnail: default_thumbnail(&id),
            id,
            author: "Rick Astley".to_string(),
        };
        assert_eq!(
            build_filename(&metadata),
            "Never Gonna Give You Up Official.mp3"
        );
    }

    #[test]
    fn test_filename_falls_back_to_id_when_title_sanitizes_away() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let metadata = VideoMetadata {
            title: "!!!???".to_string(),
            duration_secs: 213,
            thumbnail: default_thumbnail(&id),
            id,
            author: "Rick Astley".to_string(),
        };
        assert_eq!(build_filename(&metadata), "dQw4w9WgXcQ.mp3");
    }
}
