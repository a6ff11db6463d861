use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{watch, OnceCell};

use crate::config::TranscodeConfig;
use crate::error::{ConvertError, Result};
use crate::lifecycle::{unique_stem, Workspace};
use crate::media::VideoId;

/// Progress handle for one transcode invocation.
///
/// Fractions are clamped to [0, 1] and never decrease within a job;
/// observers read the latest value through the watch receiver.
pub struct TranscodeJob {
    tx: watch::Sender<f32>,
}

impl TranscodeJob {
    pub fn new() -> (Self, watch::Receiver<f32>) {
        let (tx, rx) = watch::channel(0.0);
        (Self { tx }, rx)
    }

    fn advance(&self, fraction: f64) {
        let clamped = fraction.clamp(0.0, 1.0) as f32;
        self.tx.send_if_modified(|current| {
            if clamped > *current {
                *current = clamped;
                true
            } else {
                false
            }
        });
    }
}

/// MP3 transcoding engine wrapping ffmpeg.
///
/// The availability probe runs once per process and is reused across
/// requests; everything else is request-scoped, so concurrent jobs only
/// share the workspace directory and their staged names never collide.
pub struct Transcoder {
    ffmpeg_path: String,
    options: TranscodeConfig,
    available: OnceCell<bool>,
}

impl Transcoder {
    pub fn new(options: TranscodeConfig) -> Self {
        Self::with_path("ffmpeg", options)
    }

    pub fn with_path(path: impl Into<String>, options: TranscodeConfig) -> Self {
        Self {
            ffmpeg_path: path.into(),
            options,
            available: OnceCell::new(),
        }
    }

    pub async fn ensure_available(&self) -> Result<()> {
        let available = self
            .available
            .get_or_init(|| async {
                Command::new(&self.ffmpeg_path)
                    .arg("-version")
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await
                    .map(|output| output.status.success())
                    .unwrap_or(false)
            })
            .await;

        if *available {
            Ok(())
        } else {
            Err(ConvertError::TranscodeFailed(
                "ffmpeg is not available".to_string(),
            ))
        }
    }

    /// Transcode an acquired bitstream to MP3.
    ///
    /// The source is staged under a request-unique input name, the result
    /// read back from a distinct output name, and both staged files are
    /// deleted whether or not the encode succeeds.
    pub async fn transcode(
        &self,
        source: &[u8],
        id: &VideoId,
        duration_secs: u64,
        workspace: &Workspace,
        job: &TranscodeJob,
    ) -> Result<Vec<u8>> {
        self.ensure_available().await?;

        let stem = unique_stem(id);
        let mut input = workspace.scoped(&format!("{stem}-in"));
        let mut output = workspace.scoped(&format!("{stem}-out.mp3"));

        let result = async {
            fs_err::write(input.path(), source)?;
            self.run_ffmpeg(input.path(), output.path(), duration_secs, job)
                .await?;
            let bytes = fs_err::read(output.path())?;
            Ok::<_, ConvertError>(bytes)
        }
        .await;

        input.cleanup();
        output.cleanup();

        let bytes = result?;
        if bytes.is_empty() {
            return Err(ConvertError::TranscodeFailed(
                "encoder produced no output".to_string(),
            ));
        }

        job.advance(1.0);
        Ok(bytes)
    }

    async fn run_ffmpeg(
        &self,
        input: &Path,
        output: &Path,
        duration_secs: u64,
        job: &TranscodeJob,
    ) -> Result<()> {
        let bitrate = format!("{}k", self.options.bitrate_kbps);
        let sample_rate = self.options.sample_rate_hz.to_string();

        let mut child = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-nostats")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-codec:a")
            .arg(&self.options.codec)
            .arg("-b:a")
            .arg(&bitrate)
            .arg("-ar")
            .arg(&sample_rate)
            .arg("-progress")
            .arg("pipe:1")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Drain stderr concurrently so a chatty encoder can't fill the
        // pipe and stall while we read progress from stdout.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(fraction) = parse_progress_line(&line, duration_secs) {
                    job.advance(fraction);
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            let detail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join("; ");
            return Err(ConvertError::TranscodeFailed(detail));
        }

        Ok(())
    }
}

/// Extract a completion fraction from one `-progress` key=value line.
///
/// Despite the name, ffmpeg's `out_time_ms` field carries microseconds.
fn parse_progress_line(line: &str, duration_secs: u64) -> Option<f64> {
    let value = line.strip_prefix("out_time_ms=")?;
    if duration_secs == 0 {
        return None;
    }
    let out_us: f64 = value.trim().parse().ok()?;
    Some(out_us / 1_000_000.0 / duration_secs as f64)
}
