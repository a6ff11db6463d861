use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{classify_extractor_output, ConvertError, Result};
use crate::resolver::headers::{RequestProfile, REFERER};

/// Thin client around the yt-dlp binary.
///
/// All invocations run with `--no-playlist`; failures are classified
/// through the central stderr table before they leave this module.
#[derive(Debug, Clone)]
pub struct YtDlp {
    path: String,
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            path: "yt-dlp".to_string(),
        }
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Fetch structured video metadata as JSON.
    pub async fn dump_json(&self, url: &str, profile: Option<&RequestProfile>) -> Result<Value> {
        tracing::debug!(url, "extracting video info");

        let mut args = vec!["--dump-json".to_string(), "--no-playlist".to_string()];
        if let Some(profile) = profile {
            args.extend(header_args(profile));
        }
        args.push(url.to_string());

        let output = self.run(&args).await?;
        let json_str = String::from_utf8(output.stdout)
            .map_err(|e| ConvertError::Internal(format!("non-UTF-8 extractor output: {e}")))?;
        let info: Value = serde_json::from_str(&json_str)
            .map_err(|e| ConvertError::Internal(format!("unparseable extractor output: {e}")))?;

        Ok(info)
    }

    /// Resolve a direct media URL for the given format selector.
    pub async fn resolve_stream_url(
        &self,
        url: &str,
        format: &str,
        profile: &RequestProfile,
    ) -> Result<String> {
        tracing::debug!(url, format, "resolving direct stream URL");

        let mut args = vec![
            "--get-url".to_string(),
            "--format".to_string(),
            format.to_string(),
            "--no-playlist".to_string(),
        ];
        args.extend(header_args(profile));
        args.push(url.to_string());

        let output = self.run(&args).await?;
        let stream_url = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();

        if stream_url.is_empty() {
            return Err(ConvertError::NoAudioAvailable);
        }
        url::Url::parse(&stream_url).map_err(|_| {
            ConvertError::UpstreamTransient("extractor returned an invalid stream URL".to_string())
        })?;

        Ok(stream_url)
    }

    /// Download and convert to MP3 in one call, writing to the given
    /// output template.
    pub async fn extract_audio(
        &self,
        url: &str,
        output_template: &str,
        profile: &RequestProfile,
    ) -> Result<()> {
        tracing::debug!(url, output_template, "batch extracting audio");

        let mut args = vec![
            url.to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
            "--output".to_string(),
            output_template.to_string(),
            "--no-playlist".to_string(),
            "--restrict-filenames".to_string(),
        ];
        args.extend(header_args(profile));

        self.run(&args).await?;
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        let output = Command::new(&self.path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_extractor_output(&stderr));
        }

        Ok(output)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

fn header_args(profile: &RequestProfile) -> Vec<String> {
    vec![
        "--user-agent".to_string(),
        profile.user_agent.to_string(),
        "--add-header".to_string(),
        format!("Accept-Language:{}", profile.accept_language),
        "--referer".to_string(),
        REFERER.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_header_args_carry_full_profile() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = crate::resolver::headers::pick_profile(&mut rng);
        let args = header_args(&profile);

        assert!(args.contains(&"--user-agent".to_string()));
        assert!(args.contains(&profile.user_agent.to_string()));
        assert!(args.iter().any(|a| a.starts_with("Accept-Language:")));
        assert!(args.contains(&REFERER.to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_io_error() {
        let ytdlp = YtDlp::with_path("/nonexistent/yt-dlp-missing");
        let err = ytdlp
            .dump_json("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Io(_)));
    }
}
