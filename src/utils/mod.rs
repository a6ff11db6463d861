/// Format a duration as `M:SS` for API responses.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Sanitize a video title for use as a download filename.
///
/// Strips everything outside `[A-Za-z0-9 _-]`, collapses whitespace runs,
/// trims, and truncates to 100 characters.
pub fn sanitize_filename(title: &str) -> String {
    let stripped: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(100)
        .collect()
}

/// Check if the current environment has the required external tools.
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp", "--version").await {
        missing.push("yt-dlp - required for metadata and audio acquisition".to_string());
    }

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for MP3 transcoding".to_string());
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(213), "3:33");
        assert_eq!(format_duration(600), "10:00");
    }

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_filename("Hello: World!"), "Hello World");
        assert_eq!(sanitize_filename("a/b\\c?d*e"), "abcde");
        assert_eq!(sanitize_filename("keep_under-scores"), "keep_under-scores");
    }

    #[test]
    fn test_sanitize_collapses_and_trims_whitespace() {
        assert_eq!(sanitize_filename("  spaced   out  "), "spaced out");
        assert_eq!(sanitize_filename("tabs\t\tand\nnewlines"), "tabs and newlines");
    }

    #[test]
    fn test_sanitize_truncates_to_100_chars() {
        let long = "a".repeat(250);
        assert_eq!(sanitize_filename(&long).len(), 100);
    }

    #[test]
    fn test_sanitize_non_ascii_dropped() {
        assert_eq!(sanitize_filename("日本語 title"), "title");
    }
}
