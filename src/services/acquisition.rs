use std::path::Path;
use std::process::Command;

use crate::error::ClipperError;
use crate::services::ffmpeg::which_command;

/// Downloads a VOD to a local file, trying yt-dlp first and falling back to
/// streamlink. Failure here is always fatal for the run.
#[derive(Debug, Clone)]
pub struct MediaAcquirer {
    ytdlp_path: Option<String>,
    streamlink_path: Option<String>,
}

impl MediaAcquirer {
    pub fn new() -> Self {
        Self {
            ytdlp_path: which_command("yt-dlp").ok(),
            streamlink_path: which_command("streamlink").ok(),
        }
    }

    pub fn download(&self, url: &str, output: &Path) -> Result<(), ClipperError> {
        if let Some(ytdlp) = &self.ytdlp_path {
            log::info!("downloading VOD with yt-dlp: {url}");
            let status = Command::new(ytdlp)
                .args(["-f", "best", "-o"])
                .arg(output)
                .arg(url)
                .status();

            match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(_) => log::warn!("yt-dlp failed, trying streamlink"),
                Err(e) => log::warn!("yt-dlp could not be run ({e}), trying streamlink"),
            }
        }

        if let Some(streamlink) = &self.streamlink_path {
            log::info!("downloading VOD with streamlink: {url}");
            let status = Command::new(streamlink)
                .arg("--output")
                .arg(output)
                .arg(url)
                .arg("best")
                .status()
                .map_err(|e| ClipperError::Acquisition(format!("streamlink failed to run: {e}")))?;

            if status.success() {
                return Ok(());
            }
            return Err(ClipperError::Acquisition(format!(
                "both yt-dlp and streamlink failed for {url}"
            )));
        }

        Err(ClipperError::Acquisition(
            "neither yt-dlp nor streamlink is installed".to_string(),
        ))
    }
}

impl Default for MediaAcquirer {
    fn default() -> Self {
        Self::new()
    }
}
