use anyhow::{Error, Result};
use image::{EncodableLayout, RgbImage};
use tracing::{debug, error};

use std::io::Write;
use std::process::{Child, Command, Stdio};

/// Window showing one image as it is edited, backed by an `ffplay`
/// process reading raw frames from stdin. The window closes when this is
/// dropped.
pub struct Preview {
    width: u32,
    height: u32,
    player: Child,
}

impl Drop for Preview {
    fn drop(&mut self) {
        if let Err(e) = self.player.kill() {
            error!("Failed to stop preview process {e:?}");
        }
        let _ = self.player.wait();
    }
}

impl Preview {
    pub fn open(img: &RgbImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        let player = Command::new("ffplay")
            .args(player_args(width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!("Opened {width}x{height} preview");

        let mut preview = Self {
            width,
            height,
            player,
        };
        preview.show(img)?;

        Ok(preview)
    }

    /// Push a frame to the window. Frames must keep the size the preview
    /// was opened with.
    pub fn show(&mut self, img: &RgbImage) -> Result<()> {
        if img.dimensions() != (self.width, self.height) {
            return Err(Error::msg(format!(
                "Preview is {}x{}, got a {}x{} frame",
                self.width,
                self.height,
                img.width(),
                img.height()
            )));
        }

        if let Some(stdin) = self.player.stdin.as_mut() {
            stdin.write_all(img.as_bytes())?;
            stdin.flush()?;
        }

        Ok(())
    }
}

fn player_args(width: u32, height: u32) -> Vec<String> {
    [
        "-f",
        "rawvideo",
        "-pixel_format",
        "rgb24",
        "-video_size",
        format!("{width}x{height}").as_str(),
        "-window_title",
        "Face Blur",
        "-fflags",
        "nobuffer",
        "-flags",
        "low_delay",
        "-loglevel",
        "quiet",
        "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
