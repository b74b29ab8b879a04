use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    error::{ChartError, ChartResult},
    render::FrameRgba,
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Keep the alpha channel (qtrle in a .mov container). When false the
    /// frames are flattened over the encoder background and written as
    /// yuv420p h264.
    pub transparent: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> ChartResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChartError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(ChartError::validation("encode fps must be non-zero"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // The opaque path targets yuv420p, which requires even dimensions.
            return Err(ChartError::validation("encode width/height must be even"));
        }
        Ok(())
    }

    pub fn with_out_path(mut self, out_path: impl Into<PathBuf>) -> Self {
        self.out_path = out_path.into();
        self
    }
}

pub fn default_mov_config(
    out_path: impl Into<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> EncodeConfig {
    EncodeConfig {
        width,
        height,
        fps,
        out_path: out_path.into(),
        overwrite: true,
        transparent: true,
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ChartResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// ffmpeg subprocess fed raw RGBA frames over stdin.
///
/// The system `ffmpeg` binary is used rather than linked FFmpeg libraries to
/// avoid native dev header/lib requirements.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    bg_rgba: [u8; 4],
    /// Taken by `finish`; still present on drop means the encode was
    /// abandoned mid-stream.
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig, bg_rgba: [u8; 4]) -> ChartResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(ChartError::render_sink(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ChartError::render_sink(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
        ]);

        if cfg.transparent {
            cmd.args(["-c:v", "qtrle", "-pix_fmt", "argb"]);
        } else {
            cmd.args([
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]);
        }
        cmd.arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ChartError::render_sink(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChartError::render_sink("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            scratch: vec![0u8; (cfg.width * cfg.height * 4) as usize],
            cfg,
            bg_rgba,
            child: Some(child),
            stdin: Some(stdin),
        })
    }

    pub fn encode_frame(&mut self, frame: &FrameRgba) -> ChartResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(ChartError::render_sink(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }

        if frame.data.len() != self.scratch.len() {
            return Err(ChartError::render_sink(
                "frame.data size mismatch with width*height*4",
            ));
        }

        if self.cfg.transparent {
            if frame.premultiplied {
                unpremultiply_rgba8(&mut self.scratch, &frame.data)?;
            } else {
                self.scratch.copy_from_slice(&frame.data);
            }
        } else {
            flatten_to_opaque_rgba8(
                &mut self.scratch,
                &frame.data,
                frame.premultiplied,
                self.bg_rgba,
            )?;
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ChartError::render_sink(
                "ffmpeg encoder is already finalized",
            ));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            ChartError::render_sink(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    pub fn finish(mut self) -> ChartResult<()> {
        drop(self.stdin.take());

        let Some(child) = self.child.take() else {
            return Err(ChartError::render_sink(
                "ffmpeg encoder is already finalized",
            ));
        };

        let output = child.wait_with_output().map_err(|e| {
            ChartError::render_sink(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChartError::render_sink(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // `finish` was never reached: close the pipe, then kill and reap so
        // an aborted encode does not leave an ffmpeg process behind.
        let Some(mut child) = self.child.take() else {
            return;
        };
        drop(self.stdin.take());
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Convert premultiplied RGBA8 to straight alpha for codecs that carry the
/// alpha channel.
fn unpremultiply_rgba8(dst: &mut [u8], src: &[u8]) -> ChartResult<()> {
    if dst.len() != src.len() || dst.len() % 4 != 0 {
        return Err(ChartError::render_sink(
            "unpremultiply_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3];
        if a == 0 {
            d.copy_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let a16 = u16::from(a);
        for i in 0..3 {
            d[i] = ((u16::from(s[i]) * 255 + a16 / 2) / a16).min(255) as u8;
        }
        d[3] = a;
    }

    Ok(())
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> ChartResult<()> {
    if dst.len() != src.len() || dst.len() % 4 != 0 {
        return Err(ChartError::render_sink(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        let inv = 255u16 - a;

        let (r, g, b) = if src_is_premul {
            (
                s[0] as u16 + mul_div255(bg_r, inv),
                s[1] as u16 + mul_div255(bg_g, inv),
                s[2] as u16 + mul_div255(bg_b, inv),
            )
        } else {
            (
                mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv),
                mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv),
                mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv),
            )
        };

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
