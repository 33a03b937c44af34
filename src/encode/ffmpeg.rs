use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::encode::sink::{SinkConfig, VideoSink, check_frame, flatten_premul_over_bg};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LakebloomError, LakebloomResult};
use crate::foundation::fs::ensure_parent_dir;
use crate::render::svg::FrameRGBA;

/// Codec identifier of [`FfmpegSink`] output.
pub const FFMPEG_CODEC: &str = "libx264";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// File ffmpeg writes to.
    pub out_path: PathBuf,
    /// Container passed as `-f`; needed because `out_path` may be a temporary name.
    pub container: String,
    /// Background color used to flatten alpha.
    pub bg_rgb: [u8; 3],
    /// Kill ffmpeg and fail when the encode runs longer than this.
    pub timeout: Option<Duration>,
    /// Executable to run; `ffmpeg` resolved through `PATH` by default.
    pub program: PathBuf,
}

impl FfmpegSinkOpts {
    /// Create options for writing to `out_path`, with the container taken from its extension.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        let out_path = out_path.into();
        Self {
            container: container_for(&out_path).to_string(),
            out_path,
            bg_rgb: [0, 0, 0],
            timeout: None,
            program: PathBuf::from("ffmpeg"),
        }
    }
}

/// ffmpeg muxer name for a file extension; MP4 when unknown.
pub fn container_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mov") => "mov",
        Some("mkv") => "matroska",
        Some("webm") => "webm",
        _ => "mp4",
    }
}

type SharedChild = Arc<Mutex<Option<Child>>>;

fn lock_child(child: &SharedChild) -> MutexGuard<'_, Option<Child>> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kills the encoder once the deadline passes, even while a frame write is blocked on a full pipe.
struct Watchdog {
    stop: mpsc::Sender<()>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn spawn(shared: SharedChild, limit: Duration) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = std::thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(limit) {
                flag.store(true, Ordering::SeqCst);
                if let Some(child) = lock_child(&shared).as_mut() {
                    let _ = child.kill();
                }
                tracing::warn!(limit_ms = limit.as_millis() as u64, "ffmpeg deadline hit, killed");
            }
        });
        Self {
            stop,
            fired,
            handle,
        }
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Stop the watchdog and report whether it killed the encoder.
    fn disarm(self) -> bool {
        let _ = self.stop.send(());
        let _ = self.handle.join();
        self.fired.load(Ordering::SeqCst)
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: SharedChild,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    watchdog: Option<Watchdog>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: Arc::new(Mutex::new(None)),
            stdin: None,
            stderr_drain: None,
            watchdog: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn timeout_error(&self) -> LakebloomError {
        LakebloomError::timeout(format!(
            "ffmpeg encode of '{}' exceeded {} ms",
            self.opts.out_path.display(),
            self.opts.timeout.map(|t| t.as_millis()).unwrap_or(0)
        ))
    }

    fn deadline_hit(&self) -> bool {
        self.watchdog.as_ref().is_some_and(Watchdog::fired)
    }

    fn wait_for_exit(&self) -> LakebloomResult<ExitStatus> {
        if self.watchdog.is_none() {
            let Some(mut child) = lock_child(&self.child).take() else {
                return Err(LakebloomError::encode("ffmpeg sink not started"));
            };
            return child.wait().map_err(|e| {
                LakebloomError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
            });
        }
        // The child stays shared so the watchdog can still kill it while we poll.
        loop {
            {
                let mut guard = lock_child(&self.child);
                let child = guard
                    .as_mut()
                    .ok_or_else(|| LakebloomError::encode("ffmpeg sink not started"))?;
                match child.try_wait() {
                    Ok(Some(status)) => {
                        guard.take();
                        return Ok(status);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        return Err(LakebloomError::encode(format!(
                            "failed to poll ffmpeg: {e}"
                        )));
                    }
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(&mut self) {
        drop(self.stdin.take());
        let child = lock_child(&self.child).take();
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.disarm();
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.kill();
    }
}

impl VideoSink for FfmpegSink {
    fn codec(&self) -> &'static str {
        FFMPEG_CODEC
    }

    fn begin(&mut self, cfg: SinkConfig) -> LakebloomResult<()> {
        cfg.validate()?;
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(LakebloomError::malformed_frame(format!(
                "ffmpeg output needs even width/height for yuv420p, got {}x{}",
                cfg.width, cfg.height
            )));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !program_runs(&self.opts.program) {
            return Err(LakebloomError::backend_unavailable(format!(
                "ffmpeg is required for video encoding, but '{}' could not be run",
                self.opts.program.display()
            )));
        }

        let mut cmd = Command::new(&self.opts.program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Frames arrive as raw RGBA8 already flattened to opaque in push_frame.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);
        cmd.args([
            "-an",
            "-c:v",
            FFMPEG_CODEC,
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            &self.opts.container,
        ]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            LakebloomError::backend_unavailable(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LakebloomError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LakebloomError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps.as_f64(),
            "ffmpeg started"
        );
        self.scratch = vec![0u8; (cfg.width * cfg.height * 4) as usize];
        *lock_child(&self.child) = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.watchdog = self
            .opts
            .timeout
            .map(|limit| Watchdog::spawn(Arc::clone(&self.child), limit));
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LakebloomResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| LakebloomError::encode("ffmpeg sink not started"))?;
        check_frame(&cfg, self.last_idx, idx, frame)?;
        if self.deadline_hit() {
            self.kill();
            return Err(self.timeout_error());
        }
        self.last_idx = Some(idx);

        flatten_premul_over_bg(&mut self.scratch, &frame.data, self.opts.bg_rgb)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(LakebloomError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        if let Err(e) = stdin.write_all(&self.scratch) {
            // A killed encoder surfaces here as a broken pipe.
            let err = if self.deadline_hit() {
                self.timeout_error()
            } else {
                LakebloomError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
            };
            self.kill();
            return Err(err);
        }
        Ok(())
    }

    fn end(&mut self) -> LakebloomResult<()> {
        drop(self.stdin.take());
        let status = self.wait_for_exit()?;
        let timed_out = self.watchdog.take().is_some_and(Watchdog::disarm);
        if timed_out {
            return Err(self.timeout_error());
        }
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| LakebloomError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| LakebloomError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(LakebloomError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // Rawvideo input takes its rate from `-r` placed before `-i`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    program_runs(Path::new("ffmpeg"))
}

fn program_runs(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
