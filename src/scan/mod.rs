//! Reading QR codes back: the paced decode loop, result classification and
//! what happens to a decoded payload afterwards.

mod actions;
mod classify;
mod frames;
mod session;

pub use actions::{ActionError, Clipboard, Navigator, SystemClipboard, SystemNavigator};
pub use classify::{classify, is_url, ScanKind};
pub use frames::FrameScanner;
pub use session::{RedirectTimer, ScanSession, REDIRECT_DELAY};

use crate::error::ScanError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanMode {
    Camera,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanBox {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScannerOptions {
    /// Decode attempts per second.
    pub fps: u32,
    /// Centered region frames are cropped to before decoding.
    pub scan_box: Option<ScanBox>,
    /// Width over height of the viewfinder.
    pub aspect_ratio: Option<f64>,
    pub show_torch_toggle: bool,
    pub allowed_modes: Vec<ScanMode>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            fps: 10,
            scan_box: Some(ScanBox {
                width: 250,
                height: 250,
            }),
            aspect_ratio: Some(1.0),
            show_torch_toggle: true,
            allowed_modes: vec![ScanMode::Camera, ScanMode::File],
        }
    }
}

impl ScannerOptions {
    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// Outcome of a single decode attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanEvent {
    Decoded(String),
    /// No code in this frame.
    Miss(String),
    /// The source has no more frames.
    Exhausted,
}

/// A frame source plus decoder.
#[async_trait]
pub trait ScannerEngine: Send {
    fn mode(&self) -> ScanMode;

    async fn start(&mut self, options: &ScannerOptions) -> Result<(), ScanError>;

    async fn poll_frame(&mut self) -> Result<ScanEvent, ScanError>;

    async fn pause(&mut self, keep_camera_active: bool) -> Result<(), ScanError>;

    async fn resume(&mut self) -> Result<(), ScanError>;

    /// Releases the source. Must be safe to call more than once.
    fn teardown(&mut self) -> Result<(), ScanError>;
}

/// A started scanner. The engine is torn down when this is closed or dropped.
pub struct Scanner<E: ScannerEngine> {
    engine: Option<E>,
    options: ScannerOptions,
    paused: bool,
}

impl<E: ScannerEngine> Scanner<E> {
    pub async fn open(mut engine: E, options: ScannerOptions) -> Result<Self, ScanError> {
        let mode = engine.mode();
        if !options.allowed_modes.contains(&mode) {
            return Err(ScanError::ModeNotAllowed(mode));
        }
        engine.start(&options).await?;
        log::debug!("Scanner started in {:?} mode at {} fps", mode, options.fps);
        Ok(Self {
            engine: Some(engine),
            options,
            paused: false,
        })
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn engine(&mut self) -> Result<&mut E, ScanError> {
        self.engine
            .as_mut()
            .ok_or_else(|| ScanError::Lifecycle("scanner already torn down".to_string()))
    }

    /// Runs the decode loop until a code is found or the source runs dry.
    ///
    /// Each miss is passed to `on_failure` and otherwise ignored. On success the
    /// scanner pauses with the camera kept active, `on_success` sees the text,
    /// and the text is returned. `Ok(None)` means the source was exhausted.
    pub async fn render<S, F>(
        &mut self,
        mut on_success: S,
        mut on_failure: F,
    ) -> Result<Option<String>, ScanError>
    where
        S: FnMut(&str) + Send,
        F: FnMut(&ScanError) + Send,
    {
        if self.paused {
            self.resume().await?;
        }

        let mut ticker = interval(self.options.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.engine()?.poll_frame().await? {
                ScanEvent::Decoded(text) => {
                    self.pause(true).await?;
                    log::info!("Decoded {} bytes", text.len());
                    on_success(&text);
                    return Ok(Some(text));
                }
                ScanEvent::Miss(reason) => {
                    log::trace!("Decode miss: {}", reason);
                    on_failure(&ScanError::Decode(reason));
                }
                ScanEvent::Exhausted => {
                    log::debug!("Frame source exhausted");
                    return Ok(None);
                }
            }
        }
    }

    pub async fn next_result(&mut self) -> Result<Option<String>, ScanError> {
        self.render(|_| {}, |_| {}).await
    }

    pub async fn pause(&mut self, keep_camera_active: bool) -> Result<(), ScanError> {
        self.engine()?.pause(keep_camera_active).await?;
        self.paused = true;
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), ScanError> {
        self.engine()?.resume().await?;
        self.paused = false;
        Ok(())
    }

    /// Tears the engine down now. Failures are logged, never returned.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            match engine.teardown() {
                Ok(()) => log::debug!("Scanner torn down"),
                Err(e) => log::warn!("Failed to tear down scanner: {}", e),
            }
        }
    }
}

impl<E: ScannerEngine> Drop for Scanner<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
