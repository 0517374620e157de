use super::{ScanBox, ScanEvent, ScanMode, ScannerEngine, ScannerOptions};
use crate::error::ScanError;
use async_trait::async_trait;
use image::{imageops, GrayImage};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Decodes still frames read from disk with `rqrr`.
///
/// In [`ScanMode::File`] every frame is decoded whole. In [`ScanMode::Camera`]
/// the frames stand in for a camera feed and are cropped to the viewfinder
/// aspect ratio and then to the centered scan box first.
pub struct FrameScanner {
    mode: ScanMode,
    sources: Vec<PathBuf>,
    queue: VecDeque<PathBuf>,
    options: ScannerOptions,
    paused: bool,
    started: bool,
}

impl FrameScanner {
    pub fn files(sources: Vec<PathBuf>) -> Self {
        Self::with_mode(ScanMode::File, sources)
    }

    pub fn camera_frames(sources: Vec<PathBuf>) -> Self {
        Self::with_mode(ScanMode::Camera, sources)
    }

    fn with_mode(mode: ScanMode, sources: Vec<PathBuf>) -> Self {
        Self {
            mode,
            sources,
            queue: VecDeque::new(),
            options: ScannerOptions::default(),
            paused: false,
            started: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn crop(&self, frame: GrayImage) -> GrayImage {
        if self.mode != ScanMode::Camera {
            return frame;
        }
        let frame = match self.options.aspect_ratio {
            Some(ratio) if ratio > 0.0 => crop_to_aspect(frame, ratio),
            _ => frame,
        };
        match self.options.scan_box {
            Some(scan_box) => crop_to_box(frame, scan_box),
            None => frame,
        }
    }
}

fn expand(sources: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    let mut frames = Vec::new();
    for source in sources {
        if source.is_dir() {
            let entries = fs::read_dir(source).map_err(|e| unavailable(source, e))?;
            let mut files = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file())
                .collect::<Vec<_>>();
            files.sort();
            frames.extend(files);
        } else if source.is_file() {
            frames.push(source.clone());
        } else {
            return Err(ScanError::CameraUnavailable(format!(
                "{} does not exist",
                source.display()
            )));
        }
    }
    Ok(frames)
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> ScanError {
    ScanError::CameraUnavailable(format!("cannot read {}: {}", path.display(), err))
}

fn crop_to_aspect(frame: GrayImage, ratio: f64) -> GrayImage {
    let (w, h) = frame.dimensions();
    let current = f64::from(w) / f64::from(h);
    let (cw, ch) = if current > ratio {
        (((f64::from(h) * ratio).round() as u32).clamp(1, w), h)
    } else {
        (w, ((f64::from(w) / ratio).round() as u32).clamp(1, h))
    };
    if (cw, ch) == (w, h) {
        return frame;
    }
    imageops::crop_imm(&frame, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image()
}

fn crop_to_box(frame: GrayImage, scan_box: ScanBox) -> GrayImage {
    let (w, h) = frame.dimensions();
    let cw = scan_box.width.clamp(1, w);
    let ch = scan_box.height.clamp(1, h);
    if (cw, ch) == (w, h) {
        return frame;
    }
    imageops::crop_imm(&frame, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image()
}

/// First QR payload found in `frame`.
pub fn decode_frame(frame: &GrayImage) -> Result<String, String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        frame.width() as usize,
        frame.height() as usize,
        |x, y| frame.get_pixel(x as u32, y as u32)[0],
    );
    let grids = prepared.detect_grids();
    let grid = grids
        .into_iter()
        .next()
        .ok_or_else(|| "no QR code found in frame".to_string())?;
    let (_meta, content) = grid.decode().map_err(|e| e.to_string())?;
    Ok(content)
}

#[async_trait]
impl ScannerEngine for FrameScanner {
    fn mode(&self) -> ScanMode {
        self.mode
    }

    async fn start(&mut self, options: &ScannerOptions) -> Result<(), ScanError> {
        let frames = expand(&self.sources)?;
        if frames.is_empty() {
            return Err(ScanError::CameraUnavailable(
                "no frames to scan".to_string(),
            ));
        }
        if options.show_torch_toggle && self.mode == ScanMode::Camera {
            log::debug!("Torch toggle requested; still frames have no torch");
        }
        log::debug!("Queued {} frame(s)", frames.len());
        self.queue = frames.into();
        self.options = options.clone();
        self.paused = false;
        self.started = true;
        Ok(())
    }

    async fn poll_frame(&mut self) -> Result<ScanEvent, ScanError> {
        if !self.started {
            return Err(ScanError::Lifecycle("scanner not started".to_string()));
        }
        if self.paused {
            return Ok(ScanEvent::Miss("scanner paused".to_string()));
        }
        let Some(path) = self.queue.pop_front() else {
            return Ok(ScanEvent::Exhausted);
        };

        let frame = tokio::task::spawn_blocking(move || {
            image::open(&path)
                .map(|img| img.to_luma8())
                .map_err(|e| unavailable(&path, e))
        })
        .await
        .map_err(|e| ScanError::Lifecycle(e.to_string()))??;

        match decode_frame(&self.crop(frame)) {
            Ok(text) => Ok(ScanEvent::Decoded(text)),
            Err(reason) => Ok(ScanEvent::Miss(reason)),
        }
    }

    async fn pause(&mut self, keep_camera_active: bool) -> Result<(), ScanError> {
        self.paused = true;
        if !keep_camera_active {
            self.queue.clear();
        }
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), ScanError> {
        if !self.started {
            return Err(ScanError::Lifecycle("scanner not started".to_string()));
        }
        self.paused = false;
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), ScanError> {
        self.queue.clear();
        self.started = false;
        Ok(())
    }
}
