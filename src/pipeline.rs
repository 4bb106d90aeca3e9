use crate::config::RenderConfig;
use crate::decoder::{FrameRead, FrameSource, VideoDecoder, VideoFrame};
use crate::edges::EdgeDetector;
use crate::encoder::{FrameSink, VideoEncoder};
use crate::glyph::GlyphRenderer;
use crate::sampler::{sample_cells, TextGrid};
use crate::utils::format_elapsed;
use anyhow::{anyhow, Result};
use image::RgbImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// How often a progress line is logged while rendering
const PROGRESS_INTERVAL: u64 = 100;

/// Callback invoked once per rendered frame.
///
/// Production runs attach no observer; test harnesses and interactive
/// viewers can hook in here without the pipeline knowing about them.
pub trait FrameObserver {
    fn frame_rendered(&mut self, index: u64, canvas: &RgbImage);
}

/// Summary of one processed input file
#[derive(Debug)]
pub struct FileReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub frames_read: u64,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub elapsed_ms: u64,
}

/// Sequences decode -> edge detection -> sampling -> glyph rendering ->
/// encode for every frame of an input file, strictly in source order.
pub struct Pipeline {
    config: RenderConfig,
    detector: EdgeDetector,
}

impl Pipeline {
    /// Build a pipeline from a validated configuration
    pub fn new(config: RenderConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|msg| anyhow!("Invalid configuration: {}", msg))?;
        let detector = EdgeDetector::new(
            config.blur_kernel,
            config.edge_low,
            config.edge_high(),
        );
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Process one input file end to end.
    ///
    /// Fails fast if the source cannot be opened or the destination cannot
    /// be created; a failure here aborts the whole batch.
    pub fn process_file(
        &self,
        input: &Path,
        observer: Option<&mut dyn FrameObserver>,
    ) -> Result<FileReport> {
        info!("Reading in {}...", input.display());
        let decoder = VideoDecoder::new(input)?;

        let stats = decoder.stats();
        info!("{} stats:", input.display());
        info!("  + Frames: {}", stats.frames);
        info!("  + Size:   {}x{}", stats.width, stats.height);
        info!("  + Rate:   {:.2} FPS", stats.fps);

        let grid = TextGrid::new(self.config.columns, self.config.rows, stats.width, stats.height)?;
        let renderer = GlyphRenderer::new(&self.config);
        let (canvas_w, canvas_h) = renderer.canvas_size();

        let output_path = self.config.output_path(input);
        let encoder = VideoEncoder::new(&output_path, canvas_w, canvas_h, stats.fps)?;

        let start = Instant::now();
        let (frames_read, frames_rendered, frames_skipped) =
            self.run(decoder, encoder, &grid, &renderer, observer)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!("  + Video processing time: {}", format_elapsed(elapsed_ms));

        Ok(FileReport {
            input_path: input.to_path_buf(),
            output_path,
            frames_read,
            frames_rendered,
            frames_skipped,
            elapsed_ms,
        })
    }

    /// Drive a frame source into a frame sink until the source ends.
    ///
    /// Returns `(frames_read, frames_rendered, frames_skipped)`. Empty frames
    /// advance the counter without producing output, so the sink may receive
    /// fewer frames than were read; that discrepancy is accepted.
    pub fn run<S: FrameSource, K: FrameSink>(
        &self,
        mut source: S,
        mut sink: K,
        grid: &TextGrid,
        renderer: &GlyphRenderer,
        mut observer: Option<&mut dyn FrameObserver>,
    ) -> Result<(u64, u64, u64)> {
        let stats = source.stats();
        let total = stats.frames;
        let mut frames_read = 0u64;
        let mut frames_rendered = 0u64;
        let mut frames_skipped = 0u64;

        loop {
            if total > 0 && frames_read >= total {
                break;
            }
            match source.next_frame()? {
                FrameRead::Frame(frame) => {
                    // A frame smaller than the source advertised cannot be
                    // sampled against the grid; treat it like a decode gap
                    if frame.width != stats.width || frame.height != stats.height {
                        warn!(
                            "Skipping frame {} with unexpected size {}x{} (source reported {}x{})",
                            frames_read, frame.width, frame.height, stats.width, stats.height
                        );
                        frames_read += 1;
                        frames_skipped += 1;
                        continue;
                    }
                    let canvas = self.render_frame(&frame, grid, renderer);
                    sink.write(&canvas, frames_rendered as i64)?;
                    if let Some(ref mut obs) = observer {
                        obs.frame_rendered(frames_read, &canvas);
                    }
                    frames_read += 1;
                    frames_rendered += 1;

                    if frames_read % PROGRESS_INTERVAL == 0 {
                        if total > 0 {
                            info!("Rendered {}/{} frames", frames_read, total);
                        } else {
                            info!("Rendered {} frames", frames_read);
                        }
                    }
                }
                FrameRead::Empty => {
                    warn!("Skipping empty frame at index {}", frames_read);
                    frames_read += 1;
                    frames_skipped += 1;
                }
                FrameRead::End => break,
            }
        }

        sink.finish()?;
        debug!(
            "Source drained: {} read, {} rendered, {} skipped",
            frames_read, frames_rendered, frames_skipped
        );
        Ok((frames_read, frames_rendered, frames_skipped))
    }

    /// Re-render one decoded frame as an ASCII canvas.
    ///
    /// Pure per-frame function: the result depends only on this frame and
    /// the run configuration, never on earlier frames.
    pub fn render_frame(
        &self,
        frame: &VideoFrame,
        grid: &TextGrid,
        renderer: &GlyphRenderer,
    ) -> RgbImage {
        let edges = self.detector.detect(frame);
        let samples = sample_cells(frame, &edges, grid);
        renderer.render(&samples)
    }
}
