use ffmpeg_next as ffmpeg;
use std::path::Path;
use anyhow::{Result, anyhow};
use log::{debug, info};

/// Metadata reported by a frame source before processing starts
#[derive(Debug, Clone, Copy)]
pub struct SourceStats {
    /// Total frame count reported by the container (0 when unknown)
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Outcome of one frame read.
///
/// `Empty` marks a transient decode gap (a frame slot with no usable pixel
/// data) and is distinct from `End`, which is the normal end of the stream.
#[derive(Debug)]
pub enum FrameRead {
    Frame(VideoFrame),
    Empty,
    End,
}

/// Anything the pipeline can pull decoded frames from
pub trait FrameSource {
    fn stats(&self) -> SourceStats;
    fn next_frame(&mut self) -> Result<FrameRead>;
}

/// Video decoder that extracts frames from video files
pub struct VideoDecoder {
    input_context: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
    frame_count: u64,
    total_frames: u64,
    fps: f64,
    eof_sent: bool,
}

/// Represents a decoded video frame with metadata
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Raw RGB data
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Frame number
    pub frame_number: u64,
}

impl VideoDecoder {
    /// Create a new VideoDecoder from a file path
    pub fn new(path: &Path) -> Result<Self> {
        // Initialize FFmpeg with error handling
        match ffmpeg::init() {
            Ok(_) => debug!("FFmpeg initialized successfully"),
            Err(e) => {
                debug!("FFmpeg init error: {:?}", e);
                // Continue anyway as this might not be fatal
            }
        }

        debug!("Attempting to open video file: {}", path.display());
        let input_context = ffmpeg::format::input(&path)
            .map_err(|e| {
                info!("FFmpeg error details: {:?}", e);
                anyhow!("Failed to open video file '{}': {}", path.display(), e)
            })?;
        debug!("Successfully opened video file");

        // Find the best video stream
        let stream = input_context
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("No video stream found in file '{}'", path.display()))?;

        let stream_index = stream.index();

        info!("Found video stream {} in file '{}'", stream_index, path.display());

        // Create decoder context
        let context_decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| anyhow!("Failed to create codec context: {}", e))?;

        let decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| anyhow!("Failed to create video decoder: {}", e))?;

        // Get video metadata
        let fps = stream.avg_frame_rate();
        let fps = if fps.denominator() != 0 {
            fps.numerator() as f64 / fps.denominator() as f64
        } else {
            25.0 // Default fallback FPS
        };

        let total_frames = stream.frames().max(0) as u64;

        debug!("Video info: {}x{}, {:.2} FPS, {} frames",
               decoder.width(), decoder.height(), fps, total_frames);

        Ok(Self {
            input_context,
            stream_index,
            decoder,
            scaler: None,
            frame_count: 0,
            total_frames,
            fps,
            eof_sent: false,
        })
    }

    /// Get video dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    /// Get the next frame from the video
    pub fn read_frame(&mut self) -> Result<FrameRead> {
        let mut decoded_frame = ffmpeg::frame::Video::empty();

        if !self.eof_sent {
            // Try to decode frames until we get one from our video stream
            for (stream, packet) in self.input_context.packets() {
                if stream.index() == self.stream_index {
                    self.decoder.send_packet(&packet)
                        .map_err(|e| anyhow!("Failed to send packet to decoder: {}", e))?;

                    // Try to receive decoded frame
                    match self.decoder.receive_frame(&mut decoded_frame) {
                        Ok(()) => {
                            self.frame_count += 1;
                            return self.convert_frame(&decoded_frame);
                        }
                        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::ffi::EAGAIN => {
                            // Need more input
                            continue;
                        }
                        Err(e) => {
                            return Err(anyhow!("Failed to receive frame from decoder: {}", e));
                        }
                    }
                }
            }

            // Input exhausted: switch the decoder into draining mode. The
            // flush packet may only be sent once; a repeat answers EOF,
            // which just means draining is already underway.
            match self.decoder.send_eof() {
                Ok(()) | Err(ffmpeg::Error::Eof) => self.eof_sent = true,
                Err(e) => return Err(anyhow!("Failed to send EOF to decoder: {}", e)),
            }
        }

        // Pull buffered frames out one per call until the decoder runs dry
        match self.decoder.receive_frame(&mut decoded_frame) {
            Ok(()) => {
                self.frame_count += 1;
                self.convert_frame(&decoded_frame)
            }
            Err(ffmpeg::Error::Eof) => Ok(FrameRead::End),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::ffi::EAGAIN => Ok(FrameRead::End),
            Err(e) => Err(anyhow!("Failed to receive final frame: {}", e)),
        }
    }

    /// Convert FFmpeg frame to RGB format
    fn convert_frame(&mut self, frame: &ffmpeg::frame::Video) -> Result<FrameRead> {
        let width = frame.width();
        let height = frame.height();

        // A decoded slot with no pixel data is a decode gap, not an error
        if width == 0 || height == 0 {
            debug!("Empty decoded frame at index {}", self.frame_count);
            return Ok(FrameRead::Empty);
        }

        // Initialize scaler if needed
        if self.scaler.is_none() {
            self.scaler = Some(
                ffmpeg::software::scaling::Context::get(
                    frame.format(),
                    width,
                    height,
                    ffmpeg::format::Pixel::RGB24,
                    width,
                    height,
                    ffmpeg::software::scaling::Flags::BILINEAR,
                ).map_err(|e| anyhow!("Failed to create scaling context: {}", e))?
            );
        }

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        if let Some(ref mut scaler) = self.scaler {
            scaler.run(frame, &mut rgb_frame)
                .map_err(|e| anyhow!("Failed to scale frame: {}", e))?;
        }

        // Calculate timestamp
        let time_base = self.input_context.stream(self.stream_index)
            .map(|s| s.time_base())
            .unwrap_or(ffmpeg::Rational(1, 1));
        let timestamp = match frame.timestamp() {
            Some(ts) if ts != ffmpeg::ffi::AV_NOPTS_VALUE => {
                ts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
            }
            _ => self.frame_count as f64 / self.fps,
        };

        // Extract packed RGB data, dropping any per-row padding
        let stride = rgb_frame.stride(0);
        let row_len = (width * 3) as usize;
        let plane = rgb_frame.data(0);
        let mut data = Vec::with_capacity(row_len * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            data.extend_from_slice(&plane[start..start + row_len]);
        }

        if data.is_empty() {
            debug!("Empty pixel plane at index {}", self.frame_count);
            return Ok(FrameRead::Empty);
        }

        debug!("Decoded frame {}: {}x{}, timestamp: {:.3}s",
               self.frame_count, width, height, timestamp);

        Ok(FrameRead::Frame(VideoFrame {
            data,
            width,
            height,
            timestamp,
            frame_number: self.frame_count,
        }))
    }
}

impl FrameSource for VideoDecoder {
    fn stats(&self) -> SourceStats {
        let (width, height) = self.dimensions();
        SourceStats {
            frames: self.total_frames,
            width,
            height,
            fps: self.fps,
        }
    }

    fn next_frame(&mut self) -> Result<FrameRead> {
        self.read_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_decoder_creation() {
        // This test requires a sample video file
        let test_video = PathBuf::from("tests/assets/sample.mp4");
        if test_video.exists() {
            let result = VideoDecoder::new(&test_video);
            assert!(result.is_ok(), "Failed to create decoder: {:?}", result.err());
        }
    }

    #[test]
    fn test_invalid_file() {
        let invalid_path = PathBuf::from("nonexistent.mp4");
        let result = VideoDecoder::new(&invalid_path);
        assert!(result.is_err(), "Should fail for nonexistent file");
    }
}
