use ffmpeg_next as ffmpeg;
use std::path::Path;
use anyhow::{Result, anyhow};
use image::RgbImage;
use log::{debug, info};

/// Anything the pipeline can push rendered canvases into.
///
/// `finish` must be called once after the last frame so trailing container
/// data is flushed; dropping a sink without finishing it loses the tail of
/// the file.
pub trait FrameSink {
    fn write(&mut self, canvas: &RgbImage, index: i64) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn write(&mut self, canvas: &RgbImage, index: i64) -> Result<()> {
        (**self).write(canvas, index)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Video encoder that serializes rendered canvases into a playable file
pub struct VideoEncoder {
    output_context: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl VideoEncoder {
    /// Open an output file for frames of the given size and rate
    pub fn new(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        match ffmpeg::init() {
            Ok(_) => debug!("FFmpeg initialized successfully"),
            Err(e) => debug!("FFmpeg init error: {:?}", e),
        }

        debug!("Opening output file: {}", path.display());
        let mut output_context = ffmpeg::format::output(&path)
            .map_err(|e| anyhow!("Failed to open '{}' for writing: {}", path.display(), e))?;

        // Pick the container's default video codec
        let codec_id = output_context
            .format()
            .codec(&path, ffmpeg::media::Type::Video);
        let codec = ffmpeg::encoder::find(codec_id)
            .or_else(|| ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4))
            .ok_or_else(|| anyhow!("No video encoder available for '{}'", path.display()))?;

        let global_header = output_context
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let mut stream = output_context
            .add_stream(codec)
            .map_err(|e| anyhow!("Failed to add video stream: {}", e))?;
        let stream_index = stream.index();

        let rate = ffmpeg::Rational((fps * 1000.0).round() as i32, 1000);

        let mut encoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| anyhow!("Failed to create codec context: {}", e))?
            .encoder()
            .video()
            .map_err(|e| anyhow!("Failed to create video encoder: {}", e))?;

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_frame_rate(Some(rate));
        encoder.set_time_base(rate.invert());
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|e| anyhow!("Failed to open encoder: {}", e))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(rate.invert());

        output_context
            .write_header()
            .map_err(|e| anyhow!("Failed to write container header: {}", e))?;

        let scaler = ffmpeg::software::scaling::Context::get(
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| anyhow!("Failed to create scaling context: {}", e))?;

        info!(
            "Opened output '{}' ({}x{} @ {:.2} FPS)",
            path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            output_context,
            encoder,
            scaler,
            stream_index,
            encoder_time_base: rate.invert(),
            width,
            height,
            frames_written: 0,
        })
    }

    /// Number of frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Forward every packet the encoder has ready into the container
    fn drain(&mut self) -> Result<()> {
        // The muxer may adjust the stream time base when the header is
        // written, so packet timestamps are rescaled from the encoder's
        let time_base = self.encoder_time_base;
        let stream_time_base = self
            .output_context
            .stream(self.stream_index)
            .map(|s| s.time_base())
            .unwrap_or(time_base);

        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(time_base, stream_time_base);
            packet
                .write_interleaved(&mut self.output_context)
                .map_err(|e| anyhow!("Failed to write packet: {}", e))?;
        }
        Ok(())
    }
}

impl FrameSink for VideoEncoder {
    fn write(&mut self, canvas: &RgbImage, index: i64) -> Result<()> {
        if canvas.dimensions() != (self.width, self.height) {
            return Err(anyhow!(
                "Canvas size {}x{} does not match encoder size {}x{}",
                canvas.width(),
                canvas.height(),
                self.width,
                self.height
            ));
        }

        // Copy the packed canvas into an FFmpeg frame, honoring its stride
        let mut rgb_frame =
            ffmpeg::frame::Video::new(ffmpeg::format::Pixel::RGB24, self.width, self.height);
        let stride = rgb_frame.stride(0);
        let row_len = (self.width * 3) as usize;
        {
            let plane = rgb_frame.data_mut(0);
            for (y, row) in canvas.as_raw().chunks_exact(row_len).enumerate() {
                plane[y * stride..y * stride + row_len].copy_from_slice(row);
            }
        }

        let mut yuv_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb_frame, &mut yuv_frame)
            .map_err(|e| anyhow!("Failed to convert canvas to YUV: {}", e))?;
        yuv_frame.set_pts(Some(index));

        self.encoder
            .send_frame(&yuv_frame)
            .map_err(|e| anyhow!("Failed to send frame to encoder: {}", e))?;
        self.drain()?;

        self.frames_written += 1;
        debug!("Encoded frame {} (pts {})", self.frames_written, index);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.encoder
            .send_eof()
            .map_err(|e| anyhow!("Failed to flush encoder: {}", e))?;
        self.drain()?;
        self.output_context
            .write_trailer()
            .map_err(|e| anyhow!("Failed to write container trailer: {}", e))?;
        info!("Finalized output after {} frames", self.frames_written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_unwritable_destination() {
        let bad_path = PathBuf::from("/nonexistent-dir/out.mp4");
        let result = VideoEncoder::new(&bad_path, 64, 64, 25.0);
        assert!(result.is_err(), "Should fail for unwritable destination");
    }
}
