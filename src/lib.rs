//! ASCII Encoder - A batch converter that re-renders video files as colored
//! ASCII edge sketches
//!
//! This crate converts each frame of a video into a fixed grid of character
//! cells: edges are detected per frame, every grid cell measures the edge
//! density of its pixel window, and cells that pass a density threshold get
//! a single glyph colored from the edge-bearing pixels underneath. The
//! re-rendered frames are encoded back into a playable video file.

pub mod cli;
pub mod config;
pub mod decoder;
pub mod edges;
pub mod encoder;
pub mod glyph;
pub mod pipeline;
pub mod sampler;

pub use cli::Cli;
pub use config::RenderConfig;
pub use decoder::{FrameRead, FrameSource, SourceStats, VideoDecoder, VideoFrame};
pub use edges::EdgeDetector;
pub use encoder::{FrameSink, VideoEncoder};
pub use glyph::GlyphRenderer;
pub use pipeline::{FileReport, FrameObserver, Pipeline};
pub use sampler::{sample_cells, window_stats, CellSample, TextGrid};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Package description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Error types used throughout the application
#[derive(thiserror::Error, Debug)]
pub enum AsciiEncoderError {
    #[error("Video processing error: {0}")]
    Video(#[from] ffmpeg_next::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, AsciiEncoderError>;

/// Utility functions
pub mod utils {
    /// Format a millisecond duration as seconds, e.g. `12.345s`
    pub fn format_elapsed(ms: u64) -> String {
        format!("{}.{:03}s", ms / 1000, ms % 1000)
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        cli::Cli,
        config::RenderConfig,
        decoder::{FrameRead, FrameSource, SourceStats, VideoDecoder, VideoFrame},
        edges::EdgeDetector,
        encoder::{FrameSink, VideoEncoder},
        glyph::GlyphRenderer,
        pipeline::{FileReport, FrameObserver, Pipeline},
        sampler::{sample_cells, window_stats, CellSample, TextGrid},
        utils::*,
        AsciiEncoderError,
    };
}

#[cfg(test)]
mod tests {
    use super::utils::format_elapsed;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0.000s");
        assert_eq!(format_elapsed(42), "0.042s");
        assert_eq!(format_elapsed(12345), "12.345s");
    }
}
