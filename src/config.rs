use std::path::{Path, PathBuf};

/// Base glyph bitmap width in pixels (5 columns + 1 spacing).
pub const GLYPH_BASE_WIDTH: u32 = 6;

/// Base glyph bitmap height in pixels (7 rows + 2 spacing).
pub const GLYPH_BASE_HEIGHT: u32 = 9;

/// Immutable per-run rendering configuration.
///
/// One value of this type is built before processing starts and shared by
/// every stage of the pipeline; nothing in it changes while a run is active,
/// which is what guarantees that all frames of one input produce
/// identically-sized output frames.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Text grid width in character cells
    pub columns: u32,
    /// Text grid height in character cells
    pub rows: u32,
    /// The single character stamped into cells that pass the density test
    pub glyph: char,
    /// Integer scale applied to the base 5x7 glyph bitmap
    pub glyph_scale: u32,
    /// Odd box-blur kernel size applied before edge detection
    pub blur_kernel: u32,
    /// Low hysteresis threshold for the edge detector
    pub edge_low: f32,
    /// High threshold ratio; high = edge_ratio * edge_low
    pub edge_ratio: f32,
    /// Mean edge strength a cell must exceed (strictly) to get a glyph
    pub density_threshold: f64,
    /// Suffix appended to the input file stem when naming the output
    pub output_suffix: String,
    /// Container extension of the output file
    pub output_extension: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            columns: 120,
            rows: 54,
            glyph: '#',
            glyph_scale: 2,
            blur_kernel: 7,
            edge_low: 30.0,
            edge_ratio: 10.0,
            density_threshold: 20.0,
            output_suffix: "_out".to_string(),
            output_extension: "mp4".to_string(),
        }
    }
}

impl RenderConfig {
    /// Validate the configuration before a run starts
    pub fn validate(&self) -> Result<(), String> {
        if self.columns == 0 || self.rows == 0 {
            return Err("Text grid dimensions must be greater than 0".to_string());
        }

        if self.glyph_scale == 0 {
            return Err("Glyph scale must be greater than 0".to_string());
        }

        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(format!(
                "Blur kernel must be a positive odd number, got {}",
                self.blur_kernel
            ));
        }

        if self.edge_low <= 0.0 {
            return Err("Edge low threshold must be greater than 0".to_string());
        }

        if self.edge_ratio < 1.0 {
            return Err("Edge ratio must be at least 1".to_string());
        }

        if self.density_threshold < 0.0 {
            return Err("Density threshold must be non-negative".to_string());
        }

        if !self.glyph.is_ascii_graphic() {
            return Err(format!(
                "Glyph must be a printable ASCII character, got {:?}",
                self.glyph
            ));
        }

        Ok(())
    }

    /// Pixel width of one character cell in the output canvas
    pub fn char_width(&self) -> u32 {
        GLYPH_BASE_WIDTH * self.glyph_scale
    }

    /// Pixel height of one character cell in the output canvas
    pub fn char_height(&self) -> u32 {
        GLYPH_BASE_HEIGHT * self.glyph_scale
    }

    /// Output canvas dimensions, constant for every frame of a run
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.char_width() * self.columns, self.char_height() * self.rows)
    }

    /// High hysteresis threshold for the edge detector
    pub fn edge_high(&self) -> f32 {
        self.edge_low * self.edge_ratio
    }

    /// Build the output path for an input file.
    ///
    /// The source extension is dropped, not appended: `clip.mov` becomes
    /// `clip_out.mp4`.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}{}.{}", stem, self.output_suffix, self.output_extension);
        input.with_file_name(name)
    }
}
