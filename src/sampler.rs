use crate::decoder::VideoFrame;
use anyhow::{anyhow, Result};
use image::GrayImage;
use log::debug;

/// Fixed text grid overlaid on a frame's pixel space.
///
/// Each cell maps to a `cell_width x cell_height` pixel window; remainder
/// pixels past the last exact multiple at the right and bottom edges are not
/// sampled by any window. The grid is built once per input file and never
/// changes during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextGrid {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl TextGrid {
    /// Build a grid for frames of the given size
    pub fn new(columns: u32, rows: u32, frame_width: u32, frame_height: u32) -> Result<Self> {
        let cell_width = frame_width / columns;
        let cell_height = frame_height / rows;
        if cell_width == 0 || cell_height == 0 {
            return Err(anyhow!(
                "Frame {}x{} too small for a {}x{} text grid",
                frame_width,
                frame_height,
                columns,
                rows
            ));
        }
        Ok(Self {
            columns,
            rows,
            cell_width,
            cell_height,
        })
    }

    /// Total number of cells sampled per frame
    pub fn cell_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }
}

/// Per-cell measurement: edge density and edge-weighted color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    pub row: u32,
    pub col: u32,
    /// Mean edge strength over the cell's sampling window
    pub density: f64,
    /// Mean frame color under the edge mask (RGB)
    pub color: (u8, u8, u8),
}

/// Measure density and color inside one sampling window.
///
/// `pixels` holds RGB triples and `edges` the matching edge values, both in
/// window scan order. Color is weighted by edge strength so it reflects the
/// edge-bearing pixels rather than the background; a window with no edges at
/// all gets black, which is never drawn because its density is zero.
pub fn window_stats(pixels: &[[u8; 3]], edges: &[u8]) -> (f64, (u8, u8, u8)) {
    debug_assert_eq!(pixels.len(), edges.len());
    if edges.is_empty() {
        return (0.0, (0, 0, 0));
    }

    let mut edge_sum = 0u64;
    let mut weighted = [0u64; 3];
    for (pixel, &edge) in pixels.iter().zip(edges) {
        edge_sum += edge as u64;
        let w = edge as u64;
        weighted[0] += pixel[0] as u64 * w;
        weighted[1] += pixel[1] as u64 * w;
        weighted[2] += pixel[2] as u64 * w;
    }

    let density = edge_sum as f64 / edges.len() as f64;
    let color = if edge_sum == 0 {
        (0, 0, 0)
    } else {
        (
            (weighted[0] / edge_sum) as u8,
            (weighted[1] / edge_sum) as u8,
            (weighted[2] / edge_sum) as u8,
        )
    };
    (density, color)
}

/// Sample every grid cell of a frame, in row-major order.
///
/// Produces exactly `grid.cell_count()` samples regardless of the frame
/// resolution; each sample depends only on pixels inside its own window.
pub fn sample_cells(frame: &VideoFrame, edges: &GrayImage, grid: &TextGrid) -> Vec<CellSample> {
    let mut samples = Vec::with_capacity(grid.cell_count());
    let frame_width = frame.width as usize;
    let window_len = (grid.cell_width * grid.cell_height) as usize;

    let mut pixels = Vec::with_capacity(window_len);
    let mut strengths = Vec::with_capacity(window_len);

    for row in 0..grid.rows {
        for col in 0..grid.columns {
            let x0 = col * grid.cell_width;
            let y0 = row * grid.cell_height;

            pixels.clear();
            strengths.clear();
            for y in y0..y0 + grid.cell_height {
                for x in x0..x0 + grid.cell_width {
                    let base = (y as usize * frame_width + x as usize) * 3;
                    pixels.push([frame.data[base], frame.data[base + 1], frame.data[base + 2]]);
                    strengths.push(edges.get_pixel(x, y).0[0]);
                }
            }

            let (density, color) = window_stats(&pixels, &strengths);
            samples.push(CellSample {
                row,
                col,
                density,
                color,
            });
        }
    }

    debug!(
        "Sampled {} cells for frame {} ({} windows of {}x{})",
        samples.len(),
        frame.frame_number,
        grid.cell_count(),
        grid.cell_width,
        grid.cell_height
    );
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::EDGE_ON;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        VideoFrame {
            data,
            width,
            height,
            timestamp: 0.0,
            frame_number: 0,
        }
    }

    #[test]
    fn test_grid_rejects_undersized_frames() {
        assert!(TextGrid::new(120, 54, 60, 60).is_err());
        assert!(TextGrid::new(10, 10, 100, 5).is_err());
    }

    #[test]
    fn test_grid_window_math() {
        let grid = TextGrid::new(10, 5, 105, 53).unwrap();
        assert_eq!(grid.cell_width, 10);
        assert_eq!(grid.cell_height, 10);
        assert_eq!(grid.cell_count(), 50);
    }

    #[test]
    fn test_cell_count_independent_of_resolution() {
        // Same grid, wildly different frame sizes: cardinality never changes
        for (w, h) in [(40, 20), (641, 333), (1920, 1080)] {
            let grid = TextGrid::new(8, 4, w, h).unwrap();
            let frame = solid_frame(w, h, [10, 20, 30]);
            let edges = GrayImage::new(w, h);
            let samples = sample_cells(&frame, &edges, &grid);
            assert_eq!(samples.len(), 32);
        }
    }

    #[test]
    fn test_samples_are_row_major() {
        let grid = TextGrid::new(3, 2, 30, 20).unwrap();
        let frame = solid_frame(30, 20, [0, 0, 0]);
        let edges = GrayImage::new(30, 20);
        let samples = sample_cells(&frame, &edges, &grid);

        let order: Vec<(u32, u32)> = samples.iter().map(|s| (s.row, s.col)).collect();
        assert_eq!(
            order,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn test_zero_edges_gives_zero_density() {
        let grid = TextGrid::new(4, 4, 64, 64).unwrap();
        let frame = solid_frame(64, 64, [200, 100, 50]);
        let edges = GrayImage::new(64, 64);
        for sample in sample_cells(&frame, &edges, &grid) {
            assert_eq!(sample.density, 0.0);
            assert_eq!(sample.color, (0, 0, 0));
        }
    }

    #[test]
    fn test_density_is_mean_edge_strength() {
        // Half of the window's edge pixels on -> density is half of EDGE_ON
        let pixels = vec![[255u8, 255, 255]; 4];
        let edges = vec![EDGE_ON, EDGE_ON, 0, 0];
        let (density, _) = window_stats(&pixels, &edges);
        assert_eq!(density, EDGE_ON as f64 / 2.0);
    }

    #[test]
    fn test_color_weighted_by_edge_mask() {
        // Red pixel carries the edge; blue background must not leak in
        let pixels = vec![[255u8, 0, 0], [0, 0, 255], [0, 0, 255], [0, 0, 255]];
        let edges = vec![EDGE_ON, 0, 0, 0];
        let (density, color) = window_stats(&pixels, &edges);
        assert!(density > 0.0);
        assert_eq!(color, (255, 0, 0));
    }

    #[test]
    fn test_empty_window() {
        let (density, color) = window_stats(&[], &[]);
        assert_eq!(density, 0.0);
        assert_eq!(color, (0, 0, 0));
    }

    #[test]
    fn test_cells_do_not_share_state() {
        // One edge pixel in the top-left cell only; all other cells stay zero
        let grid = TextGrid::new(2, 2, 20, 20).unwrap();
        let frame = solid_frame(20, 20, [128, 128, 128]);
        let mut edges = GrayImage::new(20, 20);
        edges.get_pixel_mut(3, 3).0[0] = EDGE_ON;

        let samples = sample_cells(&frame, &edges, &grid);
        assert!(samples[0].density > 0.0);
        for sample in &samples[1..] {
            assert_eq!(sample.density, 0.0);
        }
    }
}
