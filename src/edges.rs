use crate::decoder::VideoFrame;
use image::GrayImage;
use log::debug;

/// Edge strength written for pixels that survive hysteresis
pub const EDGE_ON: u8 = 255;

/// Detects structural edges in a decoded frame.
///
/// The detection chain is luminance -> box blur -> Sobel gradient ->
/// non-maximum suppression -> dual-threshold hysteresis, producing a binary
/// edge map the same size as the input frame. The map is frame-local and
/// carries no state between frames.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    blur_kernel: u32,
    low: f32,
    high: f32,
}

impl EdgeDetector {
    /// Create a detector with the given blur kernel and hysteresis thresholds
    pub fn new(blur_kernel: u32, low: f32, high: f32) -> Self {
        Self {
            blur_kernel,
            low,
            high,
        }
    }

    /// Extract a binary edge map from a frame
    pub fn detect(&self, frame: &VideoFrame) -> GrayImage {
        let width = frame.width as usize;
        let height = frame.height as usize;

        let luma = luminance(&frame.data, width, height);
        let blurred = box_blur(&luma, width, height, self.blur_kernel as usize);
        let (magnitude, direction) = sobel(&blurred, width, height);
        let thinned = suppress_non_maxima(&magnitude, &direction, width, height);
        let edges = hysteresis(&thinned, width, height, self.low, self.high);

        debug!(
            "Edge map for frame {}: {} edge pixels",
            frame.frame_number,
            edges.iter().filter(|&&v| v == EDGE_ON).count()
        );

        GrayImage::from_raw(frame.width, frame.height, edges)
            .unwrap_or_else(|| GrayImage::new(frame.width, frame.height))
    }
}

/// Convert packed RGB24 data to a BT.709 luminance buffer
fn luminance(data: &[u8], width: usize, height: usize) -> Vec<f32> {
    let mut luma = vec![0.0f32; width * height];
    for (i, value) in luma.iter_mut().enumerate() {
        let base = i * 3;
        if base + 2 < data.len() {
            let r = data[base] as f32;
            let g = data[base + 1] as f32;
            let b = data[base + 2] as f32;
            *value = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        }
    }
    luma
}

/// Separable box blur with replicated borders
fn box_blur(src: &[f32], width: usize, height: usize, kernel: usize) -> Vec<f32> {
    let radius = (kernel / 2) as isize;
    if radius == 0 {
        return src.to_vec();
    }
    let norm = 1.0 / kernel as f32;

    // Horizontal pass
    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for dx in -radius..=radius {
                let sx = (x as isize + dx).clamp(0, width as isize - 1) as usize;
                sum += src[y * width + sx];
            }
            horizontal[y * width + x] = sum * norm;
        }
    }

    // Vertical pass
    let mut blurred = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for dy in -radius..=radius {
                let sy = (y as isize + dy).clamp(0, height as isize - 1) as usize;
                sum += horizontal[sy * width + x];
            }
            blurred[y * width + x] = sum * norm;
        }
    }
    blurred
}

/// Sobel gradient magnitude and quantized direction (4 sectors).
///
/// The one-pixel outer border is left at zero magnitude.
fn sobel(src: &[f32], width: usize, height: usize) -> (Vec<f32>, Vec<u8>) {
    let mut magnitude = vec![0.0f32; width * height];
    let mut direction = vec![0u8; width * height];
    if width < 3 || height < 3 {
        return (magnitude, direction);
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let p = |dx: isize, dy: isize| -> f32 {
                src[(y as isize + dy) as usize * width + (x as isize + dx) as usize]
            };
            let gx = -p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1)
                + p(1, -1)
                + 2.0 * p(1, 0)
                + p(1, 1);
            let gy = -p(-1, -1) - 2.0 * p(0, -1) - p(1, -1)
                + p(-1, 1)
                + 2.0 * p(0, 1)
                + p(1, 1);

            let idx = y * width + x;
            magnitude[idx] = (gx * gx + gy * gy).sqrt();

            // Quantize the gradient angle into 0, 45, 90 or 135 degrees
            let angle = gy.atan2(gx).to_degrees();
            let angle = if angle < 0.0 { angle + 180.0 } else { angle };
            direction[idx] = if !(22.5..157.5).contains(&angle) {
                0 // horizontal gradient, vertical edge
            } else if angle < 67.5 {
                1 // rising diagonal
            } else if angle < 112.5 {
                2 // vertical gradient, horizontal edge
            } else {
                3 // falling diagonal
            };
        }
    }
    (magnitude, direction)
}

/// Keep only pixels that are local maxima along their gradient direction
fn suppress_non_maxima(
    magnitude: &[f32],
    direction: &[u8],
    width: usize,
    height: usize,
) -> Vec<f32> {
    let mut thinned = vec![0.0f32; width * height];
    if width < 3 || height < 3 {
        return thinned;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            let mag = magnitude[idx];
            if mag == 0.0 {
                continue;
            }
            // Neighbors along the gradient; y grows downward, so a gradient
            // in the 45 degree sector points toward the lower-right pixel
            let (a, b) = match direction[idx] {
                0 => (magnitude[idx - 1], magnitude[idx + 1]),
                1 => (magnitude[idx - width - 1], magnitude[idx + width + 1]),
                2 => (magnitude[idx - width], magnitude[idx + width]),
                _ => (magnitude[idx - width + 1], magnitude[idx + width - 1]),
            };
            if mag >= a && mag >= b {
                thinned[idx] = mag;
            }
        }
    }
    thinned
}

/// Dual-threshold hysteresis: strong pixels seed a flood fill that promotes
/// connected weak pixels; everything else is discarded.
fn hysteresis(magnitude: &[f32], width: usize, height: usize, low: f32, high: f32) -> Vec<u8> {
    let mut edges = vec![0u8; width * height];
    let mut stack = Vec::new();

    for (idx, &mag) in magnitude.iter().enumerate() {
        if mag >= high {
            edges[idx] = EDGE_ON;
            stack.push(idx);
        }
    }

    while let Some(idx) = stack.pop() {
        let x = (idx % width) as isize;
        let y = (idx / width) as isize;
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let nidx = ny as usize * width + nx as usize;
                if edges[nidx] == 0 && magnitude[nidx] >= low {
                    edges[nidx] = EDGE_ON;
                    stack.push(nidx);
                }
            }
        }
    }
    edges
}
