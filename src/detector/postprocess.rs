//! Detector postprocessing (spec §4.C): heatmap thresholding, connected
//! components with link suppression, adaptive dilation, minimum-area
//! rectangle extraction, margin-free box emission at both heatmap and
//! original-image scale.

use crate::geom::{self, Point, Quad};
use crate::runtime::inference::HeatmapPair;
use crate::trace::{self, steps, TraceStep, TraceWriter};

/// Thresholds driving component validity and pixel masking (spec §3
/// Options, the subset relevant to postprocessing).
#[derive(Debug, Clone, Copy)]
pub struct PostprocessOptions {
    pub text_threshold: f32,
    pub low_text: f32,
    pub link_threshold: f32,
}

/// Minimum connected-component area to be considered a candidate box
/// (spec §4.C step 2, a fixed constant, not a caller-tunable option).
const MIN_COMPONENT_AREA: usize = 10;

/// A detected box at both heatmap resolution (for tracing/diffing) and
/// back-projected original-image coordinates (feeds grouping).
#[derive(Debug, Clone)]
pub struct DetectedBox {
    pub heatmap_quad: Quad,
    pub image_quad: Quad,
}

/// Runs flood fill + minimum-area rectangle extraction over a heatmap
/// pair, returning boxes in both heatmap and original-image coordinates.
///
/// `padded_width`/`padded_height` are the detector's padded input
/// dimensions (spec §4.B); the ratio between them and the heatmap
/// dimensions re-derives the coordinate-projection divisor instead of
/// hard-coding "/2" (spec §9 open question 1).
pub fn detect_boxes(
    heatmaps: &HeatmapPair,
    opts: PostprocessOptions,
    padded_width: u32,
    padded_height: u32,
    trace_sink: Option<&dyn TraceWriter>,
) -> Vec<DetectedBox> {
    let w = heatmaps.width;
    let h = heatmaps.height;

    trace::emit(
        trace_sink,
        steps::HEATMAP_TEXT,
        TraceStep::Tensor {
            shape: vec![h, w],
            preview: heatmaps.text.iter().take(8).copied().collect(),
        },
    );
    trace::emit(
        trace_sink,
        steps::HEATMAP_LINK,
        TraceStep::Tensor {
            shape: vec![h, w],
            preview: heatmaps.link.iter().take(8).copied().collect(),
        },
    );

    let text_score: Vec<bool> = heatmaps.text.iter().map(|&v| v > opts.low_text).collect();
    let link_score: Vec<bool> = heatmaps.link.iter().map(|&v| v > opts.link_threshold).collect();
    let combined: Vec<bool> = text_score
        .iter()
        .zip(link_score.iter())
        .map(|(&t, &l)| t || l)
        .collect();

    let ratio_x = padded_width as f64 / w.max(1) as f64;
    let ratio_y = padded_height as f64 / h.max(1) as f64;

    let mut visited = vec![false; w * h];
    let mut boxes = Vec::new();

    for start in 0..(w * h) {
        if visited[start] || !combined[start] {
            continue;
        }

        let component = flood_fill(&combined, &mut visited, w, h, start);
        let peak_text = component
            .iter()
            .map(|&idx| heatmaps.text[idx])
            .fold(f32::MIN, f32::max);

        if component.len() < MIN_COMPONENT_AREA || peak_text < opts.text_threshold {
            continue;
        }

        let (min_x, min_y, max_x, max_y) = bounding_box(&component, w);
        let bw = (max_x - min_x + 1) as i64;
        let bh = (max_y - min_y + 1) as i64;

        // Suppress link-only pixels: drop component pixels where the
        // link score fired but the text score didn't (spec §4.C step 3).
        let mut segmap: Vec<bool> = vec![false; w * h];
        for &idx in &component {
            segmap[idx] = text_score[idx];
        }

        let area = component.len() as f64;
        let niter = ((area * bw.min(bh) as f64 / (bw * bh) as f64).sqrt() * 2.0).trunc() as i64;
        let kernel = 1 + niter;
        let dilated = dilate(&segmap, w, h, min_x, min_y, max_x, max_y, niter, kernel);

        let points: Vec<Point> = dilated
            .iter()
            .map(|&idx| {
                let x = (idx % w) as f64;
                let y = (idx / w) as f64;
                Point::new(x, y)
            })
            .collect();

        if points.is_empty() {
            continue;
        }

        let min_area = geom::min_area_rect(&points);
        let quad = min_area
            .map(|r| {
                let (rw, rh) = (r.quad.width(), r.quad.height());
                let aspect = if rh.abs() > 1e-9 { rw / rh } else { 1.0 };
                if (aspect - 1.0).abs() < 0.1 {
                    axis_aligned_bounds(&points)
                } else {
                    r.quad
                }
            })
            .unwrap_or_else(|| axis_aligned_bounds(&points));

        let heatmap_quad = quad.ordered_clockwise();
        let image_quad = project_quad(&heatmap_quad, ratio_x, ratio_y);

        boxes.push(DetectedBox {
            heatmap_quad,
            image_quad,
        });
    }

    trace::emit(
        trace_sink,
        steps::THRESHOLD_AND_BOX_DECODE,
        TraceStep::Boxes {
            count: boxes.len(),
            quads: boxes.iter().map(|b| quad_to_flat(&b.heatmap_quad)).collect(),
        },
    );
    trace::emit(
        trace_sink,
        steps::ADJUST_COORDINATES_TO_ORIGINAL,
        TraceStep::Boxes {
            count: boxes.len(),
            quads: boxes.iter().map(|b| quad_to_flat(&b.image_quad)).collect(),
        },
    );

    boxes
}

fn quad_to_flat(quad: &Quad) -> [f64; 8] {
    let mut flat = [0.0; 8];
    for (i, p) in quad.points.iter().enumerate() {
        flat[i * 2] = p.x;
        flat[i * 2 + 1] = p.y;
    }
    flat
}

fn flood_fill(
    combined: &[bool],
    visited: &mut [bool],
    w: usize,
    h: usize,
    start: usize,
) -> Vec<usize> {
    let mut stack = vec![start];
    let mut pixels = Vec::new();
    visited[start] = true;
    while let Some(idx) = stack.pop() {
        pixels.push(idx);
        let (x, y) = (idx % w, idx / w);
        let neighbors = [
            (x.checked_sub(1), Some(y)),
            (Some(x + 1).filter(|&v| v < w), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), Some(y + 1).filter(|&v| v < h)),
        ];
        for (nx, ny) in neighbors {
            if let (Some(nx), Some(ny)) = (nx, ny) {
                let nidx = ny * w + nx;
                if !visited[nidx] && combined[nidx] {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            }
        }
    }
    pixels
}

fn bounding_box(pixels: &[usize], w: usize) -> (usize, usize, usize, usize) {
    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for &idx in pixels {
        let (x, y) = (idx % w, idx / w);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}

/// Literal morphological dilation: a pixel in the output is set iff any
/// pixel within a `kernel`-sized square neighborhood in the input is
/// set. Operates within the component's bounding box extended by
/// `niter` pixels on each side (spec §4.C step 4).
#[allow(clippy::too_many_arguments)]
fn dilate(
    segmap: &[bool],
    w: usize,
    h: usize,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
    niter: i64,
    kernel: i64,
) -> Vec<usize> {
    let radius = (kernel / 2).max(0);
    let roi_x0 = (min_x as i64 - niter).max(0);
    let roi_y0 = (min_y as i64 - niter).max(0);
    let roi_x1 = (max_x as i64 + niter).min(w as i64 - 1);
    let roi_y1 = (max_y as i64 + niter).min(h as i64 - 1);

    let mut out = Vec::new();
    for y in roi_y0..=roi_y1 {
        for x in roi_x0..=roi_x1 {
            let mut hit = false;
            'window: for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let sx = x + dx;
                    let sy = y + dy;
                    if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                        continue;
                    }
                    if segmap[sy as usize * w + sx as usize] {
                        hit = true;
                        break 'window;
                    }
                }
            }
            if hit {
                out.push(y as usize * w + x as usize);
            }
        }
    }
    out
}

fn axis_aligned_bounds(points: &[Point]) -> Quad {
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    Quad::from_rect(min_x, min_y, max_x, max_y)
}

fn project_quad(quad: &Quad, ratio_x: f64, ratio_y: f64) -> Quad {
    Quad::new(quad.points.map(|p| Point::new(p.x * ratio_x, p.y * ratio_y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_heatmap(w: usize, h: usize, text_fill: f32, box_: (usize, usize, usize, usize, f32)) -> HeatmapPair {
        let mut text = vec![text_fill; w * h];
        let (x0, y0, x1, y1, v) = box_;
        for y in y0..y1 {
            for x in x0..x1 {
                text[y * w + x] = v;
            }
        }
        HeatmapPair {
            text,
            link: vec![0.0; w * h],
            width: w,
            height: h,
        }
    }

    #[test]
    fn flood_fill_on_8x8_block_produces_one_box() {
        let heatmaps = flat_heatmap(8, 8, 0.0, (2, 2, 6, 5, 0.9));
        let opts = PostprocessOptions {
            text_threshold: 0.5,
            low_text: 0.2,
            link_threshold: 0.5,
        };
        let boxes = detect_boxes(&heatmaps, opts, 16, 16, None);
        assert_eq!(boxes.len(), 1);
    }

    #[test]
    fn low_peak_text_is_discarded() {
        let heatmaps = flat_heatmap(8, 8, 0.0, (2, 2, 6, 5, 0.3));
        let opts = PostprocessOptions {
            text_threshold: 0.7,
            low_text: 0.2,
            link_threshold: 0.5,
        };
        let boxes = detect_boxes(&heatmaps, opts, 16, 16, None);
        assert!(boxes.is_empty());
    }

    #[test]
    fn coordinates_are_projected_by_derived_ratio() {
        let heatmaps = flat_heatmap(8, 8, 0.0, (2, 2, 6, 5, 0.9));
        let opts = PostprocessOptions {
            text_threshold: 0.5,
            low_text: 0.2,
            link_threshold: 0.5,
        };
        // padded dims are 4x the heatmap here (ratio 4, not the usual 2).
        let boxes = detect_boxes(&heatmaps, opts, 32, 32, None);
        assert_eq!(boxes.len(), 1);
        let hm = boxes[0].heatmap_quad;
        let img = boxes[0].image_quad;
        for (h, i) in hm.points.iter().zip(img.points.iter()) {
            assert!((i.x - h.x * 4.0).abs() < 1e-6);
            assert!((i.y - h.y * 4.0).abs() < 1e-6);
        }
    }
}
