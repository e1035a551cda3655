//! Box grouping (spec §4.D): slope classification, Y-center line
//! grouping, X-gap cluster merging, margin expansion, min-size filter.
//! The line-grouping/cluster-merging core is reused by orchestrator-level
//! line merging of recognized results (spec §4.H step 6).

use crate::geom::{Point, Quad};
use crate::options::Options;
use crate::trace::{self, steps, TraceStep, TraceWriter};

/// A classified box: either an axis-aligned rectangle summary
/// (horizontal) or a free-form padded quadrilateral.
#[derive(Debug, Clone)]
pub enum ClassifiedBox {
    Horizontal(HorizontalBox),
    Free(Quad),
}

/// An axis-aligned box summary used during line grouping (spec §4.D
/// step 1).
#[derive(Debug, Clone, Copy)]
pub struct HorizontalBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub y_center: f64,
    pub height: f64,
}

impl HorizontalBox {
    fn from_quad(quad: &Quad) -> Self {
        let min = quad.min_xy();
        let max = quad.max_xy();
        Self {
            x_min: min.x,
            x_max: max.x,
            y_min: min.y,
            y_max: max.y,
            y_center: (min.y + max.y) / 2.0,
            height: max.y - min.y,
        }
    }

    fn to_quad(self) -> Quad {
        Quad::from_rect(self.x_min, self.y_min, self.x_max, self.y_max)
    }

    fn expand_margin(self, margin: f64) -> Self {
        let min_side = (self.x_max - self.x_min).min(self.y_max - self.y_min);
        let pad = margin * min_side;
        Self {
            x_min: self.x_min - pad,
            x_max: self.x_max + pad,
            y_min: self.y_min - pad,
            y_max: self.y_max + pad,
            y_center: self.y_center,
            height: self.y_max - self.y_min + 2.0 * pad,
        }
    }
}

/// Classifies a quad as horizontal or free based on its top/bottom edge
/// slopes (spec §4.D step 1-2). `quad.points` are assumed ordered as
/// `[p0 (top-left), p1 (top-right), p2 (bottom-right), p3 (bottom-left)]`.
fn classify(quad: &Quad, slope_ths: f64, add_margin: f64) -> ClassifiedBox {
    let p = quad.points;
    let slope_up = (p[1].y - p[0].y) / (p[1].x - p[0].x).abs().max(10.0);
    let slope_down = (p[2].y - p[3].y) / (p[2].x - p[3].x).abs().max(10.0);

    if slope_up.abs().max(slope_down.abs()) < slope_ths {
        ClassifiedBox::Horizontal(HorizontalBox::from_quad(quad))
    } else {
        ClassifiedBox::Free(expand_free_margin(quad, add_margin))
    }
}

/// Expands a free-form polygon outward along each edge's own direction
/// by `margin * min(w, h)` (spec §4.D step 2).
fn expand_free_margin(quad: &Quad, margin: f64) -> Quad {
    let w = quad.width();
    let h = quad.height();
    let pad = margin * w.min(h);
    let center = {
        let sum = quad.points.iter().fold(Point::new(0.0, 0.0), |acc, p| {
            Point::new(acc.x + p.x, acc.y + p.y)
        });
        Point::new(sum.x / 4.0, sum.y / 4.0)
    };
    let expanded = quad.points.map(|p| {
        let dx = p.x - center.x;
        let dy = p.y - center.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-9 {
            p
        } else {
            Point::new(p.x + dx / len * pad, p.y + dy / len * pad)
        }
    });
    Quad::new(expanded)
}

/// A running line of horizontal boxes during grouping (spec §4.D step
/// 3, spec §9 "grouping state" redesign note: scoped mutable record, no
/// cross-call state).
struct RunningLine {
    boxes: Vec<HorizontalBox>,
    mean_y_center: f64,
    mean_height: f64,
}

impl RunningLine {
    fn new(first: HorizontalBox) -> Self {
        Self {
            mean_y_center: first.y_center,
            mean_height: first.height,
            boxes: vec![first],
        }
    }

    fn accepts(&self, b: &HorizontalBox, ycenter_ths: f64) -> bool {
        (b.y_center - self.mean_y_center).abs() < ycenter_ths * self.mean_height
    }

    fn push(&mut self, b: HorizontalBox) {
        self.boxes.push(b);
        let n = self.boxes.len() as f64;
        self.mean_y_center = self.boxes.iter().map(|b| b.y_center).sum::<f64>() / n;
        self.mean_height = self.boxes.iter().map(|b| b.height).sum::<f64>() / n;
    }
}

/// Groups a line's horizontal boxes into merged clusters by X-gap (spec
/// §4.D step 4), with margin expansion applied to every cluster
/// (including singletons, step 5).
fn merge_line(mut boxes: Vec<HorizontalBox>, opts: &Options) -> Vec<HorizontalBox> {
    boxes.sort_by(|a, b| a.x_min.partial_cmp(&b.x_min).unwrap());

    let mut clusters: Vec<Vec<HorizontalBox>> = Vec::new();
    for b in boxes {
        let joins = clusters.last().map(|cluster| {
            let last = cluster.last().unwrap();
            let height_ratio = ((b.height - last.height).abs()) / last.height.max(1e-9);
            let gap = b.x_min - last.x_max;
            height_ratio <= opts.height_ths && gap < opts.width_ths * (last.y_max - last.y_min)
        });
        if joins.unwrap_or(false) {
            clusters.last_mut().unwrap().push(b);
        } else {
            clusters.push(vec![b]);
        }
    }

    clusters
        .into_iter()
        .map(|cluster| {
            let x_min = cluster.iter().map(|b| b.x_min).fold(f64::INFINITY, f64::min);
            let x_max = cluster.iter().map(|b| b.x_max).fold(f64::NEG_INFINITY, f64::max);
            let y_min = cluster.iter().map(|b| b.y_min).fold(f64::INFINITY, f64::min);
            let y_max = cluster.iter().map(|b| b.y_max).fold(f64::NEG_INFINITY, f64::max);
            let merged = HorizontalBox {
                x_min,
                x_max,
                y_min,
                y_max,
                y_center: (y_min + y_max) / 2.0,
                height: y_max - y_min,
            };
            merged.expand_margin(opts.add_margin)
        })
        .collect()
}

fn quad_to_flat(quad: &Quad) -> [f64; 8] {
    let mut flat = [0.0; 8];
    for (i, p) in quad.points.iter().enumerate() {
        flat[i * 2] = p.x;
        flat[i * 2 + 1] = p.y;
    }
    flat
}

/// Groups detector output quads into horizontal (line-major,
/// left-to-right) and free boxes (discovery order), applying the
/// min-size filter last (spec §4.D).
pub fn group_boxes(quads: &[Quad], opts: &Options, trace_sink: Option<&dyn TraceWriter>) -> Vec<Quad> {
    let mut horizontals = Vec::new();
    let mut frees = Vec::new();

    for quad in quads {
        match classify(quad, opts.slope_ths, opts.add_margin) {
            ClassifiedBox::Horizontal(b) => horizontals.push(b),
            ClassifiedBox::Free(q) => frees.push(q),
        }
    }

    trace::emit(
        trace_sink,
        steps::DETECTOR_BOXES_HORIZONTAL,
        TraceStep::Boxes {
            count: horizontals.len(),
            quads: horizontals.iter().map(|b| quad_to_flat(&b.to_quad())).collect(),
        },
    );
    trace::emit(
        trace_sink,
        steps::DETECTOR_BOXES_FREE,
        TraceStep::Boxes {
            count: frees.len(),
            quads: frees.iter().map(quad_to_flat).collect(),
        },
    );

    horizontals.sort_by(|a, b| a.y_center.partial_cmp(&b.y_center).unwrap());

    let mut lines: Vec<RunningLine> = Vec::new();
    for b in horizontals {
        let line = lines
            .iter_mut()
            .find(|line| line.accepts(&b, opts.ycenter_ths));
        match line {
            Some(line) => line.push(b),
            None => lines.push(RunningLine::new(b)),
        }
    }

    let mut out = Vec::new();
    for line in lines {
        for merged in merge_line(line.boxes, opts) {
            out.push(merged.to_quad());
        }
    }
    for free in frees {
        out.push(free);
    }

    out.retain(|q| q.width().max(q.height()) > opts.min_size);

    trace::emit(
        trace_sink,
        steps::DETECTOR_BOXES_ORDERED,
        TraceStep::Boxes {
            count: out.len(),
            quads: out.iter().map(quad_to_flat).collect(),
        },
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Quad {
        Quad::from_rect(x0, y0, x1, y1)
    }

    #[test]
    fn two_close_boxes_merge_into_one_line_cluster() {
        let opts = Options::default();
        let quads = vec![rect(0.0, 0.0, 10.0, 10.0), rect(12.0, 0.0, 22.0, 10.0)];
        let grouped = group_boxes(&quads, &opts, None);
        assert_eq!(grouped.len(), 1);
    }

    #[test]
    fn far_apart_boxes_stay_separate() {
        let opts = Options::default();
        let quads = vec![rect(0.0, 0.0, 10.0, 10.0), rect(200.0, 0.0, 210.0, 10.0)];
        let grouped = group_boxes(&quads, &opts, None);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn tiny_boxes_are_filtered_by_min_size() {
        let mut opts = Options::default();
        opts.min_size = 50.0;
        let quads = vec![rect(0.0, 0.0, 10.0, 10.0)];
        let grouped = group_boxes(&quads, &opts, None);
        assert!(grouped.is_empty());
    }

    #[test]
    fn grouping_is_idempotent() {
        let opts = Options::default();
        let quads = vec![rect(0.0, 0.0, 10.0, 10.0), rect(12.0, 0.0, 22.0, 10.0)];
        let once = group_boxes(&quads, &opts, None);
        let twice = group_boxes(&once, &opts, None);
        assert_eq!(once.len(), twice.len());
    }
}
