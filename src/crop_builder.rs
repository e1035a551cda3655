//! Crop builder (spec §4.E): axis-aligned crop for horizontal boxes,
//! perspective-warped crop for free polygons, optional rotation
//! duplication.

use crate::geom::Quad;
use crate::image_ops::{self, RasterImage};

/// A single crop ready for recognizer preprocessing, tagged with the
/// rotation angle it was produced at (0 when `rotationInfo` is empty).
#[derive(Debug, Clone)]
pub struct Crop {
    pub image: RasterImage,
    pub source_quad: Quad,
    pub rotation_deg: f64,
}

fn edge_len(a: crate::geom::Point, b: crate::geom::Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// True when a quad is axis-aligned within floating-point tolerance
/// (the grouping stage only emits true rectangles for horizontals, but
/// the crop builder re-derives this rather than trusting a flag).
fn is_axis_aligned_rect(quad: &Quad) -> bool {
    let p = quad.points;
    let horiz = (p[0].y - p[1].y).abs() < 1e-6 && (p[2].y - p[3].y).abs() < 1e-6;
    let vert = (p[1].x - p[2].x).abs() < 1e-6 && (p[3].x - p[0].x).abs() < 1e-6;
    horiz && vert
}

/// Builds one crop per quad (plus one per rotation angle if
/// `rotation_info` is non-empty), from the recognition image (spec
/// §4.E, §4.H step 4).
pub fn build_crops(image: &RasterImage, quads: &[Quad], rotation_info: &[f64]) -> Vec<Crop> {
    let mut crops = Vec::new();
    for quad in quads {
        let base = build_single_crop(image, quad);
        if rotation_info.is_empty() {
            crops.push(Crop {
                image: base,
                source_quad: *quad,
                rotation_deg: 0.0,
            });
        } else {
            for &angle in rotation_info {
                let rotated = rotate_arbitrary(&base, angle);
                crops.push(Crop {
                    image: rotated,
                    source_quad: *quad,
                    rotation_deg: angle,
                });
            }
        }
    }
    crops
}

fn build_single_crop(image: &RasterImage, quad: &Quad) -> RasterImage {
    if is_axis_aligned_rect(quad) {
        let min = quad.min_xy();
        let max = quad.max_xy();
        image.crop(min.x as i64, min.y as i64, max.x as i64, max.y as i64)
    } else {
        let p = quad.points;
        // Output rectangle dims: the longer of each pair of opposite
        // sides (spec §4.E). p0=TL, p1=TR, p2=BR, p3=BL, so width comes
        // from the top/bottom edges and height from the left/right ones.
        let width = edge_len(p[2], p[3]).max(edge_len(p[1], p[0]));
        let height = edge_len(p[1], p[2]).max(edge_len(p[0], p[3]));
        let w = width.round().max(1.0) as u32;
        let h = height.round().max(1.0) as u32;
        image_ops::perspective_warp(image, quad, w, h)
    }
}

/// Rotates a crop by a multiple of 90 degrees when possible, else
/// passes through verbatim (spec §4.A explicitly limits rotation
/// support to 0/90/180/270; `rotationInfo` entries outside that set are
/// a caller error the orchestrator does not second-guess here).
fn rotate_arbitrary(image: &RasterImage, angle_deg: f64) -> RasterImage {
    let rounded = angle_deg.round() as i32;
    if rounded % 90 == 0 {
        image_ops::rotate90(image, rounded)
    } else {
        image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::image_ops::ChannelOrder;

    #[test]
    fn horizontal_quad_crops_axis_aligned_region() {
        let data = vec![5u8; 20 * 20 * 3];
        let img = RasterImage::new(data, 20, 20, ChannelOrder::Rgb).unwrap();
        let quad = Quad::from_rect(2.0, 2.0, 10.0, 8.0);
        let crops = build_crops(&img, &[quad], &[]);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].image.width, 8);
        assert_eq!(crops[0].image.height, 6);
    }

    #[test]
    fn free_quad_uses_longer_opposite_side_for_output_size() {
        let data = vec![5u8; 20 * 20 * 3];
        let img = RasterImage::new(data, 20, 20, ChannelOrder::Rgb).unwrap();
        let quad = Quad::new([
            Point::new(1.0, 1.0),
            Point::new(9.0, 0.0),
            Point::new(10.0, 8.0),
            Point::new(0.0, 9.0),
        ]);
        let crops = build_crops(&img, &[quad], &[]);
        assert_eq!(crops.len(), 1);
        assert!(crops[0].image.width > 0 && crops[0].image.height > 0);
    }

    /// A clearly non-square, non-axis-aligned quad (top/bottom edges ~10,
    /// left/right edges ~4-5) catches width/height being transposed,
    /// which `width > 0 && height > 0` above does not.
    #[test]
    fn free_quad_output_width_and_height_are_not_transposed() {
        let data = vec![5u8; 20 * 20 * 3];
        let img = RasterImage::new(data, 20, 20, ChannelOrder::Rgb).unwrap();
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 4.0),
        ]);
        let crops = build_crops(&img, &[quad], &[]);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].image.width, 10);
        assert_eq!(crops[0].image.height, 5);
    }

    #[test]
    fn rotation_info_duplicates_each_crop() {
        let data = vec![5u8; 20 * 20 * 3];
        let img = RasterImage::new(data, 20, 20, ChannelOrder::Rgb).unwrap();
        let quad = Quad::from_rect(2.0, 2.0, 10.0, 8.0);
        let crops = build_crops(&img, &[quad], &[0.0, 90.0]);
        assert_eq!(crops.len(), 2);
    }
}
