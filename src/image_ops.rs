//! Image primitives: the raster image data model plus pure
//! transformations (resize, rotate, crop, perspective warp, pad, float
//! normalization) used by every preprocessing stage.
//!
//! All transforms here are pure functions over plain buffers; none of
//! them touch a model or a file.

use crate::error::{OcrError, Result};

/// How channels are laid out in a [`RasterImage`]'s byte buffer.
/// Channel order is metadata only — the pipeline never silently
/// reorders pixel data; consumers branch on this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    Gray,
}

impl ChannelOrder {
    pub fn channels(self) -> usize {
        match self {
            ChannelOrder::Rgb | ChannelOrder::Bgr => 3,
            ChannelOrder::Rgba | ChannelOrder::Bgra => 4,
            ChannelOrder::Gray => 1,
        }
    }

    fn is_bgr_family(self) -> bool {
        matches!(self, ChannelOrder::Bgr | ChannelOrder::Bgra)
    }
}

/// A contiguous, row-major, channel-interleaved (HWC) 8-bit image.
///
/// Invariant: `data.len() == width * height * channel_order.channels()`.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channel_order: ChannelOrder,
}

impl RasterImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channel_order: ChannelOrder) -> Result<Self> {
        let expected = width as usize * height as usize * channel_order.channels();
        if data.len() != expected {
            return Err(OcrError::BadInput {
                reason: format!(
                    "raster image buffer length {} does not match width*height*channels={}",
                    data.len(),
                    expected
                ),
            });
        }
        if width == 0 || height == 0 {
            return Err(OcrError::BadInput {
                reason: "image has zero width or height".into(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channel_order,
        })
    }

    pub fn channels(&self) -> usize {
        self.channel_order.channels()
    }

    /// Reads pixel `(x, y)` channel `c` as `u8`, without bounds clamping.
    #[inline]
    fn get(&self, x: u32, y: u32, c: usize) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels() + c;
        self.data[idx]
    }

    /// Reads pixel `(x, y)` channel `c`, clamping coordinates to image
    /// bounds — used when sampling at negative/off-canvas coordinates
    /// that margin expansion may produce.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64, c: usize) -> u8 {
        let cx = x.clamp(0, self.width as i64 - 1) as u32;
        let cy = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(cx, cy, c)
    }

    /// Crops an axis-aligned region, clamped to image bounds.
    pub fn crop(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> RasterImage {
        let x0c = x0.clamp(0, self.width as i64);
        let y0c = y0.clamp(0, self.height as i64);
        let x1c = x1.clamp(x0c, self.width as i64);
        let y1c = y1.clamp(y0c, self.height as i64);
        let w = (x1c - x0c).max(1) as u32;
        let h = (y1c - y0c).max(1) as u32;
        let ch = self.channels();
        let mut data = vec![0u8; (w * h) as usize * ch];
        for y in 0..h {
            for x in 0..w {
                for c in 0..ch {
                    let v = self.get_clamped(x0c + x as i64, y0c + y as i64, c);
                    data[(y as usize * w as usize + x as usize) * ch + c] = v;
                }
            }
        }
        RasterImage {
            data,
            width: w,
            height: h,
            channel_order: self.channel_order,
        }
    }
}

/// Catmull-Rom bicubic kernel (spec §4.A).
fn cubic_weight(t: f64) -> f64 {
    let a = t.abs();
    if a <= 1.0 {
        (1.5 * a - 2.5) * a * a + 1.0
    } else if a < 2.0 {
        ((-0.5 * a + 2.5) * a - 4.0) * a + 2.0
    } else {
        0.0
    }
}

/// Maps a destination coordinate back to a source coordinate using the
/// half-pixel-center convention (spec §4.A), clamped to `[0, dim-1]`.
fn source_coord(dst: u32, src_dim: u32, dst_dim: u32) -> f64 {
    let s = (dst as f64 + 0.5) * (src_dim as f64 / dst_dim as f64) - 0.5;
    s.clamp(0.0, (src_dim.max(1) - 1) as f64)
}

/// Bilinear resize of an HWC u8 buffer. Output is u8-rounded.
pub fn resize_bilinear(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    channels: usize,
    dst_w: u32,
    dst_h: u32,
) -> Vec<u8> {
    let mut out = vec![0u8; dst_w as usize * dst_h as usize * channels];
    let sample = |x: u32, y: u32, c: usize| -> f64 {
        let xi = x.min(src_w - 1) as usize;
        let yi = y.min(src_h - 1) as usize;
        src[(yi * src_w as usize + xi) * channels + c] as f64
    };

    for y in 0..dst_h {
        let sy = source_coord(y, src_h, dst_h);
        let y0 = sy.floor() as u32;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f64;

        for x in 0..dst_w {
            let sx = source_coord(x, src_w, dst_w);
            let x0 = sx.floor() as u32;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f64;

            for c in 0..channels {
                let v00 = sample(x0, y0, c);
                let v10 = sample(x1, y0, c);
                let v01 = sample(x0, y1, c);
                let v11 = sample(x1, y1, c);
                let top = v00 * (1.0 - fx) + v10 * fx;
                let bot = v01 * (1.0 - fx) + v11 * fx;
                let v = top * (1.0 - fy) + bot * fy;
                let idx = (y as usize * dst_w as usize + x as usize) * channels + c;
                out[idx] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Bicubic resize using the Catmull-Rom kernel, weights re-normalized
/// per output pixel (spec §4.A) to prevent overshoot at borders.
pub fn resize_bicubic(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    channels: usize,
    dst_w: u32,
    dst_h: u32,
) -> Vec<u8> {
    let mut out = vec![0u8; dst_w as usize * dst_h as usize * channels];
    let sample = |x: i64, y: i64, c: usize| -> f64 {
        let xi = x.clamp(0, src_w as i64 - 1) as usize;
        let yi = y.clamp(0, src_h as i64 - 1) as usize;
        src[(yi * src_w as usize + xi) * channels + c] as f64
    };

    for y in 0..dst_h {
        let sy = source_coord(y, src_h, dst_h);
        let y0 = sy.floor() as i64;
        let fy = sy - y0 as f64;
        let wy: [f64; 4] = [
            cubic_weight(fy + 1.0),
            cubic_weight(fy),
            cubic_weight(fy - 1.0),
            cubic_weight(fy - 2.0),
        ];

        for x in 0..dst_w {
            let sx = source_coord(x, src_w, dst_w);
            let x0 = sx.floor() as i64;
            let fx = sx - x0 as f64;
            let wx: [f64; 4] = [
                cubic_weight(fx + 1.0),
                cubic_weight(fx),
                cubic_weight(fx - 1.0),
                cubic_weight(fx - 2.0),
            ];
            let weight_sum: f64 = wy.iter().flat_map(|wyv| wx.iter().map(move |wxv| wxv * wyv)).sum();

            for c in 0..channels {
                let mut acc = 0.0f64;
                for (j, wyv) in wy.iter().enumerate() {
                    for (i, wxv) in wx.iter().enumerate() {
                        let sxp = x0 - 1 + i as i64;
                        let syp = y0 - 1 + j as i64;
                        acc += sample(sxp, syp, c) * wxv * wyv;
                    }
                }
                let v = if weight_sum.abs() > 1e-9 { acc / weight_sum } else { acc };
                let idx = (y as usize * dst_w as usize + x as usize) * channels + c;
                out[idx] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Computes target dimensions so that `max(w, h) == max_side`, aspect
/// preserved, floored, minimum 1. Does not pad (spec §4.A).
pub fn resize_long_side_dims(w: u32, h: u32, max_side: f64) -> (u32, u32) {
    let scale = max_side / (w.max(h) as f64);
    let nw = ((w as f64 * scale).floor() as u32).max(1);
    let nh = ((h as f64 * scale).floor() as u32).max(1);
    (nw, nh)
}

/// Right/bottom zero-pads an HWC u8 buffer to `(dst_w, dst_h)`.
pub fn pad_zero_hwc(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    channels: usize,
    dst_w: u32,
    dst_h: u32,
) -> Vec<u8> {
    let mut out = vec![0u8; dst_w as usize * dst_h as usize * channels];
    for y in 0..src_h.min(dst_h) {
        let src_row = &src[(y as usize * src_w as usize * channels)..((y as usize + 1) * src_w as usize * channels)];
        let dst_start = y as usize * dst_w as usize * channels;
        let copy_len = (src_w.min(dst_w) as usize) * channels;
        out[dst_start..dst_start + copy_len].copy_from_slice(&src_row[..copy_len]);
    }
    out
}

/// An HWC `f32` image buffer (channels-last), the intermediate format
/// used between normalization and NCHW packing.
#[derive(Debug, Clone)]
pub struct FloatImageHwc {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub channels: usize,
}

impl FloatImageHwc {
    /// Replicate-pads the right margin to `target_width` by repeating
    /// the value at the last valid column. Identity when `width >=
    /// target_width` (spec §8 invariant 5).
    pub fn replicate_pad_width(&self, target_width: u32) -> FloatImageHwc {
        if self.width >= target_width {
            return self.clone();
        }
        let mut data = vec![0f32; target_width as usize * self.height as usize * self.channels];
        for y in 0..self.height {
            for x in 0..target_width {
                let src_x = x.min(self.width - 1);
                for c in 0..self.channels {
                    let src_idx = (y as usize * self.width as usize + src_x as usize) * self.channels + c;
                    let dst_idx = (y as usize * target_width as usize + x as usize) * self.channels + c;
                    data[dst_idx] = self.data[src_idx];
                }
            }
        }
        FloatImageHwc {
            data,
            width: target_width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Right-pads to `target_width` with a constant fill value (used by
    /// the 3-channel recognizer path, spec §4.A).
    pub fn pad_with_value(&self, target_width: u32, fill: f32) -> FloatImageHwc {
        if self.width >= target_width {
            return self.clone();
        }
        let mut data = vec![fill; target_width as usize * self.height as usize * self.channels];
        for y in 0..self.height {
            for x in 0..self.width {
                for c in 0..self.channels {
                    let src_idx = (y as usize * self.width as usize + x as usize) * self.channels + c;
                    let dst_idx = (y as usize * target_width as usize + x as usize) * self.channels + c;
                    data[dst_idx] = self.data[src_idx];
                }
            }
        }
        FloatImageHwc {
            data,
            width: target_width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Transposes HWC -> NCHW and returns a flat `[1, C, H, W]` buffer.
    pub fn to_nchw(&self) -> Vec<f32> {
        let (w, h, c) = (self.width as usize, self.height as usize, self.channels);
        let mut out = vec![0f32; w * h * c];
        for y in 0..h {
            for x in 0..w {
                for ch in 0..c {
                    let src = (y * w + x) * c + ch;
                    let dst = ch * h * w + y * w + x;
                    out[dst] = self.data[src];
                }
            }
        }
        out
    }
}

/// Per-pixel normalization `(pixel/255 - mean[c]) / std[c]`, writing an
/// HWC f32 buffer. RGB order is enforced: BGR/BGRA sources are
/// channel-swapped so channel 0 is always red (spec §4.A).
pub fn normalize_to_float(img: &RasterImage, mean: [f32; 3], std: [f32; 3]) -> FloatImageHwc {
    let w = img.width as usize;
    let h = img.height as usize;
    let src_channels = img.channels();
    let swap_bgr = img.channel_order.is_bgr_family();
    let is_gray = matches!(img.channel_order, ChannelOrder::Gray);

    let out_channels = if is_gray { 1 } else { 3 };
    let mut data = vec![0f32; w * h * out_channels];

    for y in 0..h {
        for x in 0..w {
            if is_gray {
                let v = img.data[(y * w + x) * src_channels] as f32 / 255.0;
                data[y * w + x] = (v - mean[0]) / std[0];
                continue;
            }
            let base = (y * w + x) * src_channels;
            let (r, g, b) = if swap_bgr {
                (img.data[base + 2], img.data[base + 1], img.data[base])
            } else {
                (img.data[base], img.data[base + 1], img.data[base + 2])
            };
            let out_base = (y * w + x) * 3;
            data[out_base] = (r as f32 / 255.0 - mean[0]) / std[0];
            data[out_base + 1] = (g as f32 / 255.0 - mean[1]) / std[1];
            data[out_base + 2] = (b as f32 / 255.0 - mean[2]) / std[2];
        }
    }

    FloatImageHwc {
        data,
        width: img.width,
        height: img.height,
        channels: out_channels,
    }
}

/// Converts an image to single-channel grayscale using integer
/// rounding: `round(0.299 R + 0.587 G + 0.114 B)` (spec §4.F). BGR/BGRA
/// sources are swapped first. Already-gray sources pass through
/// verbatim.
pub fn to_grayscale(img: &RasterImage) -> RasterImage {
    if matches!(img.channel_order, ChannelOrder::Gray) {
        return img.clone();
    }
    let w = img.width as usize;
    let h = img.height as usize;
    let ch = img.channels();
    let swap_bgr = img.channel_order.is_bgr_family();
    let mut data = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let base = (y * w + x) * ch;
            let (r, g, b) = if swap_bgr {
                (img.data[base + 2], img.data[base + 1], img.data[base])
            } else {
                (img.data[base], img.data[base + 1], img.data[base + 2])
            };
            let gray = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
            data[y * w + x] = gray.round().clamp(0.0, 255.0) as u8;
        }
    }
    RasterImage {
        data,
        width: img.width,
        height: img.height,
        channel_order: ChannelOrder::Gray,
    }
}

/// Rotates by a multiple of 90 degrees (0/90/180/270). Other angles are
/// not required (spec §4.A).
pub fn rotate90(img: &RasterImage, degrees: i32) -> RasterImage {
    let ch = img.channels();
    let norm = degrees.rem_euclid(360);
    match norm {
        0 => img.clone(),
        90 => {
            let (w, h) = (img.width, img.height);
            let mut data = vec![0u8; img.data.len()];
            for y in 0..h {
                for x in 0..w {
                    // destination: (h-1-y, x) in a w_new=h, h_new=w image
                    let dst_x = h - 1 - y;
                    let dst_y = x;
                    let dst_w = h;
                    for c in 0..ch {
                        data[(dst_y as usize * dst_w as usize + dst_x as usize) * ch + c] =
                            img.get(x, y, c);
                    }
                }
            }
            RasterImage {
                data,
                width: h,
                height: w,
                channel_order: img.channel_order,
            }
        }
        180 => {
            let (w, h) = (img.width, img.height);
            let mut data = vec![0u8; img.data.len()];
            for y in 0..h {
                for x in 0..w {
                    let dst_x = w - 1 - x;
                    let dst_y = h - 1 - y;
                    for c in 0..ch {
                        data[(dst_y as usize * w as usize + dst_x as usize) * ch + c] = img.get(x, y, c);
                    }
                }
            }
            RasterImage {
                data,
                width: w,
                height: h,
                channel_order: img.channel_order,
            }
        }
        270 => {
            let (w, h) = (img.width, img.height);
            let mut data = vec![0u8; img.data.len()];
            for y in 0..h {
                for x in 0..w {
                    let dst_x = y;
                    let dst_y = w - 1 - x;
                    let dst_w = h;
                    for c in 0..ch {
                        data[(dst_y as usize * dst_w as usize + dst_x as usize) * ch + c] =
                            img.get(x, y, c);
                    }
                }
            }
            RasterImage {
                data,
                width: h,
                height: w,
                channel_order: img.channel_order,
            }
        }
        _ => img.clone(),
    }
}

/// Solves an 8-variable homography `H` (3x3, `H[2][2] = 1`) mapping
/// `src[i] -> dst[i]` for 4 point correspondences, via Gauss-Jordan
/// elimination on the 8x9 augmented matrix (spec §4.A).
fn solve_homography(src: &[crate::geom::Point; 4], dst: &[crate::geom::Point; 4]) -> Option<[f64; 9]> {
    // Each correspondence (x,y) -> (x',y') contributes two rows:
    //   x y 1 0 0 0 -x*x' -y*x'  | x'
    //   0 0 0 x y 1 -x*y' -y*y'  | y'
    let mut a = [[0f64; 9]; 8];
    for i in 0..4 {
        let (x, y) = (src[i].x, src[i].y);
        let (xp, yp) = (dst[i].x, dst[i].y);
        a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * xp, -y * xp, xp];
        a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * yp, -y * yp, yp];
    }

    // Gauss-Jordan elimination with partial pivoting.
    for col in 0..8 {
        let mut pivot = col;
        let mut best = a[col][col].abs();
        for row in (col + 1)..8 {
            if a[row][col].abs() > best {
                best = a[row][col].abs();
                pivot = row;
            }
        }
        if best < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        let pivot_val = a[col][col];
        for v in a[col].iter_mut() {
            *v /= pivot_val;
        }
        for row in 0..8 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor != 0.0 {
                for k in 0..9 {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
    }

    let mut h = [0f64; 9];
    for i in 0..8 {
        h[i] = a[i][8];
    }
    h[8] = 1.0;
    Some(h)
}

/// Perspective-warps `src_quad` in `img` onto a `(w, h)` output
/// rectangle, sampling by nearest neighbor at the back-projected
/// coordinate, clamped to bounds (spec §4.A).
pub fn perspective_warp(
    img: &RasterImage,
    src_quad: &crate::geom::Quad,
    w: u32,
    h: u32,
) -> RasterImage {
    use crate::geom::Point;

    let dst_quad = [
        Point::new(0.0, 0.0),
        Point::new((w - 1).max(1) as f64, 0.0),
        Point::new((w - 1).max(1) as f64, (h - 1).max(1) as f64),
        Point::new(0.0, (h - 1).max(1) as f64),
    ];

    // We need the inverse mapping (dst -> src), so solve dst->src
    // directly instead of inverting the forward homography.
    let h_mat = solve_homography(&dst_quad, &src_quad.points).unwrap_or([
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
    ]);

    let ch = img.channels();
    let mut data = vec![0u8; w as usize * h as usize * ch];
    for y in 0..h {
        for x in 0..w {
            let xf = x as f64;
            let yf = y as f64;
            let denom = h_mat[6] * xf + h_mat[7] * yf + h_mat[8];
            let sx = (h_mat[0] * xf + h_mat[1] * yf + h_mat[2]) / denom;
            let sy = (h_mat[3] * xf + h_mat[4] * yf + h_mat[5]) / denom;
            let sxi = sx.round() as i64;
            let syi = sy.round() as i64;
            for c in 0..ch {
                let v = img.get_clamped(sxi, syi, c);
                data[(y as usize * w as usize + x as usize) * ch + c] = v;
            }
        }
    }

    RasterImage {
        data,
        width: w,
        height: h,
        channel_order: img.channel_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point, Quad};

    #[test]
    fn replicate_pad_is_identity_above_target() {
        let img = FloatImageHwc {
            data: vec![1.0, 2.0, 3.0],
            width: 3,
            height: 1,
            channels: 1,
        };
        let padded = img.replicate_pad_width(2);
        assert_eq!(padded.width, 3);
        assert_eq!(padded.data, img.data);
    }

    #[test]
    fn replicate_pad_repeats_last_column() {
        let img = FloatImageHwc {
            data: vec![1.0, 2.0, 3.0],
            width: 3,
            height: 1,
            channels: 1,
        };
        let padded = img.replicate_pad_width(5);
        assert_eq!(padded.data, vec![1.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn resize_long_side_does_not_pad() {
        let (w, h) = resize_long_side_dims(200, 100, 100.0);
        assert_eq!(w, 100);
        assert_eq!(h, 50);
    }

    #[test]
    fn perspective_warp_corners_round_trip() {
        let data = vec![128u8; 10 * 10 * 3];
        let img = RasterImage::new(data, 10, 10, ChannelOrder::Rgb).unwrap();
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(9.0, 0.0),
            Point::new(9.0, 9.0),
            Point::new(0.0, 9.0),
        ]);
        let warped = perspective_warp(&img, &quad, 10, 10);
        assert_eq!(warped.width, 10);
        assert_eq!(warped.height, 10);
    }

    #[test]
    fn perspective_warp_output_has_requested_dims() {
        let data = vec![200u8; 10 * 10 * 3];
        let img = RasterImage::new(data, 10, 10, ChannelOrder::Rgb).unwrap();
        let quad = Quad::new([
            Point::new(1.0, 1.0),
            Point::new(8.0, 1.0),
            Point::new(8.0, 8.0),
            Point::new(1.0, 8.0),
        ]);
        let warped = perspective_warp(&img, &quad, 6, 6);
        assert_eq!((warped.width, warped.height), (6, 6));
    }

    #[test]
    fn to_grayscale_passes_through_gray_input() {
        let data = vec![10u8, 20, 30, 40];
        let img = RasterImage::new(data.clone(), 2, 2, ChannelOrder::Gray).unwrap();
        let gray = to_grayscale(&img);
        assert_eq!(gray.data, data);
    }

    #[test]
    fn rotate90_swaps_dimensions() {
        let data = vec![1u8, 2, 3, 4, 5, 6];
        let img = RasterImage::new(data, 3, 2, ChannelOrder::Gray).unwrap();
        let rotated = rotate90(&img, 90);
        assert_eq!((rotated.width, rotated.height), (2, 3));
    }
}
