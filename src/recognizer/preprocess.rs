//! Recognizer preprocessing (spec §4.F): grayscale, two-stage resample
//! (linear then bicubic), normalize, replicate-last-column pad to a
//! fixed width. The two-stage resampling and replicate padding are not
//! interchangeable with a single-stage resize and zero/mean padding —
//! both change the recognizer's output distribution.

use crate::image_ops::{self, RasterImage};
use crate::options::RecognizerOptions;

/// The recognizer's input tensor plus its actual (pre-pad) width, kept
/// for callers that need to know how much of the tensor is real content
/// versus padding.
#[derive(Debug, Clone)]
pub struct RecognizerInput {
    pub tensor: Vec<f32>,
    pub height: u32,
    pub max_width: u32,
}

/// Runs the full recognizer preprocessing chain on a single crop.
pub fn preprocess(crop: &RasterImage, opts: &RecognizerOptions) -> RecognizerInput {
    // Step 1: grayscale (verbatim if already single-channel).
    let gray = image_ops::to_grayscale(crop);

    let target_h = opts.input_height;
    let original_ratio = gray.width as f64 / gray.height as f64;
    let ratio = if original_ratio < 1.0 {
        1.0 / original_ratio
    } else {
        original_ratio
    };

    // Step 2: stage-1 linear resize. Both branches of the dimension rule
    // reduce to the same (W, H) pair; see module docs.
    let stage1_w = ((target_h as f64) * ratio).trunc().max(1.0) as u32;
    let stage1_h = target_h;
    let stage1_data =
        image_ops::resize_bilinear(&gray.data, gray.width, gray.height, 1, stage1_w, stage1_h);

    // Step 3: stage-2 bicubic resize.
    let stage1_ratio = stage1_w as f64 / stage1_h as f64;
    let max_width = (ratio.ceil() * target_h as f64) as u32;
    let resized_w = (max_width as f64).min((target_h as f64 * stage1_ratio).ceil()) as u32;
    let stage2_data = image_ops::resize_bicubic(
        &stage1_data,
        stage1_w,
        stage1_h,
        1,
        resized_w.max(1),
        target_h,
    );

    let resized = RasterImage {
        data: stage2_data,
        width: resized_w.max(1),
        height: target_h,
        channel_order: image_ops::ChannelOrder::Gray,
    };

    // Step 4: normalize (pixel/255 - 0.5) / 0.5.
    let float_img = image_ops::normalize_to_float(&resized, [opts.mean, 0.0, 0.0], [opts.std, 1.0, 1.0]);

    // Step 5: replicate-pad right to max_width.
    let padded = float_img.replicate_pad_width(max_width);

    // Step 6: emit [1,1,H,maxWidth].
    let tensor = padded.to_nchw();

    RecognizerInput {
        tensor,
        height: target_h,
        max_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_ops::ChannelOrder;

    #[test]
    fn produces_tensor_of_declared_geometry() {
        let data = vec![128u8; 40 * 16 * 3];
        let crop = RasterImage::new(data, 40, 16, ChannelOrder::Rgb).unwrap();
        let opts = RecognizerOptions::default();
        let input = preprocess(&crop, &opts);
        assert_eq!(input.height, opts.input_height);
        assert_eq!(
            input.tensor.len(),
            input.height as usize * input.max_width as usize
        );
    }

    #[test]
    fn already_gray_crop_is_used_verbatim_before_resampling() {
        let data = vec![200u8; 40 * 16];
        let crop = RasterImage::new(data, 40, 16, ChannelOrder::Gray).unwrap();
        let opts = RecognizerOptions::default();
        let input = preprocess(&crop, &opts);
        assert!(input.max_width > 0);
    }
}
