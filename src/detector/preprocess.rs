//! Detector preprocessing (spec §4.B): aspect-preserved resize, stride
//! padding, ImageNet mean/std normalize, NCHW packing.

use crate::image_ops::{self, RasterImage};
use crate::options::Options;
use crate::trace::{self, steps, TraceStep, TraceWriter};

/// The detector's input tensor plus the bookkeeping needed to project
/// detected boxes back to the original image (spec §4.B step 6).
#[derive(Debug, Clone)]
pub struct DetectorInput {
    pub tensor: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// `resized_width / original_width` (step-2 aspect-preserving resize,
    /// before stride padding is applied).
    pub scale_x: f64,
    /// `resized_height / original_height`.
    pub scale_y: f64,
}

/// Runs the full detector preprocessing chain on a decoded image.
pub fn preprocess(
    img: &RasterImage,
    opts: &Options,
    trace_sink: Option<&dyn TraceWriter>,
) -> DetectorInput {
    trace::emit(
        trace_sink,
        steps::OCR_OPTIONS,
        TraceStep::Params {
            json: serde_json::json!({
                "canvasSize": opts.canvas_size,
                "magRatio": opts.mag_ratio,
                "align": opts.align,
            }),
        },
    );

    // Step 1: target = min(canvasSize, max(W,H)*magRatio).
    let longest = img.width.max(img.height) as f64;
    let target = opts.canvas_size.min(longest * opts.mag_ratio);

    // Step 2: resize preserving aspect so max(W',H') == target.
    let (resized_w, resized_h) = image_ops::resize_long_side_dims(img.width, img.height, target);
    let resized_data = image_ops::resize_bilinear(
        &img.data,
        img.width,
        img.height,
        img.channels(),
        resized_w,
        resized_h,
    );

    trace::emit(
        trace_sink,
        steps::RESIZE_ASPECT_RATIO,
        TraceStep::Image {
            width: resized_w,
            height: resized_h,
            channels: img.channels(),
        },
    );

    // Step 3: pad right/bottom to a multiple of `align`.
    let align = opts.align.max(1);
    let padded_w = resized_w.div_ceil(align) * align;
    let padded_h = resized_h.div_ceil(align) * align;
    let padded_data = image_ops::pad_zero_hwc(
        &resized_data,
        resized_w,
        resized_h,
        img.channels(),
        padded_w,
        padded_h,
    );

    trace::emit(
        trace_sink,
        steps::PAD_TO_STRIDE,
        TraceStep::Image {
            width: padded_w,
            height: padded_h,
            channels: img.channels(),
        },
    );

    let padded_img = RasterImage {
        data: padded_data,
        width: padded_w,
        height: padded_h,
        channel_order: img.channel_order,
    };

    // Step 4: ImageNet mean/std normalize.
    let float_img = image_ops::normalize_to_float(&padded_img, opts.mean, opts.std);

    trace::emit(
        trace_sink,
        steps::NORMALIZE_MEAN_VARIANCE,
        TraceStep::Tensor {
            shape: vec![1, float_img.channels, padded_h as usize, padded_w as usize],
            preview: float_img.data.iter().take(8).copied().collect(),
        },
    );

    // Step 5: HWC -> NCHW.
    let tensor = float_img.to_nchw();

    trace::emit(
        trace_sink,
        steps::TO_TENSOR_LAYOUT,
        TraceStep::Tensor {
            shape: vec![1, float_img.channels, padded_h as usize, padded_w as usize],
            preview: tensor.iter().take(8).copied().collect(),
        },
    );

    trace::emit(
        trace_sink,
        steps::DETECTOR_INPUT_FINAL,
        TraceStep::Tensor {
            shape: vec![1, float_img.channels, padded_h as usize, padded_w as usize],
            preview: tensor.iter().take(8).copied().collect(),
        },
    );

    // Step 6: record scale factors for coordinate back-projection. Must
    // be the resize-only ratio, not the post-pad one: the heatmap is
    // exactly half the padded input's resolution, and detect_boxes
    // already projects heatmap -> padded-input coordinates, so this
    // factor only needs to carry padded-input -> original-image.
    let scale_x = resized_w as f64 / img.width as f64;
    let scale_y = resized_h as f64 / img.height as f64;

    DetectorInput {
        tensor,
        width: padded_w,
        height: padded_h,
        scale_x,
        scale_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_ops::ChannelOrder;

    #[test]
    fn output_is_channels_first_with_padded_dims_multiple_of_align() {
        let data = vec![128u8; 200 * 100 * 3];
        let img = RasterImage::new(data, 200, 100, ChannelOrder::Rgb).unwrap();
        let opts = Options::default();
        let input = preprocess(&img, &opts, None);
        assert_eq!(input.width % opts.align, 0);
        assert_eq!(input.height % opts.align, 0);
        assert!(input.width.max(input.height) as f64 <= opts.canvas_size);
        assert!(input.scale_x > 0.0);
        assert!(input.scale_y > 0.0);
        assert_eq!(input.tensor.len(), 3 * input.width as usize * input.height as usize);
    }
}
