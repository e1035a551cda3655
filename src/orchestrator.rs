//! Full pipeline orchestration (spec §4.H): option resolution, ignore-index
//! synthesis, detect → postprocess → group, crop building, per-crop
//! recognition, optional line merge, final ordering.

use std::collections::HashMap;
use std::path::Path;

use crate::charset::{self, Charset};
use crate::crop_builder::{self, Crop};
use crate::ctc;
use crate::detector;
use crate::error::{OcrError, Result};
use crate::geom::{Point, Quad};
use crate::grouping;
use crate::image_ops::RasterImage;
use crate::model_manager::{ModelEntry, ModelKind, ModelManager, ModelManifest};
use crate::options::Options;
use crate::recognizer;
use crate::runtime::image_decoder::{DefaultImageDecoder, ImageDecoder, ImageSource};
use crate::runtime::inference::{
    DetectorOutputLayout, InferenceRunner, OrtInferenceRunner, Tensor,
};
use crate::trace::{self, steps, TraceStep, TraceWriter};

/// Blank class index convention (spec §4.G, §6).
const BLANK_INDEX: usize = 0;

/// One recognized text region, in original-image coordinates (spec §6
/// "Programmatic result format").
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub quad: Quad,
    pub text: String,
    pub confidence: f32,
}

/// Builds an [`Ocr`] from a model manifest, downloading and caching the
/// detector, recognizer, and charset files via [`ModelManager`].
pub struct OcrBuilder {
    model_manager: ModelManager,
    detector_model: String,
    recognizer_model: String,
    decoder: Box<dyn ImageDecoder>,
    trace_sink: Option<Box<dyn TraceWriter>>,
}

impl Default for OcrBuilder {
    fn default() -> Self {
        Self {
            model_manager: ModelManager::new(),
            detector_model: "craft".to_string(),
            recognizer_model: "crnn-en".to_string(),
            decoder: Box::new(DefaultImageDecoder),
            trace_sink: None,
        }
    }
}

impl OcrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_manager(mut self, manager: ModelManager) -> Self {
        self.model_manager = manager;
        self
    }

    pub fn detector_model(mut self, name: impl Into<String>) -> Self {
        self.detector_model = name.into();
        self
    }

    pub fn recognizer_model(mut self, name: impl Into<String>) -> Self {
        self.recognizer_model = name.into();
        self
    }

    pub fn image_decoder(mut self, decoder: Box<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn trace_sink(mut self, sink: Box<dyn TraceWriter>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Resolves the named detector/recognizer entries from `manifest`,
    /// downloads (or reuses cached) model and charset files, and loads
    /// both ONNX sessions.
    pub async fn build(self, manifest_json: &str) -> Result<Ocr> {
        let manifest = ModelManifest::parse(manifest_json)?;

        let detector_entry = find_entry(&manifest, &self.detector_model, ModelKind::Detector)?;
        let recognizer_entry =
            find_entry(&manifest, &self.recognizer_model, ModelKind::Recognizer)?;

        let detector_path = self.model_manager.ensure_model(detector_entry)?;
        let recognizer_path = self.model_manager.ensure_model(recognizer_entry)?;
        let charset_path = self.model_manager.ensure_charset(recognizer_entry)?;

        let charset_contents = std::fs::read_to_string(&charset_path)?;
        let charset = Charset::parse(&charset_contents);

        let detector = OrtInferenceRunner::from_file(&detector_path)?;
        let recognizer = OrtInferenceRunner::from_file(&recognizer_path)?;

        Ok(Ocr {
            detector: Box::new(detector),
            recognizer: Box::new(recognizer),
            decoder: self.decoder,
            trace_sink: self.trace_sink,
            charset,
            blank: BLANK_INDEX,
        })
    }
}

fn find_entry<'a>(
    manifest: &'a ModelManifest,
    name: &str,
    expect_kind: ModelKind,
) -> Result<&'a ModelEntry> {
    let entry = manifest
        .find(name)
        .ok_or_else(|| OcrError::UnsupportedConfig {
            reason: format!("manifest has no model named `{name}`"),
        })?;
    if entry.kind != expect_kind {
        return Err(OcrError::UnsupportedConfig {
            reason: format!("model `{name}` is not a {expect_kind:?}"),
        });
    }
    Ok(entry)
}

/// The assembled pipeline: two committed inference sessions, an image
/// decoder, and the recognizer's charset.
pub struct Ocr {
    detector: Box<dyn InferenceRunner>,
    recognizer: Box<dyn InferenceRunner>,
    decoder: Box<dyn ImageDecoder>,
    trace_sink: Option<Box<dyn TraceWriter>>,
    charset: Charset,
    blank: usize,
}

impl Ocr {
    pub fn builder() -> OcrBuilder {
        OcrBuilder::new()
    }

    /// Constructs an `Ocr` directly from already-loaded components,
    /// bypassing the manifest/download path. Primarily useful for
    /// injecting test doubles for [`InferenceRunner`]/[`ImageDecoder`].
    pub fn with_components(
        detector: Box<dyn InferenceRunner>,
        recognizer: Box<dyn InferenceRunner>,
        decoder: Box<dyn ImageDecoder>,
        charset: Charset,
        blank: usize,
    ) -> Self {
        Self {
            detector,
            recognizer,
            decoder,
            trace_sink: None,
            charset,
            blank,
        }
    }

    pub fn with_trace_sink(mut self, sink: Box<dyn TraceWriter>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Decodes `path` (RGB for detection, grayscale for recognition) and
    /// runs the full pipeline.
    pub fn recognize_path(&self, path: impl AsRef<Path>, options: &Options) -> Result<Vec<OcrResult>> {
        let path = path.as_ref();
        let trace_sink = self.trace_sink.as_deref();

        let detection_image = self.decoder.decode(ImageSource::from(path.to_path_buf()))?;
        trace::emit(
            trace_sink,
            steps::LOAD_IMAGE,
            TraceStep::Image {
                width: detection_image.width,
                height: detection_image.height,
                channels: detection_image.channels(),
            },
        );
        let recognition_image = self
            .decoder
            .decode_grayscale(ImageSource::from(path.to_path_buf()))?;

        self.recognize(&detection_image, Some(&recognition_image), options)
    }

    /// Runs the full pipeline (spec §4.H) against already-decoded images.
    /// `recognition_image` defaults to `detection_image` when absent
    /// (step 4's "may be a grayscale sibling").
    pub fn recognize(
        &self,
        detection_image: &RasterImage,
        recognition_image: Option<&RasterImage>,
        options: &Options,
    ) -> Result<Vec<OcrResult>> {
        let trace_sink = self.trace_sink.as_deref();
        let recognition_image = recognition_image.unwrap_or(detection_image);

        // Step 2: ignore-index synthesis.
        let ignore_set =
            charset::synthesize_ignore_indices(&self.charset, &options.charset_filter, self.blank);

        // Step 3: detector preprocess -> run -> postprocess -> group.
        let detector_input = detector::preprocess(detection_image, options, trace_sink);
        let detector_pixels = detector_input.width as usize * detector_input.height as usize;
        let detector_channels = detector_input.tensor.len() / detector_pixels.max(1);

        let mut detector_feeds = HashMap::new();
        detector_feeds.insert(
            self.detector
                .primary_input_name()
                .unwrap_or_else(|| "input".to_string()),
            Tensor::new(
                detector_input.tensor.clone(),
                vec![
                    1,
                    detector_channels,
                    detector_input.height as usize,
                    detector_input.width as usize,
                ],
            ),
        );
        let detector_outputs = self.detector.run(detector_feeds)?;
        let heatmaps = DetectorOutputLayout::from_outputs(detector_outputs)?.into_heatmaps()?;

        trace::emit(
            trace_sink,
            steps::DETECTOR_RAW_OUTPUT_TEXT,
            TraceStep::Tensor {
                shape: vec![heatmaps.height, heatmaps.width],
                preview: heatmaps.text.iter().take(8).copied().collect(),
            },
        );
        trace::emit(
            trace_sink,
            steps::DETECTOR_RAW_OUTPUT_LINK,
            TraceStep::Tensor {
                shape: vec![heatmaps.height, heatmaps.width],
                preview: heatmaps.link.iter().take(8).copied().collect(),
            },
        );

        let postprocess_opts = detector::PostprocessOptions {
            text_threshold: options.text_threshold,
            low_text: options.low_text,
            link_threshold: options.link_threshold,
        };
        let detected = detector::detect_boxes(
            &heatmaps,
            postprocess_opts,
            detector_input.width,
            detector_input.height,
            trace_sink,
        );

        // detect_boxes projects heatmap coordinates to the padded
        // detector-input frame; project once more down to the original
        // image using the preprocessing scale factors (spec §4.B step 6).
        let image_quads: Vec<Quad> = detected
            .iter()
            .map(|b| {
                Quad::new(b.image_quad.points.map(|p| {
                    Point::new(
                        p.x / detector_input.scale_x,
                        p.y / detector_input.scale_y,
                    )
                }))
            })
            .collect();

        let grouped = grouping::group_boxes(&image_quads, options, trace_sink);

        // Step 4: build crops from the recognition image.
        let crops = crop_builder::build_crops(recognition_image, &grouped, &options.rotation_info);

        // Step 5: per-crop preprocess, run, decode.
        let mut pre_merge = Vec::with_capacity(crops.len());
        for crop in &crops {
            let recognized = self.recognize_crop(crop, &ignore_set, options)?;
            pre_merge.push(recognized);
        }

        trace::emit(
            trace_sink,
            steps::RECOGNIZER_RESULTS_PRE_MERGE,
            TraceStep::Boxes {
                count: pre_merge.len(),
                quads: pre_merge.iter().map(|r| quad_to_flat(&r.quad)).collect(),
            },
        );

        // Step 6: optional line merge.
        let merged = if options.merge_lines.enabled {
            merge_lines(pre_merge, options)
        } else {
            pre_merge
        };

        trace::emit(
            trace_sink,
            steps::RECOGNIZER_RESULTS_POST_MERGE,
            TraceStep::Boxes {
                count: merged.len(),
                quads: merged.iter().map(|r| quad_to_flat(&r.quad)).collect(),
            },
        );

        // Step 7: sort by (minY, minX).
        let mut out = merged;
        out.sort_by(|a, b| {
            let a_min = a.quad.min_xy();
            let b_min = b.quad.min_xy();
            a_min
                .y
                .partial_cmp(&b_min.y)
                .unwrap()
                .then(a_min.x.partial_cmp(&b_min.x).unwrap())
        });

        Ok(out)
    }

    fn recognize_crop(
        &self,
        crop: &Crop,
        ignore_set: &std::collections::HashSet<usize>,
        options: &Options,
    ) -> Result<OcrResult> {
        let input = recognizer::preprocess(&crop.image, &options.recognizer);

        let mut feeds = HashMap::new();
        feeds.insert(
            self.recognizer
                .primary_input_name()
                .unwrap_or_else(|| "input".to_string()),
            Tensor::new(
                input.tensor.clone(),
                vec![1, 1, input.height as usize, input.max_width as usize],
            ),
        );
        if let Some(name) = self.recognizer.secondary_input_name() {
            feeds.insert(name, Tensor::zeros_i64(vec![1, 1]));
        }

        let outputs = self.recognizer.run(feeds)?;
        let logits = outputs
            .into_values()
            .next()
            .ok_or_else(|| OcrError::ShapeMismatch {
                context: "recognizer output".into(),
                expected: "one output tensor".into(),
                actual: vec![],
            })?;

        if logits.shape.len() != 3 {
            return Err(OcrError::ShapeMismatch {
                context: "recognizer output".into(),
                expected: "[1, steps, classes]".into(),
                actual: logits.shape.iter().map(|&d| d as i64).collect(),
            });
        }
        let steps_len = logits.shape[1];
        let classes = logits.shape[2];

        let decoded = ctc::decode(
            &logits.data,
            steps_len,
            classes,
            &self.charset,
            self.blank,
            ignore_set,
        );

        Ok(OcrResult {
            quad: crop.source_quad,
            text: decoded.text,
            confidence: decoded.confidence,
        })
    }
}

fn quad_to_flat(quad: &Quad) -> [f64; 8] {
    let mut flat = [0.0; 8];
    for (i, p) in quad.points.iter().enumerate() {
        flat[i * 2] = p.x;
        flat[i * 2 + 1] = p.y;
    }
    flat
}

/// Groups recognized results by their own geometric tilt, then by line
/// within each group using §4.D's line thresholds, joining text with a
/// single space and keeping the minimum member confidence (spec §4.H
/// step 6). The combined box is the axis-aligned union of its members.
///
/// Rotation grouping (spec §9 open question 4, "exact rotation angle"
/// reference behavior): each result's tilt comes from its own quad
/// (`Quad::tilt_deg`), not a shared probe tag, so two independently
/// detected boxes that each happen to be rotated ~9.9° land in the same
/// bucket while one at 9.9° and another at 10.1° do not, for
/// `mergeLines.maxAngleDeg == 10` — bucket key is
/// `floor(tilt / maxAngleDeg)`, a fixed-width binning rather than a
/// diff-from-neighbor threshold, since the latter would merge 9.9° and
/// 10.1° (their difference is well under any sane `maxAngleDeg`).
fn merge_lines(results: Vec<OcrResult>, options: &Options) -> Vec<OcrResult> {
    let bin_width = options.merge_lines.max_angle_deg.max(1e-9);

    let mut buckets: HashMap<i64, Vec<(OcrResult, Quad)>> = HashMap::new();
    for result in results {
        let quad = result.quad;
        let bucket = (quad.tilt_deg() / bin_width).floor() as i64;
        buckets.entry(bucket).or_default().push((result, quad));
    }

    let mut keys: Vec<i64> = buckets.keys().copied().collect();
    keys.sort_unstable();

    let mut out = Vec::new();
    for key in keys {
        let group = buckets.remove(&key).expect("key came from buckets.keys()");
        out.extend(merge_rotation_group(group, options));
    }
    out
}

fn merge_rotation_group(group: Vec<(OcrResult, Quad)>, options: &Options) -> Vec<OcrResult> {
    let merge_opts = Options {
        ycenter_ths: options.merge_lines.y_ths,
        width_ths: options.merge_lines.x_ths,
        ..options.clone()
    };

    // Reuse the §4.D line-threshold machinery on axis-aligned bounding
    // boxes of each result's quad, then re-attach text by box
    // membership.
    let mut lines: Vec<Vec<usize>> = Vec::new();
    let mut means: Vec<(f64, f64)> = Vec::new(); // (meanYCenter, meanHeight)

    let boxes: Vec<(f64, f64, f64)> = group
        .iter()
        .map(|(_, quad)| {
            let min = quad.min_xy();
            let max = quad.max_xy();
            let y_center = (min.y + max.y) / 2.0;
            let height = (max.y - min.y).max(1e-9);
            (min.x, y_center, height)
        })
        .collect();

    let mut order: Vec<usize> = (0..group.len()).collect();
    order.sort_by(|&a, &b| boxes[a].1.partial_cmp(&boxes[b].1).unwrap());

    for idx in order {
        let (_, y_center, height) = boxes[idx];
        let joined = lines.iter().enumerate().find(|(i, _)| {
            let (mean_y, mean_h) = means[*i];
            (y_center - mean_y).abs() < merge_opts.ycenter_ths * mean_h
        });
        match joined {
            Some((line_idx, _)) => {
                lines[line_idx].push(idx);
                let n = lines[line_idx].len() as f64;
                let (sum_y, sum_h) = lines[line_idx].iter().fold((0.0, 0.0), |(sy, sh), &i| {
                    (sy + boxes[i].1, sh + boxes[i].2)
                });
                means[line_idx] = (sum_y / n, sum_h / n);
            }
            None => {
                lines.push(vec![idx]);
                means.push((y_center, height));
            }
        }
    }

    let mut out = Vec::new();
    for line in lines {
        let mut sorted_line = line;
        sorted_line.sort_by(|&a, &b| boxes[a].0.partial_cmp(&boxes[b].0).unwrap());

        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for idx in sorted_line {
            let joins = clusters.last().map(|cluster| {
                let &last = cluster.last().unwrap();
                let (_, _, last_h) = boxes[last];
                let last_quad = group[last].1;
                let last_x_max = last_quad.max_xy().x;
                let (x_min, _, h) = boxes[idx];
                let height_ratio = (h - last_h).abs() / last_h.max(1e-9);
                let gap = x_min - last_x_max;
                height_ratio <= merge_opts.height_ths && gap < merge_opts.width_ths * last_h
            });
            if joins.unwrap_or(false) {
                clusters.last_mut().unwrap().push(idx);
            } else {
                clusters.push(vec![idx]);
            }
        }

        for cluster in clusters {
            let text = cluster
                .iter()
                .map(|&i| group[i].0.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let confidence = cluster
                .iter()
                .map(|&i| group[i].0.confidence)
                .fold(f32::INFINITY, f32::min);
            let mut min_x = f64::INFINITY;
            let mut min_y = f64::INFINITY;
            let mut max_x = f64::NEG_INFINITY;
            let mut max_y = f64::NEG_INFINITY;
            for &i in &cluster {
                let quad = group[i].1;
                let min = quad.min_xy();
                let max = quad.max_xy();
                min_x = min_x.min(min.x);
                min_y = min_y.min(min.y);
                max_x = max_x.max(max.x);
                max_y = max_y.max(max.y);
            }
            out.push(OcrResult {
                quad: Quad::from_rect(min_x, min_y, max_x, max_y),
                text,
                confidence: if confidence.is_finite() { confidence } else { 0.0 },
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_ops::ChannelOrder;
    use crate::runtime::inference::Tensor as RtTensor;
    use std::sync::Mutex;

    struct FixedRunner {
        outputs: Mutex<Vec<HashMap<String, RtTensor>>>,
    }

    impl InferenceRunner for FixedRunner {
        fn run(&self, _feeds: HashMap<String, RtTensor>) -> Result<HashMap<String, RtTensor>> {
            let mut outputs = self.outputs.lock().unwrap();
            if outputs.len() > 1 {
                Ok(outputs.remove(0))
            } else {
                Ok(outputs[0].clone())
            }
        }

        fn input_shape(&self) -> Option<Vec<i64>> {
            None
        }
    }

    struct FixedDecoder {
        image: RasterImage,
    }

    impl ImageDecoder for FixedDecoder {
        fn decode(&self, _source: ImageSource) -> Result<RasterImage> {
            Ok(self.image.clone())
        }
        fn decode_grayscale(&self, _source: ImageSource) -> Result<RasterImage> {
            Ok(self.image.clone())
        }
    }

    fn flat_detector_output(w: usize, h: usize, box_: (usize, usize, usize, usize)) -> RtTensor {
        let mut data = vec![0f32; w * h * 2];
        let (x0, y0, x1, y1) = box_;
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = (y * w + x) * 2;
                data[idx] = 0.9; // text channel
            }
        }
        RtTensor::new(data, vec![1, h, w, 2])
    }

    fn charset(s: &str) -> Charset {
        Charset::from_chars(s.chars().collect())
    }

    #[test]
    fn mergelines_false_output_equals_crop_set_discovery_order() {
        let rgb = vec![128u8; 64 * 64 * 3];
        let image = RasterImage::new(rgb, 64, 64, ChannelOrder::Rgb).unwrap();

        let mut detector_outputs = HashMap::new();
        detector_outputs.insert(
            "output".to_string(),
            flat_detector_output(32, 32, (4, 4, 20, 12)),
        );
        let detector = FixedRunner {
            outputs: Mutex::new(vec![detector_outputs]),
        };

        // classes=4, steps=2: emit 'a' at both steps via charset "_abc".
        let mut rec_logits = vec![0f32; 2 * 4];
        rec_logits[2] = 10.0;
        rec_logits[4 + 2] = 10.0;
        let mut rec_outputs = HashMap::new();
        rec_outputs.insert("output".to_string(), RtTensor::new(rec_logits, vec![1, 2, 4]));
        let recognizer = FixedRunner {
            outputs: Mutex::new(vec![rec_outputs]),
        };

        let decoder = FixedDecoder { image: image.clone() };

        let ocr = Ocr::with_components(
            Box::new(detector),
            Box::new(recognizer),
            Box::new(decoder),
            charset("_abc"),
            0,
        );

        let mut options = Options::default();
        options.min_size = 0.0;
        options.merge_lines.enabled = false;

        let results = ocr.recognize(&image, None, &options).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "a");
    }

    #[test]
    fn every_result_has_finite_coordinates_and_bounded_confidence() {
        let rgb = vec![128u8; 64 * 64 * 3];
        let image = RasterImage::new(rgb, 64, 64, ChannelOrder::Rgb).unwrap();

        let mut detector_outputs = HashMap::new();
        detector_outputs.insert(
            "output".to_string(),
            flat_detector_output(32, 32, (4, 4, 20, 12)),
        );
        let detector = FixedRunner {
            outputs: Mutex::new(vec![detector_outputs]),
        };

        let rec_logits = vec![0f32; 2 * 4];
        let mut rec_outputs = HashMap::new();
        rec_outputs.insert("output".to_string(), RtTensor::new(rec_logits, vec![1, 2, 4]));
        let recognizer = FixedRunner {
            outputs: Mutex::new(vec![rec_outputs]),
        };

        let decoder = FixedDecoder { image: image.clone() };
        let ocr = Ocr::with_components(
            Box::new(detector),
            Box::new(recognizer),
            Box::new(decoder),
            charset("_abc"),
            0,
        );

        let mut options = Options::default();
        options.min_size = 0.0;

        let results = ocr.recognize(&image, None, &options).unwrap();
        for r in &results {
            for p in r.quad.points {
                assert!(p.x.is_finite() && p.y.is_finite());
            }
            assert!(r.confidence >= 0.0 && r.confidence <= 1.0);
            if r.text.is_empty() {
                assert_eq!(r.confidence, 0.0);
            }
        }
    }

    fn result(quad: Quad, text: &str, confidence: f32) -> OcrResult {
        OcrResult {
            quad,
            text: text.to_string(),
            confidence,
        }
    }

    /// Builds an axis-aligned `w`×`h` rectangle anchored at `(x0, y0)`
    /// then rotated `angle_deg` about that anchor, so `Quad::tilt_deg()`
    /// on the result reports `angle_deg`.
    fn rotated_rect(x0: f64, y0: f64, w: f64, h: f64, angle_deg: f64) -> Quad {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        let base = [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ];
        Quad::new(base.map(|p| {
            Point::new(p.x * cos - p.y * sin + x0, p.x * sin + p.y * cos + y0)
        }))
    }

    #[test]
    fn line_merge_matches_documented_example() {
        let foo = result(Quad::from_rect(0.0, 0.0, 10.0, 10.0), "foo", 0.9);
        let bar = result(Quad::from_rect(15.0, 0.0, 25.0, 10.0), "bar", 0.7);
        let baz = result(Quad::from_rect(40.0, 0.0, 50.0, 10.0), "baz", 0.8);

        let mut options = Options::default();
        options.merge_lines.enabled = true;
        options.merge_lines.x_ths = 1.0;

        let merged = merge_lines(vec![foo, bar, baz], &options);
        assert_eq!(merged.len(), 2);

        let foobar = merged.iter().find(|r| r.text == "foo bar").unwrap();
        assert_eq!(foobar.confidence, 0.7);
        assert_eq!(foobar.quad, Quad::from_rect(0.0, 0.0, 25.0, 10.0));

        let baz_only = merged.iter().find(|r| r.text == "baz").unwrap();
        assert_eq!(baz_only.confidence, 0.8);
    }

    /// Two independently detected boxes tilted ~9.9° merge with each
    /// other; a third tilted 10.1° sits just as close positionally but
    /// falls in a different `maxAngleDeg=10` bucket and stays separate.
    #[test]
    fn rotation_boundary_merge_matches_documented_example() {
        let a = result(rotated_rect(0.0, 0.0, 20.0, 10.0, 9.9), "a", 0.9);
        let b = result(rotated_rect(23.422, 0.0, 20.0, 10.0, 9.9), "b", 0.8);
        let c = result(rotated_rect(46.8795, 0.0, 20.0, 10.0, 10.1), "c", 0.85);

        let mut options = Options::default();
        options.merge_lines.enabled = true;
        options.merge_lines.max_angle_deg = 10.0;

        let merged = merge_lines(vec![a, b, c], &options);
        assert_eq!(merged.len(), 2);

        let ab = merged.iter().find(|r| r.text == "a b").unwrap();
        assert_eq!(ab.confidence, 0.8);

        let c_only = merged.iter().find(|r| r.text == "c").unwrap();
        assert_eq!(c_only.confidence, 0.85);
    }
}
