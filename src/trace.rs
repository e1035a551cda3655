//! Debug tracing interface. An optional sink receives named steps; the
//! core depends only on the `TraceWriter` trait, never a concrete sink,
//! so passing `None` drops all tracing calls at the call site (spec §6,
//! §9 "async chain with optional tracing" redesign note).
//!
//! Trace step names are part of the observable contract and must stay
//! stable to enable cross-implementation diffing — see the `STEP_*`
//! constants below.

use serde::Serialize;

/// The kind of payload a trace step carries.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceStep {
    Image {
        width: u32,
        height: u32,
        channels: usize,
    },
    Tensor {
        shape: Vec<usize>,
        /// First few values, for human inspection; not the full buffer.
        preview: Vec<f32>,
    },
    Boxes {
        count: usize,
        /// Flattened `[x0,y0,x1,y1,x2,y2,x3,y3]` per box.
        quads: Vec<[f64; 8]>,
    },
    Params {
        json: serde_json::Value,
    },
}

/// Stable step names emitted by the pipeline (spec §6).
pub mod steps {
    pub const LOAD_IMAGE: &str = "load_image";
    pub const OCR_OPTIONS: &str = "ocr_options";
    pub const RESIZE_ASPECT_RATIO: &str = "resize_aspect_ratio";
    pub const PAD_TO_STRIDE: &str = "pad_to_stride";
    pub const NORMALIZE_MEAN_VARIANCE: &str = "normalize_mean_variance";
    pub const TO_TENSOR_LAYOUT: &str = "to_tensor_layout";
    pub const DETECTOR_INPUT_FINAL: &str = "detector_input_final";
    pub const DETECTOR_RAW_OUTPUT_TEXT: &str = "detector_raw_output_text";
    pub const DETECTOR_RAW_OUTPUT_LINK: &str = "detector_raw_output_link";
    pub const HEATMAP_TEXT: &str = "heatmap_text";
    pub const HEATMAP_LINK: &str = "heatmap_link";
    pub const THRESHOLD_AND_BOX_DECODE: &str = "threshold_and_box_decode";
    pub const ADJUST_COORDINATES_TO_ORIGINAL: &str = "adjust_coordinates_to_original";
    pub const DETECTOR_BOXES_HORIZONTAL: &str = "detector_boxes_horizontal";
    pub const DETECTOR_BOXES_FREE: &str = "detector_boxes_free";
    pub const DETECTOR_BOXES_ORDERED: &str = "detector_boxes_ordered";
    pub const RECOGNIZER_RESULTS_PRE_MERGE: &str = "recognizer_results_pre_merge";
    pub const RECOGNIZER_RESULTS_POST_MERGE: &str = "recognizer_results_post_merge";
}

/// Receives named trace steps. Implementations decide what to do with
/// them (write to disk, forward to a diffing harness, drop).
pub trait TraceWriter: Send + Sync {
    fn write(&self, name: &str, step: TraceStep);
}

/// A `TraceWriter` that writes each step as one JSON line.
pub struct JsonLinesTraceWriter {
    sink: std::sync::Mutex<Box<dyn std::io::Write + Send>>,
}

impl JsonLinesTraceWriter {
    pub fn new(sink: Box<dyn std::io::Write + Send>) -> Self {
        Self {
            sink: std::sync::Mutex::new(sink),
        }
    }
}

impl TraceWriter for JsonLinesTraceWriter {
    fn write(&self, name: &str, step: TraceStep) {
        #[derive(Serialize)]
        struct Line<'a> {
            name: &'a str,
            #[serde(flatten)]
            step: TraceStep,
        }
        if let Ok(mut sink) = self.sink.lock() {
            if let Ok(line) = serde_json::to_string(&Line { name, step }) {
                let _ = writeln!(sink, "{line}");
            }
        }
    }
}

/// Convenience: record a step only if a sink is present.
pub fn emit(sink: Option<&dyn TraceWriter>, name: &str, step: TraceStep) {
    if let Some(sink) = sink {
        sink.write(name, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_is_a_noop_without_a_sink() {
        emit(None, steps::LOAD_IMAGE, TraceStep::Image { width: 1, height: 1, channels: 3 });
    }

    #[test]
    fn json_lines_writer_serializes_a_step() {
        let buf: Vec<u8> = Vec::new();
        let writer = JsonLinesTraceWriter::new(Box::new(buf));
        writer.write(
            steps::DETECTOR_INPUT_FINAL,
            TraceStep::Tensor {
                shape: vec![1, 3, 32, 32],
                preview: vec![0.0, 1.0],
            },
        );
    }
}
