//! Inference-runner capability: `run(feeds) -> outputs`, plus the
//! adapter that normalizes the detector's several possible output
//! shapes to a canonical (text, link) heatmap pair (spec §6, §9).

use std::collections::HashMap;
use std::path::Path;

use crate::error::{OcrError, Result};

/// The ONNX element type a [`Tensor`] should be marshalled as at the
/// `ort` boundary. The pipeline's own math is always f32; `I64` exists
/// only for placeholder inputs some recognizer graphs declare (spec
/// §4.H step 5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorDType {
    F32,
    I64,
}

/// A typed, contiguous tensor buffer plus shape. Layout is
/// shape-implied; the pipeline uses NCHW for model I/O and HWC for
/// intermediate float images. Values are stored as `f32` regardless of
/// `dtype` — the only `I64` use is a zero placeholder, which round-trips
/// exactly through `f32`.
#[derive(Debug, Clone)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub dtype: TensorDType,
}

impl Tensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Self {
            data,
            shape,
            dtype: TensorDType::F32,
        }
    }

    /// A zero-filled `i64`-tagged tensor of the given shape (the
    /// secondary recognizer input some models declare, spec §6).
    pub fn zeros_i64(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape,
            dtype: TensorDType::I64,
        }
    }
}

/// Capability for running an ONNX graph: tensor-in, tensor-out. The
/// core never constructs or owns a concrete inference session type;
/// it only calls through this trait.
pub trait InferenceRunner: Send + Sync {
    /// Runs the graph with named input tensors, returning named output
    /// tensors.
    fn run(&self, feeds: HashMap<String, Tensor>) -> Result<HashMap<String, Tensor>>;

    /// The model's declared input shape, if statically known (used to
    /// resolve the recognizer's geometry per spec §9 Open Question 2).
    fn input_shape(&self) -> Option<Vec<i64>>;

    /// Name the graph's primary tensor input is bound to. Falls back to
    /// `"input"` when the name can't be statically determined (e.g. a
    /// test double).
    fn primary_input_name(&self) -> Option<String> {
        None
    }

    /// Name of a secondary scalar input the graph declares beyond the
    /// primary tensor input, if any (spec §4.H step 5's "zero i64
    /// placeholder" recognizer input). `None` when the graph has a
    /// single input.
    fn secondary_input_name(&self) -> Option<String> {
        None
    }
}

/// The detector's raw output may arrive in one of three shapes; this
/// tagged variant expresses all three, with a normalization function to
/// the canonical (text, link) pair (spec §9 "polymorphic detector
/// output shapes" redesign note).
pub enum DetectorOutputLayout {
    /// `[1, H/2, W/2, 2]`, last axis is (text, link).
    ChannelsLast(Tensor),
    /// `[1, 2, H/2, W/2]`, channel axis is 1.
    ChannelsFirst(Tensor),
    /// Two separate tensors, named `text` and `link`.
    NamedPair { text: Tensor, link: Tensor },
}

/// A heatmap pair at the detector's output resolution.
pub struct HeatmapPair {
    pub text: Vec<f32>,
    pub link: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl DetectorOutputLayout {
    /// Detects the layout from a raw output tensor map. Prefers a
    /// `text`/`link` named pair if present, then falls back to a single
    /// 4D tensor discriminated by which axis has length 2.
    pub fn from_outputs(mut outputs: HashMap<String, Tensor>) -> Result<Self> {
        if let (Some(text), Some(link)) = (outputs.remove("text"), outputs.remove("link")) {
            return Ok(DetectorOutputLayout::NamedPair { text, link });
        }

        let tensor = outputs
            .into_values()
            .next()
            .ok_or_else(|| OcrError::ShapeMismatch {
                context: "detector output".into(),
                expected: "at least one output tensor".into(),
                actual: vec![],
            })?;

        if tensor.shape.len() != 4 {
            return Err(OcrError::ShapeMismatch {
                context: "detector output".into(),
                expected: "4D tensor [1,H,W,2] or [1,2,H,W]".into(),
                actual: tensor.shape.iter().map(|&d| d as i64).collect(),
            });
        }

        if tensor.shape[3] == 2 {
            Ok(DetectorOutputLayout::ChannelsLast(tensor))
        } else if tensor.shape[1] == 2 {
            Ok(DetectorOutputLayout::ChannelsFirst(tensor))
        } else {
            Err(OcrError::ShapeMismatch {
                context: "detector output".into(),
                expected: "a channel axis of length 2 (text, link)".into(),
                actual: tensor.shape.iter().map(|&d| d as i64).collect(),
            })
        }
    }

    /// Normalizes to the canonical heatmap pair.
    pub fn into_heatmaps(self) -> Result<HeatmapPair> {
        match self {
            DetectorOutputLayout::ChannelsLast(t) => {
                let h = t.shape[1];
                let w = t.shape[2];
                let mut text = vec![0f32; h * w];
                let mut link = vec![0f32; h * w];
                for i in 0..(h * w) {
                    text[i] = t.data[i * 2];
                    link[i] = t.data[i * 2 + 1];
                }
                Ok(HeatmapPair {
                    text,
                    link,
                    width: w,
                    height: h,
                })
            }
            DetectorOutputLayout::ChannelsFirst(t) => {
                let h = t.shape[2];
                let w = t.shape[3];
                let plane = h * w;
                let text = t.data[0..plane].to_vec();
                let link = t.data[plane..2 * plane].to_vec();
                Ok(HeatmapPair {
                    text,
                    link,
                    width: w,
                    height: h,
                })
            }
            DetectorOutputLayout::NamedPair { text, link } => {
                if text.shape != link.shape {
                    return Err(OcrError::ShapeMismatch {
                        context: "detector text/link outputs".into(),
                        expected: format!("{:?}", text.shape),
                        actual: link.shape.iter().map(|&d| d as i64).collect(),
                    });
                }
                let h = *text.shape.get(text.shape.len().wrapping_sub(2)).unwrap_or(&0);
                let w = *text.shape.last().unwrap_or(&0);
                Ok(HeatmapPair {
                    text: text.data,
                    link: link.data,
                    width: w,
                    height: h,
                })
            }
        }
    }
}

/// `ort`-backed inference runner: a committed ONNX session behind the
/// `InferenceRunner` trait.
pub struct OrtInferenceRunner {
    session: std::sync::Mutex<ort::session::Session>,
}

impl OrtInferenceRunner {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let session = ort::session::Session::builder()
            .map_err(|e| OcrError::ModelLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| OcrError::ModelLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .commit_from_file(path)
            .map_err(|e| OcrError::ModelLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self {
            session: std::sync::Mutex::new(session),
        })
    }
}

impl InferenceRunner for OrtInferenceRunner {
    fn run(&self, feeds: HashMap<String, Tensor>) -> Result<HashMap<String, Tensor>> {
        let mut session = self.session.lock().expect("session mutex poisoned");
        let mut input_values = Vec::with_capacity(feeds.len());
        for (name, tensor) in &feeds {
            let shape: Vec<i64> = tensor.shape.iter().map(|&d| d as i64).collect();
            match tensor.dtype {
                TensorDType::F32 => {
                    let array = ndarray::ArrayD::from_shape_vec(
                        tensor.shape.clone(),
                        tensor.data.clone(),
                    )
                    .map_err(|_| OcrError::ShapeMismatch {
                        context: format!("input tensor `{name}`"),
                        expected: format!("{:?}", tensor.shape),
                        actual: shape.clone(),
                    })?;
                    let value = ort::value::Tensor::from_array(array)
                        .map_err(|e| OcrError::Inference(e.to_string()))?;
                    input_values.push((name.clone(), value.into_dyn()));
                }
                TensorDType::I64 => {
                    let data: Vec<i64> = tensor.data.iter().map(|&v| v as i64).collect();
                    let array = ndarray::ArrayD::from_shape_vec(tensor.shape.clone(), data)
                        .map_err(|_| OcrError::ShapeMismatch {
                            context: format!("input tensor `{name}`"),
                            expected: format!("{:?}", tensor.shape),
                            actual: shape.clone(),
                        })?;
                    let value = ort::value::Tensor::from_array(array)
                        .map_err(|e| OcrError::Inference(e.to_string()))?;
                    input_values.push((name.clone(), value.into_dyn()));
                }
            }
        }

        let outputs = session
            .run(input_values)
            .map_err(|e| OcrError::Inference(e.to_string()))?;

        let mut result = HashMap::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            let dyn_value = value
                .downcast_ref::<ort::value::DynTensorValueType>()
                .map_err(|e| OcrError::Inference(e.to_string()))?;
            let (shape, data) = dyn_value
                .try_extract_tensor::<f32>()
                .map_err(|e| OcrError::Inference(e.to_string()))?;
            let shape_usize: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            result.insert(name.to_string(), Tensor::new(data.to_vec(), shape_usize));
        }
        Ok(result)
    }

    fn input_shape(&self) -> Option<Vec<i64>> {
        let session = self.session.lock().ok()?;
        session.inputs().first().and_then(|i| {
            i.dtype()
                .tensor_shape()
                .map(|shape| shape.iter().copied().collect())
        })
    }

    fn primary_input_name(&self) -> Option<String> {
        let session = self.session.lock().ok()?;
        session.inputs().first().map(|i| i.name().to_string())
    }

    fn secondary_input_name(&self) -> Option<String> {
        let session = self.session.lock().ok()?;
        session.inputs().get(1).map(|i| i.name().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(shape: Vec<usize>) -> Tensor {
        let len = shape.iter().product();
        Tensor::new(vec![0f32; len], shape)
    }

    #[test]
    fn detects_channels_last_layout() {
        let mut outputs = HashMap::new();
        outputs.insert("output".to_string(), tensor(vec![1, 4, 4, 2]));
        let layout = DetectorOutputLayout::from_outputs(outputs).unwrap();
        assert!(matches!(layout, DetectorOutputLayout::ChannelsLast(_)));
    }

    #[test]
    fn detects_channels_first_layout() {
        let mut outputs = HashMap::new();
        outputs.insert("output".to_string(), tensor(vec![1, 2, 4, 4]));
        let layout = DetectorOutputLayout::from_outputs(outputs).unwrap();
        assert!(matches!(layout, DetectorOutputLayout::ChannelsFirst(_)));
    }

    #[test]
    fn detects_named_pair_layout() {
        let mut outputs = HashMap::new();
        outputs.insert("text".to_string(), tensor(vec![1, 4, 4]));
        outputs.insert("link".to_string(), tensor(vec![1, 4, 4]));
        let layout = DetectorOutputLayout::from_outputs(outputs).unwrap();
        assert!(matches!(layout, DetectorOutputLayout::NamedPair { .. }));
    }

    #[test]
    fn rejects_shape_with_no_axis_of_length_two() {
        let mut outputs = HashMap::new();
        outputs.insert("output".to_string(), tensor(vec![1, 3, 4, 4]));
        let err = DetectorOutputLayout::from_outputs(outputs);
        assert!(err.is_err());
    }
}
