//! CRAFT-style scene-text detector: preprocessing, postprocessing, and
//! the tensor-building glue between them.

pub mod postprocess;
pub mod preprocess;

pub use postprocess::{detect_boxes, DetectedBox, PostprocessOptions};
pub use preprocess::{preprocess, DetectorInput};
