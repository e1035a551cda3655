//! External-collaborator capability traits: image decoding and ONNX
//! inference. The core pipeline depends only on these traits (spec §9
//! "dynamic dispatch on runtime kind" redesign note), never on a
//! concrete decoder or runtime directly.

pub mod image_decoder;
pub mod inference;

pub use image_decoder::{DefaultImageDecoder, ImageDecoder, ImageSource};
pub use inference::{DetectorOutputLayout, InferenceRunner, OrtInferenceRunner, Tensor};
