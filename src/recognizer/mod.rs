//! CRNN-style recognizer: preprocessing and the tensor-building glue
//! feeding CTC decoding.

pub mod preprocess;

pub use preprocess::{preprocess, RecognizerInput};
