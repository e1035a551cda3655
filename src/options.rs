//! Run-time configuration. An immutable record with default values;
//! overrides are field merges, not prototype chains (spec §9 "closure
//! style per-call options" redesign note). The nested `recognizer`
//! sub-record merges field-wise too.

/// Rotation angle (degrees) a crop should additionally be probed at.
pub type RotationDegrees = f64;

/// Recognizer geometry and normalization sub-options.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerOptions {
    pub input_height: u32,
    pub input_width: u32,
    pub input_channels: u32,
    pub mean: f32,
    pub std: f32,
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            input_height: 64,
            input_width: 100,
            input_channels: 1,
            mean: 0.5,
            std: 0.5,
        }
    }
}

impl RecognizerOptions {
    /// Field-wise merge: each `Some` field in `overrides` replaces the
    /// corresponding field in `self`.
    pub fn merge(mut self, overrides: RecognizerOptionsOverrides) -> Self {
        if let Some(v) = overrides.input_height {
            self.input_height = v;
        }
        if let Some(v) = overrides.input_width {
            self.input_width = v;
        }
        if let Some(v) = overrides.input_channels {
            self.input_channels = v;
        }
        if let Some(v) = overrides.mean {
            self.mean = v;
        }
        if let Some(v) = overrides.std {
            self.std = v;
        }
        self
    }
}

/// Sparse override record for [`RecognizerOptions`].
#[derive(Debug, Clone, Default)]
pub struct RecognizerOptionsOverrides {
    pub input_height: Option<u32>,
    pub input_width: Option<u32>,
    pub input_channels: Option<u32>,
    pub mean: Option<f32>,
    pub std: Option<f32>,
}

/// Character-filtering configuration (spec §4.H step 2).
#[derive(Debug, Clone, Default)]
pub struct CharsetFilter {
    pub lang_list: Vec<String>,
    pub allowlist: Option<String>,
    pub blocklist: Option<String>,
}

/// Post-recognition line-merging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeLinesOptions {
    pub enabled: bool,
    pub x_ths: f64,
    pub y_ths: f64,
    pub max_angle_deg: f64,
}

impl Default for MergeLinesOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            x_ths: 1.0,
            y_ths: 0.5,
            max_angle_deg: 10.0,
        }
    }
}

/// Flat, immutable run configuration (spec §3 "Options").
#[derive(Debug, Clone)]
pub struct Options {
    pub canvas_size: f64,
    pub mag_ratio: f64,
    pub align: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub text_threshold: f32,
    pub low_text: f32,
    pub link_threshold: f32,
    pub min_size: f64,
    pub slope_ths: f64,
    pub ycenter_ths: f64,
    pub height_ths: f64,
    pub width_ths: f64,
    pub add_margin: f64,
    pub rotation_info: Vec<RotationDegrees>,
    pub recognizer: RecognizerOptions,
    pub charset_filter: CharsetFilter,
    pub merge_lines: MergeLinesOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            canvas_size: 2560.0,
            mag_ratio: 1.0,
            align: 32,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            text_threshold: 0.7,
            low_text: 0.4,
            link_threshold: 0.4,
            min_size: 20.0,
            slope_ths: 0.1,
            ycenter_ths: 0.5,
            height_ths: 0.5,
            width_ths: 0.5,
            add_margin: 0.1,
            rotation_info: Vec::new(),
            recognizer: RecognizerOptions::default(),
            charset_filter: CharsetFilter::default(),
            merge_lines: MergeLinesOptions::default(),
        }
    }
}

/// Builder producing an `Options` by merging overrides onto the default.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    base: Options,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            base: Options::default(),
        }
    }

    pub fn canvas_size(mut self, v: f64) -> Self {
        self.base.canvas_size = v;
        self
    }

    pub fn mag_ratio(mut self, v: f64) -> Self {
        self.base.mag_ratio = v;
        self
    }

    pub fn align(mut self, v: u32) -> Self {
        self.base.align = v;
        self
    }

    pub fn text_threshold(mut self, v: f32) -> Self {
        self.base.text_threshold = v;
        self
    }

    pub fn low_text(mut self, v: f32) -> Self {
        self.base.low_text = v;
        self
    }

    pub fn link_threshold(mut self, v: f32) -> Self {
        self.base.link_threshold = v;
        self
    }

    pub fn min_size(mut self, v: f64) -> Self {
        self.base.min_size = v;
        self
    }

    pub fn add_margin(mut self, v: f64) -> Self {
        self.base.add_margin = v;
        self
    }

    pub fn rotation_info(mut self, angles: Vec<RotationDegrees>) -> Self {
        self.base.rotation_info = angles;
        self
    }

    pub fn recognizer(mut self, overrides: RecognizerOptionsOverrides) -> Self {
        self.base.recognizer = self.base.recognizer.merge(overrides);
        self
    }

    pub fn lang_list(mut self, langs: Vec<String>) -> Self {
        self.base.charset_filter.lang_list = langs;
        self
    }

    pub fn allowlist(mut self, chars: impl Into<String>) -> Self {
        self.base.charset_filter.allowlist = Some(chars.into());
        self
    }

    pub fn blocklist(mut self, chars: impl Into<String>) -> Self {
        self.base.charset_filter.blocklist = Some(chars.into());
        self
    }

    pub fn merge_lines(mut self, enabled: bool) -> Self {
        self.base.merge_lines.enabled = enabled;
        self
    }

    pub fn merge_lines_thresholds(mut self, x_ths: f64, y_ths: f64, max_angle_deg: f64) -> Self {
        self.base.merge_lines.x_ths = x_ths;
        self.base.merge_lines.y_ths = y_ths;
        self.base.merge_lines.max_angle_deg = max_angle_deg;
        self
    }

    pub fn build(self) -> Options {
        self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec_defaults() {
        let opts = Options::default();
        assert_eq!(opts.canvas_size, 2560.0);
        assert_eq!(opts.align, 32);
        assert_eq!(opts.text_threshold, 0.7);
        assert_eq!(opts.recognizer.input_height, 64);
        assert_eq!(opts.recognizer.input_width, 100);
    }

    #[test]
    fn builder_overrides_only_named_fields() {
        let opts = OptionsBuilder::new().text_threshold(0.9).build();
        assert_eq!(opts.text_threshold, 0.9);
        assert_eq!(opts.low_text, 0.4); // untouched default
    }

    #[test]
    fn recognizer_overrides_merge_field_wise() {
        let opts = OptionsBuilder::new()
            .recognizer(RecognizerOptionsOverrides {
                input_width: Some(200),
                ..Default::default()
            })
            .build();
        assert_eq!(opts.recognizer.input_width, 200);
        assert_eq!(opts.recognizer.input_height, 64); // untouched default
    }
}
