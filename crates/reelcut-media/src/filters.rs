//! FFmpeg filter expressions.

/// 9:16 center crop at full height.
///
/// Width is `ih*9/16` truncated to an even number (libx264 rejects odd
/// dimensions), horizontally centered.
pub const FILTER_VERTICAL_CENTER_CROP: &str = "crop=trunc(ih*9/16/2)*2:ih:(iw-ow)/2:0";
