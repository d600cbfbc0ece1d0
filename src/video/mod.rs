#[cfg(feature = "desktop")]
pub mod capture;

use std::path::Path;

#[cfg(feature = "desktop")]
pub use capture::{mat_to_frame, VideoFrames};

/// 受け付ける動画の拡張子
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// 拡張子で動画ファイルかを判定（大文字小文字は区別しない）
pub fn is_supported_video<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
