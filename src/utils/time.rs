//! 时间工具

use std::time::{SystemTime, UNIX_EPOCH};

/// 获取当前 Unix 时间戳 (秒)
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// 格式化时间戳为 MM:SS.ms
pub fn format_mmss_ms(seconds: f64) -> String {
    let mm = (seconds / 60.0) as u32;
    let ss = (seconds % 60.0) as u32;
    let ms = ((seconds % 1.0) * 1000.0) as u32;
    format!("{:02}:{:02}.{:03}", mm, ss, ms)
}
