//! 帧源
//!
//! 相机以外部协作者的形式接入: 只需逐帧交付 RGB 帧

pub mod image_dir;
pub mod synthetic;

pub use image_dir::ImageDirSource;
pub use synthetic::SyntheticSource;

use crate::buffer::frame::Frame;
use crate::error::CaptureError;

/// 阻塞式帧源
///
/// 在采集线程上被反复调用，返回 `Ok(None)` 表示帧源耗尽
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// 日志用描述
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

impl FrameSource for Box<dyn FrameSource> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
