//! 合成帧源
//!
//! 生成确定性的移动渐变图案，没有相机时用于演示和测试

use crate::buffer::frame::Frame;
use crate::error::CaptureError;

use super::FrameSource;

/// 时间戳使用的帧率
const FPS: f64 = 30.0;

/// 合成帧源
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    /// 最多生成的帧数 (None 为无限)
    limit: Option<usize>,
    /// 图案种子，不同种子得到不同的"场景"
    seed: u32,
    index: usize,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            limit: None,
            seed: 0,
            index: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// 第 i 帧 (纯函数)
    pub fn frame_at(&self, index: usize) -> Frame {
        let (w, h) = (self.width as usize, self.height as usize);
        let shift = index as u32 * 3;
        let mut data = Vec::with_capacity(w * h * 3);
        for y in 0..h as u32 {
            for x in 0..w as u32 {
                let r = (x * 8 + shift + self.seed * 17) % 256;
                let g = (y * 8 + self.seed * 31) % 256;
                let b = ((x + y) * 4 + shift * 2 + self.seed * 53) % 256;
                data.extend_from_slice(&[r as u8, g as u8, b as u8]);
            }
        }
        Frame::from_vec(data, index as f64 / FPS, self.width, self.height)
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.limit.is_some_and(|limit| self.index >= limit) {
            return Ok(None);
        }
        let frame = self.frame_at(self.index);
        self.index += 1;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!("synthetic {}x{} seed {}", self.width, self.height, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit() {
        let mut source = SyntheticSource::new(4, 4).with_limit(2);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_frames_differ() {
        let source = SyntheticSource::new(8, 8);
        let a = source.frame_at(0);
        let b = source.frame_at(1);
        assert_eq!(a.data.len(), 8 * 8 * 3);
        assert_ne!(a.data, b.data);
        assert!(b.timestamp > a.timestamp);
    }
}
