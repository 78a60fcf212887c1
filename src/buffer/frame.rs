//! 视频帧与亮度采样
//!
//! 相机帧为 RGB 字节 (零拷贝)，进入变换前降采样为固定尺寸的亮度网格

use bytes::Bytes;
use image::RgbImage;
use ndarray::Array2;

use crate::config::EmbeddingConfig;
use crate::error::ConfigError;

/// 视频帧
#[derive(Clone, Debug)]
pub struct Frame {
    /// 帧数据 (RGB, 零拷贝)
    pub data: Bytes,
    /// 时间戳 (秒)
    pub timestamp: f64,
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
}

impl Frame {
    pub fn new(data: Bytes, timestamp: f64, width: u32, height: u32) -> Self {
        Self { data, timestamp, width, height }
    }

    /// 从 Vec<u8> 创建
    pub fn from_vec(data: Vec<u8>, timestamp: f64, width: u32, height: u32) -> Self {
        Self {
            data: Bytes::from(data),
            timestamp,
            width,
            height,
        }
    }

    /// 从 RGB 图像创建
    pub fn from_rgb_image(image: RgbImage, timestamp: f64) -> Self {
        let (width, height) = image.dimensions();
        Self::from_vec(image.into_raw(), timestamp, width, height)
    }

    /// 转换为 RGB 图像
    pub fn to_rgb_image(&self) -> Result<RgbImage, ConfigError> {
        self.check_len()?;
        let pixels = self.width as usize * self.height as usize * 3;
        RgbImage::from_raw(self.width, self.height, self.data[..pixels].to_vec()).ok_or(
            ConfigError::FrameSize {
                width: self.width,
                height: self.height,
                expected: pixels,
                actual: self.data.len(),
            },
        )
    }

    /// 全分辨率亮度 (BT.601)
    pub fn luma(&self) -> Result<Array2<f64>, ConfigError> {
        self.check_len()?;
        let (w, h) = (self.width as usize, self.height as usize);
        let values = self
            .data
            .chunks_exact(3)
            .take(w * h)
            .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
            .collect::<Vec<_>>();
        Array2::from_shape_vec((h, w), values).map_err(|_| ConfigError::FrameSize {
            width: self.width,
            height: self.height,
            expected: w * h * 3,
            actual: self.data.len(),
        })
    }

    fn check_len(&self) -> Result<(), ConfigError> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.width == 0 || self.height == 0 || self.data.len() < expected {
            return Err(ConfigError::FrameSize {
                width: self.width,
                height: self.height,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// 亮度采样网格 (行 = 高度, 列 = 宽度)
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSample {
    values: Array2<f64>,
}

impl FrameSample {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// 将帧的亮度重采样到 width × height
    ///
    /// 缩小时取区域均值，放大时取最近像素
    pub fn from_frame(frame: &Frame, width: usize, height: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        let luma = frame.luma()?;
        let (src_h, src_w) = luma.dim();

        let values = Array2::from_shape_fn((height, width), |(r, c)| {
            let y0 = r * src_h / height;
            let y1 = ((r + 1) * src_h / height).max(y0 + 1).min(src_h);
            let x0 = c * src_w / width;
            let x1 = ((c + 1) * src_w / width).max(x0 + 1).min(src_w);

            let block = luma.slice(ndarray::s![y0..y1, x0..x1]);
            block.sum() / block.len() as f64
        });

        Ok(Self { values })
    }

    /// 按配置采样
    pub fn from_frame_with(frame: &Frame, config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        Self::from_frame(frame, config.width, config.height)
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// 尺寸必须与配置一致
    pub fn check_dims(&self, config: &EmbeddingConfig) -> Result<(), ConfigError> {
        if self.width() != config.width || self.height() != config.height {
            return Err(ConfigError::SampleSize {
                width: config.width,
                height: config.height,
                actual_width: self.width(),
                actual_height: self.height(),
            });
        }
        Ok(())
    }
}
