//! 拍照模式输出
//!
//! 把采集的帧写成 GIF 动画 (量化交给 image 库)，
//! 可选地先用区域分割去掉接触图像边界的背景区域。

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::gif::GifEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array2;
use tracing::info;

use crate::buffer::frame::Frame;
use crate::error::{AnimationError, ConfigError};

// ============================================================
// 区域分割
// ============================================================

/// 区域分割器: 返回每个像素的区域编号 (行 = 高度)
///
/// 同一区域的像素编号相同
pub trait Segmenter {
    fn segment(&self, frame: &Frame) -> Result<Array2<u32>, ConfigError>;
}

/// 按亮度分档的 4 连通区域分割
#[derive(Debug, Clone)]
pub struct LumaBandSegmenter {
    /// 亮度分档数
    pub bands: u32,
}

impl Default for LumaBandSegmenter {
    fn default() -> Self {
        Self { bands: 6 }
    }
}

impl Segmenter for LumaBandSegmenter {
    fn segment(&self, frame: &Frame) -> Result<Array2<u32>, ConfigError> {
        let bands = self.bands.max(1);
        let band = frame
            .luma()?
            .mapv(|v| ((v / 256.0 * bands as f64) as u32).min(bands - 1));
        let (h, w) = band.dim();

        let mut regions = Array2::from_elem((h, w), u32::MAX);
        let mut next = 0u32;
        let mut queue = VecDeque::new();

        for start in band.indexed_iter().map(|(idx, _)| idx) {
            if regions[start] != u32::MAX {
                continue;
            }
            let target = band[start];
            regions[start] = next;
            queue.push_back(start);

            while let Some((r, c)) = queue.pop_front() {
                let neighbors = [
                    (r.wrapping_sub(1), c),
                    (r + 1, c),
                    (r, c.wrapping_sub(1)),
                    (r, c + 1),
                ];
                for (nr, nc) in neighbors {
                    if nr < h && nc < w && regions[[nr, nc]] == u32::MAX && band[[nr, nc]] == target {
                        regions[[nr, nc]] = next;
                        queue.push_back((nr, nc));
                    }
                }
            }
            next += 1;
        }

        Ok(regions)
    }
}

/// 背景掩码: 接触上边、右边上半、左边上半的区域
pub fn background_mask(regions: &Array2<u32>) -> Array2<bool> {
    let (h, w) = regions.dim();
    let mut touching = std::collections::HashSet::new();

    if h > 0 && w > 0 {
        touching.extend(regions.row(0).iter().copied());
        for r in 0..h / 2 {
            touching.insert(regions[[r, w - 1]]);
            touching.insert(regions[[r, 0]]);
        }
    }

    regions.mapv(|id| touching.contains(&id))
}

/// 去背景: 掩码内的像素置黑
///
/// 分割结果的尺寸必须与帧一致
pub fn remove_background(frame: &Frame, segmenter: &dyn Segmenter) -> Result<Frame, ConfigError> {
    let regions = segmenter.segment(frame)?;
    let (width, height) = (frame.width as usize, frame.height as usize);
    let (actual_height, actual_width) = regions.dim();
    if (actual_height, actual_width) != (height, width) {
        return Err(ConfigError::SampleSize {
            width,
            height,
            actual_width,
            actual_height,
        });
    }
    let mask = background_mask(&regions);
    let mut image = frame.to_rgb_image()?;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if mask[[y as usize, x as usize]] {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    Ok(Frame::from_rgb_image(image, frame.timestamp))
}

// ============================================================
// GIF 输出
// ============================================================

/// 写入 GIF 动画 (覆盖已有文件)
pub fn write_gif(path: impl AsRef<Path>, frames: &[Frame]) -> Result<(), AnimationError> {
    let path = path.as_ref();
    if frames.is_empty() {
        return Err(AnimationError::NoFrames);
    }

    let images = frames
        .iter()
        .map(|f| f.to_rgb_image())
        .collect::<Result<Vec<RgbImage>, _>>()?;

    let file = File::create(path).map_err(|source| AnimationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder
        .encode_frames(
            images
                .into_iter()
                .map(|img| image::Frame::new(DynamicImage::ImageRgb8(img).into_rgba8())),
        )
        .map_err(|source| AnimationError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    info!("写入 {} ({} 帧)", path.display(), frames.len());
    Ok(())
}
