//! 图像目录帧源
//!
//! 按文件名顺序读取目录中的图像，代替相机设备

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::buffer::frame::Frame;
use crate::error::CaptureError;
use crate::utils::time;

use super::FrameSource;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// 图像目录帧源
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    /// 读完后从头循环
    looping: bool,
    index: usize,
}

impl ImageDirSource {
    /// 扫描目录
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref().to_path_buf();
        let io_err = |source| CaptureError::Io {
            path: dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if supported {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(CaptureError::Empty(dir));
        }
        files.sort();

        debug!("{}: {} 个图像", dir.display(), files.len());
        Ok(Self {
            dir,
            files,
            looping: false,
            index: 0,
        })
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// 图像文件数 (打开时保证非空)
    pub fn image_count(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.index >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.index = 0;
        }
        let path = &self.files[self.index];
        self.index += 1;

        let image = image::open(path).map_err(|source| CaptureError::Image {
            path: path.clone(),
            source,
        })?;
        Ok(Some(Frame::from_rgb_image(image.to_rgb8(), time::now())))
    }

    fn describe(&self) -> String {
        format!("{} ({} images)", self.dir.display(), self.image_count())
    }
}
