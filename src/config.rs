//! 配置
//!
//! 变换尺寸、嵌入尺寸和系数表示在一次部署中固定

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigFileError};

/// 系数表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// 实数 DCT 系数 (无相位)
    Real,
    /// 复数系数 (保留相位)
    Complex,
}

impl Default for Representation {
    fn default() -> Self {
        Self::Complex
    }
}

/// 投影时从每个系数提取的标量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionScalar {
    /// 幅值 (与分类距离一致)
    Magnitude,
    /// 相位 (仅复数表示)
    Phase,
}

impl Default for ProjectionScalar {
    fn default() -> Self {
        Self::Magnitude
    }
}

/// 嵌入配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// 变换宽度
    pub width: usize,
    /// 变换高度
    pub height: usize,
    /// 嵌入宽度
    pub embedding_width: usize,
    /// 嵌入高度
    pub embedding_height: usize,
    /// 系数表示
    pub representation: Representation,
    /// 投影标量
    pub projection: ProjectionScalar,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            width: 24,
            height: 24,
            embedding_width: 8,
            embedding_height: 8,
            representation: Representation::Complex,
            projection: ProjectionScalar::Magnitude,
        }
    }
}

impl EmbeddingConfig {
    /// 从 JSON 文件读取 (缺失字段取默认值)
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 校验尺寸与表示组合
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0
            || self.height == 0
            || self.embedding_width == 0
            || self.embedding_height == 0
        {
            return Err(ConfigError::ZeroDimension);
        }
        if self.embedding_width > self.width || self.embedding_height > self.height {
            return Err(ConfigError::EmbeddingTooLarge {
                width: self.width,
                height: self.height,
                embedding_width: self.embedding_width,
                embedding_height: self.embedding_height,
            });
        }
        if self.projection == ProjectionScalar::Phase
            && self.representation != Representation::Complex
        {
            return Err(ConfigError::PhaseWithoutComplex);
        }
        Ok(())
    }

    /// 嵌入向量长度
    pub fn embedding_len(&self) -> usize {
        self.embedding_width * self.embedding_height
    }

    /// 持久化标签
    pub fn signature(&self) -> EmbeddingSignature {
        EmbeddingSignature {
            width: self.width,
            height: self.height,
            embedding_width: self.embedding_width,
            embedding_height: self.embedding_height,
            representation: self.representation,
        }
    }
}

/// 写入点存储的配置标签
///
/// 两个嵌入只有在签名相同时才可比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSignature {
    pub width: usize,
    pub height: usize,
    pub embedding_width: usize,
    pub embedding_height: usize,
    pub representation: Representation,
}

impl EmbeddingSignature {
    pub fn embedding_len(&self) -> usize {
        self.embedding_width * self.embedding_height
    }
}

/// 采集配置
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// 生产者与消费者之间的通道容量
    pub channel_capacity: usize,
    /// 拍照模式的帧数
    pub picture_frames: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            picture_frames: 32,
        }
    }
}
