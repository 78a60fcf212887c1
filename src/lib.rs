//! 频谱帧指纹库
//!
//! 核心流程：
//! - 相机帧 → 亮度采样 → 二维余弦族变换
//! - 低频子块 → 嵌入向量
//! - 学习: 追加到带标签的点存储
//! - 推理: 最近邻分类 + 获胜标签历史的二维主成分投影

pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod source;
pub mod utils;

// Re-exports - 配置与错误
pub use config::{CaptureConfig, EmbeddingConfig, EmbeddingSignature, ProjectionScalar, Representation};
pub use error::{
    AnimationError, CaptureError, ConfigError, ConfigFileError, Error, ProjectionError, Result,
    StoreError,
};

// Re-exports - 核心
pub use crate::core::classifier::{classify, distance, Match};
pub use crate::core::engine::{Engine, EngineEvent, InferStats, Inference};
pub use crate::core::projection::{project, Coordinate};
pub use crate::core::spectral::{SpectralTransform, Spectrum};
pub use crate::core::store::{Point, PointStore};
pub use crate::core::stream::{spawn_capture, Capture, StopHandle, StopToken, StreamProcessor};

// Re-exports - 帧与帧源
pub use buffer::{Embedding, Frame, FrameSample};
pub use source::{FrameSource, ImageDirSource, SyntheticSource};
