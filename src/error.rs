//! 错误类型
//!
//! 每个关注点一个枚举，`Error` 汇总后在运行顶层传播

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{EmbeddingSignature, Representation};

/// 配置错误: 必须在任何匹配循环之前失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("transform and embedding dimensions must be non-zero")]
    ZeroDimension,
    #[error(
        "embedding {embedding_width}x{embedding_height} exceeds transform {width}x{height}"
    )]
    EmbeddingTooLarge {
        width: usize,
        height: usize,
        embedding_width: usize,
        embedding_height: usize,
    },
    #[error("phase projection requires the complex representation")]
    PhaseWithoutComplex,
    #[error("sample is {actual_width}x{actual_height}, expected {width}x{height}")]
    SampleSize {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("vector length {actual}, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("representation mismatch: expected {expected:?}, got {actual:?}")]
    RepresentationMismatch {
        expected: Representation,
        actual: Representation,
    },
    #[error("label must not be empty")]
    EmptyLabel,
}

/// 配置文件错误
#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 点存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot access point store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("point store {0} does not exist")]
    Missing(PathBuf),
    #[error("cannot decode point store {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode point store: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("point store format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },
    #[error("point store was built with {found:?}, running with {expected:?}")]
    Incompatible {
        expected: EmbeddingSignature,
        found: EmbeddingSignature,
    },
    #[error("point store entry {key:?} is named {name:?}")]
    LabelMismatch { key: String, name: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 投影计算错误 (仅影响单次推理)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("projection input contains non-finite values")]
    NonFinite,
    #[error("projection input has zero variance")]
    ZeroVariance,
    #[error("projection basis is rank deficient (second eigenvalue {second})")]
    RankDeficient { second: f64 },
    #[error("eigen decomposition did not converge")]
    Decomposition,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 帧源错误
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot read frame source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode frame {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame source {0} contains no images")]
    Empty(PathBuf),
    #[error("frame feed closed before a frame arrived")]
    Closed,
    #[error("capture task failed: {0}")]
    Task(String),
}

/// 动画输出错误
#[derive(Error, Debug)]
pub enum AnimationError {
    #[error("cannot write animation {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode animation {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no frames to encode")]
    NoFrames,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 汇总错误
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Animation(#[from] AnimationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
