//! 核心: 变换、存储、分类、投影与运行

pub mod spectral;
pub mod store;
pub mod classifier;
pub mod projection;
pub mod stream;
pub mod animation;
pub mod engine;
