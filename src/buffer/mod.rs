//! 帧与嵌入

pub mod frame;
pub mod embedding;

pub use frame::{Frame, FrameSample};
pub use embedding::Embedding;
