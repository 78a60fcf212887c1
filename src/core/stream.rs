//! 流处理
//!
//! 一个生产者 (相机) 把帧送入有界通道，一个消费者按采集顺序取出并编码。
//! 停止是协作式的: 生产者每次迭代检查停止令牌，停止后至多再送出一帧。

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::embedding::Embedding;
use crate::buffer::frame::{Frame, FrameSample};
use crate::config::EmbeddingConfig;
use crate::core::spectral::{SpectralTransform, Spectrum};
use crate::error::{CaptureError, ConfigError};
use crate::source::FrameSource;

// ============================================================
// 停止令牌
// ============================================================

/// 停止信号的发送端
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

/// 传给生产者的停止令牌
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

/// 创建一对停止句柄与令牌
pub fn stop_pair() -> (StopHandle, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopToken { rx })
}

impl StopHandle {
    pub fn stop(&self) {
        // 所有令牌都已丢弃时发送失败，此时也无需通知
        let _ = self.tx.send(true);
    }
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }
}

// ============================================================
// 采集任务
// ============================================================

/// 运行中的采集: 帧通道 + 停止句柄 + 任务句柄
pub struct Capture {
    /// 按采集顺序的帧
    pub frames: mpsc::Receiver<Frame>,
    stop: StopHandle,
    task: JoinHandle<Result<usize, CaptureError>>,
}

impl Capture {
    /// 下一帧，生产者结束后返回 None
    pub async fn next(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// 通知生产者停止 (不等待)
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// 停止并等待生产者退出，返回送出的帧数
    pub async fn finish(self) -> Result<usize, CaptureError> {
        self.stop.stop();
        // 丢弃接收端，解除阻塞中的发送
        drop(self.frames);
        self.task
            .await
            .map_err(|e| CaptureError::Task(e.to_string()))?
    }
}

/// 在阻塞线程上启动生产者
pub fn spawn_capture<S>(source: S, capacity: usize) -> Capture
where
    S: FrameSource,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (stop, token) = stop_pair();
    let task = tokio::task::spawn_blocking(move || produce(source, tx, token));
    Capture {
        frames: rx,
        stop,
        task,
    }
}

fn produce<S: FrameSource>(
    mut source: S,
    tx: mpsc::Sender<Frame>,
    token: StopToken,
) -> Result<usize, CaptureError> {
    let mut sent = 0;
    info!("开始采集: {}", source.describe());

    while !token.is_stopped() {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("帧源耗尽");
                break;
            }
            Err(e) => {
                warn!("采集失败: {}", e);
                return Err(e);
            }
        };
        if tx.blocking_send(frame).is_err() {
            debug!("消费者已关闭");
            break;
        }
        sent += 1;
    }

    info!("采集结束: 送出 {} 帧", sent);
    Ok(sent)
}

// ============================================================
// 帧编码
// ============================================================

/// 帧 → 亮度采样 → 频谱 → 嵌入
pub struct StreamProcessor {
    config: EmbeddingConfig,
    transform: SpectralTransform,
}

impl StreamProcessor {
    pub fn new(config: EmbeddingConfig) -> Result<Self, ConfigError> {
        let transform = SpectralTransform::new(&config)?;
        Ok(Self { config, transform })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// 计算帧的频谱
    pub fn spectrum(&self, frame: &Frame) -> Result<Spectrum, ConfigError> {
        let sample = FrameSample::from_frame_with(frame, &self.config)?;
        self.spectrum_of(&sample)
    }

    /// 计算采样的频谱 (尺寸先于变换校验)
    pub fn spectrum_of(&self, sample: &FrameSample) -> Result<Spectrum, ConfigError> {
        sample.check_dims(&self.config)?;
        self.transform.transform(sample)
    }

    /// 编码一帧
    pub fn encode(&self, frame: &Frame) -> Result<Embedding, ConfigError> {
        self.spectrum(frame)?
            .embed(self.config.embedding_width, self.config.embedding_height)
    }
}
