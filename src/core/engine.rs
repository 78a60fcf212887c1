//! 引擎
//!
//! 学习、推理、拍照三种运行。点存储由一次运行独占，采集任务从不接触它。

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::buffer::embedding::Embedding;
use crate::buffer::frame::Frame;
use crate::config::{CaptureConfig, EmbeddingConfig};
use crate::core::animation::{self, Segmenter};
use crate::core::classifier::{self, Match};
use crate::core::projection::{self, Coordinate};
use crate::core::store::PointStore;
use crate::core::stream::{spawn_capture, StreamProcessor};
use crate::error::{CaptureError, ConfigError, Result};
use crate::source::FrameSource;

// ============================================================
// 引擎事件
// ============================================================

/// 引擎事件
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// 学习完成
    Learned {
        label: String,
        history: usize,
    },
    /// 匹配结果
    Matched {
        timestamp: f64,
        label: String,
        distance: f64,
    },
    /// 存储为空
    NoMatch { timestamp: f64 },
    /// 投影坐标
    Projected {
        timestamp: f64,
        label: String,
        coordinate: Coordinate,
    },
    /// 投影失败 (本帧跳过，循环继续)
    ProjectionFailed {
        timestamp: f64,
        label: String,
        reason: String,
    },
}

/// 单帧推理结果
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub timestamp: f64,
    /// 空存储时为 None
    pub matched: Option<Match>,
    /// 历史不足或投影失败时为 None
    pub coordinate: Option<Coordinate>,
}

/// 推理运行统计
#[derive(Debug, Clone, Default)]
pub struct InferStats {
    pub frames: usize,
    pub matched: usize,
    pub projected: usize,
    pub projection_failures: usize,
}

// ============================================================
// 核心引擎
// ============================================================

/// 嵌入-匹配引擎
pub struct Engine {
    processor: StreamProcessor,
    capture: CaptureConfig,
    event_tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl Engine {
    pub fn new(config: EmbeddingConfig) -> Result<Self, ConfigError> {
        let processor = StreamProcessor::new(config)?;
        info!(
            "引擎初始化: 变换 {}x{}, 嵌入 {}x{}, {:?}",
            processor.config().width,
            processor.config().height,
            processor.config().embedding_width,
            processor.config().embedding_height,
            processor.config().representation,
        );
        Ok(Self {
            processor,
            capture: CaptureConfig::default(),
            event_tx: None,
        })
    }

    /// 设置采集配置
    pub fn with_capture_config(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// 设置事件通道
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &EmbeddingConfig {
        self.processor.config()
    }

    /// 与当前配置匹配的空存储
    pub fn empty_store(&self) -> PointStore {
        PointStore::new(self.config().signature())
    }

    /// 编码一帧
    pub fn embed(&self, frame: &Frame) -> Result<Embedding, ConfigError> {
        self.processor.encode(frame)
    }

    /// 把一帧学习到标签下
    pub fn learn(&self, store: &mut PointStore, label: &str, frame: &Frame) -> Result<(), ConfigError> {
        let embedding = self.embed(frame)?;
        store.learn(label, embedding)?;

        let history = store.get(label).map(|p| p.len()).unwrap_or_default();
        self.emit(EngineEvent::Learned {
            label: label.to_string(),
            history,
        });
        Ok(())
    }

    /// 对一帧分类并在历史足够时投影
    ///
    /// 投影失败只影响本帧: 记录警告并返回无坐标的结果
    pub fn infer(&self, store: &PointStore, frame: &Frame) -> Result<Inference, ConfigError> {
        let timestamp = frame.timestamp;
        let query = self.embed(frame)?;

        let Some(matched) = classifier::classify(store, &query)? else {
            self.emit(EngineEvent::NoMatch { timestamp });
            return Ok(Inference {
                timestamp,
                matched: None,
                coordinate: None,
            });
        };

        self.emit(EngineEvent::Matched {
            timestamp,
            label: matched.label.clone(),
            distance: matched.distance,
        });

        let history = store
            .get(&matched.label)
            .map(|p| p.points.as_slice())
            .unwrap_or_default();
        let coordinate = match projection::project(history, &query, self.config().projection) {
            Ok(Some(coordinate)) => {
                self.emit(EngineEvent::Projected {
                    timestamp,
                    label: matched.label.clone(),
                    coordinate,
                });
                Some(coordinate)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("投影失败 ({}): {}", matched.label, e);
                self.emit(EngineEvent::ProjectionFailed {
                    timestamp,
                    label: matched.label.clone(),
                    reason: e.to_string(),
                });
                None
            }
        };

        Ok(Inference {
            timestamp,
            matched: Some(matched),
            coordinate,
        })
    }

    // ============================================================
    // 运行
    // ============================================================

    /// 学习运行: 读存储 (缺失则为空) → 等待 → 采一帧 → 追加 → 写回
    pub async fn run_learn<S: FrameSource>(
        &self,
        source: S,
        store_path: impl AsRef<Path>,
        label: &str,
        delay: Duration,
    ) -> Result<PointStore> {
        let store_path = store_path.as_ref();
        if label.is_empty() {
            return Err(ConfigError::EmptyLabel.into());
        }
        let mut store = PointStore::load(store_path, self.config().signature())?;

        if !delay.is_zero() {
            info!("等待 {:.0} 秒", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }

        let mut capture = spawn_capture(source, self.capture.channel_capacity);
        let frame = capture.next().await;
        capture.finish().await?;
        let frame = frame.ok_or(CaptureError::Closed)?;

        self.learn(&mut store, label, &frame)?;
        store.save(store_path)?;

        info!(
            "学习 {} 完成: {} 个标签, {} 个向量",
            label,
            store.len(),
            store.total_points()
        );
        Ok(store)
    }

    /// 推理运行: 存储必须存在；逐帧分类直到帧源耗尽或达到上限
    pub async fn run_infer<S: FrameSource>(
        &self,
        source: S,
        store_path: impl AsRef<Path>,
        max_frames: Option<usize>,
    ) -> Result<InferStats> {
        let store = PointStore::open(store_path, self.config().signature())?;
        info!("推理: {} 个标签, {} 个向量", store.len(), store.total_points());

        let mut stats = InferStats::default();
        let mut capture = spawn_capture(source, self.capture.channel_capacity);

        while let Some(frame) = capture.next().await {
            let inference = match self.infer(&store, &frame) {
                Ok(inference) => inference,
                Err(e) => {
                    // 返回编码错误本身，采集端的错误只记录
                    if let Err(capture_err) = capture.finish().await {
                        warn!("停止采集失败: {}", capture_err);
                    }
                    return Err(e.into());
                }
            };

            stats.frames += 1;
            if inference.matched.is_some() {
                stats.matched += 1;
            }
            if inference.coordinate.is_some() {
                stats.projected += 1;
            } else if inference
                .matched
                .as_ref()
                .and_then(|m| store.get(&m.label))
                .is_some_and(|p| p.len() >= projection::MIN_HISTORY)
            {
                stats.projection_failures += 1;
            }

            if max_frames.is_some_and(|max| stats.frames >= max) {
                debug!("达到帧数上限 {}", stats.frames);
                break;
            }
        }

        capture.finish().await?;
        Ok(stats)
    }

    /// 拍照运行: 采集固定帧数写成 GIF，可选地再写一份去背景的版本
    pub async fn run_picture<S: FrameSource>(
        &self,
        source: S,
        output: impl AsRef<Path>,
        segmented: Option<(PathBuf, &dyn Segmenter)>,
    ) -> Result<usize> {
        let count = self.capture.picture_frames;
        let mut capture = spawn_capture(source, self.capture.channel_capacity);

        let mut frames = Vec::with_capacity(count);
        while frames.len() < count {
            match capture.next().await {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        capture.finish().await?;

        if frames.len() < count {
            warn!("帧源只提供了 {} / {} 帧", frames.len(), count);
        }

        animation::write_gif(output, &frames)?;
        if let Some((path, segmenter)) = segmented {
            let cleaned = frames
                .iter()
                .map(|f| animation::remove_background(f, segmenter))
                .collect::<Result<Vec<_>, _>>()?;
            animation::write_gif(path, &cleaned)?;
        }
        Ok(frames.len())
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
