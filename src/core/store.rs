//! 点存储
//!
//! 标签 → 历史嵌入向量 (只追加)。整体读入、进程内修改、整体写回。
//! 文件带配置签名，不同配置构建的向量无法混入同一存储。

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buffer::embedding::Embedding;
use crate::config::EmbeddingSignature;
use crate::error::{ConfigError, StoreError};

/// 存储格式版本
pub const STORE_FORMAT_VERSION: u32 = 1;

/// 一个标签的历史
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// 标签名
    pub name: String,
    /// 按时间顺序的嵌入
    pub points: Vec<Embedding>,
}

impl Point {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Deserialize)]
struct StoreFile {
    version: u32,
    signature: EmbeddingSignature,
    points: BTreeMap<String, Point>,
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    version: u32,
    signature: &'a EmbeddingSignature,
    points: &'a BTreeMap<String, Point>,
}

/// 带标签的点集合
///
/// 标签按字典序排列，扫描顺序稳定
#[derive(Debug, Clone, PartialEq)]
pub struct PointStore {
    signature: EmbeddingSignature,
    points: BTreeMap<String, Point>,
}

impl PointStore {
    /// 创建空存储
    pub fn new(signature: EmbeddingSignature) -> Self {
        Self {
            signature,
            points: BTreeMap::new(),
        }
    }

    /// 读取存储，文件不存在时返回空存储
    pub fn load(path: impl AsRef<Path>, signature: EmbeddingSignature) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match Self::open(path, signature) {
            Err(StoreError::Missing(_)) => {
                info!("点存储 {} 不存在，从空存储开始", path.display());
                Ok(Self::new(signature))
            }
            other => other,
        }
    }

    /// 读取已存在的存储
    pub fn open(path: impl AsRef<Path>, signature: EmbeddingSignature) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing(path.to_path_buf()))
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: StoreFile = serde_json::from_str(&text).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        if file.version != STORE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                expected: STORE_FORMAT_VERSION,
                found: file.version,
            });
        }
        if file.signature != signature {
            return Err(StoreError::Incompatible {
                expected: signature,
                found: file.signature,
            });
        }
        for (label, point) in &file.points {
            if label.is_empty() {
                return Err(ConfigError::EmptyLabel.into());
            }
            if point.name != *label {
                return Err(StoreError::LabelMismatch {
                    key: label.clone(),
                    name: point.name.clone(),
                });
            }
            for vector in &point.points {
                vector.check_signature(&signature)?;
            }
        }

        let store = Self {
            signature,
            points: file.points,
        };
        debug!(
            "读取点存储 {}: {} 个标签, {} 个向量",
            path.display(),
            store.len(),
            store.total_points()
        );
        Ok(store)
    }

    /// 整体写回 (临时文件 + 重命名)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let file = StoreFileRef {
            version: STORE_FORMAT_VERSION,
            signature: &self.signature,
            points: &self.points,
        };
        let json = serde_json::to_string(&file).map_err(StoreError::Encode)?;

        let tmp = temp_path(path);
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;

        debug!("写入点存储 {}: {} 个向量", path.display(), self.total_points());
        Ok(())
    }

    /// 在标签下追加向量 (不去重、不限长)
    pub fn learn(&mut self, label: &str, vector: Embedding) -> Result<(), ConfigError> {
        if label.is_empty() {
            return Err(ConfigError::EmptyLabel);
        }
        vector.check_signature(&self.signature)?;

        let entry = self
            .points
            .entry(label.to_string())
            .or_insert_with(|| Point::new(label));
        entry.points.push(vector);

        debug!("学习 {}: 历史 {} 个向量", label, entry.len());
        Ok(())
    }

    pub fn signature(&self) -> &EmbeddingSignature {
        &self.signature
    }

    pub fn get(&self, label: &str) -> Option<&Point> {
        self.points.get(label)
    }

    /// 按字典序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Point)> {
        self.points.iter().map(|(label, point)| (label.as_str(), point))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.keys().map(String::as_str)
    }

    /// 标签数量
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 全部向量数量
    pub fn total_points(&self) -> usize {
        self.points.values().map(Point::len).sum()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
