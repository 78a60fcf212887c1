//! 最近邻分类
//!
//! 对存储中的每个标签、每个向量计算平方差距离，返回最小者。
//! 标签按字典序、向量按追加顺序扫描，并列时保留先遇到的。

use tracing::debug;

use crate::buffer::embedding::Embedding;
use crate::core::store::PointStore;
use crate::error::ConfigError;

/// 分类结果
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// 获胜标签
    pub label: String,
    /// 最小距离
    pub distance: f64,
    /// 获胜向量在该标签历史中的位置
    pub index: usize,
}

/// 两个嵌入的平方差距离
///
/// 实数取原值，复数取幅值
pub fn distance(p: &Embedding, q: &Embedding) -> Result<f64, ConfigError> {
    if p.representation() != q.representation() {
        return Err(ConfigError::RepresentationMismatch {
            expected: p.representation(),
            actual: q.representation(),
        });
    }
    if p.len() != q.len() {
        return Err(ConfigError::LengthMismatch {
            expected: p.len(),
            actual: q.len(),
        });
    }
    Ok(squared_distance(&p.distance_scalars(), &q.distance_scalars()))
}

fn squared_distance(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

/// 对整个存储分类，空存储返回 None
pub fn classify(store: &PointStore, query: &Embedding) -> Result<Option<Match>, ConfigError> {
    query.check_signature(store.signature())?;

    let query = query.distance_scalars();
    let mut best: Option<Match> = None;

    for (label, point) in store.iter() {
        for (index, vector) in point.points.iter().enumerate() {
            let d = squared_distance(&vector.distance_scalars(), &query);
            let better = match &best {
                Some(current) => d < current.distance,
                None => true,
            };
            if better {
                best = Some(Match {
                    label: label.to_string(),
                    distance: d,
                    index,
                });
            }
        }
    }

    if let Some(m) = &best {
        debug!("最近邻: {} #{} 距离 {:.3}", m.label, m.index, m.distance);
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingSignature, Representation};
    use num_complex::Complex64;

    fn store(len: usize) -> PointStore {
        PointStore::new(EmbeddingSignature {
            width: len,
            height: 1,
            embedding_width: len,
            embedding_height: 1,
            representation: Representation::Real,
        })
    }

    #[test]
    fn test_alice_bob() {
        let mut points = store(4);
        points.learn("alice", vec![1.0, 2.0, 3.0, 4.0].into()).unwrap();
        points.learn("bob", vec![10.0, 20.0, 30.0, 40.0].into()).unwrap();

        let m = classify(&points, &vec![1.0, 2.0, 3.0, 5.0].into()).unwrap().unwrap();
        assert_eq!(m.label, "alice");
        assert_eq!(m.distance, 1.0);
    }

    #[test]
    fn test_empty_store_no_match() {
        let points = store(2);
        assert_eq!(classify(&points, &vec![0.0, 0.0].into()).unwrap(), None);
    }

    #[test]
    fn test_exact_match_zero() {
        let mut points = store(2);
        points.learn("a", vec![7.0, 8.0].into()).unwrap();
        points.learn("a", vec![1.0, 1.0].into()).unwrap();
        let m = classify(&points, &vec![1.0, 1.0].into()).unwrap().unwrap();
        assert_eq!((m.label.as_str(), m.distance, m.index), ("a", 0.0, 1));
    }

    #[test]
    fn test_tie_goes_to_first_label() {
        let mut points = store(1);
        points.learn("zed", vec![2.0].into()).unwrap();
        points.learn("amy", vec![0.0].into()).unwrap();
        let m = classify(&points, &vec![1.0].into()).unwrap().unwrap();
        assert_eq!(m.label, "amy");
    }

    #[test]
    fn test_query_mismatch_fails_fast() {
        let points = store(2);
        assert!(matches!(
            classify(&points, &vec![1.0].into()),
            Err(ConfigError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_complex_uses_magnitude() {
        let a = Embedding::Complex(vec![Complex64::new(3.0, 4.0)]);
        let b = Embedding::Complex(vec![Complex64::new(-5.0, 0.0)]);
        assert_eq!(distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a: Embedding = vec![1.0, -2.0, 3.5].into();
        let b: Embedding = vec![0.5, 4.0, -1.0].into();
        assert_eq!(distance(&a, &b).unwrap(), distance(&b, &a).unwrap());
        assert_eq!(distance(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_cross_representation_rejected() {
        let a: Embedding = vec![1.0].into();
        let b = Embedding::Complex(vec![Complex64::new(1.0, 0.0)]);
        assert!(matches!(
            distance(&a, &b),
            Err(ConfigError::RepresentationMismatch { .. })
        ));
    }
}
