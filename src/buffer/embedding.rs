//! 嵌入向量
//!
//! 从频谱左上角 (低频) 取 Eh × Ew 子块，按行优先展平。
//! 行优先顺序是所有距离比较的规范顺序。

use ndarray::s;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingSignature, ProjectionScalar, Representation};
use crate::core::spectral::Spectrum;
use crate::error::ConfigError;

/// 嵌入向量 (带表示标签)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Embedding {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Embedding {
    /// 提取低频子块
    pub fn extract(
        spectrum: &Spectrum,
        embedding_width: usize,
        embedding_height: usize,
    ) -> Result<Self, ConfigError> {
        let (height, width) = spectrum.dim();
        if embedding_width == 0 || embedding_height == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if embedding_width > width || embedding_height > height {
            return Err(ConfigError::EmbeddingTooLarge {
                width,
                height,
                embedding_width,
                embedding_height,
            });
        }

        // 切片视图的 iter() 按逻辑行优先顺序遍历
        let embedding = match spectrum {
            Spectrum::Real(grid) => Self::Real(
                grid.slice(s![..embedding_height, ..embedding_width])
                    .iter()
                    .copied()
                    .collect(),
            ),
            Spectrum::Complex(grid) => Self::Complex(
                grid.slice(s![..embedding_height, ..embedding_width])
                    .iter()
                    .copied()
                    .collect(),
            ),
        };
        Ok(embedding)
    }

    pub fn representation(&self) -> Representation {
        match self {
            Self::Real(_) => Representation::Real,
            Self::Complex(_) => Representation::Complex,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Real(values) => values.len(),
            Self::Complex(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 距离标量: 实数取原值，复数取幅值 (丢弃相位)
    pub fn distance_scalars(&self) -> Vec<f64> {
        match self {
            Self::Real(values) => values.clone(),
            Self::Complex(values) => values.iter().map(|c| c.norm()).collect(),
        }
    }

    /// 投影标量
    pub fn projection_scalars(&self, scalar: ProjectionScalar) -> Result<Vec<f64>, ConfigError> {
        match (self, scalar) {
            (_, ProjectionScalar::Magnitude) => Ok(self.distance_scalars()),
            (Self::Complex(values), ProjectionScalar::Phase) => {
                Ok(values.iter().map(|c| c.arg()).collect())
            }
            (Self::Real(_), ProjectionScalar::Phase) => Err(ConfigError::PhaseWithoutComplex),
        }
    }

    /// 检查向量与签名一致
    pub fn check_signature(&self, signature: &EmbeddingSignature) -> Result<(), ConfigError> {
        if self.representation() != signature.representation {
            return Err(ConfigError::RepresentationMismatch {
                expected: signature.representation,
                actual: self.representation(),
            });
        }
        if self.len() != signature.embedding_len() {
            return Err(ConfigError::LengthMismatch {
                expected: signature.embedding_len(),
                actual: self.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self::Real(values)
    }
}

impl From<Vec<Complex64>> for Embedding {
    fn from(values: Vec<Complex64>) -> Self {
        Self::Complex(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn grid(height: usize, width: usize) -> Array2<f64> {
        Array2::from_shape_fn((height, width), |(r, c)| (r * 10 + c) as f64)
    }

    #[test]
    fn test_full_size_is_row_major() {
        let spectrum = Spectrum::Real(grid(3, 3));
        let embedding = Embedding::extract(&spectrum, 3, 3).unwrap();
        assert_eq!(
            embedding,
            Embedding::Real(vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0])
        );
    }

    #[test]
    fn test_corner_block() {
        let spectrum = Spectrum::Real(grid(4, 5));
        let embedding = Embedding::extract(&spectrum, 3, 2).unwrap();
        assert_eq!(embedding, Embedding::Real(vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]));
    }

    #[test]
    fn test_too_large() {
        let spectrum = Spectrum::Real(grid(4, 4));
        assert!(matches!(
            Embedding::extract(&spectrum, 5, 2),
            Err(ConfigError::EmbeddingTooLarge { .. })
        ));
    }

    #[test]
    fn test_complex_scalars() {
        let embedding = Embedding::Complex(vec![Complex64::new(3.0, 4.0), Complex64::new(0.0, 1.0)]);
        assert_eq!(embedding.distance_scalars(), vec![5.0, 1.0]);
        let phases = embedding.projection_scalars(ProjectionScalar::Phase).unwrap();
        assert!((phases[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_real_has_no_phase() {
        let embedding = Embedding::Real(vec![1.0]);
        assert_eq!(
            embedding.projection_scalars(ProjectionScalar::Phase),
            Err(ConfigError::PhaseWithoutComplex)
        );
    }

    #[test]
    fn test_serde_tagged() {
        let embedding = Embedding::Real(vec![1.0, 2.0]);
        let json = serde_json::to_string(&embedding).unwrap();
        assert_eq!(json, r#"{"kind":"real","values":[1.0,2.0]}"#);
    }
}
