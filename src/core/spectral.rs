//! 频谱变换
//!
//! 可分离的二维余弦族变换 `Y = K_h · X · K_wᵀ`:
//! - 实数模式: 正交 DCT-II 核
//! - 复数模式: 半采样平移的傅里叶核，实部即 DCT-II 核，保留相位

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use crate::buffer::embedding::Embedding;
use crate::buffer::frame::FrameSample;
use crate::config::{EmbeddingConfig, Representation};
use crate::error::ConfigError;

/// 频谱系数网格，尺寸与采样相同，(0,0) 为直流项
#[derive(Debug, Clone, PartialEq)]
pub enum Spectrum {
    Real(Array2<f64>),
    Complex(Array2<Complex64>),
}

impl Spectrum {
    pub fn representation(&self) -> Representation {
        match self {
            Self::Real(_) => Representation::Real,
            Self::Complex(_) => Representation::Complex,
        }
    }

    /// (高度, 宽度)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Real(grid) => grid.dim(),
            Self::Complex(grid) => grid.dim(),
        }
    }

    /// 左上角 eh×ew 低频块，按行展开为嵌入
    pub fn embed(&self, embedding_width: usize, embedding_height: usize) -> Result<Embedding, ConfigError> {
        Embedding::extract(self, embedding_width, embedding_height)
    }

    /// 每个系数的相位，实数表示没有相位
    pub fn phases(&self) -> Option<Array2<f64>> {
        match self {
            Self::Real(_) => None,
            Self::Complex(grid) => Some(grid.mapv(|c| c.arg())),
        }
    }
}

enum Kernels {
    Real { rows: Array2<f64>, cols: Array2<f64> },
    Complex { rows: Array2<Complex64>, cols: Array2<Complex64> },
}

/// 频谱变换 (核矩阵在构造时预计算)
pub struct SpectralTransform {
    width: usize,
    height: usize,
    kernels: Kernels,
}

impl SpectralTransform {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_size(config.width, config.height, config.representation))
    }

    /// 直接指定尺寸 (调用方保证非零)
    pub fn with_size(width: usize, height: usize, representation: Representation) -> Self {
        let kernels = match representation {
            Representation::Real => Kernels::Real {
                rows: cosine_kernel(height),
                cols: cosine_kernel(width),
            },
            Representation::Complex => Kernels::Complex {
                rows: shifted_fourier_kernel(height),
                cols: shifted_fourier_kernel(width),
            },
        };
        debug!("频谱变换: {}x{} {:?}", width, height, representation);
        Self { width, height, kernels }
    }

    pub fn representation(&self) -> Representation {
        match self.kernels {
            Kernels::Real { .. } => Representation::Real,
            Kernels::Complex { .. } => Representation::Complex,
        }
    }

    /// 变换一个亮度采样
    pub fn transform(&self, sample: &FrameSample) -> Result<Spectrum, ConfigError> {
        if sample.width() != self.width || sample.height() != self.height {
            return Err(ConfigError::SampleSize {
                width: self.width,
                height: self.height,
                actual_width: sample.width(),
                actual_height: sample.height(),
            });
        }

        let x = sample.values();
        let spectrum = match &self.kernels {
            Kernels::Real { rows, cols } => Spectrum::Real(rows.dot(x).dot(&cols.t())),
            Kernels::Complex { rows, cols } => {
                let x = x.mapv(|v| Complex64::new(v, 0.0));
                Spectrum::Complex(rows.dot(&x).dot(&cols.t()))
            }
        };
        Ok(spectrum)
    }
}

fn scale(k: usize, n: usize) -> f64 {
    if k == 0 {
        (1.0 / n as f64).sqrt()
    } else {
        (2.0 / n as f64).sqrt()
    }
}

/// 正交 DCT-II 核: K[k][j] = a(k)·cos(π(2j+1)k / 2N)
fn cosine_kernel(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(k, j)| {
        let angle = PI * (2 * j + 1) as f64 * k as f64 / (2 * n) as f64;
        scale(k, n) * angle.cos()
    })
}

/// K[k][j] = a(k)·exp(−iπ(2j+1)k / 2N)
fn shifted_fourier_kernel(n: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((n, n), |(k, j)| {
        let angle = PI * (2 * j + 1) as f64 * k as f64 / (2 * n) as f64;
        Complex64::from_polar(scale(k, n), -angle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> FrameSample {
        FrameSample::new(Array2::from_shape_fn((height, width), |(r, c)| {
            (r * 7 + c * 3) as f64 % 11.0
        }))
    }

    #[test]
    fn test_constant_sample_only_dc() {
        let transform = SpectralTransform::with_size(8, 8, Representation::Real);
        let sample = FrameSample::new(Array2::from_elem((8, 8), 10.0));
        let Spectrum::Real(grid) = transform.transform(&sample).unwrap() else {
            panic!("expected real spectrum");
        };
        // 正交 DCT: DC = mean * sqrt(N*M)
        assert!((grid[[0, 0]] - 80.0).abs() < 1e-9);
        for ((r, c), v) in grid.indexed_iter() {
            if (r, c) != (0, 0) {
                assert!(v.abs() < 1e-9, "({r},{c}) = {v}");
            }
        }
    }

    #[test]
    fn test_cosine_kernel_orthonormal() {
        let k = cosine_kernel(6);
        let identity = k.dot(&k.t());
        for ((r, c), v) in identity.indexed_iter() {
            let expected = if r == c { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_complex_real_part_is_dct_in_1d() {
        let real = cosine_kernel(5);
        let complex = shifted_fourier_kernel(5);
        for (a, b) in real.iter().zip(complex.iter()) {
            assert!((a - b.re).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deterministic() {
        let transform = SpectralTransform::with_size(6, 4, Representation::Complex);
        let sample = ramp(6, 4);
        let a = transform.transform(&sample).unwrap();
        let b = transform.transform(&sample).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(), (4, 6));
        assert!(a.phases().is_some());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let transform = SpectralTransform::with_size(24, 24, Representation::Real);
        let sample = ramp(8, 8);
        assert!(matches!(
            transform.transform(&sample),
            Err(ConfigError::SampleSize { .. })
        ));
    }

    #[test]
    fn test_real_has_no_phase() {
        let transform = SpectralTransform::with_size(4, 4, Representation::Real);
        let spectrum = transform.transform(&ramp(4, 4)).unwrap();
        assert_eq!(spectrum.representation(), Representation::Real);
        assert!(spectrum.phases().is_none());
    }

    #[test]
    fn test_embed_low_frequency_block() {
        let transform = SpectralTransform::with_size(6, 4, Representation::Complex);
        let spectrum = transform.transform(&ramp(6, 4)).unwrap();
        let Spectrum::Complex(grid) = &spectrum else {
            panic!("expected complex spectrum");
        };

        let Embedding::Complex(values) = spectrum.embed(3, 2).unwrap() else {
            panic!("expected complex embedding");
        };
        assert_eq!(values.len(), 6);
        assert_eq!(values[4], grid[[1, 1]]);
        assert!(matches!(spectrum.embed(7, 2), Err(ConfigError::EmbeddingTooLarge { .. })));
    }
}
