//! 增量投影
//!
//! 将获胜标签的历史与当前查询拼成 (m+1) × n 矩阵，取前两个主成分，
//! 报告查询行在该基上的二维坐标。基只用一次即丢弃。

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, Axis};
use tracing::debug;

use crate::buffer::embedding::Embedding;
use crate::config::ProjectionScalar;
use crate::error::{ConfigError, ProjectionError};

/// 历史少于该数量时跳过投影
pub const MIN_HISTORY: usize = 3;

const EIGEN_EPSILON: f64 = 1e-12;
const EIGEN_MAX_ITERATIONS: usize = 10_000;
const RELATIVE_RANK_TOLERANCE: f64 = 1e-10;

/// 二维坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

/// 计算查询在历史主成分上的坐标
///
/// 历史不足 [`MIN_HISTORY`] 时返回 `Ok(None)`；
/// 数据退化 (零方差、秩小于 2) 时返回错误，不做近似。
pub fn project(
    history: &[Embedding],
    query: &Embedding,
    scalar: ProjectionScalar,
) -> Result<Option<Coordinate>, ProjectionError> {
    if history.len() < MIN_HISTORY {
        debug!("历史 {} 个向量，跳过投影", history.len());
        return Ok(None);
    }

    let data = build_matrix(history, query, scalar)?;
    let basis = principal_basis(&data)?;

    // 原始 (未中心化) 查询行投影到基上
    let row = data.row(data.nrows() - 1);
    let coordinate = Coordinate {
        x: row.dot(&basis.column(0)),
        y: row.dot(&basis.column(1)),
    };
    Ok(Some(coordinate))
}

fn build_matrix(
    history: &[Embedding],
    query: &Embedding,
    scalar: ProjectionScalar,
) -> Result<Array2<f64>, ProjectionError> {
    let width = query.len();
    let rows = history.len() + 1;
    let mut data = Vec::with_capacity(rows * width);

    for vector in history.iter().chain(std::iter::once(query)) {
        if vector.representation() != query.representation() {
            return Err(ConfigError::RepresentationMismatch {
                expected: query.representation(),
                actual: vector.representation(),
            }
            .into());
        }
        if vector.len() != width {
            return Err(ConfigError::LengthMismatch {
                expected: width,
                actual: vector.len(),
            }
            .into());
        }
        data.extend(vector.projection_scalars(scalar)?);
    }

    if data.iter().any(|v| !v.is_finite()) {
        return Err(ProjectionError::NonFinite);
    }

    Array2::from_shape_vec((rows, width), data).map_err(|_| {
        ProjectionError::Config(ConfigError::LengthMismatch {
            expected: rows * width,
            actual: 0,
        })
    })
}

/// 前两个主成分 (n × 2)，按特征值降序，符号归一化使绝对值最大的载荷为正
fn principal_basis(data: &Array2<f64>) -> Result<Array2<f64>, ProjectionError> {
    let (rows, width) = data.dim();
    let mean = data
        .mean_axis(Axis(0))
        .ok_or(ProjectionError::ZeroVariance)?;
    let centered = data - &mean;
    let covariance = centered.t().dot(&centered) / (rows - 1) as f64;

    let total_variance = covariance.diag().sum();
    if total_variance <= f64::EPSILON {
        return Err(ProjectionError::ZeroVariance);
    }

    let matrix = DMatrix::from_fn(width, width, |i, j| covariance[[i, j]]);
    let eigen = SymmetricEigen::try_new(matrix, EIGEN_EPSILON, EIGEN_MAX_ITERATIONS)
        .ok_or(ProjectionError::Decomposition)?;

    let mut order: Vec<usize> = (0..width).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    if width < 2 {
        return Err(ProjectionError::RankDeficient { second: 0.0 });
    }
    let second = eigen.eigenvalues[order[1]];
    if second <= total_variance * RELATIVE_RANK_TOLERANCE {
        return Err(ProjectionError::RankDeficient { second });
    }

    let mut basis = Array2::zeros((width, 2));
    for (k, &index) in order.iter().take(2).enumerate() {
        let column = eigen.eigenvectors.column(index);
        let pivot = column
            .iter()
            .copied()
            .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for i in 0..width {
            basis[[i, k]] = sign * column[i];
        }
    }

    debug!(
        "主成分: λ1={:.4} λ2={:.4} (总方差 {:.4})",
        eigen.eigenvalues[order[0]], second, total_variance
    );
    Ok(basis)
}
