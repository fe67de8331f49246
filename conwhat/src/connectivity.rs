//! 连接组: 脑区之间的连接权重, 以及可选的几何/表面信息.

use std::path::PathBuf;

use ndarray::{Array2, ArrayView1};

use crate::error::LoadError;
use crate::RegionId;

/// 半球.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Hemisphere {
    /// 左半球, 文件中记为 `0`.
    Left,

    /// 右半球, 文件中记为 `1`.
    Right,
}

impl Hemisphere {
    /// 由文件中的编码创建.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    /// 是否为左半球.
    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, Self::Left)
    }
}

/// 连接组.
///
/// `weights` 与 `region_labels` 必须存在; 其余字段由加载器按需提供, 缺失不是错误.
/// 所有字段都按 `region_labels` 的顺序对齐, 见 [`Connectivity::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Connectivity {
    /// `n * n` 连接强度矩阵.
    pub weights: Array2<f64>,

    /// 长度为 `n` 的脑区标签.
    pub region_labels: Vec<String>,

    /// `n * n` 纤维束长度矩阵.
    pub tract_lengths: Option<Array2<f64>>,

    /// `n * 3` 脑区中心坐标 (毫米).
    pub region_xyzs: Option<Array2<f64>>,

    /// 脑区掩膜图像.
    pub region_nii: Option<PathBuf>,

    /// 长度为 `n` 的皮层标记.
    pub cortex: Option<Vec<bool>>,

    /// 长度为 `n` 的半球标记.
    pub hemispheres: Option<Vec<Hemisphere>>,

    /// fsaverage 左半球每个顶点所属脑区.
    pub region_mapping_fsav_lh: Option<Vec<RegionId>>,

    /// fsaverage 右半球每个顶点所属脑区.
    pub region_mapping_fsav_rh: Option<Vec<RegionId>>,
}

impl Connectivity {
    /// 只包含必需字段的连接组.
    pub fn new(weights: Array2<f64>, region_labels: Vec<String>) -> Self {
        Self {
            weights,
            region_labels,
            tract_lengths: None,
            region_xyzs: None,
            region_nii: None,
            cortex: None,
            hemispheres: None,
            region_mapping_fsav_lh: None,
            region_mapping_fsav_rh: None,
        }
    }

    /// 脑区个数.
    #[inline]
    pub fn n_regions(&self) -> usize {
        self.region_labels.len()
    }

    /// 脑区 `i` 与 `j` 之间的连接权重. 越界时返回 `None`.
    #[inline]
    pub fn weight(&self, i: RegionId, j: RegionId) -> Option<f64> {
        self.weights.get((i, j)).copied()
    }

    /// 脑区 `i` 的中心坐标.
    #[inline]
    pub fn region_xyz(&self, i: RegionId) -> Option<ArrayView1<'_, f64>> {
        let xyzs = self.region_xyzs.as_ref()?;
        (i < xyzs.nrows()).then(|| xyzs.row(i))
    }

    /// 检查各字段是否与 `region_labels` 对齐.
    pub fn validate(&self, atlas: &str) -> Result<(), LoadError> {
        let n = self.n_regions();
        let misaligned = |reason: String| LoadError::Misaligned {
            atlas: atlas.to_owned(),
            reason,
        };

        if self.weights.dim() != (n, n) {
            return Err(misaligned(format!(
                "权重矩阵形状为 {:?}, 但有 {n} 个脑区",
                self.weights.dim()
            )));
        }
        if let Some(t) = &self.tract_lengths {
            if t.dim() != (n, n) {
                return Err(misaligned(format!("纤维束长度矩阵形状为 {:?}", t.dim())));
            }
        }
        if let Some(x) = &self.region_xyzs {
            if x.dim() != (n, 3) {
                return Err(misaligned(format!("脑区坐标形状为 {:?}", x.dim())));
            }
        }
        if let Some(c) = &self.cortex {
            if c.len() != n {
                return Err(misaligned(format!("皮层标记长度为 {}", c.len())));
            }
        }
        if let Some(h) = &self.hemispheres {
            if h.len() != n {
                return Err(misaligned(format!("半球标记长度为 {}", h.len())));
            }
        }
        for (side, mapping) in [
            ("lh", &self.region_mapping_fsav_lh),
            ("rh", &self.region_mapping_fsav_rh),
        ] {
            if let Some(&bad) = mapping.iter().flatten().find(|r| **r >= n) {
                return Err(misaligned(format!(
                    "fsaverage {side} 顶点映射到不存在的脑区 {bad}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Connectivity, Hemisphere};
    use crate::LoadError;
    use ndarray::Array2;

    fn toy() -> Connectivity {
        let labels = ["a", "b", "c"].map(String::from).to_vec();
        Connectivity::new(Array2::ones((3, 3)), labels)
    }

    #[test]
    fn test_validate_ok() {
        let mut c = toy();
        c.hemispheres = Some(vec![Hemisphere::Left, Hemisphere::Right, Hemisphere::Left]);
        c.region_xyzs = Some(Array2::zeros((3, 3)));
        c.region_mapping_fsav_lh = Some(vec![0, 0, 2, 1]);
        assert!(c.validate("toy").is_ok());
        assert_eq!(c.weight(2, 1), Some(1.0));
        assert_eq!(c.weight(3, 1), None);
        assert!(c.region_xyz(2).is_some());
        assert!(c.region_xyz(3).is_none());
    }

    #[test]
    fn test_validate_misaligned() {
        let mut c = toy();
        c.cortex = Some(vec![true, false]);
        assert!(matches!(c.validate("toy"), Err(LoadError::Misaligned { .. })));

        let mut c = toy();
        c.weights = Array2::zeros((3, 2));
        assert!(matches!(c.validate("toy"), Err(LoadError::Misaligned { .. })));

        let mut c = toy();
        c.region_mapping_fsav_rh = Some(vec![0, 3]);
        assert!(matches!(c.validate("toy"), Err(LoadError::Misaligned { .. })));
    }

    #[test]
    fn test_hemisphere_code() {
        assert_eq!(Hemisphere::from_code(0), Some(Hemisphere::Left));
        assert!(Hemisphere::from_code(1).is_some_and(|h| !h.is_left()));
        assert_eq!(Hemisphere::from_code(2), None);
    }
}
