use std::path::Path;

use ndarray::{Array3, ArrayView3};

use super::{index_img, BBox, Volume};
use crate::error::{AtlasError, AtlasResult};
use crate::Idx3d;

/// 感兴趣区域 (region of interest), 以体素掩膜表示.
///
/// 掩膜非空, 且创建时一次性计算包围盒, 供命中统计做快速过滤.
#[derive(Debug, Clone)]
pub struct Roi {
    mask: Array3<bool>,
    bbox: BBox,
    voxels: usize,
}

impl Roi {
    /// 由掩膜创建 ROI. 掩膜为空时返回 `Err(AtlasError::Precondition)`.
    pub fn from_mask(mask: Array3<bool>) -> AtlasResult<Self> {
        let bbox = BBox::from_mask(mask.view())
            .ok_or_else(|| AtlasError::Precondition("ROI 掩膜为空".to_string()))?;
        let voxels = mask.iter().filter(|v| **v).count();
        Ok(Self { mask, bbox, voxels })
    }

    /// 取 `volume` 中值大于 `threshold` 的体素作为 ROI.
    #[inline]
    pub fn from_volume(volume: &Volume, threshold: f32) -> AtlasResult<Self> {
        Self::from_mask(volume.mask(threshold))
    }

    /// 打开 nii 文件, 以第 0 个体积中值大于 `threshold` 的体素作为 ROI.
    pub fn open<P: AsRef<Path>>(path: P, threshold: f32) -> AtlasResult<Self> {
        Self::from_volume(&index_img(path, 0)?, threshold)
    }

    /// 在形状为 `shape` 的空间中, 由 `it` 给出的体素组成 ROI.
    ///
    /// 存在越界索引时返回 `Err(AtlasError::Precondition)`.
    pub fn from_voxels<I: IntoIterator<Item = Idx3d>>(shape: Idx3d, it: I) -> AtlasResult<Self> {
        let mut mask = Array3::from_elem(shape, false);
        for pos in it {
            let slot = mask.get_mut(pos).ok_or_else(|| {
                AtlasError::Precondition(format!("ROI 体素 {pos:?} 超出空间 {shape:?}"))
            })?;
            *slot = true;
        }
        Self::from_mask(mask)
    }

    /// 以 `center` 为中心, 半径不大于 `radius` (单位: 体素) 的球.
    pub fn sphere(shape: Idx3d, center: Idx3d, radius: f64) -> AtlasResult<Self> {
        let r2 = radius.powi(2);
        let (cx, cy, cz) = center;
        let mask = Array3::from_shape_fn(shape, |(x, y, z)| {
            let d2 = x.abs_diff(cx).pow(2) + y.abs_diff(cy).pow(2) + z.abs_diff(cz).pow(2);
            d2 as f64 <= r2
        });
        Self::from_mask(mask)
    }

    /// 掩膜形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.mask.dim()
    }

    /// 掩膜视图.
    #[inline]
    pub fn mask(&self) -> ArrayView3<'_, bool> {
        self.mask.view()
    }

    /// ROI 的包围盒.
    #[inline]
    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    /// ROI 体素个数, 总是大于 0.
    #[inline]
    pub fn voxels(&self) -> usize {
        self.voxels
    }
}

#[cfg(test)]
mod tests {
    use super::Roi;
    use crate::data::BBox;
    use crate::AtlasError;

    #[test]
    fn test_roi_from_voxels() {
        let roi = Roi::from_voxels((3, 3, 3), [(0, 0, 0), (1, 2, 0)]).unwrap();
        assert_eq!(roi.voxels(), 2);
        assert_eq!(roi.bbox(), &BBox::new((0, 0, 0), (1, 2, 0)));

        let err = Roi::from_voxels((3, 3, 3), [(3, 0, 0)]).unwrap_err();
        assert!(matches!(err, AtlasError::Precondition(_)));
    }

    #[test]
    fn test_empty_roi() {
        let err = Roi::from_voxels((2, 2, 2), []).unwrap_err();
        assert!(matches!(err, AtlasError::Precondition(_)));
    }

    #[test]
    fn test_sphere() {
        let roi = Roi::sphere((5, 5, 5), (2, 2, 2), 1.0).unwrap();
        // 中心 + 六个邻居.
        assert_eq!(roi.voxels(), 7);
        assert_eq!(roi.bbox(), &BBox::new((1, 1, 1), (3, 3, 3)));
    }
}
