//! 条目内的标量图像统计.

use std::path::{Path, PathBuf};

use ndarray::Zip;
use serde::Serialize;

use crate::consts::DEFAULT_MASK_THRESHOLD;
use crate::data::{index_img, shape_mismatch};
use crate::error::{AtlasError, AtlasResult};
use crate::table::EntryResolver;
use crate::EntryIdx;

/// 标量统计参数.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarParams {
    /// 标量图像 (如 FA 图). 只使用其第 0 个体积.
    pub image: PathBuf,

    /// 参与统计的条目.
    pub idxs: Vec<EntryIdx>,

    /// 条目体素值大于该阈值时计入统计.
    pub threshold: f32,
}

impl ScalarParams {
    /// 使用默认阈值.
    pub fn new<P: AsRef<Path>>(image: P, idxs: Vec<EntryIdx>) -> Self {
        Self {
            image: image.as_ref().to_owned(),
            idxs,
            threshold: DEFAULT_MASK_THRESHOLD,
        }
    }

    /// 修改阈值.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// 单个条目内的标量统计. 条目为空时各统计量为 `None`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScalarRecord {
    /// 条目句柄.
    pub idx: EntryIdx,

    /// 条目名.
    pub name: String,

    /// 参与统计的体素个数.
    pub voxels: usize,

    /// 均值.
    pub mean: Option<f64>,

    /// 总体标准差.
    pub std: Option<f64>,

    /// 最小值.
    pub min: Option<f64>,

    /// 最大值.
    pub max: Option<f64>,
}

impl ScalarRecord {
    fn from_values(idx: EntryIdx, name: String, values: &[f64]) -> Self {
        let n = values.len();
        let (mean, std, min, max) = if n == 0 {
            (None, None, None, None)
        } else {
            let mean = values.iter().sum::<f64>() / n as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (Some(mean), Some(var.sqrt()), Some(min), Some(max))
        };
        Self {
            idx,
            name,
            voxels: n,
            mean,
            std,
            min,
            max,
        }
    }
}

/// 标量统计表. 行顺序与 [`ScalarParams::idxs`] 一致.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarStats {
    image: PathBuf,
    records: Vec<ScalarRecord>,
}

impl ScalarStats {
    /// 标量图像路径.
    #[inline]
    pub fn image(&self) -> &Path {
        &self.image
    }

    /// 所有记录.
    #[inline]
    pub fn records(&self) -> &[ScalarRecord] {
        &self.records
    }

    /// 条目 `idx` 的记录.
    pub fn get(&self, idx: EntryIdx) -> Option<&ScalarRecord> {
        self.records.iter().find(|r| r.idx == idx)
    }

    /// 记录条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否没有任何记录.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 在每个条目的掩膜内统计标量图像 `params.image` 的取值.
///
/// 标量图像必须与条目体积形状一致.
pub fn compute_vol_scalar_stats(params: &ScalarParams, entries: EntryResolver) -> AtlasResult<ScalarStats> {
    let scalar = index_img(&params.image, 0)?;
    log::debug!(
        "computing scalar stats of {} over {} entries of `{}`",
        params.image.display(),
        params.idxs.len(),
        entries.atlas_name
    );

    let mut records = Vec::with_capacity(params.idxs.len());
    for &idx in params.idxs.iter() {
        let name = entries
            .vfms
            .get(idx)
            .map(|r| r.name.clone())
            .ok_or_else(|| AtlasError::EntryNotFound {
                atlas: entries.atlas_name.to_owned(),
                idx,
            })?;
        let vol = entries.volume(idx)?;
        if vol.shape() != scalar.shape() {
            return Err(shape_mismatch(vol.shape(), scalar.shape()));
        }
        let mut values = Vec::new();
        Zip::from(vol.data()).and(scalar.data()).for_each(|m, s| {
            if *m > params.threshold {
                values.push(*s as f64);
            }
        });
        records.push(ScalarRecord::from_values(idx, name, &values));
    }
    Ok(ScalarStats {
        image: params.image.clone(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_record() {
        let r = ScalarRecord::from_values(0, "a".into(), &[1.0, 3.0, 2.0, 2.0]);
        assert_eq!(r.voxels, 4);
        assert_eq!(r.mean, Some(2.0));
        assert_eq!(r.min, Some(1.0));
        assert_eq!(r.max, Some(3.0));
        assert!((r.std.unwrap() - 0.5f64.sqrt()).abs() < 1e-12);

        let empty = ScalarRecord::from_values(1, "b".into(), &[]);
        assert_eq!(empty.voxels, 0);
        assert_eq!(empty.mean, None);
    }

    #[test]
    fn test_params() {
        let p = ScalarParams::new("fa.nii", vec![0, 2]).with_threshold(0.5);
        assert_eq!(p.image, PathBuf::from("fa.nii"));
        assert_eq!(p.threshold, 0.5);
    }
}
