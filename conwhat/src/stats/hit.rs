//! ROI 与图谱条目之间的命中统计.

use std::collections::BTreeMap;
use std::io::Write;

use ndarray::Zip;
use ordered_float::OrderedFloat;
use serde::Serialize;

use super::RunType;
use crate::consts::DEFAULT_MASK_THRESHOLD;
use crate::data::{shape_mismatch, Roi};
use crate::error::{AtlasError, AtlasResult};
use crate::table::{BBoxTable, EntryResolver};
use crate::EntryIdx;

/// 单个条目的命中结果.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HitRecord {
    /// 条目句柄.
    pub idx: EntryIdx,

    /// 条目名.
    pub name: String,

    /// ROI 体素个数.
    pub roi_voxels: usize,

    /// 条目体素个数. 包围盒不相交而未读取图像时为 `None`.
    pub entry_voxels: Option<usize>,

    /// 同时落在 ROI 和条目内的体素个数.
    pub hits: usize,

    /// `hits / roi_voxels`.
    pub roi_coverage: f64,

    /// `hits / entry_voxels`. 条目为空或未读取时为 0.
    pub entry_coverage: f64,

    /// Dice 系数 `2 * hits / (roi_voxels + entry_voxels)`.
    pub dice: f64,
}

impl HitRecord {
    /// 包围盒不相交, 未读取条目图像.
    pub fn miss(idx: EntryIdx, name: String, roi_voxels: usize) -> Self {
        Self {
            idx,
            name,
            roi_voxels,
            entry_voxels: None,
            hits: 0,
            roi_coverage: 0.0,
            entry_coverage: 0.0,
            dice: 0.0,
        }
    }

    fn from_counts(
        idx: EntryIdx,
        name: String,
        roi_voxels: usize,
        entry_voxels: usize,
        hits: usize,
    ) -> Self {
        let ratio = |a: usize, b: usize| if b == 0 { 0.0 } else { a as f64 / b as f64 };
        Self {
            idx,
            name,
            roi_voxels,
            entry_voxels: Some(entry_voxels),
            hits,
            roi_coverage: ratio(hits, roi_voxels),
            entry_coverage: ratio(hits, entry_voxels),
            dice: ratio(2 * hits, roi_voxels + entry_voxels),
        }
    }

    /// 是否至少有一个体素命中.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.hits > 0
    }
}

/// 用于排序的命中指标.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HitMetric {
    /// 命中体素个数.
    Hits,

    /// ROI 覆盖率.
    RoiCoverage,

    /// 条目覆盖率.
    EntryCoverage,

    /// Dice 系数.
    Dice,
}

impl HitMetric {
    #[inline]
    pub(crate) fn value(&self, r: &HitRecord) -> f64 {
        match self {
            Self::Hits => r.hits as f64,
            Self::RoiCoverage => r.roi_coverage,
            Self::EntryCoverage => r.entry_coverage,
            Self::Dice => r.dice,
        }
    }
}

/// 命中统计表. 行顺序与请求的 `idxs` 一致.
#[derive(Clone, Debug, PartialEq)]
pub struct HitStats {
    records: Vec<HitRecord>,
    positions: BTreeMap<EntryIdx, usize>,
    run_type: RunType,
}

impl HitStats {
    /// 由已有记录创建, `run_type` 取默认值.
    pub fn from_records(records: Vec<HitRecord>) -> Self {
        Self::with_run_type(records, RunType::default())
    }

    fn with_run_type(records: Vec<HitRecord>, run_type: RunType) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.idx, pos))
            .collect();
        Self {
            records,
            positions,
            run_type,
        }
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

    /// 生成该表时使用的运行模式.
    #[inline]
    pub fn run_type(&self) -> &RunType {
        &self.run_type
    }

    /// 条目 `idx` 的记录.
    pub fn get(&self, idx: EntryIdx) -> Option<&HitRecord> {
        self.positions.get(&idx).map(|&p| &self.records[p])
    }

    /// 按请求顺序迭代所有记录.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &HitRecord> {
        self.records.iter()
    }

    /// 所有记录.
    #[inline]
    pub fn records(&self) -> &[HitRecord] {
        &self.records
    }

    /// 按 `metric` 降序排列的命中记录 (不含未命中). 指标相同时保持原顺序.
    pub fn ranked_by(&self, metric: HitMetric) -> Vec<&HitRecord> {
        let mut v: Vec<_> = self.records.iter().filter(|r| r.is_hit()).collect();
        v.sort_by_key(|r| std::cmp::Reverse(OrderedFloat(metric.value(r))));
        v
    }

    /// 以 csv 格式写出. 列与 [`HitRecord`] 的字段一致.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(w);
        for r in self.records.iter() {
            writer.serialize(r)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// 计算单个条目的命中结果.
///
/// 若条目包围盒与 ROI 包围盒不相交, 直接返回 [`HitRecord::miss`], 不读取图像.
fn hit_one(roi: &Roi, entries: EntryResolver, bbox: &BBoxTable, idx: EntryIdx) -> AtlasResult<HitRecord> {
    let row = entries.vfms.get(idx).ok_or_else(|| AtlasError::EntryNotFound {
        atlas: entries.atlas_name.to_owned(),
        idx,
    })?;
    if bbox.get(idx).is_some_and(|b| !b.intersects(roi.bbox())) {
        return Ok(HitRecord::miss(idx, row.name.clone(), roi.voxels()));
    }

    let vol = entries.volume(idx)?;
    if vol.shape() != roi.shape() {
        return Err(shape_mismatch(roi.shape(), vol.shape()));
    }
    let (mut entry_voxels, mut hits) = (0usize, 0usize);
    Zip::from(vol.data()).and(roi.mask()).for_each(|v, m| {
        if *v > DEFAULT_MASK_THRESHOLD {
            entry_voxels += 1;
            if *m {
                hits += 1;
            }
        }
    });
    Ok(HitRecord::from_counts(
        idx,
        row.name.clone(),
        roi.voxels(),
        entry_voxels,
        hits,
    ))
}

fn run_sequential(
    roi: &Roi,
    entries: EntryResolver,
    bbox: &BBoxTable,
    idxs: &[EntryIdx],
) -> AtlasResult<Vec<HitRecord>> {
    idxs.iter().map(|&idx| hit_one(roi, entries, bbox, idx)).collect()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        fn run_all(
            roi: &Roi,
            entries: EntryResolver,
            bbox: &BBoxTable,
            idxs: &[EntryIdx],
            n_jobs: usize,
        ) -> AtlasResult<Vec<HitRecord>> {
            use rayon::prelude::*;

            if n_jobs == 1 {
                return run_sequential(roi, entries, bbox, idxs);
            }
            // `num_threads(0)` 交给 rayon 决定线程数.
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n_jobs).build()?;
            pool.install(|| {
                idxs.par_iter()
                    .map(|&idx| hit_one(roi, entries, bbox, idx))
                    .collect()
            })
        }
    } else {
        fn run_all(
            roi: &Roi,
            entries: EntryResolver,
            bbox: &BBoxTable,
            idxs: &[EntryIdx],
            n_jobs: usize,
        ) -> AtlasResult<Vec<HitRecord>> {
            if n_jobs != 1 {
                log::debug!("`rayon` feature disabled, ignoring n_jobs = {n_jobs}");
            }
            run_sequential(roi, entries, bbox, idxs)
        }
    }
}

/// 计算 `roi` 与条目 `idxs` 之间的命中统计.
///
/// `n_jobs` 为并行线程数, `0` 表示使用全部核心, `1` 表示串行.
/// 无论是否并行, 结果顺序都与 `idxs` 一致. 任一条目出错时整体返回 `Err`.
pub fn compute_vol_hit_stats(
    roi: &Roi,
    entries: EntryResolver,
    bbox: &BBoxTable,
    idxs: &[EntryIdx],
    n_jobs: usize,
    run_type: &RunType,
) -> AtlasResult<HitStats> {
    log::debug!(
        "computing hit stats for `{}`: {} entries, n_jobs = {n_jobs}, run_type = {run_type}",
        entries.atlas_name,
        idxs.len()
    );
    let records = run_all(roi, entries, bbox, idxs, n_jobs)?;
    Ok(HitStats::with_run_type(records, run_type.clone()))
}
