//! 文件映射表与包围盒表.
//!
//! 两种表都以 `idx` 为行句柄, 按 `idx` 升序存储. 同一图谱的映射表与包围盒表必须具有相同的
//! `idx` 集合, 见 [`check_aligned`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::BBox;
use crate::error::LoadError;
use crate::{EntryIdx, RegionId};

mod resolve;

pub use resolve::{resolve_file, EntryResolver};

/// 文件映射表中的一行.
pub trait MappingRow: DeserializeOwned {
    /// 行句柄.
    fn idx(&self) -> EntryIdx;

    /// 条目名. 连接类图谱中形如 `"{roi1}_{roi2}"`.
    fn name(&self) -> &str;

    /// 条目文件路径 (可能是相对于图谱目录的路径).
    fn file(&self) -> &Path;
}

/// 体素图谱文件映射表中的一行.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolMapping {
    /// 行句柄.
    pub idx: EntryIdx,

    /// 条目名.
    #[serde(default)]
    pub name: String,

    /// 4D nii 文件路径.
    pub nii_file: PathBuf,

    /// 条目在 4D 文件中的体积索引.
    #[serde(rename = "4dvolind")]
    pub vol_index: usize,
}

impl MappingRow for VolMapping {
    #[inline]
    fn idx(&self) -> EntryIdx {
        self.idx
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn file(&self) -> &Path {
        &self.nii_file
    }
}

/// 流线图谱文件映射表中的一行.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamMapping {
    /// 行句柄.
    pub idx: EntryIdx,

    /// 条目名.
    #[serde(default)]
    pub name: String,

    /// 流线文件路径.
    pub trk_file: PathBuf,
}

impl MappingRow for StreamMapping {
    #[inline]
    fn idx(&self) -> EntryIdx {
        self.idx
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn file(&self) -> &Path {
        &self.trk_file
    }
}

/// 以 `idx` 为键的文件映射表.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingTable<R> {
    rows: BTreeMap<EntryIdx, R>,
}

/// 体素图谱文件映射表 (`vfms`).
pub type VolMappings = MappingTable<VolMapping>;

/// 流线图谱文件映射表 (`sfms`).
pub type StreamMappings = MappingTable<StreamMapping>;

impl<R: MappingRow> MappingTable<R> {
    /// 由若干行创建表. 存在重复 `idx` 时返回 `Err(重复的 idx)`.
    pub fn from_rows<I: IntoIterator<Item = R>>(it: I) -> Result<Self, EntryIdx> {
        let mut rows = BTreeMap::new();
        for row in it {
            let idx = row.idx();
            if rows.insert(idx, row).is_some() {
                return Err(idx);
            }
        }
        Ok(Self { rows })
    }

    /// 读取带表头的 csv 文件.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let rows = read_records::<R>(path)?;
        Self::from_rows(rows).map_err(|idx| LoadError::DuplicateEntry {
            path: path.to_owned(),
            idx,
        })
    }

    /// 获取句柄为 `idx` 的行.
    #[inline]
    pub fn get(&self, idx: EntryIdx) -> Option<&R> {
        self.rows.get(&idx)
    }

    /// 是否存在句柄 `idx`.
    #[inline]
    pub fn contains(&self, idx: EntryIdx) -> bool {
        self.rows.contains_key(&idx)
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 按升序迭代所有句柄.
    #[inline]
    pub fn idxs(&self) -> impl ExactSizeIterator<Item = EntryIdx> + '_ {
        self.rows.keys().copied()
    }

    /// 按句柄升序迭代所有行.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &R> {
        self.rows.values()
    }

    /// 迭代所有名字形如 `"{roi1}_{roi2}"` 的行, 给出 `(idx, (roi1, roi2))`.
    pub fn region_pairs(&self) -> impl Iterator<Item = (EntryIdx, (RegionId, RegionId))> + '_ {
        self.rows
            .values()
            .filter_map(|r| parse_region_pair(r.name()).map(|pair| (r.idx(), pair)))
    }
}

/// 解析形如 `"3_17"` 的连接名.
pub fn parse_region_pair(name: &str) -> Option<(RegionId, RegionId)> {
    let (a, b) = name.trim().split_once('_')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

/// 包围盒表在 csv 文件中的一行.
#[derive(Deserialize)]
struct BBoxRecord {
    idx: EntryIdx,
    xmin: usize,
    xmax: usize,
    ymin: usize,
    ymax: usize,
    zmin: usize,
    zmax: usize,
}

impl From<BBoxRecord> for (EntryIdx, BBox) {
    fn from(r: BBoxRecord) -> Self {
        let bbox = BBox::new((r.xmin, r.ymin, r.zmin), (r.xmax, r.ymax, r.zmax));
        (r.idx, bbox)
    }
}

/// 以 `idx` 为键的包围盒表.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BBoxTable {
    rows: BTreeMap<EntryIdx, BBox>,
}

impl BBoxTable {
    /// 由若干 `(idx, bbox)` 创建表. 存在重复 `idx` 时返回 `Err(重复的 idx)`.
    pub fn from_rows<I: IntoIterator<Item = (EntryIdx, BBox)>>(it: I) -> Result<Self, EntryIdx> {
        let mut rows = BTreeMap::new();
        for (idx, bbox) in it {
            if rows.insert(idx, bbox).is_some() {
                return Err(idx);
            }
        }
        Ok(Self { rows })
    }

    /// 读取带表头 `idx,xmin,xmax,ymin,ymax,zmin,zmax` 的 csv 文件.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let rows = read_records::<BBoxRecord>(path)?;
        Self::from_rows(rows.into_iter().map(Into::into)).map_err(|idx| {
            LoadError::DuplicateEntry {
                path: path.to_owned(),
                idx,
            }
        })
    }

    /// 获取句柄为 `idx` 的包围盒.
    #[inline]
    pub fn get(&self, idx: EntryIdx) -> Option<&BBox> {
        self.rows.get(&idx)
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 按升序迭代所有句柄.
    #[inline]
    pub fn idxs(&self) -> impl ExactSizeIterator<Item = EntryIdx> + '_ {
        self.rows.keys().copied()
    }
}

/// 检查映射表与包围盒表的句柄集合是否一致.
pub fn check_aligned<R: MappingRow>(
    atlas: &str,
    fms: &MappingTable<R>,
    bbox: &BBoxTable,
) -> Result<(), LoadError> {
    if let Some(idx) = fms.idxs().find(|i| bbox.get(*i).is_none()) {
        return Err(LoadError::Misaligned {
            atlas: atlas.to_owned(),
            reason: format!("包围盒表缺少条目 {idx}"),
        });
    }
    if let Some(idx) = bbox.idxs().find(|i| !fms.contains(*i)) {
        return Err(LoadError::Misaligned {
            atlas: atlas.to_owned(),
            reason: format!("包围盒表中的条目 {idx} 不在映射表中"),
        });
    }
    Ok(())
}

/// 读取 csv 文件中的所有记录.
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_owned(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vfm(idx: EntryIdx, name: &str, vol_index: usize) -> VolMapping {
        VolMapping {
            idx,
            name: name.to_string(),
            nii_file: PathBuf::from("conns.nii"),
            vol_index,
        }
    }

    #[test]
    fn test_parse_region_pair() {
        assert_eq!(parse_region_pair("3_17"), Some((3, 17)));
        assert_eq!(parse_region_pair(" 0_2 "), Some((0, 2)));
        assert_eq!(parse_region_pair("cst_left"), None);
        assert_eq!(parse_region_pair("3"), None);
        assert_eq!(parse_region_pair("3_-1"), None);
    }

    #[test]
    fn test_duplicate_idx() {
        let err = VolMappings::from_rows([vfm(0, "0_1", 0), vfm(0, "0_2", 1)]).unwrap_err();
        assert_eq!(err, 0);
    }

    #[test]
    fn test_region_pairs() {
        let t = VolMappings::from_rows([vfm(4, "0_1", 0), vfm(2, "uf", 1), vfm(1, "1_2", 2)])
            .unwrap();
        assert_eq!(t.idxs().collect::<Vec<_>>(), vec![1, 2, 4]);
        let pairs: Vec<_> = t.region_pairs().collect();
        assert_eq!(pairs, vec![(1, (1, 2)), (4, (0, 1))]);
    }

    #[test]
    fn test_check_aligned() {
        let t = VolMappings::from_rows([vfm(0, "a", 0), vfm(1, "b", 1)]).unwrap();
        let b = BBox::new((0, 0, 0), (1, 1, 1));
        let ok = BBoxTable::from_rows([(0, b), (1, b)]).unwrap();
        assert!(check_aligned("toy", &t, &ok).is_ok());

        let missing = BBoxTable::from_rows([(0, b)]).unwrap();
        assert!(matches!(
            check_aligned("toy", &t, &missing),
            Err(LoadError::Misaligned { .. })
        ));

        let extra = BBoxTable::from_rows([(0, b), (1, b), (7, b)]).unwrap();
        assert!(matches!(
            check_aligned("toy", &t, &extra),
            Err(LoadError::Misaligned { .. })
        ));
    }

    #[test]
    fn test_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("vfms.csv");
        std::fs::write(&p, "idx,name,nii_file,4dvolind\n0,0_1,a.nii,0\n1, 1_2 ,a.nii,1\n").unwrap();
        let t = VolMappings::read_csv(&p).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1).unwrap().name, "1_2");
        assert_eq!(t.get(1).unwrap().vol_index, 1);

        let p = dir.path().join("bboxes.csv");
        std::fs::write(&p, "idx,xmin,xmax,ymin,ymax,zmin,zmax\n0,0,1,0,1,0,1\n0,0,1,0,1,0,1\n")
            .unwrap();
        assert!(matches!(
            BBoxTable::read_csv(&p),
            Err(LoadError::DuplicateEntry { idx: 0, .. })
        ));
    }
}
