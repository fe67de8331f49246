//! 四类图谱及其统一入口 [`Atlas`].
//!
//! ```no_run
//! use conwhat::prelude::*;
//!
//! let loader = DirLoader::from_env_or_home().expect("无法确定图谱目录");
//! let atlas = Atlas::open(AtlasKind::VolConn, "toy3", &loader)?;
//! let vol = atlas.get_volume_for_region_pair(0, 2)?;
//! assert_eq!(vol, atlas.get_volume(2)?);
//! # Ok::<(), AtlasError>(())
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use ndarray::Array2;

use crate::connectivity::Connectivity;
use crate::data::{Roi, Volume};
use crate::error::{AtlasError, AtlasResult, LoadError};
use crate::graph::RegionGraph;
use crate::loader::AtlasLoader;
use crate::modcon::{ConnectomeContext, ModifiedConnectome};
use crate::plot::AtlasPlotter;
use crate::stats::{HitStats, RunType, ScalarParams, ScalarStats};
use crate::{EntryIdx, RegionId};

mod stream;
mod vol;

pub use stream::{StreamAtlas, StreamConnAtlas};
pub use vol::{VolAtlas, VolConnAtlas};

/// 图谱类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AtlasKind {
    /// 体素纤维束图谱.
    VolTract,

    /// 体素连接图谱.
    VolConn,

    /// 流线纤维束图谱.
    StreamTract,

    /// 流线连接图谱.
    StreamConn,
}

impl AtlasKind {
    /// 全部类型.
    pub const ALL: [AtlasKind; 4] = [
        AtlasKind::VolTract,
        AtlasKind::VolConn,
        AtlasKind::StreamTract,
        AtlasKind::StreamConn,
    ];

    /// 是否为体素图谱?
    #[inline]
    pub const fn is_volumetric(&self) -> bool {
        matches!(self, Self::VolTract | Self::VolConn)
    }

    /// 是否带有连接组?
    #[inline]
    pub const fn has_connectivity(&self) -> bool {
        matches!(self, Self::VolConn | Self::StreamConn)
    }

    /// 类型名, 与 [`FromStr`] 互逆.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VolTract => "vol_tract",
            Self::VolConn => "vol_conn",
            Self::StreamTract => "stream_tract",
            Self::StreamConn => "stream_conn",
        }
    }
}

impl Display for AtlasKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtlasKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("未知图谱类型 `{s}`"))
    }
}

/// 连接条目的寻址方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntryAddress {
    /// 映射表句柄.
    Idx(EntryIdx),

    /// 两个脑区.
    RegionPair(RegionId, RegionId),
}

impl EntryAddress {
    /// 由可选参数确定寻址方式.
    ///
    /// 必须恰好给出 `(roi1, roi2)` 或 `idx` 之一, 否则返回 `Err(AtlasError::Precondition)`.
    pub fn from_parts(
        roi1: Option<RegionId>,
        roi2: Option<RegionId>,
        idx: Option<EntryIdx>,
    ) -> AtlasResult<Self> {
        match (roi1, roi2, idx) {
            (Some(a), Some(b), None) => Ok(Self::RegionPair(a, b)),
            (None, None, Some(i)) => Ok(Self::Idx(i)),
            (None, None, None) => Err(AtlasError::Precondition(
                "需要给出 (roi1, roi2) 或 idx".to_string(),
            )),
            (Some(_), Some(_), Some(_)) => Err(AtlasError::Precondition(
                "(roi1, roi2) 与 idx 只能给出其一".to_string(),
            )),
            _ => Err(AtlasError::Precondition(
                "roi1 与 roi2 必须同时给出".to_string(),
            )),
        }
    }
}

/// 命中统计结果. 连接图谱额外给出带 `hit` 标注的邻接图.
#[derive(Clone, Debug)]
pub struct HitOutcome {
    /// 命中统计表.
    pub table: HitStats,

    /// 带标注的邻接图.
    pub graph: Option<RegionGraph>,
}

/// 四类图谱的数据.
#[derive(Clone, Debug)]
pub enum AtlasData {
    /// 体素纤维束图谱.
    VolTract(VolAtlas),

    /// 体素连接图谱.
    VolConn(VolConnAtlas),

    /// 流线纤维束图谱.
    StreamTract(StreamAtlas),

    /// 流线连接图谱.
    StreamConn(StreamConnAtlas),
}

/// 图谱.
///
/// 只能通过 [`Atlas::open`] 等工厂函数创建, 创建成功即可用. 之后只有命名缓存会改变.
/// 某类图谱不支持的操作返回 `Err(AtlasError::UnsupportedOperation)`.
#[derive(Clone, Debug)]
pub struct Atlas {
    name: String,
    data: AtlasData,
}

impl Atlas {
    /// 通过 `loader` 加载 `kind` 类型的图谱 `name`.
    pub fn open<L: AtlasLoader + ?Sized>(kind: AtlasKind, name: &str, loader: &L) -> Result<Self, LoadError> {
        let data = match kind {
            AtlasKind::VolTract => AtlasData::VolTract(VolAtlas::open(name, loader)?),
            AtlasKind::VolConn => AtlasData::VolConn(VolConnAtlas::open(name, loader)?),
            AtlasKind::StreamTract => AtlasData::StreamTract(StreamAtlas::open(name, loader)?),
            AtlasKind::StreamConn => AtlasData::StreamConn(StreamConnAtlas::open(name, loader)?),
        };
        Ok(Self {
            name: name.to_owned(),
            data,
        })
    }

    /// 加载体素纤维束图谱.
    #[inline]
    pub fn vol_tract<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        Self::open(AtlasKind::VolTract, name, loader)
    }

    /// 加载体素连接图谱.
    #[inline]
    pub fn vol_conn<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        Self::open(AtlasKind::VolConn, name, loader)
    }

    /// 加载流线纤维束图谱.
    #[inline]
    pub fn stream_tract<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        Self::open(AtlasKind::StreamTract, name, loader)
    }

    /// 加载流线连接图谱.
    #[inline]
    pub fn stream_conn<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        Self::open(AtlasKind::StreamConn, name, loader)
    }

    /// 图谱名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 图谱类型.
    pub fn kind(&self) -> AtlasKind {
        match &self.data {
            AtlasData::VolTract(_) => AtlasKind::VolTract,
            AtlasData::VolConn(_) => AtlasKind::VolConn,
            AtlasData::StreamTract(_) => AtlasKind::StreamTract,
            AtlasData::StreamConn(_) => AtlasKind::StreamConn,
        }
    }

    /// 图谱数据.
    #[inline]
    pub fn data(&self) -> &AtlasData {
        &self.data
    }

    /// 体素图谱部分. 对连接图谱给出其基础部分.
    pub fn as_vol(&self) -> Option<&VolAtlas> {
        match &self.data {
            AtlasData::VolTract(a) => Some(a),
            AtlasData::VolConn(c) => Some(c.base()),
            _ => None,
        }
    }

    /// 体素图谱部分 (可变).
    pub fn as_vol_mut(&mut self) -> Option<&mut VolAtlas> {
        match &mut self.data {
            AtlasData::VolTract(a) => Some(a),
            AtlasData::VolConn(c) => Some(c.base_mut()),
            _ => None,
        }
    }

    /// 体素连接图谱.
    pub fn as_vol_conn(&self) -> Option<&VolConnAtlas> {
        match &self.data {
            AtlasData::VolConn(c) => Some(c),
            _ => None,
        }
    }

    /// 体素连接图谱 (可变).
    pub fn as_vol_conn_mut(&mut self) -> Option<&mut VolConnAtlas> {
        match &mut self.data {
            AtlasData::VolConn(c) => Some(c),
            _ => None,
        }
    }

    /// 流线图谱部分. 对连接图谱给出其基础部分.
    pub fn as_stream(&self) -> Option<&StreamAtlas> {
        match &self.data {
            AtlasData::StreamTract(a) => Some(a),
            AtlasData::StreamConn(c) => Some(c.base()),
            _ => None,
        }
    }

    /// 流线连接图谱.
    pub fn as_stream_conn(&self) -> Option<&StreamConnAtlas> {
        match &self.data {
            AtlasData::StreamConn(c) => Some(c),
            _ => None,
        }
    }

    /// 流线连接图谱 (可变).
    pub fn as_stream_conn_mut(&mut self) -> Option<&mut StreamConnAtlas> {
        match &mut self.data {
            AtlasData::StreamConn(c) => Some(c),
            _ => None,
        }
    }

    /// 连接组. 纤维束图谱返回 `None`.
    pub fn connectivity(&self) -> Option<&Connectivity> {
        match &self.data {
            AtlasData::VolConn(c) => Some(c.connectivity()),
            AtlasData::StreamConn(c) => Some(c.connectivity()),
            _ => None,
        }
    }

    /// 脑区邻接图. 纤维束图谱返回 `None`.
    pub fn graph(&self) -> Option<&RegionGraph> {
        match &self.data {
            AtlasData::VolConn(c) => Some(c.graph()),
            AtlasData::StreamConn(c) => Some(c.graph()),
            _ => None,
        }
    }

    /// 条目个数.
    pub fn len(&self) -> usize {
        match &self.data {
            AtlasData::VolTract(a) => a.vfms().len(),
            AtlasData::VolConn(c) => c.base().vfms().len(),
            AtlasData::StreamTract(a) => a.sfms().len(),
            AtlasData::StreamConn(c) => c.base().sfms().len(),
        }
    }

    /// 是否没有任何条目.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn unsupported(&self, op: &'static str) -> AtlasError {
        AtlasError::UnsupportedOperation {
            op,
            kind: self.kind(),
        }
    }

    /// 读取条目 `idx` 的 3D 体积. 仅体素图谱支持.
    pub fn get_volume(&self, idx: EntryIdx) -> AtlasResult<Volume> {
        self.as_vol()
            .ok_or_else(|| self.unsupported("get_volume"))?
            .get_volume(idx)
    }

    /// 读取脑区 `roi1` 与 `roi2` 之间连接的 3D 体积. 仅体素连接图谱支持.
    pub fn get_volume_for_region_pair(&self, roi1: RegionId, roi2: RegionId) -> AtlasResult<Volume> {
        self.as_vol_conn()
            .ok_or_else(|| self.unsupported("get_volume_for_region_pair"))?
            .get_volume_for_region_pair(roi1, roi2)
    }

    /// 计算 `roi` 与条目 `idxs` 的命中统计. 仅体素图谱支持.
    pub fn compute_hit_stats(
        &self,
        roi: &Roi,
        idxs: &[EntryIdx],
        n_jobs: usize,
        run_type: &RunType,
    ) -> AtlasResult<HitOutcome> {
        match &self.data {
            AtlasData::VolTract(a) => Ok(HitOutcome {
                table: a.compute_hit_stats(roi, idxs, n_jobs, run_type)?,
                graph: None,
            }),
            AtlasData::VolConn(c) => {
                let (table, graph) = c.compute_hit_stats(roi, idxs, n_jobs, run_type)?;
                Ok(HitOutcome {
                    table,
                    graph: Some(graph),
                })
            }
            _ => Err(self.unsupported("compute_hit_stats")),
        }
    }

    /// 计算标量统计并以 `name` 缓存. 仅体素图谱支持.
    pub fn compute_scalar_stats(&mut self, params: &ScalarParams, name: &str) -> AtlasResult<&ScalarStats> {
        let err = self.unsupported("compute_scalar_stats");
        self.as_vol_mut()
            .ok_or(err)?
            .compute_scalar_stats(params, name)
    }

    /// 缓存的标量统计.
    pub fn scalar_stats(&self, name: &str) -> Option<&ScalarStats> {
        self.as_vol()?.scalar_stats(name)
    }

    /// 以 `f` 修改连接组并以 `name` (默认 `"mc1"`) 缓存. 仅连接图谱支持.
    pub fn modify_connectome<F>(&mut self, name: Option<&str>, f: F) -> AtlasResult<&ModifiedConnectome>
    where
        F: FnOnce(&ConnectomeContext<'_>) -> Array2<f64>,
    {
        let err = self.unsupported("modify_connectome");
        match &mut self.data {
            AtlasData::VolConn(c) => c.modify_connectome(name, f),
            AtlasData::StreamConn(c) => c.modify_connectome(name, f),
            _ => Err(err),
        }
    }

    /// 缓存的修改后连接组.
    pub fn modcon(&self, name: &str) -> Option<&ModifiedConnectome> {
        match &self.data {
            AtlasData::VolConn(c) => c.modcon(name),
            AtlasData::StreamConn(c) => c.modcon(name),
            _ => None,
        }
    }

    /// 绘制纤维束条目. 仅体素纤维束图谱支持.
    pub fn plot_tract<P: AtlasPlotter + ?Sized>(&self, idx: EntryIdx, plotter: &mut P) -> AtlasResult<()> {
        match &self.data {
            AtlasData::VolTract(a) => a.plot_tract(idx, plotter),
            _ => Err(self.unsupported("plot_tract")),
        }
    }

    /// 绘制脑区网络. 仅连接图谱支持.
    pub fn plot_network<P: AtlasPlotter + ?Sized>(&self, plotter: &mut P) -> AtlasResult<()> {
        match &self.data {
            AtlasData::VolConn(c) => c.plot_network(plotter),
            AtlasData::StreamConn(c) => c.plot_network(plotter),
            _ => Err(self.unsupported("plot_network")),
        }
    }

    /// 绘制连接矩阵. 仅连接图谱支持.
    pub fn plot_matrix<P: AtlasPlotter + ?Sized>(&self, plotter: &mut P) -> AtlasResult<()> {
        match &self.data {
            AtlasData::VolConn(c) => c.plot_matrix(plotter),
            AtlasData::StreamConn(c) => c.plot_matrix(plotter),
            _ => Err(self.unsupported("plot_matrix")),
        }
    }

    /// 绘制一条连接及其两端脑区. 仅体素连接图谱支持.
    ///
    /// 必须恰好给出 `(roi1, roi2)` 或 `idx` 之一, 见 [`EntryAddress::from_parts`].
    pub fn plot_connection_and_regions<P: AtlasPlotter + ?Sized>(
        &self,
        roi1: Option<RegionId>,
        roi2: Option<RegionId>,
        idx: Option<EntryIdx>,
        plotter: &mut P,
    ) -> AtlasResult<()> {
        let atlas = self
            .as_vol_conn()
            .ok_or_else(|| self.unsupported("plot_connection_and_regions"))?;
        let address = EntryAddress::from_parts(roi1, roi2, idx)?;
        atlas.plot_connection_and_regions(address, plotter)
    }

    /// 绘制流线图谱的全部连接. 仅流线连接图谱支持.
    pub fn plot_connections<P: AtlasPlotter + ?Sized>(&self, plotter: &mut P) -> AtlasResult<()> {
        self.as_stream_conn()
            .ok_or_else(|| self.unsupported("plot_connections"))?
            .plot_connections(plotter)
    }
}

/// 以 `name` 存入命名缓存, 同名时覆盖. 返回存入值的引用.
fn store<'a, T>(cache: &'a mut BTreeMap<String, T>, name: &str, value: T) -> &'a T {
    match cache.entry(name.to_owned()) {
        Entry::Occupied(mut e) => {
            log::debug!("overwriting cached result `{name}`");
            e.insert(value);
            e.into_mut()
        }
        Entry::Vacant(e) => e.insert(value),
    }
}
