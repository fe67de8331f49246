use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use super::{store, EntryAddress};
use crate::connectivity::Connectivity;
use crate::consts::DEFAULT_MODCON_NAME;
use crate::data::{index_img, Roi, Volume};
use crate::error::{AtlasError, AtlasResult, LoadError};
use crate::graph::{hit_stats_to_graph, make_region_graph, RegionGraph};
use crate::loader::AtlasLoader;
use crate::modcon::{ConnectomeContext, ModifiedConnectome};
use crate::plot::{AtlasPlotter, ConnectionView};
use crate::stats::{compute_vol_hit_stats, compute_vol_scalar_stats, HitStats, RunType, ScalarParams, ScalarStats};
use crate::table::{check_aligned, BBoxTable, EntryResolver, VolMappings};
use crate::{EntryIdx, RegionId};

/// 体素图谱.
///
/// 条目是 4D nii 图像中的一个 3D 体积. 纤维束图谱直接使用该结构,
/// 连接图谱见 [`VolConnAtlas`].
#[derive(Clone, Debug)]
pub struct VolAtlas {
    name: String,
    atlas_dir: PathBuf,
    vfms: VolMappings,
    bbox: BBoxTable,
    scalar_stats: BTreeMap<String, ScalarStats>,
}

impl VolAtlas {
    /// 通过 `loader` 加载图谱 `name`.
    pub fn open<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        let (vfms, atlas_dir) = loader.load_vol_file_mappings(name)?;
        let bbox = loader.load_vol_bboxes(name)?;
        check_aligned(name, &vfms, &bbox)?;
        log::info!(
            "opened volumetric atlas `{name}` with {} entries from {}",
            vfms.len(),
            atlas_dir.display()
        );
        Ok(Self {
            name: name.to_owned(),
            atlas_dir,
            vfms,
            bbox,
            scalar_stats: BTreeMap::new(),
        })
    }

    /// 图谱名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 图谱目录, 用于解析映射表中的相对路径.
    #[inline]
    pub fn atlas_dir(&self) -> &Path {
        &self.atlas_dir
    }

    /// 文件映射表.
    #[inline]
    pub fn vfms(&self) -> &VolMappings {
        &self.vfms
    }

    /// 包围盒表.
    #[inline]
    pub fn bbox(&self) -> &BBoxTable {
        &self.bbox
    }

    /// 条目解析器.
    #[inline]
    pub fn entries(&self) -> EntryResolver<'_> {
        EntryResolver {
            atlas_name: &self.name,
            atlas_dir: &self.atlas_dir,
            vfms: &self.vfms,
        }
    }

    /// 读取条目 `idx` 的 3D 体积.
    ///
    /// 文件先按原路径查找, 再按 `atlas_dir` 拼接后的路径查找, 都不存在时返回
    /// `Err(AtlasError::FileNotFound)`.
    #[inline]
    pub fn get_volume(&self, idx: EntryIdx) -> AtlasResult<Volume> {
        self.entries().volume(idx)
    }

    /// 计算 `roi` 与条目 `idxs` 的命中统计.
    pub fn compute_hit_stats(
        &self,
        roi: &Roi,
        idxs: &[EntryIdx],
        n_jobs: usize,
        run_type: &RunType,
    ) -> AtlasResult<HitStats> {
        compute_vol_hit_stats(roi, self.entries(), &self.bbox, idxs, n_jobs, run_type)
    }

    /// 计算标量统计, 并以 `name` 缓存. 同名结果会被覆盖.
    pub fn compute_scalar_stats(&mut self, params: &ScalarParams, name: &str) -> AtlasResult<&ScalarStats> {
        let stats = compute_vol_scalar_stats(params, self.entries())?;
        Ok(store(&mut self.scalar_stats, name, stats))
    }

    /// 缓存的标量统计.
    #[inline]
    pub fn scalar_stats(&self, name: &str) -> Option<&ScalarStats> {
        self.scalar_stats.get(name)
    }

    /// 缓存中所有标量统计的名字, 升序排列.
    pub fn scalar_stats_names(&self) -> impl Iterator<Item = &str> {
        self.scalar_stats.keys().map(String::as_str)
    }

    pub(super) fn scalar_stats_cache(&self) -> &BTreeMap<String, ScalarStats> {
        &self.scalar_stats
    }

    /// 绘制纤维束条目 `idx`.
    pub fn plot_tract<P: AtlasPlotter + ?Sized>(&self, idx: EntryIdx, plotter: &mut P) -> AtlasResult<()> {
        let vol = self.get_volume(idx)?;
        plotter.plot_tract(&self.name, idx, &vol)
    }
}

/// 带连接组的体素图谱. 条目是两个脑区之间的连接.
#[derive(Clone, Debug)]
pub struct VolConnAtlas {
    base: VolAtlas,
    conn: Connectivity,
    graph: RegionGraph,
    modcons: BTreeMap<String, ModifiedConnectome>,
}

impl VolConnAtlas {
    /// 通过 `loader` 加载图谱 `name` 及其连接组.
    pub fn open<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        let base = VolAtlas::open(name, loader)?;
        let conn = loader.load_connectivity(name)?;
        let graph = make_region_graph(&base.vfms, &base.bbox, &conn);
        Ok(Self {
            base,
            conn,
            graph,
            modcons: BTreeMap::new(),
        })
    }

    /// 体素图谱部分.
    #[inline]
    pub fn base(&self) -> &VolAtlas {
        &self.base
    }

    /// 体素图谱部分 (可变).
    #[inline]
    pub fn base_mut(&mut self) -> &mut VolAtlas {
        &mut self.base
    }

    /// 连接组.
    #[inline]
    pub fn connectivity(&self) -> &Connectivity {
        &self.conn
    }

    /// 脑区邻接图.
    #[inline]
    pub fn graph(&self) -> &RegionGraph {
        &self.graph
    }

    /// 读取条目 `idx` 的 3D 体积.
    #[inline]
    pub fn get_volume(&self, idx: EntryIdx) -> AtlasResult<Volume> {
        self.base.get_volume(idx)
    }

    /// 脑区 `roi1` 与 `roi2` 之间连接的句柄.
    pub fn edge_idx(&self, roi1: RegionId, roi2: RegionId) -> AtlasResult<EntryIdx> {
        self.graph
            .connection(roi1, roi2)
            .map(|c| c.idx)
            .ok_or_else(|| AtlasError::EdgeNotFound {
                atlas: self.base.name.clone(),
                roi1,
                roi2,
            })
    }

    /// 读取脑区 `roi1` 与 `roi2` 之间连接的 3D 体积.
    ///
    /// 与 `get_volume(edge.idx)` 完全等价.
    pub fn get_volume_for_region_pair(&self, roi1: RegionId, roi2: RegionId) -> AtlasResult<Volume> {
        let idx = self.edge_idx(roi1, roi2)?;
        self.base.get_volume(idx)
    }

    /// 计算命中统计, 同时给出带 `hit` 标注的邻接图副本.
    pub fn compute_hit_stats(
        &self,
        roi: &Roi,
        idxs: &[EntryIdx],
        n_jobs: usize,
        run_type: &RunType,
    ) -> AtlasResult<(HitStats, RegionGraph)> {
        let table = self.base.compute_hit_stats(roi, idxs, n_jobs, run_type)?;
        let graph = hit_stats_to_graph(&table, &self.graph);
        Ok((table, graph))
    }

    /// 以 `f` 修改连接组, 并以 `name` (默认 `"mc1"`) 缓存. 同名结果会被覆盖.
    ///
    /// `f` 返回的矩阵形状必须与原始权重矩阵一致.
    pub fn modify_connectome<F>(&mut self, name: Option<&str>, f: F) -> AtlasResult<&ModifiedConnectome>
    where
        F: FnOnce(&ConnectomeContext<'_>) -> Array2<f64>,
    {
        let ctx = ConnectomeContext {
            weights: self.conn.weights.view(),
            region_labels: &self.conn.region_labels,
            graph: &self.graph,
            scalar_stats: Some(self.base.scalar_stats_cache()),
        };
        let modcon = ModifiedConnectome::apply(&ctx, f)?;
        Ok(store(
            &mut self.modcons,
            name.unwrap_or(DEFAULT_MODCON_NAME),
            modcon,
        ))
    }

    /// 缓存的修改后连接组.
    #[inline]
    pub fn modcon(&self, name: &str) -> Option<&ModifiedConnectome> {
        self.modcons.get(name)
    }

    /// 绘制脑区网络.
    pub fn plot_network<P: AtlasPlotter + ?Sized>(&self, plotter: &mut P) -> AtlasResult<()> {
        plotter.plot_network(&self.base.name, &self.graph)
    }

    /// 绘制连接矩阵.
    pub fn plot_matrix<P: AtlasPlotter + ?Sized>(&self, plotter: &mut P) -> AtlasResult<()> {
        plotter.plot_matrix(&self.base.name, self.conn.weights.view())
    }

    /// 绘制一条连接及其两端脑区.
    ///
    /// 以脑区对寻址且连接组带有脑区掩膜图像时, 两端脑区会叠加在图上.
    pub fn plot_connection_and_regions<P: AtlasPlotter + ?Sized>(
        &self,
        address: EntryAddress,
        plotter: &mut P,
    ) -> AtlasResult<()> {
        let (idx, regions) = match address {
            EntryAddress::RegionPair(roi1, roi2) => (self.edge_idx(roi1, roi2)?, Some((roi1, roi2))),
            EntryAddress::Idx(idx) => (idx, None),
        };
        let volume = self.base.get_volume(idx)?;
        let masks = match (regions, &self.conn.region_nii) {
            (Some(_), Some(p)) => Some(index_img(p, 0)?),
            _ => None,
        };
        let view = ConnectionView {
            idx,
            regions,
            volume: &volume,
            region_masks: masks.as_ref(),
        };
        plotter.plot_connection_and_regions(&self.base.name, &view)
    }
}
