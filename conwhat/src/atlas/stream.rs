use std::collections::BTreeMap;

use ndarray::Array2;

use super::store;
use crate::connectivity::Connectivity;
use crate::consts::DEFAULT_MODCON_NAME;
use crate::error::{AtlasResult, LoadError};
use crate::graph::{make_region_graph, RegionGraph};
use crate::loader::AtlasLoader;
use crate::modcon::{ConnectomeContext, ModifiedConnectome};
use crate::plot::AtlasPlotter;
use crate::table::{check_aligned, BBoxTable, StreamMappings};

/// 流线图谱. 只保存元数据, 不读取流线文件.
#[derive(Clone, Debug)]
pub struct StreamAtlas {
    name: String,
    sfms: StreamMappings,
    bbox: BBoxTable,
}

impl StreamAtlas {
    /// 通过 `loader` 加载图谱 `name`.
    pub fn open<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        let sfms = loader.load_stream_file_mappings(name)?;
        let bbox = loader.load_stream_bboxes(name)?;
        check_aligned(name, &sfms, &bbox)?;
        log::info!("opened streamline atlas `{name}` with {} entries", sfms.len());
        Ok(Self {
            name: name.to_owned(),
            sfms,
            bbox,
        })
    }

    /// 图谱名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 文件映射表.
    #[inline]
    pub fn sfms(&self) -> &StreamMappings {
        &self.sfms
    }

    /// 包围盒表.
    #[inline]
    pub fn bbox(&self) -> &BBoxTable {
        &self.bbox
    }
}

/// 带连接组的流线图谱.
#[derive(Clone, Debug)]
pub struct StreamConnAtlas {
    base: StreamAtlas,
    conn: Connectivity,
    graph: RegionGraph,
    modcons: BTreeMap<String, ModifiedConnectome>,
}

impl StreamConnAtlas {
    /// 通过 `loader` 加载图谱 `name` 及其连接组.
    pub fn open<L: AtlasLoader + ?Sized>(name: &str, loader: &L) -> Result<Self, LoadError> {
        let base = StreamAtlas::open(name, loader)?;
        let conn = loader.load_connectivity(name)?;
        let graph = make_region_graph(&base.sfms, &base.bbox, &conn);
        Ok(Self {
            base,
            conn,
            graph,
            modcons: BTreeMap::new(),
        })
    }

    /// 流线图谱部分.
    #[inline]
    pub fn base(&self) -> &StreamAtlas {
        &self.base
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

    /// 以 `f` 修改连接组, 并以 `name` (默认 `"mc1"`) 缓存. 同名结果会被覆盖.
    pub fn modify_connectome<F>(&mut self, name: Option<&str>, f: F) -> AtlasResult<&ModifiedConnectome>
    where
        F: FnOnce(&ConnectomeContext<'_>) -> Array2<f64>,
    {
        let ctx = ConnectomeContext {
            weights: self.conn.weights.view(),
            region_labels: &self.conn.region_labels,
            graph: &self.graph,
            scalar_stats: None,
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

    /// 绘制全部连接.
    pub fn plot_connections<P: AtlasPlotter + ?Sized>(&self, plotter: &mut P) -> AtlasResult<()> {
        plotter.plot_stream_connections(&self.base.name, &self.graph, &self.base.sfms)
    }
}
