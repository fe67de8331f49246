#![warn(missing_docs)]

//! 脑图谱 (atlas) 访问层. 将图谱的文件映射表、包围盒表、连接组
//! 与硬盘上的 nifti 文件组织成强类型的结构.
//!
//! 支持四类图谱:
//!
//! | 类型 | 条目 | 连接组 |
//! |---|---|---|
//! | [`AtlasKind::VolTract`] | 体素纤维束 | 无 |
//! | [`AtlasKind::VolConn`] | 体素连接 | 有 |
//! | [`AtlasKind::StreamTract`] | 流线纤维束 | 无 |
//! | [`AtlasKind::StreamConn`] | 流线连接 | 有 |
//!
//! 所有图谱都通过 [`Atlas::open`] 一次性加载, 加载失败时返回 [`LoadError`],
//! 不会留下半初始化的对象.
//!
//! # 图谱目录
//!
//! 默认加载器 [`DirLoader`] 从 `$CONWHAT_ATLAS_DIR/{atlas_name}`
//! (或 `$HOME/.conwhat/atlases/{atlas_name}`) 读取:
//!
//! 1. `vfms.csv` / `sfms.csv`: 文件映射表;
//! 2. `bboxes.csv` / `stream_bboxes.csv`: 包围盒表, 与映射表按 `idx` 对齐;
//! 3. `weights.txt`, `region_labels.txt` 及若干可选的连接组文件.
//!
//! 详见 [`loader`] 模块.
//!
//! # 注意
//!
//! 该 crate 不解析流线文件 (`.trk`), 流线图谱只提供元数据和连接组.

/// 三维索引, 按 nifti 惯例以 `(x, y, z)` 排列.
pub type Idx3d = (usize, usize, usize);

/// 文件映射表中的行句柄.
pub type EntryIdx = usize;

/// 连接组中的脑区编号, 即其在 `region_labels` 中的位置.
pub type RegionId = usize;

pub mod atlas;
pub mod connectivity;
pub mod consts;
pub mod data;
pub mod error;
pub mod graph;
pub mod loader;
pub mod modcon;
pub mod plot;
pub mod prelude;
pub mod stats;
pub mod table;

pub use atlas::{
    Atlas, AtlasData, AtlasKind, EntryAddress, HitOutcome, StreamAtlas, StreamConnAtlas,
    VolAtlas, VolConnAtlas,
};
pub use connectivity::{Connectivity, Hemisphere};
pub use data::{index_img, BBox, Roi, Volume};
pub use error::{AtlasError, AtlasResult, LoadError};
pub use graph::{Connection, RegionGraph, RegionNode};
pub use loader::{AtlasLoader, DirLoader};
pub use modcon::{ConnectomeContext, ModifiedConnectome};
pub use plot::{AtlasPlotter, ConnectionView, PngPlotter};
pub use stats::{
    HitMetric, HitRecord, HitStats, RunType, ScalarParams, ScalarRecord, ScalarStats,
};
pub use table::{BBoxTable, MappingTable, StreamMapping, StreamMappings, VolMapping, VolMappings};
