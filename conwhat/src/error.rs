//! 运行时错误.

use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::atlas::AtlasKind;
use crate::{EntryIdx, RegionId};

/// 图谱加载错误. 构造图谱时只会返回这一类错误.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 加载器无法解析图谱名.
    #[error("未知图谱 `{atlas}`: 目录 {} 不存在", .dir.display())]
    UnknownAtlas {
        /// 图谱名.
        atlas: String,
        /// 期望的图谱目录.
        dir: PathBuf,
    },

    /// 底层 I/O 错误.
    #[error("读取 {} 失败: {source}", .path.display())]
    Io {
        /// 出错的文件.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: std::io::Error,
    },

    /// 表格格式错误.
    #[error("解析表格 {} 失败: {source}", .path.display())]
    Csv {
        /// 出错的文件.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: csv::Error,
    },

    /// 文本数值文件格式错误. `line` 从 1 开始计数.
    #[error("解析 {} 第 {line} 行失败: {reason}", .path.display())]
    Parse {
        /// 出错的文件.
        path: PathBuf,
        /// 出错的行.
        line: usize,
        /// 原因.
        reason: String,
    },

    /// 不同元数据之间不对齐 (如包围盒表缺少某个 `idx`, 权重矩阵与标签长度不符).
    #[error("图谱 `{atlas}` 元数据不一致: {reason}")]
    Misaligned {
        /// 图谱名.
        atlas: String,
        /// 原因.
        reason: String,
    },

    /// 表格中 `idx` 重复.
    #[error("表格 {} 中 idx {idx} 重复", .path.display())]
    DuplicateEntry {
        /// 出错的文件.
        path: PathBuf,
        /// 重复的句柄.
        idx: EntryIdx,
    },

    /// 缺少必需的文件.
    #[error("图谱 `{atlas}` 缺少必需文件 `{file}`")]
    MissingField {
        /// 图谱名.
        atlas: String,
        /// 文件名.
        file: &'static str,
    },
}

/// 图谱操作错误.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// 加载错误.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 原始路径和拼接图谱目录后的路径都不存在.
    #[error("图谱 `{atlas}` 条目 {idx} 的文件不存在, 已尝试: {}", .tried.iter().map(|p| p.display()).join(", "))]
    FileNotFound {
        /// 图谱名.
        atlas: String,
        /// 条目句柄.
        idx: EntryIdx,
        /// 按顺序尝试过的路径.
        tried: Vec<PathBuf>,
    },

    /// 文件映射表中没有该句柄.
    #[error("图谱 `{atlas}` 中不存在条目 {idx}")]
    EntryNotFound {
        /// 图谱名.
        atlas: String,
        /// 条目句柄.
        idx: EntryIdx,
    },

    /// 两个脑区之间没有连接.
    #[error("图谱 `{atlas}` 中脑区 {roi1} 与 {roi2} 之间不存在连接")]
    EdgeNotFound {
        /// 图谱名.
        atlas: String,
        /// 第一个脑区.
        roi1: RegionId,
        /// 第二个脑区.
        roi2: RegionId,
    },

    /// 参数缺失或有歧义.
    #[error("参数不满足前置条件: {0}")]
    Precondition(String),

    /// 该类型的图谱不支持此操作.
    #[error("`{kind}` 图谱不支持 `{op}` 操作")]
    UnsupportedOperation {
        /// 操作名.
        op: &'static str,
        /// 图谱类型.
        kind: AtlasKind,
    },

    /// 读取 nifti 文件失败.
    #[error("读取 nifti 文件 {} 失败: {source}", .path.display())]
    Nifti {
        /// 出错的文件.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: nifti::NiftiError,
    },

    /// 4D 图像中没有该体积.
    #[error("{} 只有 {len} 个体积, 无法取第 {index} 个", .path.display())]
    VolumeOutOfRange {
        /// 图像文件.
        path: PathBuf,
        /// 请求的体积索引.
        index: usize,
        /// 实际体积个数.
        len: usize,
    },

    /// 数据形状不一致.
    #[error("形状不一致: 期望 {expected:?}, 实际 {found:?}")]
    ShapeMismatch {
        /// 期望形状.
        expected: Vec<usize>,
        /// 实际形状.
        found: Vec<usize>,
    },

    /// 绘图输出失败.
    #[error("绘图失败: {0}")]
    Plot(#[from] image::ImageError),

    /// 无法创建并行线程池.
    #[cfg(feature = "rayon")]
    #[error("无法创建线程池: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// 图谱操作结果.
pub type AtlasResult<T> = Result<T, AtlasError>;
