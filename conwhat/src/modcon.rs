//! 修改后的连接组.
//!
//! 连接图谱的 `modify_connectome` 把 [`ConnectomeContext`] 交给用户函数,
//! 用其返回的新权重矩阵构建 [`ModifiedConnectome`], 并按名字缓存.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::data::shape_mismatch;
use crate::error::AtlasResult;
use crate::graph::RegionGraph;
use crate::stats::{HitMetric, HitStats, ScalarStats};

/// 修改连接组时可用的只读信息.
#[derive(Copy, Clone, Debug)]
pub struct ConnectomeContext<'a> {
    /// 原始权重矩阵.
    pub weights: ArrayView2<'a, f64>,

    /// 脑区标签.
    pub region_labels: &'a [String],

    /// 脑区邻接图.
    pub graph: &'a RegionGraph,

    /// 已缓存的标量统计. 流线图谱没有该缓存.
    pub scalar_stats: Option<&'a BTreeMap<String, ScalarStats>>,
}

/// 修改后的连接组, 形状与原始权重矩阵相同.
#[derive(Clone, Debug, PartialEq)]
pub struct ModifiedConnectome {
    weights: Array2<f64>,
}

impl ModifiedConnectome {
    /// 以 `f` 的结果创建. 形状变化时返回 `Err(AtlasError::ShapeMismatch)`.
    pub(crate) fn apply<F>(ctx: &ConnectomeContext<'_>, f: F) -> AtlasResult<Self>
    where
        F: FnOnce(&ConnectomeContext<'_>) -> Array2<f64>,
    {
        let weights = f(ctx);
        if weights.dim() != ctx.weights.dim() {
            let ((a, b), (x, y)) = (ctx.weights.dim(), weights.dim());
            return Err(shape_mismatch((a, b, 1), (x, y, 1)));
        }
        Ok(Self { weights })
    }

    /// 权重矩阵.
    #[inline]
    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// 消费自我, 获得权重矩阵.
    #[inline]
    pub fn into_weights(self) -> Array2<f64> {
        self.weights
    }
}

/// 只保留图中有对应命中记录的连接, 并按 `metric` 缩放其权重. 其余位置为 0.
pub fn scale_by_hits(
    hits: &HitStats,
    metric: HitMetric,
) -> impl Fn(&ConnectomeContext<'_>) -> Array2<f64> + '_ {
    move |ctx| {
        let mut out = Array2::zeros(ctx.weights.dim());
        for (i, j, c) in ctx.graph.connections() {
            if let Some(r) = hits.get(c.idx) {
                let w = ctx.weights[(i, j)] * metric.value(r);
                out[(i, j)] = w;
                out[(j, i)] = w;
            }
        }
        out
    }
}

/// 只保留至少命中一个体素的连接, 权重不变. 其余位置为 0.
pub fn mask_by_hits(hits: &HitStats) -> impl Fn(&ConnectomeContext<'_>) -> Array2<f64> + '_ {
    move |ctx| {
        let mut out = Array2::zeros(ctx.weights.dim());
        for (i, j, c) in ctx.graph.connections() {
            if hits.get(c.idx).is_some_and(|r| r.is_hit()) {
                out[(i, j)] = ctx.weights[(i, j)];
                out[(j, i)] = ctx.weights[(j, i)];
            }
        }
        out
    }
}
