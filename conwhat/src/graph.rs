//! 脑区邻接图.
//!
//! 节点是脑区, 节点下标即其 [`RegionId`]; 边是映射表中名为 `"{roi1}_{roi2}"` 的条目,
//! 并通过 `idx` 指回映射表.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::connectivity::{Connectivity, Hemisphere};
use crate::data::BBox;
use crate::stats::{HitRecord, HitStats};
use crate::table::{BBoxTable, MappingRow, MappingTable};
use crate::{EntryIdx, RegionId};

/// 脑区节点.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionNode {
    /// 脑区编号.
    pub id: RegionId,

    /// 脑区标签.
    pub label: String,

    /// 所在半球.
    pub hemisphere: Option<Hemisphere>,

    /// 是否为皮层脑区.
    pub cortical: Option<bool>,

    /// 中心坐标 (毫米).
    pub xyz: Option<[f64; 3]>,
}

/// 两个脑区之间的连接.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    /// 对应的映射表句柄.
    pub idx: EntryIdx,

    /// 连接权重.
    pub weight: f64,

    /// 纤维束长度.
    pub tract_length: Option<f64>,

    /// 连接条目的包围盒.
    pub bbox: Option<BBox>,

    /// 命中统计结果. 只在 [`hit_stats_to_graph`] 生成的图中存在.
    pub hit: Option<HitRecord>,
}

/// 脑区邻接图 (无向).
#[derive(Clone, Debug)]
pub struct RegionGraph {
    inner: UnGraph<RegionNode, Connection>,
}

impl RegionGraph {
    /// 访问底层的 petgraph 图.
    #[inline]
    pub fn inner(&self) -> &UnGraph<RegionNode, Connection> {
        &self.inner
    }

    /// 脑区个数.
    #[inline]
    pub fn n_regions(&self) -> usize {
        self.inner.node_count()
    }

    /// 连接个数.
    #[inline]
    pub fn n_connections(&self) -> usize {
        self.inner.edge_count()
    }

    /// 获取脑区节点. 越界时返回 `None`.
    #[inline]
    pub fn region(&self, id: RegionId) -> Option<&RegionNode> {
        self.inner.node_weight(NodeIndex::new(id))
    }

    /// 获取 `roi1` 与 `roi2` 之间的连接. 与参数顺序无关.
    pub fn connection(&self, roi1: RegionId, roi2: RegionId) -> Option<&Connection> {
        if roi1 >= self.n_regions() || roi2 >= self.n_regions() {
            return None;
        }
        let e = self
            .inner
            .find_edge(NodeIndex::new(roi1), NodeIndex::new(roi2))?;
        self.inner.edge_weight(e)
    }

    /// 迭代所有连接, 给出 `(roi1, roi2, 连接)`, 其中 `roi1 < roi2`.
    pub fn connections(&self) -> impl Iterator<Item = (RegionId, RegionId, &Connection)> {
        self.inner.edge_references().map(|e| {
            let (a, b) = (e.source().index(), e.target().index());
            (a.min(b), a.max(b), e.weight())
        })
    }

    /// 与 `id` 直接相连的脑区, 升序排列.
    pub fn neighbours(&self, id: RegionId) -> Vec<RegionId> {
        if id >= self.n_regions() {
            return Vec::new();
        }
        let mut v: Vec<_> = self
            .inner
            .neighbors(NodeIndex::new(id))
            .map(|n| n.index())
            .collect();
        v.sort_unstable();
        v.dedup();
        v
    }
}

/// 由映射表、包围盒表和连接组构建脑区邻接图.
///
/// 映射表中名字形如 `"{roi1}_{roi2}"` 的条目成为一条边. 脑区越界、自环与重复的脑区对会被跳过.
pub fn make_region_graph<R: MappingRow>(
    fms: &MappingTable<R>,
    bbox: &BBoxTable,
    conn: &Connectivity,
) -> RegionGraph {
    let n = conn.n_regions();
    let mut inner = UnGraph::with_capacity(n, fms.len());

    for (id, label) in conn.region_labels.iter().enumerate() {
        inner.add_node(RegionNode {
            id,
            label: label.clone(),
            hemisphere: conn.hemispheres.as_ref().and_then(|h| h.get(id).copied()),
            cortical: conn.cortex.as_ref().and_then(|c| c.get(id).copied()),
            xyz: conn.region_xyz(id).map(|r| [r[0], r[1], r[2]]),
        });
    }

    for (idx, (i, j)) in fms.region_pairs() {
        if i >= n || j >= n || i == j {
            log::warn!("skipping entry {idx}: invalid region pair ({i}, {j}) for {n} regions");
            continue;
        }
        let (a, b) = (NodeIndex::new(i), NodeIndex::new(j));
        if inner.find_edge(a, b).is_some() {
            log::warn!("skipping entry {idx}: region pair ({i}, {j}) already mapped");
            continue;
        }
        inner.add_edge(
            a,
            b,
            Connection {
                idx,
                weight: conn.weight(i, j).unwrap_or_default(),
                tract_length: conn.tract_lengths.as_ref().and_then(|t| t.get((i, j)).copied()),
                bbox: bbox.get(idx).copied(),
                hit: None,
            },
        );
    }

    let unmapped = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .filter(|&(i, j)| conn.weight(i, j).is_some_and(|w| w != 0.0))
        .filter(|&(i, j)| inner.find_edge(NodeIndex::new(i), NodeIndex::new(j)).is_none())
        .count();
    if unmapped > 0 {
        log::warn!("{unmapped} weighted region pairs have no file mapping");
    }
    log::debug!(
        "region graph built: {} nodes, {} edges",
        inner.node_count(),
        inner.edge_count()
    );

    RegionGraph { inner }
}

/// 将命中统计结果投影到邻接图上, 得到一份带有 `hit` 标注的新图.
///
/// 未参与统计的连接 `hit` 为 `None`.
pub fn hit_stats_to_graph(hits: &HitStats, graph: &RegionGraph) -> RegionGraph {
    let mut annotated = graph.clone();
    for c in annotated.inner.edge_weights_mut() {
        c.hit = hits.get(c.idx).cloned();
    }
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{VolMapping, VolMappings};
    use ndarray::array;
    use std::path::PathBuf;

    fn table(names: &[&str]) -> (VolMappings, BBoxTable) {
        let rows = names.iter().enumerate().map(|(idx, n)| VolMapping {
            idx,
            name: n.to_string(),
            nii_file: PathBuf::from("c.nii"),
            vol_index: idx,
        });
        let b = BBox::new((0, 0, 0), (1, 1, 1));
        let bbox = BBoxTable::from_rows((0..names.len()).map(|i| (i, b))).unwrap();
        (VolMappings::from_rows(rows).unwrap(), bbox)
    }

    fn conn() -> Connectivity {
        let w = array![[0.0, 1.0, 2.0], [1.0, 0.0, 0.5], [2.0, 0.5, 0.0]];
        let mut c = Connectivity::new(w, ["a", "b", "c"].map(String::from).to_vec());
        c.hemispheres = Some(vec![Hemisphere::Left, Hemisphere::Left, Hemisphere::Right]);
        c
    }

    #[test]
    fn test_make_region_graph() {
        let (t, b) = table(&["0_1", "1_2", "0_2", "2_0", "0_9", "1_1", "cst"]);
        let g = make_region_graph(&t, &b, &conn());
        assert_eq!(g.n_regions(), 3);
        assert_eq!(g.n_connections(), 3);

        let e = g.connection(2, 0).unwrap();
        assert_eq!(e.idx, 2);
        assert_eq!(e.weight, 2.0);
        assert_eq!(g.connection(0, 2), Some(e));
        assert!(g.connection(0, 9).is_none());
        assert!(g.connection(1, 1).is_none());

        assert_eq!(g.region(2).unwrap().hemisphere, Some(Hemisphere::Right));
        assert_eq!(g.neighbours(0), vec![1, 2]);
        assert!(g.neighbours(7).is_empty());

        let mut pairs: Vec<_> = g.connections().map(|(a, b, c)| (a, b, c.idx)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 1, 0), (0, 2, 2), (1, 2, 1)]);
    }

    #[test]
    fn test_hit_stats_to_graph() {
        let (t, b) = table(&["0_1", "1_2"]);
        let g = make_region_graph(&t, &b, &conn());
        let rec = HitRecord::miss(1, "1_2".to_string(), 10);
        let hits = HitStats::from_records(vec![rec.clone()]);

        let annotated = hit_stats_to_graph(&hits, &g);
        assert_eq!(annotated.connection(1, 2).unwrap().hit, Some(rec));
        assert_eq!(annotated.connection(0, 1).unwrap().hit, None);
        assert_eq!(g.connection(1, 2).unwrap().hit, None);
    }
}
