//! 图谱可视化.
//!
//! 图谱只负责准备数据, 具体的绘制交给 [`AtlasPlotter`]. 默认实现 [`PngPlotter`]
//! 将每张图保存为单通道 PNG 文件.
//!
//! # 注意
//!
//! 窗口展示 ([`VolumeDisplay`]) 需要 `plot` feature.

use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use ndarray::ArrayView2;

use crate::consts::gray::{DARK_GRAY, LIGHT_GRAY, WHITE};
use crate::consts::CANVAS_SIZE;
use crate::data::{shape_mismatch, Volume};
use crate::error::AtlasResult;
use crate::graph::RegionGraph;
use crate::table::StreamMappings;
use crate::{EntryIdx, RegionId};

pub mod render;

cfg_if::cfg_if! {
    if #[cfg(feature = "plot")] {
        mod display;

        pub use display::VolumeDisplay;
    }
}

/// 一条连接及其两端脑区, 交给 [`AtlasPlotter::plot_connection_and_regions`].
#[derive(Copy, Clone, Debug)]
pub struct ConnectionView<'a> {
    /// 连接条目句柄.
    pub idx: EntryIdx,

    /// 两端脑区. 以句柄寻址时为 `None`.
    pub regions: Option<(RegionId, RegionId)>,

    /// 连接条目的体积.
    pub volume: &'a Volume,

    /// 脑区掩膜图像, 体素值为 `脑区编号 + 1`, 背景为 0.
    pub region_masks: Option<&'a Volume>,
}

/// 图谱绘图器.
pub trait AtlasPlotter {
    /// 绘制纤维束条目.
    fn plot_tract(&mut self, atlas: &str, idx: EntryIdx, volume: &Volume) -> AtlasResult<()>;

    /// 绘制脑区网络.
    fn plot_network(&mut self, atlas: &str, graph: &RegionGraph) -> AtlasResult<()>;

    /// 绘制连接矩阵.
    fn plot_matrix(&mut self, atlas: &str, weights: ArrayView2<f64>) -> AtlasResult<()>;

    /// 绘制一条连接和它两端的脑区.
    fn plot_connection_and_regions(&mut self, atlas: &str, view: &ConnectionView<'_>) -> AtlasResult<()>;

    /// 绘制流线图谱的全部连接.
    fn plot_stream_connections(
        &mut self,
        atlas: &str,
        graph: &RegionGraph,
        sfms: &StreamMappings,
    ) -> AtlasResult<()>;
}

/// 将图保存为 `{out_dir}/{atlas}_{kind}.png`.
#[derive(Clone, Debug)]
pub struct PngPlotter {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngPlotter {
    /// 输出到 `out_dir`, 目录不存在时会在第一次绘图时创建.
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_owned(),
            written: Vec::new(),
        }
    }

    /// 输出目录.
    #[inline]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// 已写出的文件, 按写出顺序排列.
    #[inline]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, atlas: &str, kind: &str, img: &GrayImage) -> AtlasResult<()> {
        fs::create_dir_all(&self.out_dir).map_err(image::ImageError::IoError)?;
        let path = self.out_dir.join(format!("{atlas}_{kind}.png"));
        img.save(&path)?;
        log::debug!("saved plot {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

/// 在画布上绘制邻接图. `keep` 决定哪些连接被绘制.
fn draw_graph<F>(graph: &RegionGraph, keep: F) -> GrayImage
where
    F: Fn(EntryIdx) -> bool,
{
    let xyzs: Option<Vec<[f64; 3]>> = (0..graph.n_regions())
        .map(|id| graph.region(id).and_then(|n| n.xyz))
        .collect();
    let pos = match xyzs {
        Some(xyzs) if !xyzs.is_empty() => render::axial_layout(&xyzs, CANVAS_SIZE),
        _ => render::circle_layout(graph.n_regions(), CANVAS_SIZE),
    };

    let peak = graph
        .connections()
        .map(|(_, _, c)| c.weight.abs())
        .fold(0.0, f64::max);
    let edges = graph
        .connections()
        .filter(|(_, _, c)| keep(c.idx))
        .map(|(i, j, c)| {
            let color = if c.hit.as_ref().is_some_and(|h| h.is_hit()) {
                WHITE
            } else if peak > 0.0 {
                let t = c.weight.abs() / peak;
                DARK_GRAY + ((LIGHT_GRAY - DARK_GRAY) as f64 * t).round() as u8
            } else {
                DARK_GRAY
            };
            (i, j, color)
        });
    render::draw_network(CANVAS_SIZE, &pos, edges, 3)
}

impl AtlasPlotter for PngPlotter {
    fn plot_tract(&mut self, atlas: &str, idx: EntryIdx, volume: &Volume) -> AtlasResult<()> {
        let img = render::to_gray(volume.max_projection().view());
        self.save(atlas, &format!("tract_{idx}"), &img)
    }

    fn plot_network(&mut self, atlas: &str, graph: &RegionGraph) -> AtlasResult<()> {
        let img = draw_graph(graph, |_| true);
        self.save(atlas, "network", &img)
    }

    fn plot_matrix(&mut self, atlas: &str, weights: ArrayView2<f64>) -> AtlasResult<()> {
        let n = weights.nrows().max(weights.ncols()).max(1) as u32;
        let img = render::matrix_to_gray(weights, CANVAS_SIZE / n);
        self.save(atlas, "matrix", &img)
    }

    fn plot_connection_and_regions(&mut self, atlas: &str, view: &ConnectionView<'_>) -> AtlasResult<()> {
        let mut img = render::to_gray(view.volume.max_projection().view());
        if let (Some((roi1, roi2)), Some(masks)) = (view.regions, view.region_masks) {
            if masks.shape() != view.volume.shape() {
                return Err(shape_mismatch(view.volume.shape(), masks.shape()));
            }
            for roi in [roi1, roi2] {
                let label = (roi + 1) as f32;
                let region = masks.data().mapv(|v| v.round() == label);
                render::overlay(&mut img, render::project_mask(region.view()).view(), WHITE);
            }
        }
        let kind = match view.regions {
            Some((roi1, roi2)) => format!("cnxn_{roi1}_{roi2}"),
            None => format!("cnxn_{}", view.idx),
        };
        self.save(atlas, &kind, &img)
    }

    fn plot_stream_connections(
        &mut self,
        atlas: &str,
        graph: &RegionGraph,
        sfms: &StreamMappings,
    ) -> AtlasResult<()> {
        let img = draw_graph(graph, |idx| sfms.contains(idx));
        self.save(atlas, "stream_cnxns", &img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_png_plotter() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = PngPlotter::new(dir.path().join("plots"));

        let mut data = Array3::<f32>::zeros((4, 4, 2));
        data[(1, 2, 1)] = 1.0;
        let vol = Volume::fake(data).unwrap();
        p.plot_tract("toy", 3, &vol).unwrap();
        p.plot_matrix("toy", array![[0.0, 1.0], [1.0, 0.0]].view()).unwrap();

        let view = ConnectionView {
            idx: 3,
            regions: None,
            volume: &vol,
            region_masks: None,
        };
        p.plot_connection_and_regions("toy", &view).unwrap();

        let names: Vec<_> = p
            .written()
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["toy_tract_3.png", "toy_matrix.png", "toy_cnxn_3.png"]);
        assert!(p.written().iter().all(|f| f.is_file()));

        let img = image::open(&p.written()[0]).unwrap().into_luma8();
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(1, 2).0, [255]);
    }

    #[test]
    fn test_region_masks_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = PngPlotter::new(dir.path());
        let vol = Volume::fake(Array3::zeros((2, 2, 2))).unwrap();
        let masks = Volume::fake(Array3::zeros((3, 2, 2))).unwrap();
        let view = ConnectionView {
            idx: 0,
            regions: Some((0, 1)),
            volume: &vol,
            region_masks: Some(&masks),
        };
        assert!(p.plot_connection_and_regions("toy", &view).is_err());
        assert!(p.written().is_empty());
    }
}
