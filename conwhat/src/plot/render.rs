//! 单通道画布上的绘制工具.
//!
//! 体积数据按 `(x, y)` 访问, 绘制时 x 为列, y 为行.

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use crate::consts::gray::{BLACK, WHITE};

/// 画布坐标, 可以越界, 越界的部分不会被绘制.
pub type Point = (i32, i32);

/// 将 `data` 线性拉伸到 `[0, 255]`. 非有限值视为最小值.
pub fn to_gray(data: ArrayView2<f32>) -> GrayImage {
    let (w, h) = data.dim();
    let finite = || data.iter().copied().filter(|v| v.is_finite());
    let lo = finite().fold(f32::INFINITY, f32::min);
    let hi = finite().fold(f32::NEG_INFINITY, f32::max);

    let mut img = GrayImage::new(w as u32, h as u32);
    if hi <= lo {
        return img;
    }
    for ((x, y), &v) in data.indexed_iter() {
        let g = if v.is_finite() {
            ((v - lo) / (hi - lo) * 255.0).round() as u8
        } else {
            BLACK
        };
        img.put_pixel(x as u32, y as u32, Luma([g]));
    }
    img
}

/// 矩阵热图: 每个元素画成 `cell * cell` 的方块, 亮度正比于 `|w| / max|w|`.
/// 第 `i` 行画在第 `i` 行方块上.
pub fn matrix_to_gray(m: ArrayView2<f64>, cell: u32) -> GrayImage {
    let (rows, cols) = m.dim();
    let cell = cell.max(1);
    let peak = m
        .iter()
        .map(|v| v.abs())
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);

    let mut img = GrayImage::new(cols as u32 * cell, rows as u32 * cell);
    if peak == 0.0 {
        return img;
    }
    for ((i, j), &v) in m.indexed_iter() {
        let g = if v.is_finite() {
            (v.abs() / peak * 255.0).round() as u8
        } else {
            BLACK
        };
        let rect = Rect::at((j as u32 * cell) as i32, (i as u32 * cell) as i32).of_size(cell, cell);
        draw_filled_rect_mut(&mut img, rect, Luma([g]));
    }
    img
}

/// 将 `mask` 为真的位置涂成 `color`. 形状不一致时只绘制重叠部分.
pub fn overlay(img: &mut GrayImage, mask: ArrayView2<bool>, color: u8) {
    let (w, h) = img.dimensions();
    for ((x, y), &m) in mask.indexed_iter() {
        if m && (x as u32) < w && (y as u32) < h {
            img.put_pixel(x as u32, y as u32, Luma([color]));
        }
    }
}

/// 沿 z 轴对掩膜做投影.
pub fn project_mask(mask: ArrayView3<bool>) -> Array2<bool> {
    mask.map_axis(Axis(2), |col| col.iter().any(|&b| b))
}

/// 在 `size * size` 的画布上绘制网络. 先画连接 `(i, j, 灰度)`, 再以 `pos` 为圆心画实心节点.
///
/// 端点不在 `pos` 中的连接会被忽略.
pub fn draw_network<I>(size: u32, pos: &[Point], edges: I, node_radius: i32) -> GrayImage
where
    I: IntoIterator<Item = (usize, usize, u8)>,
{
    let mut img = GrayImage::new(size, size);
    let to_f32 = |(x, y): Point| (x as f32, y as f32);
    for (i, j, color) in edges {
        if let (Some(&a), Some(&b)) = (pos.get(i), pos.get(j)) {
            draw_line_segment_mut(&mut img, to_f32(a), to_f32(b), Luma([color]));
        }
    }
    for &p in pos.iter() {
        draw_filled_circle_mut(&mut img, p, node_radius, Luma([WHITE]));
    }
    img
}

/// `n` 个点均匀分布在画布内切圆上, 从正上方开始顺时针排列.
pub fn circle_layout(n: usize, size: u32) -> Vec<Point> {
    let c = size as f64 / 2.0;
    let r = c * 0.9;
    (0..n)
        .map(|i| {
            let t = std::f64::consts::TAU * i as f64 / n.max(1) as f64;
            ((c + r * t.sin()).round() as i32, (c - r * t.cos()).round() as i32)
        })
        .collect()
}

/// 将脑区坐标投影到横断面 (x 向右, y 向上), 并缩放到画布内.
pub fn axial_layout(xyzs: &[[f64; 3]], size: u32) -> Vec<Point> {
    let bound = |k: usize| {
        xyzs.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[k]), hi.max(p[k]))
        })
    };
    let ((x0, x1), (y0, y1)) = (bound(0), bound(1));
    let span = (x1 - x0).max(y1 - y0);
    let margin = size as f64 * 0.05;
    let scale = if span > 0.0 {
        (size as f64 - 2.0 * margin) / span
    } else {
        0.0
    };
    xyzs.iter()
        .map(|p| {
            let x = margin + (p[0] - x0) * scale;
            let y = size as f64 - margin - (p[1] - y0) * scale;
            (x.round() as i32, y.round() as i32)
        })
        .collect()
}
