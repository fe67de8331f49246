//! 窗口展示, 主要用于调试.
//!
//! # 注意
//!
//! 需要 `plot` feature.

use std::time::Duration;

use image::GrayImage;
use opencv::highgui::{imshow, wait_key};
use opencv::prelude::Mat;

use super::render;
use crate::data::Volume;

const WINDOW_NAME: &str = "conwhat";

/// 表明一个可以在窗口中可视化的对象.
pub trait VolumeDisplay {
    /// 展示对象.
    fn show(&self) -> opencv::Result<()>;

    /// 同 `show()`, 但在之后自动等待一次用户按键输入. 返回按键码.
    fn show_and_wait(&self) -> opencv::Result<i32> {
        self.show()?;
        wait_key(0)
    }

    /// 同 `show()`, 但在之后自动等待给定时间.
    fn show_and_wait_for(&self, d: Duration) -> opencv::Result<i32> {
        self.show()?;
        let ms = d.as_millis().min(i32::MAX as u128) as i32;
        wait_key(ms.max(1))
    }
}

impl VolumeDisplay for GrayImage {
    fn show(&self) -> opencv::Result<()> {
        let (w, h) = self.dimensions();
        let mat = Mat::from_slice_rows_cols(self.as_raw(), h as usize, w as usize)?;
        imshow(WINDOW_NAME, &mat)
    }
}

/// 展示沿 z 轴的最大密度投影.
impl VolumeDisplay for Volume {
    fn show(&self) -> opencv::Result<()> {
        render::to_gray(self.max_projection().view()).show()
    }
}
