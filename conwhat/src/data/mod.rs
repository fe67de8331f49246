//! nii 格式图像体积.

use std::ops::Index;
use std::path::Path;

use ndarray::{Array2, Array3, ArrayView, Axis, Ix3, Zip};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{AtlasError, AtlasResult};
use crate::Idx3d;

mod bbox;
mod roi;

pub use bbox::BBox;
pub use roi::Roi;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 从 4D (或 3D) 图像中取出的单个 3D 体积. 数据以 `f32` 保存, 按 `(x, y, z)` 访问.
#[derive(Debug, Clone)]
pub struct Volume {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl Index<Idx3d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl PartialEq for Volume {
    /// 仅比较体素数据.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Volume {
    /// 根据裸数据直接创建 `Volume`, header 使用默认值并写入形状.
    /// 任一维度超过 nii header 的上限 (`u16::MAX`) 时返回 `Err`.
    ///
    /// # 注意
    ///
    /// 该方法不会记录任何空间信息, 你应仅将其用于实验目的.
    pub fn fake(data: Array3<f32>) -> AtlasResult<Self> {
        let (x, y, z) = data.dim();
        let dim = |n: usize| {
            u16::try_from(n).map_err(|_| {
                AtlasError::Precondition(format!("体积形状 ({x}, {y}, {z}) 超出 nii header 的范围"))
            })
        };
        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, dim(x)?, dim(y)?, dim(z)?, 1, 1, 1, 1];
        header.pixdim = [1.0; 8];
        header.intent_name[..4].copy_from_slice(b"fake");
        Ok(Self { header, data })
    }

    /// nii header. 从 4D 图像取出时, 维度信息已改写为 3D.
    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// 判断该结构是否是由 [`Volume::fake`] 手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 数据形状 `(x, y, z)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 值大于 `threshold` 的体素个数.
    pub fn count_above(&self, threshold: f32) -> usize {
        self.data.iter().filter(|v| **v > threshold).count()
    }

    /// 值大于 `threshold` 的体素组成的掩膜.
    pub fn mask(&self, threshold: f32) -> Array3<bool> {
        self.data.mapv(|v| v > threshold)
    }

    /// 值大于 `threshold` 的体素的包围盒. 若不存在这样的体素, 返回 `None`.
    pub fn bbox(&self, threshold: f32) -> Option<BBox> {
        BBox::from_mask(self.mask(threshold).view())
    }

    /// 沿 z 轴的最大密度投影, 形状为 `(x, y)`.
    pub fn max_projection(&self) -> Array2<f32> {
        self.data
            .fold_axis(Axis(2), f32::NEG_INFINITY, |acc, v| acc.max(*v))
    }

    /// 计算 `self` 和 `other` 中同时大于 `threshold` 的体素个数.
    ///
    /// 形状不一致时返回 `Err`.
    pub fn overlap(&self, other: &Volume, threshold: f32) -> AtlasResult<usize> {
        if self.shape() != other.shape() {
            return Err(shape_mismatch(self.shape(), other.shape()));
        }
        let mut cnt = 0usize;
        Zip::from(&self.data).and(&other.data).for_each(|a, b| {
            if *a > threshold && *b > threshold {
                cnt += 1;
            }
        });
        Ok(cnt)
    }
}

/// 构造形状不一致错误.
pub(crate) fn shape_mismatch((a, b, c): Idx3d, (x, y, z): Idx3d) -> AtlasError {
    AtlasError::ShapeMismatch {
        expected: vec![a, b, c],
        found: vec![x, y, z],
    }
}

/// 打开 nii 文件 `path`, 取出第 `vol_index` 个 3D 体积.
///
/// 3D 图像只有第 0 个体积. 其他维度的图像返回 `Err(AtlasError::ShapeMismatch)`.
pub fn index_img<P: AsRef<Path>>(path: P, vol_index: usize) -> AtlasResult<Volume> {
    let path = path.as_ref();
    let nifti_err = |source| AtlasError::Nifti {
        path: path.to_owned(),
        source,
    };

    let obj = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
    let mut header = Box::new(obj.header().clone());
    let data = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(nifti_err)?;

    let len = match data.ndim() {
        3 => 1,
        4 => data.shape()[3],
        _ => {
            return Err(AtlasError::ShapeMismatch {
                expected: vec![0; 4],
                found: data.shape().to_vec(),
            })
        }
    };
    if vol_index >= len {
        return Err(AtlasError::VolumeOutOfRange {
            path: path.to_owned(),
            index: vol_index,
            len,
        });
    }

    let data = if data.ndim() == 4 {
        data.index_axis_move(Axis(3), vol_index)
    } else {
        data
    };
    let found = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| AtlasError::ShapeMismatch {
            expected: vec![0; 3],
            found,
        })?;

    // 取出后只剩一个体积.
    header.dim[0] = 3;
    header.dim[4] = 1;

    Ok(Volume { header, data })
}

#[cfg(test)]
mod tests {
    use super::Volume;
    use crate::AtlasError;
    use ndarray::Array3;

    fn cube() -> Volume {
        let mut data = Array3::<f32>::zeros((4, 3, 2));
        data[(1, 1, 0)] = 2.0;
        data[(2, 1, 1)] = 5.0;
        data[(3, 2, 1)] = 0.5;
        Volume::fake(data).unwrap()
    }

    #[test]
    fn test_fake_volume() {
        let v = cube();
        assert!(v.is_faked());
        assert_eq!(v.shape(), (4, 3, 2));
        assert_eq!(v.size(), 24);
        assert_eq!(v[(2, 1, 1)], 5.0);
        assert_eq!(v.header().dim[..4], [3u16, 4, 3, 2]);
    }

    #[test]
    fn test_fake_volume_too_large() {
        let n = u16::MAX as usize + 1;
        let err = Volume::fake(Array3::zeros((n, 1, 1))).unwrap_err();
        assert!(matches!(err, AtlasError::Precondition(_)), "{err}");
        assert!(Volume::fake(Array3::zeros((n - 1, 1, 1))).is_ok());
    }

    #[test]
    fn test_mask_and_bbox() {
        let v = cube();
        assert_eq!(v.count_above(0.0), 3);
        assert_eq!(v.count_above(1.0), 2);
        let b = v.bbox(1.0).unwrap();
        assert_eq!((b.xmin, b.xmax), (1, 2));
        assert_eq!((b.ymin, b.ymax), (1, 1));
        assert_eq!((b.zmin, b.zmax), (0, 1));
        assert!(v.bbox(10.0).is_none());
    }

    #[test]
    fn test_max_projection() {
        let p = cube().max_projection();
        assert_eq!(p.dim(), (4, 3));
        assert_eq!(p[(2, 1)], 5.0);
        assert_eq!(p[(0, 0)], 0.0);
    }

    #[test]
    fn test_overlap() {
        let a = cube();
        let mut d = Array3::<f32>::zeros((4, 3, 2));
        d[(1, 1, 0)] = 1.0;
        d[(0, 0, 0)] = 1.0;
        let b = Volume::fake(d).unwrap();
        assert_eq!(a.overlap(&b, 0.0).unwrap(), 1);

        let c = Volume::fake(Array3::zeros((1, 1, 1))).unwrap();
        assert!(a.overlap(&c, 0.0).is_err());
    }
}
