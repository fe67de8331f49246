use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use crate::Idx3d;

/// 体素坐标系中的包围盒. 三个方向都是闭区间.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    /// x 下界.
    pub xmin: usize,
    /// x 上界.
    pub xmax: usize,
    /// y 下界.
    pub ymin: usize,
    /// y 上界.
    pub ymax: usize,
    /// z 下界.
    pub zmin: usize,
    /// z 上界.
    pub zmax: usize,
}

impl BBox {
    /// 由两个对角点创建包围盒. 参数顺序无关.
    pub fn new((x0, y0, z0): Idx3d, (x1, y1, z1): Idx3d) -> Self {
        Self {
            xmin: x0.min(x1),
            xmax: x0.max(x1),
            ymin: y0.min(y1),
            ymax: y0.max(y1),
            zmin: z0.min(z1),
            zmax: z0.max(z1),
        }
    }

    /// 计算掩膜中所有 `true` 体素的包围盒. 掩膜为空时返回 `None`.
    pub fn from_mask(mask: ArrayView3<bool>) -> Option<Self> {
        let mut it = mask.indexed_iter().filter_map(|(pos, &v)| v.then_some(pos));
        let first = it.next()?;
        Some(it.fold(Self::new(first, first), |mut b, (x, y, z)| {
            b.xmin = b.xmin.min(x);
            b.xmax = b.xmax.max(x);
            b.ymin = b.ymin.min(y);
            b.ymax = b.ymax.max(y);
            b.zmin = b.zmin.min(z);
            b.zmax = b.zmax.max(z);
            b
        }))
    }

    /// 两个包围盒是否相交 (共享至少一个体素).
    #[inline]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
            && self.zmin <= other.zmax
            && other.zmin <= self.zmax
    }

    /// 点是否位于包围盒内.
    #[inline]
    pub fn contains(&self, (x, y, z): Idx3d) -> bool {
        (self.xmin..=self.xmax).contains(&x)
            && (self.ymin..=self.ymax).contains(&y)
            && (self.zmin..=self.zmax).contains(&z)
    }

    /// 包围盒覆盖的体素个数.
    #[inline]
    pub fn volume(&self) -> usize {
        (self.xmax - self.xmin + 1) * (self.ymax - self.ymin + 1) * (self.zmax - self.zmin + 1)
    }
}
