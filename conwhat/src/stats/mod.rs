//! 命中统计与标量统计.
//!
//! 两类统计都以 [`EntryResolver`](crate::table::EntryResolver) 读取条目体积,
//! 因此与 `get_volume` 共享同一套路径解析和报错规则.

use std::fmt::{Display, Formatter};

use crate::consts::DEFAULT_RUN_TYPE;

mod hit;
mod scalar;

pub use hit::{compute_vol_hit_stats, HitMetric, HitRecord, HitStats};
pub use scalar::{compute_vol_scalar_stats, ScalarParams, ScalarRecord, ScalarStats};

/// 命中统计的运行模式.
///
/// 该值原样传给统计引擎并记录在结果中, 本 crate 不对其做任何解释. 默认为 `"simple"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunType(String);

impl RunType {
    /// 以任意字符串创建.
    #[inline]
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// 底层字符串.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunType {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_RUN_TYPE)
    }
}

impl From<&str> for RunType {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Display for RunType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
