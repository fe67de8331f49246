//! 探测运行统计.

use conwhat::{HitMetric, HitRecord, HitStats};
use std::time::{Duration, Instant};

/// 探测计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以微秒为单位).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个图谱的探测统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 命中统计花费的时间.
    hit_time: AccTimer,

    /// 从开始探测到结束的总时间. 图谱在探测前已经加载, 不计入其中.
    real_time: AccTimer,

    /// 命中统计结果.
    stats: Option<HitStats>,
}

impl Profile {
    /// 初始化, 同时开始整体计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            hit_time: AccTimer::default(),
            real_time: AccTimer::default(),
            stats: None,
        }
    }

    /// 开始命中统计计时.
    #[inline]
    pub fn hit_start(&mut self) {
        self.hit_time.start();
    }

    /// 结束命中统计计时并记录结果.
    #[inline]
    pub fn hit_finish(&mut self, stats: HitStats) {
        self.hit_time.elapsed();
        self.stats = Some(stats);
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 命中统计结果.
    #[inline]
    pub fn stats(&self) -> Option<&HitStats> {
        self.stats.as_ref()
    }

    /// 探测过的条目个数.
    #[inline]
    pub fn get_probed(&self) -> usize {
        self.stats.as_ref().map_or(0, |s| s.len())
    }

    /// 至少命中一个体素的条目个数.
    #[inline]
    pub fn get_hit(&self) -> usize {
        self.stats
            .as_ref()
            .map_or(0, |s| s.iter().filter(|r| r.is_hit()).count())
    }

    /// 因包围盒不相交而跳过读取的条目个数.
    #[inline]
    pub fn get_skipped(&self) -> usize {
        self.stats
            .as_ref()
            .map_or(0, |s| s.iter().filter(|r| r.entry_voxels.is_none()).count())
    }

    /// 以微秒为单位获得命中统计的总时间.
    #[inline]
    pub fn get_hit_time_us(&self) -> u64 {
        self.hit_time.get_total_us()
    }

    /// 以微秒为单位获得整个任务的总时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得每个实际读取的条目的平均时间.
    #[inline]
    pub fn get_avg_read_time_us(&self) -> Option<f64> {
        match self.get_probed() - self.get_skipped() {
            0 => None,
            n => Some(self.get_hit_time_us() as f64 / n as f64),
        }
    }

    /// Dice 系数最高的 `n` 个命中条目.
    pub fn top(&self, n: usize) -> Vec<&HitRecord> {
        let mut v = self
            .stats
            .as_ref()
            .map(|s| s.ranked_by(HitMetric::Dice))
            .unwrap_or_default();
        v.truncate(n);
        v
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
