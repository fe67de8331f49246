//! 探针程序依赖的通用组件.

use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 在不超过核心数的前提下, 将核心平均分给 `tasks` 个并行任务. 每个任务至少一个核心.
pub fn jobs_per_task(tasks: usize) -> usize {
    (cpus() / tasks.max(1)).max(1)
}
