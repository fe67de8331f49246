//! 命中探针: 打开若干图谱, 统计一个 ROI 与每个条目之间的命中情况, 并输出耗时报告.
//!
//! ```text
//! hitprobe -a jhu -a hcp -k vol_tract -r roi.nii.gz --csv-dir out/
//! ```

use clap::Parser;
use conwhat::AtlasKind;
use std::path::PathBuf;
use std::process::ExitCode;

mod profile;
mod result;
mod runner;

/// 统计 ROI 与图谱条目之间的命中情况.
#[derive(Parser, Debug)]
#[command(name = "hitprobe")]
#[command(about = "统计 ROI 与图谱条目之间的命中情况")]
pub struct Args {
    /// 图谱名, 可多次给出.
    #[arg(short, long = "atlas", required = true)]
    pub atlases: Vec<String>,

    /// 图谱类型: vol_tract 或 vol_conn. 流线图谱不支持命中统计.
    #[arg(short, long, default_value = "vol_tract", value_parser = parse_vol_kind)]
    pub kind: AtlasKind,

    /// ROI 图像.
    #[arg(short, long)]
    pub roi: PathBuf,

    /// ROI 图像中大于该值的体素属于 ROI.
    #[arg(short, long, default_value_t = 0.0)]
    pub threshold: f32,

    /// 每个图谱的并行线程数. 默认将全部核心平分给各个图谱.
    #[arg(short = 'j', long)]
    pub n_jobs: Option<usize>,

    /// 原样传给统计引擎的运行模式.
    #[arg(long, default_value = "simple")]
    pub run_type: String,

    /// 图谱根目录. 默认为 `$CONWHAT_ATLAS_DIR` 或 `$HOME/.conwhat/atlases`.
    #[arg(long)]
    pub atlas_dir: Option<PathBuf>,

    /// 将每个图谱的命中统计表写入该目录.
    #[arg(long)]
    pub csv_dir: Option<PathBuf>,

    /// 将每个图谱命中最好的条目绘制到该目录.
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,

    /// 报告中列出的条目个数.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// 在窗口中展示每个图谱命中最好的条目.
    #[cfg(feature = "plot")]
    #[arg(long)]
    pub show: bool,
}

/// 只接受体素图谱类型.
fn parse_vol_kind(s: &str) -> Result<AtlasKind, String> {
    let kind: AtlasKind = s.parse()?;
    if kind.is_volumetric() {
        Ok(kind)
    } else {
        Err(format!("`{kind}` 图谱不支持命中统计"))
    }
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .expect("Logger initialization error");

    let args = Args::parse();
    match runner::run(&args) {
        Ok(res) => {
            res.analyze(args.top);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
