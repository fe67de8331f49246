//! 程序运行函数.

use crate::profile::Profile;
use crate::result::ProbeResult;
use crate::Args;
use conwhat::{Atlas, AtlasKind, AtlasResult, EntryIdx, PngPlotter, Roi, RunType};
use std::error::Error;
use std::fs::{self, File};
use std::thread;
use utils::loader;

/// 对单个图谱的全部条目做命中统计.
fn probe(atlas: &Atlas, roi: &Roi, n_jobs: usize, run_type: &RunType) -> AtlasResult<Profile> {
    let mut p = Profile::new();
    let idxs: Vec<EntryIdx> = atlas
        .as_vol()
        .map(|v| v.vfms().idxs().collect())
        .unwrap_or_default();

    p.hit_start();
    let outcome = atlas.compute_hit_stats(roi, &idxs, n_jobs, run_type)?;
    p.hit_finish(outcome.table);
    Ok(p.finish())
}

/// 导出命中统计表和命中最好的条目.
fn export(args: &Args, atlases: &[Atlas], res: &ProbeResult) -> Result<(), Box<dyn Error>> {
    let mut plotter = args.plot_dir.as_ref().map(PngPlotter::new);

    for (atlas, (_, p)) in atlases.iter().zip(res.iter()) {
        let Ok(p) = p else { continue };
        let Some(stats) = p.stats() else { continue };
        if let Some(dir) = &args.csv_dir {
            fs::create_dir_all(dir)?;
            stats.write_csv(File::create(dir.join(format!("{}_hits.csv", atlas.name())))?)?;
        }

        let Some(best) = p.top(1).first().map(|r| r.idx) else {
            log::info!("no entry of `{}` is hit", atlas.name());
            continue;
        };
        if let Some(plotter) = plotter.as_mut() {
            match atlas.kind() {
                AtlasKind::VolConn => {
                    atlas.plot_connection_and_regions(None, None, Some(best), plotter)?
                }
                _ => atlas.plot_tract(best, plotter)?,
            }
        }

        #[cfg(feature = "plot")]
        if args.show {
            use conwhat::prelude::VolumeDisplay;
            atlas.get_volume(best)?.show_and_wait()?;
        }
    }
    Ok(())
}

/// 实际运行.
pub fn run(args: &Args) -> Result<ProbeResult, Box<dyn Error>> {
    let root = loader::atlas_root(args.atlas_dir.as_deref());
    let atlas_loader = loader::atlas_loader(&root);

    // 短路判断
    let atlases = loader::open_all(args.kind, &args.atlases, &atlas_loader)?;
    let roi = Roi::open(&args.roi, args.threshold)?;
    log::info!("ROI {} has {} voxels", args.roi.display(), roi.voxels());

    let n_jobs = args
        .n_jobs
        .unwrap_or_else(|| utils::jobs_per_task(atlases.len()));
    let run_type = RunType::new(args.run_type.as_str());

    println!("Probing {} atlases, {n_jobs} jobs each...", atlases.len());
    let res = thread::scope(|s| {
        let (roi, run_type) = (&roi, &run_type);
        let handles: Vec<_> = atlases
            .iter()
            .map(|a| s.spawn(move || probe(a, roi, n_jobs, run_type)))
            .collect();

        ProbeResult::from_iter(
            atlases.iter().map(|a| a.name().to_owned()).zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    });

    export(args, &atlases, &res)?;
    Ok(res)
}
