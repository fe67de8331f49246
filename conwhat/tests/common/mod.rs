//! 在临时目录中搭建 `toy3` 图谱.
//!
//! ```text
//! {root}/toy3/
//!     cnxns.nii           # 4 * 4 * 4 * 3, 第 k 个体积的非零体素值为 k + 1
//!     fa.nii              # 4 * 4 * 4 标量图, 值为 0.1 * (x + y)
//!     region_masks.nii    # 脑区掩膜, 值为 脑区编号 + 1
//!     vfms.csv bboxes.csv sfms.csv stream_bboxes.csv
//!     weights.txt region_labels.txt hemispheres.txt
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use conwhat::{DirLoader, Idx3d};
use ndarray::{Array3, Array4};
use nifti::writer::WriterOptions;
use tempfile::TempDir;

pub const TOY3: &str = "toy3";

/// 每个体积的非零体素.
pub const VOXELS: [&[Idx3d]; 3] = [
    &[(0, 0, 0), (1, 0, 0)],
    &[(3, 3, 3)],
    &[(1, 1, 1), (1, 2, 1)],
];

pub struct Toy {
    pub root: TempDir,
    pub loader: DirLoader,
}

impl Toy {
    pub fn dir(&self, atlas: &str) -> std::path::PathBuf {
        self.root.path().join(atlas)
    }
}

pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

fn write(dir: &Path, file: &str, text: &str) {
    fs::write(dir.join(file), text).unwrap();
}

pub fn write_toy3(dir: &Path) {
    fs::create_dir_all(dir).unwrap();

    let mut cnxns = Array4::<f32>::zeros((4, 4, 4, 3));
    for (k, voxels) in VOXELS.iter().enumerate() {
        for &(x, y, z) in voxels.iter() {
            cnxns[(x, y, z, k)] = (k + 1) as f32;
        }
    }
    WriterOptions::new(dir.join("cnxns.nii"))
        .write_nifti(&cnxns)
        .unwrap();

    let fa = Array3::from_shape_fn((4, 4, 4), |(x, y, _)| 0.1 * (x + y) as f32);
    WriterOptions::new(dir.join("fa.nii")).write_nifti(&fa).unwrap();

    let mut masks = Array3::<f32>::zeros((4, 4, 4));
    masks[(0, 0, 0)] = 1.0;
    masks[(3, 3, 3)] = 2.0;
    masks[(1, 2, 1)] = 3.0;
    WriterOptions::new(dir.join("region_masks.nii"))
        .write_nifti(&masks)
        .unwrap();

    write(
        dir,
        "vfms.csv",
        "idx,name,nii_file,4dvolind\n0,0_1,cnxns.nii,0\n1,1_2,cnxns.nii,1\n2,0_2,cnxns.nii,2\n",
    );
    let bboxes = "idx,xmin,xmax,ymin,ymax,zmin,zmax\n0,0,1,0,0,0,0\n1,3,3,3,3,3,3\n2,1,1,1,2,1,1\n";
    write(dir, "bboxes.csv", bboxes);
    write(
        dir,
        "sfms.csv",
        "idx,name,trk_file\n0,0_1,c01.trk\n1,1_2,c12.trk\n2,0_2,c02.trk\n",
    );
    write(dir, "stream_bboxes.csv", bboxes);
    write(dir, "weights.txt", "0 1 2\n1 0 3\n2 3 0\n");
    write(dir, "region_labels.txt", "lh-a\nrh-b\nlh-c\n");
    write(dir, "hemispheres.txt", "0\n1\n0\n");
}

pub fn toy3() -> Toy {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    write_toy3(&root.path().join(TOY3));
    let loader = DirLoader::new(root.path());
    Toy { root, loader }
}

/// `toy3` 的副本, 对其中的文件做修改.
pub fn toy3_variant(name: &str, edit: impl FnOnce(&Path)) -> Toy {
    let toy = toy3();
    let dir = toy.dir(name);
    write_toy3(&dir);
    edit(&dir);
    toy
}

/// 第 `k` 个体积的期望数据.
pub fn expected_volume(k: usize) -> Array3<f32> {
    let mut a = Array3::zeros((4, 4, 4));
    for &v in VOXELS[k].iter() {
        a[v] = (k + 1) as f32;
    }
    a
}
