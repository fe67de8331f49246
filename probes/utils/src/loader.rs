//! 对 `conwhat::loader` 的更一层封装. 提供更直接的图谱加载器.

use conwhat::loader::atlas_root_from_env_or_home;
use conwhat::{Atlas, AtlasKind, DirLoader, LoadError};
use std::path::{Path, PathBuf};

/// 获取图谱根目录.
///
/// 1. 若给出了 `dir`, 则返回之;
/// 2. 否则, 若环境变量 `$CONWHAT_ATLAS_DIR` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/.conwhat/atlases`.
///
/// # Panics
///
/// 以上方式都无法确定目录时 panic.
pub fn atlas_root(dir: Option<&Path>) -> PathBuf {
    match dir {
        Some(d) => d.to_owned(),
        None => atlas_root_from_env_or_home().expect("无法确定图谱根目录"),
    }
}

/// 获取图谱加载器.
#[inline]
pub fn atlas_loader<P: AsRef<Path>>(root: P) -> DirLoader {
    DirLoader::new(root)
}

/// 依次打开 `names` 中的图谱. 任一图谱加载失败时返回 `Err`.
pub fn open_all<S: AsRef<str>>(
    kind: AtlasKind,
    names: &[S],
    loader: &DirLoader,
) -> Result<Vec<Atlas>, LoadError> {
    names
        .iter()
        .map(|n| Atlas::open(kind, n.as_ref(), loader))
        .collect()
}
