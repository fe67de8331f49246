use std::path::{Path, PathBuf};

use crate::data::{index_img, Volume};
use crate::error::{AtlasError, AtlasResult};
use crate::table::VolMappings;
use crate::EntryIdx;

/// 解析条目文件路径.
///
/// 绝对路径按原样使用; 相对路径只相对于 `atlas_dir` 解析, 与进程的当前目录无关.
/// 文件不存在时返回 `Err(原路径与解析后的路径)`, 绝对路径只有一项.
pub fn resolve_file(raw: &Path, atlas_dir: &Path) -> Result<PathBuf, Vec<PathBuf>> {
    if raw.is_absolute() {
        return if raw.is_file() {
            Ok(raw.to_owned())
        } else {
            Err(vec![raw.to_owned()])
        };
    }
    let candidate = atlas_dir.join(raw);
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(vec![raw.to_owned(), candidate])
    }
}

/// 体素图谱条目到 3D 体积的解析器.
///
/// `VolAtlas::get_volume` 和命中/标量统计共用这一套路径解析与报错规则.
#[derive(Copy, Clone, Debug)]
pub struct EntryResolver<'a> {
    /// 图谱名, 仅用于日志和报错.
    pub atlas_name: &'a str,

    /// 图谱目录.
    pub atlas_dir: &'a Path,

    /// 文件映射表.
    pub vfms: &'a VolMappings,
}

impl<'a> EntryResolver<'a> {
    /// 找到条目 `idx` 的实际文件和体积索引.
    pub fn locate(&self, idx: EntryIdx) -> AtlasResult<(PathBuf, usize)> {
        let row = self.vfms.get(idx).ok_or_else(|| AtlasError::EntryNotFound {
            atlas: self.atlas_name.to_owned(),
            idx,
        })?;
        let path =
            resolve_file(&row.nii_file, self.atlas_dir).map_err(|tried| AtlasError::FileNotFound {
                atlas: self.atlas_name.to_owned(),
                idx,
                tried,
            })?;
        Ok((path, row.vol_index))
    }

    /// 读取条目 `idx` 对应的 3D 体积.
    pub fn volume(&self, idx: EntryIdx) -> AtlasResult<Volume> {
        let (path, vol) = self.locate(idx)?;
        log::info!(
            "getting atlas entry {idx}: volume {vol} from image file {}",
            path.display()
        );
        index_img(&path, vol)
    }
}
