//! 图谱元数据加载.
//!
//! [`AtlasLoader`] 定义了构造图谱所需的全部加载操作; [`DirLoader`] 是基于目录的默认实现.
//!
//! # 目录结构
//!
//! ```text
//! {root}/{atlas_name}/
//!     vfms.csv              # 体素图谱: idx,name,nii_file,4dvolind
//!     bboxes.csv            # 体素图谱: idx,xmin,xmax,ymin,ymax,zmin,zmax
//!     sfms.csv              # 流线图谱: idx,name,trk_file
//!     stream_bboxes.csv     # 流线图谱: 同 bboxes.csv
//!     weights.txt           # 连接图谱 (必需)
//!     region_labels.txt     # 连接图谱 (必需)
//!     tract_lengths.txt     # 以下均可选
//!     region_xyzs.txt
//!     region_masks.nii.gz
//!     cortical.txt
//!     hemispheres.txt
//!     region_mapping_fsav_lh.txt
//!     region_mapping_fsav_rh.txt
//! ```

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::connectivity::{Connectivity, Hemisphere};
use crate::consts::{files, ATLAS_DIR_ENV};
use crate::error::LoadError;
use crate::table::{BBoxTable, StreamMappings, VolMappings};

pub mod text;

/// 图谱元数据加载器.
///
/// 所有方法在图谱名无法解析时返回 `Err(LoadError::UnknownAtlas)`.
pub trait AtlasLoader {
    /// 加载体素图谱文件映射表, 同时给出图谱目录 (用于解析相对路径).
    fn load_vol_file_mappings(&self, atlas_name: &str) -> Result<(VolMappings, PathBuf), LoadError>;

    /// 加载体素图谱包围盒表.
    fn load_vol_bboxes(&self, atlas_name: &str) -> Result<BBoxTable, LoadError>;

    /// 加载流线图谱文件映射表.
    fn load_stream_file_mappings(&self, atlas_name: &str) -> Result<StreamMappings, LoadError>;

    /// 加载流线图谱包围盒表.
    fn load_stream_bboxes(&self, atlas_name: &str) -> Result<BBoxTable, LoadError>;

    /// 加载连接组.
    fn load_connectivity(&self, atlas_name: &str) -> Result<Connectivity, LoadError>;
}

/// 获取 `{用户主目录}/.conwhat/atlases` 目录.
pub fn home_atlas_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push(".conwhat");
    ans.push("atlases");
    Some(ans)
}

/// 获取图谱根目录.
///
/// 1. 若环境变量 `$CONWHAT_ATLAS_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/.conwhat/atlases`.
pub fn atlas_root_from_env_or_home() -> Option<PathBuf> {
    match env::var(ATLAS_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_atlas_dir(),
    }
}

/// 从 `{root}/{atlas_name}` 目录加载图谱.
#[derive(Clone, Debug)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    /// 以 `root` 为图谱根目录.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    /// 以 `$CONWHAT_ATLAS_DIR` 或 `$HOME/.conwhat/atlases` 为图谱根目录.
    ///
    /// 两者都无法确定时返回 `None`.
    pub fn from_env_or_home() -> Option<Self> {
        atlas_root_from_env_or_home().map(Self::new)
    }

    /// 图谱根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 图谱 `atlas_name` 的目录.
    ///
    /// 图谱名必须是单个普通路径分量 (不能为空, 不能含分隔符或 `..`), 且目录存在.
    pub fn atlas_dir(&self, atlas_name: &str) -> Result<PathBuf, LoadError> {
        let dir = self.root.join(atlas_name);
        let mut comps = Path::new(atlas_name).components();
        let simple = matches!(
            (comps.next(), comps.next()),
            (Some(Component::Normal(_)), None)
        );
        if !simple || !dir.is_dir() {
            return Err(LoadError::UnknownAtlas {
                atlas: atlas_name.to_owned(),
                dir,
            });
        }
        Ok(dir)
    }

    /// 图谱目录下的必需文件.
    fn required(&self, atlas_name: &str, file: &'static str) -> Result<PathBuf, LoadError> {
        let p = self.atlas_dir(atlas_name)?.join(file);
        if p.is_file() {
            Ok(p)
        } else {
            Err(LoadError::MissingField {
                atlas: atlas_name.to_owned(),
                file,
            })
        }
    }
}

/// 目录下的可选文件.
#[inline]
fn optional(dir: &Path, file: &str) -> Option<PathBuf> {
    let p = dir.join(file);
    p.is_file().then_some(p)
}

impl AtlasLoader for DirLoader {
    fn load_vol_file_mappings(&self, atlas_name: &str) -> Result<(VolMappings, PathBuf), LoadError> {
        let path = self.required(atlas_name, files::VOL_FILE_MAPPINGS)?;
        let vfms = VolMappings::read_csv(&path)?;
        log::debug!("loaded {} vfms rows for `{atlas_name}`", vfms.len());
        Ok((vfms, self.atlas_dir(atlas_name)?))
    }

    fn load_vol_bboxes(&self, atlas_name: &str) -> Result<BBoxTable, LoadError> {
        BBoxTable::read_csv(self.required(atlas_name, files::VOL_BBOXES)?)
    }

    fn load_stream_file_mappings(&self, atlas_name: &str) -> Result<StreamMappings, LoadError> {
        let path = self.required(atlas_name, files::STREAM_FILE_MAPPINGS)?;
        let sfms = StreamMappings::read_csv(&path)?;
        log::debug!("loaded {} sfms rows for `{atlas_name}`", sfms.len());
        Ok(sfms)
    }

    fn load_stream_bboxes(&self, atlas_name: &str) -> Result<BBoxTable, LoadError> {
        BBoxTable::read_csv(self.required(atlas_name, files::STREAM_BBOXES)?)
    }

    fn load_connectivity(&self, atlas_name: &str) -> Result<Connectivity, LoadError> {
        let dir = self.atlas_dir(atlas_name)?;
        let weights = text::read_matrix(&self.required(atlas_name, files::WEIGHTS)?)?;
        let labels = text::read_labels(&self.required(atlas_name, files::REGION_LABELS)?)?;
        let mut conn = Connectivity::new(weights, labels);

        let matrix = |file: &str| optional(&dir, file).map(|p| text::read_matrix(&p)).transpose();
        conn.tract_lengths = matrix(files::TRACT_LENGTHS)?;
        conn.region_xyzs = matrix(files::REGION_XYZS)?;
        conn.region_nii = files::REGION_NII.iter().find_map(|f| optional(&dir, f));

        conn.cortex = optional(&dir, files::CORTEX)
            .map(|p| text::read_column::<u8>(&p))
            .transpose()?
            .map(|v| v.into_iter().map(|c| c != 0).collect());

        if let Some(p) = optional(&dir, files::HEMISPHERES) {
            let codes = text::read_column::<u8>(&p)?;
            let hs = codes
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    Hemisphere::from_code(*c).ok_or_else(|| LoadError::Parse {
                        path: p.clone(),
                        line: i + 1,
                        reason: format!("未知半球编码 {c}"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            conn.hemispheres = Some(hs);
        }

        let mapping = |file: &str| {
            optional(&dir, file)
                .map(|p| text::read_column::<usize>(&p))
                .transpose()
        };
        conn.region_mapping_fsav_lh = mapping(files::REGION_MAPPING_FSAV_LH)?;
        conn.region_mapping_fsav_rh = mapping(files::REGION_MAPPING_FSAV_RH)?;

        conn.validate(atlas_name)?;
        log::debug!(
            "loaded connectivity for `{atlas_name}`: {} regions",
            conn.n_regions()
        );
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::{AtlasLoader, DirLoader};
    use crate::LoadError;
    use std::fs;

    #[test]
    fn test_unknown_atlas() {
        let root = tempfile::tempdir().unwrap();
        let loader = DirLoader::new(root.path());
        for name in ["nope", "", "../x", "a/b"] {
            assert!(matches!(
                loader.load_vol_bboxes(name),
                Err(LoadError::UnknownAtlas { .. })
            ));
        }
    }

    #[test]
    fn test_missing_required_file() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("toy")).unwrap();
        let loader = DirLoader::new(root.path());
        assert!(matches!(
            loader.load_vol_file_mappings("toy"),
            Err(LoadError::MissingField { file: "vfms.csv", .. })
        ));
        assert!(matches!(
            loader.load_connectivity("toy"),
            Err(LoadError::MissingField { file: "weights.txt", .. })
        ));
    }

    #[test]
    fn test_load_connectivity_optional_fields() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("toy");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("weights.txt"), "0 1\n1 0\n").unwrap();
        fs::write(dir.join("region_labels.txt"), "L\nR\n").unwrap();
        fs::write(dir.join("hemispheres.txt"), "0\n1\n").unwrap();
        fs::write(dir.join("cortical.txt"), "1\n0\n").unwrap();

        let conn = DirLoader::new(root.path()).load_connectivity("toy").unwrap();
        assert_eq!(conn.n_regions(), 2);
        assert_eq!(conn.cortex, Some(vec![true, false]));
        assert!(conn.hemispheres.is_some());
        assert!(conn.tract_lengths.is_none());
        assert!(conn.region_xyzs.is_none());
        assert!(conn.region_nii.is_none());

        fs::write(dir.join("hemispheres.txt"), "0\n2\n").unwrap();
        let err = DirLoader::new(root.path()).load_connectivity("toy").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));

        fs::write(dir.join("hemispheres.txt"), "0\n1\n").unwrap();
        fs::write(dir.join("tract_lengths.txt"), "0 1 1\n").unwrap();
        let err = DirLoader::new(root.path()).load_connectivity("toy").unwrap_err();
        assert!(matches!(err, LoadError::Misaligned { .. }));
    }
}
