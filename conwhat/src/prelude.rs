//! 🧠欢迎光临🔬
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{EntryIdx, Idx3d, RegionId};

pub use crate::atlas::{
    Atlas, AtlasData, AtlasKind, EntryAddress, HitOutcome, StreamAtlas, StreamConnAtlas,
    VolAtlas, VolConnAtlas,
};
pub use crate::data::{BBox, Roi, Volume};
pub use crate::error::{AtlasError, AtlasResult, LoadError};

pub use crate::loader::{atlas_root_from_env_or_home, AtlasLoader, DirLoader};

pub use crate::modcon::{mask_by_hits, scale_by_hits, ConnectomeContext, ModifiedConnectome};
pub use crate::stats::{HitMetric, HitRecord, HitStats, RunType, ScalarParams, ScalarStats};

pub use crate::plot::{AtlasPlotter, PngPlotter};

#[cfg(feature = "plot")]
pub use crate::plot::VolumeDisplay;

pub use crate::consts::{DEFAULT_MASK_THRESHOLD, DEFAULT_MODCON_NAME};
