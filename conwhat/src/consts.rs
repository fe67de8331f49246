//! 通用常量.

/// 图谱目录下的文件名.
pub mod files {
    /// 体素图谱文件映射表.
    pub const VOL_FILE_MAPPINGS: &str = "vfms.csv";

    /// 体素图谱包围盒表.
    pub const VOL_BBOXES: &str = "bboxes.csv";

    /// 流线图谱文件映射表.
    pub const STREAM_FILE_MAPPINGS: &str = "sfms.csv";

    /// 流线图谱包围盒表.
    pub const STREAM_BBOXES: &str = "stream_bboxes.csv";

    /// 连接权重矩阵.
    pub const WEIGHTS: &str = "weights.txt";

    /// 脑区标签, 每行一个.
    pub const REGION_LABELS: &str = "region_labels.txt";

    /// 纤维束长度矩阵.
    pub const TRACT_LENGTHS: &str = "tract_lengths.txt";

    /// 脑区中心坐标, 每行三个数.
    pub const REGION_XYZS: &str = "region_xyzs.txt";

    /// 脑区掩膜图像. 按顺序查找.
    pub const REGION_NII: [&str; 2] = ["region_masks.nii.gz", "region_masks.nii"];

    /// 皮层标记, 每行 `0` 或 `1`.
    pub const CORTEX: &str = "cortical.txt";

    /// 半球标记, 每行 `0` (左) 或 `1` (右).
    pub const HEMISPHERES: &str = "hemispheres.txt";

    /// fsaverage 左半球顶点到脑区的映射.
    pub const REGION_MAPPING_FSAV_LH: &str = "region_mapping_fsav_lh.txt";

    /// fsaverage 右半球顶点到脑区的映射.
    pub const REGION_MAPPING_FSAV_RH: &str = "region_mapping_fsav_rh.txt";
}

/// 指定图谱根目录的环境变量.
pub const ATLAS_DIR_ENV: &str = "CONWHAT_ATLAS_DIR";

/// `run_type` 默认值.
pub const DEFAULT_RUN_TYPE: &str = "simple";

/// `modify_connectome` 默认的缓存名.
pub const DEFAULT_MODCON_NAME: &str = "mc1";

/// 体素值大于该阈值时视为属于条目 (或 ROI).
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.0;

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 网络图和矩阵图的画布边长 (像素).
pub const CANVAS_SIZE: u32 = 512;
