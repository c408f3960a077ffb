use std::path::PathBuf;

use thiserror::Error;

use crate::hash::HashAlg;

/// 图片比对过程中的错误，任何一个都会中止整次运行
#[derive(Debug, Error)]
pub enum CheckError {
    /// 候选图片目录不存在或无法列出
    #[error("无法读取图片目录 {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 图片无法打开或解码
    #[error("无法加载图片 {}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{alg:?} 不支持哈希边长 {size}")]
    InvalidHashSize { alg: HashAlg, size: u32 },
}

impl CheckError {
    /// 读取失败为 2，与相似度不达标（1）区分开；参数不合法与其他参数错误一样为 1
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DirectoryNotFound { .. } | Self::ImageLoad { .. } => 2,
            Self::InvalidHashSize { .. } => 1,
        }
    }
}
