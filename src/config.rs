use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::checker::{DEFAULT_SUFFIXES, Scale, SuffixFilter};
use crate::hash::HashAlg;

pub const USAGE: &str = "Usage: imcheck <image_folder> <ground_truth_image>";

/// 用感知哈希比对目录中的图片与参照图，任意一张相似度低于阈值即失败
#[derive(Parser, Debug, Clone)]
#[command(name = "imcheck", version)]
pub struct Opts {
    /// 待检查图片所在目录
    pub image_folder: PathBuf,
    /// 参照图路径
    pub ground_truth_image: PathBuf,
    /// 相似度阈值（百分比），低于该值视为失败
    #[arg(
        short,
        long,
        value_name = "PERCENT",
        default_value_t = 90.0,
        value_parser = parse_threshold
    )]
    pub threshold: f64,
    /// 感知哈希算法
    #[arg(short = 'H', long, value_enum, default_value_t = HashAlg::Whash)]
    pub hash: HashAlg,
    /// 哈希边长，总位数为其平方
    #[arg(
        long,
        value_name = "N",
        default_value_t = 8,
        value_parser = clap::value_parser!(u32).range(2..=64)
    )]
    pub hash_size: u32,
    /// 相似度百分比的分母：hex 为哈希字符串长度，bits 为哈希位数
    #[arg(long, value_enum, default_value_t = Scale::Hex)]
    pub scale: Scale,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = DEFAULT_SUFFIXES, value_parser = parse_suffix)]
    pub suffix: SuffixFilter,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
    /// 使用多线程计算候选图片的哈希
    #[arg(long)]
    pub parallel: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

/// 只接受有限值，NaN 会让阈值比较恒为 false
fn parse_threshold(s: &str) -> Result<f64, String> {
    let threshold: f64 = s.parse().map_err(|e| format!("无效的阈值: {}: {}", s, e))?;
    if !threshold.is_finite() {
        return Err(format!("阈值必须是有限的数值: {}", s));
    }
    Ok(threshold)
}

fn parse_suffix(s: &str) -> Result<SuffixFilter, String> {
    SuffixFilter::new(s).map_err(|e| format!("无效的后缀: {}: {}", s, e))
}
