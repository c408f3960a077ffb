use std::io::{self, Write};

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use crate::checker::{CheckerBuilder, Report, SimilarityResult};
use crate::config::{Opts, OutputFormat};
use crate::utils::pb_style;

/// 执行一次比对并输出结果，返回的报告决定退出码
pub fn run(opts: &Opts) -> Result<Report> {
    let pb = ProgressBar::no_length().with_style(pb_style()).with_message("计算图片哈希中...");
    let checker = CheckerBuilder::new()
        .hash(opts.hash)
        .hash_size(opts.hash_size)
        .scale(opts.scale)
        .threshold(opts.threshold)
        .filter(opts.suffix.clone())
        .parallel(opts.parallel)
        .progress(pb.clone())
        .build()?;

    let report = checker
        .compare(&opts.image_folder, &opts.ground_truth_image, |result| {
            if opts.output_format == OutputFormat::Table {
                pb.suspend(|| println!("{}", format_result(result)));
            }
        })
        .with_context(|| {
            format!(
                "比对 {} 与 {} 失败",
                opts.image_folder.display(),
                opts.ground_truth_image.display()
            )
        })?;

    print_summary(&report, opts.output_format)?;
    Ok(report)
}

pub fn format_result(result: &SimilarityResult) -> String {
    format!("Image: {}, Similarity: {:.2}%", result.path.display(), result.similarity)
}

pub fn failure_message(threshold: f64) -> String {
    format!("Some formats failed the similarity score >{}%", threshold)
}

fn print_summary(report: &Report, format: OutputFormat) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Table => {
            if report.failed {
                writeln!(stdout, "{}", failure_message(report.threshold))?;
            }
        }
    }
    Ok(())
}
