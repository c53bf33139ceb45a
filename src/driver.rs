//! 遍历数据集，逐张计算 biocode，并在每个后端上依次测量写入与读取

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{info, warn};
use regex::Regex;

use crate::backend::{BackendConfig, BackendKind, Backends};
use crate::biocode::BiocodeGenerator;
use crate::feature;
use crate::harness::measure;
use crate::metrics;
use crate::probe::SystemProbe;
use crate::record::{MeasurementRecord, Operation, RecordWriter};
use crate::utils::{pb_style, scan_images};

/// 一次运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 成功计算出 biocode 并完成测量的图片数
    pub images: usize,
    /// 无法解码而被跳过的图片数
    pub skipped: usize,
    /// 写入的测量记录数
    pub records: usize,
}

/// 逐张图片执行测量
#[derive(Debug, Clone)]
pub struct Driver {
    generator: BiocodeGenerator,
    operations: Vec<Operation>,
    limit: Option<usize>,
    probe: SystemProbe,
}

impl Driver {
    /// `operations` 会被排序去重，写入总在读取之前
    pub fn new(generator: BiocodeGenerator, operations: &[Operation], limit: Option<usize>) -> Self {
        let mut operations = operations.to_vec();
        operations.sort_unstable();
        operations.dedup();
        Self { generator, operations, limit, probe: SystemProbe }
    }

    pub fn generator(&self) -> &BiocodeGenerator {
        &self.generator
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// 处理给定的图片列表，每条测量记录写入后立即落盘
    ///
    /// 任何后端错误都会中止运行，已写入的记录保留在结果文件中。
    pub async fn process<W: Write + Send>(
        &self,
        images: &[PathBuf],
        backends: &mut Backends,
        writer: &mut RecordWriter<W>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let total = match self.limit {
            Some(limit) => images.len().min(limit),
            None => images.len(),
        };
        let pb = ProgressBar::new(total as u64).with_style(pb_style());

        for path in images {
            if self.limit.is_some_and(|limit| summary.images >= limit) {
                break;
            }
            let image = path.to_string_lossy();
            pb.set_message(image.to_string());

            let Some(biocode) = self.generator.generate(feature::extract_file(path).as_deref())
            else {
                warn!("跳过无法解码的图片: {}", image);
                metrics::inc_skipped_image_count();
                summary.skipped += 1;
                continue;
            };

            for &operation in &self.operations {
                for backend in backends.iter_mut() {
                    let kind = backend.kind();
                    let m = match operation {
                        Operation::Insert => {
                            measure(&self.probe, backend.insert(&image, &biocode)).await.map(|(_, m)| m)
                        }
                        Operation::Read => {
                            measure(&self.probe, backend.read(&image, &biocode)).await.map(|(_, m)| m)
                        }
                    }
                    .with_context(|| format!("{} {} 失败: {}", kind, operation, image))?;

                    metrics::observe_operation(kind, operation, m.elapsed_seconds);
                    writer.write(&MeasurementRecord::new(&image, operation, kind, m))?;
                    summary.records += 1;
                }
            }

            summary.images += 1;
            pb.inc(1);
        }

        pb.finish_with_message("测量完成");
        Ok(summary)
    }
}

/// `run` 子命令的完整参数
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset: PathBuf,
    pub suffix: Regex,
    pub output: PathBuf,
    pub backends: Vec<BackendKind>,
    pub backend: BackendConfig,
    pub driver: Driver,
}

/// 扫描数据集，打开并重置后端，执行测量，最后无论成败都关闭后端
pub async fn run_benchmark(config: &RunConfig) -> Result<RunSummary> {
    let images = scan_images(&config.dataset, &config.suffix);
    let mut backends = Backends::open(&config.backends, &config.backend).await?;
    let generator = config.driver.generator();
    info!(
        "后端 {:?}，操作 {:?}，种子 {}，biocode 长度 {}",
        backends.kinds(),
        config.driver.operations(),
        generator.seed(),
        generator.length()
    );

    let result = async {
        backends.reset().await?;
        backends.warmup().await?;
        let mut writer = RecordWriter::create(&config.output)?;
        config.driver.process(&images, &mut backends, &mut writer).await
    }
    .await;

    let closed = backends.close().await;
    let summary = result?;
    closed?;

    info!(
        "运行完成：{} 张图片，跳过 {} 张，{} 条记录写入 {}",
        summary.images,
        summary.skipped,
        summary.records,
        config.output.display()
    );
    Ok(summary)
}
