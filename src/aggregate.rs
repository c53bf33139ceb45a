//! 合并多个结果文件，按 (后端, 操作) 分组统计并绘制箱线图

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};
use ndarray::Array1;
use serde::Serialize;

use crate::backend::BackendKind;
use crate::plot::{Scale, render_boxplot};
use crate::record::{MeasurementRecord, Operation, read_records};

pub const SUMMARY_FILE: &str = "summary.csv";
pub const INSERT_PLOT_FILE: &str = "boxplot_insert.png";
pub const READ_PLOT_FILE: &str = "boxplot_read.png";

/// 一个 (后端, 操作) 分组的统计结果
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub backend: BackendKind,
    pub operation: Operation,
    pub count: usize,
    pub mean_elapsed_seconds: f64,
    /// 样本标准差，只有一个样本时为空
    pub stddev_elapsed_seconds: Option<f64>,
    pub mean_cpu_percent: f64,
    pub mean_mem_percent: f64,
}

/// 目录参数展开为其中的 `results*.csv`，其余参数原样保留
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = vec![];
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let entries = match fs::read_dir(input) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("无法读取目录 {}: {}", input.display(), e);
                continue;
            }
        };
        let mut found = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file()
                    && path.file_name().map(|n| n.to_string_lossy()).is_some_and(|name| {
                        name.starts_with("results") && name.ends_with(".csv")
                    })
            })
            .collect::<Vec<_>>();
        found.sort();
        files.extend(found);
    }
    files
}

/// 读取所有结果文件，不存在或无法解析的文件记录警告后跳过
pub fn load(paths: &[PathBuf]) -> Vec<MeasurementRecord> {
    let mut records = vec![];
    for path in paths {
        if !path.exists() {
            warn!("结果文件不存在，跳过: {}", path.display());
            continue;
        }
        match read_records(path) {
            Ok(rs) => {
                info!("读取 {} 条记录: {}", rs.len(), path.display());
                records.extend(rs);
            }
            Err(e) => warn!("无法解析结果文件，跳过: {}: {}", path.display(), e),
        }
    }
    records
}

fn mean(values: &Array1<f64>) -> f64 {
    values.mean().unwrap_or(f64::NAN)
}

/// 按 (后端, 操作) 分组计算均值与样本标准差
pub fn summarize(records: &[MeasurementRecord]) -> Vec<SummaryRow> {
    let mut groups = BTreeMap::<(BackendKind, Operation), Vec<&MeasurementRecord>>::new();
    for record in records {
        groups.entry((record.backend, record.operation)).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|((backend, operation), group)| {
            let elapsed = group.iter().map(|r| r.elapsed_seconds).collect::<Array1<_>>();
            let cpu = group.iter().map(|r| r.cpu_percent).collect::<Array1<_>>();
            let mem = group.iter().map(|r| r.mem_percent).collect::<Array1<_>>();
            SummaryRow {
                backend,
                operation,
                count: group.len(),
                mean_elapsed_seconds: mean(&elapsed),
                stddev_elapsed_seconds: (group.len() > 1).then(|| elapsed.std(1.)),
                mean_cpu_percent: mean(&cpu),
                mean_mem_percent: mean(&mem),
            }
        })
        .collect()
}

pub fn write_summary(rows: &[SummaryRow], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("无法创建文件: {}", path.display()))?;
    if rows.is_empty() {
        writer.write_record([
            "backend",
            "operation",
            "count",
            "mean_elapsed_seconds",
            "stddev_elapsed_seconds",
            "mean_cpu_percent",
            "mean_mem_percent",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// 以对齐的表格打印统计结果
pub fn print_summary(rows: &[SummaryRow]) {
    println!(
        "{:<12} {:<10} {:>8} {:>14} {:>14} {:>10} {:>10}",
        "backend", "operation", "count", "mean_s", "stddev_s", "cpu_%", "mem_%"
    );
    for row in rows {
        let stddev = match row.stddev_elapsed_seconds {
            Some(v) => format!("{:.6}", v),
            None => "-".to_owned(),
        };
        println!(
            "{:<12} {:<10} {:>8} {:>14.6} {:>14} {:>10.2} {:>10.2}",
            row.backend,
            row.operation,
            row.count,
            row.mean_elapsed_seconds,
            stddev,
            row.mean_cpu_percent,
            row.mean_mem_percent
        );
    }
}

/// 某个操作下每个后端的耗时样本，按后端顺序排列
pub fn elapsed_by_backend(records: &[MeasurementRecord], operation: Operation) -> Vec<(String, Vec<f64>)> {
    let mut groups = BTreeMap::<BackendKind, Vec<f64>>::new();
    for record in records.iter().filter(|r| r.operation == operation) {
        groups.entry(record.backend).or_default().push(record.elapsed_seconds);
    }
    groups.into_iter().map(|(backend, values)| (backend.to_string(), values)).collect()
}

/// 写入统计表并绘制两张箱线图，绘图失败只记录日志
pub fn aggregate(inputs: &[PathBuf], output_dir: impl AsRef<Path>) -> Result<Vec<SummaryRow>> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)
        .with_context(|| format!("无法创建目录: {}", output_dir.display()))?;

    let records = load(&expand_inputs(inputs));
    if records.is_empty() {
        warn!("没有读取到任何测量记录");
    }

    let rows = summarize(&records);
    let summary = output_dir.join(SUMMARY_FILE);
    write_summary(&rows, &summary)?;
    info!("统计结果已写入: {}", summary.display());
    print_summary(&rows);

    let plots = [
        (Operation::Insert, INSERT_PLOT_FILE, "insert time per backend", Scale::Log),
        (Operation::Read, READ_PLOT_FILE, "read time per backend", Scale::Linear),
    ];
    for (operation, file, title, scale) in plots {
        let groups = elapsed_by_backend(&records, operation);
        if groups.is_empty() {
            warn!("没有 {} 记录，跳过 {}", operation, file);
            continue;
        }
        let path = output_dir.join(file);
        match render_boxplot(&path, title, "seconds", &groups, scale) {
            Ok(()) => info!("箱线图已写入: {}", path.display()),
            Err(e) => error!("绘制 {} 失败: {}", file, e),
        }
    }

    Ok(rows)
}
