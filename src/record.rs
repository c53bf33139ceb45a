use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::harness::Measurement;

/// 结果文件的表头
pub const HEADER: [&str; 6] =
    ["image", "operation", "backend", "elapsed_seconds", "cpu_percent", "mem_percent"];

/// 被测量的操作类型，写入总是排在读取之前
#[derive(
    ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// 写入一条模板
    #[default]
    Insert,
    /// 按内容（或索引）查询一条模板
    Read,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次 (图片, 操作, 后端) 执行的测量记录
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub image: String,
    /// 只测量写入的结果文件没有这一列，读取时按写入处理
    #[serde(default)]
    pub operation: Operation,
    pub backend: BackendKind,
    pub elapsed_seconds: f64,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

impl MeasurementRecord {
    pub fn new(image: &str, operation: Operation, backend: BackendKind, m: Measurement) -> Self {
        Self {
            image: image.to_owned(),
            operation,
            backend,
            elapsed_seconds: m.elapsed_seconds,
            cpu_percent: m.cpu_percent,
            mem_percent: m.mem_percent,
        }
    }
}

/// 逐行写入测量记录，每行写完立即 flush，运行中断时已写入的行仍然保留
pub struct RecordWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl RecordWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("无法创建结果文件: {}", path.display()))?;
        Self::from_writer(file)
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn from_writer(writer: W) -> Result<Self> {
        // 表头手动写入，这样即使没有任何记录也会得到一个合法的 CSV
        let mut inner = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        inner.write_record(HEADER)?;
        inner.flush()?;
        Ok(Self { inner })
    }

    pub fn write(&mut self, record: &MeasurementRecord) -> Result<()> {
        self.inner.serialize(record)?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.inner.into_inner().map_err(|e| anyhow::anyhow!("{}", e.error()))
    }
}

/// 读取一个结果文件的全部记录
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<MeasurementRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let records = reader.deserialize().collect::<Result<Vec<MeasurementRecord>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/results.csv");
        let m = Measurement { elapsed_seconds: 0.5, cpu_percent: 12.5, mem_percent: 40. };
        let mut writer = RecordWriter::create(&path).unwrap();
        writer
            .write(&MeasurementRecord::new("a.tif", Operation::Insert, BackendKind::Relational, m))
            .unwrap();
        writer.write(&MeasurementRecord::new("a.tif", Operation::Read, BackendKind::Ledger, m)).unwrap();
        drop(writer);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("image,operation,backend,elapsed_seconds,cpu_percent,mem_percent"));
        assert_eq!(lines.next(), Some("a.tif,insert,relational,0.5,12.5,40.0"));

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].operation, Operation::Read);
        assert_eq!(records[1].backend, BackendKind::Ledger);
    }

    #[test]
    fn header_without_records() {
        let writer = RecordWriter::from_writer(vec![]).unwrap();
        let data = writer.into_inner().unwrap();
        assert_eq!(String::from_utf8(data).unwrap(), format!("{}\n", HEADER.join(",")));
    }

    #[test]
    fn missing_operation_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("populate.csv");
        std::fs::write(
            &path,
            "image,backend,elapsed_seconds,cpu_percent,mem_percent\nb.tif,document,0.25,1.0,2.0\n",
        )
        .unwrap();
        let records = read_records(&path).unwrap();
        assert_eq!(records[0].operation, Operation::Insert);
        assert_eq!(records[0].backend, BackendKind::Document);
    }
}
