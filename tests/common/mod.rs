#![allow(dead_code)]

use std::path::Path;

use anyhow::{Result, ensure};
use opencv::core::{CV_8UC1, Mat, Scalar, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;

pub mod node;

pub const RESULT_HEADER: &str = "image,operation,backend,elapsed_seconds,cpu_percent,mem_percent";

/// 写入一张内容由 `salt` 决定的灰度 PNG
pub fn write_png(path: &Path, rows: i32, cols: i32, salt: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut image = Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(0.))?;
    for (i, px) in image.data_bytes_mut()?.iter_mut().enumerate() {
        *px = (i as u8).wrapping_mul(7).wrapping_add(salt);
    }
    ensure!(imgcodecs::imwrite(&path.to_string_lossy(), &image, &Vector::new())?, "imwrite failed");
    Ok(())
}
