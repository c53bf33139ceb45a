use std::path::Path;

use log::warn;
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;

/// 展平后的灰度像素序列，长度为 宽 × 高
pub type FeatureVector = Vec<u8>;

/// 以灰度模式读取图片文件并展平为一维像素序列
///
/// 文件无法读取或解码失败时记录警告并返回 `None`
pub fn extract_file(path: impl AsRef<Path>) -> Option<FeatureVector> {
    let path = path.as_ref();
    let result = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_GRAYSCALE)
        .and_then(|image| flatten(&image));
    match result {
        Ok(Some(features)) => Some(features),
        Ok(None) => {
            warn!("无法读取图片: {}", path.display());
            None
        }
        Err(e) => {
            warn!("无法读取图片: {}: {}", path.display(), e);
            None
        }
    }
}

/// 从内存中的图片编码数据提取特征
pub fn extract_bytes(data: &[u8]) -> Option<FeatureVector> {
    let buf = Vector::<u8>::from_slice(data);
    match imgcodecs::imdecode(&buf, imgcodecs::IMREAD_GRAYSCALE).and_then(|image| flatten(&image)) {
        Ok(features) => features,
        Err(e) => {
            warn!("无法解码图片: {}", e);
            None
        }
    }
}

/// 按行优先顺序展平单通道图像，空图像返回 `None`
fn flatten(image: &Mat) -> opencv::Result<Option<FeatureVector>> {
    if image.empty() {
        return Ok(None);
    }
    // data_bytes 要求内存连续，ROI 之类的视图需要先复制一份
    let data = if image.is_continuous() {
        image.data_bytes()?.to_vec()
    } else {
        image.try_clone()?.data_bytes()?.to_vec()
    };
    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use opencv::core::{CV_8UC1, Scalar};

    use super::*;

    fn encode_png(image: &Mat) -> Vec<u8> {
        let mut buf = Vector::<u8>::new();
        imgcodecs::imencode(".png", image, &mut buf, &Vector::new()).unwrap();
        buf.to_vec()
    }

    #[test]
    fn extract_gray_pixels() {
        let mut image = Mat::new_rows_cols_with_default(3, 4, CV_8UC1, Scalar::all(0.)).unwrap();
        for row in 0..3 {
            for col in 0..4 {
                *image.at_2d_mut::<u8>(row, col).unwrap() = (row * 4 + col) as u8;
            }
        }
        let features = extract_bytes(&encode_png(&image)).unwrap();
        assert_eq!(features, (0..12).collect::<Vec<u8>>());
    }

    #[test]
    fn extract_garbage_fails() {
        assert!(extract_bytes(b"definitely not an image").is_none());
    }

    #[test]
    fn extract_missing_file_fails() {
        assert!(extract_file("/nonexistent/finger.tif").is_none());
    }
}
