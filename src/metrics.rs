use std::sync::LazyLock;

use log::{error, info};
use prometheus::*;
use tokio::task::spawn_blocking;

use crate::backend::BackendKind;
use crate::record::Operation;

static METRIC_OPERATION_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "biobench_operation_count",
        "count of the measured backend operations",
        &["backend", "operation"]
    )
    .unwrap()
});

static METRIC_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "biobench_operation_duration",
        "duration of the per-image backend operation in seconds",
        &["backend", "operation"],
        exponential_buckets(0.0001, 4., 10).unwrap()
    )
    .unwrap()
});

static METRIC_SKIPPED_IMAGE_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("biobench_skipped_image_count", "count of the images failed to decode")
        .unwrap()
});

/// 记录一次被测量的操作
pub fn observe_operation(backend: BackendKind, operation: Operation, elapsed_seconds: f64) {
    let labels = [backend.as_str(), operation.as_str()];
    METRIC_OPERATION_COUNT.with_label_values(&labels).inc();
    METRIC_OPERATION_DURATION.with_label_values(&labels).observe(elapsed_seconds);
}

pub fn inc_skipped_image_count() {
    METRIC_SKIPPED_IMAGE_COUNT.inc();
}

/// 把当前进程的全部指标推送到 push-gateway，失败只记录日志
pub async fn push(url: &str, instance: &str) {
    let metric_families = prometheus::gather();
    let url = url.to_owned();
    let instance = instance.to_owned();
    let r = spawn_blocking(move || {
        prometheus::push_metrics(
            "biobench",
            labels! {
                "instance".to_string() => instance,
            },
            &url,
            metric_families,
            None,
        )
    })
    .await;
    match r {
        Ok(Ok(())) => info!("指标已推送"),
        Ok(Err(e)) => error!("推送指标失败: {e}"),
        Err(e) => error!("推送指标任务异常退出: {e}"),
    }
}
