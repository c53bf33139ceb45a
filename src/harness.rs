use std::future::Future;
use std::time::Instant;

use crate::probe::SystemProbe;

/// 单次操作的测量结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed_seconds: f64,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

/// 执行 `operation` 并测量墙钟耗时、CPU 与内存占用
///
/// 执行前后各采样一次：前一次快照作为 CPU 统计的起点，CPU 占用是两次快照之间
/// 的忙碌时间占比，内存占用取执行后的值。没有超时，操作阻塞多久这里就等多久。
/// 操作失败时，错误在后一次采样之后原样返回。
pub async fn measure<F, T>(probe: &SystemProbe, operation: F) -> anyhow::Result<(T, Measurement)>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let start = Instant::now();
    let before = probe.sample();

    let output = operation.await;

    let elapsed = start.elapsed();
    let after = probe.sample();

    let measurement = Measurement {
        elapsed_seconds: elapsed.as_secs_f64(),
        cpu_percent: after.cpu_percent_since(&before),
        mem_percent: after.mem_percent,
    };
    Ok((output?, measurement))
}
