//! 系统级 CPU 与内存占用采样
//!
//! Linux 下读取 `/proc/stat` 与 `/proc/meminfo`，其他平台返回全 0 的快照。

/// 某一时刻的系统资源快照
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    /// 累计 CPU 忙碌时间，单位 jiffies
    pub cpu_busy: u64,
    /// 累计 CPU 总时间，单位 jiffies
    pub cpu_total: u64,
    /// 内存占用百分比：(MemTotal - MemAvailable) / MemTotal
    pub mem_percent: f64,
}

impl ResourceSample {
    /// 从 `before` 到当前快照之间 CPU 忙碌时间的占比
    pub fn cpu_percent_since(&self, before: &ResourceSample) -> f64 {
        let total = self.cpu_total.saturating_sub(before.cpu_total);
        if total == 0 {
            return 0.;
        }
        let busy = self.cpu_busy.saturating_sub(before.cpu_busy);
        busy as f64 / total as f64 * 100.
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn sample(&self) -> ResourceSample {
        let (cpu_busy, cpu_total) = read_cpu_times().unwrap_or_default();
        let mem_percent = read_mem_percent().unwrap_or_default();
        ResourceSample { cpu_busy, cpu_total, mem_percent }
    }
}

#[cfg(target_os = "linux")]
fn read_cpu_times() -> Option<(u64, u64)> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    parse_cpu_line(stat.lines().next()?)
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_times() -> Option<(u64, u64)> {
    None
}

#[cfg(target_os = "linux")]
fn read_mem_percent() -> Option<f64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo(&meminfo)
}

#[cfg(not(target_os = "linux"))]
fn read_mem_percent() -> Option<f64> {
    None
}

/// 解析 `/proc/stat` 的汇总行，返回 (忙碌时间, 总时间)
///
/// 字段顺序：user nice system idle iowait irq softirq steal guest guest_nice
/// guest 已经计入 user，因此只累加前 8 项，idle 与 iowait 视为空闲
fn parse_cpu_line(line: &str) -> Option<(u64, u64)> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let values = fields.map(|f| f.parse::<u64>().ok()).collect::<Option<Vec<_>>>()?;
    if values.len() < 4 {
        return None;
    }
    let total: u64 = values.iter().take(8).sum();
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some((total.saturating_sub(idle), total))
}

fn parse_meminfo(meminfo: &str) -> Option<f64> {
    let field = |name: &str| {
        meminfo
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|value| value.parse::<u64>().ok())
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total == 0 {
        return None;
    }
    Some(total.saturating_sub(available) as f64 / total as f64 * 100.)
}
