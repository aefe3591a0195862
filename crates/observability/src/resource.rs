/// 当前进程的常驻内存（MB），无法读取时返回 `None`
pub fn process_memory_mb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        memory_usage_linux()
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(target_os = "linux")]
fn memory_usage_linux() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss_kb(&status).map(|kb| kb as f64 / 1024.0)
}

fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tmindforge\nVmPeak:\t  20480 kB\nVmRSS:\t  10240 kB\n";
        assert_eq!(parse_vm_rss_kb(status), Some(10240));
        assert_eq!(parse_vm_rss_kb("Name:\tx\n"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_memory_is_positive_on_linux() {
        assert!(process_memory_mb().is_some_and(|mb| mb > 0.0));
    }
}
