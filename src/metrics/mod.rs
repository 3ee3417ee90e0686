use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use crossbeam_channel::{tick, Receiver};

pub struct Metrics {
    start: Instant,
    pub files_total: AtomicU64,
    pub input_bytes_total: AtomicU64,
    pub entries_total: AtomicU64,
    pub records_total: AtomicU64,
    pub failed_files_total: AtomicU64,
    pub jobs_total: AtomicU64,
    pub failed_jobs_total: AtomicU64,
    pub pairs_total: AtomicU64,
    pub keys_total: AtomicU64,
    // Stage timings (ns)
    pub read_ns_total: AtomicU64,
    pub parse_ns_total: AtomicU64,
    pub map_ns_total: AtomicU64,
    pub group_ns_total: AtomicU64,
    pub reduce_ns_total: AtomicU64,
    pub render_ns_total: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self { Self::new() }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            files_total: AtomicU64::new(0),
            input_bytes_total: AtomicU64::new(0),
            entries_total: AtomicU64::new(0),
            records_total: AtomicU64::new(0),
            failed_files_total: AtomicU64::new(0),
            jobs_total: AtomicU64::new(0),
            failed_jobs_total: AtomicU64::new(0),
            pairs_total: AtomicU64::new(0),
            keys_total: AtomicU64::new(0),
            read_ns_total: AtomicU64::new(0),
            parse_ns_total: AtomicU64::new(0),
            map_ns_total: AtomicU64::new(0),
            group_ns_total: AtomicU64::new(0),
            reduce_ns_total: AtomicU64::new(0),
            render_ns_total: AtomicU64::new(0),
        }
    }

    pub fn uptime_secs(&self) -> u64 { self.start.elapsed().as_secs() }

    pub fn uptime_millis(&self) -> u128 { self.start.elapsed().as_millis() }

    pub fn elapsed_precise(&self) -> f64 { self.start.elapsed().as_secs_f64() }

    pub fn inc_files(&self, v: u64) { self.files_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_input_bytes(&self, v: u64) { self.input_bytes_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_entries(&self, v: u64) { self.entries_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_records(&self, v: u64) { self.records_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_failed_files(&self, v: u64) { self.failed_files_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_jobs(&self, v: u64) { self.jobs_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_failed_jobs(&self, v: u64) { self.failed_jobs_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_pairs(&self, v: u64) { self.pairs_total.fetch_add(v, Ordering::Relaxed); }
    pub fn inc_keys(&self, v: u64) { self.keys_total.fetch_add(v, Ordering::Relaxed); }

    pub fn add_read_time(&self, ns: u64) { self.read_ns_total.fetch_add(ns, Ordering::Relaxed); }
    pub fn add_parse_time(&self, ns: u64) { self.parse_ns_total.fetch_add(ns, Ordering::Relaxed); }
    pub fn add_map_time(&self, ns: u64) { self.map_ns_total.fetch_add(ns, Ordering::Relaxed); }
    pub fn add_group_time(&self, ns: u64) { self.group_ns_total.fetch_add(ns, Ordering::Relaxed); }
    pub fn add_reduce_time(&self, ns: u64) { self.reduce_ns_total.fetch_add(ns, Ordering::Relaxed); }
    pub fn add_render_time(&self, ns: u64) { self.render_ns_total.fetch_add(ns, Ordering::Relaxed); }
}

fn ms(ns: u64) -> u64 { ns / 1_000_000 }

fn log_snapshot(metrics: &Metrics, summary: bool) {
    let files = metrics.files_total.load(Ordering::Relaxed);
    let input = metrics.input_bytes_total.load(Ordering::Relaxed);
    let entries = metrics.entries_total.load(Ordering::Relaxed);
    let records = metrics.records_total.load(Ordering::Relaxed);
    let failed_files = metrics.failed_files_total.load(Ordering::Relaxed);
    let jobs = metrics.jobs_total.load(Ordering::Relaxed);
    let failed_jobs = metrics.failed_jobs_total.load(Ordering::Relaxed);
    let pairs = metrics.pairs_total.load(Ordering::Relaxed);
    let keys = metrics.keys_total.load(Ordering::Relaxed);

    let uptime_secs = metrics.uptime_secs();
    let records_per_sec = if uptime_secs > 0 { records as f64 / uptime_secs as f64 } else { 0.0 };
    let read_mbps = if uptime_secs > 0 { (input as f64) / 1048576.0 / (uptime_secs as f64) } else { 0.0 };

    tracing::info!(
        component = "metrics",
        summary = summary,
        uptime_secs = uptime_secs,
        files_total = files,
        input_bytes_total = input,
        entries_total = entries,
        records_total = records,
        failed_files_total = failed_files,
        jobs_total = jobs,
        failed_jobs_total = failed_jobs,
        pairs_total = pairs,
        keys_total = keys,
        read_ms = ms(metrics.read_ns_total.load(Ordering::Relaxed)),
        parse_ms = ms(metrics.parse_ns_total.load(Ordering::Relaxed)),
        map_ms = ms(metrics.map_ns_total.load(Ordering::Relaxed)),
        group_ms = ms(metrics.group_ns_total.load(Ordering::Relaxed)),
        reduce_ms = ms(metrics.reduce_ns_total.load(Ordering::Relaxed)),
        render_ms = ms(metrics.render_ns_total.load(Ordering::Relaxed)),
        records_per_sec = format!("{:.0}", records_per_sec).as_str(),
        read_mb_per_sec = format!("{:.2}", read_mbps).as_str(),
        "{}", if summary { "metrics summary" } else { "metrics snapshot" }
    );
}

/// Log a snapshot every `interval` until `shutdown_rx` fires, then a summary.
pub fn spawn_stdout_reporter(metrics: Arc<Metrics>, interval: Duration, shutdown_rx: Receiver<()>) -> std::thread::JoinHandle<()> {
    let ticker = tick(interval);
    std::thread::spawn(move || loop {
        crossbeam_channel::select! {
            recv(shutdown_rx) -> _ => {
                log_snapshot(&metrics, true);
                break;
            }
            recv(ticker) -> _ => log_snapshot(&metrics, false),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn counters_accumulate() {
        let m = Metrics::new();
        m.inc_records(3);
        m.inc_records(2);
        m.inc_failed_jobs(1);
        m.add_map_time(5);
        assert_eq!(m.records_total.load(Ordering::Relaxed), 5);
        assert_eq!(m.failed_jobs_total.load(Ordering::Relaxed), 1);
        assert_eq!(m.map_ns_total.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn reporter_stops_on_shutdown() {
        let m = Arc::new(Metrics::new());
        let (tx, rx) = bounded::<()>(1);
        let h = spawn_stdout_reporter(m, Duration::from_millis(10), rx);
        std::thread::sleep(Duration::from_millis(25));
        tx.send(()).unwrap();
        h.join().unwrap();
    }
}
