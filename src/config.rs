use once_cell::sync::Lazy;

// Environment-imposed ceiling on worker threads, read once per process.
static THREAD_LIMIT: Lazy<Option<usize>> = Lazy::new(|| {
    std::env::var("OMP_THREAD_LIMIT")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|&limit| limit >= 1)
});

// Default worker count: physical cores minus one (the caller's thread keeps
// a core), floored at one.
static DEFAULT_NTHREAD: Lazy<usize> = Lazy::new(|| {
    clamp_nthread(num_cpus::get_physical().saturating_sub(1).max(1))
});

/// Worker count used when `Options::nthread` is 0.
pub fn default_nthread() -> usize {
    *DEFAULT_NTHREAD
}

/// Apply the `OMP_THREAD_LIMIT` ceiling to a requested worker count.
pub(crate) fn clamp_nthread(n: usize) -> usize {
    match *THREAD_LIMIT {
        Some(limit) => n.min(limit),
        None => n,
    }
}
