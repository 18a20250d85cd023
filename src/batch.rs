// SPDX-License-Identifier: MIT
// Vectorized drivers: recycling pairwise distance, nearest-match lookup and
// the contains predicate, all running on a per-call rayon pool with one
// scratch workspace per worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::distance::{edit, jaro, phonetic, qgram, Workspace};
use crate::error::{Error, Result};
use crate::options::{kernel_params, KernelParams, Method, Options};
use crate::types::{code_points, decode_utf8, MaybeSeq, Unit};

/// Cooperative cancellation flag, checked at work-item pickup. In-flight
/// items finish; the batch returns `Error::Cancelled` and partial results
/// are discarded.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// Elementwise distances between `x` and `y`, recycling the shorter input:
/// the result has `max(|x|, |y|)` entries, pair `i` compares
/// `x[i % |x|]` with `y[i % |y|]`. An absent operand makes the pair's
/// result absent. Distances above `max_dist` come back as infinity.
pub fn pairwise_distance(
    x: &[Option<&str>],
    y: &[Option<&str>],
    method: Method,
    opts: &Options,
) -> Result<Vec<Option<f64>>> {
    let kp = kernel_params(method, opts)?;
    let nthread = opts.resolved_nthread();
    let cancel = opts.cancel.as_ref();
    if opts.use_bytes {
        pairwise_impl(
            &decode_str_bytes(x),
            &decode_str_bytes(y),
            method,
            &kp,
            nthread,
            cancel,
        )
    } else {
        pairwise_impl(
            &decode_str_chars(x),
            &decode_str_chars(y),
            method,
            &kp,
            nthread,
            cancel,
        )
    }
}

/// `pairwise_distance` over raw byte strings. In code-point mode an element
/// that is not valid UTF-8 is dropped to an absent result with a warning;
/// the rest of the batch is unaffected.
pub fn pairwise_distance_bytes(
    x: &[Option<&[u8]>],
    y: &[Option<&[u8]>],
    method: Method,
    opts: &Options,
) -> Result<Vec<Option<f64>>> {
    let kp = kernel_params(method, opts)?;
    let nthread = opts.resolved_nthread();
    let cancel = opts.cancel.as_ref();
    if opts.use_bytes {
        pairwise_impl(
            &decode_raw_bytes(x),
            &decode_raw_bytes(y),
            method,
            &kp,
            nthread,
            cancel,
        )
    } else {
        pairwise_impl(
            &decode_raw_chars(x),
            &decode_raw_chars(y),
            method,
            &kp,
            nthread,
            cancel,
        )
    }
}

/// For each query, the 1-based index of the nearest table entry with
/// distance at or below `max_dist`; ties break to the earliest entry.
/// Queries without a surviving candidate yield `nomatch`. An absent query
/// matches the first absent table entry when `match_absent` is set, else
/// `nomatch`.
pub fn nearest_match(
    x: &[Option<&str>],
    table: &[Option<&str>],
    method: Method,
    opts: &Options,
    nomatch: usize,
    match_absent: bool,
) -> Result<Vec<usize>> {
    let kp = kernel_params(method, opts)?;
    let nthread = opts.resolved_nthread();
    let cancel = opts.cancel.as_ref();
    if opts.use_bytes {
        nearest_impl(
            &decode_str_bytes(x),
            &decode_str_bytes(table),
            method,
            &kp,
            nthread,
            cancel,
            nomatch,
            match_absent,
        )
    } else {
        nearest_impl(
            &decode_str_chars(x),
            &decode_str_chars(table),
            method,
            &kp,
            nthread,
            cancel,
            nomatch,
            match_absent,
        )
    }
}

/// `nearest_match` over raw byte strings. In code-point mode an invalid
/// query yields `nomatch` and an invalid table entry is skipped for every
/// query, each with a warning.
pub fn nearest_match_bytes(
    x: &[Option<&[u8]>],
    table: &[Option<&[u8]>],
    method: Method,
    opts: &Options,
    nomatch: usize,
    match_absent: bool,
) -> Result<Vec<usize>> {
    let kp = kernel_params(method, opts)?;
    let nthread = opts.resolved_nthread();
    let cancel = opts.cancel.as_ref();
    if opts.use_bytes {
        nearest_impl(
            &decode_raw_bytes(x),
            &decode_raw_bytes(table),
            method,
            &kp,
            nthread,
            cancel,
            nomatch,
            match_absent,
        )
    } else {
        nearest_impl(
            &decode_raw_chars(x),
            &decode_raw_chars(table),
            method,
            &kp,
            nthread,
            cancel,
            nomatch,
            match_absent,
        )
    }
}

/// Whether each query has a table entry within `max_dist`.
pub fn contains(
    x: &[Option<&str>],
    table: &[Option<&str>],
    method: Method,
    opts: &Options,
    match_absent: bool,
) -> Result<Vec<bool>> {
    let hits = nearest_match(x, table, method, opts, 0, match_absent)?;
    Ok(hits.into_iter().map(|j| j > 0).collect())
}

/// Single-pair convenience wrapper; no worker pool involved.
pub fn distance(a: &str, b: &str, method: Method, opts: &Options) -> Result<f64> {
    let kp = kernel_params(method, opts)?;
    if opts.use_bytes {
        let (ua, ub) = (a.as_bytes().to_vec(), b.as_bytes().to_vec());
        Ok(eval_single(method, &ua, &ub, &kp))
    } else {
        let (ua, ub) = (code_points(a), code_points(b));
        Ok(eval_single(method, &ua, &ub, &kp))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_str_bytes(items: &[Option<&str>]) -> Vec<MaybeSeq<u8>> {
    items
        .iter()
        .map(|item| match item {
            Some(s) => MaybeSeq::Present(s.as_bytes().to_vec()),
            None => MaybeSeq::Absent,
        })
        .collect()
}

fn decode_str_chars(items: &[Option<&str>]) -> Vec<MaybeSeq<u32>> {
    items
        .iter()
        .map(|item| match item {
            Some(s) => MaybeSeq::Present(code_points(s)),
            None => MaybeSeq::Absent,
        })
        .collect()
}

fn decode_raw_bytes(items: &[Option<&[u8]>]) -> Vec<MaybeSeq<u8>> {
    items
        .iter()
        .map(|item| match item {
            Some(b) => MaybeSeq::Present(b.to_vec()),
            None => MaybeSeq::Absent,
        })
        .collect()
}

fn decode_raw_chars(items: &[Option<&[u8]>]) -> Vec<MaybeSeq<u32>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Some(b) => match decode_utf8(b) {
                Ok(units) => MaybeSeq::Present(units),
                Err(err) => {
                    tracing::warn!(index = i, error = %err, "element is not valid utf-8, treating as absent");
                    MaybeSeq::Invalid
                }
            },
            None => MaybeSeq::Absent,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Kernel dispatch
// ---------------------------------------------------------------------------

/// Cap protocol for the non-edit methods: 0 means uncapped.
#[inline]
fn capped(d: f64, cap: f64) -> f64 {
    if cap > 0.0 && d > cap {
        f64::INFINITY
    } else {
        d
    }
}

fn eval<T: Unit>(
    method: Method,
    a: &[T],
    b: &[T],
    kp: &KernelParams,
    ws: &mut Workspace<T>,
) -> f64 {
    match method {
        Method::Osa => edit::osa(a, b, &kp.edit, kp.cap, &mut ws.rows),
        Method::Lv => edit::lv(a, b, &kp.edit, kp.cap, &mut ws.rows),
        Method::Dl => edit::dl(a, b, &kp.edit, kp.cap, &mut ws.mat, &mut ws.da),
        Method::Hamming => edit::hamming(a, b, kp.cap),
        Method::Lcs => edit::lcs(a, b, kp.cap, &mut ws.rows),
        Method::Qgram => capped(qgram::qgram(a, b, kp.q, &mut ws.tree), kp.cap),
        Method::Cosine => capped(qgram::cosine(a, b, kp.q, &mut ws.tree), kp.cap),
        Method::Jaccard => capped(qgram::jaccard(a, b, kp.q, &mut ws.tree), kp.cap),
        Method::Jw => capped(jaro::jaro_winkler(a, b, &kp.jw, kp.p, &mut ws.flags), kp.cap),
        Method::Soundex => capped(phonetic::soundex(a, b), kp.cap),
    }
}

fn eval_single<T: Unit>(method: Method, a: &[T], b: &[T], kp: &KernelParams) -> f64 {
    if method == Method::Soundex
        && (phonetic::needs_warning(a) || phonetic::needs_warning(b))
    {
        warn_soundex(1);
    }
    eval(method, a, b, kp, &mut Workspace::new())
}

fn warn_soundex(count: usize) {
    tracing::warn!(
        count,
        "soundex: input strings contain non-ascii or non-printable characters, \
         which are ignored during coding"
    );
}

/// Soundex diagnoses its inputs up front, once per call.
fn scan_soundex_inputs<'a, T, I>(method: Method, seqs: I)
where
    T: Unit + 'a,
    I: Iterator<Item = &'a MaybeSeq<T>>,
{
    if method != Method::Soundex {
        return;
    }
    let offending = seqs
        .filter(|s| s.as_present().is_some_and(phonetic::needs_warning))
        .count();
    if offending > 0 {
        warn_soundex(offending);
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

fn pool_error(e: rayon::ThreadPoolBuildError) -> Error {
    Error::Resource(e.to_string())
}

fn build_pool(nthread: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(nthread)
        .build()
        .map_err(pool_error)
}

fn pairwise_impl<T: Unit + Send + Sync>(
    xs: &[MaybeSeq<T>],
    ys: &[MaybeSeq<T>],
    method: Method,
    kp: &KernelParams,
    nthread: usize,
    cancel: Option<&CancelToken>,
) -> Result<Vec<Option<f64>>> {
    if xs.is_empty() || ys.is_empty() {
        return Ok(Vec::new());
    }
    scan_soundex_inputs(method, xs.iter().chain(ys.iter()));

    let n = xs.len().max(ys.len());
    let pool = build_pool(nthread)?;
    pool.install(|| {
        (0..n)
            .into_par_iter()
            .map_init(Workspace::<T>::new, |ws, i| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(Error::Cancelled);
                }
                let a = &xs[i % xs.len()];
                let b = &ys[i % ys.len()];
                Ok(match (a.as_present(), b.as_present()) {
                    (Some(a), Some(b)) => Some(eval(method, a, b, kp, ws)),
                    _ => None,
                })
            })
            .collect()
    })
}

#[allow(clippy::too_many_arguments)]
fn nearest_impl<T: Unit + Send + Sync>(
    xs: &[MaybeSeq<T>],
    table: &[MaybeSeq<T>],
    method: Method,
    kp: &KernelParams,
    nthread: usize,
    cancel: Option<&CancelToken>,
    nomatch: usize,
    match_absent: bool,
) -> Result<Vec<usize>> {
    if xs.is_empty() {
        return Ok(Vec::new());
    }
    scan_soundex_inputs(method, xs.iter().chain(table.iter()));

    let first_absent = table.iter().position(MaybeSeq::is_absent).map(|j| j + 1);
    let pool = build_pool(nthread)?;
    pool.install(|| {
        xs.par_iter()
            .map_init(Workspace::<T>::new, |ws, query| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(Error::Cancelled);
                }
                let q = match query {
                    MaybeSeq::Present(q) => q,
                    MaybeSeq::Absent => {
                        return Ok(if match_absent {
                            first_absent.unwrap_or(nomatch)
                        } else {
                            nomatch
                        });
                    }
                    MaybeSeq::Invalid => return Ok(nomatch),
                };

                let mut best = f64::INFINITY;
                let mut best_j = 0usize;
                for (j, entry) in table.iter().enumerate() {
                    let Some(t) = entry.as_present() else { continue };
                    let d = eval(method, q, t, kp, ws);
                    // Over-cap and infeasible results are already infinite.
                    if d.is_finite() && d < best {
                        best = d;
                        best_j = j + 1;
                        if d == 0.0 {
                            break;
                        }
                    }
                }
                Ok(if best_j > 0 { best_j } else { nomatch })
            })
            .collect()
    })
}
