use serde::{Deserialize, Serialize};

use crate::batch::CancelToken;
use crate::config;
use crate::error::{Error, Result};

/// Distance algorithm selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Osa,
    Lv,
    Dl,
    Hamming,
    Lcs,
    Qgram,
    Cosine,
    Jaccard,
    Jw,
    Soundex,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Method> {
        match name {
            "osa" => Some(Method::Osa),
            "lv" => Some(Method::Lv),
            "dl" => Some(Method::Dl),
            "hamming" => Some(Method::Hamming),
            "lcs" => Some(Method::Lcs),
            "qgram" => Some(Method::Qgram),
            "cosine" => Some(Method::Cosine),
            "jaccard" => Some(Method::Jaccard),
            "jw" => Some(Method::Jw),
            "soundex" => Some(Method::Soundex),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Osa => "osa",
            Method::Lv => "lv",
            Method::Dl => "dl",
            Method::Hamming => "hamming",
            Method::Lcs => "lcs",
            Method::Qgram => "qgram",
            Method::Cosine => "cosine",
            Method::Jaccard => "jaccard",
            Method::Jw => "jw",
            Method::Soundex => "soundex",
        }
    }

    /// Edit-family methods support row-wise early termination and keep an
    /// infinite cap as-is; the remaining methods encode "uncapped" as 0.
    pub fn is_edit_based(self) -> bool {
        matches!(
            self,
            Method::Osa | Method::Lv | Method::Dl | Method::Hamming | Method::Lcs
        )
    }

    fn weight_arity(self) -> usize {
        match self {
            Method::Osa | Method::Dl => 4,
            Method::Lv | Method::Jw => 3,
            _ => 0,
        }
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Method> {
        Method::from_name(s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown method `{s}`")))
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Call options. Only the members relevant to the chosen method are read.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Up to four weights in (0, 1]: (d, i, s, t) for the edit family,
    /// (a, b, t) for Jaro-Winkler.
    pub weight: Vec<f64>,
    /// Gram size for qgram/cosine/jaccard.
    pub q: usize,
    /// Winkler prefix scaling factor, in [0, 0.25].
    pub p: f64,
    /// Distance cap; results above it come back as infinity. `INFINITY`
    /// means uncapped.
    pub max_dist: f64,
    /// Compare raw bytes instead of decoded code points.
    pub use_bytes: bool,
    /// Worker threads; 0 picks the process default.
    pub nthread: usize,
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}

impl Options {
    pub fn new() -> Options {
        Options {
            weight: vec![1.0; 4],
            q: 1,
            p: 0.0,
            max_dist: f64::INFINITY,
            use_bytes: false,
            nthread: 0,
            cancel: None,
        }
    }

    pub fn resolved_nthread(&self) -> usize {
        if self.nthread == 0 {
            config::default_nthread()
        } else {
            config::clamp_nthread(self.nthread)
        }
    }
}

/// Weights in the order the DP kernels consume them.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EditWeights {
    pub del: f64,
    pub ins: f64,
    pub sub: f64,
    pub trans: f64,
}

/// Validated per-call parameter set handed to the kernels.
#[derive(Clone, Copy, Debug)]
pub(crate) struct KernelParams {
    pub edit: EditWeights,
    /// Jaro weight layout is (on b, on a, transpositions).
    pub jw: [f64; 3],
    pub q: usize,
    pub p: f64,
    /// Edit family: cap as given (infinite = uncapped). Everything else:
    /// 0 = uncapped, a historical protocol detail kept for compatibility.
    pub cap: f64,
}

/// Pre-call validation; everything here runs before any decoding.
pub(crate) fn kernel_params(method: Method, opts: &Options) -> Result<KernelParams> {
    if opts.weight.len() > 4 {
        return Err(Error::InvalidArgument(format!(
            "weight: expected at most 4 entries, got {}",
            opts.weight.len()
        )));
    }
    let arity = method.weight_arity();
    if opts.weight.len() < arity {
        return Err(Error::InvalidArgument(format!(
            "weight: method `{}` needs {} entries, got {}",
            method.name(),
            arity,
            opts.weight.len()
        )));
    }
    for (i, &w) in opts.weight.iter().enumerate() {
        if !w.is_finite() || w <= 0.0 || w > 1.0 {
            return Err(Error::InvalidArgument(format!(
                "weight[{i}] = {w}: weights must lie in (0, 1]"
            )));
        }
    }
    if !(0.0..=0.25).contains(&opts.p) {
        return Err(Error::InvalidArgument(format!(
            "p = {}: must lie in [0, 0.25]",
            opts.p
        )));
    }
    if opts.max_dist.is_nan() || opts.max_dist <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "max_dist = {}: must be positive",
            opts.max_dist
        )));
    }

    let w = |i: usize| opts.weight.get(i).copied().unwrap_or(1.0);
    // Caller order is (d, i, s, t) and prices edits of the first operand;
    // the DP indexes rows by `a`, so the first two entries swap roles here.
    let edit = EditWeights {
        del: w(1),
        ins: w(0),
        sub: w(2),
        trans: w(3),
    };
    // Same story for Jaro: callers pass (a, b, t), the kernel consumes
    // (b, a, t).
    let jw = [w(1), w(0), w(2)];

    let cap = if method.is_edit_based() || opts.max_dist.is_finite() {
        opts.max_dist
    } else {
        0.0
    };

    Ok(KernelParams {
        edit,
        jw,
        q: opts.q,
        p: opts.p,
        cap,
    })
}
