//! Vectorized approximate string matching.
//!
//! Ten distance methods over Unicode code points or raw bytes (`osa`,
//! `lv`, `dl`, `hamming`, `lcs`, `qgram`, `cosine`, `jaccard`, `jw` and
//! `soundex`), driven by a recycling pairwise loop and a capped
//! nearest-match scan, both parallel.
//!
//! ```
//! use strdist::{nearest_match, pairwise_distance, Method, Options};
//!
//! let opts = Options::new();
//! let d = pairwise_distance(&[Some("kitten")], &[Some("sitting")], Method::Lv, &opts)?;
//! assert_eq!(d, vec![Some(3.0)]);
//!
//! let table = [Some("ba"), Some("bb")];
//! let hits = nearest_match(&[Some("aa")], &table, Method::Osa, &opts, 0, true)?;
//! assert_eq!(hits, vec![1]);
//! # Ok::<(), strdist::Error>(())
//! ```

mod batch;
mod config;
mod distance;
mod error;
mod options;
mod types;

pub use batch::{
    contains, distance, nearest_match, nearest_match_bytes, pairwise_distance,
    pairwise_distance_bytes, CancelToken,
};
pub use config::default_nthread;
pub use distance::phonetic::soundex_encode;
pub use distance::qgram::{qgrams, PairCount, QgramTree, Side};
pub use error::{Error, Result};
pub use options::{Method, Options};
pub use types::Unit;
