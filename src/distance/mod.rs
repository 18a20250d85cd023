pub mod edit;
pub mod jaro;
pub mod phonetic;
pub mod qgram;

use rustc_hash::FxHashMap;

use crate::types::Unit;

/// Per-worker scratch space. Each batch worker owns one, so kernels never
/// allocate in their inner loops and never share state across threads.
pub(crate) struct Workspace<T: Unit> {
    pub rows: edit::RowBuf,
    pub mat: Vec<f64>,
    pub da: FxHashMap<T, usize>,
    pub flags: jaro::FlagBuf,
    pub tree: qgram::QgramTree<T>,
}

impl<T: Unit> Workspace<T> {
    pub fn new() -> Workspace<T> {
        Workspace {
            rows: edit::RowBuf::default(),
            mat: Vec::new(),
            da: FxHashMap::default(),
            flags: jaro::FlagBuf::default(),
            tree: qgram::QgramTree::new(),
        }
    }
}
