/// Angle estimation backend seam.
///
/// Angle computation happens outside this crate. The registry only owns one
/// estimator state per tracked tag: opened when the entry is created and
/// closed when it is removed.
use crate::radio::Address;

pub trait AngleEstimator {
    /// Per-tag estimator state.
    type State;

    fn open(&mut self, tag: &Address) -> Self::State;

    fn close(&mut self, state: Self::State);
}

/// Estimator used when no estimation backend is linked in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEstimator;

impl AngleEstimator for NullEstimator {
    type State = ();

    fn open(&mut self, _tag: &Address) {}

    fn close(&mut self, _state: ()) {}
}
