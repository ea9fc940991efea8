//! Last-applied drop rate per storm.

/// Applied state of one storm. `rate == None` means no rule is installed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StormState {
    pub rate: Option<f64>,
}

/// One [`StormState`] per configured storm, indexed by configuration order.
///
/// The store is sized once at construction and never grows or shrinks.
#[derive(Debug, Clone, PartialEq)]
pub struct StormStateStore {
    states: Box<[StormState]>,
}

impl StormStateStore {
    /// A store with `storms` entries, all unset.
    #[must_use]
    pub fn new(storms: usize) -> Self {
        Self {
            states: vec![StormState::default(); storms].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Applied rate of storm `index`, `None` when unset or out of range.
    #[must_use]
    pub fn rate(&self, index: usize) -> Option<f64> {
        self.states.get(index).and_then(|s| s.rate)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StormState> {
        self.states.get(index)
    }

    /// Record `rate` as applied for storm `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; the reconciler only commits indices
    /// it enumerated from the same configuration.
    pub(crate) fn commit(&mut self, index: usize, rate: f64) {
        self.states[index].rate = Some(rate);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StormState> {
        self.states.iter()
    }
}
