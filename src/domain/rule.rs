//! Rule contract: a boolean decision per tick index.

pub trait Rule {
    fn is_satisfied(&self, index: usize) -> bool;
}

impl<F> Rule for F
where
    F: Fn(usize) -> bool,
{
    fn is_satisfied(&self, index: usize) -> bool {
        self(index)
    }
}

/// Precomputed signals, one per tick. Ticks past the end are not satisfied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalRule {
    signals: Vec<bool>,
}

impl SignalRule {
    pub fn new(signals: Vec<bool>) -> Self {
        SignalRule { signals }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl Rule for SignalRule {
    fn is_satisfied(&self, index: usize) -> bool {
        self.signals.get(index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantRule(pub bool);

impl Rule for ConstantRule {
    fn is_satisfied(&self, _index: usize) -> bool {
        self.0
    }
}
