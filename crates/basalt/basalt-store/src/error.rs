use crate::layout::SYMBOL_LEN;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Region creation or attach failed at the OS level (permissions, name
    /// collision, missing region). Caller decides: reclaim (unlink and
    /// retry) or abort.
    #[error("failed to allocate or attach book region '{path}'")]
    Allocation {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The region exists but this build cannot safely interpret it
    /// (magic/version/slot-size/symbol-table mismatch). Fatal at startup.
    #[error("book region layout incompatible: {0}")]
    Incompatible(&'static str),

    /// The symbol has no slot in the attached region.
    #[error("symbol '{0}' has no slot in the book region")]
    UnknownSymbol(String),

    /// The symbol does not fit the fixed-width slot identifier.
    #[error("symbol '{0}' is not a 1..={SYMBOL_LEN} byte ASCII identifier")]
    InvalidSymbol(String),

    /// Every bounded torn-read retry raced a concurrent write. Callers
    /// retry on their own cadence or skip the cycle; the store never spins
    /// unboundedly.
    #[error("torn read persisted after {attempts} attempts")]
    InconsistentRead { attempts: usize },
}
