//! The seam between the shared build skeleton and each asset operation.

use rgbpp_primitives::{
    context::NetworkContext,
    types::{CellDep, LiveCell, OutPoint, Script},
};

use crate::errors::BuildResult;

/// Which cells an operation consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSelection {
    /// Every typeless capacity cell under `lock`.
    Capacity {
        /// The owning lock.
        lock: Script,
    },

    /// Every cell carrying `type_` under any of `locks`. Each lock must yield at least one cell.
    Assets {
        /// The owning locks, usually one seal lock per spent seal.
        locks: Vec<Script>,

        /// The asset type.
        type_: Script,
    },

    /// Exactly these cells.
    Exact(Vec<OutPoint>),
}

/// The lock of an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLock {
    /// A seal lock pointing at the next free output of the binding transaction that is still to
    /// be built. Binding outputs are handed out from 1 upwards, output 0 carries the commitment.
    NextSeal,

    /// A fully formed lock.
    Script(Script),
}

/// How much capacity an output gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCapacity {
    /// The minimum the output occupies.
    Min,

    /// A fixed amount, which must be at least the minimum.
    Exact(u64),

    /// Whatever is left of the inputs after every other output and the fee.
    Remainder,
}

/// One output an operation wants to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    /// The lock.
    pub lock: OutputLock,

    /// The type script.
    pub type_: Option<Script>,

    /// The cell data.
    pub data: Vec<u8>,

    /// The capacity rule.
    pub capacity: OutputCapacity,
}

impl OutputSpec {
    /// A seal-locked typed output at its minimum capacity.
    pub fn sealed(type_: Script, data: Vec<u8>) -> Self {
        Self {
            lock: OutputLock::NextSeal,
            type_: Some(type_),
            data,
            capacity: OutputCapacity::Min,
        }
    }

    /// A typed output under an explicit lock at its minimum capacity.
    pub fn locked(lock: Script, type_: Script, data: Vec<u8>) -> Self {
        Self {
            lock: OutputLock::Script(lock),
            type_: Some(type_),
            data,
            capacity: OutputCapacity::Min,
        }
    }

    /// Makes this output absorb the fee.
    pub fn remainder(mut self) -> Self {
        self.capacity = OutputCapacity::Remainder;
        self
    }

    /// Gives this output a fixed capacity.
    pub fn exact(mut self, capacity: u64) -> Self {
        self.capacity = OutputCapacity::Exact(capacity);
        self
    }
}

/// An asset operation plugged into [`SealBuilder`](crate::builder::SealBuilder).
///
/// A payload describes what is consumed and what is created. The builder does the rest: seal
/// numbering, witnesses, fees, the change output and the commitment.
pub trait AssetPayload {
    /// The cells to consume.
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection>;

    /// The outputs to create, given the selected inputs in consumption order.
    ///
    /// Exactly one output must use [`OutputCapacity::Remainder`] unless [`Self::change_lock`]
    /// returns a lock, in which case none may.
    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>>;

    /// The lock of a trailing typeless change output that absorbs the fee.
    fn change_lock(&self) -> Option<Script> {
        None
    }

    /// Cell deps needed by the scripts of this operation, besides the lock deps added at
    /// finalization.
    fn cell_deps(&self, _ctx: &NetworkContext) -> Vec<CellDep> {
        Vec::new()
    }

    /// Whether a shortfall on the change output may be covered by a paymaster cell.
    fn allow_paymaster(&self) -> bool {
        false
    }
}
