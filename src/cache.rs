//! Cycle-safe lazy computed properties
//!
//! Derived facts about model elements (resolved base types, key sets, member
//! tables) are computed on first access, memoized, and served to concurrent
//! readers. Declarations may legally form cycles, so the computation protocol
//! has to terminate on cyclic input and leave every participant resolved to a
//! caller-supplied fallback instead of recursing forever.

use parking_lot::{ReentrantMutex, RwLock};
use std::convert::Infallible;

// =============================================================================
// Cell State
// =============================================================================

/// Lifecycle of a single computed property.
///
/// Transitions are forward-only while a computation is in flight; `Resolved`
/// is final until an explicit [`MemoCell::clear`].
#[derive(Debug)]
enum State<V> {
    /// Never computed (or cleared).
    Unresolved,
    /// A computation is running on the owning thread.
    FirstPass,
    /// The owning thread re-entered this cell: a cycle runs through it.
    SecondPass,
    /// Final value, served lock-free to readers.
    Resolved(V),
}

/// Which leg of the protocol a (re-)entry lands on.
enum Phase {
    /// First entry: run the computation.
    Compute,
    /// Re-entered while computing: run once more so every cycle participant
    /// gets marked, then commit the fallback.
    Recompute,
    /// Re-entered twice: commit the fallback immediately.
    Fallback,
}

// =============================================================================
// Cycle Groups
// =============================================================================

/// Shared serialization token for one cycle-capable property kind.
///
/// All cells of that kind in a model resolve under the same token, so the
/// recursive walk one thread starts can re-enter cells that thread already
/// holds while every other thread waits at the boundary. Acyclic property
/// kinds skip the group and serialize per cell.
#[derive(Debug, Default)]
pub struct CycleGroup {
    token: ReentrantMutex<()>,
}

impl CycleGroup {
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// Memo Cells
// =============================================================================

/// A once-only lazy value that tolerates recursive (cyclic) computation.
///
/// Resolution protocol, per entry of the owning thread:
/// - `Unresolved`: mark `FirstPass`, run `compute`. If the cell is still in
///   `FirstPass` afterwards, its result is stored; if a cycle closed beneath
///   the computation and already resolved the cell, the result is discarded
///   in favor of the stored value.
/// - `FirstPass` (re-entered): mark `SecondPass`, run `compute` again for its
///   marking side effects only, then store `on_cycle()` unless a deeper entry
///   already resolved the cell.
/// - `SecondPass` (re-entered again): store `on_cycle()` immediately.
///
/// A failed or unwinding computation restores the previous marker, so
/// failures are never memoized and the next reader retries.
#[derive(Debug)]
pub struct MemoCell<V> {
    state: RwLock<State<V>>,
    /// Serialization token for cells resolved without a [`CycleGroup`].
    local: ReentrantMutex<()>,
}

impl<V> Default for MemoCell<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoCell<V> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Unresolved),
            local: ReentrantMutex::new(()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(&*self.state.read(), State::Resolved(_))
    }

    /// Drop a resolved value so the next reader recomputes it.
    ///
    /// Returns whether the cell is unresolved afterwards. Refuses (returns
    /// `false`) while a computation is in flight; the in-flight result will
    /// be stored as usual.
    pub fn clear(&self) -> bool {
        let mut state = self.state.write();
        match &*state {
            State::Resolved(_) | State::Unresolved => {
                *state = State::Unresolved;
                true
            }
            State::FirstPass | State::SecondPass => false,
        }
    }
}

impl<V: Clone> MemoCell<V> {
    /// Peek at the resolved value without computing.
    pub fn get(&self) -> Option<V> {
        match &*self.state.read() {
            State::Resolved(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Resolve a property whose computation never re-enters this cell.
    ///
    /// Panics if `compute` does re-enter it; computations that can recurse
    /// must resolve through [`Self::get_or_compute_cyclic`].
    pub fn get_or_compute(&self, compute: impl FnOnce() -> V) -> V {
        always(self.try_get_or_compute(|| Ok(compute())))
    }

    /// Fallible form of [`Self::get_or_compute`]. An `Err` is propagated and
    /// never memoized.
    pub fn try_get_or_compute<E>(&self, compute: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        self.resolve(&self.local, compute, || {
            panic!("computed property re-entered its own computation; cyclic properties must resolve through get_or_compute_cyclic")
        })
    }

    /// Resolve a property whose computation may recurse back into this cell
    /// through other declarations. `on_cycle` supplies the value every
    /// participant of a detected cycle resolves to.
    pub fn get_or_compute_cyclic(
        &self,
        group: &CycleGroup,
        compute: impl FnOnce() -> V,
        on_cycle: impl FnOnce() -> V,
    ) -> V {
        always(self.try_get_or_compute_cyclic(group, || Ok(compute()), on_cycle))
    }

    /// Fallible form of [`Self::get_or_compute_cyclic`]. An `Err` unwinds the
    /// in-flight markers and is never memoized; `on_cycle` itself is total.
    pub fn try_get_or_compute_cyclic<E>(
        &self,
        group: &CycleGroup,
        compute: impl FnOnce() -> Result<V, E>,
        on_cycle: impl FnOnce() -> V,
    ) -> Result<V, E> {
        self.resolve(&group.token, compute, on_cycle)
    }

    fn resolve<E>(
        &self,
        token: &ReentrantMutex<()>,
        compute: impl FnOnce() -> Result<V, E>,
        on_cycle: impl FnOnce() -> V,
    ) -> Result<V, E> {
        // Fast path: resolved cells are served under the read lock alone.
        if let Some(v) = self.get() {
            return Ok(v);
        }

        let _serialized = token.lock();

        // Re-read under the token; another thread may have resolved the cell
        // while this one was blocked, and a cleared cell starts over.
        let phase = {
            let state = self.state.read();
            match &*state {
                State::Resolved(v) => return Ok(v.clone()),
                State::Unresolved => Phase::Compute,
                State::FirstPass => Phase::Recompute,
                State::SecondPass => Phase::Fallback,
            }
        };

        // Only the thread holding the token moves the markers below, and
        // `clear` refuses while one is set, so reads between transitions are
        // stable. The state lock is never held across `compute`.
        match phase {
            Phase::Compute => {
                *self.state.write() = State::FirstPass;
                let mut rollback = Rollback {
                    state: &self.state,
                    armed: true,
                    reentered: false,
                };
                let computed = compute()?;
                rollback.disarm();

                let mut state = self.state.write();
                if let State::Resolved(v) = &*state {
                    // A cycle closed beneath the computation and already
                    // committed the fallback; the fresh result loses.
                    return Ok(v.clone());
                }
                *state = State::Resolved(computed.clone());
                Ok(computed)
            }
            Phase::Recompute => {
                *self.state.write() = State::SecondPass;
                let mut rollback = Rollback {
                    state: &self.state,
                    armed: true,
                    reentered: true,
                };
                compute()?;
                rollback.disarm();

                {
                    let state = self.state.read();
                    if let State::Resolved(v) = &*state {
                        return Ok(v.clone());
                    }
                }
                let fallback = on_cycle();
                *self.state.write() = State::Resolved(fallback.clone());
                Ok(fallback)
            }
            Phase::Fallback => {
                let fallback = on_cycle();
                *self.state.write() = State::Resolved(fallback.clone());
                Ok(fallback)
            }
        }
    }
}

/// Restores the in-flight marker when a computation fails or unwinds, unless
/// a deeper entry already resolved the cell.
struct Rollback<'a, V> {
    state: &'a RwLock<State<V>>,
    armed: bool,
    /// `true` rolls `SecondPass` back to `FirstPass`; `false` rolls
    /// `FirstPass` back to `Unresolved`.
    reentered: bool,
}

impl<V> Rollback<'_, V> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<V> Drop for Rollback<'_, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.write();
        match (&*state, self.reentered) {
            (State::FirstPass, false) => *state = State::Unresolved,
            (State::SecondPass, true) => *state = State::FirstPass,
            // A deeper entry committed a value; it stands, the failure only
            // propagates to the caller.
            _ => {}
        }
    }
}

fn always<V>(result: Result<V, Infallible>) -> V {
    match result {
        Ok(v) => v,
        Err(never) => match never {},
    }
}
