//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌─────────────────┬───────────┬──────────┬─────────────────┐ │
//! │  │ StateId         │ can_enter │ on_enter │ on_update       │ │
//! │  ├─────────────────┼───────────┼──────────┼─────────────────┤ │
//! │  │ Empty           │ -         │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ PackageDetected │ -         │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ Opened          │ fn(&ctx)  │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  └─────────────────┴───────────┴──────────┴─────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine checks the next state's
//! `can_enter` guard, runs `on_exit` for the current state, then
//! `on_enter` for the next, and updates the current pointer.  A refused
//! transition leaves everything as it was.  All functions receive the
//! [`BoxContext`], which holds sensor readings, the [`BoxState`] with its
//! OTP record, config, and timing.
//!
//! [`BoxState`]: context::BoxState

pub mod context;
pub mod states;

use core::fmt;

use context::BoxContext;
use log::{info, warn};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all box states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Empty = 0,
    PackageDetected = 1,
    Opened = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::PackageDetected => "PackageDetected",
            Self::Opened => "Opened",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut BoxContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut BoxContext) -> Option<StateId>;

/// Entry guard.  Returns `false` when the context cannot support the state.
pub type StateGuardFn = fn(&BoxContext) -> bool;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub can_enter: Option<StateGuardFn>,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]).  The mutable
/// [`BoxContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut BoxContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        ctx.state_entered_at = ctx.now;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)` and the guard allows it, execute the
    ///    transition: `on_exit(current)` → update pointer → `on_enter(next)`.
    ///
    /// At most one transition happens per tick.
    pub fn tick(&mut self, ctx: &mut BoxContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition, bypassing `on_update`.
    ///
    /// Returns `false` if the next state's guard refused it.  Asking for
    /// the current state is a no-op that succeeds.
    #[must_use]
    pub fn force_transition(&mut self, next: StateId, ctx: &mut BoxContext) -> bool {
        if next as usize == self.current {
            return true;
        }
        self.transition(next, ctx)
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut BoxContext) -> bool {
        let next_idx = next_id as usize;

        let allowed = match self.table[next_idx].can_enter {
            Some(guard) => guard(ctx),
            None => true,
        };
        if !allowed {
            warn!(
                "FSM transition refused: {} -> {}",
                self.table[self.current].name, self.table[next_idx].name
            );
            return false;
        }

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        ctx.state_entered_at = ctx.now;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        true
    }
}
