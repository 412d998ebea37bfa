//! Shared graphics context.
//!
//! The map engine and the 3D renderer draw into the same frame buffer through
//! one context. Both mutate its global state and neither knows about the
//! other, so the handle carries an explicit reset contract: whoever draws
//! second calls [`SharedContext::reset_state`] before issuing draws.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geolayer_common::Canvas;

/// Global pipeline state that any user of the context can disturb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlState {
    pub program: Option<u32>,
    pub depth_test: bool,
    pub blend: bool,
    pub cull_face: bool,
    pub viewport: [u32; 4],
}

impl GlState {
    /// Context defaults for a canvas.
    pub fn defaults(canvas: Canvas) -> Self {
        Self {
            program: None,
            depth_test: false,
            blend: false,
            cull_face: false,
            viewport: [0, 0, canvas.width, canvas.height],
        }
    }
}

/// One draw issued into the frame buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub frame: u64,
    pub source: String,
    /// State at the moment the draw was issued.
    pub state: GlState,
}

#[derive(Debug)]
struct ContextState {
    canvas: Canvas,
    antialias: bool,
    state: GlState,
    frame: u64,
    draws: Vec<DrawRecord>,
    resets: u64,
}

/// Cloneable capability handle to the one graphics context.
#[derive(Debug, Clone)]
pub struct SharedContext {
    inner: Arc<Mutex<ContextState>>,
}

impl SharedContext {
    pub fn new(canvas: Canvas, antialias: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ContextState {
                canvas,
                antialias,
                state: GlState::defaults(canvas),
                frame: 0,
                draws: Vec::new(),
                resets: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when both handles refer to the same context.
    pub fn same_context(&self, other: &SharedContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn canvas(&self) -> Canvas {
        self.lock().canvas
    }

    pub fn antialias(&self) -> bool {
        self.lock().antialias
    }

    pub fn state(&self) -> GlState {
        self.lock().state
    }

    /// Mutate the global state, as a draw call sequence would.
    pub fn update_state(&self, f: impl FnOnce(&mut GlState)) {
        f(&mut self.lock().state);
    }

    /// Restore every piece of global state to its defaults.
    pub fn reset_state(&self) {
        let mut ctx = self.lock();
        ctx.state = GlState::defaults(ctx.canvas);
        ctx.resets += 1;
    }

    /// Number of resets since creation.
    pub fn reset_count(&self) -> u64 {
        self.lock().resets
    }

    /// Start a new frame. The previous frame's draws are discarded.
    pub fn begin_frame(&self) -> u64 {
        let mut ctx = self.lock();
        ctx.frame += 1;
        ctx.draws.clear();
        ctx.frame
    }

    pub fn frame(&self) -> u64 {
        self.lock().frame
    }

    /// Issue a draw with the current state.
    pub fn draw(&self, source: impl Into<String>) {
        let mut ctx = self.lock();
        let record = DrawRecord {
            frame: ctx.frame,
            source: source.into(),
            state: ctx.state,
        };
        ctx.draws.push(record);
    }

    /// Clear the frame buffer.
    pub fn clear(&self) {
        self.lock().draws.clear();
    }

    /// Draws issued so far in the current frame.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.lock().draws.clone()
    }
}
