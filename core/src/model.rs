//! Host model interfaces and post-update observer registration
//!
//! The render runtime owns the model. The core only reads parameter indices
//! and writes parameter values through [`ParameterTable`], and runs its tick
//! from a post-update observer registered through [`FrameHost`].

use tracing::debug;

/// Animatable parameter table of a model
pub trait ParameterTable {
    /// Number of parameters
    fn parameter_count(&self) -> usize;

    /// Index of the parameter with the given id, if present
    fn parameter_index(&self, id: &str) -> Option<usize>;

    /// Current value of a parameter, `None` for out-of-range indices
    fn parameter_value(&self, index: usize) -> Option<f32>;

    /// Set a parameter value. Out-of-range indices are ignored.
    fn set_parameter_value_by_index(&mut self, index: usize, value: f32);
}

/// Identifier of a registered post-update observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Callback run once per frame after the model's own update
pub type PostUpdateHook = Box<dyn FnMut(&mut dyn ParameterTable) + Send>;

/// Render runtime that accepts post-update observers
pub trait FrameHost {
    /// Register `hook` to run after every model update
    fn subscribe_post_update(&mut self, hook: PostUpdateHook) -> HookId;

    /// Remove a previously registered hook. Returns `false` if it was unknown.
    fn unsubscribe_post_update(&mut self, id: HookId) -> bool;
}

/// Ordered registry of post-update observers.
///
/// Hosts embed this and call [`FrameHooks::run`] after their per-frame
/// model update.
#[derive(Default)]
pub struct FrameHooks {
    next_id: u64,
    hooks: Vec<(HookId, PostUpdateHook)>,
}

impl FrameHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every registered hook in registration order
    pub fn run(&mut self, model: &mut dyn ParameterTable) {
        for (_, hook) in self.hooks.iter_mut() {
            hook(model);
        }
    }
}

impl FrameHost for FrameHooks {
    fn subscribe_post_update(&mut self, hook: PostUpdateHook) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.push((id, hook));
        debug!("Registered post-update hook {:?}", id);
        id
    }

    fn unsubscribe_post_update(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _)| *hook_id != id);
        let removed = self.hooks.len() != before;
        if removed {
            debug!("Removed post-update hook {:?}", id);
        }
        removed
    }
}
