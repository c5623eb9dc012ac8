//! Lifecycle hook slots.
//!
//! Each slot holds an ordered list of callbacks. An empty slot is the
//! identity. Callbacks run one after the other and the first error stops the
//! slot and the surrounding lifecycle call.

use super::{ModelError, Record};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookSlot {
    BeforeValidation,
    AfterValidation,
    BeforeCreate,
    BeforeUpdate,
    BeforeDestroy,
    BeforeSave,
    AfterCreate,
    AfterUpdate,
    AfterDestroy,
    AfterSave,
}

impl HookSlot {
    pub const ALL: [HookSlot; 10] = [
        HookSlot::BeforeValidation,
        HookSlot::AfterValidation,
        HookSlot::BeforeCreate,
        HookSlot::BeforeUpdate,
        HookSlot::BeforeDestroy,
        HookSlot::BeforeSave,
        HookSlot::AfterCreate,
        HookSlot::AfterUpdate,
        HookSlot::AfterDestroy,
        HookSlot::AfterSave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookSlot::BeforeValidation => "beforeValidation",
            HookSlot::AfterValidation => "afterValidation",
            HookSlot::BeforeCreate => "beforeCreate",
            HookSlot::BeforeUpdate => "beforeUpdate",
            HookSlot::BeforeDestroy => "beforeDestroy",
            HookSlot::BeforeSave => "beforeSave",
            HookSlot::AfterCreate => "afterCreate",
            HookSlot::AfterUpdate => "afterUpdate",
            HookSlot::AfterDestroy => "afterDestroy",
            HookSlot::AfterSave => "afterSave",
        }
    }
}

impl fmt::Display for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type HookFn = Arc<dyn Fn(&mut Record) -> Result<(), ModelError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    slots: BTreeMap<HookSlot, Vec<HookFn>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slot: HookSlot, hook: HookFn) {
        self.slots.entry(slot).or_default().push(hook);
    }

    pub fn len(&self, slot: HookSlot) -> usize {
        self.slots.get(&slot).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Vec::is_empty)
    }

    /// Invoke every callback of `slot` in registration order.
    pub fn run(&self, slot: HookSlot, record: &mut Record) -> Result<(), ModelError> {
        let Some(hooks) = self.slots.get(&slot) else {
            return Ok(());
        };
        log::trace!("running {} {slot} hook(s)", hooks.len());
        for hook in hooks {
            hook(record)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(slot, hooks)| (slot.as_str(), hooks.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_names_are_unique() {
        let mut names: Vec<_> = HookSlot::ALL.iter().map(HookSlot::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_push_keeps_order_per_slot() {
        let mut hooks = Hooks::new();
        assert!(hooks.is_empty());
        hooks.push(HookSlot::BeforeSave, Arc::new(|_| Ok(())));
        hooks.push(HookSlot::BeforeSave, Arc::new(|_| Ok(())));
        assert_eq!(hooks.len(HookSlot::BeforeSave), 2);
        assert_eq!(hooks.len(HookSlot::AfterSave), 0);
    }
}
