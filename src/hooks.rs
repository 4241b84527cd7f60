//! Extension hooks.
//!
//! Filter hooks receive a typed context and return it, possibly modified;
//! they run synchronously in registration order. Action hooks only observe.

use crate::unread::{CategoryFilter, UnreadCounts, UnreadFilter};
use crate::{Tid, Uid};
use parking_lot::RwLock;
use std::sync::Arc;

pub type FilterFn<C> = Arc<dyn Fn(C) -> C + Send + Sync>;
pub type ActionFn<C> = Arc<dyn Fn(&C) + Send + Sync>;

/// Context for `filter:topics.getUnreadTids`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadTidsContext {
    pub uid: Uid,
    pub tids: Vec<Tid>,
    pub cid: CategoryFilter,
    pub filter: UnreadFilter,
}

/// Context for `filter:topics.getUnreadCounts`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadCountsContext {
    pub uid: Uid,
    pub counts: UnreadCounts,
}

/// Context for `action:topics.markAsRead`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedReadContext {
    pub uid: Uid,
    pub tids: Vec<Tid>,
}

/// A named chain of transform functions.
pub struct FilterPoint<C> {
    name: &'static str,
    hooks: RwLock<Vec<FilterFn<C>>>,
}

impl<C> FilterPoint<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn register(&self, hook: impl Fn(C) -> C + Send + Sync + 'static) {
        self.hooks.write().push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Run every hook in order, threading the context through.
    pub fn fire(&self, context: C) -> C {
        // Snapshot so a hook may register further hooks without deadlocking.
        let hooks: Vec<FilterFn<C>> = self.hooks.read().clone();
        if !hooks.is_empty() {
            tracing::trace!(hook = self.name, count = hooks.len(), "Firing filter hooks");
        }
        hooks.iter().fold(context, |ctx, hook| hook(ctx))
    }
}

/// A named list of observers.
pub struct ActionPoint<C> {
    name: &'static str,
    hooks: RwLock<Vec<ActionFn<C>>>,
}

impl<C> ActionPoint<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn register(&self, hook: impl Fn(&C) + Send + Sync + 'static) {
        self.hooks.write().push(Arc::new(hook));
    }

    pub fn fire(&self, context: &C) {
        let hooks: Vec<ActionFn<C>> = self.hooks.read().clone();
        if !hooks.is_empty() {
            tracing::trace!(hook = self.name, count = hooks.len(), "Firing action hooks");
        }
        for hook in &hooks {
            hook(context);
        }
    }
}

/// Every hook point the unread engine exposes.
pub struct Hooks {
    pub unread_tids: FilterPoint<UnreadTidsContext>,
    pub unread_counts: FilterPoint<UnreadCountsContext>,
    pub mark_as_read: ActionPoint<MarkedReadContext>,
}

impl Hooks {
    pub fn new() -> Self {
        Self {
            unread_tids: FilterPoint::new("filter:topics.getUnreadTids"),
            unread_counts: FilterPoint::new("filter:topics.getUnreadCounts"),
            mark_as_read: ActionPoint::new("action:topics.markAsRead"),
        }
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}
