//! Call context for handlers.
//!
//! A [`Context`] carries cancellation, an optional deadline and typed ambient
//! values from the caller to the handler. The registry threads it through
//! unchanged; whether a handler honours it is up to the handler.
//!
//! Contexts form a chain: a child sees its parents' cancellation, deadline
//! and values, and a deadline can only get tighter down the chain.
//!
//! # Example
//!
//! ```ignore
//! fn find_exam(svc: &ExamService, ctx: &Context, req: ExamRequest) -> Result<Exam, BoxError> {
//!     ctx.check()?;
//!     let tenant = ctx.value::<TenantId>();
//!     svc.load(tenant, &req.id)
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ContextError;

/// Context passed to every handler.
///
/// `Context` is `Clone` and cheap to share across threads.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Node>,
}

struct Node {
    parent: Option<Context>,
    /// Set by the [`CancelHandle`] of this node only.
    cancelled: AtomicBool,
    /// Effective deadline (already merged with the parent's).
    deadline: Option<Instant>,
    value: Option<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl Context {
    /// Root context: never cancelled, no deadline, no values.
    pub fn background() -> Self {
        Self::from_node(None, None, None)
    }

    fn from_node(
        parent: Option<Context>,
        deadline: Option<Instant>,
        value: Option<(TypeId, Arc<dyn Any + Send + Sync>)>,
    ) -> Self {
        Self {
            inner: Arc::new(Node {
                parent,
                cancelled: AtomicBool::new(false),
                deadline,
                value,
            }),
        }
    }

    /// Derive a child that can be cancelled through the returned handle.
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let child = Self::from_node(Some(self.clone()), self.deadline(), None);
        let handle = CancelHandle {
            node: Arc::clone(&child.inner),
        };
        (child, handle)
    }

    /// Derive a cancellable child that expires at `deadline`.
    ///
    /// A parent deadline that is earlier still applies.
    pub fn with_deadline(&self, deadline: Instant) -> (Context, CancelHandle) {
        let effective = match self.deadline() {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        let child = Self::from_node(Some(self.clone()), Some(effective), None);
        let handle = CancelHandle {
            node: Arc::clone(&child.inner),
        };
        (child, handle)
    }

    /// Derive a cancellable child that expires after `timeout`.
    ///
    /// A timeout too large to represent as an `Instant` adds no deadline; the
    /// child keeps its parent's.
    pub fn with_timeout(&self, timeout: Duration) -> (Context, CancelHandle) {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Derive a child carrying `value`. A later value of the same type shadows
    /// earlier ones.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Context {
        Self::from_node(
            Some(self.clone()),
            self.deadline(),
            Some((TypeId::of::<T>(), Arc::new(value))),
        )
    }

    /// Nearest value of type `T` in the chain.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let wanted = TypeId::of::<T>();
        let mut node = &self.inner;
        loop {
            if let Some((id, value)) = &node.value {
                if *id == wanted {
                    return value.downcast_ref::<T>();
                }
            }
            node = &node.parent.as_ref()?.inner;
        }
    }

    /// Effective deadline, if any.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Whether this context or any parent has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        let mut node = &self.inner;
        loop {
            if node.cancelled.load(Ordering::Acquire) {
                return true;
            }
            match &node.parent {
                Some(parent) => node = &parent.inner,
                None => return false,
            }
        }
    }

    /// Why the context is done, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err` once the context is done. Handy as `ctx.check()?` in handlers.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline())
            .finish_non_exhaustive()
    }
}

/// Cancels the context it was created with, and every context derived from it.
#[derive(Clone)]
pub struct CancelHandle {
    node: Arc<Node>,
}

impl CancelHandle {
    /// Cancel. Idempotent.
    pub fn cancel(&self) {
        self.node.cancelled.store(true, Ordering::Release);
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.node.cancelled.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TenantId(&'static str);

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_children() {
        let root = Context::background();
        let (ctx, cancel) = root.with_cancel();
        let child = ctx.with_value(TenantId("acme"));

        assert!(!child.is_cancelled());
        cancel.cancel();

        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());
        assert_eq!(child.err(), Some(ContextError::Cancelled));
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();
        cancel.clone().cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn test_expired_deadline() {
        let (ctx, _cancel) = Context::background().with_deadline(Instant::now());
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[test]
    fn test_deadline_only_tightens() {
        let (outer, _c1) = Context::background().with_timeout(Duration::from_secs(1));
        let (inner, _c2) = outer.with_timeout(Duration::from_secs(3600));

        assert_eq!(inner.deadline(), outer.deadline());

        let (tighter, _c3) = outer.with_timeout(Duration::from_millis(1));
        assert!(tighter.deadline() < outer.deadline());
    }

    #[test]
    fn test_timeout_overflow_is_unbounded() {
        let (ctx, cancel) = Context::background().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());

        cancel.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));

        let (outer, _c1) = Context::background().with_timeout(Duration::from_secs(60));
        let (inner, _c2) = outer.with_timeout(Duration::MAX);
        assert_eq!(inner.deadline(), outer.deadline());
    }

    #[test]
    fn test_values_are_inherited_and_shadowed() {
        let ctx = Context::background().with_value(TenantId("acme"));
        let (child, _cancel) = ctx.with_cancel();

        assert_eq!(child.value::<TenantId>(), Some(&TenantId("acme")));
        assert!(child.value::<u32>().is_none());

        let shadowed = child.with_value(TenantId("globex"));
        assert_eq!(shadowed.value::<TenantId>(), Some(&TenantId("globex")));
        assert_eq!(ctx.value::<TenantId>(), Some(&TenantId("acme")));
    }

    #[test]
    fn test_context_is_clone_and_send() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();
        assert_send_sync::<CancelHandle>();

        let (ctx, cancel) = Context::background().with_cancel();
        let copy = ctx.clone();
        cancel.cancel();
        assert!(copy.is_cancelled());
    }
}
