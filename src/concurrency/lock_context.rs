use std::fmt;

use crate::common::{PageId, Result};

/// Requested access to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

/// Acquire/release hooks the tree calls around every node access.
///
/// Implementations may block in `acquire` or fail it; a failure aborts the
/// tree operation and propagates unchanged.
pub trait LockContext: Send + Sync {
    fn acquire(&self, page_id: PageId, mode: LockMode) -> Result<()>;

    fn release(&self, page_id: PageId, mode: LockMode);
}

/// Null-object lock context: every request is granted immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLockContext;

impl LockContext for NoopLockContext {
    #[inline]
    fn acquire(&self, _page_id: PageId, _mode: LockMode) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn release(&self, _page_id: PageId, _mode: LockMode) {}
}

/// A held lock on one page, released when dropped.
pub struct NodeLock<'a> {
    ctx: &'a dyn LockContext,
    page_id: PageId,
    mode: LockMode,
}

impl<'a> NodeLock<'a> {
    pub fn acquire(ctx: &'a dyn LockContext, page_id: PageId, mode: LockMode) -> Result<Self> {
        ctx.acquire(page_id, mode)?;
        Ok(Self { ctx, page_id, mode })
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for NodeLock<'_> {
    fn drop(&mut self) {
        self.ctx.release(self.page_id, self.mode);
    }
}
