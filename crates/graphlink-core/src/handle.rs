//! Native resource handles.
//!
//! A [`NativeHandle`] wraps exactly one native pointer. It binds at most
//! once and releases at most once; every later access fails with
//! [`Error::Disposed`]. Releasing an owned handle hands the pointer to the
//! bridge's release queue; releasing a borrowed one only invalidates it.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{RawFlatTuple, RawLogicalType, RawQueryResult, RawString, RawValue};
use tracing::debug;

use crate::bridge::Bridge;
use crate::release::{Resource, ResourceKind};

/// Who frees the native memory behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The handle destroys the resource on release.
    Owned,
    /// The engine keeps ownership; release is a no-op natively.
    Borrowed,
}

/// A native descriptor that can sit in a [`NativeHandle`].
pub trait RawResource: Copy + fmt::Debug {
    /// The kind reported in errors.
    const KIND: ResourceKind;

    /// Wraps the descriptor for the release queue.
    fn into_resource(self) -> Resource;

    /// Returns true for a null descriptor.
    fn is_null(&self) -> bool;

    /// The ownership the engine declared for this descriptor.
    fn declared_ownership(&self) -> Ownership {
        Ownership::Owned
    }
}

fn ownership_flag(owned_by_engine: bool) -> Ownership {
    if owned_by_engine {
        Ownership::Borrowed
    } else {
        Ownership::Owned
    }
}

impl RawResource for RawValue {
    const KIND: ResourceKind = ResourceKind::Value;

    fn into_resource(self) -> Resource {
        Resource::Value(self)
    }

    fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    fn declared_ownership(&self) -> Ownership {
        ownership_flag(self.owned_by_engine)
    }
}

impl RawResource for RawLogicalType {
    const KIND: ResourceKind = ResourceKind::LogicalType;

    fn into_resource(self) -> Resource {
        Resource::LogicalType(self)
    }

    fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl RawResource for RawString {
    const KIND: ResourceKind = ResourceKind::String;

    fn into_resource(self) -> Resource {
        Resource::String(self)
    }

    fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl RawResource for RawQueryResult {
    const KIND: ResourceKind = ResourceKind::QueryResult;

    fn into_resource(self) -> Resource {
        Resource::QueryResult(self)
    }

    fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    fn declared_ownership(&self) -> Ownership {
        ownership_flag(self.owned_by_engine)
    }
}

impl RawResource for RawFlatTuple {
    const KIND: ResourceKind = ResourceKind::FlatTuple;

    fn into_resource(self) -> Resource {
        Resource::FlatTuple(self)
    }

    fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    fn declared_ownership(&self) -> Ownership {
        ownership_flag(self.owned_by_engine)
    }
}

#[derive(Debug, Clone, Copy)]
enum HandleState<R> {
    Unbound,
    Bound { raw: R, ownership: Ownership },
    Released,
}

/// Exclusive owner of one native pointer.
///
/// The lifetime ties borrowed handles to whatever owns the underlying
/// memory. Handles can move between threads but are never shared.
pub struct NativeHandle<'a, R: RawResource> {
    bridge: Bridge,
    state: HandleState<R>,
    _marker: PhantomData<(&'a (), Cell<()>)>,
}

/// A handle to a native value.
pub type ValueHandle<'a> = NativeHandle<'a, RawValue>;

impl<'a, R: RawResource> NativeHandle<'a, R> {
    /// Creates a handle with nothing bound yet.
    pub fn unbound(bridge: &Bridge) -> Self {
        Self {
            bridge: bridge.clone(),
            state: HandleState::Unbound,
            _marker: PhantomData,
        }
    }

    /// Creates a bound handle with the ownership the descriptor declares.
    pub fn from_raw(bridge: &Bridge, raw: R) -> Self {
        Self::with_ownership(bridge, raw, raw.declared_ownership())
    }

    /// Creates a bound handle with explicit ownership.
    pub fn with_ownership(bridge: &Bridge, raw: R, ownership: Ownership) -> Self {
        Self {
            bridge: bridge.clone(),
            state: HandleState::Bound { raw, ownership },
            _marker: PhantomData,
        }
    }

    /// Binds a pointer. A handle binds only once, even after release.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyBound`] if this handle was bound before.
    pub fn bind(&mut self, raw: R, ownership: Ownership) -> Result<()> {
        match self.state {
            HandleState::Unbound => {
                self.state = HandleState::Bound { raw, ownership };
                Ok(())
            }
            HandleState::Bound { .. } | HandleState::Released => {
                Err(Error::AlreadyBound(R::KIND.name()))
            }
        }
    }

    /// Returns true if the handle is unbound, released or null.
    pub fn is_invalid(&self) -> bool {
        match &self.state {
            HandleState::Bound { raw, .. } => raw.is_null(),
            HandleState::Unbound | HandleState::Released => true,
        }
    }

    /// Returns the bound pointer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the handle is invalid.
    pub fn raw(&self) -> Result<R> {
        match &self.state {
            HandleState::Bound { raw, .. } if !raw.is_null() => Ok(*raw),
            _ => Err(Error::Disposed(R::KIND.name())),
        }
    }

    /// Returns the ownership of a bound handle.
    pub fn ownership(&self) -> Option<Ownership> {
        match &self.state {
            HandleState::Bound { ownership, .. } => Some(*ownership),
            HandleState::Unbound | HandleState::Released => None,
        }
    }

    /// Returns the bridge this handle releases through.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Releases the pointer. Owned pointers are queued for destruction.
    ///
    /// Calling this more than once is a no-op.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.state, HandleState::Released) {
            HandleState::Bound {
                raw,
                ownership: Ownership::Owned,
            } if !raw.is_null() => {
                debug!(kind = R::KIND.name(), ?raw, "queueing native release");
                self.bridge.submit_release(raw.into_resource());
            }
            HandleState::Unbound => self.state = HandleState::Unbound,
            _ => {}
        }
    }
}

impl<R: RawResource> Drop for NativeHandle<'_, R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: RawResource> fmt::Debug for NativeHandle<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &R::KIND)
            .field("state", &self.state)
            .finish()
    }
}
