//! Ordered ownership of device-bound resources.
//!
//! [`ResourceSet`] holds the handles one owner (a tile, the compositor)
//! created, and releases them in reverse creation order.  [`ResourceRegistry`]
//! records which lifecycle groups are currently up, so bring-up and teardown
//! always mirror each other.

use std::fmt;

use crate::infrastructure::graphics::{GraphicsDevice, ResourceHandle};

/// Handles owned by one component, in creation order.
#[derive(Debug, Default)]
pub struct ResourceSet {
    handles: Vec<ResourceHandle>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `handle` and hands it back for immediate use.
    pub fn track(&mut self, handle: ResourceHandle) -> ResourceHandle {
        self.handles.push(handle);
        handle
    }

    /// Releases one handle early.  Returns `false` if it was not tracked.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice, handle: ResourceHandle) -> bool {
        match self.handles.iter().rposition(|h| *h == handle) {
            Some(index) => {
                self.handles.remove(index);
                device.release(handle);
                true
            }
            None => false,
        }
    }

    /// Releases every handle, newest first.
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        while let Some(handle) = self.handles.pop() {
            device.release(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.handles.contains(&handle)
    }
}

/// Lifecycle groups, in bring-up order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceGroup {
    Device,
    DeviceResources,
    WindowResources,
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceGroup::Device => "device",
            ResourceGroup::DeviceResources => "device resources",
            ResourceGroup::WindowResources => "window resources",
        };
        f.write_str(s)
    }
}

/// Stack of the groups that are currently up.
///
/// Teardown pops the stack, so groups always come down newest first no
/// matter which failure path triggered it.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    stack: Vec<ResourceGroup>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `group` as up.  Pushing a group that is already up is a no-op.
    pub fn push(&mut self, group: ResourceGroup) {
        if !self.contains(group) {
            self.stack.push(group);
        }
    }

    /// Removes and returns the newest group.
    pub fn pop(&mut self) -> Option<ResourceGroup> {
        self.stack.pop()
    }

    /// Returns the newest group without removing it.
    pub fn top(&self) -> Option<ResourceGroup> {
        self.stack.last().copied()
    }

    pub fn contains(&self, group: ResourceGroup) -> bool {
        self.stack.contains(&group)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
