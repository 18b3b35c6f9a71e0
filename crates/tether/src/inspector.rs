//! Discovery aid logging the path of components a human points at.

use tether_config::LogLevel;

use crate::components::{ComponentPath, ComponentRegistry, ComponentTree};
use crate::telemetry::log_at;

const INSPECTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::inspector");

/// Keyboard modifiers held during a pointer notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift is held.
    pub shift: bool,
    /// Control is held.
    pub ctrl: bool,
    /// Alt is held.
    pub alt: bool,
}

impl Modifiers {
    /// Only Shift held.
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// Logs component paths so test authors can discover them.
///
/// The host forwards pointer notifications; nothing here affects dispatch.
#[derive(Debug)]
pub struct PathInspector<'a, T: ComponentTree + ?Sized> {
    registry: &'a ComponentRegistry<T::Node>,
    log_level: LogLevel,
}

impl<'a, T: ComponentTree + ?Sized> PathInspector<'a, T> {
    pub(crate) const fn new(registry: &'a ComponentRegistry<T::Node>, log_level: LogLevel) -> Self {
        Self {
            registry,
            log_level,
        }
    }

    /// Logs the path of a double-clicked component.
    pub fn on_double_click(&self, tree: &T, node: T::Node) -> Option<ComponentPath> {
        self.report(tree, node, "double-click")
    }

    /// Logs the path of a hovered component while Shift is held.
    pub fn on_hover(&self, tree: &T, node: T::Node, modifiers: Modifiers) -> Option<ComponentPath> {
        if !modifiers.shift {
            return None;
        }
        self.report(tree, node, "hover")
    }

    fn report(&self, tree: &T, node: T::Node, gesture: &str) -> Option<ComponentPath> {
        let Some(path) = self.registry.component_path(tree, node) else {
            log_at!(
                self.log_level,
                target: INSPECTOR_TARGET,
                gesture,
                ?node,
                "component is not under a registered root"
            );
            return None;
        };
        log_at!(self.log_level, target: INSPECTOR_TARGET, gesture, %path, "component path");
        Some(path)
    }
}
