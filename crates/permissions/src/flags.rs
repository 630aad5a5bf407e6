use core::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::codec::Action;

/// Capabilities granted on a single menu item.
///
/// A fixed five-field record: new actions are added here, never through an
/// open-ended map. Merging two records is a field-wise OR, so aggregation over
/// a set of roles does not depend on role order.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityFlags {
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_export: bool,
}

impl CapabilityFlags {
    pub const NONE: Self = Self {
        can_view: false,
        can_create: false,
        can_edit: false,
        can_delete: false,
        can_export: false,
    };

    pub const VIEW_ONLY: Self = Self {
        can_view: true,
        ..Self::NONE
    };

    pub const ALL: Self = Self {
        can_view: true,
        can_create: true,
        can_edit: true,
        can_delete: true,
        can_export: true,
    };

    /// Flags with exactly one action set.
    pub fn only(action: Action) -> Self {
        let mut flags = Self::NONE;
        flags.set(action);
        flags
    }

    pub fn has(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
            Action::Export => self.can_export,
        }
    }

    pub fn set(&mut self, action: Action) {
        match action {
            Action::View => self.can_view = true,
            Action::Create => self.can_create = true,
            Action::Edit => self.can_edit = true,
            Action::Delete => self.can_delete = true,
            Action::Export => self.can_export = true,
        }
    }

    /// True when at least one capability is granted.
    pub fn any(&self) -> bool {
        Action::ALL.iter().any(|a| self.has(*a))
    }

    /// Field-wise OR.
    pub fn merge(self, other: Self) -> Self {
        Self {
            can_view: self.can_view || other.can_view,
            can_create: self.can_create || other.can_create,
            can_edit: self.can_edit || other.can_edit,
            can_delete: self.can_delete || other.can_delete,
            can_export: self.can_export || other.can_export,
        }
    }

    /// Any granted action implies `can_view`.
    pub fn normalized(self) -> Self {
        if self.any() {
            Self {
                can_view: true,
                ..self
            }
        } else {
            self
        }
    }

    /// Iterate the granted actions in canonical order.
    pub fn actions(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.has(*a))
    }
}

impl BitOr for CapabilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.merge(rhs)
    }
}

impl BitOrAssign for CapabilityFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.merge(rhs);
    }
}
