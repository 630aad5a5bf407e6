//! Permission token codec.
//!
//! Roles persist their grants as a flat list of strings (`"products.view"`,
//! `"products.create"`, `"sales.create_order"`). This module is the only place
//! those strings are parsed or produced.
//!
//! ## Decoding
//!
//! A token is split on its **last** dot. The trailing segment is matched
//! case-insensitively against the action vocabulary:
//!
//! | suffix | action |
//! |---|---|
//! | `view`, `read` | view |
//! | `create` | create |
//! | `edit`, `update` | edit |
//! | `delete`, `remove` | delete |
//! | `export` | export |
//!
//! - recognized action: the key is the prefix plus `.view`, and the action is
//!   granted together with view
//! - unrecognized suffix: the whole token plus `.view` is the key, view only
//!   (so `"sales.create_order"` grants view on `"sales.create_order.view"`)
//! - malformed tokens (empty, an empty segment, or a bare action word) are
//!   skipped
//!
//! ## Encoding
//!
//! Each granted flag produces `<stem>.<action>`, where the stem is the key
//! without its `.view` suffix.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use tessera_core::{DomainError, DomainResult};

use crate::flags::CapabilityFlags;

const VIEW_SUFFIX: &str = ".view";

/// Action vocabulary understood by the codec.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Export,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Export,
    ];

    /// Canonical suffix emitted by the encoder.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Export => "export",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        let suffix = suffix.to_ascii_lowercase();
        match suffix.as_str() {
            "view" | "read" => Some(Action::View),
            "create" => Some(Action::Create),
            "edit" | "update" => Some(Action::Edit),
            "delete" | "remove" => Some(Action::Delete),
            "export" => Some(Action::Export),
            _ => None,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical permission key of a menu item, always in `<stem>.view` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Parse a key that is already in canonical `.view` form.
    pub fn parse(key: &str) -> DomainResult<Self> {
        match key.strip_suffix(VIEW_SUFFIX) {
            Some(stem) if is_well_formed(stem) => Ok(Self(key.to_string())),
            _ => Err(DomainError::validation(format!(
                "permission key '{key}' must be '<stem>.view'"
            ))),
        }
    }

    /// Build the key for a stem (`"finance.reports.cash_flow"` →
    /// `"finance.reports.cash_flow.view"`).
    pub fn from_stem(stem: &str) -> DomainResult<Self> {
        if is_well_formed(stem) {
            Ok(Self::from_checked_stem(stem))
        } else {
            Err(DomainError::validation(format!(
                "permission stem '{stem}' is malformed"
            )))
        }
    }

    /// Accept either a canonical key or a legacy key stored without the
    /// `.view` suffix (report items were first seeded that way).
    pub fn normalize(raw: &str) -> DomainResult<Self> {
        if raw.ends_with(VIEW_SUFFIX) {
            Self::parse(raw)
        } else {
            Self::from_stem(raw)
        }
    }

    fn from_checked_stem(stem: &str) -> Self {
        Self(format!("{stem}{VIEW_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key without its `.view` suffix.
    pub fn stem(&self) -> &str {
        &self.0[..self.0.len() - VIEW_SUFFIX.len()]
    }

    /// Token granting `action` on this key.
    pub fn token(&self, action: Action) -> String {
        format!("{}.{}", self.stem(), action.as_str())
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PermissionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

fn is_well_formed(stem: &str) -> bool {
    !stem.is_empty() && stem.split('.').all(|segment| !segment.is_empty())
}

/// Decode a single token. Returns `None` for malformed tokens.
pub fn decode_token(token: &str) -> Option<(PermissionKey, CapabilityFlags)> {
    let token = token.trim();
    if !is_well_formed(token) {
        return None;
    }

    match token.rsplit_once('.') {
        Some((prefix, suffix)) => match Action::from_suffix(suffix) {
            Some(action) => Some((
                PermissionKey::from_checked_stem(prefix),
                CapabilityFlags::only(action).normalized(),
            )),
            None => Some((PermissionKey::from_checked_stem(token), CapabilityFlags::VIEW_ONLY)),
        },
        // A lone action word names no resource.
        None if Action::from_suffix(token).is_some() => None,
        None => Some((PermissionKey::from_checked_stem(token), CapabilityFlags::VIEW_ONLY)),
    }
}

/// Decode a token list into a capability matrix, OR-ing flags per key.
pub fn parse_tokens<I, S>(tokens: I) -> PermissionMatrix
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut matrix = PermissionMatrix::new();
    for token in tokens {
        if let Some((key, flags)) = decode_token(token.as_ref()) {
            matrix.grant(key, flags);
        }
    }
    matrix
}

/// Encode the flags granted on `key` as tokens, in canonical action order.
pub fn build_tokens(key: &PermissionKey, flags: CapabilityFlags) -> Vec<String> {
    flags.actions().map(|action| key.token(action)).collect()
}

/// Capability matrix keyed by canonical permission key.
///
/// Serializes as `{"<key>": {"can_view": .., ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(BTreeMap<PermissionKey, CapabilityFlags>);

impl PermissionMatrix {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<CapabilityFlags> {
        self.0.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// OR `flags` into the entry for `key`.
    pub fn grant(&mut self, key: PermissionKey, flags: CapabilityFlags) {
        *self.0.entry(key).or_default() |= flags;
    }

    /// OR every entry of `other` into `self`.
    pub fn merge(&mut self, other: &PermissionMatrix) {
        for (key, flags) in &other.0 {
            self.grant(key.clone(), *flags);
        }
    }

    pub fn merged(mut self, other: &PermissionMatrix) -> Self {
        self.merge(other);
        self
    }

    /// Keep only the entries whose key satisfies `keep`.
    pub fn restricted_to(&self, keep: impl Fn(&PermissionKey) -> bool) -> Self {
        self.0
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(key, flags)| (key.clone(), *flags))
            .collect()
    }

    /// Same keys, every entry reduced to view.
    pub fn view_only(&self) -> Self {
        self.0
            .keys()
            .map(|key| (key.clone(), CapabilityFlags::VIEW_ONLY))
            .collect()
    }

    /// Canonical token expansion of the whole matrix.
    pub fn token_set(&self) -> BTreeSet<String> {
        self.0
            .iter()
            .flat_map(|(key, flags)| build_tokens(key, *flags))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PermissionKey, &CapabilityFlags)> {
        self.0.iter()
    }
}

impl FromIterator<(PermissionKey, CapabilityFlags)> for PermissionMatrix {
    fn from_iter<T: IntoIterator<Item = (PermissionKey, CapabilityFlags)>>(iter: T) -> Self {
        let mut matrix = PermissionMatrix::new();
        for (key, flags) in iter {
            matrix.grant(key, flags);
        }
        matrix
    }
}
