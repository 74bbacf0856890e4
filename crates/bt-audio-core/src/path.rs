//! Object path parsing.
//!
//! BlueZ object paths are laid out as `/org/bluez/<adapter>/<device>/<transport>`.
//! Splitting on `/` keeps the leading empty segment, so the adapter id sits at
//! index 3, the device id at 4 and the transport id at 5. Every lookup goes
//! through [`segment_at`], which returns `None` for short paths instead of
//! panicking.

use std::fmt;

/// Root of the BlueZ object namespace.
pub const BLUEZ_NAMESPACE: &str = "/org/bluez/";

/// Segment index of the adapter id.
pub const ADAPTER_SEGMENT: usize = 3;
/// Segment index of the device id.
pub const DEVICE_SEGMENT: usize = 4;
/// Segment index of the transport id.
pub const TRANSPORT_SEGMENT: usize = 5;

/// Split an object path into its segments.
pub fn parse(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

/// Segment at `index`, or `None` when the path is too short.
pub fn segment_at<'a>(segments: &[&'a str], index: usize) -> Option<&'a str> {
    segments.get(index).copied()
}

/// A bus object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of segments, counting the empty one before the leading slash.
    pub fn depth(&self) -> usize {
        parse(&self.0).len()
    }

    /// Segment at `index`, guarded against short paths.
    pub fn segment(&self, index: usize) -> Option<&str> {
        segment_at(&parse(&self.0), index)
    }

    pub fn adapter_id(&self) -> Option<&str> {
        self.segment(ADAPTER_SEGMENT)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.segment(DEVICE_SEGMENT)
    }

    pub fn transport_id(&self) -> Option<&str> {
        self.segment(TRANSPORT_SEGMENT)
    }

    /// Whether the path lies under `/org/bluez/`.
    pub fn in_bluez_namespace(&self) -> bool {
        self.0.starts_with(BLUEZ_NAMESPACE)
    }

    /// Whether `self` is `parent` itself or one of its descendants.
    pub fn is_under(&self, parent: &ObjectPath) -> bool {
        match self.0.strip_prefix(parent.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ObjectPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod segments {
        use super::*;

        #[test]
        fn transport_path_has_all_ids() {
            let path = ObjectPath::new("/org/bluez/hci0/dev_AA_BB/fd0");
            assert_eq!(path.depth(), 6);
            assert_eq!(path.adapter_id(), Some("hci0"));
            assert_eq!(path.device_id(), Some("dev_AA_BB"));
            assert_eq!(path.transport_id(), Some("fd0"));
        }

        #[test]
        fn adapter_path_has_no_device() {
            let path = ObjectPath::new("/org/bluez/hci0");
            assert_eq!(path.adapter_id(), Some("hci0"));
            assert_eq!(path.device_id(), None);
            assert_eq!(path.transport_id(), None);
        }

        #[test]
        fn short_paths_yield_none() {
            assert_eq!(ObjectPath::new("/").adapter_id(), None);
            assert_eq!(ObjectPath::new("/org/bluez").adapter_id(), None);
            assert_eq!(ObjectPath::new("").segment(0), Some(""));
            assert_eq!(segment_at(&parse("/org"), 7), None);
        }
    }

    mod namespace {
        use super::*;

        #[test]
        fn recognizes_bluez_paths() {
            assert!(ObjectPath::new("/org/bluez/hci0").in_bluez_namespace());
            assert!(!ObjectPath::new("/org/freedesktop/DBus").in_bluez_namespace());
            assert!(!ObjectPath::new("/org/bluez").in_bluez_namespace());
        }

        #[test]
        fn is_under_respects_segment_boundaries() {
            let adapter = ObjectPath::new("/org/bluez/hci0");
            assert!(ObjectPath::new("/org/bluez/hci0").is_under(&adapter));
            assert!(ObjectPath::new("/org/bluez/hci0/dev_AA").is_under(&adapter));
            assert!(!ObjectPath::new("/org/bluez/hci01/dev_AA").is_under(&adapter));
            assert!(!ObjectPath::new("/org/bluez").is_under(&adapter));
        }
    }

    proptest! {
        #[test]
        fn segment_never_panics(path in "(/[a-z0-9_]{0,6}){0,8}", index in 0usize..12) {
            let object = ObjectPath::new(path.clone());
            let segments = parse(&path);
            prop_assert_eq!(object.segment(index).is_some(), index < segments.len());
        }
    }
}
