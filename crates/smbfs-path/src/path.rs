use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::PathError;
use crate::primitives::{self, is_absolute, is_folder};

/// Non-owning identity of the file system a path belongs to.
///
/// `SmbPath` holds an `Arc<dyn FileSystemIdentity>` rather than a concrete
/// `FileSystem` type so this crate never depends on the registry crate that
/// defines one -- see the cyclic-reference note in `DESIGN.md`. Two handles
/// are the same file system iff they are the same `Arc` allocation; the
/// registry's at-most-one-handle-per-authority guarantee makes this
/// equivalent to comparing authority strings.
pub trait FileSystemIdentity {
    fn authority(&self) -> &str;
}

/// An immutable SMB path value: components plus absolute/folder flags, tied
/// to the file system that can resolve it against a live share.
#[derive(Clone)]
pub struct SmbPath {
    file_system: Arc<dyn FileSystemIdentity + Send + Sync>,
    components: Vec<String>,
    absolute: bool,
    folder: bool,
}

impl SmbPath {
    /// Parse `s` against `file_system`, splitting on `/` and recording the
    /// absolute/folder flags from the leading/trailing separators.
    pub fn parse(file_system: Arc<dyn FileSystemIdentity + Send + Sync>, s: &str) -> Result<Self, PathError> {
        let components = primitives::split(s)?;
        Ok(Self {
            file_system,
            components,
            absolute: is_absolute(s),
            folder: is_folder(s),
        })
    }

    fn from_parts(
        file_system: Arc<dyn FileSystemIdentity + Send + Sync>,
        components: Vec<String>,
        absolute: bool,
        folder: bool,
    ) -> Self {
        Self {
            file_system,
            components,
            absolute,
            folder,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_folder(&self) -> bool {
        self.folder
    }

    pub fn name_count(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    fn same_file_system(&self, other: &SmbPath) -> bool {
        Arc::ptr_eq(&self.file_system, &other.file_system)
    }

    fn render(&self) -> String {
        primitives::merge(&self.components, 0, self.components.len(), self.absolute, self.folder)
    }

    /// C2 `root()`: the `/` path on the same file system, if this path is
    /// absolute.
    pub fn root(&self) -> Option<SmbPath> {
        if !self.absolute {
            return None;
        }
        Some(Self::from_parts(self.file_system.clone(), Vec::new(), true, true))
    }

    /// C2 `file_name()`: a relative path consisting of the last component.
    pub fn file_name(&self) -> Option<SmbPath> {
        let n = self.components.len();
        if n == 0 {
            return None;
        }
        Some(Self::from_parts(
            self.file_system.clone(),
            vec![self.components[n - 1].clone()],
            false,
            self.folder,
        ))
    }

    /// C2 `parent()`: components `[0..n-1]` with the original absoluteness,
    /// as a folder path. `None` if there are fewer than 2 components.
    pub fn parent(&self) -> Option<SmbPath> {
        let n = self.components.len();
        if n < 2 {
            return None;
        }
        Some(Self::from_parts(
            self.file_system.clone(),
            self.components[0..n - 1].to_vec(),
            self.absolute,
            true,
        ))
    }

    /// C2 `name(i)`: a relative sub-path over just component `i`.
    pub fn name(&self, i: usize) -> Result<SmbPath, PathError> {
        let n = self.components.len();
        if i >= n {
            return Err(PathError::IndexOutOfRange(format!(
                "index {i} out of range for path with {n} components"
            )));
        }
        Ok(Self::from_parts(
            self.file_system.clone(),
            vec![self.components[i].clone()],
            false,
            i == n - 1 && self.folder,
        ))
    }

    /// C2 `subpath(b, e)`: a relative sub-path over `[b..e)`.
    pub fn subpath(&self, begin: usize, end: usize) -> Result<SmbPath, PathError> {
        let n = self.components.len();
        if begin >= end || end > n {
            return Err(PathError::IndexOutOfRange(format!(
                "invalid subpath range [{begin}..{end}) for path with {n} components"
            )));
        }
        Ok(Self::from_parts(
            self.file_system.clone(),
            self.components[begin..end].to_vec(),
            false,
            end == n && self.folder,
        ))
    }

    pub fn starts_with(&self, other: &SmbPath) -> bool {
        if !self.same_file_system(other) {
            return false;
        }
        self.render().starts_with(&other.render())
    }

    pub fn ends_with(&self, other: &SmbPath) -> bool {
        if !self.same_file_system(other) {
            return false;
        }
        self.render().ends_with(&other.render())
    }

    /// C2 `normalize()`: drop `.`, collapse `..` against the previous real
    /// component, never climbing past the root.
    pub fn normalize(&self) -> SmbPath {
        let mut out: Vec<String> = Vec::with_capacity(self.components.len());
        for comp in &self.components {
            match comp.as_str() {
                "." => continue,
                ".." => {
                    if out.len() > 1 {
                        out.pop();
                    } else if out.len() == 1 {
                        out.pop();
                    }
                    // at zero accumulated components, ".." is dropped (never
                    // climbs past the root)
                }
                _ => out.push(comp.clone()),
            }
        }
        Self::from_parts(self.file_system.clone(), out, self.absolute, self.folder)
    }

    /// C2 `resolve(other)`.
    pub fn resolve(&self, other: &SmbPath) -> Result<SmbPath, PathError> {
        if !self.same_file_system(other) {
            return Err(PathError::DifferentFileSystem);
        }
        if other.absolute {
            return Ok(other.clone());
        }
        if !self.folder {
            return Err(PathError::NotAFolder);
        }
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Ok(Self::from_parts(self.file_system.clone(), components, self.absolute, other.folder))
    }

    /// C2 `resolve_sibling(other)`.
    pub fn resolve_sibling(&self, other: &SmbPath) -> Result<SmbPath, PathError> {
        if !self.same_file_system(other) {
            return Err(PathError::DifferentFileSystem);
        }
        if other.absolute {
            return Ok(other.clone());
        }
        let n = self.components.len();
        let mut components = if n == 0 {
            Vec::new()
        } else {
            self.components[0..n - 1].to_vec()
        };
        components.extend(other.components.iter().cloned());
        Ok(Self::from_parts(self.file_system.clone(), components, self.absolute, other.folder))
    }

    /// C2 `relativize(target)`.
    pub fn relativize(&self, target: &SmbPath) -> Result<SmbPath, PathError> {
        if !self.same_file_system(target) {
            return Err(PathError::DifferentFileSystem);
        }
        if self.absolute != target.absolute {
            return Err(PathError::InvalidArgument(
                "cannot relativize paths that disagree on absoluteness".to_string(),
            ));
        }
        let mut i = 0;
        while i < self.components.len() && i < target.components.len() && self.components[i] == target.components[i] {
            i += 1;
        }
        let mut out = Vec::new();
        for _ in i..self.components.len() {
            out.push("..".to_string());
        }
        out.extend(target.components[i..].iter().cloned());
        Ok(Self::from_parts(self.file_system.clone(), out, false, target.folder))
    }

    /// C2 `to_uri()`.
    pub fn to_uri(&self) -> Result<String, PathError> {
        if !self.absolute {
            return Err(PathError::InvalidState(
                "cannot build a URI from a relative path".to_string(),
            ));
        }
        Ok(format!("smb://{}{}", self.file_system.authority(), self.render()))
    }

    /// C2 `compare(other)`: lexicographic on rendered strings.
    pub fn compare(&self, other: &SmbPath) -> Result<Ordering, PathError> {
        if !self.same_file_system(other) {
            return Err(PathError::DifferentFileSystem);
        }
        Ok(self.render().cmp(&other.render()))
    }

    /// C2 `iterator()`: one relative path per component, folder-flagged on
    /// every element but the last.
    pub fn iter_components(&self) -> impl Iterator<Item = SmbPath> + '_ {
        let n = self.components.len();
        (0..n).map(move |i| {
            Self::from_parts(
                self.file_system.clone(),
                vec![self.components[i].clone()],
                false,
                if i == n - 1 { self.folder } else { true },
            )
        })
    }
}

impl fmt::Display for SmbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl fmt::Debug for SmbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbPath")
            .field("authority", &self.file_system.authority())
            .field("rendered", &self.render())
            .finish()
    }
}

impl PartialEq for SmbPath {
    fn eq(&self, other: &Self) -> bool {
        self.same_file_system(other) && self.components == other.components
    }
}

impl Eq for SmbPath {}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeFs(String);

    impl FileSystemIdentity for FakeFs {
        fn authority(&self) -> &str {
            &self.0
        }
    }

    fn fs() -> Arc<dyn FileSystemIdentity + Send + Sync> {
        Arc::new(FakeFs("host".to_string()))
    }

    fn p(s: &str) -> SmbPath {
        SmbPath::parse(fs(), s).unwrap()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_absolute_folder() {
            let path = p("/a/b/");
            assert!(path.is_absolute());
            assert!(path.is_folder());
            assert_eq!(path.name_count(), 2);
        }

        #[test]
        fn root_has_no_components() {
            let path = p("/");
            assert!(path.is_absolute());
            assert!(path.is_folder());
            assert_eq!(path.name_count(), 0);
        }

        #[test]
        fn render_round_trips() {
            assert_eq!(p("/a/b/c/").to_string(), "/a/b/c/");
            assert_eq!(p("a/b").to_string(), "a/b");
        }
    }

    mod equality_tests {
        use super::*;

        #[test]
        fn same_fs_same_components_are_equal() {
            let shared = fs();
            let a = SmbPath::parse(shared.clone(), "/a/b").unwrap();
            let b = SmbPath::parse(shared, "/a/b/").unwrap();
            assert_eq!(a, b, "folder flag does not affect equality");
        }

        #[test]
        fn different_fs_not_equal() {
            let a = SmbPath::parse(fs(), "/a/b").unwrap();
            let b = SmbPath::parse(fs(), "/a/b").unwrap();
            assert_ne!(a, b, "distinct Arc allocations are distinct file systems");
        }
    }

    mod root_tests {
        use super::*;

        #[test]
        fn absolute_path_has_root() {
            assert!(p("/a/b").root().is_some());
        }

        #[test]
        fn relative_path_has_no_root() {
            assert!(p("a/b").root().is_none());
        }
    }

    mod file_name_tests {
        use super::*;

        #[test]
        fn last_component_is_file_name() {
            let name = p("/a/b/c").file_name().unwrap();
            assert_eq!(name.to_string(), "c");
            assert!(!name.is_absolute());
        }

        #[test]
        fn root_has_no_file_name() {
            assert!(p("/").file_name().is_none());
        }
    }

    mod parent_tests {
        use super::*;

        #[test]
        fn parent_drops_last_component() {
            let parent = p("/a/b/c").parent().unwrap();
            assert_eq!(parent.to_string(), "/a/b/");
        }

        #[test]
        fn single_component_has_no_parent() {
            assert!(p("/a").parent().is_none());
        }
    }

    mod name_and_subpath_tests {
        use super::*;

        #[test]
        fn name_picks_single_component() {
            assert_eq!(p("/a/b/c").name(1).unwrap().to_string(), "b");
        }

        #[test]
        fn name_out_of_range_errors() {
            assert!(p("/a").name(5).is_err());
        }

        #[test]
        fn subpath_slices_components() {
            assert_eq!(p("/a/b/c/d").subpath(1, 3).unwrap().to_string(), "b/c");
        }

        #[test]
        fn subpath_carries_folder_flag_only_at_end() {
            let path = p("/a/b/c/");
            assert!(path.subpath(1, 3).unwrap().is_folder());
            assert!(!path.subpath(0, 2).unwrap().is_folder());
        }

        #[test]
        fn subpath_invalid_range_errors() {
            assert!(p("/a/b").subpath(1, 1).is_err());
            assert!(p("/a/b").subpath(0, 10).is_err());
        }
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn drops_dot_components() {
            assert_eq!(p("/a/./b").normalize().to_string(), "/a/b");
        }

        #[test]
        fn dotdot_pops_previous() {
            assert_eq!(p("/a/b/../c").normalize().to_string(), "/a/c");
        }

        #[test]
        fn dotdot_at_root_is_dropped() {
            assert_eq!(p("/../a").normalize().to_string(), "/a");
        }

        #[test]
        fn normalize_is_idempotent() {
            let once = p("/a/b/../c/./d").normalize();
            let twice = once.normalize();
            assert_eq!(once, twice);
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn resolve_absolute_other_returns_other() {
            let base = p("/a/");
            let other = p("/x/y");
            assert_eq!(base.resolve(&other).unwrap(), other);
        }

        #[test]
        fn resolve_relative_requires_folder() {
            let base = p("/a");
            let other = p("b");
            assert!(base.resolve(&other).is_err());
        }

        #[test]
        fn resolve_relative_appends_components() {
            let base = p("/a/");
            let other = p("b/c");
            assert_eq!(base.resolve(&other).unwrap().to_string(), "/a/b/c");
        }

        #[test]
        fn resolve_cross_fs_errors() {
            let base = SmbPath::parse(fs(), "/a/").unwrap();
            let other = SmbPath::parse(fs(), "b").unwrap();
            assert!(base.resolve(&other).is_err());
        }
    }

    mod resolve_sibling_tests {
        use super::*;

        #[test]
        fn replaces_last_component() {
            let base = p("/a/b");
            let other = p("c");
            assert_eq!(base.resolve_sibling(&other).unwrap().to_string(), "/a/c");
        }

        #[test]
        fn absolute_other_wins() {
            let base = p("/a/b");
            let other = p("/x");
            assert_eq!(base.resolve_sibling(&other).unwrap(), other);
        }
    }

    mod relativize_tests {
        use super::*;

        #[test]
        fn diverging_paths_emit_dotdot_then_suffix() {
            let a = p("/a/b/c");
            let b = p("/a/x/y");
            let rel = a.relativize(&b).unwrap();
            assert_eq!(rel.to_string(), "../../x/y");
        }

        #[test]
        fn round_trips_via_resolve() {
            let a = p("/a/b/c/");
            let b = p("/a/x/y");
            let rel = a.relativize(&b).unwrap();
            let resolved = a.resolve(&rel).unwrap().normalize();
            assert_eq!(resolved, b.normalize());
        }

        #[test]
        fn disagreeing_absoluteness_errors() {
            let a = p("/a/b");
            let b = p("a/b");
            assert!(a.relativize(&b).is_err());
        }
    }

    mod to_uri_tests {
        use super::*;

        #[test]
        fn builds_smb_uri() {
            assert_eq!(p("/share/file.txt").to_uri().unwrap(), "smb://host/share/file.txt");
        }

        #[test]
        fn relative_path_has_no_uri() {
            assert!(p("a/b").to_uri().is_err());
        }
    }

    mod compare_tests {
        use super::*;

        #[test]
        fn lexicographic_on_rendered_string() {
            assert_eq!(p("/a").compare(&p("/b")).unwrap(), Ordering::Less);
        }

        #[test]
        fn cross_fs_compare_errors() {
            let a = SmbPath::parse(fs(), "/a").unwrap();
            let b = SmbPath::parse(fs(), "/a").unwrap();
            assert!(a.compare(&b).is_err());
        }
    }

    mod iterator_tests {
        use super::*;

        #[test]
        fn yields_one_relative_path_per_component() {
            let path = p("/a/b/c/");
            let parts: Vec<String> = path.iter_components().map(|p| p.to_string()).collect();
            assert_eq!(parts, vec!["a/".to_string(), "b/".to_string(), "c/".to_string()]);
        }

        #[test]
        fn all_but_last_are_folders() {
            let path = p("/a/b/c");
            let flags: Vec<bool> = path.iter_components().map(|p| p.is_folder()).collect();
            assert_eq!(flags, vec![true, true, false]);
        }
    }
}
