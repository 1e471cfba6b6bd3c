//! An in-memory fake standing in for a real SMB collaborator in tests.
//!
//! Grounded in the mock-collaborator-as-fixture pattern used by the
//! teacher's integration tests: a crate-local fake that implements the same
//! trait the real adapter would, so higher-level crates can exercise their
//! logic without a network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use smbfs_proto::{CopyOptions, OpenOptions, RemoteEntry, RemoteHandle, SmbCollaborator, SmbError};

const HIDDEN_BIT: u32 = 0x1;
const DIRECTORY_BIT: u32 = 0x2;

#[derive(Clone)]
struct FileNode {
    data: Vec<u8>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    hidden: bool,
    key: u64,
}

struct DirNode {
    children: BTreeMap<String, Node>,
    key: u64,
}

impl DirNode {
    fn new(key: u64) -> Self {
        Self {
            children: BTreeMap::new(),
            key,
        }
    }
}

enum Node {
    File(FileNode),
    Dir(DirNode),
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

fn navigate<'a>(root: &'a Node, comps: &[&str]) -> Result<&'a Node, SmbError> {
    let mut current = root;
    for comp in comps {
        match current {
            Node::Dir(dir) => {
                current = dir
                    .children
                    .get(*comp)
                    .ok_or_else(|| SmbError::NotFound(comp.to_string()))?;
            }
            Node::File(_) => return Err(SmbError::NotADirectory((*comp).to_string())),
        }
    }
    Ok(current)
}

fn navigate_mut<'a>(root: &'a mut Node, comps: &[&str]) -> Result<&'a mut Node, SmbError> {
    let mut current = root;
    for comp in comps {
        match current {
            Node::Dir(dir) => {
                current = dir
                    .children
                    .get_mut(*comp)
                    .ok_or_else(|| SmbError::NotFound(comp.to_string()))?;
            }
            Node::File(_) => return Err(SmbError::NotADirectory((*comp).to_string())),
        }
    }
    Ok(current)
}

/// Shared, cloneable handle onto the in-memory tree. `FakeCollaborator` and
/// the handles it opens both hold one of these, so a handle can keep
/// operating after the `FakeCollaborator` value that created it is dropped.
#[derive(Clone)]
struct Tree {
    root: Arc<Mutex<Node>>,
    clock: Arc<AtomicI64>,
    next_key: Arc<AtomicU64>,
}

impl Tree {
    fn new() -> Self {
        Self {
            root: Arc::new(Mutex::new(Node::Dir(DirNode::new(0)))),
            clock: Arc::new(AtomicI64::new(1)),
            next_key: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Monotonic fake clock; avoids relying on wall-clock resolution in
    /// fast-running tests that create several entries back to back.
    fn now(&self) -> DateTime<Utc> {
        let t = self.clock.fetch_add(1, Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(t, 0).expect("small timestamps are representable")
    }

    /// A fresh per-node identity, distinct from every other file or
    /// directory ever created in this tree (root excepted, which is fixed
    /// at 0).
    fn next_key(&self) -> u64 {
        self.next_key.fetch_add(1, Ordering::SeqCst)
    }

    fn with_node<T>(&self, path: &str, f: impl FnOnce(&Node) -> Result<T, SmbError>) -> Result<T, SmbError> {
        let root = self.root.lock();
        let node = navigate(&root, &components(path))?;
        f(node)
    }

    fn with_parent_mut<T>(
        &self,
        path: &str,
        f: impl FnOnce(&mut BTreeMap<String, Node>, &str) -> Result<T, SmbError>,
    ) -> Result<T, SmbError> {
        let comps = components(path);
        let (parent_comps, name) = comps.split_at(comps.len().saturating_sub(1));
        let name = name
            .first()
            .copied()
            .ok_or_else(|| SmbError::InvalidArgument("path has no final component".to_string()))?;
        let mut root = self.root.lock();
        let parent = navigate_mut(&mut root, parent_comps)?;
        match parent {
            Node::Dir(dir) => f(&mut dir.children, name),
            Node::File(_) => Err(SmbError::NotADirectory(path.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, SmbError> {
        Ok(self.with_node(path, |_| Ok(())).is_ok())
    }

    async fn length(&self, path: &str) -> Result<u64, SmbError> {
        self.with_node(path, |n| match n {
            Node::File(f) => Ok(f.data.len() as u64),
            Node::Dir(_) => Ok(0),
        })
    }

    async fn create_new_file(&self, path: &str) -> Result<(), SmbError> {
        let now = self.now();
        let key = self.next_key();
        self.with_parent_mut(path, |children, name| {
            if children.contains_key(name) {
                return Err(SmbError::AlreadyExists(path.to_string()));
            }
            children.insert(
                name.to_string(),
                Node::File(FileNode {
                    data: Vec::new(),
                    created: now,
                    modified: now,
                    hidden: false,
                    key,
                }),
            );
            Ok(())
        })
    }
}

/// An in-memory file tree implementing `SmbCollaborator`.
pub struct FakeCollaborator {
    tree: Tree,
}

impl Default for FakeCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCollaborator {
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    /// Test-only hook: flips the DOS hidden bit on a file, since nothing in
    /// `SmbCollaborator` itself exposes a way to set it.
    pub async fn set_hidden(&self, path: &str, hidden: bool) -> Result<(), SmbError> {
        self.tree.with_parent_mut(path, |children, name| match children.get_mut(name) {
            Some(Node::File(f)) => {
                f.hidden = hidden;
                Ok(())
            }
            Some(Node::Dir(_)) => Err(SmbError::InvalidArgument("directories have no hidden flag here".to_string())),
            None => Err(SmbError::NotFound(path.to_string())),
        })
    }
}

struct FakeHandle {
    tree: Tree,
    path: String,
    pos: u64,
}

#[async_trait]
impl RemoteHandle for FakeHandle {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SmbError> {
        let data = self.tree.with_node(&self.path, |n| match n {
            Node::File(f) => Ok(f.data.clone()),
            Node::Dir(_) => Err(SmbError::InvalidArgument("cannot read a directory".to_string())),
        })?;
        let start = self.pos as usize;
        if start >= data.len() {
            return Ok(0);
        }
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, SmbError> {
        let pos = self.pos as usize;
        let path = self.path.clone();
        let now = self.tree.now();
        self.tree.with_parent_mut(&path, |children, name| match children.get_mut(name) {
            Some(Node::File(f)) => {
                if pos + buf.len() > f.data.len() {
                    f.data.resize(pos + buf.len(), 0);
                }
                f.data[pos..pos + buf.len()].copy_from_slice(buf);
                f.modified = now;
                Ok(())
            }
            Some(Node::Dir(_)) => Err(SmbError::InvalidArgument("cannot write a directory".to_string())),
            None => Err(SmbError::NotFound(path.clone())),
        })?;
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    async fn seek(&mut self, pos: u64) -> Result<(), SmbError> {
        self.pos = pos;
        Ok(())
    }

    async fn position(&self) -> Result<u64, SmbError> {
        Ok(self.pos)
    }

    async fn size(&self) -> Result<u64, SmbError> {
        self.tree.length(&self.path).await
    }

    async fn set_len(&mut self, len: u64) -> Result<(), SmbError> {
        let path = self.path.clone();
        self.tree.with_parent_mut(&path, |children, name| match children.get_mut(name) {
            Some(Node::File(f)) => {
                f.data.resize(len as usize, 0);
                Ok(())
            }
            Some(Node::Dir(_)) => Err(SmbError::InvalidArgument("cannot truncate a directory".to_string())),
            None => Err(SmbError::NotFound(path.clone())),
        })
    }

    async fn close(&mut self) -> Result<(), SmbError> {
        Ok(())
    }
}

#[async_trait]
impl SmbCollaborator for FakeCollaborator {
    async fn exists(&self, path: &str) -> Result<bool, SmbError> {
        self.tree.exists(path).await
    }

    async fn is_directory(&self, path: &str) -> Result<bool, SmbError> {
        self.tree.with_node(path, |n| Ok(matches!(n, Node::Dir(_))))
    }

    async fn is_hidden(&self, path: &str) -> Result<bool, SmbError> {
        self.tree.with_node(path, |n| match n {
            Node::File(f) => Ok(f.hidden),
            Node::Dir(_) => Ok(false),
        })
    }

    async fn can_read(&self, path: &str) -> Result<bool, SmbError> {
        self.tree.with_node(path, |_| Ok(true))
    }

    async fn can_write(&self, path: &str) -> Result<bool, SmbError> {
        self.tree.with_node(path, |_| Ok(true))
    }

    async fn length(&self, path: &str) -> Result<u64, SmbError> {
        self.tree.length(path).await
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, SmbError> {
        self.tree.with_node(path, |n| match n {
            Node::File(f) => Ok(f.modified),
            Node::Dir(_) => Ok(DateTime::<Utc>::from_timestamp(0, 0).unwrap()),
        })
    }

    async fn create_time(&self, path: &str) -> Result<DateTime<Utc>, SmbError> {
        self.tree.with_node(path, |n| match n {
            Node::File(f) => Ok(f.created),
            Node::Dir(_) => Ok(DateTime::<Utc>::from_timestamp(0, 0).unwrap()),
        })
    }

    async fn attributes_bitfield(&self, path: &str) -> Result<u32, SmbError> {
        self.tree.with_node(path, |n| match n {
            Node::File(f) => Ok(if f.hidden { HIDDEN_BIT } else { 0 }),
            Node::Dir(_) => Ok(DIRECTORY_BIT),
        })
    }

    async fn disk_free_space(&self, _path: &str) -> Result<u64, SmbError> {
        Ok(u64::MAX / 2)
    }

    async fn list_children_names(&self, path: &str) -> Result<Vec<RemoteEntry>, SmbError> {
        self.tree.with_node(path, |n| match n {
            Node::Dir(dir) => Ok(dir
                .children
                .iter()
                .map(|(name, node)| RemoteEntry {
                    name: name.clone(),
                    is_directory: matches!(node, Node::Dir(_)),
                })
                .collect()),
            Node::File(_) => Err(SmbError::NotADirectory(path.to_string())),
        })
    }

    async fn file_key(&self, path: &str) -> Result<Option<String>, SmbError> {
        self.tree.with_node(path, |n| match n {
            Node::File(f) => Ok(Some(format!("f{}", f.key))),
            Node::Dir(d) => Ok(Some(format!("d{}", d.key))),
        })
    }

    async fn mkdir(&self, path: &str) -> Result<(), SmbError> {
        let key = self.tree.next_key();
        self.tree.with_parent_mut(path, |children, name| {
            if children.contains_key(name) {
                return Err(SmbError::AlreadyExists(path.to_string()));
            }
            children.insert(name.to_string(), Node::Dir(DirNode::new(key)));
            Ok(())
        })
    }

    async fn delete(&self, path: &str) -> Result<(), SmbError> {
        self.tree.with_parent_mut(path, |children, name| {
            children
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| SmbError::NotFound(path.to_string()))
        })
    }

    async fn copy_to(&self, source: &str, target: &str, options: CopyOptions) -> Result<(), SmbError> {
        let mut data = self.tree.with_node(source, |n| match n {
            Node::File(f) => Ok(f.clone()),
            Node::Dir(_) => Err(SmbError::InvalidArgument("cannot copy a directory".to_string())),
        })?;
        data.key = self.tree.next_key();
        let target_exists = self.tree.exists(target).await?;
        if target_exists && !options.replace_existing {
            return Err(SmbError::AlreadyExists(target.to_string()));
        }
        self.tree.with_parent_mut(target, |children, name| {
            children.insert(name.to_string(), Node::File(data));
            Ok(())
        })
    }

    async fn rename_to(&self, source: &str, target: &str, replace_existing: bool) -> Result<(), SmbError> {
        let target_exists = self.tree.exists(target).await?;
        if target_exists && !replace_existing {
            return Err(SmbError::AlreadyExists(target.to_string()));
        }
        let node = self.tree.with_parent_mut(source, |children, name| {
            children.remove(name).ok_or_else(|| SmbError::NotFound(source.to_string()))
        })?;
        self.tree.with_parent_mut(target, |children, name| {
            match node {
                Node::File(f) => children.insert(name.to_string(), Node::File(f)),
                Node::Dir(d) => children.insert(name.to_string(), Node::Dir(d)),
            };
            Ok(())
        })
    }

    async fn create_new_file(&self, path: &str) -> Result<(), SmbError> {
        self.tree.create_new_file(path).await
    }

    async fn set_last_modified(&self, path: &str, at: DateTime<Utc>) -> Result<(), SmbError> {
        self.tree.with_parent_mut(path, |children, name| match children.get_mut(name) {
            Some(Node::File(f)) => {
                f.modified = at;
                Ok(())
            }
            Some(Node::Dir(_)) => Ok(()),
            None => Err(SmbError::NotFound(path.to_string())),
        })
    }

    async fn set_create_time(&self, path: &str, at: DateTime<Utc>) -> Result<(), SmbError> {
        self.tree.with_parent_mut(path, |children, name| match children.get_mut(name) {
            Some(Node::File(f)) => {
                f.created = at;
                Ok(())
            }
            Some(Node::Dir(_)) => Ok(()),
            None => Err(SmbError::NotFound(path.to_string())),
        })
    }

    async fn open(&self, path: &str, options: OpenOptions) -> Result<Box<dyn RemoteHandle>, SmbError> {
        if options.create_new && self.tree.exists(path).await? {
            return Err(SmbError::AlreadyExists(path.to_string()));
        }
        if options.create_new || (options.create && !self.tree.exists(path).await?) {
            self.tree.create_new_file(path).await?;
        }
        if !self.tree.exists(path).await? {
            return Err(SmbError::NotFound(path.to_string()));
        }
        if options.truncate_existing {
            self.tree.with_parent_mut(path, |children, name| match children.get_mut(name) {
                Some(Node::File(f)) => {
                    f.data.clear();
                    Ok(())
                }
                _ => Ok(()),
            })?;
        }
        let pos = if options.append { self.tree.length(path).await? } else { 0 };
        Ok(Box::new(FakeHandle {
            tree: self.tree.clone(),
            path: path.to_string(),
            pos,
        }))
    }
}
