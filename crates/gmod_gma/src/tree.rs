//! In-memory representation of an addon and its virtual file tree

use bytes::Bytes;
use indexmap::{map, IndexMap};
use std::fmt::{self, Debug};

use crate::error::{Error, FileNotFoundError, Result};

/// Separator between the components of a path inside the tree
pub const PATH_SEPARATOR: char = '/';

/// A decoded or programmatically built addon
///
/// ```
/// # fn doit() -> gmod_gma::error::Result<()>
/// # {
/// use gmod_gma::Addon;
///
/// let mut addon = Addon::new("test", "{}", "me");
/// addon.insert_file("lua/autorun/init.lua", "print(1)")?;
///
/// assert!(addon.file("lua/autorun/init.lua").is_some());
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Addon {
    pub name: String,

    /// Free text, conventionally a JSON payload with a description, type and tags
    pub description: String,

    pub author: String,

    /// Whether checksums are computed when writing and were verified when reading
    pub verify_integrity: bool,

    root: Directory,
}

impl Addon {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Addon {
            name: name.into(),
            description: description.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    /// Enables or disables checksums for this addon
    pub fn with_integrity(mut self, verify_integrity: bool) -> Self {
        self.verify_integrity = verify_integrity;
        self
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Directory {
        &mut self.root
    }

    /// Adds a file at `path`, creating the directories leading up to it
    pub fn insert_file(&mut self, path: &str, data: impl Into<Bytes>) -> Result<()> {
        self.root.insert_file(path, data)
    }

    /// Get a file by its path
    pub fn file(&self, path: &str) -> Option<&File> {
        match self.root.get(path)? {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    /// Search for a file by its path
    pub fn by_name(&self, path: &str) -> Result<&File> {
        self.file(path)
            .ok_or_else(|| Error::FileNotFound(FileNotFoundError::Name(path.to_owned())))
    }

    /// Iterates over every file depth-first, children in insertion order
    pub fn files(&self) -> Files<'_> {
        self.root.files()
    }

    /// Number of files in the addon
    pub fn len(&self) -> usize {
        self.files().count()
    }

    /// Whether this addon contains no files
    pub fn is_empty(&self) -> bool {
        self.files().next().is_none()
    }
}

/// An entry of the file tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Directory(Directory),
    File(File),
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Node::Directory(directory) => Some(directory),
            Node::File(_) => None,
        }
    }
}

/// A directory owning its children, which keep the order they were inserted in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    children: IndexMap<String, Node>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &IndexMap<String, Node> {
        &self.children
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Get a node by a path relative to this directory
    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut components = split_path(path);
        let mut node = self.children.get(components.next()?)?;
        for component in components {
            node = node.as_directory()?.children.get(component)?;
        }
        Some(node)
    }

    /// Adds a file at `path`, synthesizing every directory on the way
    ///
    /// Both `/` and `\` are accepted as separators and empty components are skipped.
    pub fn insert_file(&mut self, path: &str, data: impl Into<Bytes>) -> Result<()> {
        let components: Vec<&str> = split_path(path).collect();
        let Some((file_name, parents)) = components.split_last() else {
            return Err(Error::InvalidPath(path.to_owned()));
        };

        let mut directory = self;
        for parent in parents {
            let node = directory
                .children
                .entry((*parent).to_owned())
                .or_insert_with(|| Node::Directory(Directory::new()));

            directory = match node {
                Node::Directory(directory) => directory,
                Node::File(_) => return Err(Error::PathConflict(path.to_owned())),
            };
        }

        match directory.children.entry((*file_name).to_owned()) {
            map::Entry::Occupied(_) => Err(Error::PathConflict(path.to_owned())),
            map::Entry::Vacant(entry) => {
                entry.insert(Node::File(File::new(data)));
                Ok(())
            }
        }
    }

    /// Iterates over every file below this directory
    pub fn files(&self) -> Files<'_> {
        Files {
            stack: vec![(String::new(), self.children.iter())],
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|c| !c.is_empty())
}

/// Contents of a file, either a view into a decoded archive or an owned buffer
#[derive(Clone, PartialEq)]
pub struct File {
    data: Bytes,
}

impl Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "File({} bytes)", self.data.len())
    }
}

impl File {
    pub fn new(data: impl Into<Bytes>) -> Self {
        File { data: data.into() }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size of the file in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Depth-first iterator over the files of a [`Directory`], yielding their full path
pub struct Files<'a> {
    stack: Vec<(String, map::Iter<'a, String, Node>)>,
}

impl<'a> Iterator for Files<'a> {
    type Item = (String, &'a File);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, iter) = self.stack.last_mut()?;
            let Some((name, node)) = iter.next() else {
                self.stack.pop();
                continue;
            };

            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}{PATH_SEPARATOR}{name}")
            };

            match node {
                Node::File(file) => return Some((path, file)),
                Node::Directory(directory) => self.stack.push((path, directory.children.iter())),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::tree::{Addon, Directory, Node};

    #[test]
    fn insert_synthesizes_directories() -> Result<()> {
        let mut root = Directory::new();
        root.insert_file("lua/autorun/init.lua", "print(1)")?;

        let lua = root.get("lua").and_then(Node::as_directory).unwrap();
        assert_eq!(lua.len(), 1);

        let autorun = root.get("lua/autorun").and_then(Node::as_directory).unwrap();
        assert_eq!(autorun.len(), 1);

        let file = root.get("lua/autorun/init.lua").and_then(Node::as_file).unwrap();
        assert_eq!(file.data().as_ref(), b"print(1)");

        Ok(())
    }

    #[test]
    fn insert_accepts_backslashes() -> Result<()> {
        let mut root = Directory::new();
        root.insert_file("materials\\models\\skin.vmt", "x")?;

        assert!(root.get("materials/models/skin.vmt").is_some());
        assert!(root.get("materials\\models").unwrap().is_directory());

        Ok(())
    }

    #[test]
    fn insert_duplicate_file() -> Result<()> {
        let mut root = Directory::new();
        root.insert_file("a/b.txt", "1")?;

        assert!(matches!(
            root.insert_file("a/b.txt", "2"),
            Err(Error::PathConflict(_))
        ));

        Ok(())
    }

    #[test]
    fn insert_through_file() -> Result<()> {
        let mut root = Directory::new();
        root.insert_file("a/b.txt", "1")?;

        assert!(matches!(
            root.insert_file("a/b.txt/c.txt", "2"),
            Err(Error::PathConflict(_))
        ));
        assert!(matches!(
            root.insert_file("a", "2"),
            Err(Error::PathConflict(_))
        ));

        Ok(())
    }

    #[test]
    fn insert_empty_path() {
        let mut root = Directory::new();
        assert!(matches!(
            root.insert_file("//", "x"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn files_are_visited_depth_first_in_insertion_order() -> Result<()> {
        let mut addon = Addon::new("test", "{}", "me");
        addon.insert_file("lua/b.lua", "b")?;
        addon.insert_file("addon.txt", "t")?;
        addon.insert_file("lua/a/c.lua", "c")?;
        addon.insert_file("lua/d.lua", "d")?;

        let paths: Vec<String> = addon.files().map(|(path, _)| path).collect();
        assert_eq!(
            paths,
            vec!["lua/b.lua", "lua/a/c.lua", "lua/d.lua", "addon.txt"]
        );
        assert_eq!(addon.len(), 4);

        Ok(())
    }

    #[test]
    fn by_name_missing() {
        let addon = Addon::new("test", "{}", "me");
        assert!(addon.is_empty());
        assert!(matches!(
            addon.by_name("nope.lua"),
            Err(Error::FileNotFound(_))
        ));
    }
}
