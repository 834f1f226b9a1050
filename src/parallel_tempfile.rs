//! Temporary files and directories shared by every process of a parallel run.
//!
//! Rank 0 creates (and later removes) the temporary object; its path is broadcast to the other ranks. Barriers
//! surround both creation and removal, so no rank sees the path before it exists or after it is gone.
//!
//! ## Examples
//! ```rust
//! use nbvalx::parallel_tempfile::{ParallelTempDir, SingleProcess};
//!
//! let dir = ParallelTempDir::new(&SingleProcess).unwrap();
//! assert!(dir.path().is_dir());
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};

/// The collective operations needed from a process group.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Block until every rank reaches this point.
    fn barrier(&self);

    /// Every rank receives the value passed by rank 0; the value passed by other ranks is ignored.
    fn broadcast(&self, value: Option<String>) -> Option<String>;
}

/// A group with a single process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn broadcast(&self, value: Option<String>) -> Option<String> {
        value
    }
}

fn creation_failed_on_root() -> io::Error {
    io::Error::other("creating the temporary path failed on rank 0")
}

/// Create on rank 0 with `create`, then share the path.
fn create_on_root<C, T>(
    comm: &C,
    create: impl FnOnce() -> io::Result<T>,
    path_of: impl Fn(&T) -> &Path,
) -> io::Result<(Option<T>, PathBuf)>
where
    C: Communicator + ?Sized,
{
    comm.barrier();
    let created = if comm.rank() == 0 { Some(create()) } else { None };
    let shared = match &created {
        Some(Ok(object)) => Some(path_of(object).to_string_lossy().into_owned()),
        _ => None,
    };
    let shared = comm.broadcast(shared);
    comm.barrier();
    match (created, shared) {
        (Some(Err(err)), _) => Err(err),
        (created, Some(path)) => Ok((created.and_then(Result::ok), PathBuf::from(path))),
        (_, None) => Err(creation_failed_on_root()),
    }
}

/// Remove on rank 0 between two barriers.
fn remove_on_root<C: Communicator + ?Sized, T>(comm: &C, object: Option<T>) {
    comm.barrier();
    drop(object);
    comm.barrier();
}

/// A temporary directory created by rank 0 and seen by every rank.
pub struct ParallelTempDir<'c, C: Communicator + ?Sized> {
    comm: &'c C,
    dir: Option<TempDir>,
    path: PathBuf,
}

impl<'c, C: Communicator + ?Sized> ParallelTempDir<'c, C> {
    pub fn new(comm: &'c C) -> io::Result<Self> {
        let (dir, path) = create_on_root(comm, TempDir::new, TempDir::path)?;
        Ok(Self { comm, dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<C: Communicator + ?Sized> Drop for ParallelTempDir<'_, C> {
    fn drop(&mut self) {
        remove_on_root(self.comm, self.dir.take());
    }
}

/// A named temporary file created by rank 0 and seen by every rank.
pub struct ParallelTempFile<'c, C: Communicator + ?Sized> {
    comm: &'c C,
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl<'c, C: Communicator + ?Sized> ParallelTempFile<'c, C> {
    pub fn new(comm: &'c C) -> io::Result<Self> {
        let (file, path) = create_on_root(comm, NamedTempFile::new, NamedTempFile::path)?;
        Ok(Self { comm, file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<C: Communicator + ?Sized> Drop for ParallelTempFile<'_, C> {
    fn drop(&mut self) {
        remove_on_root(self.comm, self.file.take());
    }
}
