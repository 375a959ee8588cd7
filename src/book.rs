use std::fmt;
use std::path::{Path, PathBuf};

/// A single work item: the archive number of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookId(pub u32);

impl BookId {
    /// `book_<id>.txt`, whose existence marks the book as done.
    pub fn file_name(self) -> String {
        format!("book_{}.txt", self.0)
    }

    pub fn target_path(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Where the body is streamed before it gets renamed onto the target path.
    pub fn part_path(self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.part", self.file_name()))
    }

    /// `<base>/cache/epub/<id>/pg<id>.txt`
    pub fn url(self, base_url: &str) -> String {
        format!("{}/cache/epub/{id}/pg{id}.txt", base_url.trim_end_matches('/'), id = self.0)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
