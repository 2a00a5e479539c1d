//! A files database in the style of `codespan_reporting::files::SimpleFiles`
//! that hands out `FileId`s instead of `usize` indices.

use std::fmt;
use std::num::NonZeroU32;
use std::ops::Range;

use codespan_reporting::files::{Error, SimpleFile};

/// File id.
// `NonZeroU32` keeps `Option<FileId>` the same size as `FileId`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FileId(NonZeroU32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u32> for FileId {
    type Error = <NonZeroU32 as TryFrom<u32>>::Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let id = NonZeroU32::try_from(value)?;
        Ok(Self(id))
    }
}

impl From<FileId> for usize {
    fn from(value: FileId) -> Self {
        value.0.get() as Self
    }
}

pub struct Files {
    files: Vec<SimpleFile<String, String>>,
}

impl Files {
    /// Create a new files database.
    pub fn new() -> Files {
        Files { files: Vec::new() }
    }

    /// Add a file to the database, returning the handle that can be used to
    /// refer to it again.
    pub fn add(&mut self, name: String, source: String) -> FileId {
        self.files.push(SimpleFile::new(name, source));
        let len = u32::try_from(self.files.len())
            .expect("Too many files (maximum amount of files is `u32::MAX`)");
        FileId::try_from(len).expect("file count starts at one")
    }

    /// Get the file corresponding to the given id.
    pub fn get(&self, file_id: FileId) -> Result<&SimpleFile<String, String>, Error> {
        let index = usize::from(file_id) - 1;
        self.files.get(index).ok_or(Error::FileMissing)
    }

    /// The source text of a file, or the empty string if the id is unknown.
    pub fn source(&self, file_id: FileId) -> &str {
        self.get(file_id).map_or("", |file| file.source().as_str())
    }
}

impl Default for Files {
    fn default() -> Files {
        Files::new()
    }
}

impl<'a> codespan_reporting::files::Files<'a> for Files {
    type FileId = FileId;
    type Name = String;
    type Source = &'a str;

    fn name(&self, file_id: FileId) -> Result<String, Error> {
        Ok(self.get(file_id)?.name().clone())
    }

    fn source(&self, file_id: FileId) -> Result<&str, Error> {
        Ok(self.get(file_id)?.source().as_str())
    }

    fn line_index(&self, file_id: FileId, byte_index: usize) -> Result<usize, Error> {
        self.get(file_id)?.line_index((), byte_index)
    }

    fn line_range(&self, file_id: FileId, line_index: usize) -> Result<Range<usize>, Error> {
        self.get(file_id)?.line_range((), line_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let mut files = Files::new();
        let first = files.add("a.cdl".to_owned(), "scenario".to_owned());
        let second = files.add("b.cdl".to_owned(), String::new());

        assert_eq!(usize::from(first), 1);
        assert_eq!(usize::from(second), 2);
        assert_eq!(files.source(first), "scenario");
    }

    #[test]
    /// `Option<FileId>` is threaded through diagnostics. Ensure it stays small.
    fn file_id_niche() {
        assert_eq!(std::mem::size_of::<Option<FileId>>(), 4);
    }
}
