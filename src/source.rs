//! Normalises the ways a PDF can be handed to the extractors.

use crate::error::SourceError;
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

/// A PDF byte source: a file on disk, an in-memory buffer, or a reader.
pub enum ByteSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
    Reader(&'a mut dyn Read),
}

impl<'a> ByteSource<'a> {
    /// Read the whole source into memory, rejecting empty input.
    pub fn read_all(self) -> Result<Cow<'a, [u8]>, SourceError> {
        let data: Cow<'a, [u8]> = match self {
            ByteSource::Bytes(bytes) => Cow::Borrowed(bytes),
            ByteSource::Path(path) => Cow::Owned(std::fs::read(path)?),
            ByteSource::Reader(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Cow::Owned(buf)
            }
        };

        if data.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(data)
    }
}

impl<'a> From<&'a [u8]> for ByteSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ByteSource::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for ByteSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        ByteSource::Bytes(bytes.as_slice())
    }
}

impl<'a> From<&'a Path> for ByteSource<'a> {
    fn from(path: &'a Path) -> Self {
        ByteSource::Path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_bytes_rejected() {
        let err = ByteSource::from(&b""[..]).read_all().unwrap_err();
        assert!(matches!(err, SourceError::Empty));
    }

    #[test]
    fn test_reader_is_drained() {
        let mut cursor = Cursor::new(b"%PDF-1.4".to_vec());
        let data = ByteSource::Reader(&mut cursor).read_all().unwrap();
        assert_eq!(&*data, b"%PDF-1.4");
    }

    #[test]
    fn test_missing_path_is_read_error() {
        let path = Path::new("/definitely/not/here.pdf");
        let err = ByteSource::from(path).read_all().unwrap_err();
        assert!(err.to_string().starts_with("read_error: "));
    }
}
