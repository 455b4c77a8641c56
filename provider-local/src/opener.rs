//! Re-invocable opener over a filesystem path. Each invocation opens the
//! file fresh and reports its current length.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use core_codec::{ByteStream, ByteStreamOpener, Result};

pub struct FileOpener {
    path: PathBuf,
}

impl FileOpener {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ByteStreamOpener for FileOpener {
    async fn open(&self) -> Result<ByteStream> {
        debug!(path = %self.path.display(), "open file");
        let file = std::fs::File::open(&self.path)?;
        let len = file.metadata()?.len();
        Ok(ByteStream::new(Box::new(file), len))
    }
}
