use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Request-scoped slot holding one uploaded image on disk.
///
/// Every call gets a fresh uniquely named file, so concurrent requests never
/// collide. The file is removed when the slot drops, on every exit path; a
/// failed removal is ignored and never masks the primary outcome.
pub struct TransientSlot {
    file: NamedTempFile,
}

impl TransientSlot {
    pub fn materialize(im_bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("face-verify-")
            .suffix(".jpg")
            .tempfile()?;
        file.write_all(im_bytes)?;
        file.flush()?;

        Ok(TransientSlot { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
