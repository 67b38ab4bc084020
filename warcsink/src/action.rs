//! Actions run on output files once they are complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Something to do with a file after the writer has finished with it.
///
/// Actions run after each rotation and when the writer is closed. A failing action is logged
/// and does not affect the write that caused the rotation.
pub trait RotationAction: Send + Sync {
    fn execute(&self, path: &Path) -> io::Result<()>;
}

impl<F> RotationAction for F
where
    F: Fn(&Path) -> io::Result<()> + Send + Sync,
{
    fn execute(&self, path: &Path) -> io::Result<()> {
        self(path)
    }
}

/// Moves completed files into another directory, keeping their names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFileAction {
    destination: PathBuf,
}

impl MoveFileAction {
    pub fn to_destination<P: Into<PathBuf>>(destination: P) -> Self {
        MoveFileAction {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl RotationAction for MoveFileAction {
    fn execute(&self, path: &Path) -> io::Result<()> {
        let name = path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} does not name a file", path.display()),
            )
        })?;
        fs::create_dir_all(&self.destination)?;
        let target = self.destination.join(name);
        fs::rename(path, &target)?;
        info!("moved {} to {}", path.display(), target.display());
        Ok(())
    }
}
