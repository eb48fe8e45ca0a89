use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory. Matching is case
/// sensitive, so `.Jpg` is not an image.
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "JPG", "JPEG", "PNG", "GIF"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Missing,
}

impl PathKind {
    pub fn of(path: &Path) -> PathKind {
        if path.is_dir() {
            PathKind::Directory
        } else if path.is_file() {
            PathKind::File
        } else {
            PathKind::Missing
        }
    }
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
}

/// Expand CLI arguments into the list of files to process.
///
/// Directories are walked recursively and filtered by extension, files are
/// taken as given, anything else is skipped.
pub fn collect_images<P: AsRef<Path>>(args: &[P]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for arg in args {
        let path = arg.as_ref();
        match PathKind::of(path) {
            PathKind::Directory => {
                let before = files.len();
                files.extend(
                    WalkDir::new(path)
                        .sort_by_file_name()
                        .into_iter()
                        .filter_map(Result::ok)
                        .filter(|e| e.file_type().is_file())
                        .filter(|e| has_image_extension(e.path()))
                        .map(|e| e.into_path()),
                );
                debug!("{} images under {:?}", files.len() - before, path);
            }
            PathKind::File => files.push(path.to_path_buf()),
            PathKind::Missing => trace!("Skipping {:?}, not a file or directory", path),
        }
    }

    files
}
