//! Turning what the user typed into an image path.
//!
//! Validation is pure and separate from the console loop so both can be
//! tested without a terminal.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::{EDITABLE_EXTENSIONS, ImageKind, has_extension};

/// Why a typed path was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter a file name")]
    Empty,
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("not a supported image file: {}", .0.display())]
    NotAnImage(PathBuf),
    #[error("{} cannot hold EXIF data (use a JPEG, PNG or WebP file)", .0.display())]
    CannotCarryExif(PathBuf),
    #[error("source must be a different file than the target")]
    SameAsTarget,
}

/// An existing image file the tools can work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub kind: ImageKind,
}

/// Resolve `input` against `base_dir`.
///
/// Tried in order: `input` as an absolute path, `base_dir/input`, then
/// `base_dir/<file name of input>` (so a path pasted from elsewhere still
/// finds a same-named file in the working folder).
pub fn resolve_image(input: &str, base_dir: &Path) -> Result<ImageRef, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }

    let typed = Path::new(input);
    let mut candidates = Vec::with_capacity(3);
    if typed.is_absolute() {
        candidates.push(typed.to_path_buf());
    }
    candidates.push(base_dir.join(typed));
    if let Some(name) = typed.file_name() {
        candidates.push(base_dir.join(name));
    }

    let path = candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| ValidationError::NotFound(input.to_string()))?;

    if !path.is_file() || !has_extension(&path, EDITABLE_EXTENSIONS) {
        return Err(ValidationError::NotAnImage(path));
    }
    let kind = ImageKind::from_path(&path).ok_or_else(|| ValidationError::NotAnImage(path.clone()))?;

    Ok(ImageRef { path, kind })
}

/// Like [`resolve_image`], but only accepts containers EXIF can be written to.
pub fn resolve_target(input: &str, base_dir: &Path) -> Result<ImageRef, ValidationError> {
    let target = resolve_image(input, base_dir)?;
    if !target.kind.can_carry_exif() {
        return Err(ValidationError::CannotCarryExif(target.path));
    }
    Ok(target)
}

/// Like [`resolve_image`], but also rejects the file chosen as target.
pub fn resolve_source(
    input: &str,
    base_dir: &Path,
    target: &Path,
) -> Result<ImageRef, ValidationError> {
    let source = resolve_image(input, base_dir)?;
    if same_file(&source.path, target) {
        return Err(ValidationError::SameAsTarget);
    }
    Ok(source)
}

/// Whether two paths name the same file once symlinks and `..` are resolved.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Prompt on `output` and read lines from `input` until `validate` accepts
/// one. Rejections are printed and the prompt repeats; end of input is an
/// `UnexpectedEof` error.
pub fn prompt_until<R, W, T, E, F>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    mut validate: F,
) -> io::Result<T>
where
    R: BufRead,
    W: Write,
    E: std::fmt::Display,
    F: FnMut(&str) -> Result<T, E>,
{
    let mut line = String::new();
    loop {
        write!(output, "{prompt}")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a valid answer was given",
            ));
        }

        match validate(line.trim_end_matches(['\r', '\n'])) {
            Ok(value) => return Ok(value),
            Err(e) => writeln!(output, "  {e}")?,
        }
    }
}
