use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

const SIZE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
	Absent,
	Dir,
	File,
}

/// Resolves relative paths against a project root.
///
/// Absolute inputs are only normalized; relative inputs are joined onto the
/// root first. Normalization is lexical (`.` and `..` are folded, symlinks are
/// left alone).
#[derive(Debug, Clone)]
pub struct PathResolver {
	root: PathBuf,
}

impl PathResolver {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		let root = root.into();
		let root = if root.is_absolute() {
			normalize(&root)
		} else {
			let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
			normalize(&cwd.join(root))
		};
		Self { root }
	}

	/// Resolver rooted at the current working directory.
	pub fn current() -> Self {
		Self::new(".")
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn real_path(&self, path: impl AsRef<Path>) -> PathBuf {
		let path = path.as_ref();
		if path.is_absolute() {
			normalize(path)
		} else {
			normalize(&self.root.join(path))
		}
	}

	/// Same as [`real_path`](Self::real_path) but as a string ending in `/`.
	pub fn real_path_slash(&self, path: impl AsRef<Path>) -> String {
		with_slash(self.real_path(path).to_string_lossy().into_owned())
	}

	/// Resolves the path and creates it as a directory when missing.
	pub fn real_path_mkdir(&self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
		let real = self.real_path(path);
		if !real.is_dir() {
			fs::create_dir_all(&real)?;
		}
		Ok(real)
	}

	/// The resolved path relative to the root, or the absolute path when it
	/// lies outside of it.
	pub fn safe_path(&self, path: impl AsRef<Path>) -> PathBuf {
		let real = self.real_path(path);
		match real.strip_prefix(&self.root) {
			Ok(rest) => rest.to_path_buf(),
			Err(_) => real,
		}
	}

	pub fn path_kind(&self, path: impl AsRef<Path>) -> io::Result<PathKind> {
		match fs::metadata(self.real_path(path)) {
			Ok(meta) if meta.is_dir() => Ok(PathKind::Dir),
			Ok(_) => Ok(PathKind::File),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PathKind::Absent),
			Err(e) => Err(e),
		}
	}

	pub fn dir_exists(&self, path: impl AsRef<Path>) -> bool {
		matches!(self.path_kind(path), Ok(PathKind::Dir))
	}

	pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
		matches!(self.path_kind(path), Ok(PathKind::File))
	}

	/// Human readable size of a file; `0 B` when it cannot be read.
	pub fn file_size(&self, path: impl AsRef<Path>) -> String {
		let len = fs::metadata(self.real_path(path)).map(|m| m.len()).unwrap_or(0);
		format_size(len)
	}

	/// Removes a directory tree. With `keep_self` the directory is recreated empty.
	pub fn remove_dir(&self, path: impl AsRef<Path>, keep_self: bool) -> io::Result<()> {
		let real = self.real_path(path);
		fs::remove_dir_all(&real)?;
		if keep_self {
			fs::create_dir(&real)?;
		}
		Ok(())
	}

	pub fn read_file(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
		fs::read(self.real_path(path))
	}

	/// Writes `data`, truncating unless `append` is set. Parent directories
	/// are created for new files.
	pub fn write_file(&self, path: impl AsRef<Path>, data: &[u8], append: bool) -> io::Result<()> {
		let real = self.real_path(path);
		ensure_parent(&real)?;
		let mut file = OpenOptions::new()
			.create(true)
			.write(true)
			.append(append)
			.truncate(!append)
			.open(&real)?;
		file.write_all(data)
	}

	pub fn put_append(&self, path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
		self.write_file(path, data, true)
	}

	/// Writes `data` starting at byte `offset`, keeping the rest of the file.
	pub fn put_offset(&self, path: impl AsRef<Path>, data: &[u8], offset: u64) -> io::Result<()> {
		let real = self.real_path(path);
		let mut file = OpenOptions::new().create(true).write(true).truncate(false).open(&real)?;
		file.seek(SeekFrom::Start(offset))?;
		file.write_all(data)
	}
}

impl Default for PathResolver {
	fn default() -> Self {
		Self::current()
	}
}

/// Formats a byte count with 1024-based units, e.g. `1.5 KB` or `12 MB`.
pub fn format_size(bytes: u64) -> String {
	if bytes < 10 {
		return format!("{} B", bytes);
	}
	let mut exp = 0;
	while exp + 1 < SIZE_UNITS.len() && bytes >= 1u64 << (10 * (exp + 1)) {
		exp += 1;
	}
	let value = bytes as f64 / (1u64 << (10 * exp)) as f64;
	if value < 10.0 {
		format!("{:.1} {}", value, SIZE_UNITS[exp])
	} else {
		format!("{:.0} {}", value, SIZE_UNITS[exp])
	}
}

/// Copies a file's contents and permissions.
pub fn copy_file(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> io::Result<()> {
	fs::copy(source, dest).map(|_| ())
}

/// Recursively copies `source` into `dest`.
///
/// `filter` receives `(source_file, dest_file)` and decides whether a file is
/// copied. A destination that ends up with nothing copied is removed again.
pub fn copy_dir(
	source: impl AsRef<Path>,
	dest: impl AsRef<Path>,
	filter: Option<&dyn Fn(&Path, &Path) -> bool>,
) -> io::Result<()> {
	let source = source.as_ref();
	let dest = dest.as_ref();
	let perms = fs::metadata(source)?.permissions();
	fs::create_dir_all(dest)?;

	let mut copied = 0usize;
	for entry in fs::read_dir(source)? {
		let entry = entry?;
		let src_path = entry.path();
		let dest_path = dest.join(entry.file_name());
		if entry.file_type()?.is_dir() {
			copy_dir(&src_path, &dest_path, filter)?;
			copied += 1;
		} else if filter.map_or(true, |f| f(&src_path, &dest_path)) {
			copy_file(&src_path, &dest_path)?;
			copied += 1;
		}
	}

	if copied == 0 {
		return fs::remove_dir_all(dest);
	}
	fs::set_permissions(dest, perms)
}

/// Directory containing the running executable, falling back to the
/// current directory.
pub fn program_dir() -> PathBuf {
	std::env::current_exe()
		.ok()
		.and_then(|exe| exe.parent().map(Path::to_path_buf))
		.unwrap_or_else(|| PathResolver::current().root().to_path_buf())
}

fn ensure_parent(path: &Path) -> io::Result<()> {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => fs::create_dir_all(parent),
		_ => Ok(()),
	}
}

fn with_slash(mut path: String) -> String {
	if !path.ends_with('/') {
		path.push('/');
	}
	path
}

fn normalize(path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				out.pop();
			}
			other => out.push(other.as_os_str()),
		}
	}
	out
}
