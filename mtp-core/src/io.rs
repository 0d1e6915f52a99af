use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads a corpus from disk as raw bytes, one byte per character.
///
/// - A file is read as-is
/// - A directory yields the concatenation of every regular file it directly
///   contains, in file-name order (subdirectories are ignored)
pub fn read_corpus<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
	let path = path.as_ref();
	if !path.is_dir() {
		return fs::read(path);
	}

	let mut corpus = Vec::new();
	for file in list_files(path)? {
		corpus.extend(fs::read(file)?);
	}
	Ok(corpus)
}

/// Lists the regular files of a directory, sorted by name.
///
/// Returns full paths.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() {
			files.push(path);
		}
	}

	files.sort();
	Ok(files)
}

/// Builds an output path by appending an extension to the full file name of
/// an input path.
///
/// Example:
/// `data/input.txt` + `"mtp.bin"` → `data/input.txt.mtp.bin`
///
/// The output never equals the input, whatever extension the input has.
/// A directory corpus `data/books` maps to `data/books.mtp.bin`, next to it.
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_name = input_path
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output_name = file_name.to_os_string();
	output_name.push(".");
	output_name.push(output_extension);

	Ok(parent.join(output_name))
}
