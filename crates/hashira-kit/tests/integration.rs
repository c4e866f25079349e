use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use hashira_kit::encoding;
use hashira_kit::fs::{self, PathKind, PathResolver};
use serde::{Deserialize, Serialize};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn temp_dir(name: &str) -> PathBuf {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("hashira-kit-test-{}-{}-{}", std::process::id(), n, name));
	let _ = std::fs::remove_dir_all(&dir);
	std::fs::create_dir_all(&dir).unwrap();
	dir
}

// --- Paths ---

#[test]
fn path_kind_classifies_entries() {
	let dir = temp_dir("kind");
	let resolver = PathResolver::new(&dir);
	std::fs::write(dir.join("file.txt"), b"x").unwrap();
	std::fs::create_dir(dir.join("sub")).unwrap();

	assert_eq!(resolver.path_kind("file.txt").unwrap(), PathKind::File);
	assert_eq!(resolver.path_kind("sub").unwrap(), PathKind::Dir);
	assert_eq!(resolver.path_kind("missing").unwrap(), PathKind::Absent);
	assert!(resolver.file_exists("file.txt"));
	assert!(!resolver.file_exists("sub"));
	assert!(resolver.dir_exists("sub"));
	assert!(!resolver.dir_exists("missing"));
}

#[test]
fn real_path_mkdir_creates_nested_dirs() {
	let dir = temp_dir("mkdir");
	let resolver = PathResolver::new(&dir);
	let created = resolver.real_path_mkdir("a/b/c").unwrap();
	assert_eq!(created, dir.join("a").join("b").join("c"));
	assert!(created.is_dir());
	// second call is a no-op
	assert_eq!(resolver.real_path_mkdir("a/b/c").unwrap(), created);
}

#[test]
fn file_size_formats_or_defaults_to_zero() {
	let dir = temp_dir("size");
	let resolver = PathResolver::new(&dir);
	std::fs::write(dir.join("blob"), vec![0u8; 2048]).unwrap();
	assert_eq!(resolver.file_size("blob"), "2.0 KB");
	assert_eq!(resolver.file_size("nope"), "0 B");
}

#[test]
fn remove_dir_can_keep_the_directory() {
	let dir = temp_dir("rmdir");
	let resolver = PathResolver::new(&dir);
	std::fs::create_dir_all(dir.join("cache/nested")).unwrap();
	std::fs::write(dir.join("cache/nested/f"), b"1").unwrap();

	resolver.remove_dir("cache", true).unwrap();
	assert!(dir.join("cache").is_dir());
	assert_eq!(std::fs::read_dir(dir.join("cache")).unwrap().count(), 0);

	resolver.remove_dir("cache", false).unwrap();
	assert!(!dir.join("cache").exists());
}

// --- Writes ---

#[test]
fn write_file_truncates_or_appends() {
	let dir = temp_dir("write");
	let resolver = PathResolver::new(&dir);

	resolver.write_file("out/log.txt", b"hello", false).unwrap();
	resolver.write_file("out/log.txt", b" world", true).unwrap();
	assert_eq!(resolver.read_file("out/log.txt").unwrap(), b"hello world");

	resolver.write_file("out/log.txt", b"reset", false).unwrap();
	assert_eq!(resolver.read_file("out/log.txt").unwrap(), b"reset");
}

#[test]
fn put_append_creates_parents() {
	let dir = temp_dir("append");
	let resolver = PathResolver::new(&dir);
	resolver.put_append("deep/er/file", b"a").unwrap();
	resolver.put_append("deep/er/file", b"b").unwrap();
	assert_eq!(std::fs::read(dir.join("deep/er/file")).unwrap(), b"ab");
}

#[test]
fn put_offset_overwrites_in_place() {
	let dir = temp_dir("offset");
	let resolver = PathResolver::new(&dir);
	std::fs::write(dir.join("data"), b"0123456789").unwrap();

	resolver.put_offset("data", b"ab", 3).unwrap();
	assert_eq!(std::fs::read(dir.join("data")).unwrap(), b"012ab56789");

	resolver.put_offset("fresh", b"z", 2).unwrap();
	assert_eq!(std::fs::read(dir.join("fresh")).unwrap(), b"\0\0z");
}

// --- Copy ---

#[test]
fn copy_file_keeps_permissions() {
	use std::os::unix::fs::PermissionsExt;

	let dir = temp_dir("copy-file");
	let src = dir.join("run.sh");
	std::fs::write(&src, b"#!/bin/sh\n").unwrap();
	std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();

	let dest = dir.join("copy.sh");
	fs::copy_file(&src, &dest).unwrap();
	assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\n");
	let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
	assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn copy_dir_recurses_and_filters() {
	let dir = temp_dir("copy-dir");
	let src = dir.join("src");
	std::fs::create_dir_all(src.join("nested")).unwrap();
	std::fs::write(src.join("keep.txt"), b"k").unwrap();
	std::fs::write(src.join("skip.log"), b"s").unwrap();
	std::fs::write(src.join("nested/inner.txt"), b"i").unwrap();

	let dest = dir.join("dest");
	let only_txt = |from: &Path, _to: &Path| from.extension().map_or(false, |e| e == "txt");
	fs::copy_dir(&src, &dest, Some(&only_txt)).unwrap();

	assert!(dest.join("keep.txt").is_file());
	assert!(!dest.join("skip.log").exists());
	assert_eq!(std::fs::read(dest.join("nested/inner.txt")).unwrap(), b"i");
}

#[test]
fn copy_dir_removes_empty_destination() {
	let dir = temp_dir("copy-empty");
	let src = dir.join("src");
	std::fs::create_dir_all(&src).unwrap();
	std::fs::write(src.join("a.log"), b"a").unwrap();

	let dest = dir.join("dest");
	let reject_all = |_: &Path, _: &Path| false;
	fs::copy_dir(&src, &dest, Some(&reject_all)).unwrap();
	assert!(!dest.exists());
}

#[test]
fn program_dir_contains_test_binary() {
	let exe = std::env::current_exe().unwrap();
	assert_eq!(fs::program_dir(), exe.parent().unwrap());
}

// --- Encoding ---

#[test]
fn base64_bytes_and_strings_agree() {
	let text = "hi,是我";
	let encoded = encoding::base64_encode(text.as_bytes());
	assert_eq!(encoding::base64_decode(&encoded).unwrap(), text.as_bytes());

	let encoded_str = encoding::base64_encode_string(text);
	assert_eq!(encoded_str.as_bytes(), encoded.as_slice());
	assert_eq!(encoding::base64_decode_string(&encoded_str).unwrap(), text);
}

#[test]
fn base64_rejects_garbage() {
	assert!(encoding::base64_decode(b"***").is_err());
	let nul = encoding::base64_encode_string("\u{0}");
	assert!(encoding::base64_decode_string(&nul).is_ok());
	// valid base64, invalid utf-8
	assert!(encoding::base64_decode_string("/w==").is_err());
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Named {
	name: String,
}

#[test]
fn serialize_restores_struct() {
	let value = Named { name: "hi".into() };
	let bytes = encoding::serialize(&value).unwrap();
	let restored: Named = encoding::deserialize(&bytes).unwrap();
	assert_eq!(restored, value);
	assert!(encoding::deserialize::<Named>(b"not json").is_err());
}
