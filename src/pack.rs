//! C11 — Pack integrity.
//!
//! Verifies the files inside a language/model pack directory against a
//! `checksums.sha256` manifest, and can generate that manifest for a
//! freshly-assembled pack. Grounded on `ipa_core/packs/integrity.py`
//! (format and semantics) and on the teacher's `asr::model_manager`
//! chunked `Sha256` usage (hashing crate choice).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

pub const CHECKSUMS_FILENAME: &str = "checksums.sha256";
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// On-disk manifest (§ language pack layout): `id`, `version`, BCP-47
/// `language`, optional `dialect`, paths to `inventory`/`lexicon`, optional
/// `sources`, optional `license`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    pub id: String,
    pub version: String,
    pub language: String,
    #[serde(default)]
    pub dialect: Option<String>,
    pub inventory_path: String,
    pub lexicon_path: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
}

/// `{consonants: [token], vowels: [token]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub consonants: Vec<String>,
    #[serde(default)]
    pub vowels: Vec<String>,
}

/// Normalized word → space-separated IPA string (tokenizable per the IPA
/// tokenizer). One surface form maps to exactly one canonical IPA entry;
/// dialect variation is a different pack, not a second lexicon entry.
pub type Lexicon = HashMap<String, String>;

/// An immutable, versioned bundle of language data: manifest + inventory +
/// lexicon, loaded once at kernel setup and never mutated at runtime.
#[derive(Debug, Clone)]
pub struct LanguagePack {
    pub manifest: PackManifest,
    pub inventory: Inventory,
    pub lexicon: Lexicon,
}

impl LanguagePack {
    /// Loads `manifest.json` plus the inventory and lexicon files it
    /// references, all relative to `pack_dir`. Does not check integrity;
    /// call [`verify`] first if the pack's provenance isn't already trusted.
    pub fn load(pack_dir: &Path) -> Result<Self, PackError> {
        let manifest: PackManifest = read_json(&pack_dir.join(MANIFEST_FILENAME))?;
        let inventory: Inventory = read_json(&pack_dir.join(&manifest.inventory_path))?;
        let lexicon: Lexicon = read_json(&pack_dir.join(&manifest.lexicon_path))?;
        Ok(Self { manifest, inventory, lexicon })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PackError> {
    let contents = std::fs::read_to_string(path).map_err(|e| PackError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| PackError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{CHECKSUMS_FILENAME} not found in {0}: pack has no integrity manifest")]
    ChecksumsMissing(PathBuf),
    #[error("{CHECKSUMS_FILENAME} in {0} is empty")]
    ChecksumsEmpty(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityResult {
    pub valid: bool,
    pub verified_files: Vec<String>,
    pub failed_files: Vec<String>,
    pub unverified_files: Vec<String>,
    pub missing_files: Vec<String>,
    pub error: Option<String>,
}

impl IntegrityResult {
    fn failed_with(pack_dir: &Path, error: impl Into<String>) -> Self {
        warn!(pack_dir = %pack_dir.display(), "pack integrity check could not run");
        Self {
            valid: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

pub fn compute_file_sha256(path: &Path) -> Result<String, PackError> {
    let mut file = File::open(path).map_err(|e| PackError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| PackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_lower(&hasher.finalize()))
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parses `checksums.sha256`: blank lines and `#`-comments are skipped, each
/// remaining line is `hash<two spaces>filename`. Malformed lines and
/// non-64-char hashes are logged and skipped rather than failing the load.
pub fn load_checksums(pack_dir: &Path) -> Result<HashMap<String, String>, PackError> {
    let checksums_path = pack_dir.join(CHECKSUMS_FILENAME);
    if !checksums_path.exists() {
        return Err(PackError::ChecksumsMissing(pack_dir.to_path_buf()));
    }

    let file = File::open(&checksums_path).map_err(|e| PackError::Io {
        path: checksums_path.clone(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let mut checksums = HashMap::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PackError::Io {
            path: checksums_path.clone(),
            source: e,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((hash_val, filename)) = line.split_once("  ") else {
            warn!(line = line_num + 1, "{CHECKSUMS_FILENAME}: malformed line, skipping");
            continue;
        };
        if hash_val.len() != 64 {
            warn!(line = line_num + 1, filename, "{CHECKSUMS_FILENAME}: invalid hash length, skipping");
            continue;
        }

        checksums.insert(filename.to_string(), hash_val.to_lowercase());
    }

    Ok(checksums)
}

/// Verifies every file named in the manifest against its checksum.
/// `required_files` not present in the manifest itself count as missing.
pub fn verify(pack_dir: &Path, required_files: &[&str]) -> IntegrityResult {
    let expected = match load_checksums(pack_dir) {
        Ok(expected) => expected,
        Err(err) => return IntegrityResult::failed_with(pack_dir, err.to_string()),
    };

    if expected.is_empty() {
        return IntegrityResult::failed_with(
            pack_dir,
            PackError::ChecksumsEmpty(pack_dir.to_path_buf()).to_string(),
        );
    }

    let mut verified = Vec::new();
    let mut failed = Vec::new();
    let mut missing = Vec::new();

    for (filename, expected_hash) in &expected {
        let file_path = pack_dir.join(filename);
        if !file_path.exists() {
            missing.push(filename.clone());
            continue;
        }
        match compute_file_sha256(&file_path) {
            Ok(actual) if &actual == expected_hash => verified.push(filename.clone()),
            Ok(actual) => {
                warn!(
                    filename,
                    expected = &expected_hash[..16],
                    actual = &actual[..16],
                    "checksum mismatch"
                );
                failed.push(filename.clone());
            }
            Err(err) => {
                warn!(filename, error = %err, "could not hash file during verification");
                failed.push(filename.clone());
            }
        }
    }

    for required in required_files {
        if !expected.contains_key(*required) {
            missing.push(format!("{required} (not in {CHECKSUMS_FILENAME})"));
        }
    }

    verified.sort();
    failed.sort();
    missing.sort();

    IntegrityResult {
        valid: failed.is_empty() && missing.is_empty(),
        verified_files: verified,
        failed_files: failed,
        unverified_files: Vec::new(),
        missing_files: missing,
        error: None,
    }
}

const AUTO_DETECT_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "onnx", "gguf", "bin"];
const AUTO_DETECT_EXCLUDE: &[&str] = &[CHECKSUMS_FILENAME, "manifest.yaml", "pack.yaml"];

/// Computes checksums for `files`, or (when `None`) auto-detects every
/// pack-data file in `pack_dir` by extension.
pub fn generate(pack_dir: &Path, files: Option<&[String]>) -> Result<HashMap<String, String>, PackError> {
    let names: Vec<String> = match files {
        Some(files) => files.to_vec(),
        None => {
            let mut found = Vec::new();
            let entries = std::fs::read_dir(pack_dir).map_err(|e| PackError::Io {
                path: pack_dir.to_path_buf(),
                source: e,
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| PackError::Io {
                    path: pack_dir.to_path_buf(),
                    source: e,
                })?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                    continue;
                };
                if AUTO_DETECT_EXTENSIONS.contains(&ext) && !AUTO_DETECT_EXCLUDE.contains(&name) {
                    found.push(name.to_string());
                }
            }
            found
        }
    };

    let mut checksums = HashMap::new();
    for filename in names {
        let file_path = pack_dir.join(&filename);
        if file_path.exists() {
            checksums.insert(filename, compute_file_sha256(&file_path)?);
        }
    }
    Ok(checksums)
}

/// Writes `checksums.sha256` in deterministic, sorted-by-filename order.
pub fn write(pack_dir: &Path, checksums: &HashMap<String, String>) -> Result<PathBuf, PackError> {
    let checksums_path = pack_dir.join(CHECKSUMS_FILENAME);
    let mut file = File::create(&checksums_path).map_err(|e| PackError::Io {
        path: checksums_path.clone(),
        source: e,
    })?;

    writeln!(file, "# PronunciaPA Pack Checksums").map_err(|e| PackError::Io {
        path: checksums_path.clone(),
        source: e,
    })?;
    writeln!(file, "# Format: sha256_hash  filename").map_err(|e| PackError::Io {
        path: checksums_path.clone(),
        source: e,
    })?;
    writeln!(file, "# Generated automatically - do not edit\n").map_err(|e| PackError::Io {
        path: checksums_path.clone(),
        source: e,
    })?;

    let mut names: Vec<&String> = checksums.keys().collect();
    names.sort();
    for name in names {
        writeln!(file, "{}  {}", checksums[name], name).map_err(|e| PackError::Io {
            path: checksums_path.clone(),
            source: e,
        })?;
    }

    Ok(checksums_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn generates_then_verifies_a_clean_pack() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "inventory.yaml", "consonants: [p, b, t]");
        write_file(dir.path(), "lexicon.json", "{\"hola\": \"o l a\"}");

        let checksums = generate(dir.path(), None).unwrap();
        assert_eq!(checksums.len(), 2);
        write(dir.path(), &checksums).unwrap();

        let result = verify(dir.path(), &[]);
        assert!(result.valid);
        assert_eq!(result.verified_files.len(), 2);
        assert!(result.failed_files.is_empty());
    }

    #[test]
    fn detects_tampered_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "inventory.yaml", "consonants: [p, b, t]");
        let checksums = generate(dir.path(), None).unwrap();
        write(dir.path(), &checksums).unwrap();

        write_file(dir.path(), "inventory.yaml", "consonants: [p, b, t, TAMPERED]");

        let result = verify(dir.path(), &[]);
        assert!(!result.valid);
        assert_eq!(result.failed_files, vec!["inventory.yaml".to_string()]);
    }

    #[test]
    fn missing_manifest_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let result = verify(dir.path(), &[]);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains(CHECKSUMS_FILENAME));
    }

    #[test]
    fn missing_referenced_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "inventory.yaml", "x");
        let checksums = generate(dir.path(), None).unwrap();
        write(dir.path(), &checksums).unwrap();
        fs::remove_file(dir.path().join("inventory.yaml")).unwrap();

        let result = verify(dir.path(), &[]);
        assert!(!result.valid);
        assert_eq!(result.missing_files, vec!["inventory.yaml".to_string()]);
    }

    #[test]
    fn required_file_absent_from_manifest_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "inventory.yaml", "x");
        let checksums = generate(dir.path(), None).unwrap();
        write(dir.path(), &checksums).unwrap();

        let result = verify(dir.path(), &["lexicon.json"]);
        assert!(!result.valid);
        assert!(result.missing_files.iter().any(|m| m.contains("lexicon.json")));
    }

    #[test]
    fn write_output_is_sorted_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        let mut checksums = HashMap::new();
        checksums.insert("zzz.yaml".to_string(), "a".repeat(64));
        checksums.insert("aaa.yaml".to_string(), "b".repeat(64));
        let path = write(dir.path(), &checksums).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let aaa_pos = contents.find("aaa.yaml").unwrap();
        let zzz_pos = contents.find("zzz.yaml").unwrap();
        assert!(aaa_pos < zzz_pos);
    }

    #[test]
    fn language_pack_loads_manifest_inventory_and_lexicon() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            MANIFEST_FILENAME,
            r#"{"id":"es-mx-v1","version":"1.0.0","language":"es-mx",
                "inventory_path":"inventory.json","lexicon_path":"lexicon.json"}"#,
        );
        write_file(dir.path(), "inventory.json", r#"{"consonants":["p","b"],"vowels":["a","e"]}"#);
        write_file(dir.path(), "lexicon.json", r#"{"hola":"o l a"}"#);

        let pack = LanguagePack::load(dir.path()).unwrap();
        assert_eq!(pack.manifest.language, "es-mx");
        assert_eq!(pack.inventory.consonants, vec!["p", "b"]);
        assert_eq!(pack.lexicon["hola"], "o l a");
    }

    #[test]
    fn malformed_checksum_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "inventory.yaml", "x");
        let good_hash = compute_file_sha256(&dir.path().join("inventory.yaml")).unwrap();
        write_file(
            dir.path(),
            CHECKSUMS_FILENAME,
            &format!("# comment\n\nbadline\n{good_hash}  inventory.yaml\n"),
        );

        let checksums = load_checksums(dir.path()).unwrap();
        assert_eq!(checksums.len(), 1);
        assert_eq!(checksums["inventory.yaml"], good_hash);
    }
}
