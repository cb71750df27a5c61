//! Workbook content addressing.

use std::path::Path;

use anyhow::{Context, Result};
use lectern_core::proposal::ExcelHash;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the workbook bytes.
pub fn workbook_hash(bytes: &[u8]) -> Result<ExcelHash> {
  let hex = hex::encode(Sha256::digest(bytes));
  ExcelHash::try_from(hex).context("hashing workbook")
}

pub fn hash_file(path: &Path) -> Result<ExcelHash> {
  let bytes = std::fs::read(path)
    .with_context(|| format!("reading workbook {}", path.display()))?;
  workbook_hash(&bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_lowercase_sha256_hex() {
    let h = workbook_hash(b"abc").unwrap();
    assert_eq!(
      h.as_str(),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn different_bytes_give_different_hashes() {
    assert_ne!(workbook_hash(b"v1").unwrap(), workbook_hash(b"v2").unwrap());
  }
}
