use anyhow::anyhow;
use hex::FromHex;
use sha1::{Digest, Sha1};
use tracing::trace;

/// The id git assigns to a blob with this content, i.e. the SHA1 of a "blob <len>\0" header
///  followed by the data. This is what the GitHub contents API reports as an entry's `sha`.
pub fn git_blob_sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher: Sha1 = Default::default();
    hasher.update(format!("blob {}\0", data.len()).as_bytes());
    hasher.update(data);
    hasher.finalize().into()
}

pub fn verify_git_blob(data: &[u8], expected_hex: &str) -> anyhow::Result<()> {
    let expected = <[u8; 20]>::from_hex(expected_hex)?;
    let actual = git_blob_sha1(data);
    trace!("validating git blob id {}", expected_hex);

    if actual != expected {
        return Err(anyhow!("checksum mismatch: expected {}, got {}", expected_hex, hex::encode(actual)));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::empty(b"", "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391")]
    #[case::hello_world(b"hello world\n", "3b18e512dba79e4c8300dd08aeb37f8e728b8dad")]
    #[case::test_content(b"test content\n", "d670460b4b4aece5915caf5c68d12f560a9fe3e4")]
    fn test_git_blob_sha1(#[case] data: &[u8], #[case] expected: &str) {
        assert_eq!(hex::encode(git_blob_sha1(data)), expected);
        assert!(verify_git_blob(data, expected).is_ok());
    }

    #[rstest]
    #[case::wrong_content(b"hello world", "3b18e512dba79e4c8300dd08aeb37f8e728b8dad")]
    #[case::not_hex(b"hello world\n", "not a checksum")]
    #[case::too_short(b"hello world\n", "3b18e512")]
    fn test_verify_git_blob_rejects(#[case] data: &[u8], #[case] expected: &str) {
        assert!(verify_git_blob(data, expected).is_err());
    }
}
