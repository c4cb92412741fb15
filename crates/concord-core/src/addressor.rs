//! Content addressing for submitted text.

use sha2::{Digest, Sha256};

use concord_contracts::record::RecordKey;

/// Derive the ledger key for `text`.
///
/// SHA-256 over the UTF-8 bytes, rendered as 64 lowercase hex characters.
/// No normalization is applied: inputs that differ by a single byte get
/// different keys.
pub fn content_key(text: &str) -> RecordKey {
    RecordKey(hex::encode(Sha256::digest(text.as_bytes())))
}

/// Join several fields into one keyable input.
///
/// Each part is written as `<byte length>:<bytes>,`, so no two distinct
/// part lists encode to the same string, whatever the parts contain.
pub fn encode_parts(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        out.push_str(&part.len().to_string());
        out.push(':');
        out.push_str(part);
        out.push(',');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{content_key, encode_parts};

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            content_key("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_is_fixed_length_lowercase_hex() {
        let key = content_key("Great job everyone, thanks for your help!");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn whitespace_changes_the_key() {
        assert_ne!(content_key("proposal"), content_key("proposal "));
    }

    #[test]
    fn encoded_parts_keep_their_boundaries() {
        assert_ne!(
            encode_parts(&["Claim one\nsecond line", "evidence body"]),
            encode_parts(&["Claim one", "second line\nevidence body"])
        );
        assert_ne!(encode_parts(&["ab", "c"]), encode_parts(&["a", "bc"]));
        assert_ne!(encode_parts(&["1:a,", ""]), encode_parts(&["1", "a,"]));
        assert_eq!(encode_parts(&["url", "x"]), "3:url,1:x,");
    }
}
