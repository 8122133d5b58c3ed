// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! WARC digest strings (`sha1:` followed by the RFC 4648 base32 SHA-1).

use data_encoding::BASE32;
use sha1::{Digest, Sha1};

/// SHA-1 digest of `data` in WARC notation.
pub fn sha1_digest(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let hash = hasher.finalize();
    format!("sha1:{}", BASE32.encode(hash.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"".as_slice(), "")]
    #[case(b"f".as_slice(), "MY======")]
    #[case(b"fo".as_slice(), "MZXQ====")]
    #[case(b"foo".as_slice(), "MZXW6===")]
    #[case(b"foob".as_slice(), "MZXW6YQ=")]
    #[case(b"fooba".as_slice(), "MZXW6YTB")]
    #[case(b"foobar".as_slice(), "MZXW6YTBOI======")]
    fn test_base32_rfc4648_vectors(#[case] input: &[u8], #[case] expected: &str) {
        assert_eq!(BASE32.encode(input), expected);
    }

    #[test]
    fn test_sha1_digest() {
        // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        assert_eq!(sha1_digest(b"abc"), "sha1:VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5");
    }
}
