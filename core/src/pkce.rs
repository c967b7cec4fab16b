/*
    spotify-discover | Rust CLI to explore your Spotify profile, library and recommendations.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Characters used for verifiers and state tokens. A subset of the RFC 7636 unreserved set.
pub const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const MIN_VERIFIER_LENGTH: usize = 43;
pub const MAX_VERIFIER_LENGTH: usize = 128;
pub const STATE_LENGTH: usize = 16;

/// Returns a random string of `length` characters drawn from [`CHARSET`].
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Computes the S256 code challenge: `BASE64URL(SHA256(verifier))` without `=` padding.
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generates an anti-CSRF state token for a single login attempt.
pub fn generate_state() -> String {
    generate_random_string(STATE_LENGTH)
}

/// A verifier together with the challenge derived from it.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generates a pair with the longest verifier RFC 7636 allows.
    pub fn generate() -> Self {
        Self::from_verifier(generate_random_string(MAX_VERIFIER_LENGTH))
    }

    /// Generates a pair with a verifier of `length` characters.
    ///
    /// Returns `None` when `length` is outside `43..=128`.
    pub fn with_length(length: usize) -> Option<Self> {
        if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
            return None;
        }
        Some(Self::from_verifier(generate_random_string(length)))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = generate_code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_matches_rfc7636_vector() {
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_challenge_is_padding_free_for_all_lengths() {
        for length in MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH {
            let pair = PkcePair::with_length(length).unwrap();
            assert_eq!(pair.verifier.len(), length);
            // 32 byte digest always encodes to 43 characters without padding.
            assert_eq!(pair.challenge.len(), 43);
            assert!(!pair.challenge.contains('='));
            assert!(!pair.challenge.contains('+'));
            assert!(!pair.challenge.contains('/'));
            assert_eq!(pair.challenge, generate_code_challenge(&pair.verifier));
        }
    }

    #[test]
    fn test_with_length_rejects_out_of_range() {
        assert!(PkcePair::with_length(42).is_none());
        assert!(PkcePair::with_length(129).is_none());
    }

    #[test]
    fn test_default_pair_uses_max_length() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier.len(), MAX_VERIFIER_LENGTH);
    }

    #[test]
    fn test_random_string_uses_charset() {
        let s = generate_random_string(256);
        assert!(s.bytes().all(|b| CHARSET.contains(&b)), "unexpected char in {}", s);
    }

    #[test]
    fn test_state_is_sixteen_chars_and_unique() {
        let s1 = generate_state();
        let s2 = generate_state();
        assert_eq!(s1.len(), STATE_LENGTH);
        assert_ne!(s1, s2);
    }
}
