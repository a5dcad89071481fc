// Random id generation.
//
// Rejection sampling: random bytes are masked down to the smallest power
// of two covering the alphabet, and masked values past the end of the
// alphabet are discarded, so every character is drawn uniformly. The
// batch size oversamples by 1.6 so most ids complete on the first fill.
// Generated ids double as bearer credentials; the source must stay a
// CSPRNG (`thread_rng` is ChaCha-based).

use rand::RngCore;

/// The 62-character alphabet used for session, user, and generated key ids.
pub const DEFAULT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate `length` characters drawn uniformly from `alphabet`.
pub fn generate_random_string(length: usize, alphabet: &str) -> String {
    let chars: Vec<char> = alphabet.chars().collect();
    if length == 0 || chars.is_empty() {
        return String::new();
    }
    if chars.len() == 1 {
        return std::iter::repeat(chars[0]).take(length).collect();
    }

    let mask = index_mask(chars.len());
    let step = ((1.6 * (mask * length) as f64) / chars.len() as f64).ceil() as usize;

    let mut rng = rand::thread_rng();
    let mut bytes = vec![0u8; step.max(1)];
    let mut out = String::with_capacity(length);
    let mut remaining = length;

    loop {
        rng.fill_bytes(&mut bytes);
        for &byte in &bytes {
            if let Some(&c) = chars.get(byte as usize & mask) {
                out.push(c);
                remaining -= 1;
                if remaining == 0 {
                    return out;
                }
            }
        }
    }
}

/// Smallest `2^n - 1` that covers every index of an alphabet of `len >= 2`.
fn index_mask(len: usize) -> usize {
    (2usize << (usize::BITS - 1 - (len - 1).leading_zeros())) - 1
}
