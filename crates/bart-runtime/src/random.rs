// SPDX-License-Identifier: AGPL-3.0-only

//! Splittable pseudo-random keys
//!
//! A [`Key`] is 256 bits of ChaCha key material. Splitting a key seeds a
//! ChaCha20 stream with that material and reads the children off it in order,
//! so every derivation is a pure function of the root seed and the position in
//! the split tree.
//!
//! Keys are consumed by every operation that draws from them (`split`,
//! `into_rng`). `Key` is neither `Clone` nor `Copy`: reusing a key is a
//! compile error, not something checked at runtime. The one way to duplicate
//! key material is [`Device::put`](crate::Device::put), which places a copy
//! on a device so that several devices can run the same chains.
//!
//! ```
//! use bart_runtime::random::{Key, KeyStream};
//!
//! let mut stream = KeyStream::new(202_403_241_634);
//! let [x_key, noise_key, chain_root] = stream.advance();
//! let chains = chain_root.split(8);
//! assert_eq!(chains.len(), 8);
//! # drop((x_key, noise_key));
//! ```

use rand::{RngCore, SeedableRng};
use rand_chacha::{ChaCha20Rng, ChaCha8Rng};

use crate::compile::{DType, Shaped, Signature, TensorSpec};
use crate::device::{DeviceBuffer, Transfer};

/// Bytes of key material per key
pub const KEY_BYTES: usize = 32;

/// One pseudo-random key. Consumed on use.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Key {
    material: [u8; KEY_BYTES],
}

impl Key {
    /// Placeholder left behind while a [`KeyStream`] swaps its root.
    const SPENT: Key = Key {
        material: [0; KEY_BYTES],
    };

    /// Derive the root key from an integer seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        Self::draw(&mut rng)
    }

    /// Split into `count` independent child keys, consuming `self`.
    #[must_use]
    pub fn split(self, count: usize) -> Vec<Key> {
        let mut rng = self.splitter();
        (0..count).map(|_| Self::draw(&mut rng)).collect()
    }

    /// Split into a fixed number of children, for destructuring.
    ///
    /// `key.split_array::<N>()` yields the same keys as `key.split(N)`.
    #[must_use]
    pub fn split_array<const N: usize>(self) -> [Key; N] {
        let mut rng = self.splitter();
        std::array::from_fn(|_| Self::draw(&mut rng))
    }

    /// Consume the key into a sampling generator.
    #[must_use]
    pub fn into_rng(self) -> ChaCha8Rng {
        ChaCha8Rng::from_seed(self.material)
    }

    /// 64-bit digest of the key material, for reproducibility checks and logs.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.material
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .fold(0, |acc, word| acc.rotate_left(17) ^ word)
    }

    fn splitter(self) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(self.material)
    }

    fn draw(rng: &mut ChaCha20Rng) -> Key {
        let mut material = [0u8; KEY_BYTES];
        rng.fill_bytes(&mut material);
        Key { material }
    }
}

impl DeviceBuffer for Key {
    fn nbytes(&self) -> usize {
        KEY_BYTES
    }
}

impl Transfer for Key {
    fn transfer(&self) -> Self {
        Key {
            material: self.material,
        }
    }
}

impl Shaped for Vec<Key> {
    fn signature(&self) -> Signature {
        Signature::from(vec![TensorSpec::new(
            "keys",
            DType::Key,
            vec![self.len()],
        )])
    }
}

/// Binary-splitting sequence of keys rooted at one seed.
///
/// Each [`advance`](Self::advance) splits the current root into `N + 1`
/// children: the first becomes the next root, the remaining `N` go to the
/// caller. Consumers therefore never share a split.
#[derive(Debug)]
pub struct KeyStream {
    root: Key,
    steps: u64,
}

impl KeyStream {
    /// Start a stream from an integer seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            root: Key::from_seed(seed),
            steps: 0,
        }
    }

    /// Draw `N` fresh keys and move the root forward.
    pub fn advance<const N: usize>(&mut self) -> [Key; N] {
        let root = std::mem::replace(&mut self.root, Key::SPENT);
        let mut rng = root.splitter();
        self.root = Key::draw(&mut rng);
        self.steps += 1;
        std::array::from_fn(|_| Key::draw(&mut rng))
    }

    /// Number of times the stream has advanced.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Fingerprint of the current root.
    #[must_use]
    pub fn root_fingerprint(&self) -> u64 {
        self.root.fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn fingerprints(keys: &[Key]) -> Vec<u64> {
        keys.iter().map(Key::fingerprint).collect()
    }

    #[test]
    fn split_is_deterministic() {
        let a = Key::from_seed(7).split(4);
        let b = Key::from_seed(7).split(4);
        assert_eq!(a, b);
    }

    #[test]
    fn children_are_distinct() {
        let keys = Key::from_seed(7).split(16);
        let mut prints = fingerprints(&keys);
        prints.sort_unstable();
        prints.dedup();
        assert_eq!(prints.len(), 16);
    }

    #[test]
    fn split_array_matches_split() {
        let [a, b, c] = Key::from_seed(11).split_array();
        let v = Key::from_seed(11).split(3);
        assert_eq!(vec![a, b, c], v);
    }

    #[test]
    fn different_seeds_diverge() {
        assert_ne!(Key::from_seed(1), Key::from_seed(2));
    }

    #[test]
    fn stream_never_hands_out_its_root() {
        let mut stream = KeyStream::new(3);
        let root = stream.root_fingerprint();
        let [x, y, z] = stream.advance();
        let handed = [x.fingerprint(), y.fingerprint(), z.fingerprint()];
        assert!(!handed.contains(&root));
        assert!(!handed.contains(&stream.root_fingerprint()));
        assert_eq!(stream.steps(), 1);
    }

    #[test]
    fn stream_is_reproducible_across_runs() {
        let run = |seed| {
            let mut stream = KeyStream::new(seed);
            (0..5)
                .flat_map(|_| {
                    let [a, b] = stream.advance();
                    [a.fingerprint(), b.fingerprint()]
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(202_403_241_634), run(202_403_241_634));
    }

    #[test]
    fn rng_streams_differ_between_siblings() {
        let [a, b] = Key::from_seed(5).split_array();
        let xa: u64 = a.into_rng().gen();
        let xb: u64 = b.into_rng().gen();
        assert_ne!(xa, xb);
    }

    #[test]
    fn transfer_copies_material_exactly() {
        let keys = Key::from_seed(4).split(3);
        let placed = keys.transfer();
        assert_eq!(fingerprints(&placed), fingerprints(&keys));
    }

    #[test]
    fn key_batch_signature_has_lane_axis() {
        let keys = Key::from_seed(0).split(8);
        let sig = keys.signature();
        assert_eq!(sig.tensors()[0].dims(), &[8]);
    }
}
