//! Seedable randomness for nodes that roll dice.
//!
//! Generators are plain values owned by the node that draws from them, so a tree built from one
//! seed replays the same choices. Not cryptographic.

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    /// Uniform in `[0, 1)`, built from the top 24 bits of one draw.
    fn next_f32_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u32 << 24) as f32
    }

    /// Uniform draw in `0..bound`. Returns 0 when `bound` is 0.
    fn next_below(&mut self, bound: u64) -> u64 {
        ((u128::from(self.next_u64()) * u128::from(bound)) >> 64) as u64
    }
}

impl<R: DeterministicRng + ?Sized> DeterministicRng for Box<R> {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Weyl sequence passed through [`mix64`]. Small, fast and good enough for gameplay rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        mix64(self.state)
    }
}

/// Uniform Fisher-Yates shuffle driven by `rng`.
pub fn shuffle<T>(rng: &mut dyn DeterministicRng, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.next_below(i as u64 + 1) as usize;
        items.swap(i, j);
    }
}

/// SplitMix64 finalizer: a bijection on `u64` with full avalanche.
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for one consumer (`node_id`) of a tree-wide seed. `stream` separates unrelated uses of
/// the same node id.
pub fn derive_seed(tree_seed: u64, node_id: u64, stream: u64) -> u64 {
    mix64(tree_seed ^ mix64(node_id.wrapping_add(GOLDEN_GAMMA)) ^ mix64(stream))
}
