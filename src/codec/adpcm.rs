//! 4-bit adaptive predictive audio codec.
//!
//! Each byte carries two codes, low nibble first. A code holds a sign bit
//! (bit 3) and a 3-bit magnitude quantized against the current step size;
//! the step size adapts through [`INDEX_TABLE`].

/// Quantizer step sizes.
pub const STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408, 449,
    494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066, 2272,
    2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630, 9493,
    10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

/// Step index adjustment per 4-bit code.
pub const INDEX_TABLE: [i32; 16] = [-1, -1, -1, -1, 2, 4, 6, 8, -1, -1, -1, -1, 2, 4, 6, 8];

/// Largest valid step index.
pub const MAX_STEP_INDEX: usize = STEP_TABLE.len() - 1;

/// Codec state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    /// Last reconstructed sample.
    pub predictor: i32,
    /// Index into [`STEP_TABLE`].
    pub step_index: usize,
}

impl ChannelState {
    /// Apply one 4-bit code and return the reconstructed sample.
    pub fn decode_nibble(&mut self, nibble: u8) -> i16 {
        let step = STEP_TABLE[self.step_index];
        let mut diff = step >> 3;
        if nibble & 1 != 0 {
            diff += step >> 2;
        }
        if nibble & 2 != 0 {
            diff += step >> 1;
        }
        if nibble & 4 != 0 {
            diff += step;
        }
        if nibble & 8 != 0 {
            diff = -diff;
        }

        self.predictor = (self.predictor + diff).clamp(i16::MIN as i32, i16::MAX as i32);
        let index = self.step_index as i32 + INDEX_TABLE[(nibble & 0xF) as usize];
        self.step_index = index.clamp(0, MAX_STEP_INDEX as i32) as usize;
        self.predictor as i16
    }

    /// Quantize one sample to a 4-bit code.
    ///
    /// The state advances through [`decode_nibble`](Self::decode_nibble) so
    /// it matches a decoder fed the same codes.
    pub fn encode_sample(&mut self, sample: i16) -> u8 {
        let mut delta = i32::from(sample) - self.predictor;
        let mut nibble = 0u8;
        if delta < 0 {
            nibble = 8;
            delta = -delta;
        }

        let mut mask = 4u8;
        let mut step = STEP_TABLE[self.step_index];
        for _ in 0..3 {
            if delta > step {
                nibble |= mask;
                delta -= step;
            }
            mask >>= 1;
            step >>= 1;
        }

        self.decode_nibble(nibble);
        nibble
    }
}

/// Decode a track from a fresh state.
pub fn decode(data: &[u8]) -> Vec<i16> {
    decode_with(ChannelState::default(), data).0
}

/// Decode `data` starting from `state`; returns samples and the final state.
pub fn decode_with(mut state: ChannelState, data: &[u8]) -> (Vec<i16>, ChannelState) {
    let mut pcm = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        pcm.push(state.decode_nibble(byte & 0xF));
        pcm.push(state.decode_nibble(byte >> 4));
    }
    (pcm, state)
}

/// Encode samples from a fresh state.
pub fn encode(samples: &[i16]) -> Vec<u8> {
    encode_with(ChannelState::default(), samples).0
}

/// Encode `samples` starting from `state`; returns bytes and the final state.
///
/// An odd trailing sample is stored in the low nibble with an empty high
/// nibble.
pub fn encode_with(mut state: ChannelState, samples: &[i16]) -> (Vec<u8>, ChannelState) {
    let mut out = Vec::with_capacity(samples.len().div_ceil(2));
    for pair in samples.chunks(2) {
        let low = state.encode_sample(pair[0]);
        let high = match pair.get(1) {
            Some(&s) => state.encode_sample(s),
            None => 0,
        };
        out.push(low | (high << 4));
    }
    (out, state)
}
