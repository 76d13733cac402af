//! Seeded keystreams used to obfuscate packet opcodes after login.
//!
//! This is not encryption. Both sides derive the same streams from a seed
//! the client sends in its login block, and the only thing the stream
//! touches is the opcode byte. Payloads travel unmodified.

mod isaac;

pub use isaac::IsaacRandom;

/// Offset added to every seed word to derive the server-to-client stream.
pub const ENCODE_SEED_OFFSET: u32 = 50;

/// A deterministic keystream consumed one word per packet.
pub trait StreamCipher {
    fn next_key(&mut self) -> u32;

    fn encode_opcode(&mut self, opcode: u8) -> u8 {
        opcode.wrapping_add(self.next_key() as u8)
    }

    fn decode_opcode(&mut self, wire: u8) -> u8 {
        wire.wrapping_sub(self.next_key() as u8)
    }
}

/// Inbound and outbound keystreams for one endpoint of a session.
#[derive(Clone)]
pub struct CipherPair {
    pub encoder: IsaacRandom,
    pub decoder: IsaacRandom,
}

impl CipherPair {
    /// Server orientation: decode with the raw seed, encode with the offset seed.
    pub fn server(seed: [u32; 4]) -> Self {
        Self {
            encoder: IsaacRandom::new(&offset_seed(seed)),
            decoder: IsaacRandom::new(&seed),
        }
    }

    /// Client orientation, the mirror image of [`CipherPair::server`].
    pub fn client(seed: [u32; 4]) -> Self {
        Self {
            encoder: IsaacRandom::new(&seed),
            decoder: IsaacRandom::new(&offset_seed(seed)),
        }
    }
}

fn offset_seed(seed: [u32; 4]) -> [u32; 4] {
    seed.map(|word| word.wrapping_add(ENCODE_SEED_OFFSET))
}
