use std::fmt::Debug;

/// Post-processing applied to a response once every fragment is in.
///
/// Some mods scramble their query responses; a mutator undoes that before the
/// type byte is read. Implementations must not hold per-request state.
pub trait StreamMutator: Debug + Send + Sync {
    fn mutate(&self, data: Vec<u8>) -> Vec<u8>;
}

/// Leaves the stream untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericMutator;

impl StreamMutator for GenericMutator {
    fn mutate(&self, data: Vec<u8>) -> Vec<u8> {
        data
    }
}

/// XORs the stream with a repeating key.
#[derive(Debug, Clone, Default)]
pub struct XorMutator {
    key: Vec<u8>,
}

impl XorMutator {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        XorMutator { key: key.into() }
    }
}

impl StreamMutator for XorMutator {
    fn mutate(&self, mut data: Vec<u8>) -> Vec<u8> {
        if self.key.is_empty() {
            return data;
        }
        for (byte, key) in data.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= key;
        }
        data
    }
}
