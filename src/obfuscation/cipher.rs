use crate::obfuscation::prefix::PrefixSkipper;
use crate::obfuscation::result::Result;
use crate::obfuscation::types::{
    Direction, Key, Role, Seed, HASH_ITERATIONS, KEY_LENGTH, SEED_LENGTH,
};
use crate::obfuscation::Error;
use rand::RngCore;
use rc4::{consts::U16, KeyInit, Rc4, StreamCipher};
use sha1::{Digest, Sha1};

/// Derives a direction key from `seed || keyword || label`, stretched by
/// [`HASH_ITERATIONS`] rounds of SHA-1 over the previous digest.
pub fn derive_key(seed: &Seed, keyword: Option<&[u8]>, label: &[u8]) -> Result<Key> {
    let mut hasher = Sha1::new();
    hasher.update(seed);
    if let Some(keyword) = keyword {
        hasher.update(keyword);
    }
    hasher.update(label);
    let mut digest = hasher.finalize();

    for _ in 0..HASH_ITERATIONS {
        digest = Sha1::digest(digest);
    }

    if digest.len() < KEY_LENGTH {
        return Err(Error::KeyDerivation(digest.len()));
    }
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&digest[..KEY_LENGTH]);
    Ok(key)
}

fn keystream(key: &Key) -> Result<Rc4<U16>> {
    Rc4::<U16>::new_from_slice(key).map_err(|_| Error::KeyDerivation(key.len()))
}

/// Per-session obfuscation state: the seed, keyword and two independent
/// RC4 keystreams, one per direction.
pub struct ObfuscationContext {
    seed: Seed,
    keyword: Option<Vec<u8>>,
    role: Role,
    input: Rc4<U16>,
    output: Rc4<U16>,
    camouflage: bool,
    prefix: PrefixSkipper,
}

impl ObfuscationContext {
    /// Creates a context with a freshly generated random seed.
    pub fn new(role: Role, keyword: Option<&[u8]>, camouflage: bool) -> Result<Self> {
        let mut seed = [0u8; SEED_LENGTH];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::with_seed(seed, role, keyword, camouflage)
    }

    pub fn with_seed(
        seed: Seed,
        role: Role,
        keyword: Option<&[u8]>,
        camouflage: bool,
    ) -> Result<Self> {
        let input_key = derive_key(&seed, keyword, role.input_label())?;
        let output_key = derive_key(&seed, keyword, role.output_label())?;
        log::debug!("Derived obfuscation keys for {:?}", role);

        Ok(Self {
            seed,
            keyword: keyword.map(|k| k.to_vec()),
            role,
            input: keystream(&input_key)?,
            output: keystream(&output_key)?,
            camouflage,
            prefix: PrefixSkipper::default(),
        })
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn keyword(&self) -> Option<&[u8]> {
        self.keyword.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn camouflage(&self) -> bool {
        self.camouflage
    }

    /// Applies the keystream of `direction` to `buffer` in place. Each
    /// direction only ever moves forward, in call order.
    pub fn transform(&mut self, buffer: &mut [u8], direction: Direction) {
        match direction {
            Direction::Inbound => self.input.apply_keystream(buffer),
            Direction::Outbound => self.output.apply_keystream(buffer),
        }
    }

    /// Whether incoming bytes still have to go through the prefix skipper.
    pub fn awaiting_prefix(&self) -> bool {
        self.camouflage && !self.prefix.is_done()
    }

    /// Runs raw incoming bytes through the prefix skipper.
    ///
    /// ## Return
    ///
    /// `Some(n)` once the terminator was matched within `bytes[..n]`.
    pub fn skip_prefix(&mut self, bytes: &[u8]) -> Result<Option<usize>> {
        self.prefix.feed_slice(bytes).map_err(Error::PrefixNotFound)
    }

    pub(crate) fn prefix_skipped(&mut self) {
        self.prefix.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::types::{CLIENT_TO_SERVER, SERVER_TO_CLIENT};
    use rand::Rng;

    fn test_seed() -> Seed {
        let mut seed = [0u8; SEED_LENGTH];
        for (i, b) in seed.iter_mut().enumerate() {
            *b = i as u8;
        }
        seed
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn derive_key_matches_reference_values() {
        let seed = test_seed();
        assert_eq!(
            hex(&derive_key(&seed, None, CLIENT_TO_SERVER).unwrap()),
            "a7123e88952db3e561cc71fe078a06dc"
        );
        assert_eq!(
            hex(&derive_key(&seed, None, SERVER_TO_CLIENT).unwrap()),
            "c426fd7248b1304f7e7f439fcb8e39af"
        );
        assert_eq!(
            hex(&derive_key(&seed, Some(b"secret"), CLIENT_TO_SERVER).unwrap()),
            "d3ea12c07375af0252b1d7e7a9f7866c"
        );
        assert_eq!(
            hex(&derive_key(&seed, Some(b"secret"), SERVER_TO_CLIENT).unwrap()),
            "1a35d47ce9e25f27369da118528c9fa1"
        );
    }

    #[test]
    fn derive_key_is_deterministic() {
        let seed = test_seed();
        let first = derive_key(&seed, Some(b"kw"), CLIENT_TO_SERVER).unwrap();
        let second = derive_key(&seed, Some(b"kw"), CLIENT_TO_SERVER).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, derive_key(&seed, Some(b"kw"), SERVER_TO_CLIENT).unwrap());
    }

    #[test]
    fn outbound_keystream_matches_reference() {
        let mut context =
            ObfuscationContext::with_seed(test_seed(), Role::Initiator, Some(b"secret"), false)
                .unwrap();
        let mut header = [0x0b, 0xf5, 0xca, 0x7e, 0, 0, 0, 0];
        context.transform(&mut header, Direction::Outbound);
        assert_eq!(hex(&header), "3e9364c29e5a3c31");
    }

    fn round_trip(len: usize) {
        let seed = test_seed();
        let mut client =
            ObfuscationContext::with_seed(seed, Role::Initiator, Some(b"kw"), false).unwrap();
        let mut server =
            ObfuscationContext::with_seed(seed, Role::Responder, Some(b"kw"), false).unwrap();

        let mut rng = rand::thread_rng();
        let plain: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

        let mut wire = plain.clone();
        client.transform(&mut wire, Direction::Outbound);
        if len > 16 {
            assert_ne!(wire, plain);
        }
        server.transform(&mut wire, Direction::Inbound);
        assert_eq!(wire, plain);

        let mut reply = plain.clone();
        server.transform(&mut reply, Direction::Outbound);
        client.transform(&mut reply, Direction::Inbound);
        assert_eq!(reply, plain);
    }

    #[test]
    fn transform_round_trips_for_various_lengths() {
        round_trip(0);
        round_trip(1);
        round_trip(4096);
        round_trip(rand::thread_rng().gen_range(10_000..200_000));
    }

    #[test]
    fn chunked_transform_equals_single_pass() {
        let seed = test_seed();
        let mut whole = ObfuscationContext::with_seed(seed, Role::Initiator, None, false).unwrap();
        let mut chunked =
            ObfuscationContext::with_seed(seed, Role::Initiator, None, false).unwrap();

        let mut a = vec![0x42u8; 1000];
        whole.transform(&mut a, Direction::Outbound);

        let mut b = vec![0x42u8; 1000];
        for chunk in b.chunks_mut(7) {
            chunked.transform(chunk, Direction::Outbound);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn directions_do_not_share_state() {
        let seed = test_seed();
        let mut context = ObfuscationContext::with_seed(seed, Role::Initiator, None, false).unwrap();
        let mut fresh = ObfuscationContext::with_seed(seed, Role::Initiator, None, false).unwrap();

        let mut noise = vec![0u8; 512];
        context.transform(&mut noise, Direction::Inbound);

        let mut a = vec![1u8; 64];
        let mut b = vec![1u8; 64];
        context.transform(&mut a, Direction::Outbound);
        fresh.transform(&mut b, Direction::Outbound);
        assert_eq!(a, b);
    }

    #[test]
    fn new_contexts_use_fresh_seeds() {
        let a = ObfuscationContext::new(Role::Initiator, None, false).unwrap();
        let b = ObfuscationContext::new(Role::Initiator, None, false).unwrap();
        assert_ne!(a.seed(), b.seed());
    }
}
