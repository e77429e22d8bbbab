//! Deterministic test committees.

use rolldpos_types::{
    Address, Block, BlockHeader, BlsSecretKey, DkgMaterial, Endorsement, Hash, KeyPair, Topic,
};

/// One delegate of a test committee: identity keypair plus DKG material.
pub struct TestDelegate {
    /// Identity keypair.
    pub keypair: KeyPair,
    /// Per-epoch BLS share.
    pub dkg: DkgMaterial,
}

/// A committee of deterministic delegates.
///
/// All key material derives from `(seed, index)`, so two committees built
/// with the same arguments are identical.
pub struct TestCommittee {
    delegates: Vec<TestDelegate>,
}

impl TestCommittee {
    /// Create a committee of `n` delegates from a seed.
    pub fn new(n: usize, seed: u64) -> Self {
        let delegates = (0..n)
            .map(|i| {
                let mut id_seed = [0u8; 32];
                id_seed[..8].copy_from_slice(&seed.to_le_bytes());
                id_seed[8..16].copy_from_slice(&(i as u64).to_le_bytes());
                let keypair = KeyPair::from_seed(&id_seed);

                let mut bls_seed = id_seed;
                bls_seed[16] = 0x80;
                let secret_key = BlsSecretKey::from_seed(&bls_seed);
                let dkg = DkgMaterial {
                    id: keypair.address().as_bytes().to_vec(),
                    public_key: secret_key.public_key(),
                    secret_key,
                };

                TestDelegate { keypair, dkg }
            })
            .collect();
        Self { delegates }
    }

    /// Number of delegates.
    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    /// Whether the committee is empty.
    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    /// Identity keypair of delegate `i`.
    pub fn keypair(&self, i: usize) -> &KeyPair {
        &self.delegates[i].keypair
    }

    /// DKG material of delegate `i`.
    pub fn dkg(&self, i: usize) -> &DkgMaterial {
        &self.delegates[i].dkg
    }

    /// Address of delegate `i`.
    pub fn address(&self, i: usize) -> Address {
        self.delegates[i].keypair.address()
    }

    /// All delegate addresses, in index order.
    pub fn addresses(&self) -> Vec<Address> {
        self.delegates.iter().map(|d| d.keypair.address()).collect()
    }

    /// Index of the delegate with `address`.
    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.delegates
            .iter()
            .position(|d| d.keypair.address() == *address)
    }

    /// Build a signed endorsement from delegate `i`.
    pub fn make_endorsement(
        &self,
        i: usize,
        height: u64,
        block_hash: Hash,
        topic: Topic,
        decision: bool,
    ) -> Endorsement {
        Endorsement::new_signed(height, block_hash, topic, decision, self.keypair(i))
    }

    /// Build a signed block produced by delegate `i`, carrying its DKG
    /// signature over `seed`.
    pub fn make_dkg_block(
        &self,
        i: usize,
        chain_id: u32,
        height: u64,
        timestamp_ms: u64,
        prev_block_hash: Hash,
        seed: &[u8],
    ) -> Block {
        let dkg = self.dkg(i);
        let header = BlockHeader {
            chain_id,
            height,
            timestamp_ms,
            prev_block_hash,
            action_root: Hash::ZERO,
            producer: self.address(i),
            dkg_id: dkg.id.clone(),
            dkg_pubkey: dkg.public_key.as_bytes().to_vec(),
            dkg_block_sig: dkg.sign_seed(seed).as_bytes().to_vec(),
        };
        Block::new_signed(header, Vec::new(), self.keypair(i))
    }
}
