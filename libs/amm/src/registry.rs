//! Pool Registry
//!
//! Deterministic pool factory. A pool's address is a pure function of the
//! registry address, the canonical token pair and the pool code hash, so it
//! can be computed offline with [`pool_address`] before the pool exists.
//! The registry only records that a pool was created and owns its state.

use crate::reserve_pool::{PoolParams, ReservePool};
use dex_config::{addressing::CREATE2_PREFIX, ExchangeConfig};
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use tracing::info;
use types::{Address, CallContext, DexError, H256};

/// keccak256 over arbitrary bytes
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}

/// Code fingerprint for a pool implementation label
pub fn pool_code_hash(label: &str) -> H256 {
    keccak256(label.as_bytes())
}

/// Order a pair canonically (lower address first)
pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address), DexError> {
    if token_a == token_b {
        return Err(DexError::IdenticalTokens(token_a));
    }
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    if token0.is_zero() {
        return Err(DexError::ZeroAddress);
    }
    Ok((token0, token1))
}

/// `keccak256(0xff ++ deployer ++ salt ++ code_hash)[12..]`
pub fn create2_address(deployer: Address, salt: H256, code_hash: H256) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(CREATE2_PREFIX);
    preimage.extend_from_slice(deployer.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(code_hash.as_bytes());
    Address::from_slice(&keccak256(&preimage).as_bytes()[12..])
}

/// Address of the pool for an unordered pair, without touching any registry
pub fn pool_address(
    registry: Address,
    token_a: Address,
    token_b: Address,
    code_hash: H256,
) -> Result<Address, DexError> {
    let (token0, token1) = sort_tokens(token_a, token_b)?;
    let mut packed = [0u8; 40];
    packed[..20].copy_from_slice(token0.as_bytes());
    packed[20..].copy_from_slice(token1.as_bytes());
    Ok(create2_address(registry, keccak256(&packed), code_hash))
}

/// Owns every pool and the pair table
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    address: Address,
    params: PoolParams,
    code_hash: H256,
    fee_to: Option<Address>,
    fee_to_setter: Address,
    pairs: HashMap<(Address, Address), Address>,
    pools: HashMap<Address, ReservePool>,
    all_pools: Vec<Address>,
}

impl PoolRegistry {
    pub fn new(
        address: Address,
        fee_to_setter: Address,
        params: PoolParams,
        code_hash: H256,
    ) -> Self {
        Self {
            address,
            params,
            code_hash,
            fee_to: None,
            fee_to_setter,
            pairs: HashMap::new(),
            pools: HashMap::new(),
            all_pools: Vec::new(),
        }
    }

    /// Registry at the configured address, administered by the operator
    pub fn from_config(config: &ExchangeConfig) -> Result<Self, DexError> {
        Ok(Self::new(
            config.deployment.registry,
            config.deployment.operator,
            PoolParams::from_settings(&config.amm)?,
            pool_code_hash(&config.amm.pool_code_label),
        ))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn params(&self) -> PoolParams {
        self.params
    }

    pub fn pool_code_hash(&self) -> H256 {
        self.code_hash
    }

    pub fn compute_pool_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, DexError> {
        pool_address(self.address, token_a, token_b, self.code_hash)
    }

    /// Recorded pool for a pair in either order
    pub fn get_pool(&self, token_a: Address, token_b: Address) -> Option<Address> {
        let (token0, token1) = sort_tokens(token_a, token_b).ok()?;
        self.pairs.get(&(token0, token1)).copied()
    }

    pub fn create_pool(&mut self, token_a: Address, token_b: Address) -> Result<Address, DexError> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        if let Some(existing) = self.pairs.get(&(token0, token1)) {
            return Err(DexError::PoolExists(*existing));
        }

        let address = pool_address(self.address, token0, token1, self.code_hash)?;
        let pool = ReservePool::new(address, self.address, token0, token1, self.params);
        self.pairs.insert((token0, token1), address);
        self.pools.insert(address, pool);
        self.all_pools.push(address);

        info!(
            "Pool created: {:?} for {:?}/{:?} (#{})",
            address,
            token0,
            token1,
            self.all_pools.len()
        );
        Ok(address)
    }

    pub fn get_or_create_pool(
        &mut self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, DexError> {
        // Validate before the lookup so identical tokens never read as "absent"
        sort_tokens(token_a, token_b)?;
        match self.get_pool(token_a, token_b) {
            Some(address) => Ok(address),
            None => self.create_pool(token_a, token_b),
        }
    }

    pub fn pool(&self, address: Address) -> Option<&ReservePool> {
        self.pools.get(&address)
    }

    pub fn pool_mut(&mut self, address: Address) -> Option<&mut ReservePool> {
        self.pools.get_mut(&address)
    }

    pub fn pool_for_pair(&self, token_a: Address, token_b: Address) -> Option<&ReservePool> {
        self.get_pool(token_a, token_b)
            .and_then(|address| self.pools.get(&address))
    }

    pub fn is_pool(&self, address: Address) -> bool {
        self.pools.contains_key(&address)
    }

    /// Pool created at position `index`, in creation order
    pub fn all_pools(&self, index: usize) -> Option<Address> {
        self.all_pools.get(index).copied()
    }

    pub fn all_pools_length(&self) -> usize {
        self.all_pools.len()
    }

    pub fn pools(&self) -> impl Iterator<Item = &ReservePool> {
        self.all_pools
            .iter()
            .filter_map(move |address| self.pools.get(address))
    }

    pub fn fee_to(&self) -> Option<Address> {
        self.fee_to
    }

    pub fn fee_to_setter(&self) -> Address {
        self.fee_to_setter
    }

    pub fn set_fee_to(
        &mut self,
        ctx: &CallContext,
        fee_to: Option<Address>,
    ) -> Result<(), DexError> {
        self.ensure_setter(ctx)?;
        self.fee_to = fee_to;
        info!("Protocol fee recipient set to {:?}", fee_to);
        Ok(())
    }

    pub fn set_fee_to_setter(
        &mut self,
        ctx: &CallContext,
        setter: Address,
    ) -> Result<(), DexError> {
        self.ensure_setter(ctx)?;
        if setter.is_zero() {
            return Err(DexError::ZeroAddress);
        }
        self.fee_to_setter = setter;
        info!("Protocol fee setter transferred to {:?}", setter);
        Ok(())
    }

    fn ensure_setter(&self, ctx: &CallContext) -> Result<(), DexError> {
        if ctx.caller != self.fee_to_setter {
            return Err(DexError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tracing_test::traced_test;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn registry() -> PoolRegistry {
        PoolRegistry::new(
            addr(0xfac),
            addr(0xad),
            PoolParams::default(),
            pool_code_hash("hashswap/reserve-pool/v1"),
        )
    }

    #[test]
    fn test_create2_matches_eip1014_vector() {
        // Example 0 of EIP-1014
        let address = create2_address(Address::zero(), H256::zero(), keccak256(&[0x00]));
        assert_eq!(
            address,
            Address::from_str("4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38").unwrap()
        );
    }

    #[test]
    fn test_keccak_of_empty_input() {
        assert_eq!(
            keccak256(&[]),
            H256::from_str("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
                .unwrap()
        );
    }

    #[test]
    fn test_sort_tokens() {
        assert_eq!(sort_tokens(addr(2), addr(1)).unwrap(), (addr(1), addr(2)));
        assert_eq!(sort_tokens(addr(1), addr(1)), Err(DexError::IdenticalTokens(addr(1))));
        assert_eq!(sort_tokens(Address::zero(), addr(1)), Err(DexError::ZeroAddress));
    }

    #[test]
    #[traced_test]
    fn test_create_pool_is_deterministic_and_predictable() {
        let mut registry = registry();
        let predicted = pool_address(addr(0xfac), addr(2), addr(1), registry.pool_code_hash())
            .unwrap();

        let created = registry.create_pool(addr(1), addr(2)).unwrap();

        assert_eq!(created, predicted);
        assert_eq!(registry.get_pool(addr(2), addr(1)), Some(created));
        assert_eq!(registry.get_or_create_pool(addr(2), addr(1)).unwrap(), created);
        assert_eq!(registry.all_pools_length(), 1);
        assert_eq!(registry.all_pools(0), Some(created));

        let pool = registry.pool(created).unwrap();
        assert_eq!((pool.token0(), pool.token1()), (addr(1), addr(2)));
        assert_eq!(pool.registry(), addr(0xfac));
        assert!(logs_contain("Pool created"));
    }

    #[test]
    fn test_duplicate_pair_is_rejected() {
        let mut registry = registry();
        let created = registry.create_pool(addr(1), addr(2)).unwrap();
        assert_eq!(
            registry.create_pool(addr(2), addr(1)),
            Err(DexError::PoolExists(created))
        );
        assert_eq!(
            registry.get_or_create_pool(addr(3), addr(3)),
            Err(DexError::IdenticalTokens(addr(3)))
        );
    }

    #[test]
    fn test_address_depends_on_registry_and_code_hash() {
        let base = pool_address(addr(0xfac), addr(1), addr(2), pool_code_hash("a")).unwrap();
        let other_registry =
            pool_address(addr(0xfad), addr(1), addr(2), pool_code_hash("a")).unwrap();
        let other_code = pool_address(addr(0xfac), addr(1), addr(2), pool_code_hash("b")).unwrap();
        assert_ne!(base, other_registry);
        assert_ne!(base, other_code);
    }

    #[test]
    fn test_views_on_empty_registry() {
        let registry = registry();
        assert_eq!(registry.get_pool(addr(1), addr(2)), None);
        assert!(registry.pool_for_pair(addr(1), addr(2)).is_none());
        assert_eq!(registry.all_pools(0), None);
        assert_eq!(registry.pools().count(), 0);
    }

    #[test]
    fn test_fee_to_is_gated_on_setter() {
        let mut registry = registry();
        let outsider = CallContext::new(addr(0xbad), 1, 1);
        let setter = CallContext::new(addr(0xad), 1, 1);

        assert_eq!(
            registry.set_fee_to(&outsider, Some(addr(0xfee))),
            Err(DexError::Unauthorized { caller: addr(0xbad) })
        );
        registry.set_fee_to(&setter, Some(addr(0xfee))).unwrap();
        assert_eq!(registry.fee_to(), Some(addr(0xfee)));

        registry.set_fee_to_setter(&setter, addr(0xbee)).unwrap();
        assert!(registry.set_fee_to(&setter, None).is_err());
        assert_eq!(registry.fee_to_setter(), addr(0xbee));
    }
}
