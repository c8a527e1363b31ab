//! Hash-rate mining properties over random trading sequences

use dex_e2e_tests::{check_hash_rates, check_pool_accounting, token, wad, wallet, Deployment};
use proptest::prelude::*;
use types::{Address, U256};

const TRADERS: u64 = 3;

/// `(trader, sells token0, whole tokens in, empty blocks before)`
type Trade = (u64, bool, u64, u64);

fn trade_strategy() -> impl Strategy<Value = Vec<Trade>> {
    prop::collection::vec((0..TRADERS, any::<bool>(), 1u64..20_000, 0u64..4), 1..12)
}

fn deployment() -> (Deployment, Address) {
    let mut dex = Deployment::with_defaults(2).unwrap();
    dex.fund(wallet(0), wad(1_000_000)).unwrap();
    for n in 1..=TRADERS {
        dex.fund(wallet(n), wad(1_000_000)).unwrap();
    }
    dex.add_liquidity(wallet(0), token(0), token(1), wad(1_000_000), wad(1_000_000))
        .unwrap();
    let pool = dex.pool(token(0), token(1)).unwrap();
    dex.register(&[(pool, 100)]).unwrap();
    (dex, pool)
}

/// Play `trades`; returns the block of the first credited volume
fn play(dex: &mut Deployment, trades: &[Trade]) -> u64 {
    let mut first = None;
    for &(trader, sells_token0, size, gap) in trades {
        dex.exchange.mine_blocks(gap);
        let path = if sells_token0 {
            [token(0), token(1)]
        } else {
            [token(1), token(0)]
        };
        let who = wallet(trader + 1);
        dex.swap(who, &path, wad(size), who).unwrap();
        if first.is_none() {
            first = Some(dex.exchange.block_number());
        }
    }
    first.unwrap_or_default()
}

fn miners() -> Vec<Address> {
    (1..=TRADERS).map(wallet).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_pending_rewards_account_for_the_emission(
        trades in trade_strategy(),
        idle in 0u64..20,
    ) {
        let (mut dex, pool) = deployment();
        let first = play(&mut dex, &trades);
        dex.exchange.mine_blocks(idle);

        let now = dex.exchange.block_number();
        let reward_per_block = dex.exchange.state().mining.reward_per_block();
        let emitted = reward_per_block * U256::from(now - first);
        let pending = miners().iter().fold(U256::zero(), |acc, m| {
            acc + dex.exchange.state().mining.pending_reward(pool, *m, now)
        });

        prop_assert!(pending <= emitted);
        prop_assert!(emitted <= pending + U256::exp10(13));
        prop_assert!(check_hash_rates(&dex.exchange, &miners()).is_ok());
        prop_assert!(check_pool_accounting(&dex.exchange).is_ok());
    }

    #[test]
    fn test_harvest_pays_the_pending_view(trades in trade_strategy()) {
        let (mut dex, pool) = deployment();
        play(&mut dex, &trades);

        let mut paid = U256::zero();
        for miner in miners() {
            let expected = dex.pending_next_block(pool, miner);
            let harvested = dex.harvest(miner, pool).unwrap();
            prop_assert_eq!(harvested, expected);
            paid = paid + harvested;
        }
        prop_assert_eq!(dex.exchange.total_rewards_minted(), paid);
    }

    #[test]
    fn test_replay_is_deterministic(trades in trade_strategy()) {
        let (mut first, pool) = deployment();
        let (mut second, same_pool) = deployment();
        play(&mut first, &trades);
        play(&mut second, &trades);

        prop_assert_eq!(pool, same_pool);
        let a = first.exchange.state().registry.pool(pool).unwrap().reserves();
        let b = second.exchange.state().registry.pool(pool).unwrap().reserves();
        prop_assert_eq!(a, b);
        for miner in miners() {
            prop_assert_eq!(first.hash_rate(pool, miner), second.hash_rate(pool, miner));
        }
    }
}
