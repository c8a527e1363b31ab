//! Reference scenarios with exact expected amounts

use dex_config::ExchangeConfig;
use dex_e2e_tests::{check_hash_rates, check_pool_accounting, token, wad, wallet, Deployment};
use tracing_test::traced_test;
use types::{TokenBank, U256};

fn exact(raw: &str) -> U256 {
    U256::from_dec_str(raw).unwrap()
}

/// 1M/1M pool from w1, five million of each token in w1, w3 and w4
fn million_pool() -> Deployment {
    let mut dex = Deployment::with_defaults(2).unwrap();
    for n in [1, 3, 4] {
        dex.fund(wallet(n), wad(5_000_000)).unwrap();
    }
    let (_, _, shares) = dex
        .add_liquidity(wallet(1), token(0), token(1), wad(1_000_000), wad(1_000_000))
        .unwrap();
    assert_eq!(shares, exact("999999999999999999999000"));
    dex
}

#[test]
#[traced_test]
fn test_swap_mine_and_harvest_reference_amounts() {
    let mut dex = million_pool();
    let (t0, t1) = (token(0), token(1));
    let pool = dex.pool(t0, t1).unwrap();
    dex.register(&[(pool, 100)]).unwrap();

    // Block n: w3 sells 100k token0
    let amounts = dex.swap(wallet(3), &[t0, t1], wad(100_000), wallet(3)).unwrap();
    assert_eq!(amounts[1], exact("90661089388014913158134"));
    assert_eq!(dex.balance(t1, wallet(3)), wad(5_000_000) + amounts[1]);

    // Block n+1: w4 sells 100k token1, paying w3
    let amounts = dex.swap(wallet(4), &[t1, t0], wad(100_000), wallet(3)).unwrap();
    assert_eq!(amounts[1], exact("108687582655742007302566"));
    assert_eq!(dex.balance(t0, wallet(3)), exact("5008687582655742007302566"));

    // Volume belongs to the sender, not the recipient
    assert_eq!(dex.hash_rate(pool, wallet(3)), exact("90661089388014913158134"));
    assert_eq!(dex.hash_rate(pool, wallet(4)), exact("108687582655742007302566"));
    assert_eq!(
        dex.exchange.state().mining.pool_info(pool).unwrap().total_hash_rate,
        exact("199348672043756920460700")
    );

    // Blocks n+2 and n+3: w1 withdraws everything
    let shares = dex.shares(pool, wallet(1));
    dex.approve_shares(wallet(1), pool, shares).unwrap();
    dex.remove_liquidity(wallet(1), t0, t1, shares).unwrap();
    assert_eq!(dex.balance(t0, wallet(1)), exact("4991312417344257992696442"));
    assert_eq!(dex.balance(t1, wallet(1)), exact("5009338910611985086840856"));
    assert!(dex.shares(pool, wallet(1)).is_zero());

    // Block n+4: one block alone, then three blocks shared with w4
    let reward_token = dex.exchange.reward_token();
    let harvested = dex.harvest(wallet(3), pool).unwrap();
    assert_eq!(harvested, exact("59108989137219241611"));
    assert_eq!(dex.balance(reward_token, wallet(3)), harvested);
    assert_eq!(dex.exchange.total_rewards_minted(), harvested);

    check_pool_accounting(&dex.exchange).unwrap();
    check_hash_rates(&dex.exchange, &[wallet(1), wallet(3), wallet(4)]).unwrap();
    assert!(logs_contain("Harvested"));
}

#[test]
fn test_round_trip_leaks_fees_to_the_pool() {
    let mut dex = million_pool();
    let (t0, t1) = (token(0), token(1));

    let out = dex.swap(wallet(3), &[t0, t1], wad(100_000), wallet(3)).unwrap()[1];
    // Fee-free output would be 100k * 1M / 1.1M
    let fee_free = wad(100_000) * wad(1_000_000) / wad(1_100_000);
    assert!(out < fee_free);

    let back = dex.swap(wallet(3), &[t1, t0], out, wallet(3)).unwrap()[1];
    assert!(back < wad(100_000));
    assert!(dex.balance(t0, wallet(3)) < wad(5_000_000));
    assert_eq!(dex.balance(t1, wallet(3)), wad(5_000_000));

    let pool = dex.pool(t0, t1).unwrap();
    let (r0, r1, _) = dex.exchange.state().registry.pool(pool).unwrap().reserves();
    assert!(r0 * r1 > wad(1_000_000) * wad(1_000_000));
    check_pool_accounting(&dex.exchange).unwrap();
}

#[test]
fn test_weights_split_emission_between_pools() {
    let config =
        ExchangeConfig::from_toml_str("[mining]\nreward_per_block = \"7837500000000000000\"\n")
            .unwrap();
    let mut dex = Deployment::new(&config, 3).unwrap();
    let (t0, t1, t2) = (token(0), token(1), token(2));
    dex.fund(wallet(1), wad(5_000_000)).unwrap();
    dex.fund(wallet(2), wad(5_000_000)).unwrap();

    dex.add_liquidity(wallet(1), t0, t1, wad(1_000_000), wad(1_000_000)).unwrap();
    dex.add_liquidity(wallet(1), t1, t2, wad(1_000_000), wad(1_000_000)).unwrap();
    let light = dex.pool(t0, t1).unwrap();
    let heavy = dex.pool(t1, t2).unwrap();
    dex.register(&[(light, 100), (heavy, 200)]).unwrap();
    assert_eq!(dex.exchange.state().mining.total_alloc_weight(), 300);

    // Identical trades one block apart, so each pool accrues for twelve blocks
    let volume = exact("996006981039903216493");
    assert_eq!(dex.swap(wallet(2), &[t0, t1], wad(1_000), wallet(2)).unwrap()[1], volume);
    assert_eq!(dex.swap(wallet(2), &[t2, t1], wad(1_000), wallet(2)).unwrap()[1], volume);
    dex.exchange.mine_blocks(10);

    let from_light = dex.harvest(wallet(2), light).unwrap();
    let from_heavy = dex.harvest(wallet(2), heavy).unwrap();
    assert_eq!(from_light, exact("31349999999006990030"));
    assert_eq!(from_heavy, exact("62699999999009987042"));

    // Twelve blocks at 7.8375 is 94.05; only rounding dust is lost
    let emitted = exact("94050000000000000000");
    let minted = dex.exchange.total_rewards_minted();
    assert_eq!(minted, from_light + from_heavy);
    assert!(minted < emitted && emitted - minted < U256::exp10(10));
    assert_eq!(
        dex.exchange.state().tokens.balance_of(dex.exchange.reward_token(), wallet(2)),
        minted
    );
}

#[test]
fn test_harvest_before_any_volume_pays_nothing() {
    let mut dex = million_pool();
    let pool = dex.pool(token(0), token(1)).unwrap();
    dex.register(&[(pool, 100)]).unwrap();
    dex.exchange.mine_blocks(50);

    assert!(dex.harvest(wallet(3), pool).unwrap().is_zero());
    assert!(dex.exchange.total_rewards_minted().is_zero());
}
