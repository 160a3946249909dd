//! Exact-payout scenarios for each emission schedule.
//!
//! Numbers are hand-computed with a 1e12 accumulator scale and floor
//! division at every step.

use furrow_core::error::FarmError;
use furrow_core::traits::TokenService;
use furrow_tests::helpers::*;

// ---------------------------------------------------------------------------
// Fixed window
// ---------------------------------------------------------------------------

#[test]
fn single_participant_earns_whole_window() {
    let mut farm = farm(fixed_window(10, 100, 200));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let alice = id("alice");
    fund(&mut farm, "lp", &alice, 100);

    farm.deposit(&alice, 0, 100, None, 100).unwrap();
    farm.withdraw(&alice, 0, 100, 200).unwrap();

    assert_eq!(reward_balance(&farm, &alice), 1000);
    assert_eq!(balance(&farm, "lp", &alice), 100);
}

#[test]
fn midpoint_joiner_gets_third_of_second_half() {
    let mut farm = farm(fixed_window(10, 100, 200));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let (a, b, c) = (id("a"), id("b"), id("c"));
    for who in [&a, &b, &c] {
        fund(&mut farm, "lp", who, 100);
    }

    farm.deposit(&a, 0, 100, None, 100).unwrap();
    farm.deposit(&b, 0, 100, None, 100).unwrap();
    farm.deposit(&c, 0, 100, None, 150).unwrap();
    assert_eq!(farm.user_info(0, &c).reward_debt, 250);

    farm.update_pool(0, 200).unwrap();
    assert_eq!(farm.pool_info(0).unwrap().acc_reward_per_share, 4_166_666_666_666);

    for who in [&a, &b, &c] {
        farm.harvest(who, 0, 200).unwrap();
    }
    assert_eq!(reward_balance(&farm, &a), 416);
    assert_eq!(reward_balance(&farm, &b), 416);
    assert_eq!(reward_balance(&farm, &c), 166);
    // a and b each earned 250 before c joined
    let after_midpoint = (416 - 250) + (416 - 250);
    assert_eq!(reward_balance(&farm, &c), after_midpoint / 2);
}

#[test]
fn staggered_equal_deposits() {
    let mut farm = farm(fixed_window(10, 600, 700));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let users = [id("u0"), id("u1"), id("u2"), id("u3")];
    for (i, who) in users.iter().enumerate() {
        fund(&mut farm, "lp", who, 100);
        farm.deposit(who, 0, 100, None, 600 + i as u64).unwrap();
    }
    for who in &users {
        farm.harvest(who, 0, 710).unwrap();
    }
    let paid: Vec<_> = users.iter().map(|u| reward_balance(&farm, u)).collect();
    assert_eq!(paid, vec![260, 250, 245, 242]);
}

#[test]
fn staggered_unequal_deposits() {
    let mut farm = farm(fixed_window(10, 800, 900));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let users = [id("u0"), id("u1"), id("u2"), id("u3")];
    for (i, who) in users.iter().enumerate() {
        let amount = 100 * (i as u128 + 1);
        fund(&mut farm, "lp", who, amount);
        farm.deposit(who, 0, amount, None, 800 + i as u64).unwrap();
    }
    for who in &users {
        farm.withdraw(who, 0, farm.user_info(0, who).amount, 900).unwrap();
    }
    let paid: Vec<_> = users.iter().map(|u| reward_balance(&farm, u)).collect();
    assert_eq!(paid, vec![111, 203, 296, 388]);
    assert_eq!(farm.pool_info(0).unwrap().total_staked, 0);
}

#[test]
fn late_staker_collects_only_from_deposit() {
    let mut farm = farm(fixed_window(10, 400, 500));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 10);
    farm.deposit(&bob, 0, 10, None, 460).unwrap();
    farm.withdraw(&bob, 0, 10, 500).unwrap();
    assert_eq!(reward_balance(&farm, &bob), 400);
}

#[test]
fn claims_locked_until_window_ends() {
    let mut farm = farm(fixed_window(10, 200, 300));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let (bob, carol) = (id("bob"), id("carol"));
    fund(&mut farm, "lp", &bob, 100);
    fund(&mut farm, "lp", &carol, 10);

    farm.deposit(&bob, 0, 100, None, 200).unwrap();
    farm.deposit(&carol, 0, 10, None, 201).unwrap();
    assert_eq!(farm.harvest(&bob, 0, 250), Err(FarmError::StakingInProgress));
    assert_eq!(farm.harvest(&carol, 0, 299), Err(FarmError::StakingInProgress));

    farm.harvest(&bob, 0, 300).unwrap();
    farm.withdraw(&carol, 0, 10, 300).unwrap();
    assert_eq!(reward_balance(&farm, &bob), 910);
    assert_eq!(reward_balance(&farm, &carol), 90);

    assert_eq!(farm.deposit(&carol, 0, 10, None, 300), Err(FarmError::StakingEnded));
}

#[test]
fn partial_withdraw_during_window_defers_reward() {
    let mut farm = farm(fixed_window(10, 1200, 1300));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let (alice, bob) = (id("alice"), id("bob"));
    fund(&mut farm, "lp", &alice, 1_000);
    fund(&mut farm, "lp", &bob, 1_000);

    farm.deposit(&alice, 0, 100, None, 1200).unwrap();
    farm.deposit(&bob, 0, 100, None, 1201).unwrap();
    farm.deposit(&alice, 0, 100, None, 1250).unwrap();
    farm.withdraw(&bob, 0, 50, 1251).unwrap();
    assert_eq!(reward_balance(&farm, &bob), 0);
    assert_eq!(balance(&farm, "lp", &bob), 950);
    assert_eq!(farm.user_info(0, &bob).unpaid, 248);

    farm.deposit(&bob, 0, 50, None, 1275).unwrap();
    farm.withdraw(&alice, 0, 200, 1276).unwrap();
    assert_eq!(balance(&farm, "lp", &alice), 1_000);
    assert_eq!(farm.user_info(0, &alice).unpaid, 460);
    assert_eq!(farm.harvest(&alice, 0, 1290), Err(FarmError::StakingInProgress));

    assert_eq!(farm.harvest(&alice, 0, 1310).unwrap(), 460);
    assert_eq!(farm.harvest(&bob, 0, 1310).unwrap(), 539);
    assert_eq!(reward_balance(&farm, &alice), 460);
    assert_eq!(reward_balance(&farm, &bob), 539);
}

#[test]
fn nothing_accrues_before_start() {
    let mut farm = farm(fixed_window(10, 100, 200));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    assert_eq!(
        farm.deposit(&bob, 0, 100, None, 50),
        Err(FarmError::StakingNotStarted)
    );
    assert_eq!(balance(&farm, "lp", &bob), 100);
}

// ---------------------------------------------------------------------------
// Staged halving
// ---------------------------------------------------------------------------

#[test]
fn halving_two_pools_with_fee() {
    let mut farm = farm(staged_halving(100, 200, 100));
    add_pool(&mut farm, "lp", 200, 1_000, 0);
    add_pool(&mut farm, "other", 200, 0, 0);
    let (bob, carol) = (id("bob"), id("carol"));
    fund(&mut farm, "lp", &bob, 1_000);
    fund(&mut farm, "lp", &carol, 1_000);

    farm.deposit(&bob, 0, 100, None, 200).unwrap();
    assert_eq!(farm.user_info(0, &bob).amount, 90);
    assert_eq!(balance(&farm, "lp", &custody()), 90);
    assert_eq!(balance(&farm, "lp", &dev()), 10);

    assert_eq!(farm.pending_reward(0, &bob, 210).unwrap(), 499);
    assert_eq!(farm.pending_reward(0, &bob, 220).unwrap(), 999);

    farm.update_pool(0, 250).unwrap();
    assert_eq!(farm.pool_info(0).unwrap().acc_reward_per_share, 27_777_777_777_777);

    farm.deposit(&bob, 0, 100, None, 260).unwrap();
    assert_eq!(reward_balance(&farm, &bob), 2999);
    assert_eq!(farm.pool_info(0).unwrap().acc_reward_per_share, 33_333_333_333_332);
    assert_eq!(farm.user_info(0, &bob).reward_debt, 5999);
    assert_eq!(farm.user_info(0, &bob).amount, 180);
    assert_eq!(balance(&farm, "lp", &dev()), 20);

    assert_eq!(farm.pending_reward(0, &bob, 270).unwrap(), 500);

    farm.deposit(&carol, 0, 100, None, 300).unwrap();
    assert_eq!(farm.pool_info(0).unwrap().acc_reward_per_share, 44_444_444_444_443);
    assert_eq!(farm.pending_reward(0, &bob, 300).unwrap(), 2000);
    assert_eq!(farm.user_info(0, &carol).reward_debt, 3999);

    farm.update_pool(0, 310).unwrap();
    assert_eq!(farm.pool_info(0).unwrap().acc_reward_per_share, 45_925_925_925_924);
    assert_eq!(farm.pending_reward(0, &bob, 310).unwrap(), 2267);
    assert_eq!(farm.pending_reward(0, &carol, 310).unwrap(), 134);
}

#[test]
fn halving_rate_queries() {
    let mut farm = farm(staged_halving(100, 200, 100));
    add_pool(&mut farm, "lp", 200, 0, 0);
    let expected = [(199, 0), (200, 100), (299, 100), (300, 80), (400, 64), (500, 51), (600, 40)];
    for (block, rate) in expected {
        assert_eq!(farm.reward_per_block(block), rate, "block {block}");
    }
}

#[test]
fn halving_withdraw_defers_payout_to_harvest() {
    let mut farm = farm(staged_halving(100, 200, 100));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 200).unwrap();

    farm.withdraw(&bob, 0, 100, 210).unwrap();
    assert_eq!(reward_balance(&farm, &bob), 0);
    assert_eq!(farm.user_info(0, &bob).unpaid, 1000);
    assert_eq!(balance(&farm, "lp", &bob), 100);
    // nothing more accrues on an empty stake
    assert_eq!(farm.pending_reward(0, &bob, 290).unwrap(), 1000);

    assert_eq!(farm.harvest(&bob, 0, 290).unwrap(), 1000);
    assert_eq!(reward_balance(&farm, &bob), 1000);
    assert_eq!(farm.harvest(&bob, 0, 300), Err(FarmError::NoTokensStaked));
}

#[test]
fn adding_pool_settles_existing_pools_first() {
    let mut farm = farm(staged_halving(100, 200, 1_000));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 200).unwrap();

    add_pool(&mut farm, "other", 100, 0, 250);
    assert_eq!(farm.pool_info(1).unwrap().last_reward_block, 250);
    // 50 blocks at the full rate, then 10 at half
    assert_eq!(farm.pending_reward(0, &bob, 260).unwrap(), 5_000 + 500);
}

#[test]
fn pool_weights_and_per_pool_rate() {
    let mut farm = farm(staged_halving(100, 200, 100));
    add_pool(&mut farm, "a", 100, 0, 0);
    add_pool(&mut farm, "b", 300, 0, 0);
    assert_eq!(farm.total_weight(), 400);
    farm.set_pool(&owner(), 1, 400, 0, 210).unwrap();
    assert_eq!(farm.total_weight(), 500);
    assert_eq!(farm.pool_reward_per_block(0, 250).unwrap(), 20);
    assert_eq!(farm.pool_reward_per_block(1, 250).unwrap(), 80);
    assert!(matches!(
        farm.add_pool(&owner(), 1, asset("a"), 0, 220),
        Err(FarmError::PoolAlreadyExists(_))
    ));
}

#[test]
fn reweighting_keeps_accrued_share() {
    let mut farm = farm(staged_halving(100, 200, 1_000));
    add_pool(&mut farm, "a", 100, 0, 0);
    add_pool(&mut farm, "b", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "a", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 200).unwrap();

    // 100 blocks at half of 100 per block
    assert_eq!(farm.pending_reward(0, &bob, 300).unwrap(), 5_000);
    farm.set_pool(&owner(), 0, 300, 0, 300).unwrap();
    assert_eq!(farm.pool_info(0).unwrap().last_reward_block, 300);
    assert_eq!(farm.pending_reward(0, &bob, 300).unwrap(), 5_000);

    // only blocks after the change use the 3/4 share
    assert_eq!(farm.pool_reward_per_block(0, 310).unwrap(), 75);
    assert_eq!(farm.pending_reward(0, &bob, 310).unwrap(), 5_000 + 750);
    assert_eq!(farm.harvest(&bob, 0, 310).unwrap(), 5_750);
}

#[test]
fn zero_total_weight_accrues_nothing() {
    let mut farm = farm(staged_halving(100, 200, 100));
    add_pool(&mut farm, "lp", 0, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 200).unwrap();
    assert_eq!(farm.pending_reward(0, &bob, 300).unwrap(), 0);
    assert_eq!(farm.pool_reward_per_block(0, 250).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Budget depletion
// ---------------------------------------------------------------------------

#[test]
fn budget_with_referral_bonus() {
    let mut farm = farm(budget_depletion(10, 1200, 1300, 1000));
    add_pool(&mut farm, "lp", 100, 0, 0);
    add_pool(&mut farm, "other", 100, 0, 0);
    fund_reserve(&mut farm, 1000);
    let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));
    fund(&mut farm, "lp", &alice, 10);
    fund(&mut farm, "lp", &bob, 10);

    farm.deposit(&alice, 0, 10, Some(&carol), 1200).unwrap();
    farm.deposit(&bob, 0, 10, None, 1201).unwrap();
    assert_eq!(farm.referrer_of(&alice), Some(carol));

    farm.withdraw(&alice, 0, 10, 1300).unwrap();
    farm.withdraw(&bob, 0, 10, 1300).unwrap();
    assert_eq!(reward_balance(&farm, &alice), 0);

    farm.harvest(&alice, 0, 1300).unwrap();
    farm.harvest(&bob, 0, 1300).unwrap();
    assert_eq!(reward_balance(&farm, &alice), 252);
    assert_eq!(reward_balance(&farm, &bob), 247);
    assert_eq!(reward_balance(&farm, &carol), 5);
    assert_eq!(farm.referral_earnings(&carol), 5);

    assert_eq!(farm.remaining_budget(), Some(1000 - 500 - 5));
    assert_eq!(farm.reward_reserve(), 1000 - 252 - 247 - 5);
    let stats = farm.stats();
    assert_eq!(stats.total_emitted, 500);
    assert_eq!(stats.total_paid, 499);
    assert_eq!(stats.total_bonus_paid, 5);
}

#[test]
fn exhausted_budget_favours_first_settled_pool() {
    let mut farm = farm(budget_depletion(10, 100, 200, 100));
    add_pool(&mut farm, "a", 100, 0, 0);
    add_pool(&mut farm, "b", 100, 0, 0);
    fund_reserve(&mut farm, 100);
    let (x, y) = (id("x"), id("y"));
    fund(&mut farm, "a", &x, 100);
    fund(&mut farm, "b", &y, 100);
    farm.deposit(&x, 0, 100, None, 100).unwrap();
    farm.deposit(&y, 1, 100, None, 100).unwrap();

    assert_eq!(farm.harvest(&x, 0, 200).unwrap(), 100);
    assert_eq!(farm.remaining_budget(), Some(0));
    assert_eq!(farm.harvest(&y, 1, 200), Err(FarmError::NoRewardsToClaim));
    assert_eq!(reward_balance(&farm, &y), 0);
}

#[test]
fn short_reserve_pays_what_is_left() {
    let mut farm = farm(budget_depletion(10, 100, 200, 1_000));
    add_pool(&mut farm, "lp", 100, 0, 0);
    fund_reserve(&mut farm, 300);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 100).unwrap();

    assert_eq!(farm.harvest(&bob, 0, 200).unwrap(), 300);
    assert_eq!(reward_balance(&farm, &bob), 300);
    assert_eq!(farm.reward_reserve(), 0);
}

#[test]
fn referral_binding_rules() {
    let mut farm = farm(staged_halving(100, 0, 1_000));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let (alice, carol, dave) = (id("alice"), id("carol"), id("dave"));
    fund(&mut farm, "lp", &alice, 100);

    // zero deposits never bind
    farm.deposit(&alice, 0, 0, Some(&carol), 1).unwrap();
    assert_eq!(farm.referrer_of(&alice), None);
    // self-referral ignored
    farm.deposit(&alice, 0, 10, Some(&alice), 2).unwrap();
    assert_eq!(farm.referrer_of(&alice), None);
    farm.deposit(&alice, 0, 10, Some(&carol), 3).unwrap();
    farm.deposit(&alice, 0, 10, Some(&dave), 4).unwrap();
    assert_eq!(farm.referrer_of(&alice), Some(carol));
    // the binding precedes the payout, so the deposits at 3 and 4 each
    // harvested 100 for alice and 2 for carol
    assert_eq!(reward_balance(&farm, &alice), 200);
    assert_eq!(reward_balance(&farm, &carol), 4);
    assert_eq!(reward_balance(&farm, &dave), 0);
}

#[test]
fn referral_bonus_rate_updates() {
    let mut farm = farm(staged_halving(100, 0, 1_000));
    assert_eq!(farm.update_referral_bonus(&owner(), 200), Err(FarmError::NoOpUpdate));
    assert_eq!(
        farm.update_referral_bonus(&owner(), 3_000),
        Err(FarmError::InvalidBasisPoints { bps: 3_000, max: 1_000 })
    );
    farm.update_referral_bonus(&owner(), 1_000).unwrap();
    assert_eq!(farm.referral_bonus_bps(), 1_000);
}

#[test]
fn deposit_fee_goes_to_fee_address() {
    let mut farm = farm(staged_halving(100, 0, 1_000));
    add_pool(&mut farm, "lp", 100, 400, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 1_000);
    farm.deposit(&bob, 0, 1_000, None, 1).unwrap();
    assert_eq!(farm.user_info(0, &bob).amount, 960);
    assert_eq!(balance(&farm, "lp", &dev()), 40);

    farm.set_fee_address(&dev(), &id("treasury")).unwrap();
    fund(&mut farm, "lp", &bob, 1_000);
    farm.deposit(&bob, 0, 1_000, None, 2).unwrap();
    assert_eq!(balance(&farm, "lp", &id("treasury")), 40);
    assert_eq!(balance(&farm, "lp", &dev()), 40);
}

#[test]
fn emergency_withdraw_ignores_window_and_forfeits() {
    let mut farm = farm(fixed_window(10, 100, 200));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 100).unwrap();
    assert_eq!(farm.emergency_withdraw(&bob, 0).unwrap(), 100);
    assert_eq!(balance(&farm, "lp", &bob), 100);
    assert_eq!(farm.pending_reward(0, &bob, 200).unwrap(), 0);
    assert_eq!(reward_balance(&farm, &bob), 0);
}

#[test]
fn minting_handover_after_seed_phase() {
    let mut farm = farm(staged_halving(100, 0, 1_000));
    add_pool(&mut farm, "lp", 100, 0, 0);
    let bob = id("bob");
    fund(&mut farm, "lp", &bob, 100);
    farm.deposit(&bob, 0, 100, None, 0).unwrap();

    farm.hand_over_minting(&owner(), &id("next-farm"), 50).unwrap();
    assert_eq!(farm.pool_info(0).unwrap().last_reward_block, 50);
    assert_eq!(farm.tokens().master(&reward()), Some(id("next-farm")));
    // stake is still withdrawable without a payout
    farm.emergency_withdraw(&bob, 0).unwrap();
    assert_eq!(balance(&farm, "lp", &bob), 100);
}
