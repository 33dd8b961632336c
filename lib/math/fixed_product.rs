//! Implied prices of a constant-product pool
use num::{BigInt, BigRational, One, ToPrimitive, Zero};

/// Marginal price of each outcome given the pool's own balances.
///
/// Outcome `i` is weighted by the product of every other balance, and the
/// weights are normalized to sum to one. A pool whose weights sum to zero
/// (empty, or with two or more drained outcomes) has no defined price and
/// yields an empty vector.
pub fn marginal_prices(balances: &[BigInt]) -> Vec<f64> {
    let n = balances.len();
    // weights[i] = prefix[i] * suffix[i + 1] avoids an O(n^2) product
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(BigInt::one());
    for balance in balances {
        let next = prefix[prefix.len() - 1].clone() * balance;
        prefix.push(next);
    }
    let mut suffix = vec![BigInt::one(); n + 1];
    for i in (0..n).rev() {
        suffix[i] = &suffix[i + 1] * &balances[i];
    }
    let weights: Vec<BigInt> =
        (0..n).map(|i| &prefix[i] * &suffix[i + 1]).collect();
    let sum: BigInt = weights.iter().sum();
    if sum.is_zero() {
        return Vec::new();
    }
    weights
        .into_iter()
        .map(|weight| {
            BigRational::new(weight, sum.clone())
                .to_f64()
                .unwrap_or(f64::NAN)
        })
        .collect()
}
