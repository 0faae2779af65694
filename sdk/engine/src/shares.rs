//! K-of-N Shamir sharing of 32-byte keys over GF(256), byte by byte.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// A share identifier (the evaluation point, 1 to N)
pub type ShareId = u8;

/// One member's share of a key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Share {
    pub id: ShareId,
    pub value: [u8; 32],
}

impl Share {
    pub fn new(id: ShareId, value: [u8; 32]) -> Self {
        Self { id, value }
    }
}

/// GF(2^8) with the AES reduction polynomial x^8 + x^4 + x^3 + x + 1.
/// Addition and subtraction are both XOR.
mod gf256 {
    pub fn mul(mut a: u8, mut b: u8) -> u8 {
        let mut product = 0u8;
        while b != 0 {
            if b & 1 == 1 {
                product ^= a;
            }
            let carry = a & 0x80 != 0;
            a <<= 1;
            if carry {
                a ^= 0x1b;
            }
            b >>= 1;
        }
        product
    }

    fn pow(base: u8, mut exp: u8) -> u8 {
        let mut acc = 1u8;
        let mut sq = base;
        while exp != 0 {
            if exp & 1 == 1 {
                acc = mul(acc, sq);
            }
            sq = mul(sq, sq);
            exp >>= 1;
        }
        acc
    }

    /// a^-1 = a^254, since the multiplicative group has order 255
    pub fn inv(a: u8) -> u8 {
        debug_assert!(a != 0);
        pow(a, 254)
    }
}

/// Evaluates the polynomial with the given coefficients (constant term
/// first) at `x`, using Horner's rule.
fn eval_poly(coeffs: &[u8], x: u8) -> u8 {
    coeffs
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf256::mul(acc, x) ^ c)
}

/// Fresh random 32-byte key
pub fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Splits `secret` into `n` shares, any `k` of which recover it.
pub fn split_secret(secret: &[u8; 32], k: usize, n: usize) -> Result<Vec<Share>, EngineError> {
    if k == 0 || k > n || n > 255 {
        return Err(EngineError::InvalidThreshold { k, n });
    }

    let mut rng = rand::thread_rng();
    let mut shares: Vec<Share> = (1..=n as u8).map(|id| Share::new(id, [0u8; 32])).collect();
    let mut coeffs = vec![0u8; k];

    for (pos, &byte) in secret.iter().enumerate() {
        coeffs[0] = byte;
        rng.fill_bytes(&mut coeffs[1..]);
        for share in shares.iter_mut() {
            share.value[pos] = eval_poly(&coeffs, share.id);
        }
    }

    Ok(shares)
}

/// Recovers the secret from the first `k` shares by Lagrange interpolation
/// at zero.
pub fn combine_shares(shares: &[Share], k: usize) -> Result<[u8; 32], EngineError> {
    if k == 0 || shares.len() < k {
        return Err(EngineError::InsufficientShares {
            got: shares.len(),
            need: k,
        });
    }

    let picked = &shares[..k];
    for (i, share) in picked.iter().enumerate() {
        if share.id == 0 || picked[..i].iter().any(|s| s.id == share.id) {
            return Err(EngineError::InvalidShare);
        }
    }

    // basis_j(0) = prod_{m != j} x_m / (x_m - x_j)
    let basis: Vec<u8> = picked
        .iter()
        .map(|sj| {
            picked
                .iter()
                .filter(|sm| sm.id != sj.id)
                .fold(1u8, |acc, sm| {
                    gf256::mul(acc, gf256::mul(sm.id, gf256::inv(sm.id ^ sj.id)))
                })
        })
        .collect();

    let mut secret = [0u8; 32];
    for (share, &b) in picked.iter().zip(basis.iter()) {
        for (out, &v) in secret.iter_mut().zip(share.value.iter()) {
            *out ^= gf256::mul(v, b);
        }
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_is_multiplicative_identity() {
        for a in 1..=255u8 {
            assert_eq!(gf256::mul(a, gf256::inv(a)), 1, "a = {a}");
        }
    }

    #[test]
    fn any_k_subset_recovers_the_secret() {
        let secret = random_secret();
        let shares = split_secret(&secret, 3, 5).unwrap();

        for subset in [[0, 1, 2], [0, 2, 4], [4, 3, 1], [1, 2, 3]] {
            let picked: Vec<Share> = subset.iter().map(|&i| shares[i].clone()).collect();
            assert_eq!(combine_shares(&picked, 3).unwrap(), secret);
        }
    }

    #[test]
    fn one_of_one_share_is_the_secret() {
        let secret = [9u8; 32];
        let shares = split_secret(&secret, 1, 1).unwrap();
        assert_eq!(shares[0].value, secret);
    }

    #[test]
    fn below_threshold_is_rejected() {
        let shares = split_secret(&random_secret(), 3, 5).unwrap();
        let result = combine_shares(&shares[..2], 3);
        assert!(matches!(
            result,
            Err(EngineError::InsufficientShares { got: 2, need: 3 })
        ));
    }

    #[test]
    fn duplicate_share_ids_are_rejected() {
        let shares = split_secret(&random_secret(), 2, 3).unwrap();
        let dup = vec![shares[0].clone(), shares[0].clone()];
        assert!(matches!(combine_shares(&dup, 2), Err(EngineError::InvalidShare)));
    }

    #[test]
    fn invalid_threshold_parameters() {
        let secret = random_secret();
        assert!(split_secret(&secret, 0, 3).is_err());
        assert!(split_secret(&secret, 4, 3).is_err());
        assert!(split_secret(&secret, 2, 256).is_err());
    }
}
