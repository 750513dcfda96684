use crate::constants::BPS_DENOMINATOR;
use crate::error::{require, Result, VaultError};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    Ceiling,
}

/// Convert assets to shares at the current exchange rate.
///
/// Formula: shares = assets × total_shares / total_assets
///
/// An empty vault (no shares outstanding) prices the first deposit 1:1.
pub fn convert_to_shares(
    assets: u64,
    total_assets: u64,
    total_shares: u64,
    rounding: Rounding,
) -> Result<u64> {
    if total_shares == 0 {
        return Ok(assets);
    }
    mul_div(assets, total_shares, total_assets, rounding)
}

/// Convert shares to assets at the current exchange rate.
///
/// Formula: assets = shares × total_assets / total_shares
pub fn convert_to_assets(
    shares: u64,
    total_assets: u64,
    total_shares: u64,
    rounding: Rounding,
) -> Result<u64> {
    if total_shares == 0 {
        return Ok(shares);
    }
    mul_div(shares, total_assets, total_shares, rounding)
}

/// Portion of `amount` represented by `bps` basis points.
pub fn bps_of(amount: u64, bps: u16, rounding: Rounding) -> Result<u64> {
    mul_div(amount, u64::from(bps), BPS_DENOMINATOR, rounding)
}

/// Safe multiplication then division with configurable rounding.
///
/// Computes: (value × numerator) / denominator
/// Uses u128 intermediate to prevent overflow.
pub fn mul_div(value: u64, numerator: u64, denominator: u64, rounding: Rounding) -> Result<u64> {
    require!(denominator > 0, VaultError::DivisionByZero);

    let product = (value as u128)
        .checked_mul(numerator as u128)
        .ok_or(VaultError::MathOverflow)?;

    let denom = denominator as u128;
    let result = match rounding {
        Rounding::Floor => product / denom,
        Rounding::Ceiling => product.div_ceil(denom),
    };

    u64::try_from(result).map_err(|_| VaultError::MathOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floor() {
        assert_eq!(mul_div(100, 3, 2, Rounding::Floor).unwrap(), 150);
        assert_eq!(mul_div(100, 1, 3, Rounding::Floor).unwrap(), 33);
    }

    #[test]
    fn test_mul_div_ceiling() {
        assert_eq!(mul_div(100, 3, 2, Rounding::Ceiling).unwrap(), 150);
        assert_eq!(mul_div(100, 1, 3, Rounding::Ceiling).unwrap(), 34);
    }

    #[test]
    fn test_convert_to_shares_empty_vault() {
        // Bootstrap: first deposit is priced 1:1
        assert_eq!(convert_to_shares(1_000_000, 0, 0, Rounding::Floor).unwrap(), 1_000_000);
        assert_eq!(convert_to_assets(1_000_000, 0, 0, Rounding::Floor).unwrap(), 1_000_000);
    }

    #[test]
    fn test_convert_after_yield() {
        // 330 assets backing 300 shares
        assert_eq!(convert_to_assets(100, 330, 300, Rounding::Floor).unwrap(), 110);
        assert_eq!(convert_to_shares(110, 330, 300, Rounding::Floor).unwrap(), 100);
        // 100 / 1.1 = 90.9..
        assert_eq!(convert_to_shares(100, 330, 300, Rounding::Floor).unwrap(), 90);
        assert_eq!(convert_to_shares(100, 330, 300, Rounding::Ceiling).unwrap(), 91);
    }

    #[test]
    fn test_rounding_favors_vault() {
        // deposit then redeem at an uneven price never returns more than paid
        let (total_assets, total_shares) = (1_003, 997);
        for assets in 1..500u64 {
            let shares = convert_to_shares(assets, total_assets, total_shares, Rounding::Floor).unwrap();
            let back = convert_to_assets(
                shares,
                total_assets + assets,
                total_shares + shares,
                Rounding::Floor,
            )
            .unwrap();
            assert!(back <= assets, "round trip of {assets} returned {back}");
        }
    }

    #[test]
    fn test_shares_with_no_assets_left() {
        let result = convert_to_shares(100, 0, 50, Rounding::Floor);
        assert!(matches!(result, Err(VaultError::DivisionByZero)));
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(10_000, 50, Rounding::Floor).unwrap(), 50);
        assert_eq!(bps_of(999, 50, Rounding::Floor).unwrap(), 4);
        assert_eq!(bps_of(999, 50, Rounding::Ceiling).unwrap(), 5);
        assert_eq!(bps_of(999, 0, Rounding::Ceiling).unwrap(), 0);
    }

    #[test]
    fn test_max_values() {
        let large = u64::MAX / 2;
        assert!(convert_to_shares(large, large, large, Rounding::Floor).is_ok());
        assert!(matches!(
            mul_div(u64::MAX, u64::MAX, 1, Rounding::Floor),
            Err(VaultError::MathOverflow)
        ));
    }
}
