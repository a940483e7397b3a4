use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Token unit scaling helpers
pub struct TokenUtils;

impl TokenUtils {
    /// Convert a raw integer amount to UI units given the mint's decimals
    pub fn format_token_amount(amount: u64, decimals: u8) -> f64 {
        amount as f64 / 10_f64.powi(decimals as i32)
    }

    /// Convert lamports to SOL
    pub fn lamports_to_sol(lamports: u64) -> f64 {
        lamports as f64 / LAMPORTS_PER_SOL as f64
    }

    /// Signed lamport delta to SOL, used for transaction balance changes
    pub fn lamport_delta_to_sol(delta: i128) -> f64 {
        delta as f64 / LAMPORTS_PER_SOL as f64
    }
}
