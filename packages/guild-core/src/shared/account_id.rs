//! Ledger account identifier syntax

/// Length of an encoded account identifier
pub const ACCOUNT_ID_LEN: usize = 56;

/// Leading character of every account identifier
pub const ACCOUNT_ID_SIGIL: char = 'G';

/// Check that `value` looks like an account identifier.
///
/// Only the shape is checked (length, sigil, ASCII). Checksums are the
/// ledger's business; a well-shaped id that does not exist simply never
/// resolves to an account.
///
/// # Examples
///
/// ```rust
/// use guild_core::is_valid_account_id;
///
/// assert!(is_valid_account_id("GCNVDZIHGX473FEI7IXCUAEXUJ4BGCKEMHF36VYP5EMS7PX2QBLAMTLA"));
/// assert!(!is_valid_account_id("GCNVDZIHGX473FEI7IXCUAEXUJ4BGCKEMHF"));
/// ```
pub fn is_valid_account_id(value: &str) -> bool {
    value.len() == ACCOUNT_ID_LEN && value.is_ascii() && value.starts_with(ACCOUNT_ID_SIGIL)
}
