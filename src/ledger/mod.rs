//! Ledger module: chart of accounts, voucher lifecycle, posting, reconstruction and closing

pub mod account;
pub mod closing;
pub mod core;
pub mod posting;
pub mod reconstruction;
pub mod voucher;

pub use account::*;
pub use closing::*;
pub use core::*;
pub use posting::*;
pub use reconstruction::*;
pub use voucher::*;
