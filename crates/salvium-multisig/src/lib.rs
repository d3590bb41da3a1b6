pub mod account;
pub mod carrot;
pub mod constants;
pub mod kex;
pub mod partial_sig;
pub mod signer;
pub mod tx_set;
pub mod wallet;
