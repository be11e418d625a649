//! UTXO Module
//! Commitments and their public/private views

pub mod commitment;

// Re-export main types
pub use commitment::{random_salt, Commitment, Note, PrivateView, PublicView, SECRET_LEN};
