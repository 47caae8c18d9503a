//! ArtVault Market - Artworks and the marketplace
//!
//! Minting charges a gas fee from the minter's balance. Admin listings go
//! straight to the marketplace. Marking an artwork sold credits the seller
//! with the listed amount and records an approved `Sale` transaction.

mod error;
mod gallery;

pub use error::{MarketError, MarketResult};
pub use gallery::{AdminListing, Gallery, MintRequest, Sale, ADMIN_OWNER};
