//! Minting, listing and selling artworks

use artvault_bus::{BalanceEvent, BalanceEventKind, EventBus, Outbox};
use artvault_config::FeesConfig;
use artvault_core::{Amount, Currency, ListedPrice, Role, TransactionStatus, TransactionType};
use artvault_ledger::Ledger;
use artvault_oracle::RateService;
use artvault_store::{
    ArtworkRecord, ArtworkRepo, Connection, CredentialRepo, GasFee, ListingRecord, ListingRepo,
    Store, StoreError, TransactionRecord, TransactionRepo,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::error::{MarketError, MarketResult};

/// Owner name of admin-created artworks; also the admin's ledger key
pub const ADMIN_OWNER: &str = "admin";

/// A user's minting form
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Option<String>,
    pub price_usd: Amount,
    pub currency: Currency,
}

/// An admin's marketplace form
#[derive(Debug, Clone)]
pub struct AdminListing {
    pub title: String,
    pub artist: String,
    pub image: Option<String>,
    /// `"<amount> <SYMBOL>"`
    pub reserve: String,
    pub category: String,
    pub description: String,
}

/// Outcome of marking an artwork sold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    pub artwork: ArtworkRecord,
    /// The approved `Sale` transaction
    pub record: TransactionRecord,
    /// Ledger key credited
    pub seller: String,
    pub price: ListedPrice,
    pub event: BalanceEvent,
}

/// Artwork and marketplace service
pub struct Gallery {
    store: Arc<Store>,
    rates: Arc<RateService>,
    bus: Arc<EventBus>,
    gas_fee_rate: Decimal,
}

fn new_artwork_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("ART-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

fn required(field: &str, value: &str) -> MarketResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MarketError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn load(conn: &Connection, id: &str) -> MarketResult<ArtworkRecord> {
    ArtworkRepo::get(conn, id)?.ok_or_else(|| MarketError::NotFound(id.to_string()))
}

/// Ledger key of an artwork owner: `admin` stays `admin`, a username or
/// email resolves to the user's email
fn resolve_seller(conn: &Connection, owner: &str) -> MarketResult<String> {
    if owner == ADMIN_OWNER {
        return Ok(ADMIN_OWNER.to_string());
    }
    Ok(CredentialRepo::find_by_login(conn, Role::User, owner)?
        .map(|c| c.email)
        .unwrap_or_else(|| owner.to_string()))
}

impl Gallery {
    pub fn new(
        store: Arc<Store>,
        rates: Arc<RateService>,
        bus: Arc<EventBus>,
        fees: &FeesConfig,
    ) -> Self {
        Self {
            store,
            rates,
            bus,
            gas_fee_rate: fees.gas_fee_rate,
        }
    }

    /// Mint an artwork for the user whose ledger key is `owner`
    ///
    /// The gas fee is `price_usd × gas_fee_rate`, charged in the listing
    /// currency at the current rate. The artwork carries the fee and is
    /// owned by the user's username when they have one.
    pub async fn mint(&self, owner: &str, request: MintRequest) -> MarketResult<ArtworkRecord> {
        let owner = required("Owner", owner)?;
        let title = required("Title", &request.title)?;
        if !request.price_usd.is_positive() {
            return Err(MarketError::Validation("Price must be positive".to_string()));
        }
        let currency = request.currency;
        let fee_usd = Amount::clamped(request.price_usd.value() * self.gas_fee_rate);

        let rates = self.rates.rates().await;

        let (artwork, event) = self.store.transaction(|tx| {
            let fee = rates.usd_to_crypto(fee_usd, currency)?;
            let available = Ledger::available(tx, &owner, currency)?;
            if available < fee.quantity {
                return Err(MarketError::InsufficientBalance {
                    currency,
                    required: fee.quantity.value(),
                    available: available.value(),
                });
            }

            let listed = rates.usd_to_crypto(request.price_usd, currency)?;
            let display_owner = CredentialRepo::get(tx, Role::User, &owner)?
                .and_then(|c| c.username)
                .unwrap_or_else(|| owner.clone());

            let artwork = ArtworkRecord {
                id: new_artwork_id(),
                title,
                description: request.description.trim().to_string(),
                category: request.category.trim().to_string(),
                image: request.image,
                price: ListedPrice::from_quantity(listed.quantity, currency).to_string(),
                original_price: Some(request.price_usd.value()),
                owner: display_owner,
                sold: false,
                uploaded_to_marketplace: false,
                gas_fee: Some(GasFee {
                    amount: fee.quantity,
                    currency,
                    usd: fee_usd.value(),
                    conversion_rate: fee.rate,
                }),
                created_at: Utc::now(),
            };
            ArtworkRepo::insert(tx, &artwork)?;

            let debit = Ledger::debit(tx, &owner, currency, fee.quantity)?;
            let event = if debit.debited.is_positive() {
                let event = BalanceEvent::debit(&owner, currency, debit.debited, BalanceEventKind::GasFee)
                    .with_usd(fee_usd.value());
                Some(Outbox::append(tx, event)?)
            } else {
                None
            };

            Ok::<_, MarketError>((artwork, event))
        })?;

        if let Some(event) = &event {
            self.bus.publish(std::slice::from_ref(event));
        }
        info!(
            id = %artwork.id,
            owner = %artwork.owner,
            price = %artwork.price,
            "Artwork minted"
        );
        Ok(artwork)
    }

    /// Admin-owned artwork placed directly on the marketplace, without fee
    pub fn create_admin_listing(&self, listing: AdminListing) -> MarketResult<ArtworkRecord> {
        let title = required("Title", &listing.title)?;
        let artist = required("Artist", &listing.artist)?;
        let description = required("Description", &listing.description)?;
        let reserve = required("Reserve price", &listing.reserve)?;
        reserve
            .parse::<ListedPrice>()
            .map_err(|e| MarketError::Validation(e.to_string()))?;

        let artwork = ArtworkRecord {
            id: new_artwork_id(),
            title,
            description,
            category: listing.category.trim().to_string(),
            image: listing.image,
            price: reserve,
            original_price: None,
            owner: ADMIN_OWNER.to_string(),
            sold: false,
            uploaded_to_marketplace: true,
            gas_fee: None,
            created_at: Utc::now(),
        };

        self.store.transaction(|tx| {
            ArtworkRepo::insert(tx, &artwork)?;
            ListingRepo::insert_if_absent(
                tx,
                &ListingRecord {
                    id: artwork.id.clone(),
                    title: artwork.title.clone(),
                    artist,
                    image: artwork.image.clone(),
                    reserve: artwork.price.clone(),
                    category: artwork.category.clone(),
                    description: artwork.description.clone(),
                    sold: false,
                },
            )?;
            Ok::<_, MarketError>(())
        })?;

        info!(id = %artwork.id, price = %artwork.price, "Admin listing created");
        Ok(artwork)
    }

    /// Put an artwork on the marketplace; returns false when it already was
    pub fn upload_to_marketplace(&self, id: &str) -> MarketResult<bool> {
        let inserted = self.store.transaction(|tx| {
            let artwork = load(tx, id)?;
            let inserted = ListingRepo::insert_if_absent(
                tx,
                &ListingRecord {
                    id: artwork.id.clone(),
                    title: artwork.title.clone(),
                    artist: artwork.owner.clone(),
                    image: artwork.image.clone(),
                    reserve: artwork.price.clone(),
                    category: artwork.category.clone(),
                    description: artwork.description.clone(),
                    sold: artwork.sold,
                },
            )?;
            ArtworkRepo::set_uploaded(tx, id)?;
            Ok::<_, MarketError>(inserted)
        })?;

        if inserted {
            info!(id, "Artwork uploaded to marketplace");
        }
        Ok(inserted)
    }

    /// Sell an artwork at its listed price
    ///
    /// Credits the seller with the listed quantity, records an approved
    /// `Sale` transaction and flags the artwork and its listing sold.
    pub fn mark_sold(&self, id: &str) -> MarketResult<Sale> {
        let sale = self.store.transaction(|tx| {
            let mut artwork = load(tx, id)?;
            if artwork.sold {
                return Err(MarketError::InvalidTransaction {
                    id: id.to_string(),
                    reason: "artwork is already sold".to_string(),
                });
            }

            let price: ListedPrice = artwork
                .price
                .parse()
                .map_err(|e: artvault_core::PriceError| MarketError::Validation(e.to_string()))?;
            let seller = resolve_seller(tx, &artwork.owner)?;

            let mut record =
                TransactionRecord::new(TransactionType::Sale, &seller, price.amount, price.currency);
            record.status = TransactionStatus::Approved;
            record.username = Some(artwork.owner.clone());
            record.settled_amount = Some(price.amount);
            record.artwork_id = Some(artwork.id.clone());
            TransactionRepo::insert(tx, &record)?;

            Ledger::credit(tx, &seller, price.currency, price.amount)?;
            ArtworkRepo::set_sold(tx, id)?;
            ListingRepo::set_sold(tx, id)?;
            artwork.sold = true;

            let event = Outbox::append(
                tx,
                BalanceEvent::credit(&seller, price.currency, price.amount, BalanceEventKind::Sale)
                    .with_transaction(&record.id),
            )?;

            Ok::<_, MarketError>(Sale {
                artwork,
                record,
                seller,
                price,
                event,
            })
        })?;

        self.bus.publish(std::slice::from_ref(&sale.event));
        info!(
            id,
            seller = %sale.seller,
            price = %sale.price,
            transaction = %sale.record.id,
            "Artwork sold"
        );
        Ok(sale)
    }

    /// Remove an artwork and its listing
    pub fn delete(&self, id: &str) -> MarketResult<()> {
        self.store
            .with_conn(|conn| ArtworkRepo::delete(conn, id))
            .map_err(|e| match e {
                StoreError::NotFound { .. } => MarketError::NotFound(id.to_string()),
                other => MarketError::Store(other),
            })?;
        info!(id, "Artwork deleted");
        Ok(())
    }

    pub fn artwork(&self, id: &str) -> MarketResult<Option<ArtworkRecord>> {
        Ok(self.store.with_conn(|conn| ArtworkRepo::get(conn, id))?)
    }

    pub fn artworks(&self) -> MarketResult<Vec<ArtworkRecord>> {
        Ok(self.store.with_conn(|conn| ArtworkRepo::list(conn))?)
    }

    /// Artworks of the user whose ledger key is `owner`, matched by email
    /// or username
    pub fn artworks_of(&self, owner: &str) -> MarketResult<Vec<ArtworkRecord>> {
        let owner = owner.trim();
        Ok(self.store.with_conn(|conn| {
            let username = CredentialRepo::get(conn, Role::User, owner)?.and_then(|c| c.username);
            let mut names = vec![owner];
            if let Some(username) = username.as_deref() {
                names.push(username);
            }
            ArtworkRepo::list_by_owner(conn, &names)
        })?)
    }

    pub fn listings(&self) -> MarketResult<Vec<ListingRecord>> {
        Ok(self.store.with_conn(|conn| ListingRepo::list(conn))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artvault_config::default_fallback;
    use rust_decimal_macros::dec;

    fn gallery() -> (Gallery, Arc<Store>) {
        let store = Arc::new(Store::in_memory().unwrap());
        let rates = Arc::new(RateService::offline(default_fallback()));
        let bus = Arc::new(EventBus::new(store.clone()));
        let fees = FeesConfig {
            gas_fee_rate: dec!(0.1),
        };
        (Gallery::new(store.clone(), rates, bus, &fees), store)
    }

    fn fund(store: &Store, owner: &str, currency: Currency, quantity: Decimal) {
        store
            .with_conn(|conn| Ledger::credit(conn, owner, currency, Amount::new(quantity).unwrap()))
            .unwrap();
    }

    fn balance(store: &Store, owner: &str, currency: Currency) -> Decimal {
        store
            .with_conn(|conn| Ledger::balance(conn, owner, currency))
            .unwrap()
            .value()
    }

    fn request(price: Decimal, currency: Currency) -> MintRequest {
        MintRequest {
            title: "Dawn".to_string(),
            description: "Oil on canvas".to_string(),
            category: "Painting".to_string(),
            image: Some("data:image/png;base64,AAAA".to_string()),
            price_usd: Amount::new(price).unwrap(),
            currency,
        }
    }

    fn admin_listing(reserve: &str) -> AdminListing {
        AdminListing {
            title: "Harbour".to_string(),
            artist: "M. Vale".to_string(),
            image: None,
            reserve: reserve.to_string(),
            category: "Photography".to_string(),
            description: "Long exposure".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mint_charges_gas_fee() {
        let (gallery, store) = gallery();
        fund(&store, "ann@x.io", Currency::Eth, dec!(0.1));

        let artwork = gallery
            .mint("ann@x.io", request(dec!(450), Currency::Eth))
            .await
            .unwrap();

        assert_eq!(artwork.price, "0.100000 ETH");
        assert_eq!(artwork.original_price, Some(dec!(450)));
        let fee = artwork.gas_fee.clone().unwrap();
        assert_eq!(fee.amount.value(), dec!(0.01));
        assert_eq!(fee.usd, dec!(45));
        assert_eq!(fee.conversion_rate, dec!(4500));
        assert_eq!(balance(&store, "ann@x.io", Currency::Eth), dec!(0.09));

        assert_eq!(gallery.artworks_of("ann@x.io").unwrap(), vec![artwork]);
        assert!(gallery.listings().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mint_usdt_price_rounds_up() {
        let (gallery, store) = gallery();
        fund(&store, "ann@x.io", Currency::Usdt, dec!(20));

        let artwork = gallery
            .mint("ann@x.io", request(dec!(99.5), Currency::Usdt))
            .await
            .unwrap();
        assert_eq!(artwork.price, "100 USDT");
        assert_eq!(balance(&store, "ann@x.io", Currency::Usdt), dec!(10.05));
    }

    #[tokio::test]
    async fn test_mint_without_funds_stores_nothing() {
        let (gallery, store) = gallery();

        let result = gallery
            .mint("ann@x.io", request(dec!(230), Currency::Sol))
            .await;

        assert!(matches!(
            result,
            Err(MarketError::InsufficientBalance {
                currency: Currency::Sol,
                ..
            })
        ));
        assert!(gallery.artworks().unwrap().is_empty());
        assert_eq!(balance(&store, "ann@x.io", Currency::Sol), dec!(0));
    }

    #[test]
    fn test_admin_listing_is_listed() {
        let (gallery, _) = gallery();
        let artwork = gallery.create_admin_listing(admin_listing("2 SOL")).unwrap();

        assert_eq!(artwork.owner, ADMIN_OWNER);
        assert!(artwork.uploaded_to_marketplace);

        let listings = gallery.listings().unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].artist, "M. Vale");
        assert_eq!(listings[0].reserve, "2 SOL");

        assert!(!gallery.upload_to_marketplace(&artwork.id).unwrap());
    }

    #[test]
    fn test_admin_listing_rejects_bad_reserve() {
        let (gallery, _) = gallery();
        let result = gallery.create_admin_listing(admin_listing("two SOL"));
        assert!(matches!(result, Err(MarketError::Validation(_))));

        let mut missing_artist = admin_listing("2 SOL");
        missing_artist.artist = " ".to_string();
        assert!(matches!(
            gallery.create_admin_listing(missing_artist),
            Err(MarketError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_is_idempotent() {
        let (gallery, store) = gallery();
        fund(&store, "ann@x.io", Currency::Eth, dec!(1));
        let artwork = gallery
            .mint("ann@x.io", request(dec!(450), Currency::Eth))
            .await
            .unwrap();

        assert!(gallery.upload_to_marketplace(&artwork.id).unwrap());
        assert!(!gallery.upload_to_marketplace(&artwork.id).unwrap());
        assert_eq!(gallery.listings().unwrap().len(), 1);
        assert!(gallery.artwork(&artwork.id).unwrap().unwrap().uploaded_to_marketplace);
    }

    #[test]
    fn test_admin_sale_credits_admin() {
        let (gallery, store) = gallery();
        let artwork = gallery.create_admin_listing(admin_listing("0.5 ETH")).unwrap();

        let sale = gallery.mark_sold(&artwork.id).unwrap();
        assert_eq!(sale.seller, ADMIN_OWNER);
        assert_eq!(balance(&store, ADMIN_OWNER, Currency::Eth), dec!(0.5));
        assert!(gallery.listings().unwrap()[0].sold);
    }

    #[test]
    fn test_delete_removes_listing() {
        let (gallery, _) = gallery();
        let artwork = gallery.create_admin_listing(admin_listing("1 BTC")).unwrap();

        gallery.delete(&artwork.id).unwrap();
        assert!(gallery.artworks().unwrap().is_empty());
        assert!(gallery.listings().unwrap().is_empty());
        assert!(matches!(
            gallery.delete(&artwork.id),
            Err(MarketError::NotFound(_))
        ));
    }
}
