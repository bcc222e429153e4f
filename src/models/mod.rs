pub mod event;
pub mod hold;
pub mod order;
pub mod org;
pub mod promo;
pub mod scan;
pub mod tier;
pub mod transfer;
pub mod user;
pub mod wallet;

pub use event::Event;
pub use hold::Hold;
pub use org::{EventScanGrant, Organization, OrganizationMember};
pub use order::{Order, OrderStatus};
pub use promo::{DiscountType, PromoCode, PromoEvaluation, PromoRejection};
pub use scan::{ScanLog, ScanResult};
pub use tier::TicketTier;
pub use transfer::{TicketTransfer, TransferStatus};
pub use user::User;
pub use wallet::{Ticket, TicketWallet, WalletStatus};
