pub mod browser;
pub mod cache;
pub mod discover;
pub mod error;
pub mod fallback;
pub mod grammar;
pub mod normalize;
pub mod rank;
mod runner;
pub mod sources;

pub use browser::{BrowserDriver, BrowserSession, ChromiumDriver, PageContext, PopupWatch};
pub use cache::{Clock, ManualClock, ResultCache, SystemClock};
pub use discover::{Discoverer, EngineConfig};
pub use error::{AdapterError, DiscoveryError, PageError};
pub use normalize::{store_slug, StoreSlug};
pub use sources::{build_sources, CouponSource, SourceSettings};
