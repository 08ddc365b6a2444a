//! Cache types for static backend resources.

use super::shop::StoreLocation;
use super::ugc::Package;

/// Cache key for the store location.
pub const STORE_LOCATION_KEY: &str = "shop:store-location";

/// Cache key for the UGC package catalog.
pub const PACKAGES_KEY: &str = "ugc:packages";

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    StoreLocation(Box<StoreLocation>),
    Packages(Vec<Package>),
}
