pub mod aggregate;
pub mod audit;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod harvester;
pub mod paths;
pub mod reconcile;
pub mod record;
pub mod transport;
pub mod util;
pub mod warn;
