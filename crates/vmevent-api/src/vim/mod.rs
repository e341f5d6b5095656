// vim25 SOAP client modules
//
// Hand-written client for the subset of the vSphere Web Services API the
// event pipeline needs: session, event history, property collector, and
// the description / localization catalogs.

pub mod catalog;
pub mod client;
pub mod description;
pub mod events;
pub mod models;
pub mod property;
pub mod session;
pub(crate) mod soap;

pub use client::VimClient;
