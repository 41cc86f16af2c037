pub mod calendar;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod form;
pub mod indexer;
pub mod ledger;
pub mod logging;
pub mod match_record;
pub mod output;
pub mod season;
pub mod standings;
pub mod store;
pub mod table;
