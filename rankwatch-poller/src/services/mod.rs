//! Poller services: provider adapter, name cache, resolver, notifier

pub mod category_names;
pub mod keepa;
pub mod notifier;
pub mod provider;
pub mod rank_resolver;
pub mod slack;
