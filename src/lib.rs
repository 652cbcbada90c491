//! Flattens cloud inventory listings (hosting plans, web and function apps,
//! autoscale settings) into one report row per resource.
//!
//! The core ([`inventory_core`]) is a pure in-memory join: build an
//! [`AssociationIndex`] per secondary listing, then [`flatten`] the primary
//! listing against those indexes with a [`FieldMap`]. Everything around it
//! (listing sources, report definitions, output sinks) is a thin shell.

pub mod collectors;
pub mod config;
pub mod error;
pub mod inventory_core;
pub mod logging;
pub mod mock;
pub mod out;
pub mod reports;

pub use config::Config;
pub use error::FlattenError;
pub use inventory_core::{
    flatten, AssociationIndex, ColumnSource, ColumnSpec, FieldMap, FieldPath, FlatRow, IdPattern,
    InventoryRecord, InventorySource, KeySpec, ResourceId, ResourceKind,
};
pub use logging::init_tracing;
