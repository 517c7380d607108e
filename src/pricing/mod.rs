//! Pricing workflow - totals, accessory sizing and inline editing
//!
//! - [`totals`] derives line, option and GST totals
//! - [`sizing`] picks inertia bases, seismic springs and rubber mounts
//! - [`synthesizer`] inserts accessory rows beneath their pump
//! - [`accessories`] runs the select, size, insert and save workflow
//! - [`editor`] and [`reorder`] drive in-place edits and row moves

pub mod accessories;
pub mod editor;
pub mod reorder;
pub mod sizing;
pub mod synthesizer;
pub mod totals;

pub use accessories::{apply_accessories, plan_accessories, AppliedAccessories};
pub use editor::{CellEditor, CellState, CommitOutcome, EditTarget, Key};
pub use reorder::{move_before, reorder, ReorderOutcome};
pub use sizing::{BaseRequest, MountRequest, SizingResult, SizingService, SpringRequest};
pub use synthesizer::{synthesize, AccessoryRow};
pub use totals::{line_total, OptionTotals};
