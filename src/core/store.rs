//! Persistence boundary for quote editing
//!
//! [`QuoteStore`] is the set of calls the quoting workflow makes against
//! saved deals: field updates, item reorders, accessory tags and option
//! saves. [`ProjectStore`] keeps deals as YAML documents in a project;
//! [`MemoryStore`] holds them in memory for dry runs and tests.
//!
//! Both stores apply the same rules, which live on the entities: values
//! are validated before they are stored, reorders must be an exact
//! permutation of the option's items, and deals whose quotes are locked
//! reject every change.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::core::error::QuoteError;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader::{self, LoadError};
use crate::core::project::Project;
use crate::entities::deal::Deal;
use crate::entities::quote::{AccessoryKind, ItemField, LineItem, OptionField, QuoteOption};
use crate::pricing::totals::{checked_line_total, MAX_AMOUNT};

/// Confirmation of a stored field edit
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldAck {
    /// Value as stored, which may be normalized from the input
    pub value: String,
    /// Row after the edit, for item fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_state: Option<LineItem>,
}

/// Calls the quoting workflow makes against persisted deals
pub trait QuoteStore {
    /// Authoritative copy of an option
    fn option(&self, option: &EntityId) -> Result<QuoteOption, QuoteError>;

    /// Option that contains an item
    fn option_of_item(&self, item: &EntityId) -> Result<EntityId, QuoteError>;

    fn update_item_field(&mut self, item: &EntityId, field: ItemField, value: &str) -> Result<FieldAck, QuoteError>;

    fn update_option_field(&mut self, option: &EntityId, field: OptionField, value: &str) -> Result<FieldAck, QuoteError>;

    /// Persist the full item order of one option
    fn reorder_items(&mut self, option: &EntityId, ordered: &[EntityId]) -> Result<(), QuoteError>;

    /// Accessory tags currently selected for a pump row
    fn accessories(&self, pump_item: &EntityId) -> Result<Vec<AccessoryKind>, QuoteError>;

    fn save_accessories(&mut self, pump_item: &EntityId, kinds: &[AccessoryKind]) -> Result<(), QuoteError>;

    /// Replace all items of an option
    fn save_option_items(&mut self, option: &EntityId, items: Vec<LineItem>) -> Result<(), QuoteError>;
}

/// Apply an item field edit to the deal containing the item
pub fn apply_item_field(deal: &mut Deal, item: &EntityId, field: ItemField, value: &str) -> Result<FieldAck, QuoteError> {
    deal.ensure_editable()?;
    let option_id = deal
        .option_of_item(item)
        .map(|o| o.id.clone())
        .ok_or_else(|| QuoteError::not_found("item", item.to_string()))?;
    let option = deal
        .option_mut(&option_id)
        .ok_or_else(|| QuoteError::not_found("option", option_id.to_string()))?;
    let row = option
        .item_mut(item)
        .ok_or_else(|| QuoteError::not_found("item", item.to_string()))?;

    let mut edited = row.clone();
    let value = edited.apply_field(field, value)?;
    let detached = field == ItemField::CustomName && row.pump.is_some();
    *row = edited.clone();
    if detached {
        // A custom row is no longer a pump, so its accessory rows go too
        option
            .items
            .retain(|i| i.accessory_of.as_ref() != Some(item));
        option.renumber();
    }

    Ok(FieldAck {
        value,
        new_state: option.item(item).cloned(),
    })
}

/// Apply an option field edit to the deal containing the option
pub fn apply_option_field(deal: &mut Deal, option: &EntityId, field: OptionField, value: &str) -> Result<FieldAck, QuoteError> {
    deal.ensure_editable()?;
    let target = deal
        .option_mut(option)
        .ok_or_else(|| QuoteError::not_found("option", option.to_string()))?;
    let value = target.apply_field(field, value)?;
    Ok(FieldAck {
        value,
        new_state: None,
    })
}

/// Reorder an option's items to match `ordered` exactly
pub fn apply_reorder(deal: &mut Deal, option: &EntityId, ordered: &[EntityId]) -> Result<(), QuoteError> {
    deal.ensure_editable()?;
    let target = deal
        .option_mut(option)
        .ok_or_else(|| QuoteError::not_found("option", option.to_string()))?;

    let current: HashSet<&EntityId> = target.items.iter().map(|i| &i.id).collect();
    let requested: HashSet<&EntityId> = ordered.iter().collect();
    if ordered.len() != target.items.len() || requested.len() != ordered.len() || current != requested {
        return Err(QuoteError::PersistenceRejected(format!(
            "order for option {} must list each of its {} items exactly once",
            option,
            target.items.len()
        )));
    }

    let mut items = std::mem::take(&mut target.items);
    target.items = ordered
        .iter()
        .filter_map(|id| {
            let index = items.iter().position(|i| &i.id == id)?;
            Some(items.swap_remove(index))
        })
        .collect();
    target.renumber();
    Ok(())
}

fn pump_row<'a>(deal: &'a Deal, pump_item: &EntityId) -> Result<&'a LineItem, QuoteError> {
    deal.item(pump_item)
        .ok_or_else(|| QuoteError::not_found("item", pump_item.to_string()))
}

/// Store accessory tags on a pump row
pub fn apply_accessory_tags(deal: &mut Deal, pump_item: &EntityId, kinds: &[AccessoryKind]) -> Result<(), QuoteError> {
    deal.ensure_editable()?;
    if !pump_row(deal, pump_item)?.is_pump() {
        return Err(QuoteError::PersistenceRejected(format!(
            "item {} is not a pump",
            pump_item
        )));
    }
    let option_id = deal
        .option_of_item(pump_item)
        .map(|o| o.id.clone())
        .ok_or_else(|| QuoteError::not_found("item", pump_item.to_string()))?;
    if let Some(row) = deal
        .option_mut(&option_id)
        .and_then(|o| o.item_mut(pump_item))
    {
        row.accessories = AccessoryKind::normalize(kinds);
    }
    Ok(())
}

/// Replace an option's items, validating every row
pub fn apply_option_items(deal: &mut Deal, option: &EntityId, items: Vec<LineItem>) -> Result<(), QuoteError> {
    deal.ensure_editable()?;
    let mut seen = HashSet::new();
    for item in &items {
        if !seen.insert(&item.id) {
            return Err(QuoteError::PersistenceRejected(format!(
                "item {} appears twice",
                item.id
            )));
        }
        let discount_ok = item.discount >= Decimal::ZERO && item.discount <= dec!(100);
        let price_ok = item.unit_price >= Decimal::ZERO && item.unit_price <= MAX_AMOUNT;
        if !discount_ok || !price_ok {
            return Err(QuoteError::PersistenceRejected(format!(
                "item {} has an out-of-range price or discount",
                item.id
            )));
        }
        if checked_line_total(Decimal::from(item.quantity), item.unit_price, item.discount).is_none() {
            return Err(QuoteError::PersistenceRejected(format!(
                "item {} line total is too large",
                item.id
            )));
        }
    }

    let target = deal
        .option_mut(option)
        .ok_or_else(|| QuoteError::not_found("option", option.to_string()))?;
    target.items = items;
    target.renumber();
    Ok(())
}

/// Deals stored as YAML documents under `deals/`
#[derive(Debug, Clone)]
pub struct ProjectStore {
    project: Project,
}

fn io_failure(e: LoadError) -> QuoteError {
    match e {
        LoadError::Io { .. } => QuoteError::NetworkFailure(e.to_string()),
        LoadError::Parse { .. } => QuoteError::PersistenceRejected(e.to_string()),
    }
}

impl ProjectStore {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// All readable deals with their paths
    pub fn deals(&self) -> Vec<(PathBuf, Deal)> {
        let mut deals: Vec<(PathBuf, Deal)> = loader::load_all(self.project.iter_deal_files());
        deals.sort_by(|a, b| a.1.created.cmp(&b.1.created));
        deals
    }

    /// Find a deal by id or unique id prefix
    pub fn find_deal(&self, reference: &str) -> Result<Deal, QuoteError> {
        let path = loader::find_document(self.project.iter_deal_files(), reference)
            .ok_or_else(|| QuoteError::not_found("deal", reference))?;
        loader::read_document(&path).map_err(io_failure)
    }

    /// Deal containing any entity (deal, revision, option or item)
    pub fn deal_containing(&self, id: &EntityId) -> Result<Deal, QuoteError> {
        if id.prefix() == EntityPrefix::Deal {
            return self.find_deal(&id.to_string());
        }
        self.deals()
            .into_iter()
            .map(|(_, deal)| deal)
            .find(|deal| deal.contains(id))
            .ok_or_else(|| QuoteError::not_found(kind_name(id), id.to_string()))
    }

    pub fn save_deal(&self, deal: &Deal) -> Result<(), QuoteError> {
        let path = self.project.deal_path(&deal.id);
        loader::write_document(&path, deal).map_err(io_failure)
    }

    pub fn delete_deal(&self, id: &EntityId) -> Result<(), QuoteError> {
        let path = self.project.deal_path(id);
        std::fs::remove_file(&path).map_err(|e| QuoteError::NetworkFailure(e.to_string()))
    }

    /// Load the deal holding `id`, change it and write it back
    fn modify<R>(&mut self, id: &EntityId, change: impl FnOnce(&mut Deal) -> Result<R, QuoteError>) -> Result<R, QuoteError> {
        let mut deal = self.deal_containing(id)?;
        let result = change(&mut deal).inspect_err(|e| {
            tracing::warn!(target_id = %id, error = %e, "change rejected");
        })?;
        self.save_deal(&deal)?;
        Ok(result)
    }
}

fn kind_name(id: &EntityId) -> &'static str {
    match id.prefix() {
        EntityPrefix::Deal => "deal",
        EntityPrefix::Rev => "revision",
        EntityPrefix::Opt => "option",
        EntityPrefix::Item => "item",
    }
}

impl QuoteStore for ProjectStore {
    fn option(&self, option: &EntityId) -> Result<QuoteOption, QuoteError> {
        let deal = self.deal_containing(option)?;
        deal.option(option)
            .cloned()
            .ok_or_else(|| QuoteError::not_found("option", option.to_string()))
    }

    fn option_of_item(&self, item: &EntityId) -> Result<EntityId, QuoteError> {
        let deal = self.deal_containing(item)?;
        deal.option_of_item(item)
            .map(|o| o.id.clone())
            .ok_or_else(|| QuoteError::not_found("item", item.to_string()))
    }

    fn update_item_field(&mut self, item: &EntityId, field: ItemField, value: &str) -> Result<FieldAck, QuoteError> {
        tracing::debug!(item = %item, field = %field, value, "update item field");
        self.modify(item, |deal| apply_item_field(deal, item, field, value))
    }

    fn update_option_field(&mut self, option: &EntityId, field: OptionField, value: &str) -> Result<FieldAck, QuoteError> {
        tracing::debug!(option = %option, field = %field, value, "update option field");
        self.modify(option, |deal| apply_option_field(deal, option, field, value))
    }

    fn reorder_items(&mut self, option: &EntityId, ordered: &[EntityId]) -> Result<(), QuoteError> {
        tracing::debug!(option = %option, items = ordered.len(), "reorder items");
        self.modify(option, |deal| apply_reorder(deal, option, ordered))
    }

    fn accessories(&self, pump_item: &EntityId) -> Result<Vec<AccessoryKind>, QuoteError> {
        let deal = self.deal_containing(pump_item)?;
        Ok(pump_row(&deal, pump_item)?.accessories.clone())
    }

    fn save_accessories(&mut self, pump_item: &EntityId, kinds: &[AccessoryKind]) -> Result<(), QuoteError> {
        tracing::debug!(item = %pump_item, ?kinds, "save accessories");
        self.modify(pump_item, |deal| apply_accessory_tags(deal, pump_item, kinds))
    }

    fn save_option_items(&mut self, option: &EntityId, items: Vec<LineItem>) -> Result<(), QuoteError> {
        tracing::debug!(option = %option, items = items.len(), "save option items");
        self.modify(option, |deal| apply_option_items(deal, option, items))
    }
}

/// In-memory store for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    deals: Vec<Deal>,
    fail_next: Option<QuoteError>,
    writes: usize,
}

impl MemoryStore {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self {
            deals,
            fail_next: None,
            writes: 0,
        }
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn into_deals(self) -> Vec<Deal> {
        self.deals
    }

    /// Make the next write fail with `error`
    pub fn fail_next_write(&mut self, error: QuoteError) {
        self.fail_next = Some(error);
    }

    /// Number of write calls received, failed ones included
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn deal_containing(&self, id: &EntityId) -> Result<&Deal, QuoteError> {
        self.deals
            .iter()
            .find(|d| d.contains(id))
            .ok_or_else(|| QuoteError::not_found(kind_name(id), id.to_string()))
    }

    fn modify<R>(&mut self, id: &EntityId, change: impl FnOnce(&mut Deal) -> Result<R, QuoteError>) -> Result<R, QuoteError> {
        self.writes += 1;
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }
        let deal = self
            .deals
            .iter_mut()
            .find(|d| d.contains(id))
            .ok_or_else(|| QuoteError::not_found(kind_name(id), id.to_string()))?;
        // Work on a copy so a rejected change leaves nothing behind
        let mut draft = deal.clone();
        let result = change(&mut draft)?;
        *deal = draft;
        Ok(result)
    }
}

impl QuoteStore for MemoryStore {
    fn option(&self, option: &EntityId) -> Result<QuoteOption, QuoteError> {
        self.deal_containing(option)?
            .option(option)
            .cloned()
            .ok_or_else(|| QuoteError::not_found("option", option.to_string()))
    }

    fn option_of_item(&self, item: &EntityId) -> Result<EntityId, QuoteError> {
        self.deal_containing(item)?
            .option_of_item(item)
            .map(|o| o.id.clone())
            .ok_or_else(|| QuoteError::not_found("item", item.to_string()))
    }

    fn update_item_field(&mut self, item: &EntityId, field: ItemField, value: &str) -> Result<FieldAck, QuoteError> {
        self.modify(item, |deal| apply_item_field(deal, item, field, value))
    }

    fn update_option_field(&mut self, option: &EntityId, field: OptionField, value: &str) -> Result<FieldAck, QuoteError> {
        self.modify(option, |deal| apply_option_field(deal, option, field, value))
    }

    fn reorder_items(&mut self, option: &EntityId, ordered: &[EntityId]) -> Result<(), QuoteError> {
        self.modify(option, |deal| apply_reorder(deal, option, ordered))
    }

    fn accessories(&self, pump_item: &EntityId) -> Result<Vec<AccessoryKind>, QuoteError> {
        let deal = self.deal_containing(pump_item)?;
        Ok(pump_row(deal, pump_item)?.accessories.clone())
    }

    fn save_accessories(&mut self, pump_item: &EntityId, kinds: &[AccessoryKind]) -> Result<(), QuoteError> {
        self.modify(pump_item, |deal| apply_accessory_tags(deal, pump_item, kinds))
    }

    fn save_option_items(&mut self, option: &EntityId, items: Vec<LineItem>) -> Result<(), QuoteError> {
        self.modify(option, |deal| apply_option_items(deal, option, items))
    }
}
