//! Inline cell editing
//!
//! Each editable cell runs `Display -> Editing -> Saving -> Display`, or
//! goes straight back to `Display` when the edit is cancelled. A commit that
//! does not change the value never reaches the store. A failed save reverts
//! the cell to its last confirmed value and keeps the error for display.

use rust_decimal::Decimal;

use crate::core::error::QuoteError;
use crate::core::identity::EntityId;
use crate::core::store::{FieldAck, QuoteStore};
use crate::entities::quote::{ItemField, OptionField};

/// The cell being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Item { item: EntityId, field: ItemField },
    Option { option: EntityId, field: OptionField },
}

impl EditTarget {
    fn is_numeric(&self) -> bool {
        match self {
            EditTarget::Item { field, .. } => field.is_numeric(),
            EditTarget::Option { field, .. } => field.is_numeric(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState {
    Display,
    Editing { input: String },
    Saving { pending: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
}

/// Result of committing a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Value was unchanged; nothing was sent
    Unchanged,
    /// Store confirmed the value; totals should be recomputed
    Saved(FieldAck),
    /// Store refused or did not answer; the cell shows its old value
    Failed(QuoteError),
}

#[derive(Debug, Clone)]
pub struct CellEditor {
    target: EditTarget,
    confirmed: String,
    state: CellState,
    error: Option<QuoteError>,
}

impl CellEditor {
    pub fn new(target: EditTarget, current: impl Into<String>) -> Self {
        Self {
            target,
            confirmed: current.into(),
            state: CellState::Display,
            error: None,
        }
    }

    pub fn state(&self) -> &CellState {
        &self.state
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    /// Error left by the last failed save
    pub fn error(&self) -> Option<&QuoteError> {
        self.error.as_ref()
    }

    /// Text the cell shows right now
    pub fn shown(&self) -> &str {
        match &self.state {
            CellState::Display => &self.confirmed,
            CellState::Editing { input } => input,
            CellState::Saving { pending } => pending,
        }
    }

    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }

    /// Enter editing with the input seeded from the current value
    pub fn begin_edit(&mut self) {
        if self.state == CellState::Display {
            self.error = None;
            self.state = CellState::Editing {
                input: self.confirmed.clone(),
            };
        }
    }

    pub fn input(&mut self, text: impl Into<String>) {
        if let CellState::Editing { input } = &mut self.state {
            *input = text.into();
        }
    }

    /// Leave editing without committing
    pub fn cancel(&mut self) {
        if matches!(self.state, CellState::Editing { .. }) {
            self.state = CellState::Display;
        }
    }

    /// Enter commits, Escape cancels
    pub fn on_key(&mut self, key: Key, store: &mut dyn QuoteStore) -> Option<CommitOutcome> {
        match key {
            Key::Enter => self.commit(store),
            Key::Escape => {
                self.cancel();
                None
            }
        }
    }

    /// Losing focus commits like Enter
    pub fn blur(&mut self, store: &mut dyn QuoteStore) -> Option<CommitOutcome> {
        self.commit(store)
    }

    fn unchanged(&self, input: &str) -> bool {
        if self.target.is_numeric() {
            if let (Ok(old), Ok(new)) = (
                self.confirmed.trim().parse::<Decimal>(),
                input.trim().parse::<Decimal>(),
            ) {
                return old == new;
            }
        }
        input.trim() == self.confirmed.trim()
    }

    /// Move from editing to saving, returning the value to send
    ///
    /// Returns None, and goes back to display, when the value is unchanged.
    pub fn begin_commit(&mut self) -> Option<String> {
        let CellState::Editing { input } = &self.state else {
            return None;
        };
        if self.unchanged(input) {
            self.state = CellState::Display;
            return None;
        }
        let pending = input.clone();
        self.state = CellState::Saving {
            pending: pending.clone(),
        };
        Some(pending)
    }

    /// Settle a save started by [`CellEditor::begin_commit`]
    pub fn resolve(&mut self, result: Result<FieldAck, QuoteError>) -> CommitOutcome {
        self.state = CellState::Display;
        match result {
            Ok(ack) => {
                self.confirmed = ack.value.clone();
                self.error = None;
                CommitOutcome::Saved(ack)
            }
            Err(error) => {
                tracing::warn!(error = %error, value = %self.confirmed, "edit reverted");
                self.error = Some(error.clone());
                CommitOutcome::Failed(error)
            }
        }
    }

    /// Commit the current input through the store
    ///
    /// Returns None when the cell was not being edited.
    pub fn commit(&mut self, store: &mut dyn QuoteStore) -> Option<CommitOutcome> {
        if !matches!(self.state, CellState::Editing { .. }) {
            return None;
        }
        let Some(value) = self.begin_commit() else {
            return Some(CommitOutcome::Unchanged);
        };
        let result = match &self.target {
            EditTarget::Item { item, field } => store.update_item_field(item, *field, &value),
            EditTarget::Option { option, field } => store.update_option_field(option, *field, &value),
        };
        Some(self.resolve(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::entities::deal::{AustralianState, Deal, DealType, RevisionSource};
    use crate::entities::quote::LineItem;
    use rust_decimal_macros::dec;

    fn store_with_item() -> (MemoryStore, EntityId, EntityId) {
        let mut deal = Deal::new("Data Hall 3", DealType::DataCentres, AustralianState::Nsw, "sam");
        let option = deal
            .new_revision("Acme", RevisionSource::Blank)
            .unwrap()
            .options[0]
            .id
            .clone();
        let mut item = LineItem::product("NBG-65", "Pump", 2, dec!(100));
        item.discount = dec!(10);
        let item = deal.option_mut(&option).unwrap().push_item(item);
        (MemoryStore::new(vec![deal]), option, item)
    }

    #[test]
    fn test_quantity_edit_updates_totals() {
        let (mut store, option, item) = store_with_item();
        assert_eq!(store.option(&option).unwrap().totals(dec!(0)).subtotal, dec!(180));

        let mut cell = CellEditor::new(
            EditTarget::Item { item: item.clone(), field: ItemField::Quantity },
            "2",
        );
        cell.begin_edit();
        assert_eq!(cell.shown(), "2");
        cell.input("5");
        let outcome = cell.on_key(Key::Enter, &mut store).unwrap();

        assert!(matches!(outcome, CommitOutcome::Saved(_)));
        assert_eq!(cell.state(), &CellState::Display);
        assert_eq!(cell.shown(), "5");
        let totals = store.option(&option).unwrap().totals(dec!(0));
        assert_eq!(totals.line_totals, vec![dec!(450)]);
        assert_eq!(totals.grand_total, dec!(450));
    }

    #[test]
    fn test_unchanged_commit_skips_store() {
        let (mut store, _, item) = store_with_item();
        let mut cell = CellEditor::new(
            EditTarget::Item { item, field: ItemField::UnitPrice },
            "100",
        );
        cell.begin_edit();
        cell.input("100.00");
        assert_eq!(cell.blur(&mut store), Some(CommitOutcome::Unchanged));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_escape_cancels() {
        let (mut store, _, item) = store_with_item();
        let mut cell = CellEditor::new(
            EditTarget::Item { item, field: ItemField::Quantity },
            "2",
        );
        cell.begin_edit();
        cell.input("9");
        assert_eq!(cell.on_key(Key::Escape, &mut store), None);
        assert_eq!(cell.state(), &CellState::Display);
        assert_eq!(cell.shown(), "2");
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_failed_save_reverts() {
        let (mut store, _, item) = store_with_item();
        let mut cell = CellEditor::new(
            EditTarget::Item { item: item.clone(), field: ItemField::Discount },
            "10",
        );
        cell.begin_edit();
        cell.input("150");
        let outcome = cell.commit(&mut store).unwrap();

        assert!(matches!(outcome, CommitOutcome::Failed(QuoteError::PersistenceRejected(_))));
        assert_eq!(cell.shown(), "10");
        assert!(cell.error().is_some());

        store.fail_next_write(QuoteError::NetworkFailure("no response".into()));
        cell.begin_edit();
        assert!(cell.error().is_none());
        cell.input("20");
        let outcome = cell.commit(&mut store).unwrap();
        assert!(matches!(outcome, CommitOutcome::Failed(ref e) if e.is_retryable()));
        assert_eq!(cell.shown(), "10");
    }

    #[test]
    fn test_saving_state_between_commit_and_resolve() {
        let (_, _, item) = store_with_item();
        let mut cell = CellEditor::new(
            EditTarget::Item { item, field: ItemField::Notes },
            "",
        );
        cell.begin_edit();
        cell.input("ship with pump");
        assert_eq!(cell.begin_commit(), Some("ship with pump".to_string()));
        assert_eq!(
            cell.state(),
            &CellState::Saving { pending: "ship with pump".to_string() }
        );
        cell.resolve(Ok(FieldAck {
            value: "ship with pump".to_string(),
            new_state: None,
        }));
        assert_eq!(cell.confirmed(), "ship with pump");
    }

    #[test]
    fn test_option_field_edit() {
        let (mut store, option, _) = store_with_item();
        let mut cell = CellEditor::new(
            EditTarget::Option { option: option.clone(), field: OptionField::FreightCharge },
            "0",
        );
        cell.begin_edit();
        cell.input("35");
        cell.commit(&mut store).unwrap();
        assert_eq!(store.option(&option).unwrap().totals(dec!(0)).grand_total, dec!(215));
    }
}
