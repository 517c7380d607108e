//! Row reordering within one option
//!
//! A move is expressed as "put this row before that one" (or at the end)
//! and always persists the complete new order of the option in one call.
//! If the store refuses it, the authoritative order is reloaded so the
//! caller never keeps showing an order that was not saved.

use crate::core::error::QuoteError;
use crate::core::identity::EntityId;
use crate::core::store::QuoteStore;

/// What happened to a reorder request
#[derive(Debug, Clone, PartialEq)]
pub enum ReorderOutcome {
    /// New order saved
    Persisted(Vec<EntityId>),
    /// Row was already in place; nothing sent
    Unchanged(Vec<EntityId>),
    /// Store refused; this is the order it actually holds
    Reconciled {
        authoritative: Vec<EntityId>,
        reason: QuoteError,
    },
}

impl ReorderOutcome {
    /// The order to display afterwards
    pub fn order(&self) -> &[EntityId] {
        match self {
            ReorderOutcome::Persisted(order) | ReorderOutcome::Unchanged(order) => order,
            ReorderOutcome::Reconciled { authoritative, .. } => authoritative,
        }
    }
}

/// Compute the order after moving `moved` in front of `before`
///
/// `before = None` moves the row to the end. Both rows must belong to
/// `order`; anything else would be a move across options.
pub fn move_before(
    order: &[EntityId],
    moved: &EntityId,
    before: Option<&EntityId>,
) -> Result<Vec<EntityId>, QuoteError> {
    if !order.contains(moved) {
        return Err(QuoteError::InvalidReorder(format!(
            "{} is not a row of this option",
            moved
        )));
    }
    if let Some(anchor) = before {
        if !order.contains(anchor) {
            return Err(QuoteError::InvalidReorder(format!(
                "{} is not a row of this option",
                anchor
            )));
        }
    }

    let mut next: Vec<EntityId> = order.iter().filter(|id| *id != moved).cloned().collect();
    let index = match before {
        Some(anchor) if anchor == moved => order.iter().position(|id| id == moved).unwrap_or(0),
        Some(anchor) => next.iter().position(|id| id == anchor).unwrap_or(next.len()),
        None => next.len(),
    };
    next.insert(index, moved.clone());
    Ok(next)
}

/// Move a row within its option and persist the result
pub fn reorder(
    store: &mut dyn QuoteStore,
    option: &EntityId,
    moved: &EntityId,
    before: Option<&EntityId>,
) -> Result<ReorderOutcome, QuoteError> {
    let current = store.option(option)?.item_ids();
    let next = move_before(&current, moved, before)?;
    if next == current {
        return Ok(ReorderOutcome::Unchanged(current));
    }

    match store.reorder_items(option, &next) {
        Ok(()) => {
            tracing::debug!(option = %option, moved = %moved, "items reordered");
            Ok(ReorderOutcome::Persisted(next))
        }
        Err(reason) => {
            tracing::warn!(option = %option, error = %reason, "reorder rejected, reloading order");
            let authoritative = store.option(option)?.item_ids();
            Ok(ReorderOutcome::Reconciled {
                authoritative,
                reason,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::core::store::MemoryStore;
    use crate::entities::deal::{AustralianState, Deal, DealType, RevisionSource};
    use crate::entities::quote::LineItem;
    use rust_decimal_macros::dec;

    fn ids(n: usize) -> Vec<EntityId> {
        (0..n).map(|_| EntityId::new(EntityPrefix::Item)).collect()
    }

    #[test]
    fn test_move_before() {
        let order = ids(3);
        let (a, b, c) = (&order[0], &order[1], &order[2]);

        assert_eq!(move_before(&order, c, Some(a)).unwrap(), vec![c.clone(), a.clone(), b.clone()]);
        assert_eq!(move_before(&order, a, None).unwrap(), vec![b.clone(), c.clone(), a.clone()]);
        assert_eq!(move_before(&order, a, Some(c)).unwrap(), vec![b.clone(), a.clone(), c.clone()]);
        assert_eq!(move_before(&order, b, Some(b)).unwrap(), order);
    }

    #[test]
    fn test_move_across_options_rejected() {
        let order = ids(2);
        let stranger = EntityId::new(EntityPrefix::Item);
        let err = move_before(&order, &order[0], Some(&stranger)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidReorder(_)));
        assert!(move_before(&order, &stranger, None).is_err());
    }

    fn two_options() -> (MemoryStore, EntityId, Vec<EntityId>, EntityId, Vec<EntityId>) {
        let mut deal = Deal::new("Mall upgrade", DealType::Hvac, AustralianState::Qld, "sam");
        let first = deal
            .new_revision("Acme", RevisionSource::Blank)
            .unwrap()
            .options[0]
            .id
            .clone();
        let second = deal
            .new_revision("Acme", RevisionSource::Blank)
            .unwrap()
            .options[0]
            .id
            .clone();

        let mut fill = |option: &EntityId| -> Vec<EntityId> {
            let target = deal.option_mut(option).unwrap();
            ["A", "B", "C"]
                .iter()
                .map(|name| target.push_item(LineItem::custom(*name, 1, dec!(10))))
                .collect()
        };
        let first_items = fill(&first);
        let second_items = fill(&second);
        (MemoryStore::new(vec![deal]), first, first_items, second, second_items)
    }

    #[test]
    fn test_reorder_persists_exact_sequence() {
        let (mut store, first, items, second, second_items) = two_options();
        let (a, b, c) = (&items[0], &items[1], &items[2]);

        let outcome = reorder(&mut store, &first, c, Some(a)).unwrap();
        let expected = vec![c.clone(), a.clone(), b.clone()];
        assert_eq!(outcome, ReorderOutcome::Persisted(expected.clone()));
        assert_eq!(store.option(&first).unwrap().item_ids(), expected);
        assert_eq!(store.option(&second).unwrap().item_ids(), second_items);
    }

    #[test]
    fn test_reorder_noop_not_sent() {
        let (mut store, first, items, _, _) = two_options();
        let outcome = reorder(&mut store, &first, &items[1], Some(&items[2])).unwrap();
        assert!(matches!(outcome, ReorderOutcome::Unchanged(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_rejected_reorder_reconciles() {
        let (mut store, first, items, _, _) = two_options();
        store.fail_next_write(QuoteError::PersistenceRejected("stale order".into()));

        let outcome = reorder(&mut store, &first, &items[2], Some(&items[0])).unwrap();
        match &outcome {
            ReorderOutcome::Reconciled { authoritative, reason } => {
                assert_eq!(authoritative, &items);
                assert!(matches!(reason, QuoteError::PersistenceRejected(_)));
            }
            other => panic!("expected reconcile, got {:?}", other),
        }
        assert_eq!(outcome.order(), items.as_slice());
    }

    #[test]
    fn test_reorder_across_options_is_invalid() {
        let (mut store, first, items, _, second_items) = two_options();
        let err = reorder(&mut store, &first, &items[0], Some(&second_items[0])).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidReorder(_)));
        assert_eq!(store.write_count(), 0);
    }
}
