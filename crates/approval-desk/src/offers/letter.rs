use serde::Serialize;

use super::domain::{BusinessId, OfferEntry};
use super::ordering::{display_order, theme_slot, SelectionCursor};

/// Read-only payload behind a public approval-letter link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalLetterView {
    pub business_id: BusinessId,
    pub business_name: String,
    pub offer_count: usize,
    pub selected_index: usize,
    pub previous_index: usize,
    pub next_index: usize,
    pub theme_slot: usize,
    pub offer: OfferEntry,
}

/// Builds the letter for the offer at `requested_index` of the display order, or `None` when
/// the business has no offers to show.
pub fn approval_letter(
    business_id: &BusinessId,
    business_name: &str,
    offers: &[OfferEntry],
    requested_index: usize,
    palette_size: usize,
) -> Option<ApprovalLetterView> {
    let ordered = display_order(offers);
    let cursor = SelectionCursor::new(ordered.len(), requested_index);
    let offer = ordered.into_iter().nth(cursor.index())?;

    Some(ApprovalLetterView {
        business_id: business_id.clone(),
        business_name: business_name.to_string(),
        offer_count: cursor.len(),
        selected_index: cursor.index(),
        previous_index: cursor.previous().index(),
        next_index: cursor.next().index(),
        theme_slot: theme_slot(cursor.index(), palette_size),
        offer,
    })
}
