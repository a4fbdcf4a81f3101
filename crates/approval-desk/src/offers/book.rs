//! Offer list mutations that keep exactly one primary offer whenever the list is non-empty.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{OfferEntry, OfferFields, OfferId};
use super::ids::{new_offer_id_at, OfferIdOrigin};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfferError {
    #[error("offer {id} not found")]
    NotFound { id: OfferId },
}

/// An ordered offer list owned by one business record.
///
/// Storage order is preserved as given; nothing here re-sorts. Every mutation finishes with a
/// repair pass, so a list that arrived with zero or several primaries leaves with exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OfferBook {
    entries: Vec<OfferEntry>,
}

impl OfferBook {
    pub fn new(entries: Vec<OfferEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[OfferEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<OfferEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &OfferId) -> Option<&OfferEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    pub fn primary(&self) -> Option<&OfferEntry> {
        self.entries.iter().find(|entry| entry.is_primary)
    }

    pub fn add(&mut self, fields: OfferFields) -> OfferId {
        self.add_at(fields, Utc::now())
    }

    /// Appends a new offer. It is primary only when the list was empty.
    pub fn add_at(&mut self, fields: OfferFields, now: DateTime<Utc>) -> OfferId {
        let mut id = new_offer_id_at(OfferIdOrigin::Manual, now);
        while self.get(&id).is_some() {
            id = new_offer_id_at(OfferIdOrigin::Manual, now);
        }

        let is_primary = self.entries.is_empty();
        self.entries
            .push(OfferEntry::new(id.clone(), fields, is_primary, now));
        repair_primary(&mut self.entries);
        id
    }

    /// Replaces every editable attribute of `id`. Identity, creation time, and primary status
    /// are carried over from the entry being replaced.
    pub fn edit(&mut self, id: &OfferId, fields: OfferFields) -> Result<(), OfferError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| &entry.id == id)
            .ok_or_else(|| OfferError::NotFound { id: id.clone() })?;
        entry.fields = fields;
        repair_primary(&mut self.entries);
        Ok(())
    }

    /// The only operation that moves the primary flag. Total: an unknown `id` leaves the
    /// current primary in place and returns `false`.
    pub fn set_primary(&mut self, id: &OfferId) -> bool {
        if self.get(id).is_none() {
            repair_primary(&mut self.entries);
            return false;
        }

        for entry in &mut self.entries {
            entry.is_primary = &entry.id == id;
        }
        true
    }

    /// Removes `id`; when it was the primary, the first remaining entry in list order takes over.
    pub fn delete(&mut self, id: &OfferId) -> Result<OfferEntry, OfferError> {
        let position = self
            .entries
            .iter()
            .position(|entry| &entry.id == id)
            .ok_or_else(|| OfferError::NotFound { id: id.clone() })?;
        let removed = self.entries.remove(position);
        repair_primary(&mut self.entries);
        Ok(removed)
    }
}

/// Leaves exactly one primary in a non-empty list: the first flagged entry wins, or the first
/// entry is promoted when none is flagged.
pub(crate) fn repair_primary(entries: &mut [OfferEntry]) {
    match entries.iter().position(|entry| entry.is_primary) {
        Some(keep) => {
            for (index, entry) in entries.iter_mut().enumerate() {
                entry.is_primary = index == keep;
            }
        }
        None => {
            if let Some(first) = entries.first_mut() {
                first.is_primary = true;
            }
        }
    }
}

pub fn add_offer(offers: Vec<OfferEntry>, fields: OfferFields) -> Vec<OfferEntry> {
    let mut book = OfferBook::new(offers);
    book.add(fields);
    book.into_entries()
}

pub fn edit_offer(
    offers: Vec<OfferEntry>,
    id: &OfferId,
    fields: OfferFields,
) -> Result<Vec<OfferEntry>, OfferError> {
    let mut book = OfferBook::new(offers);
    book.edit(id, fields)?;
    Ok(book.into_entries())
}

pub fn set_primary(offers: Vec<OfferEntry>, id: &OfferId) -> Vec<OfferEntry> {
    let mut book = OfferBook::new(offers);
    book.set_primary(id);
    book.into_entries()
}

pub fn delete_offer(offers: Vec<OfferEntry>, id: &OfferId) -> Result<Vec<OfferEntry>, OfferError> {
    let mut book = OfferBook::new(offers);
    book.delete(id)?;
    Ok(book.into_entries())
}
