use std::io::Cursor;
use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::config::OfferDeskConfig;
use crate::offers::book::OfferError;
use crate::offers::domain::{BusinessId, DecisionStatus, OfferGeneration, OfferId};
use crate::offers::repository::RepositoryError;
use crate::offers::service::{BusinessDraft, OfferDeskService, OfferServiceError};

fn draft(name: &str) -> BusinessDraft {
    BusinessDraft {
        business_name: name.to_string(),
        status: DecisionStatus::Pending,
    }
}

fn seed_flat(repository: &MemoryRepository, id: &str) -> BusinessId {
    repository.seed_json(
        id,
        json!({
            "id": id,
            "businessName": "Acme Bakery",
            "status": "approved",
            "lender": "Acme Capital",
            "advanceAmount": "50000",
            "factorRate": 1.35,
            "createdAt": "2024-11-05T09:00:00Z"
        }),
    );
    BusinessId::from(id)
}

#[test]
fn create_business_trims_name_and_rejects_duplicates() {
    let (service, repository) = build_service();

    let created = service
        .create_business(draft("  Kilo Bakery "))
        .expect("record created");
    assert_eq!(created.business_name, "Kilo Bakery");
    assert!(created.id.as_str().starts_with("biz-"));
    assert_eq!(repository.len(), 1);

    let duplicate = service.create_business(draft("Kilo Bakery"));
    assert!(matches!(
        duplicate,
        Err(OfferServiceError::Repository(RepositoryError::Conflict))
    ));

    let blank = service.create_business(draft("   "));
    assert!(matches!(blank, Err(OfferServiceError::MissingBusinessName)));
}

#[test]
fn reading_a_legacy_record_does_not_rewrite_it() {
    let (service, repository) = build_service();
    let id = seed_flat(&repository, "biz-flat");

    let view = service.offers(&id).expect("offers load");

    assert_eq!(view.stored_as, OfferGeneration::FlatLegacy);
    assert_eq!(view.offers.len(), 1);
    assert_eq!(view.primary_id, Some(OfferId::from("primary-biz-flat")));
    assert_eq!(view.offers[0].fields.factor_rate, "1.35");
    assert_eq!(repository.raw(&id)["lender"], "Acme Capital");
}

#[test]
fn first_mutation_persists_the_canonical_shape() {
    let (service, repository) = build_service();
    let id = seed_flat(&repository, "biz-flat");

    let view = service
        .add_offer(&id, fields("Second Lender", "15000"))
        .expect("offer added");

    assert_eq!(view.stored_as, OfferGeneration::FlatLegacy);
    assert_eq!(view.offers.len(), 2);
    assert_eq!(view.primary_id, Some(OfferId::from("primary-biz-flat")));

    let stored = repository.raw(&id);
    assert!(stored.get("lender").is_none());
    assert!(stored.get("advanceAmount").is_none());
    let approvals = stored["additionalApprovals"].as_array().expect("array");
    assert_eq!(approvals.len(), 2);
    assert!(approvals.iter().all(|entry| entry.get("isPrimary").is_some()));
    assert_eq!(approvals[0]["createdAt"], "2024-11-05T09:00:00Z");

    let reread = service.offers(&id).expect("offers load");
    assert_eq!(reread.stored_as, OfferGeneration::Canonical);
    assert_eq!(reread.offers, view.offers);
}

#[test]
fn legacy_array_is_upgraded_on_set_primary() {
    let (service, repository) = build_service();
    repository.seed_json(
        "biz-array",
        json!({
            "id": "biz-array",
            "businessName": "Lima Laundry",
            "additionalApprovals": [
                { "lender": "X", "amount": "10000", "term": "6mo", "factorRate": "1.3" },
                { "lender": "Y", "amount": "12000" }
            ]
        }),
    );
    let id = BusinessId::from("biz-array");

    let view = service
        .set_primary(&id, &OfferId::from("migrated-1"))
        .expect("primary moved");

    assert_eq!(view.stored_as, OfferGeneration::ArrayLegacy);
    assert_eq!(view.primary_id, Some(OfferId::from("migrated-1")));
    assert_eq!(primary_count(&view.offers), 1);
    assert_eq!(repository.raw(&id)["additionalApprovals"][1]["isPrimary"], true);
}

#[test]
fn edit_and_delete_report_unknown_offers() {
    let (service, repository) = build_service();
    let id = seed_flat(&repository, "biz-flat");
    let before = repository.raw(&id);

    let edit = service.edit_offer(&id, &OfferId::from("nope"), fields("X", "1"));
    assert!(matches!(
        edit,
        Err(OfferServiceError::Offer(OfferError::NotFound { .. }))
    ));

    let delete = service.delete_offer(&id, &OfferId::from("nope"));
    assert!(matches!(
        delete,
        Err(OfferServiceError::Offer(OfferError::NotFound { .. }))
    ));

    assert_eq!(repository.raw(&id), before, "failed mutations write nothing");
}

#[test]
fn deleting_every_offer_keeps_the_record_empty() {
    let (service, repository) = build_service();
    let id = seed_flat(&repository, "biz-flat");

    let view = service
        .delete_offer(&id, &OfferId::from("primary-biz-flat"))
        .expect("offer deleted");
    assert!(view.offers.is_empty());
    assert_eq!(view.primary_id, None);

    let reread = service.offers(&id).expect("record still present");
    assert!(reread.offers.is_empty(), "flat columns do not resurrect");
    assert_eq!(reread.stored_as, OfferGeneration::Empty);
}

#[test]
fn delete_business_removes_the_record() {
    let (service, repository) = build_service();
    let id = seed_flat(&repository, "biz-flat");

    service.delete_business(&id).expect("deleted");
    assert_eq!(repository.len(), 0);

    assert!(matches!(
        service.delete_business(&id),
        Err(OfferServiceError::BusinessNotFound(missing)) if missing == id
    ));
    assert!(matches!(
        service.offers(&id),
        Err(OfferServiceError::BusinessNotFound(_))
    ));
}

#[test]
fn approval_letter_selects_from_display_order() {
    let (service, repository) = build_service();
    let mut stored = record("biz-letter", "Mike Market");
    stored.commit_offers(vec![offer("a", false), offer("b", false), offer("c", true)]);
    repository.seed_json("biz-letter", serde_json::to_value(&stored).expect("encodes"));
    let id = BusinessId::from("biz-letter");

    let first = service
        .approval_letter(&id, 0)
        .expect("loads")
        .expect("offers present");
    assert_eq!(first.offer.id.as_str(), "c");
    assert_eq!(first.offer_count, 3);
    assert_eq!(first.previous_index, 2);
    assert_eq!(first.next_index, 1);

    let wrapped = service
        .approval_letter(&id, 4)
        .expect("loads")
        .expect("offers present");
    assert_eq!(wrapped.selected_index, 1);
    assert_eq!(wrapped.offer.id.as_str(), "a");
    assert_eq!(wrapped.theme_slot, 1);

    let empty = service
        .create_business(draft("November Nails"))
        .expect("created");
    assert_eq!(service.approval_letter(&empty.id, 0).expect("loads"), None);
}

#[test]
fn theme_slot_respects_configured_palette() {
    let repository = Arc::new(MemoryRepository::default());
    let config = OfferDeskConfig {
        palette_size: 2,
        ..OfferDeskConfig::default()
    };
    let service = OfferDeskService::new(repository.clone(), config);
    let mut stored = record("biz-palette", "Oscar Optics");
    stored.commit_offers(vec![offer("a", true), offer("b", false), offer("c", false)]);
    repository.seed_json("biz-palette", serde_json::to_value(&stored).expect("encodes"));

    let letter = service
        .approval_letter(&BusinessId::from("biz-palette"), 2)
        .expect("loads")
        .expect("offers present");
    assert_eq!(letter.theme_slot, 0);
}

#[test]
fn import_csv_runs_through_the_service() {
    let (service, repository) = build_service();
    let body = "Business Name,Overall Status,Best Lender,Best Amount\n\
                Papa Pizza,Approved,Acme Capital,50000\n";

    let summary = service
        .import_csv(Cursor::new(body.as_bytes().to_vec()))
        .expect("csv readable");

    assert_eq!(summary.imported, 1);
    assert_eq!(repository.len(), 1);
}

#[test]
fn partially_written_canonical_entries_stay_readable() {
    let (service, repository) = build_service();
    repository.seed_json(
        "biz-partial",
        json!({
            "id": "biz-partial",
            "businessName": "Quebec Quilts",
            "createdAt": "2024-11-05T09:00:00Z",
            "additionalApprovals": [
                { "id": "a", "lender": "X", "isPrimary": true },
                { "lender": "No id", "isPrimary": false, "createdAt": "2025-01-01T00:00:00Z" },
                { "id": "c", "lender": "Z", "isPrimary": null, "createdAt": "2025-01-02T00:00:00Z" }
            ]
        }),
    );

    let view = service
        .offers(&BusinessId::from("biz-partial"))
        .expect("partial entries are readable");

    assert_eq!(view.stored_as, OfferGeneration::Canonical);
    let ids: Vec<&str> = view.offers.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(ids, ["a", "migrated-1", "c"]);
    assert_eq!(
        view.offers[0].created_at.to_rfc3339(),
        "2024-11-05T09:00:00+00:00"
    );
    assert!(!view.offers[2].is_primary);
    assert_eq!(view.primary_id, Some(OfferId::from("a")));
}

#[test]
fn mutation_on_flagless_canonical_list_repairs_the_primary() {
    let (service, repository) = build_service();
    repository.seed_json(
        "biz-flagless",
        json!({
            "id": "biz-flagless",
            "businessName": "Romeo Roofing",
            "additionalApprovals": [
                { "id": "a", "lender": "X", "isPrimary": false, "createdAt": "2025-01-01T00:00:00Z" },
                { "id": "b", "lender": "Y", "isPrimary": null }
            ]
        }),
    );
    let id = BusinessId::from("biz-flagless");

    let view = service
        .edit_offer(&id, &OfferId::from("b"), fields("Y bis", "7000"))
        .expect("edit applies");

    assert_eq!(primary_count(&view.offers), 1);
    assert_eq!(view.primary_id, Some(OfferId::from("a")));
    let stored = repository.raw(&id);
    assert_eq!(stored["additionalApprovals"][1]["isPrimary"], false);
    assert!(stored["additionalApprovals"][1]["createdAt"].is_string());
}

#[test]
fn set_primary_with_unknown_offer_keeps_the_current_primary() {
    let (service, repository) = build_service();
    let id = seed_flat(&repository, "biz-flat");
    let view = service.add_offer(&id, fields("Sierra Funding", "8000")).expect("added");
    let primary = view.primary_id.clone();

    let view = service
        .set_primary(&id, &OfferId::from("nope"))
        .expect("unknown ids are ignored");

    assert_eq!(view.primary_id, primary);
    assert_eq!(primary_count(&view.offers), 1);
    assert_eq!(view.offers.len(), 2);
}

#[test]
fn non_array_offer_field_surfaces_as_repository_error() {
    let (service, repository) = build_service();
    repository.seed_json(
        "biz-bad",
        json!({
            "id": "biz-bad",
            "businessName": "Quebec Quilts",
            "additionalApprovals": 42
        }),
    );

    let result = service.offers(&BusinessId::from("biz-bad"));
    assert!(matches!(
        result,
        Err(OfferServiceError::Repository(RepositoryError::Corrupt(_)))
    ));
}

#[test]
fn repository_outage_propagates() {
    let service = OfferDeskService::new(
        Arc::new(UnavailableRepository),
        OfferDeskConfig::default(),
    );

    let result = service.add_offer(&BusinessId::from("biz-1"), fields("X", "1"));
    assert!(matches!(
        result,
        Err(OfferServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}
