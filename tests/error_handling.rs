mod common;

use common::*;
use mediatwin::{
    BatchOptions, HashAlgorithm, IngestError, MatchError, MediaKind, MediaTwin, MediaTwinConfig,
    PerceptualConfig, PerceptualError, RawMediaInput, SearchOptions, TwinError,
};
use serde_json::json;

#[test]
fn disconnected_twin_rejects_every_operation() {
    let mut twin = MediaTwin::in_memory(MediaTwinConfig::default()).unwrap();
    let input = || RawMediaInput::new(gradient_png(0));

    assert!(matches!(twin.add(input()), Err(TwinError::NotConnected)));
    assert!(matches!(
        twin.search(input(), &SearchOptions::default()),
        Err(TwinError::NotConnected)
    ));
    assert!(matches!(twin.remove("x"), Err(TwinError::NotConnected)));
    assert!(matches!(twin.rebuild_index(), Err(TwinError::NotConnected)));
    assert!(matches!(twin.stats(), Err(TwinError::NotConnected)));
}

#[test]
fn operations_fail_after_disconnect() {
    let mut twin = connected_twin();
    twin.add(RawMediaInput::new(gradient_png(0)).with_id("a")).unwrap();
    twin.disconnect().unwrap();
    assert!(matches!(twin.get("a"), Err(TwinError::NotConnected)));
}

#[test]
fn empty_payload_is_an_ingest_error() {
    let mut twin = connected_twin();
    let err = twin.add(RawMediaInput::new(Vec::new())).unwrap_err();
    assert!(matches!(err, TwinError::Ingest(IngestError::EmptyPayload)));
}

#[test]
fn unknown_bytes_are_unsupported() {
    let mut twin = connected_twin();
    let err = twin
        .add(RawMediaInput::new(b"plain text, no magic".to_vec()))
        .unwrap_err();
    assert!(matches!(err, TwinError::Ingest(IngestError::UnsupportedMedia(_))));
}

#[test]
fn hinted_garbage_fails_to_decode() {
    let mut twin = connected_twin();
    let err = twin
        .add(RawMediaInput::new(b"plain text, no magic".to_vec()).with_kind_hint(MediaKind::Image))
        .unwrap_err();
    assert!(matches!(err, TwinError::Perceptual(PerceptualError::Decode(_))));
}

#[test]
fn kind_hint_must_agree_with_content() {
    let mut twin = connected_twin();
    let err = twin
        .add(RawMediaInput::new(gradient_png(0)).with_kind_hint(MediaKind::Video))
        .unwrap_err();
    assert!(matches!(err, TwinError::Ingest(IngestError::KindMismatch { .. })));
}

#[test]
fn non_object_metadata_is_rejected() {
    let mut twin = connected_twin();
    let err = twin
        .add(RawMediaInput::new(gradient_png(0)).with_metadata(json!([1, 2, 3])))
        .unwrap_err();
    assert!(matches!(err, TwinError::Ingest(IngestError::InvalidMetadata(_))));
}

#[test]
fn blank_id_is_rejected() {
    let mut twin = connected_twin();
    let err = twin
        .add(RawMediaInput::new(gradient_png(0)).with_id("   "))
        .unwrap_err();
    assert!(matches!(err, TwinError::Ingest(IngestError::InvalidId(_))));
}

#[test]
fn invalid_search_options_are_rejected_before_searching() {
    let mut twin = connected_twin();
    twin.add(RawMediaInput::new(gradient_png(0)).with_id("a")).unwrap();

    let too_far = SearchOptions::default().with_threshold(65);
    let err = twin.search(RawMediaInput::new(gradient_png(0)), &too_far).unwrap_err();
    assert!(matches!(err, TwinError::Match(MatchError::InvalidConfig(_))));

    let no_limit = SearchOptions::default().with_limit(0);
    let err = twin.search(RawMediaInput::new(gradient_png(0)), &no_limit).unwrap_err();
    assert!(matches!(err, TwinError::Match(MatchError::InvalidConfig(_))));
}

#[test]
fn searching_an_uncomputed_algorithm_fails() {
    let mut config = MediaTwinConfig::default();
    config.perceptual = PerceptualConfig::default().with_algorithms(vec![HashAlgorithm::Structural]);
    let mut twin = connected_with(config);
    twin.add(RawMediaInput::new(gradient_png(0)).with_id("a")).unwrap();

    let err = twin
        .search(RawMediaInput::new(gradient_png(0)), &SearchOptions::new(HashAlgorithm::Gradient))
        .unwrap_err();
    assert!(matches!(
        err,
        TwinError::Match(MatchError::MissingQueryFingerprint(HashAlgorithm::Gradient))
    ));
}

#[test]
fn video_without_decoder_is_unsupported() {
    let mut twin = MediaTwin::in_memory(MediaTwinConfig::default()).unwrap();
    twin.connect().unwrap();
    let err = twin.add(RawMediaInput::new(synthetic_mp4(1))).unwrap_err();
    assert!(matches!(err, TwinError::UnsupportedMedia(_)));
}

#[test]
fn zero_chunk_size_is_invalid() {
    let mut twin = connected_twin();
    let err = twin
        .add_batch(Vec::new(), &BatchOptions::default().with_chunk_size(0), |_, _| {})
        .unwrap_err();
    assert!(matches!(err, TwinError::InvalidConfig(_)));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = MediaTwinConfig::default();
    config.search.threshold = 300;
    assert!(matches!(MediaTwin::in_memory(config), Err(TwinError::Config(_))));
}

#[test]
fn search_by_unknown_id_is_not_found() {
    let twin = connected_twin();
    let err = twin
        .search_by_id("ghost", &SearchOptions::default())
        .unwrap_err();
    assert!(matches!(err, TwinError::NotFound(id) if id == "ghost"));
}

#[test]
fn search_options_are_checked_before_decoding() {
    let twin = connected_twin();
    let err = twin
        .search(
            RawMediaInput::new(b"plain text, no magic".to_vec()).with_kind_hint(MediaKind::Image),
            &SearchOptions::default().with_threshold(65),
        )
        .unwrap_err();
    assert!(matches!(err, TwinError::Match(MatchError::InvalidConfig(_))));

    let err = twin
        .search_by_id("ghost", &SearchOptions::default().with_limit(0))
        .unwrap_err();
    assert!(matches!(err, TwinError::Match(MatchError::InvalidConfig(_))));
}
