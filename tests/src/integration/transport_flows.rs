//! # Transport Flows
//!
//! Envelopes crossing the air gap as shuffled, duplicated or incomplete
//! frame sets, and landing in a wallet session's import slot.

#[cfg(test)]
mod tests {
    use cv_01_numeric_codec::PayloadValue;
    use cv_02_frame_transport::{join, split, Frame, TransportConfig, WireEnvelope};
    use cv_03_envelope_lifecycle::{
        Envelope, EnvelopeKind, EnvelopeLifecycleApi, EnvelopeService, ImportProgress,
        ImportSession, MockBroadcaster, MockSigner,
    };
    use cv_05_utxo_cache::{Staleness, UtxoCacheConfig, UtxoSnapshotCache};
    use rand::seq::SliceRandom;
    use rand::{rngs::StdRng, SeedableRng};
    use shared_types::{
        AddressBook, ChainKind, DerivedAddress, DerivedKey, MockBalanceOracle, Network, Utxo,
        WalletError, U256,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn unsigned_payload(memo: &str) -> PayloadValue {
        PayloadValue::record()
            .with_field(
                "inputs",
                vec![PayloadValue::record()
                    .with_field("address", "mock1funded")
                    .with_field("value", U256::from(250_000u64))],
            )
            .with_field(
                "outputs",
                vec![PayloadValue::record()
                    .with_field("address", "mock1payee")
                    .with_field("amount", U256::from(240_000u64))],
            )
            .with_field("fee", U256::from(10_000u64))
            .with_field("memo", memo)
    }

    /// Unsigned transaction whose canonical text is exactly `len` characters.
    fn envelope_of_len(len: usize) -> WireEnvelope {
        let base = WireEnvelope::new("unsigned-transaction", 1, unsigned_payload(""))
            .to_canonical_string()
            .len();
        let envelope =
            WireEnvelope::new("unsigned-transaction", 1, unsigned_payload(&"a".repeat(len - base)));
        assert_eq!(envelope.to_canonical_string().len(), len);
        envelope
    }

    fn shuffled(mut frames: Vec<Frame>, seed: u64) -> Vec<Frame> {
        frames.shuffle(&mut StdRng::seed_from_u64(seed));
        frames
    }

    fn funded_book() -> AddressBook {
        let mut book = AddressBook::new();
        let mut entry = DerivedAddress::new(
            ChainKind::Receive,
            0,
            DerivedKey {
                address: "mock1funded".to_string(),
                key_handle: None,
            },
        );
        entry.balance = U256::from(250_000u64);
        book.append(entry).unwrap();
        book
    }

    // =============================================================================
    // SPLIT / JOIN
    // =============================================================================

    #[test]
    fn test_5000_char_envelope_over_1200_byte_frames() {
        let config = TransportConfig::default();
        let envelope = envelope_of_len(5_000);

        let frames = split(&envelope, config.max_frame_bytes).unwrap();
        // Quotes in the canonical text count twice once escaped into a frame.
        let quotes = envelope.to_canonical_string().matches('"').count();
        assert_eq!(
            frames.len(),
            (5_000 + quotes).div_ceil(config.chunk_capacity())
        );
        assert!(frames
            .iter()
            .all(|f| f.to_wire().len() <= config.max_frame_bytes));

        let data_id = frames[0].data_id.clone().unwrap();
        assert!(frames.iter().all(|f| f.data_id.as_deref() == Some(data_id.as_str())));
        assert!(frames.iter().all(|f| f.type_tag == "unsigned-transaction-multipart"));

        for seed in 0..5 {
            let joined = join(&shuffled(frames.clone(), seed)).unwrap();
            assert_eq!(joined.to_canonical_string(), envelope.to_canonical_string());
            assert_eq!(joined, envelope);
        }
    }

    #[test]
    fn test_frames_survive_wire_text() {
        let envelope = envelope_of_len(3_000);
        let wire: Vec<String> = split(&envelope, 1_200)
            .unwrap()
            .iter()
            .map(Frame::to_wire)
            .collect();

        let parsed: Vec<Frame> = wire.iter().map(|t| Frame::from_wire(t).unwrap()).collect();
        assert_eq!(join(&shuffled(parsed, 7)).unwrap(), envelope);
    }

    #[test]
    fn test_missing_frame_never_yields_truncated_envelope() {
        let frames = split(&envelope_of_len(5_000), 1_200).unwrap();
        for dropped in 0..frames.len() {
            let mut partial = frames.clone();
            let removed = partial.remove(dropped);
            match join(&partial) {
                Err(WalletError::IncompleteTransport { missing, total, .. }) => {
                    assert_eq!(missing, vec![removed.part_index]);
                    assert_eq!(total as usize, frames.len());
                }
                other => panic!("expected IncompleteTransport, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_duplicate_frame_does_not_change_result() {
        let envelope = envelope_of_len(4_000);
        let mut frames = split(&envelope, 1_200).unwrap();
        frames.push(frames[1].clone());
        frames.push(frames[0].clone());
        assert_eq!(join(&shuffled(frames, 3)).unwrap(), envelope);
    }

    // =============================================================================
    // IMPORT SLOT
    // =============================================================================

    #[tokio::test]
    async fn test_signed_frames_replace_unsigned_in_slot() {
        let service = EnvelopeService::new(MockSigner::new(), MockBroadcaster::new());
        let book = funded_book();

        let unsigned = Envelope::classify(envelope_of_len(2_500)).unwrap();
        let signed = service.sign(&unsigned, &book).await.unwrap();

        let mut session = ImportSession::new();
        let mut imported = None;
        for frame in shuffled(unsigned.to_frames(1_200).unwrap(), 1) {
            if let ImportProgress::Imported(envelope) = session.import_frame(frame).unwrap() {
                imported = Some(envelope);
            }
        }
        assert_eq!(imported.unwrap().kind(), EnvelopeKind::UnsignedTransaction);
        assert_eq!(session.current().unwrap().kind(), EnvelopeKind::UnsignedTransaction);

        let mut progress = Vec::new();
        for frame in shuffled(signed.to_frames(1_200).unwrap(), 2) {
            progress.push(session.import_frame(frame).unwrap());
        }
        assert!(matches!(progress.last(), Some(ImportProgress::Imported(_))));
        assert!(progress[..progress.len() - 1]
            .iter()
            .all(|p| matches!(p, ImportProgress::Pending(_))));

        let current = session.current().unwrap();
        assert_eq!(current.kind(), EnvelopeKind::SignedTransaction);
        assert_eq!(current.payload(), signed.payload());
        assert!(session.pending().is_empty());
    }

    #[test]
    fn test_interleaved_transports_complete_independently() {
        let first = envelope_of_len(3_000);
        let second = envelope_of_len(3_500);
        let mut frames = split(&first, 1_200).unwrap();
        frames.extend(split(&second, 1_200).unwrap());

        let mut session = ImportSession::new();
        let mut completed = Vec::new();
        for frame in shuffled(frames, 11) {
            if let ImportProgress::Imported(envelope) = session.import_frame(frame).unwrap() {
                completed.push(envelope.to_wire());
            }
        }
        assert_eq!(completed.len(), 2);
        assert!(completed.contains(&first));
        assert!(completed.contains(&second));
    }

    // =============================================================================
    // UTXO SNAPSHOTS
    // =============================================================================

    #[tokio::test]
    async fn test_utxo_snapshot_over_the_air_gap() {
        let addresses: Vec<String> = (0..40).map(|i| format!("mock1watch{i:02}")).collect();
        let mut oracle = MockBalanceOracle::new();
        for (i, address) in addresses.iter().enumerate() {
            oracle = oracle.with_utxo(Utxo {
                txid: format!("{:064x}", i + 1).replace('0', "f"),
                vout: i as u32 % 3,
                address: address.clone(),
                value: U256::from(10_000u64 + i as u64),
                confirmations: 6,
            });
        }

        // Watching device
        let online = UtxoSnapshotCache::new(UtxoCacheConfig::default()).unwrap();
        let snapshot = online
            .refresh(&oracle, &addresses, Network::Testnet, 1_700_000_000)
            .await
            .unwrap();
        assert_eq!(snapshot.count(), 40);
        let frames = Envelope::from_utxo_snapshot(&snapshot).to_frames(1_200).unwrap();
        assert!(frames.len() > 1);

        // Signing device
        let mut session = ImportSession::new();
        let mut received = None;
        for frame in shuffled(frames, 5) {
            if let ImportProgress::Imported(envelope) = session.import_frame(frame).unwrap() {
                received = Some(envelope);
            }
        }
        let envelope = received.unwrap();
        assert_eq!(envelope.kind(), EnvelopeKind::UtxoSnapshot);
        let imported = envelope.to_utxo_snapshot().unwrap();
        assert_eq!(imported, snapshot);

        let offline = UtxoSnapshotCache::new(UtxoCacheConfig::default()).unwrap();
        assert!(offline.store(imported));
        assert_eq!(
            offline.staleness(&addresses, 1_700_000_030),
            Staleness::Fresh { age_secs: 30 }
        );
        assert_eq!(
            offline.latest(&addresses).unwrap().total_value(),
            snapshot.total_value()
        );
    }
}
