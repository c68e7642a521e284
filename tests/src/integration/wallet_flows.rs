//! # Wallet Flows
//!
//! Address discovery filling a session's address book, and that book
//! driving key resolution through sign and submit.
//!
//! ## Flow Tested
//!
//! 1. **Discovery (4)**: targeted probe, falling back to a gap-limited range
//! 2. **Envelope lifecycle (3)**: unsigned transaction built from the found
//!    address, signed on the offline side, submitted on the online side
//! 3. **Frame transport (2)**: every hand-over crosses the air gap as frames

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cv_01_numeric_codec::PayloadValue;
    use cv_02_frame_transport::WireEnvelope;
    use cv_03_envelope_lifecycle::{
        Envelope, EnvelopeKind, EnvelopeLifecycleApi, EnvelopeService, ImportProgress,
        ImportSession, MockBroadcaster, MockSigner,
    };
    use cv_04_address_discovery::{
        collect_batches, collect_scan, BatchEvent, ContinuousStatus, DiscoveryConfig,
        DiscoveryEngine, DiscoverySession, MockKeyDerivation, ScanRange,
    };
    use futures::StreamExt;
    use shared_types::{ChainKind, KeySource, MockBalanceOracle, Network, WalletError, U256};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn xpub() -> KeySource {
        KeySource::ExtendedPublicKey("xpub-integration-wallet".into())
    }

    fn receive(index: u32) -> String {
        MockKeyDerivation::address_for(&xpub(), ChainKind::Receive, index)
    }

    fn change(index: u32) -> String {
        MockKeyDerivation::address_for(&xpub(), ChainKind::Change, index)
    }

    fn wallet(
        funded: &[(String, u64)],
    ) -> (
        DiscoveryEngine<MockKeyDerivation, MockBalanceOracle>,
        Arc<MockBalanceOracle>,
    ) {
        let oracle = MockBalanceOracle::new();
        for (address, balance) in funded {
            oracle.set_balance(address.clone(), U256::from(*balance));
        }
        let oracle = Arc::new(oracle);
        let engine = DiscoveryEngine::new(
            Arc::new(MockKeyDerivation::new()),
            oracle.clone(),
            DiscoveryConfig::for_testing(),
        )
        .unwrap();
        (engine, oracle)
    }

    fn carry(envelope: &Envelope) -> Envelope {
        let mut session = ImportSession::new();
        for frame in envelope.to_frames(400).unwrap().into_iter().rev() {
            if let ImportProgress::Imported(received) = session.import_frame(frame).unwrap() {
                return received;
            }
        }
        panic!("frames did not complete");
    }

    // =============================================================================
    // DISCOVERY
    // =============================================================================

    #[tokio::test]
    async fn test_probe_set_with_only_index_5_funded() {
        let (engine, oracle) = wallet(&[(receive(5), 75_000)]);
        let session = DiscoverySession::new();

        let result = collect_scan(
            engine
                .scan_targeted(&session, &xpub(), ChainKind::Receive, &[0, 1, 2, 5, 10, 20, 50, 100])
                .unwrap(),
        )
        .await
        .unwrap();

        assert!(result.success);
        assert_eq!(result.addresses_found.len(), 1);
        assert_eq!(result.addresses_found[0].index, 5);
        assert_eq!(result.addresses_found[0].balance, U256::from(75_000u64));
        assert_eq!(oracle.call_count(), 8);
        assert!(oracle.calls().iter().flatten().all(|a| a != &receive(101)));
    }

    #[tokio::test]
    async fn test_probe_miss_falls_back_to_range_scan() {
        // Index 33 is outside the probe set and reachable by a range scan.
        let (engine, oracle) = wallet(&[(receive(14), 1_000), (receive(33), 2_000)]);
        let session = DiscoverySession::new();

        let probe = collect_scan(engine.scan_probe_set(&session, &xpub(), ChainKind::Receive).unwrap())
            .await
            .unwrap();
        assert!(!probe.success);

        let range = collect_scan(
            engine
                .scan_range(&session, &xpub(), ChainKind::Receive, 0, 20)
                .unwrap(),
        )
        .await
        .unwrap();
        let found: Vec<u32> = range.addresses_found.iter().map(|a| a.index).collect();
        assert_eq!(found, vec![14, 33]);
        assert_eq!(range.range_scanned, ScanRange { start: 0, end: 53 });
        assert_eq!(oracle.call_count(), 8 + 54);
        assert_eq!(session.book().total_balance(), U256::from(3_000u64));
    }

    #[tokio::test]
    async fn test_gap_limit_is_a_coverage_boundary() {
        // 21 empty addresses separate the two funded ones.
        let (engine, _) = wallet(&[(receive(2), 500), (receive(24), 900)]);
        let session = DiscoverySession::new();

        let result = collect_scan(
            engine
                .scan_range(&session, &xpub(), ChainKind::Receive, 0, 20)
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(result.range_scanned, ScanRange { start: 0, end: 22 });
        assert_eq!(result.addresses_found.len(), 1);

        // The caller continues from the reported end.
        let next = collect_scan(
            engine
                .scan_range(&session, &xpub(), ChainKind::Receive, result.range_scanned.end + 1, 20)
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(next.first_funded().unwrap().index, 24);
        assert_eq!(session.book().next_index(ChainKind::Receive), 45);
    }

    #[tokio::test]
    async fn test_continuous_scan_resumes_after_cancel() {
        let (engine, _) = wallet(&[(receive(95), 4_000)]);
        let session = DiscoverySession::new();
        let cancel = session.cancel_handle();

        let mut stream = engine
            .scan_continuous_batches(&session, &xpub(), ChainKind::Receive, 20, 0)
            .unwrap();
        let first = loop {
            match stream.next().await.unwrap().unwrap() {
                BatchEvent::RoundFinished { round: 2, .. } => cancel.cancel(),
                BatchEvent::Finished(outcome) => break outcome,
                _ => {}
            }
        };
        drop(stream);
        assert_eq!(first.status, ContinuousStatus::Cancelled);
        assert_eq!(session.resume_index(), Some(40));

        let resume = session.resume_index().unwrap();
        let second = collect_batches(
            engine
                .scan_continuous_batches(&session, &xpub(), ChainKind::Receive, 20, resume)
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(second.status, ContinuousStatus::FundsFound);
        assert_eq!(second.resume_index, 95);
        assert_eq!(second.rounds, 3);
        assert_eq!(session.resume_index(), Some(95));
    }

    #[tokio::test]
    async fn test_one_scan_per_session() {
        let (engine, _) = wallet(&[]);
        let session = DiscoverySession::new();
        let other_view = session.clone();

        let running = engine
            .scan_continuous_batches(&session, &xpub(), ChainKind::Receive, 20, 0)
            .unwrap();
        let err = engine
            .scan_range(&other_view, &xpub(), ChainKind::Change, 0, 20)
            .err()
            .unwrap();
        assert_eq!(err, WalletError::ScanInProgress);

        drop(running);
        let separate = DiscoverySession::new();
        assert!(engine
            .scan_range(&separate, &xpub(), ChainKind::Change, 0, 20)
            .is_ok());
    }

    // =============================================================================
    // DISCOVERY -> SIGN -> SUBMIT
    // =============================================================================

    #[tokio::test]
    async fn test_discovered_funds_signed_and_submitted() {
        let (engine, _) = wallet(&[(receive(5), 120_000)]);
        let session = DiscoverySession::new();
        let scan = collect_scan(engine.scan_probe_set(&session, &xpub(), ChainKind::Receive).unwrap())
            .await
            .unwrap();
        let funded = scan.first_funded().unwrap().clone();

        let change_address = engine
            .next_address(&session, &xpub(), ChainKind::Change)
            .await
            .unwrap();
        assert_eq!(change_address.address, change(0));

        // Watching device builds the request.
        let unsigned = Envelope::classify(WireEnvelope::new(
            "unsigned-transaction",
            1,
            PayloadValue::record()
                .with_field(
                    "inputs",
                    vec![PayloadValue::record()
                        .with_field("address", funded.address.as_str())
                        .with_field("value", funded.balance)],
                )
                .with_field(
                    "outputs",
                    vec![
                        PayloadValue::record()
                            .with_field("address", "mock1merchant")
                            .with_field("amount", U256::from(100_000u64)),
                        PayloadValue::record()
                            .with_field("address", change_address.address.as_str())
                            .with_field("amount", U256::from(19_000u64)),
                    ],
                )
                .with_field("fee", U256::from(1_000u64)),
        ))
        .unwrap();

        // Signing device resolves keys from its own copy of the book.
        let service = EnvelopeService::new(MockSigner::new(), MockBroadcaster::new());
        let received = carry(&unsigned);
        assert_eq!(received.kind(), EnvelopeKind::UnsignedTransaction);
        let signed = service.sign(&received, &session.book()).await.unwrap();
        let requests = service.signer().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].get(&funded.address).map(|h| h.as_str().to_string()),
            Some(funded.signing_handle().as_str().to_string())
        );

        // Back on the watching device.
        let signed = carry(&signed);
        assert_eq!(signed.kind(), EnvelopeKind::SignedTransaction);
        let submitted = service.submit(&signed, &session, Network::Regtest).await.unwrap();

        assert_eq!(submitted.kind(), EnvelopeKind::SubmittedTransaction);
        assert!(submitted.payload().non_empty_text("txid").is_some());
        assert_eq!(
            service.broadcaster().submitted(),
            vec![("signed-transaction".to_string(), Network::Regtest)]
        );

        // The session's own book saw the spend, so change rotates forward.
        let book = session.book();
        assert!(book.get(&funded.address).unwrap().used);
        assert!(book.get(&change_address.address).unwrap().used);
        let next_change = engine
            .next_address(&session, &xpub(), ChainKind::Change)
            .await
            .unwrap();
        assert_eq!(next_change.index, 1);
        assert_eq!(next_change.address, change(1));

        // Submitted is terminal.
        let err = service.submit(&submitted, &session, Network::Regtest).await.unwrap_err();
        assert!(matches!(err, WalletError::StateTransition { .. }));
    }
}
