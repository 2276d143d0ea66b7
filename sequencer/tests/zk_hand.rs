use assert_matches::assert_matches;
use prover::layout::BOARD_CARDS;
use prover::seed::Seed;
use prover::{Card, Seat, SeatClient, Street};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sequencer::events;
use sequencer::proofs::{build_oracle, ProofBackend};
use sequencer::{HandOutcome, HandService, Resolution, ServiceConfig, Stage};

// Groth16 proof, compressed: two G1 points and one G2 point
const PROOF_LEN: usize = 128;

#[tokio::test]
async fn test_default_backend_plays_hand_to_showdown() {
    let oracle = tokio::task::spawn_blocking(|| build_oracle(ProofBackend::default()))
        .await
        .unwrap()
        .unwrap();
    let (tx, _rx) = events::channel();
    let service = HandService::new(ServiceConfig::default(), oracle.clone(), tx);

    let mut seats = [
        SeatClient::with_seed(Seat::FIRST, Seed::from_bytes([21u8; 32])),
        SeatClient::with_seed(Seat::SECOND, Seed::from_bytes([42u8; 32])),
    ];
    let id = service.create_hand().id;
    for seat in Seat::all() {
        service.bond_seat(id, seat).unwrap();
    }
    service.start_hand(id).unwrap();
    for client in &seats {
        service
            .commit_seed(id, client.seat(), client.seed_commitment())
            .unwrap();
    }
    for client in &seats {
        service
            .reveal_seed(id, client.seat(), client.reveal_seed())
            .unwrap();
    }
    let deck_seed = service.hand_view(id).unwrap().deck_seed.unwrap();

    let mut rng = StdRng::seed_from_u64(17);
    for client in seats.iter_mut() {
        client.deal(&deck_seed, &mut rng);
        let submission = client.prove_hole_cards(oracle.as_ref(), &deck_seed).unwrap();
        assert_eq!(submission.proof.0.len(), PROOF_LEN);
        service
            .submit_hole_cards(id, client.seat(), submission.commitments, submission.proof)
            .await
            .unwrap();
    }
    assert_eq!(service.hand_view(id).unwrap().stage, Stage::PreFlop);

    service.close_betting_round(id).unwrap();
    for street in Street::ALL {
        let submission = SeatClient::prove_board(oracle.as_ref(), &deck_seed, street).unwrap();
        let view = service
            .reveal_community(id, Seat::FIRST, street, submission.cards, submission.proof)
            .await
            .unwrap();
        assert!(!view.reveal_pending);
        service.close_betting_round(id).unwrap();
    }

    let view = service.hand_view(id).unwrap();
    assert_eq!(view.stage, Stage::Showdown);
    let board: [Card; BOARD_CARDS] = view.community.clone().try_into().unwrap();

    for client in &seats {
        let submission = client.prove_hand(oracle.as_ref(), &board).unwrap();
        assert_eq!(submission.proof.0.len(), PROOF_LEN);
        service
            .reveal_hand(id, client.seat(), submission.score, submission.proof)
            .await
            .unwrap();
    }

    let view = service.hand_view(id).unwrap();
    assert_eq!(view.stage, Stage::Completed);
    assert_matches!(
        view.outcome,
        Some(HandOutcome::Won { ref winners, resolution: Resolution::Showdown, best: Some(_) })
            if !winners.is_empty()
    );
}
