use crate::cards::Card;
use crate::circuits::{HandRevealCircuit, HoleCardsCircuit, RevealCircuit};
use crate::commitment::{CardCommitment, CardOpening};
use crate::evaluator;
use crate::layout::{Seat, Street, BOARD_CARDS, HOLE_CARDS};
use crate::oracle::{
    ensure_circuit, CircuitId, PrivateInputs, ProofBytes, ProofError, ProofOracle, PublicInputs,
};
use crate::seed::DeckSeed;
use crate::shuffle;
use crate::witness_generator::{WitnessError, WitnessGenerator};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{thread_rng, CryptoRng, RngCore};
use std::collections::HashMap;
use tracing::{debug, info};

/// Each distinct constraint system needs its own key pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CircuitShape {
    HoleCards,
    /// Board reveal with a fixed number of slots (3 for the flop, 1 otherwise).
    Reveal { slots: usize },
    HandReveal,
}

impl CircuitShape {
    pub const ALL: [CircuitShape; 4] = [
        CircuitShape::HoleCards,
        CircuitShape::Reveal { slots: 3 },
        CircuitShape::Reveal { slots: 1 },
        CircuitShape::HandReveal,
    ];

    pub fn for_street(street: Street) -> Self {
        CircuitShape::Reveal {
            slots: street.card_count(),
        }
    }

    pub fn circuit_id(self) -> CircuitId {
        match self {
            CircuitShape::HoleCards => CircuitId::HoleCards,
            CircuitShape::Reveal { .. } => CircuitId::CommunityReveal,
            CircuitShape::HandReveal => CircuitId::HandReveal,
        }
    }

    pub fn name(self) -> String {
        match self {
            CircuitShape::HoleCards => "hole_cards".to_string(),
            CircuitShape::Reveal { slots } => format!("reveal_{slots}"),
            CircuitShape::HandReveal => "hand_reveal".to_string(),
        }
    }
}

struct CircuitKeys {
    proving_key: ProvingKey<Bn254>,
    verifying_key: VerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
}

/// Groth16 backend for the hole-card, board-reveal and hand-reveal circuits.
///
/// Keys come from a circuit-specific setup over a structurally identical
/// dummy circuit.
pub struct Groth16Oracle {
    witness_generator: WitnessGenerator,
    keys: HashMap<CircuitShape, CircuitKeys>,
}

impl Default for Groth16Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl Groth16Oracle {
    pub fn new() -> Self {
        Self {
            witness_generator: WitnessGenerator::new(),
            keys: HashMap::new(),
        }
    }

    /// Setup keys for every circuit shape
    pub fn setup(&mut self) -> Result<(), ProofError> {
        let mut rng = thread_rng();
        self.setup_with_rng(&mut rng)
    }

    pub fn setup_with_rng<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<(), ProofError> {
        for shape in CircuitShape::ALL {
            self.setup_shape(shape, rng)?;
        }
        Ok(())
    }

    pub fn setup_shape<R: RngCore + CryptoRng>(
        &mut self,
        shape: CircuitShape,
        rng: &mut R,
    ) -> Result<(), ProofError> {
        let (proving_key, verifying_key) = match shape {
            CircuitShape::HoleCards => Self::generate_keys(Self::dummy_hole_cards(), rng)?,
            CircuitShape::Reveal { slots } => Self::generate_keys(Self::dummy_reveal(slots), rng)?,
            CircuitShape::HandReveal => Self::generate_keys(Self::dummy_hand_reveal()?, rng)?,
        };
        let prepared = prepare_verifying_key(&verifying_key);
        info!(
            circuit = %shape.name(),
            public_inputs = verifying_key.gamma_abc_g1.len() - 1,
            "Groth16 keys generated"
        );

        self.keys.insert(
            shape,
            CircuitKeys {
                proving_key,
                verifying_key,
                prepared,
            },
        );
        Ok(())
    }

    pub fn is_ready(&self, shape: CircuitShape) -> bool {
        self.keys.contains_key(&shape)
    }

    pub fn get_verifying_key(&self, shape: CircuitShape) -> Option<&VerifyingKey<Bn254>> {
        self.keys.get(&shape).map(|k| &k.verifying_key)
    }

    /// Serialize a verifying key for deployment
    pub fn serialize_verifying_key(&self, shape: CircuitShape) -> Result<Vec<u8>, ProofError> {
        let vk = self
            .get_verifying_key(shape)
            .ok_or(ProofError::NotSetUp(shape.circuit_id()))?;

        let mut buf = Vec::new();
        vk.serialize_compressed(&mut buf)?;
        Ok(buf)
    }

    fn keys_for(&self, shape: CircuitShape) -> Result<&CircuitKeys, ProofError> {
        self.keys
            .get(&shape)
            .ok_or(ProofError::NotSetUp(shape.circuit_id()))
    }

    fn generate_keys<C, R>(
        circuit: C,
        rng: &mut R,
    ) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ProofError>
    where
        C: ConstraintSynthesizer<Fr>,
        R: RngCore + CryptoRng,
    {
        Groth16::<Bn254>::setup(circuit, rng).map_err(|e| {
            ProofError::ProofGeneration(format!("Parameter generation failed: {}", e))
        })
    }

    /// Any valid assignment fixes the circuit structure for setup
    fn dummy_hole_cards() -> HoleCardsCircuit {
        let deck = shuffle::shuffle(&Fr::from(0u64));
        let openings = deck
            .hole_cards(Seat::FIRST)
            .map(|card| CardOpening::new(card, Fr::from(0u64)));
        HoleCardsCircuit::new(&deck, Seat::FIRST, &openings)
    }

    fn dummy_reveal(slots: usize) -> RevealCircuit {
        let deck = shuffle::shuffle(&Fr::from(0u64));
        let street = if slots == Street::Flop.card_count() {
            Street::Flop
        } else {
            Street::Turn
        };
        RevealCircuit::new(&deck, street, &deck.street_cards(street))
    }

    fn dummy_hand_reveal() -> Result<HandRevealCircuit, ProofError> {
        let deck = shuffle::shuffle(&Fr::from(0u64));
        let openings = deck
            .hole_cards(Seat::FIRST)
            .map(|card| CardOpening::new(card, Fr::from(0u64)));
        let board = deck.board();
        let score = evaluator::evaluate_hand(&openings.map(|o| o.card), &board)
            .map_err(WitnessError::from)?
            .score();
        Ok(HandRevealCircuit::new(&openings, &board, score))
    }

    fn prove_circuit<C: ConstraintSynthesizer<Fr>>(
        &self,
        shape: CircuitShape,
        circuit: C,
    ) -> Result<ProofBytes, ProofError> {
        let keys = self.keys_for(shape)?;
        let mut rng = thread_rng();
        let proof = Groth16::<Bn254>::prove(&keys.proving_key, circuit, &mut rng)
            .map_err(|e| ProofError::ProofGeneration(format!("Proof creation failed: {}", e)))?;

        let mut buf = Vec::new();
        proof.serialize_compressed(&mut buf)?;
        debug!(circuit = %shape.name(), bytes = buf.len(), "Proof generated");
        Ok(ProofBytes(buf))
    }

    fn verify_circuit(
        &self,
        shape: CircuitShape,
        proof: &ProofBytes,
        public_inputs: &[Fr],
    ) -> Result<bool, ProofError> {
        let keys = self.keys_for(shape)?;
        proof.check_size()?;
        let proof = Proof::<Bn254>::deserialize_compressed(proof.as_slice())?;

        // A pairing-check failure is a rejection, not a backend fault
        Ok(
            Groth16::<Bn254>::verify_with_processed_vk(&keys.prepared, public_inputs, &proof)
                .unwrap_or(false),
        )
    }

    fn hole_card_inputs(
        deck_seed: &DeckSeed,
        seat: Seat,
        commitments: &[CardCommitment; HOLE_CARDS],
    ) -> Vec<Fr> {
        HoleCardsCircuit::public_inputs(
            deck_seed.shuffle().digest(),
            seat.hole_positions(),
            commitments.map(|c| c.as_field()),
        )
    }

    fn reveal_inputs(deck_seed: &DeckSeed, street: Street, cards: &[Card]) -> Vec<Fr> {
        RevealCircuit::public_inputs(deck_seed.shuffle().digest(), street.positions(), cards)
    }

    fn hand_inputs(
        commitments: &[CardCommitment; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
        score: u64,
    ) -> Vec<Fr> {
        HandRevealCircuit::public_inputs(commitments.map(|c| c.as_field()), board, score)
    }
}

impl ProofOracle for Groth16Oracle {
    fn prove(
        &self,
        circuit: CircuitId,
        private: &PrivateInputs,
        public: &PublicInputs,
    ) -> Result<ProofBytes, ProofError> {
        ensure_circuit(circuit, public)?;

        match (public, private) {
            (
                PublicInputs::HoleCards {
                    deck_seed,
                    seat,
                    commitments,
                },
                PrivateInputs::HoleCards { openings },
            ) => {
                let witness =
                    self.witness_generator
                        .hole_cards(deck_seed, *seat, openings, commitments)?;
                self.prove_circuit(CircuitShape::HoleCards, witness)
            }
            (
                PublicInputs::CommunityReveal {
                    deck_seed,
                    street,
                    cards,
                },
                PrivateInputs::CommunityReveal,
            ) => {
                let witness = self
                    .witness_generator
                    .community_reveal(deck_seed, *street, cards)?;
                self.prove_circuit(CircuitShape::for_street(*street), witness)
            }
            (
                PublicInputs::HandReveal {
                    commitments,
                    board,
                    score,
                },
                PrivateInputs::HandReveal { openings },
            ) => {
                let witness =
                    self.witness_generator
                        .hand_reveal(commitments, board, *score, openings)?;
                self.prove_circuit(CircuitShape::HandReveal, witness)
            }
            _ => Err(ProofError::ProofGeneration(format!(
                "private inputs do not belong to {circuit:?}"
            ))),
        }
    }

    fn verify(
        &self,
        circuit: CircuitId,
        proof: &ProofBytes,
        public: &PublicInputs,
    ) -> Result<bool, ProofError> {
        ensure_circuit(circuit, public)?;

        match public {
            PublicInputs::HoleCards {
                deck_seed,
                seat,
                commitments,
            } => self.verify_circuit(
                CircuitShape::HoleCards,
                proof,
                &Self::hole_card_inputs(deck_seed, *seat, commitments),
            ),
            PublicInputs::CommunityReveal {
                deck_seed,
                street,
                cards,
            } => {
                // The key fixes the slot count; a short or long card list
                // can never verify
                if cards.len() != street.card_count() {
                    return Ok(false);
                }
                self.verify_circuit(
                    CircuitShape::for_street(*street),
                    proof,
                    &Self::reveal_inputs(deck_seed, *street, cards),
                )
            }
            PublicInputs::HandReveal {
                commitments,
                board,
                score,
            } => self.verify_circuit(
                CircuitShape::HandReveal,
                proof,
                &Self::hand_inputs(commitments, board, *score),
            ),
        }
    }
}
