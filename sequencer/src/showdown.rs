use prover::{HandRank, Seat};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowdownResult {
    pub winners: Vec<Seat>,
    pub best: HandRank,
}

impl ShowdownResult {
    pub fn is_split(&self) -> bool {
        self.winners.len() > 1
    }
}

/// Pick the seat(s) holding the best verified hand.
///
/// Seats without a rank (folded or never revealed) are left out. Every seat
/// sharing the maximum rank is a winner. Returns `None` if nobody qualifies.
pub fn resolve<I>(entries: I) -> Option<ShowdownResult>
where
    I: IntoIterator<Item = (Seat, Option<HandRank>)>,
{
    let ranked: Vec<(Seat, HandRank)> = entries
        .into_iter()
        .filter_map(|(seat, rank)| rank.map(|r| (seat, r)))
        .collect();

    let best = ranked.iter().map(|(_, rank)| *rank).max()?;
    let winners = ranked
        .into_iter()
        .filter(|(_, rank)| *rank == best)
        .map(|(seat, _)| seat)
        .collect();

    Some(ShowdownResult { winners, best })
}
