// ZK Hold'em sequencer
// Drives two-seat hands through seed exchange, dealing proofs, board reveals
// and showdown, and publishes the results for the escrow layer

pub mod api;
pub mod archive;
pub mod config;
pub mod events;
pub mod hand;
pub mod proofs;
pub mod seed_exchange;
pub mod service;
pub mod showdown;

pub use config::{ServiceConfig, StageTimeouts};
pub use events::HandEvent;
pub use hand::{AbortReason, ErrorKind, HandError, HandOutcome, HandState, HandView, Resolution, Stage};
pub use service::{HandService, ServiceError};
