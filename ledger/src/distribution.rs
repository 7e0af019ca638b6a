//! # Fund Distribution Calculator
//!
//! The pure split fired in the same atomic step as approval. Rates are
//! protocol constants in basis points; the math never touches floating
//! point and never loses a unit: the integer remainder of the rate
//! division goes to the origin club, so the three shares always sum to
//! exactly the transfer value.

use serde::{Deserialize, Serialize};

use fichaje_protocol::config::{AGENT_RATE_BPS, FORMATION_RATE_BPS, RATE_DENOMINATOR_BPS};

/// The payout split of an approved transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Paid to the origin (selling) club.
    pub origin_share: u64,
    /// Paid to the formation-rights account.
    pub formation_share: u64,
    /// Paid to the agent, or zero when no agent is designated.
    pub agent_share: u64,
}

impl Distribution {
    /// The three shares summed. Always equals the input value.
    pub fn total(&self) -> u64 {
        self.origin_share + self.formation_share + self.agent_share
    }
}

/// Split `value` into origin, formation, and agent shares.
///
/// With no agent designated, the agent share is redirected to the origin
/// club; the protocol never burns or strands funds. Share arithmetic
/// widens to `u128` because `value * rate_bps` overflows `u64` for values
/// above roughly 1.8e15 base units, which real transfer fees exceed.
pub fn distribute(value: u64, has_agent: bool) -> Distribution {
    let value_wide = value as u128;
    let formation_share = (value_wide * FORMATION_RATE_BPS as u128
        / RATE_DENOMINATOR_BPS as u128) as u64;
    let agent_cut =
        (value_wide * AGENT_RATE_BPS as u128 / RATE_DENOMINATOR_BPS as u128) as u64;

    // Origin takes value minus the two cuts, which also absorbs any
    // rounding remainder from the divisions.
    let origin_base = value - formation_share - agent_cut;

    if has_agent {
        Distribution {
            origin_share: origin_base,
            formation_share,
            agent_share: agent_cut,
        }
    } else {
        Distribution {
            origin_share: origin_base + agent_cut,
            formation_share,
            agent_share: 0,
        }
    }
}
