//! Exit sequencing for positions: decrease, collect, then burn once empty.

use alloy::primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::venues::LiquidityVenue;

/// What `close_position` actually submitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseOutcome {
    pub decreased: bool,
    pub collected: bool,
    pub burned: bool,
}

/// Pulls all liquidity and owed tokens out of a position.
///
/// Zero liquidity skips the decrease; nothing owed skips the collect. When `burn` is set
/// the position is re-read and burned only if that read shows it empty. Burning is
/// cleanup: its failure is logged and does not fail the close.
pub async fn close_position<V>(
    venue: &V,
    position_id: U256,
    recipient: Address,
    deadline: u64,
    burn: bool,
) -> Result<CloseOutcome>
where
    V: LiquidityVenue + ?Sized,
{
    let position = venue.position(position_id).await?;
    let mut outcome = CloseOutcome::default();

    if position.liquidity > 0 {
        venue
            .decrease_liquidity(position_id, position.liquidity, U256::ZERO, U256::ZERO, deadline)
            .await?;
        info!(%position_id, liquidity = position.liquidity, "liquidity removed");
        outcome.decreased = true;
    } else {
        debug!(%position_id, "position has no liquidity, skipping decrease");
    }

    if outcome.decreased || position.tokens_owed0 > 0 || position.tokens_owed1 > 0 {
        venue
            .collect(position_id, recipient, u128::MAX, u128::MAX)
            .await?;
        info!(%position_id, "owed tokens collected");
        outcome.collected = true;
    } else {
        debug!(%position_id, "nothing owed, skipping collect");
    }

    if burn {
        match venue.position(position_id).await {
            Ok(after) if after.is_empty() => match venue.burn(position_id).await {
                Ok(()) => {
                    info!(%position_id, "position burned");
                    outcome.burned = true;
                }
                Err(err) => warn!(%position_id, %err, "burn failed"),
            },
            Ok(after) => warn!(
                %position_id,
                liquidity = after.liquidity,
                owed0 = after.tokens_owed0,
                owed1 = after.tokens_owed1,
                "position not empty after collect, burn skipped"
            ),
            Err(err) => warn!(%position_id, %err, "could not re-read position, burn skipped"),
        }
    }

    Ok(outcome)
}

/// Closes and burns every position owned by the account. Used for a full reset, not
/// during steady-state rebalancing.
pub async fn close_all<V>(
    venue: &V,
    recipient: Address,
    deadline: u64,
) -> Result<Vec<(U256, CloseOutcome)>>
where
    V: LiquidityVenue + ?Sized,
{
    let ids = venue.position_ids().await?;
    info!(count = ids.len(), "closing all positions");
    let mut closed = Vec::with_capacity(ids.len());
    for position_id in ids {
        let outcome = close_position(venue, position_id, recipient, deadline, true).await?;
        closed.push((position_id, outcome));
    }
    Ok(closed)
}
