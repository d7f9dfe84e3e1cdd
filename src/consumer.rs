//! Consumer loop
//!
//! Pulls events one at a time and hands each to application logic until the
//! bridge reports `Cancelled`. Ending the loop does not destroy the bridge.

use crate::adapter::KeyPress;
use crate::bridge::{Adapter, EventBridge, Next};
use crate::player::{Player, PlayerError};

/// Await each operation in turn, feeding events to `handler`.
///
/// Stops at the first `Cancelled` outcome and returns the number of events
/// handled, or the first handler error.
pub async fn run_until_cancelled<E, I, F, X>(events: I, mut handler: F) -> Result<usize, X>
where
    E: Send + 'static,
    I: IntoIterator<Item = Next<E>>,
    F: FnMut(E) -> Result<(), X>,
{
    let mut handled = 0;
    for next in events {
        let Ok(event) = next.await else {
            break;
        };
        handler(event)?;
        handled += 1;
    }
    Ok(handled)
}

/// Click the player on every keypress until the keyboard bridge stops.
pub async fn clickety<A>(
    player: &mut Player,
    keyboard: &EventBridge<KeyPress, A>,
) -> Result<usize, PlayerError>
where
    A: Adapter<KeyPress>,
{
    run_until_cancelled(keyboard.events(), |key: KeyPress| -> Result<(), PlayerError> {
        let voice = player.click()?;
        tracing::trace!(%key, voice, "click");
        Ok(())
    })
    .await
}
