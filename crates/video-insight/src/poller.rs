//! Waits for an uploaded file to leave remote processing.

use log::{debug, info};
use tokio::time::sleep;

use crate::config::ReadinessPolicy;
use crate::error::ReadinessError;
use crate::media::{MediaState, MediaStore, ReadyMedia, RemoteMediaHandle};

/// Re-fetches `handle` every `policy.interval` while it is processing.
///
/// Only a `Ready` handle is returned. A handle that is ready on arrival is
/// returned without touching the store.
pub async fn await_ready(
    store: &dyn MediaStore,
    mut handle: RemoteMediaHandle,
    policy: &ReadinessPolicy,
) -> Result<ReadyMedia, ReadinessError> {
    let mut polls = 0;
    while handle.state == MediaState::Processing {
        if polls >= policy.max_polls {
            return Err(ReadinessError::TimedOut {
                name: handle.name,
                attempts: polls,
                waited: policy.interval.saturating_mul(polls),
            });
        }
        debug!("{} is still processing, checking again in {:?}", handle.name, policy.interval);
        sleep(policy.interval).await;
        handle = store.fetch(&handle.name).await?;
        polls += 1;
    }

    match handle.state {
        MediaState::Ready => {
            info!("{} is ready after {} polls", handle.name, polls);
            Ok(ReadyMedia::new(handle))
        }
        MediaState::Failed => Err(ReadinessError::Failed {
            reason: handle
                .failure
                .unwrap_or_else(|| "no reason given".to_string()),
            name: handle.name,
        }),
        MediaState::Unspecified | MediaState::Processing => {
            Err(ReadinessError::Unrecognized { name: handle.name })
        }
    }
}
