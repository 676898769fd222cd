//! Timing read: keep reading until the device stops sending.
//!
//! Used when there is no reliable prompt to wait for. "Done" is guessed
//! from quiescence: an empty read followed by a longer settle delay and a
//! second empty read.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::{Instant, sleep};

use super::Channel;
use crate::error::{ChannelError, ConfigError, Result};

/// Delays used by the timing read. Both are scaled by the delay factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingRead {
    /// Sleep before every read.
    pub loop_sleep: Duration,
    /// Settle delay after an empty read, before the confirming read.
    pub final_delay: Duration,
}

impl Default for TimingRead {
    fn default() -> Self {
        Self {
            loop_sleep: Duration::from_millis(10),
            final_delay: Duration::from_secs(2),
        }
    }
}

/// Read from `channel` until output goes quiet.
///
/// Fails with [`ChannelError::TimingTimeout`] (carrying everything read) if
/// the device is still talking when `timeout` elapses.
pub async fn read_until_quiet<C>(
    channel: &mut C,
    profile: TimingRead,
    delay_factor: f64,
    timeout: Duration,
) -> Result<String>
where
    C: Channel + ?Sized,
{
    if !delay_factor.is_finite() || delay_factor < 0.0 {
        return Err(ConfigError::Invalid {
            message: format!("delay_factor must be a non-negative number, got {delay_factor}"),
        }
        .into());
    }

    let loop_sleep = profile.loop_sleep.mul_f64(delay_factor);
    let final_delay = profile.final_delay.mul_f64(delay_factor);
    let deadline = Instant::now() + timeout;

    let mut output = String::new();
    loop {
        sleep(loop_sleep).await;
        let data = channel.read_channel().await?;
        if !data.is_empty() {
            output.push_str(&data);
        } else {
            // Mid-burst pauses are common; only a second empty read counts.
            sleep(final_delay).await;
            let data = channel.read_channel().await?;
            if data.is_empty() {
                break;
            }
            output.push_str(&data);
        }

        if Instant::now() > deadline {
            warn!(
                "read_channel_timing: still receiving after {:?} ({} bytes)",
                timeout,
                output.len()
            );
            return Err(ChannelError::TimingTimeout { timeout, output }.into());
        }
    }

    debug!("read_channel_timing: quiet after {} bytes", output.len());
    Ok(output)
}
