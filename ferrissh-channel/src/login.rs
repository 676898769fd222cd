//! Login over line-oriented transports.
//!
//! Telnet has no authentication of its own: the device prints prompts and
//! the client answers them. The dialog is driven by a [`Login`]
//! implementation, handed the channel and [`LoginParams`], which either
//! reaches an authenticated prompt or fails.

use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::{Instant, sleep};

use crate::channel::{Channel, ExpectFlags};
use crate::error::{ChannelError, Result, TransportError};
use crate::transport::TelnetConfig;

/// Everything a login collaborator is constructed with.
#[derive(Debug, Clone)]
pub struct LoginParams {
    pub username: String,
    pub password: SecretString,
    /// Regex identifying the username prompt.
    pub username_pattern: String,
    /// Regex identifying the password prompt.
    pub password_pattern: String,
    pub pri_prompt_terminator: String,
    pub alt_prompt_terminator: String,
    /// Bound on the whole dialog.
    pub login_timeout: Duration,
    /// Extra `(pattern, response)` pairs answered during login, e.g. a
    /// banner that must be acknowledged.
    pub addl_patterns: Vec<(String, String)>,
    /// `host:port`, for error messages.
    pub target: String,
}

impl LoginParams {
    /// Build login parameters from a telnet configuration.
    pub fn from_config(config: &TelnetConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            username_pattern: config.username_pattern.clone(),
            password_pattern: config.password_pattern.clone(),
            pri_prompt_terminator: config.pri_prompt_terminator.clone(),
            alt_prompt_terminator: config.alt_prompt_terminator.clone(),
            login_timeout: config.timeout,
            addl_patterns: Vec::new(),
            target: config.socket_addr(),
        }
    }

    /// Regex matching a device prompt at the end of the output.
    pub fn prompt_regex(&self) -> std::result::Result<Regex, regex::Error> {
        let mut terminators = vec![regex::escape(&self.pri_prompt_terminator)];
        if !self.alt_prompt_terminator.is_empty() {
            terminators.push(regex::escape(&self.alt_prompt_terminator));
        }
        Regex::new(&format!(r"(?:{})\s*$", terminators.join("|")))
    }
}

/// Drives a login dialog to completion.
pub trait Login: Send + Sync {
    /// Run the dialog on `channel`. Returns once an authenticated prompt is
    /// reached.
    fn login<C: Channel>(
        &self,
        channel: &mut C,
        params: &LoginParams,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Default login: answer username and password prompts until a prompt
/// terminator shows up.
///
/// If the device says nothing for a while, a bare return is sent to wake
/// it up. A username prompt on the last line after the password was sent
/// counts as rejected credentials; a banner merely mentioning "login" does
/// not.
#[derive(Debug, Clone)]
pub struct PromptLogin {
    /// Idle time before a return is sent to wake up the device.
    pub wake_after: Duration,
    /// Sleep between polls.
    pub poll_interval: Duration,
}

impl Default for PromptLogin {
    fn default() -> Self {
        Self {
            wake_after: Duration::from_secs(1),
            poll_interval: Duration::from_millis(20),
        }
    }
}

const RETURN: &str = "\r\n";

impl Login for PromptLogin {
    async fn login<C: Channel>(&self, channel: &mut C, params: &LoginParams) -> Result<()> {
        let flags = ExpectFlags::NONE.ignore_case();
        let username_re = flags.compile(&params.username_pattern).map_err(ChannelError::from)?;
        // Username prompt on the last line, i.e. asked again.
        let reprompt_re = flags
            .compile(&format!(r"(?:{})[^\n]*$", params.username_pattern))
            .map_err(ChannelError::from)?;
        let password_re = flags.compile(&params.password_pattern).map_err(ChannelError::from)?;
        let prompt_re = params.prompt_regex().map_err(ChannelError::from)?;
        let mut extra = Vec::with_capacity(params.addl_patterns.len());
        for (pattern, response) in &params.addl_patterns {
            let re = flags.compile(pattern).map_err(ChannelError::from)?;
            extra.push((re, response.as_str()));
        }

        let deadline = Instant::now() + params.login_timeout;
        let mut pending = String::new();
        let mut transcript = String::new();
        let mut sent_password = false;
        let mut last_activity = Instant::now();

        loop {
            if Instant::now() > deadline {
                return Err(login_failed(params, &transcript));
            }

            let data = channel.read_channel().await?;
            if data.is_empty() {
                if last_activity.elapsed() >= self.wake_after {
                    trace!("login: no output, sending return");
                    channel.write_channel(RETURN).await?;
                    last_activity = Instant::now();
                }
                sleep(self.poll_interval).await;
                continue;
            }

            last_activity = Instant::now();
            pending.push_str(&data);
            transcript.push_str(&data);

            if let Some((_, response)) = extra.iter().find(|(re, _)| re.is_match(&pending)) {
                debug!("login: answering additional pattern");
                channel.write_channel(&format!("{response}{RETURN}")).await?;
                pending.clear();
                continue;
            }

            if sent_password {
                if prompt_re.is_match(&pending) {
                    debug!("login: reached prompt on {}", params.target);
                    return Ok(());
                }
                if reprompt_re.is_match(&pending) {
                    return Err(login_failed(params, &transcript));
                }
            } else if username_re.is_match(&pending) {
                debug!("login: sending username");
                channel.write_channel(&format!("{}{RETURN}", params.username)).await?;
                pending.clear();
                continue;
            }

            if password_re.is_match(&pending) {
                debug!("login: sending password");
                channel
                    .write_channel(&format!("{}{RETURN}", params.password.expose_secret()))
                    .await?;
                sent_password = true;
                pending.clear();
                continue;
            }

            if prompt_re.is_match(&pending) {
                debug!("login: reached prompt on {}", params.target);
                return Ok(());
            }
        }
    }
}

fn login_failed(params: &LoginParams, transcript: &str) -> crate::Error {
    TransportError::Authentication {
        message: format!(
            "Telnet login failed: {}\n\nOutput received during login:\n\n{}",
            params.target, transcript
        ),
    }
    .into()
}
