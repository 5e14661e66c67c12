//! Chat command parsing and replies.

use std::fmt;

use aurora_alerts::{FetchError, QueryService};
use tracing::warn;

/// Reply to `/start`.
pub const WELCOME: &str = "Welcome!\n\
/k - latest Kp readings\n\
/forecast - upcoming Kp forecast\n\
/history - last recorded 3-hour values";

/// Header for observed readings.
pub const RECORDED_HEADER: &str = "Last recorded Kp indexes:\n";

/// Header for the forecast.
pub const FORECAST_HEADER: &str = "Forecasts:\n";

/// Body used when a query returns no samples.
pub const NO_DATA: &str = "No data available right now.";

/// Reply used when a feed could not be fetched.
pub const FETCH_FAILED: &str = "Could not reach the Kp data service, please try again later.";

/// A recognised chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `/start`
    Start,
    /// `/k`
    Latest,
    /// `/forecast`
    Forecast,
    /// `/history`
    History,
}

impl Command {
    /// All commands.
    pub const ALL: [Self; 4] = [Self::Start, Self::Latest, Self::Forecast, Self::History];

    /// Returns the command word without the slash.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Latest => "k",
            Self::Forecast => "forecast",
            Self::History => "history",
        }
    }

    /// Parses the first word of a message.
    ///
    /// `/k@name` is accepted when `name` matches `bot_username` (ignoring
    /// case), or when the bot's username is unknown. Anything after the first
    /// word is ignored.
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;

        let (name, addressee) = match word.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (word, None),
        };

        if let (Some(addressee), Some(me)) = (addressee, bot_username) {
            if !addressee.eq_ignore_ascii_case(me) {
                return None;
            }
        }

        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

/// Builds the reply text for each command.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    queries: QueryService,
}

impl CommandRouter {
    /// Creates a router over the given query service.
    #[must_use]
    pub const fn new(queries: QueryService) -> Self {
        Self { queries }
    }

    /// Runs the query behind `command` and returns the reply.
    ///
    /// Never fails: fetch errors become [`FETCH_FAILED`].
    pub async fn reply(&self, command: Command) -> String {
        let (header, result) = match command {
            Command::Start => return WELCOME.to_string(),
            Command::Latest => (RECORDED_HEADER, self.queries.latest_reading().await),
            Command::Forecast => (FORECAST_HEADER, self.queries.upcoming_forecast().await),
            Command::History => (RECORDED_HEADER, self.queries.recent_history().await),
        };

        compose(command, header, result)
    }
}

fn compose(command: Command, header: &str, result: Result<String, FetchError>) -> String {
    match result {
        Ok(body) if body.is_empty() => format!("{header}{NO_DATA}"),
        Ok(body) => format!("{header}{body}"),
        Err(e) => {
            warn!(command = %command, error = %e, "query failed");
            FETCH_FAILED.to_string()
        }
    }
}
