//! Parses chat messages addressed to the bot into command intents.
//!
//! Dispatch is pure and synchronous: it never touches the store, the
//! snapshot, or the network. Ordinary room chatter must be ignored, so a
//! message is only considered addressed when it starts with the configured
//! prefix followed by `:`; substring matches never count.

use chrono::NaiveTime;

use crate::aggregate::View;

/// What an addressed message asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ShowNew,
    ShowPending,
    ShowFcp,
    ShowAll,
    /// Unreviewed proposals plus pending FCPs, optionally narrowed to one
    /// reviewer's outstanding sign-offs.
    ShowTasks(Option<String>),
    /// Send this room's summary once, regardless of the daily schedule.
    ShowSummary,
    Help,
    EnableSummary,
    DisableSummary,
    SetSummaryTime(NaiveTime),
    /// Choose which view this room's daily summary carries.
    SetSummaryContent(View),
    SummaryTimeInfo,
}

/// Dispatch result for one inbound message.
///
/// `UnknownCommand` is distinct from `NotAddressed` so the caller can reply
/// with help text only when the bot was truly addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Addressed(Intent),
    /// Addressed with a recognized command but an unusable argument
    /// (e.g. an unparseable time). Carries the operator-facing complaint.
    InvalidArgument(String),
    UnknownCommand,
    NotAddressed,
}

/// Parse `message` against the configured address `prefix`.
#[must_use]
pub fn dispatch(message: &str, prefix: &str) -> Outcome {
    let Some(command) = addressed_remainder(message, prefix) else {
        return Outcome::NotAddressed;
    };

    let normalized = command.trim().to_lowercase();
    let intent = match normalized.as_str() {
        "show new" | "show in-progress" => Intent::ShowNew,
        "show pending" => Intent::ShowPending,
        "show fcp" | "show in fcp" => Intent::ShowFcp,
        "show all" | "show active" => Intent::ShowAll,
        "show summary" | "summarize" | "summarise" => Intent::ShowSummary,
        "help" | "show help" => Intent::Help,
        "set summary enable" | "set summary enabled" | "set enable summary" => {
            Intent::EnableSummary
        }
        "set summary disable" | "set summary disabled" | "set disable summary" => {
            Intent::DisableSummary
        }
        "summary time" | "get summary time" => Intent::SummaryTimeInfo,
        "show tasks" => Intent::ShowTasks(None),
        _ => {
            if let Some(arg) = strip_keyword(&normalized, "set summary time") {
                return set_time_outcome(arg);
            }
            if let Some(arg) = strip_keyword(&normalized, "set summary content") {
                return set_content_outcome(arg);
            }
            if let Some(user) = strip_keyword(&normalized, "show tasks") {
                return Outcome::Addressed(Intent::ShowTasks(Some(user.to_string())));
            }
            return Outcome::UnknownCommand;
        }
    };

    Outcome::Addressed(intent)
}

/// The command text after `prefix:`, or `None` when the message does not
/// address the bot. Prefix comparison is case-insensitive; the delimiter
/// must immediately follow the prefix.
fn addressed_remainder<'a>(message: &'a str, prefix: &str) -> Option<&'a str> {
    let message = message.trim_start();
    let head = message.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    message[prefix.len()..].strip_prefix(':')
}

/// Strip a leading keyword and return the remaining argument text, if the
/// command actually starts with that keyword followed by an argument
/// boundary.
fn strip_keyword<'a>(command: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = command.strip_prefix(keyword)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(' ').then(|| rest.trim())
}

fn set_content_outcome(arg: &str) -> Outcome {
    let view = match arg {
        "all" => View::All,
        "pending" => View::Pending,
        "fcp" => View::Fcp,
        "in-progress" | "new" => View::New,
        _ => {
            return Outcome::InvalidArgument(format!(
                "Unknown summary content '{arg}'. Use one of: all, pending, fcp, in-progress."
            ));
        }
    };
    Outcome::Addressed(Intent::SetSummaryContent(view))
}

fn set_time_outcome(arg: &str) -> Outcome {
    // Accept an optional filler "to", as in "set summary time to 07:00".
    let arg = arg.strip_prefix("to ").map_or(arg, str::trim);

    if arg.is_empty() {
        return Outcome::InvalidArgument(
            "Missing time. Usage: `set summary time 07:00` (24h, UTC).".to_string(),
        );
    }

    parse_time(arg).map_or_else(
        || Outcome::InvalidArgument(format!("Unknown time parameter '{arg}'.")),
        |time| Outcome::Addressed(Intent::SetSummaryTime(time)),
    )
}

/// Parse a summary time in the handful of shapes people actually type:
/// `07:00`, `7:00`, `4pm`, `8:15pm`.
fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim().to_uppercase();
    for format in ["%H:%M", "%I:%M%p", "%I%p"] {
        if let Ok(time) = NaiveTime::parse_from_str(&raw, format) {
            return Some(time);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{Intent, Outcome, dispatch};
    use crate::aggregate::View;
    use chrono::NaiveTime;

    const PREFIX: &str = "mscbot";

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn query_intents_dispatch() {
        assert_eq!(
            dispatch("mscbot: show all", PREFIX),
            Outcome::Addressed(Intent::ShowAll)
        );
        assert_eq!(
            dispatch("mscbot: show new", PREFIX),
            Outcome::Addressed(Intent::ShowNew)
        );
        assert_eq!(
            dispatch("mscbot: show pending", PREFIX),
            Outcome::Addressed(Intent::ShowPending)
        );
        assert_eq!(
            dispatch("mscbot: show fcp", PREFIX),
            Outcome::Addressed(Intent::ShowFcp)
        );
    }

    #[test]
    fn chatter_is_not_addressed() {
        assert_eq!(dispatch("hello mscbot", PREFIX), Outcome::NotAddressed);
        assert_eq!(dispatch("I said mscbot: show all", PREFIX), Outcome::NotAddressed);
        assert_eq!(dispatch("mscbottle: show all", PREFIX), Outcome::NotAddressed);
        assert_eq!(dispatch("mscbot show all", PREFIX), Outcome::NotAddressed);
        assert_eq!(dispatch("", PREFIX), Outcome::NotAddressed);
    }

    #[test]
    fn unknown_command_is_distinct_from_not_addressed() {
        assert_eq!(dispatch("mscbot: show nope", PREFIX), Outcome::UnknownCommand);
        assert_eq!(dispatch("mscbot:", PREFIX), Outcome::UnknownCommand);
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert_eq!(
            dispatch("MSCBot: show all", PREFIX),
            Outcome::Addressed(Intent::ShowAll)
        );
    }

    #[test]
    fn keyword_match_tolerates_whitespace_and_case() {
        assert_eq!(
            dispatch("mscbot:   Show All  ", PREFIX),
            Outcome::Addressed(Intent::ShowAll)
        );
    }

    #[test]
    fn summary_toggles_dispatch() {
        assert_eq!(
            dispatch("mscbot: set summary enable", PREFIX),
            Outcome::Addressed(Intent::EnableSummary)
        );
        assert_eq!(
            dispatch("mscbot: set summary disabled", PREFIX),
            Outcome::Addressed(Intent::DisableSummary)
        );
        assert_eq!(
            dispatch("mscbot: summary time", PREFIX),
            Outcome::Addressed(Intent::SummaryTimeInfo)
        );
    }

    #[test]
    fn show_tasks_with_and_without_a_user() {
        assert_eq!(
            dispatch("mscbot: show tasks", PREFIX),
            Outcome::Addressed(Intent::ShowTasks(None))
        );
        assert_eq!(
            dispatch("mscbot: show tasks alice", PREFIX),
            Outcome::Addressed(Intent::ShowTasks(Some("alice".to_string())))
        );
    }

    #[test]
    fn set_summary_content_picks_a_view() {
        assert_eq!(
            dispatch("mscbot: set summary content pending", PREFIX),
            Outcome::Addressed(Intent::SetSummaryContent(View::Pending))
        );
        assert_eq!(
            dispatch("mscbot: set summary content in-progress", PREFIX),
            Outcome::Addressed(Intent::SetSummaryContent(View::New))
        );
        assert_eq!(
            dispatch("mscbot: set summary content all", PREFIX),
            Outcome::Addressed(Intent::SetSummaryContent(View::All))
        );
        assert!(matches!(
            dispatch("mscbot: set summary content everything", PREFIX),
            Outcome::InvalidArgument(_)
        ));
    }

    #[test]
    fn set_summary_time_parses_common_shapes() {
        assert_eq!(
            dispatch("mscbot: set summary time 07:00", PREFIX),
            Outcome::Addressed(Intent::SetSummaryTime(hm(7, 0)))
        );
        assert_eq!(
            dispatch("mscbot: set summary time to 7:30", PREFIX),
            Outcome::Addressed(Intent::SetSummaryTime(hm(7, 30)))
        );
        assert_eq!(
            dispatch("mscbot: set summary time 4pm", PREFIX),
            Outcome::Addressed(Intent::SetSummaryTime(hm(16, 0)))
        );
        assert_eq!(
            dispatch("mscbot: set summary time 8:15pm", PREFIX),
            Outcome::Addressed(Intent::SetSummaryTime(hm(20, 15)))
        );
    }

    #[test]
    fn bad_time_is_invalid_argument_not_unknown() {
        assert!(matches!(
            dispatch("mscbot: set summary time yesterday", PREFIX),
            Outcome::InvalidArgument(_)
        ));
        assert!(matches!(
            dispatch("mscbot: set summary time", PREFIX),
            Outcome::InvalidArgument(_)
        ));
    }

    #[test]
    fn unicode_prefix_boundary_is_safe() {
        // A multi-byte char at the prefix boundary must not panic the slicer.
        assert_eq!(dispatch("mscbö: show all", PREFIX), Outcome::NotAddressed);
    }
}
